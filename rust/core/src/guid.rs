// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC GlobalId encoding (22 characters, IFC base64 alphabet)

use uuid::Uuid;

use crate::error::{Error, Result};

const ALPHABET: &[u8; 64] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_$";

/// Compress a UUID into its 22 character IFC form
pub fn compress(uuid: &Uuid) -> String {
    let value = uuid.as_u128();
    let mut out = String::with_capacity(22);
    // 2 bits + 21 * 6 bits = 128
    out.push(ALPHABET[(value >> 126) as usize] as char);
    for i in (0..21).rev() {
        out.push(ALPHABET[((value >> (6 * i)) & 0x3f) as usize] as char);
    }
    out
}

/// Expand a 22 character GlobalId back into a UUID
pub fn expand(global_id: &str) -> Result<Uuid> {
    if global_id.len() != 22 {
        return Err(Error::InvalidGlobalId(global_id.to_string()));
    }
    let mut value: u128 = 0;
    for (i, byte) in global_id.bytes().enumerate() {
        let digit = ALPHABET
            .iter()
            .position(|&c| c == byte)
            .ok_or_else(|| Error::InvalidGlobalId(global_id.to_string()))? as u128;
        if i == 0 && digit > 3 {
            return Err(Error::InvalidGlobalId(global_id.to_string()));
        }
        value = (value << 6) | digit;
    }
    Ok(Uuid::from_u128(value))
}

/// Fresh random GlobalId
pub fn new_global_id() -> String {
    compress(&Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_value() {
        let uuid = Uuid::from_u128(0);
        assert_eq!(compress(&uuid), "0000000000000000000000");
        let max = Uuid::from_u128(u128::MAX);
        assert_eq!(compress(&max), "3$$$$$$$$$$$$$$$$$$$$$");
    }

    #[test]
    fn test_expand_inverts_compress() {
        let id = new_global_id();
        assert_eq!(id.len(), 22);
        let uuid = expand(&id).unwrap();
        assert_eq!(compress(&uuid), id);
    }

    #[test]
    fn test_expand_rejects_bad_input() {
        assert!(expand("short").is_err());
        assert!(expand("4$$$$$$$$$$$$$$$$$$$$$").is_err());
        assert!(expand("00000000000000000000!0").is_err());
    }
}
