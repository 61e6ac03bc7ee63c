// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC4x3 structural dictionary
//!
//! Class -> property set -> property names used to suggest rule targets and
//! to pick the classes analysed by the health check. Entries keep the order
//! of the bundled data file.

use std::fmt;
use std::marker::PhantomData;
use std::sync::OnceLock;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};

const DATA: &str = include_str!("../data/ifc4x3_structural_psets.json");

/// JSON object read as an ordered list of entries
#[derive(Debug, Clone, Default)]
struct Ordered<T>(Vec<(String, T)>);

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Ordered<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
            type Value = Ordered<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry()? {
                    entries.push(entry);
                }
                Ok(Ordered(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}

type Dictionary = Ordered<Ordered<Vec<String>>>;

fn dictionary() -> &'static Dictionary {
    static DICTIONARY: OnceLock<Dictionary> = OnceLock::new();
    DICTIONARY.get_or_init(|| match serde_json::from_str(DATA) {
        Ok(dictionary) => dictionary,
        Err(err) => {
            tracing::error!(error = %err, "Bundled structural dictionary is malformed");
            Ordered::default()
        }
    })
}

fn class_entry(class: &str) -> Option<&'static Ordered<Vec<String>>> {
    dictionary()
        .0
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(class))
        .map(|(_, psets)| psets)
}

/// Dictionary classes in data file order
pub fn classes() -> Vec<&'static str> {
    dictionary().0.iter().map(|(name, _)| name.as_str()).collect()
}

pub fn contains_class(class: &str) -> bool {
    class_entry(class).is_some()
}

/// Property set names of a class; empty for unknown classes
pub fn psets(class: &str) -> Vec<&'static str> {
    class_entry(class)
        .map(|entry| entry.0.iter().map(|(name, _)| name.as_str()).collect())
        .unwrap_or_default()
}

/// Property names of a class property set; empty when either is unknown
pub fn properties(class: &str, pset: &str) -> Vec<&'static str> {
    class_entry(class)
        .and_then(|entry| entry.0.iter().find(|(name, _)| name == pset))
        .map(|(_, props)| props.iter().map(String::as_str).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_order_preserved() {
        let classes = classes();
        assert_eq!(classes.len(), 20);
        assert_eq!(classes[0], "IfcBeam");
        assert_eq!(classes[1], "IfcColumn");
        assert_eq!(classes.last(), Some(&"IfcStair"));
        assert!(contains_class("ifcwall"));
        assert!(!contains_class("IfcTask"));
    }

    #[test]
    fn test_psets_and_properties() {
        assert_eq!(psets("IfcBeam")[0], "Pset_BeamCommon");
        let props = properties("IfcBeam", "Pset_BeamCommon");
        assert_eq!(&props[..3], &["Reference", "Status", "Span"]);
        assert!(props.contains(&"FireRating"));
        assert!(properties("IfcBeam", "Pset_Unknown").is_empty());
        assert!(psets("IfcUnknown").is_empty());
    }
}
