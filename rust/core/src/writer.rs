// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP Part 21 serialization

use std::fmt::Write;

use crate::entity::{AttributeValue, Entity};
use crate::parser::StepHeader;

/// Encode text as a STEP string body (without the surrounding quotes)
pub fn encode_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut wide: Vec<u16> = Vec::new();

    let flush = |wide: &mut Vec<u16>, out: &mut String| {
        if wide.is_empty() {
            return;
        }
        out.push_str("\\X2\\");
        for unit in wide.drain(..) {
            let _ = write!(out, "{:04X}", unit);
        }
        out.push_str("\\X0\\");
    };

    for c in text.chars() {
        if c.is_ascii() && !c.is_ascii_control() {
            flush(&mut wide, &mut out);
            match c {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                _ => out.push(c),
            }
        } else {
            let mut buf = [0u16; 2];
            wide.extend_from_slice(c.encode_utf16(&mut buf));
        }
    }
    flush(&mut wide, &mut out);
    out
}

/// Format a real so that it always carries a decimal point
pub fn format_real(value: f64) -> String {
    if !value.is_finite() {
        return "0.".to_string();
    }
    let magnitude = value.abs();
    if value == 0.0 || (1e-4..1e15).contains(&magnitude) {
        let mut s = format!("{}", value);
        if !s.contains('.') {
            s.push('.');
        }
        s
    } else {
        let s = format!("{:E}", value);
        match s.split_once('E') {
            Some((mantissa, exponent)) if !mantissa.contains('.') => {
                format!("{}.E{}", mantissa, exponent)
            }
            _ => s,
        }
    }
}

pub fn write_value(value: &AttributeValue, out: &mut String) {
    match value {
        AttributeValue::EntityRef(id) => {
            let _ = write!(out, "#{}", id);
        }
        AttributeValue::String(s) => {
            out.push('\'');
            out.push_str(&encode_string(s));
            out.push('\'');
        }
        AttributeValue::Integer(i) => {
            let _ = write!(out, "{}", i);
        }
        AttributeValue::Float(f) => out.push_str(&format_real(*f)),
        AttributeValue::Enum(e) => {
            out.push('.');
            out.push_str(e);
            out.push('.');
        }
        AttributeValue::List(items) => {
            out.push('(');
            write_values(items, out);
            out.push(')');
        }
        AttributeValue::Typed(type_name, inner) => {
            out.push_str(type_name);
            out.push('(');
            write_value(inner, out);
            out.push(')');
        }
        AttributeValue::Null => out.push('$'),
        AttributeValue::Derived => out.push('*'),
    }
}

fn write_values(values: &[AttributeValue], out: &mut String) {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_value(value, out);
    }
}

/// `#id=TYPE(...);`
pub fn write_entity(entity: &Entity, out: &mut String) {
    let _ = write!(out, "#{}={}(", entity.id, entity.type_name);
    write_values(&entity.attributes, out);
    out.push_str(");\n");
}

fn quoted(text: &str) -> String {
    format!("'{}'", encode_string(text))
}

fn quoted_list(items: &[String]) -> String {
    if items.is_empty() {
        return "('')".to_string();
    }
    let inner: Vec<String> = items.iter().map(|s| quoted(s)).collect();
    format!("({})", inner.join(","))
}

/// Serialize a complete exchange file
pub fn write_step<'a>(header: &StepHeader, entities: impl IntoIterator<Item = &'a Entity>) -> String {
    let mut out = String::with_capacity(64 * 1024);
    out.push_str("ISO-10303-21;\nHEADER;\n");
    let description = if header.description.is_empty() {
        vec!["ViewDefinition [CoordinationView]".to_string()]
    } else {
        header.description.clone()
    };
    let _ = writeln!(out, "FILE_DESCRIPTION({},'2;1');", quoted_list(&description));
    let _ = writeln!(
        out,
        "FILE_NAME({},{},(''),(''),{},{},'');",
        quoted(header.file_name.as_deref().unwrap_or("model.ifc")),
        quoted(header.time_stamp.as_deref().unwrap_or("")),
        quoted(concat!("bim45d-core ", env!("CARGO_PKG_VERSION"))),
        quoted(header.originating_system.as_deref().unwrap_or("")),
    );
    let schemas = if header.schema_identifiers.is_empty() {
        vec!["IFC4X3_ADD2".to_string()]
    } else {
        header.schema_identifiers.clone()
    };
    let _ = writeln!(out, "FILE_SCHEMA({});", quoted_list(&schemas));
    out.push_str("ENDSEC;\nDATA;\n");
    for entity in entities {
        write_entity(entity, &mut out);
    }
    out.push_str("ENDSEC;\nEND-ISO-10303-21;\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{decode_string, parse_entity};

    #[test]
    fn test_format_real() {
        assert_eq!(format_real(0.0), "0.");
        assert_eq!(format_real(3.0), "3.");
        assert_eq!(format_real(-2.5), "-2.5");
        assert_eq!(format_real(1.5e-10), "1.5E-10");
        assert_eq!(format_real(1e20), "1.E20");
    }

    #[test]
    fn test_encode_string_reverses_decode() {
        for text in ["plain", "it's", "Livello è 1", "a\\b", "日本"] {
            assert_eq!(decode_string(&encode_string(text)), text);
        }
        assert_eq!(encode_string("è"), "\\X2\\00E8\\X0\\");
    }

    #[test]
    fn test_write_entity_reparses() {
        let entity = Entity::new(
            4,
            "IFCPROPERTYSINGLEVALUE",
            vec![
                "Fire 'A'".into(),
                AttributeValue::Null,
                AttributeValue::typed("IFCREAL", AttributeValue::Float(0.5)),
                AttributeValue::from(vec![1, 2]),
            ],
        );
        let mut line = String::new();
        write_entity(&entity, &mut line);
        assert_eq!(
            line,
            "#4=IFCPROPERTYSINGLEVALUE('Fire ''A''',$,IFCREAL(0.5),(#1,#2));\n"
        );
        let (id, type_name, tokens) = parse_entity(line.trim_end()).unwrap();
        assert_eq!((id, type_name, tokens.len()), (4, "IFCPROPERTYSINGLEVALUE", 4));
    }
}
