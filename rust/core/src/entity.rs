// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Owned entity representation

use crate::parser::{decode_string, Token};

/// IFC entity attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Entity reference
    EntityRef(u32),
    /// Decoded string value
    String(String),
    /// Integer value
    Integer(i64),
    /// Float value
    Float(f64),
    /// Enum value without the surrounding dots
    Enum(String),
    /// List of values
    List(Vec<AttributeValue>),
    /// Typed value such as IFCLABEL('x'), type name upper case as written
    Typed(String, Box<AttributeValue>),
    /// Null/undefined
    Null,
    /// Derived value (*)
    Derived,
}

impl AttributeValue {
    /// Convert from Token
    pub fn from_token(token: &Token) -> Self {
        match token {
            Token::EntityRef(id) => AttributeValue::EntityRef(*id),
            Token::String(s) => AttributeValue::String(decode_string(s)),
            Token::Integer(i) => AttributeValue::Integer(*i),
            Token::Float(f) => AttributeValue::Float(*f),
            Token::Enum(e) => AttributeValue::Enum(e.to_string()),
            Token::List(items) => AttributeValue::List(items.iter().map(Self::from_token).collect()),
            Token::TypedValue(type_name, args) => {
                let inner = match args.as_slice() {
                    [single] => Self::from_token(single),
                    [] => AttributeValue::Null,
                    many => AttributeValue::List(many.iter().map(Self::from_token).collect()),
                };
                AttributeValue::Typed(type_name.to_ascii_uppercase(), Box::new(inner))
            }
            Token::Null => AttributeValue::Null,
            Token::Derived => AttributeValue::Derived,
        }
    }

    /// Shorthand for a typed label, e.g. IFCLABEL('text')
    pub fn typed(type_name: &str, value: AttributeValue) -> Self {
        AttributeValue::Typed(type_name.to_ascii_uppercase(), Box::new(value))
    }

    /// Value with any typed wrapper removed
    pub fn untyped(&self) -> &AttributeValue {
        match self {
            AttributeValue::Typed(_, inner) => inner.untyped(),
            other => other,
        }
    }

    #[inline]
    pub fn as_entity_ref(&self) -> Option<u32> {
        match self {
            AttributeValue::EntityRef(id) => Some(*id),
            _ => None,
        }
    }

    #[inline]
    pub fn as_string(&self) -> Option<&str> {
        match self.untyped() {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_enum(&self) -> Option<&str> {
        match self.untyped() {
            AttributeValue::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// Numeric value, integers are widened
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self.untyped() {
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self.untyped() {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// STEP booleans and logicals: .T. / .F. (.U. is None)
    pub fn as_bool(&self) -> Option<bool> {
        match self.as_enum()? {
            "T" | "TRUE" => Some(true),
            "F" | "FALSE" => Some(false),
            _ => None,
        }
    }

    #[inline]
    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::List(items) => Some(items),
            _ => None,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Every entity id referenced by this value, nested lists included
    pub fn collect_refs(&self, out: &mut Vec<u32>) {
        match self {
            AttributeValue::EntityRef(id) => out.push(*id),
            AttributeValue::List(items) => items.iter().for_each(|item| item.collect_refs(out)),
            AttributeValue::Typed(_, inner) => inner.collect_refs(out),
            _ => {}
        }
    }

    /// Remove references to `target`; returns true when something changed
    pub(crate) fn strip_ref(&mut self, target: u32) -> bool {
        match self {
            AttributeValue::EntityRef(id) if *id == target => {
                *self = AttributeValue::Null;
                true
            }
            AttributeValue::List(items) => {
                let before = items.len();
                items.retain(|item| item.as_entity_ref() != Some(target));
                let mut changed = items.len() != before;
                for item in items.iter_mut() {
                    changed |= item.strip_ref(target);
                }
                changed
            }
            _ => false,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<Option<String>> for AttributeValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(AttributeValue::Null, AttributeValue::String)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<Vec<u32>> for AttributeValue {
    fn from(ids: Vec<u32>) -> Self {
        AttributeValue::List(ids.into_iter().map(AttributeValue::EntityRef).collect())
    }
}

/// A decoded DATA section record
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: u32,
    /// Type name as written in the file, upper case
    pub type_name: String,
    pub attributes: Vec<AttributeValue>,
}

impl Entity {
    pub fn new(id: u32, type_name: impl Into<String>, attributes: Vec<AttributeValue>) -> Self {
        Self {
            id,
            type_name: type_name.into().to_ascii_uppercase(),
            attributes,
        }
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&AttributeValue> {
        self.attributes.get(index)
    }

    pub fn get_ref(&self, index: usize) -> Option<u32> {
        self.get(index).and_then(|a| a.as_entity_ref())
    }

    pub fn get_string(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(|a| a.as_string())
    }

    pub fn get_enum(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(|a| a.as_enum())
    }

    pub fn get_float(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(|a| a.as_float())
    }

    pub fn get_list(&self, index: usize) -> Option<&[AttributeValue]> {
        self.get(index).and_then(|a| a.as_list())
    }

    /// Entity ids held in a list attribute (or a single reference)
    pub fn get_refs(&self, index: usize) -> Vec<u32> {
        match self.get(index) {
            Some(AttributeValue::List(items)) => {
                items.iter().filter_map(|a| a.as_entity_ref()).collect()
            }
            Some(AttributeValue::EntityRef(id)) => vec![*id],
            _ => Vec::new(),
        }
    }

    /// IfcRoot.GlobalId
    pub fn global_id(&self) -> Option<&str> {
        self.get_string(0)
    }

    /// IfcRoot.Name
    pub fn name(&self) -> Option<&str> {
        self.get_string(2)
    }

    /// All entity ids referenced by this record
    pub fn references(&self) -> Vec<u32> {
        let mut out = Vec::new();
        for attr in &self.attributes {
            attr.collect_refs(&mut out);
        }
        out.sort_unstable();
        out.dedup();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_entity;

    fn decode(line: &str) -> Entity {
        let (id, type_name, tokens) = parse_entity(line).unwrap();
        Entity::new(
            id,
            type_name,
            tokens.iter().map(AttributeValue::from_token).collect(),
        )
    }

    #[test]
    fn test_typed_values_unwrap() {
        let entity = decode("#5=IFCPROPERTYSINGLEVALUE('Span',$,IFCPOSITIVELENGTHMEASURE(4500.),$);");
        assert_eq!(entity.get_float(2), Some(4500.0));
        assert!(matches!(entity.get(2), Some(AttributeValue::Typed(t, _)) if t == "IFCPOSITIVELENGTHMEASURE"));

        let flag = decode("#6=IFCPROPERTYSINGLEVALUE('IsExternal',$,IFCBOOLEAN(.F.),$);");
        assert_eq!(flag.get(2).and_then(|a| a.as_bool()), Some(false));
    }

    #[test]
    fn test_references_and_strip() {
        let mut entity = decode("#9=IFCRELAGGREGATES('g',#2,$,$,#3,(#4,#5,#4));");
        assert_eq!(entity.references(), vec![2, 3, 4, 5]);
        assert_eq!(entity.get_refs(5), vec![4, 5, 4]);

        assert!(entity.attributes[5].strip_ref(4));
        assert_eq!(entity.get_refs(5), vec![5]);
        assert!(entity.attributes[4].strip_ref(3));
        assert!(entity.attributes[4].is_null());
        assert!(!entity.attributes[1].strip_ref(42));
    }

    #[test]
    fn test_names_are_decoded() {
        let entity = decode("#1=IFCWALL('g',$,'Muro ''A''',$,$,$,$,$,$);");
        assert_eq!(entity.name(), Some("Muro 'A'"));
        assert_eq!(entity.global_id(), Some("g"));
    }
}
