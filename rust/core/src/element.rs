// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Element utilities
//!
//! Property sets, quantity sets, spatial container, type object and
//! predefined type of an object, resolved through the relationship graph.

use std::collections::BTreeMap;
use std::fmt;

use crate::entity::{AttributeValue, Entity};
use crate::model::IfcModel;
use crate::schema;

/// A scalar cell value
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum PropertyValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Integer(i) => Some(*i as f64),
            PropertyValue::Real(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert an attribute, unwrapping typed measures
    pub fn from_attribute(value: &AttributeValue) -> Self {
        match value.untyped() {
            AttributeValue::String(s) => PropertyValue::Text(s.clone()),
            AttributeValue::Integer(i) => PropertyValue::Integer(*i),
            AttributeValue::Float(f) => PropertyValue::Real(*f),
            AttributeValue::Enum(e) => match value.as_bool() {
                Some(b) => PropertyValue::Bool(b),
                None if e == "U" => PropertyValue::Text("UNKNOWN".to_string()),
                None => PropertyValue::Text(e.clone()),
            },
            AttributeValue::EntityRef(id) => PropertyValue::Text(format!("#{}", id)),
            AttributeValue::List(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(PropertyValue::from_attribute)
                    .filter(|v| !v.is_null())
                    .map(|v| v.to_string())
                    .collect();
                if parts.is_empty() {
                    PropertyValue::Null
                } else {
                    PropertyValue::Text(parts.join(", "))
                }
            }
            AttributeValue::Typed(_, _) | AttributeValue::Null | AttributeValue::Derived => {
                PropertyValue::Null
            }
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => Ok(()),
            PropertyValue::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Real(v) => write!(f, "{}", v),
            PropertyValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<Option<&str>> for PropertyValue {
    fn from(value: Option<&str>) -> Self {
        value.map_or(PropertyValue::Null, PropertyValue::from)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Real(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        PropertyValue::Integer(i64::from(value))
    }
}

/// Property name -> value
pub type PropertyMap = BTreeMap<String, PropertyValue>;
/// Set name -> properties
pub type PropertySets = BTreeMap<String, PropertyMap>;

/// Which property set definitions to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsetFilter {
    All,
    PropertiesOnly,
    QuantitiesOnly,
}

impl PsetFilter {
    fn accepts(self, model: &IfcModel, definition: &Entity) -> bool {
        let is_qto = model.is_a(definition, "IfcElementQuantity");
        let is_pset = model.is_a(definition, "IfcPropertySet");
        match self {
            PsetFilter::All => is_qto || is_pset,
            PsetFilter::PropertiesOnly => is_pset,
            PsetFilter::QuantitiesOnly => is_qto,
        }
    }
}

fn read_property(model: &IfcModel, property: &Entity, out: &mut PropertyMap) {
    let Some(name) = property.get_string(0) else {
        return;
    };
    let class = property.type_name.as_str();
    // single, enumerated and list values all sit at index 2
    let value = if schema::is_subtype_of(class, "IfcPropertySingleValue")
        || schema::is_subtype_of(class, "IfcPropertyEnumeratedValue")
        || schema::is_subtype_of(class, "IfcPropertyListValue")
    {
        property.get(2).map(PropertyValue::from_attribute)
    } else if schema::is_subtype_of(class, "IfcPropertyBoundedValue") {
        let upper = property.get(2).map(PropertyValue::from_attribute).unwrap_or_default();
        let lower = property.get(3).map(PropertyValue::from_attribute).unwrap_or_default();
        if upper.is_null() && lower.is_null() {
            Some(PropertyValue::Null)
        } else {
            Some(PropertyValue::Text(format!("{}..{}", lower, upper)))
        }
    } else if schema::is_subtype_of(class, "IfcPhysicalSimpleQuantity") {
        property.get(3).map(PropertyValue::from_attribute)
    } else if schema::is_subtype_of(class, "IfcComplexProperty") {
        let mut nested = PropertyMap::new();
        for id in property.get_refs(3) {
            if let Some(child) = model.get(id) {
                read_property(model, child, &mut nested);
            }
        }
        flatten_into(name, nested, out);
        return;
    } else if schema::is_subtype_of(class, "IfcPhysicalComplexQuantity") {
        let mut nested = PropertyMap::new();
        for id in property.get_refs(2) {
            if let Some(child) = model.get(id) {
                read_property(model, child, &mut nested);
            }
        }
        flatten_into(name, nested, out);
        return;
    } else {
        None
    };
    out.insert(name.to_string(), value.unwrap_or_default());
}

fn flatten_into(prefix: &str, nested: PropertyMap, out: &mut PropertyMap) {
    for (key, value) in nested {
        out.insert(format!("{}.{}", prefix, key), value);
    }
}

/// Properties of a single IfcPropertySet or IfcElementQuantity
pub fn read_definition(model: &IfcModel, definition: &Entity) -> PropertyMap {
    let mut props = PropertyMap::new();
    let index = if model.is_a(definition, "IfcElementQuantity") {
        5
    } else {
        4
    };
    for id in definition.get_refs(index) {
        if let Some(property) = model.get(id) {
            read_property(model, property, &mut props);
        }
    }
    props
}

fn merge_definition(model: &IfcModel, definition: &Entity, filter: PsetFilter, out: &mut PropertySets) {
    if !filter.accepts(model, definition) {
        return;
    }
    let name = definition.name().unwrap_or_default().to_string();
    let props = read_definition(model, definition);
    out.entry(name).or_default().extend(props);
}

/// Property and quantity sets of an object
///
/// Sets inherited from the type object are read first and overridden by
/// values assigned to the occurrence.
pub fn get_psets(model: &IfcModel, id: u32, filter: PsetFilter) -> PropertySets {
    let mut sets = PropertySets::new();
    let Some(entity) = model.get(id) else {
        return sets;
    };

    if model.is_a(entity, "IfcTypeObject") {
        for def_id in entity.get_refs(5) {
            if let Some(definition) = model.get(def_id) {
                merge_definition(model, definition, filter, &mut sets);
            }
        }
        return sets;
    }

    if let Some(type_obj) = get_type(model, id) {
        for def_id in type_obj.get_refs(5) {
            if let Some(definition) = model.get(def_id) {
                merge_definition(model, definition, filter, &mut sets);
            }
        }
    }

    for rel in model.inverse_of_type(id, "IfcRelDefinesByProperties") {
        if !rel.get_refs(4).contains(&id) {
            continue;
        }
        let Some(definition) = rel.get_ref(5).and_then(|def_id| model.get(def_id)) else {
            continue;
        };
        merge_definition(model, definition, filter, &mut sets);
    }
    sets
}

/// Type object assigned through IfcRelDefinesByType
pub fn get_type(model: &IfcModel, id: u32) -> Option<&Entity> {
    model
        .inverse_of_type(id, "IfcRelDefinesByType")
        .into_iter()
        .find(|rel| rel.get_refs(4).contains(&id))
        .and_then(|rel| rel.get_ref(5))
        .and_then(|type_id| model.get(type_id))
}

/// Occurrences typed by a type object
pub fn get_type_occurrences(model: &IfcModel, type_id: u32) -> Vec<u32> {
    let mut ids: Vec<u32> = model
        .inverse_of_type(type_id, "IfcRelDefinesByType")
        .into_iter()
        .filter(|rel| rel.get_ref(5) == Some(type_id))
        .flat_map(|rel| rel.get_refs(4))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Object this one is aggregated into
pub fn get_aggregate(model: &IfcModel, id: u32) -> Option<&Entity> {
    model
        .inverse_of_type(id, "IfcRelAggregates")
        .into_iter()
        .find(|rel| rel.get_refs(5).contains(&id))
        .and_then(|rel| rel.get_ref(4))
        .and_then(|parent| model.get(parent))
}

/// Spatial structure element containing the object
///
/// Parts of an aggregate report the container of the whole.
pub fn get_container(model: &IfcModel, id: u32) -> Option<&Entity> {
    let mut current = id;
    for _ in 0..32 {
        let direct = model
            .inverse_of_type(current, "IfcRelContainedInSpatialStructure")
            .into_iter()
            .find(|rel| rel.get_refs(4).contains(&current))
            .and_then(|rel| rel.get_ref(5))
            .and_then(|container| model.get(container));
        if direct.is_some() {
            return direct;
        }
        let parent = get_aggregate(model, current)?;
        if model.is_a(parent, "IfcSpatialElement") {
            return None;
        }
        current = parent.id;
    }
    None
}

/// Children declared through IfcRelAggregates
pub fn get_decomposition(model: &IfcModel, id: u32) -> Vec<u32> {
    model
        .inverse_of_type(id, "IfcRelAggregates")
        .into_iter()
        .filter(|rel| rel.get_ref(4) == Some(id))
        .flat_map(|rel| rel.get_refs(5))
        .collect()
}

fn own_predefined_type(model: &IfcModel, entity: &Entity) -> Option<String> {
    let index = schema::attribute_index(&entity.type_name, "PredefinedType")?;
    let value = entity.get_enum(index)?;
    if value == "USERDEFINED" {
        let user_index = if model.is_a(entity, "IfcTypeObject") {
            schema::attribute_index(&entity.type_name, "ElementType")
        } else {
            schema::attribute_index(&entity.type_name, "ObjectType")
        };
        return user_index
            .and_then(|i| entity.get_string(i))
            .map(str::to_string)
            .or_else(|| Some(value.to_string()));
    }
    Some(value.to_string())
}

/// PredefinedType of an occurrence, falling back to its type object
///
/// `USERDEFINED` resolves to ObjectType (ElementType on types).
pub fn get_predefined_type(model: &IfcModel, id: u32) -> Option<String> {
    let entity = model.get(id)?;
    let own = own_predefined_type(model, entity);
    match own.as_deref() {
        Some("NOTDEFINED") | None if !model.is_a(entity, "IfcTypeObject") => get_type(model, id)
            .and_then(|type_obj| own_predefined_type(model, type_obj))
            .or(own),
        _ => own,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"DATA;
#1=IFCPROJECT('0YvctVUKr0kugbFTf53O9L',$,'Demo',$,$,$,$,$,$);
#2=IFCBUILDINGSTOREY('1YvctVUKr0kugbFTf53O9L',$,'Level 1',$,$,$,$,$,.ELEMENT.,3.);
#3=IFCWALL('2YvctVUKr0kugbFTf53O9L',$,'Wall A',$,'Custom',$,$,$,.USERDEFINED.);
#4=IFCWALL('3YvctVUKr0kugbFTf53O9L',$,'Wall B',$,$,$,$,$,$);
#5=IFCWALLTYPE('4YvctVUKr0kugbFTf53O9L',$,'Basic 200',$,$,(#20),$,$,$,.SOLIDWALL.);
#6=IFCRELDEFINESBYTYPE('5YvctVUKr0kugbFTf53O9L',$,$,$,(#3,#4),#5);
#7=IFCRELCONTAINEDINSPATIALSTRUCTURE('6YvctVUKr0kugbFTf53O9L',$,$,$,(#3,#4,#30),#2);
#10=IFCPROPERTYSINGLEVALUE('IsExternal',$,IFCBOOLEAN(.T.),$);
#11=IFCPROPERTYSINGLEVALUE('FireRating',$,IFCLABEL('REI 60'),$);
#12=IFCPROPERTYENUMERATEDVALUE('Status',$,(IFCLABEL('NEW'),IFCLABEL('TEMPORARY')),$);
#13=IFCPROPERTYSET('7YvctVUKr0kugbFTf53O9L',$,'Pset_WallCommon',$,(#10,#11,#12));
#14=IFCRELDEFINESBYPROPERTIES('8YvctVUKr0kugbFTf53O9L',$,$,$,(#3),#13);
#15=IFCQUANTITYLENGTH('Length',$,$,5000.,$);
#16=IFCQUANTITYAREA('NetSideArea',$,$,14.5,$);
#17=IFCELEMENTQUANTITY('9YvctVUKr0kugbFTf53O9L',$,'Qto_WallBaseQuantities',$,$,(#15,#16));
#18=IFCRELDEFINESBYPROPERTIES('AYvctVUKr0kugbFTf53O9L',$,$,$,(#3,#4),#17);
#19=IFCPROPERTYSINGLEVALUE('IsExternal',$,IFCBOOLEAN(.F.),$);
#20=IFCPROPERTYSET('BYvctVUKr0kugbFTf53O9L',$,'Pset_WallCommon',$,(#19,#21));
#21=IFCPROPERTYSINGLEVALUE('LoadBearing',$,IFCBOOLEAN(.T.),$);
#30=IFCELEMENTASSEMBLY('CYvctVUKr0kugbFTf53O9L',$,'Truss',$,$,$,$,$,$,$);
#31=IFCBEAM('DYvctVUKr0kugbFTf53O9L',$,'Chord',$,$,$,$,$,$);
#32=IFCRELAGGREGATES('EYvctVUKr0kugbFTf53O9L',$,$,$,#30,(#31));
ENDSEC;
"#;

    fn model() -> IfcModel {
        IfcModel::parse(MODEL).unwrap()
    }

    #[test]
    fn test_occurrence_overrides_type_values() {
        let model = model();
        let psets = get_psets(&model, 3, PsetFilter::PropertiesOnly);
        let common = &psets["Pset_WallCommon"];
        assert_eq!(common["IsExternal"], PropertyValue::Bool(true));
        assert_eq!(common["LoadBearing"], PropertyValue::Bool(true));
        assert_eq!(common["FireRating"], PropertyValue::from("REI 60"));
        assert_eq!(common["Status"], PropertyValue::from("NEW, TEMPORARY"));
        assert!(!psets.contains_key("Qto_WallBaseQuantities"));

        let inherited = get_psets(&model, 4, PsetFilter::PropertiesOnly);
        assert_eq!(inherited["Pset_WallCommon"]["IsExternal"], PropertyValue::Bool(false));
    }

    #[test]
    fn test_quantities_only() {
        let model = model();
        let qtos = get_psets(&model, 4, PsetFilter::QuantitiesOnly);
        assert_eq!(qtos.len(), 1);
        assert_eq!(qtos["Qto_WallBaseQuantities"]["NetSideArea"], PropertyValue::Real(14.5));
        assert_eq!(get_psets(&model, 3, PsetFilter::All).len(), 2);
        assert!(get_psets(&model, 999, PsetFilter::All).is_empty());
    }

    #[test]
    fn test_container_type_and_aggregate() {
        let model = model();
        assert_eq!(get_container(&model, 3).and_then(|c| c.name()), Some("Level 1"));
        assert_eq!(get_container(&model, 31).map(|c| c.id), Some(2));
        assert!(get_container(&model, 2).is_none());
        assert_eq!(get_type(&model, 4).map(|t| t.id), Some(5));
        assert_eq!(get_type_occurrences(&model, 5), vec![3, 4]);
        assert_eq!(get_decomposition(&model, 30), vec![31]);
    }

    #[test]
    fn test_predefined_type() {
        let model = model();
        assert_eq!(get_predefined_type(&model, 3).as_deref(), Some("Custom"));
        assert_eq!(get_predefined_type(&model, 4).as_deref(), Some("SOLIDWALL"));
        assert_eq!(get_predefined_type(&model, 5).as_deref(), Some("SOLIDWALL"));
        assert_eq!(get_predefined_type(&model, 2), None);
    }

    #[test]
    fn test_property_value_display() {
        assert_eq!(PropertyValue::Bool(true).to_string(), "True");
        assert_eq!(PropertyValue::Real(2.5).to_string(), "2.5");
        assert_eq!(PropertyValue::Null.to_string(), "");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_property_value_serializes_untagged() {
        let json = serde_json::to_string(&vec![
            PropertyValue::Null,
            PropertyValue::Bool(false),
            PropertyValue::Real(1.5),
            PropertyValue::from("x"),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,false,1.5,"x"]"#);
    }
}
