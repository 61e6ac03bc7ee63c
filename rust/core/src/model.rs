// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory IFC model
//!
//! Owns every DATA record, a type index and an inverse reference index, and
//! supports the small set of edits the scheduling tools need.

use std::borrow::Cow;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::entity::{AttributeValue, Entity};
use crate::error::{Error, Result};
use crate::parser::{parse_entity, parse_header, EntityScanner, StepHeader};
use crate::schema;
use crate::writer::write_step;

/// Schema family declared in FILE_SCHEMA
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SchemaVersion {
    Ifc2x3,
    Ifc4,
    Ifc4x3,
    Other(String),
}

impl SchemaVersion {
    pub fn from_identifier(identifier: &str) -> Self {
        let upper = identifier.trim().to_ascii_uppercase();
        if upper.starts_with("IFC4X3") {
            Self::Ifc4x3
        } else if upper.starts_with("IFC4") {
            Self::Ifc4
        } else if upper.starts_with("IFC2X3") {
            Self::Ifc2x3
        } else {
            Self::Other(upper)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Ifc2x3 => "IFC2X3",
            Self::Ifc4 => "IFC4",
            Self::Ifc4x3 => "IFC4X3",
            Self::Other(s) => s,
        }
    }

    /// One of the buildingSMART releases the application understands
    pub fn is_official(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct IfcModel {
    header: StepHeader,
    schema: SchemaVersion,
    entities: BTreeMap<u32, Entity>,
    /// upper case type name -> ids
    by_type: FxHashMap<String, Vec<u32>>,
    /// referenced id -> referencing ids
    inverse: FxHashMap<u32, SmallVec<[u32; 4]>>,
}

impl fmt::Debug for IfcModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IfcModel")
            .field("schema", &self.schema)
            .field("entities", &self.entities.len())
            .finish()
    }
}

impl IfcModel {
    /// Parse a complete STEP file
    pub fn parse(content: &str) -> Result<Self> {
        let header = parse_header(content);
        let schema = header
            .schema_identifiers
            .first()
            .map(|s| SchemaVersion::from_identifier(s))
            .unwrap_or_else(|| SchemaVersion::Other(String::new()));

        let mut model = Self {
            header,
            schema,
            entities: BTreeMap::new(),
            by_type: FxHashMap::default(),
            inverse: FxHashMap::default(),
        };

        let mut scanner = EntityScanner::new(content);
        while let Some((_, _, start, end)) = scanner.next_entity() {
            let (id, type_name, tokens) = parse_entity(&content[start..end])
                .map_err(|e| Error::parse(start, e.to_string()))?;
            let attributes = tokens.iter().map(AttributeValue::from_token).collect();
            model.insert(Entity::new(id, type_name, attributes));
        }

        if model.entities.is_empty() {
            return Err(Error::EmptyModel);
        }
        Ok(model)
    }

    /// Parse raw upload bytes, replacing invalid UTF-8
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::parse(&String::from_utf8_lossy(bytes))
    }

    pub fn header(&self) -> &StepHeader {
        &self.header
    }

    pub fn schema(&self) -> &SchemaVersion {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn get(&self, id: u32) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity(&self, id: u32) -> Result<&Entity> {
        self.get(id).ok_or(Error::EntityNotFound(id))
    }

    /// Entity of id `id` that must be an instance of `class`
    pub fn entity_of(&self, id: u32, class: &str) -> Result<&Entity> {
        let entity = self.entity(id)?;
        if self.is_a(entity, class) {
            Ok(entity)
        } else {
            Err(Error::UnexpectedType {
                id,
                expected: class.to_string(),
                actual: self.class_name(entity).into_owned(),
            })
        }
    }

    /// All instances of `class` including subtypes, ordered by id
    pub fn by_type(&self, class: &str) -> Vec<&Entity> {
        let mut ids: Vec<u32> = self
            .by_type
            .iter()
            .filter(|(type_name, _)| schema::is_subtype_of(type_name, class))
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        ids.sort_unstable();
        ids.iter().filter_map(|id| self.entities.get(id)).collect()
    }

    pub fn is_a(&self, entity: &Entity, class: &str) -> bool {
        schema::is_subtype_of(&entity.type_name, class)
    }

    pub fn class_name(&self, entity: &Entity) -> Cow<'static, str> {
        schema::canonical_name(&entity.type_name)
    }

    pub fn find_by_global_id(&self, global_id: &str) -> Option<&Entity> {
        self.entities
            .values()
            .find(|e| e.global_id() == Some(global_id) && schema::is_subtype_of(&e.type_name, "IfcRoot"))
    }

    pub fn project(&self) -> Option<&Entity> {
        self.by_type("IfcProject").into_iter().next()
    }

    /// Instance count per class (PascalCase), largest first
    pub fn entity_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = self
            .by_type
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(type_name, ids)| (schema::canonical_name(type_name).into_owned(), ids.len()))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    /// Ids of entities holding a reference to `id`
    pub fn inverse_ids(&self, id: u32) -> &[u32] {
        self.inverse.get(&id).map(|ids| ids.as_slice()).unwrap_or(&[])
    }

    /// Entities referencing `id` that are instances of `class`
    pub fn inverse_of_type(&self, id: u32, class: &str) -> Vec<&Entity> {
        self.inverse_ids(id)
            .iter()
            .filter_map(|ref_id| self.entities.get(ref_id))
            .filter(|e| self.is_a(e, class))
            .collect()
    }

    fn next_id(&self) -> u32 {
        self.entities.keys().next_back().map_or(1, |id| id + 1)
    }

    fn index(&mut self, entity: &Entity) {
        self.by_type
            .entry(entity.type_name.clone())
            .or_default()
            .push(entity.id);
        for target in entity.references() {
            self.inverse.entry(target).or_default().push(entity.id);
        }
    }

    fn unindex(&mut self, entity: &Entity) {
        if let Some(ids) = self.by_type.get_mut(&entity.type_name) {
            ids.retain(|id| *id != entity.id);
        }
        for target in entity.references() {
            if let Some(sources) = self.inverse.get_mut(&target) {
                sources.retain(|id| *id != entity.id);
            }
        }
    }

    fn insert(&mut self, entity: Entity) {
        if let Some(previous) = self.entities.remove(&entity.id) {
            self.unindex(&previous);
        }
        self.index(&entity);
        self.entities.insert(entity.id, entity);
    }

    /// Append a new record and return its id
    pub fn create_entity(&mut self, type_name: &str, attributes: Vec<AttributeValue>) -> u32 {
        let id = self.next_id();
        self.insert(Entity::new(id, type_name, attributes));
        id
    }

    /// Replace one attribute, keeping the indexes in sync
    pub fn set_attribute(&mut self, id: u32, index: usize, value: AttributeValue) -> Result<()> {
        let mut entity = self.entity(id)?.clone();
        let slot = entity
            .attributes
            .get_mut(index)
            .ok_or_else(|| Error::InvalidAttribute {
                id,
                index,
                message: "index out of range".to_string(),
            })?;
        *slot = value;
        self.insert(entity);
        Ok(())
    }

    /// Append a reference to a list attribute; `$` becomes a one item list
    pub fn push_reference(&mut self, id: u32, index: usize, target: u32) -> Result<()> {
        let current = self
            .entity(id)?
            .get(index)
            .cloned()
            .ok_or_else(|| Error::InvalidAttribute {
                id,
                index,
                message: "index out of range".to_string(),
            })?;
        let list = match current {
            AttributeValue::List(mut items) => {
                if !items.iter().any(|item| item.as_entity_ref() == Some(target)) {
                    items.push(AttributeValue::EntityRef(target));
                }
                items
            }
            AttributeValue::Null => vec![AttributeValue::EntityRef(target)],
            _ => {
                return Err(Error::InvalidAttribute {
                    id,
                    index,
                    message: "not a list".to_string(),
                })
            }
        };
        self.set_attribute(id, index, AttributeValue::List(list))
    }

    /// Delete a record and every reference to it
    ///
    /// Relationships left without a relating or related side are deleted as
    /// well. Returns the ids that were removed.
    pub fn remove_entity(&mut self, id: u32) -> Result<Vec<u32>> {
        let mut removed = Vec::new();
        let mut pending = VecDeque::from([id]);
        self.entity(id)?;

        while let Some(current) = pending.pop_front() {
            let Some(entity) = self.entities.remove(&current) else {
                continue;
            };
            self.unindex(&entity);
            removed.push(current);

            let referencing: Vec<u32> = self.inverse_ids(current).to_vec();
            self.inverse.remove(&current);
            for source_id in referencing {
                let Some(mut source) = self.entities.get(&source_id).cloned() else {
                    continue;
                };
                let mut emptied = false;
                for attr in source.attributes.iter_mut() {
                    let had_items = attr.as_list().map_or(false, |items| !items.is_empty());
                    if attr.strip_ref(current) {
                        emptied |= attr.is_null()
                            || (had_items && attr.as_list().map_or(false, |items| items.is_empty()));
                    }
                }
                if emptied && self.is_a(&source, "IfcRelationship") {
                    pending.push_back(source_id);
                } else {
                    self.insert(source);
                }
            }
        }
        Ok(removed)
    }

    /// Serialize back to STEP
    pub fn to_step(&self) -> String {
        write_step(&self.header, self.entities.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('ViewDefinition [ReferenceView]'),'2;1');
FILE_NAME('demo.ifc','2025-01-01T00:00:00',(''),(''),'','','');
FILE_SCHEMA(('IFC4X3_ADD2'));
ENDSEC;
DATA;
#1=IFCPROJECT('0YvctVUKr0kugbFTf53O9L',$,'Demo',$,$,$,$,$,$);
#2=IFCBUILDINGSTOREY('1YvctVUKr0kugbFTf53O9L',$,'Level 1',$,$,$,$,$,.ELEMENT.,3.);
#3=IFCWALL('2YvctVUKr0kugbFTf53O9L',$,'Wall A',$,$,$,$,$,.STANDARD.);
#4=IFCWALLSTANDARDCASE('3YvctVUKr0kugbFTf53O9L',$,'Wall B',$,$,$,$,$,$);
#5=IFCSLAB('0ZvctVUKr0kugbFTf53O9L',$,'Slab',$,$,$,$,$,.FLOOR.);
#6=IFCRELCONTAINEDINSPATIALSTRUCTURE('1ZvctVUKr0kugbFTf53O9L',$,$,$,(#3,#4,#5),#2);
#7=IFCRELAGGREGATES('2ZvctVUKr0kugbFTf53O9L',$,$,$,#1,(#2));
ENDSEC;
END-ISO-10303-21;
"#;

    #[test]
    fn test_parse_and_index() {
        let model = IfcModel::parse(MODEL).unwrap();
        assert_eq!(model.schema(), &SchemaVersion::Ifc4x3);
        assert_eq!(model.len(), 7);

        let walls = model.by_type("IfcWall");
        assert_eq!(walls.iter().map(|e| e.id).collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(model.by_type("IFCWALLSTANDARDCASE").len(), 1);
        assert_eq!(model.by_type("IfcBuiltElement").len(), 3);
        assert_eq!(model.inverse_ids(3), &[6]);
        assert_eq!(model.project().map(|p| p.id), Some(1));
        assert_eq!(
            model.find_by_global_id("0ZvctVUKr0kugbFTf53O9L").map(|e| e.id),
            Some(5)
        );
        assert_eq!(model.class_name(model.get(6).unwrap()), "IfcRelContainedInSpatialStructure");

        let counts = model.entity_counts();
        assert_eq!(counts.len(), 7);
        assert!(counts.iter().all(|(_, n)| *n == 1));
    }

    #[test]
    fn test_schema_detection() {
        assert_eq!(SchemaVersion::from_identifier("IFC4"), SchemaVersion::Ifc4);
        assert_eq!(SchemaVersion::from_identifier("ifc2x3"), SchemaVersion::Ifc2x3);
        assert!(!SchemaVersion::from_identifier("CONFIG_CONTROL_DESIGN").is_official());
    }

    #[test]
    fn test_empty_and_broken_files() {
        assert_eq!(IfcModel::parse("ISO-10303-21;\nDATA;\nENDSEC;").unwrap_err(), Error::EmptyModel);
        let broken = "DATA;\n#1=IFCWALL('a',;\n";
        assert!(matches!(IfcModel::parse(broken), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_create_and_push_reference() {
        let mut model = IfcModel::parse(MODEL).unwrap();
        let id = model.create_entity("IfcBeam", vec!["g".into(), AttributeValue::Null]);
        assert_eq!(id, 8);
        model.push_reference(6, 4, id).unwrap();
        assert_eq!(model.get(6).unwrap().get_refs(4), vec![3, 4, 5, 8]);
        assert_eq!(model.inverse_ids(8), &[6]);
        assert!(model.push_reference(6, 5, id).is_err());
        assert!(model.set_attribute(6, 40, AttributeValue::Null).is_err());
    }

    #[test]
    fn test_remove_cascades_to_empty_relationships() {
        let mut model = IfcModel::parse(MODEL).unwrap();
        model.remove_entity(3).unwrap();
        assert_eq!(model.get(6).unwrap().get_refs(4), vec![4, 5]);

        let removed = model.remove_entity(2).unwrap();
        assert_eq!(removed, vec![2, 6, 7]);
        assert!(model.get(6).is_none());
        assert!(model.inverse_ids(4).is_empty());
        assert!(model.remove_entity(99).is_err());
    }

    #[test]
    fn test_to_step_reparses() {
        let mut model = IfcModel::parse(MODEL).unwrap();
        model.set_attribute(3, 2, "Muro 'è'".into()).unwrap();
        let text = model.to_step();
        assert!(text.contains("FILE_SCHEMA(('IFC4X3_ADD2'));"));
        let reparsed = IfcModel::parse(&text).unwrap();
        assert_eq!(reparsed.len(), model.len());
        assert_eq!(reparsed.get(3).unwrap().name(), Some("Muro 'è'"));
    }
}
