// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Object extraction
//!
//! Flattens the objects of a class into [`ObjectData`] records (base
//! attributes plus property and quantity sets) and from there into the
//! property, quantity and structure views.

use std::collections::{BTreeMap, BTreeSet};

use bim45d_core::element::{self, PropertySets, PsetFilter};
use bim45d_core::{schema, Entity, IfcModel, PropertyValue, SchemaVersion};
use rayon::prelude::*;
use serde::Serialize;

use crate::table::{Table, ALL};

/// Base columns of every object table
pub const BASE_COLUMNS: [&str; 7] = [
    "ExpressId",
    "GlobalId",
    "Class",
    "PredefinedType",
    "Name",
    "Level",
    "Type",
];

/// Columns of the long quantities table
pub const QUANTITY_COLUMNS: [&str; 10] = [
    "ExpressId",
    "GlobalId",
    "Class",
    "PredefinedType",
    "Name",
    "Level",
    "Type",
    "QuantitySet",
    "QuantityName",
    "QuantityValue",
];

/// Descriptive columns kept in the quantities view
pub const QUANTITY_FIXED_COLUMNS: [&str; 6] =
    ["GlobalId", "Class", "PredefinedType", "Name", "Level", "Type"];

const STRUCTURAL_CLASSES: [&str; 16] = [
    "IfcBeam",
    "IfcColumn",
    "IfcSlab",
    "IfcWall",
    "IfcWallStandardCase",
    "IfcFooting",
    "IfcMember",
    "IfcReinforcingBar",
    "IfcReinforcingMesh",
    "IfcTendon",
    "IfcTendonAnchor",
    "IfcStructuralConnection",
    "IfcStructuralCurveMember",
    "IfcStructuralSurfaceMember",
    "IfcRamp",
    "IfcStair",
];

/// Classes scanned for the model properties table
///
/// IFC4X3 adds IfcBearing; every other schema uses the IFC4 list.
pub fn target_classes(schema: &SchemaVersion) -> Vec<&'static str> {
    let mut classes = STRUCTURAL_CLASSES.to_vec();
    if *schema == SchemaVersion::Ifc4x3 {
        classes.push("IfcBearing");
    }
    classes
}

/// One object with its resolved context and property data
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectData {
    pub express_id: u32,
    pub global_id: Option<String>,
    pub class: String,
    pub predefined_type: Option<String>,
    pub name: Option<String>,
    pub level: Option<String>,
    #[serde(rename = "Type")]
    pub type_name: Option<String>,
    pub quantity_sets: PropertySets,
    pub property_sets: PropertySets,
}

impl ObjectData {
    pub fn from_entity(model: &IfcModel, entity: &Entity) -> Self {
        let id = entity.id;
        Self {
            express_id: id,
            global_id: entity.global_id().map(str::to_string),
            class: model.class_name(entity).into_owned(),
            predefined_type: element::get_predefined_type(model, id),
            name: entity.name().map(str::to_string),
            level: element::get_container(model, id)
                .and_then(|c| c.name())
                .map(str::to_string),
            type_name: element::get_type(model, id)
                .and_then(|t| t.name())
                .map(str::to_string),
            quantity_sets: element::get_psets(model, id, PsetFilter::QuantitiesOnly),
            property_sets: element::get_psets(model, id, PsetFilter::PropertiesOnly),
        }
    }

    /// `Pset.Prop` names carried by this object
    pub fn attribute_names(&self) -> impl Iterator<Item = String> + '_ {
        self.quantity_sets
            .iter()
            .chain(self.property_sets.iter())
            .flat_map(|(set, props)| props.keys().map(move |p| format!("{}.{}", set, p)))
    }

    fn base_value(&self, column: &str) -> PropertyValue {
        match column {
            "ExpressId" => PropertyValue::from(self.express_id),
            "GlobalId" => self.global_id.as_deref().into(),
            "Class" => self.class.as_str().into(),
            "PredefinedType" => self.predefined_type.as_deref().into(),
            "Name" => self.name.as_deref().into(),
            "Level" => self.level.as_deref().into(),
            "Type" => self.type_name.as_deref().into(),
            _ => PropertyValue::Null,
        }
    }
}

/// Extract every instance of `class` (subtypes included)
///
/// Returns the objects ordered by id and the sorted `Pset.Prop` names
/// found across them.
pub fn objects_data_by_class(model: &IfcModel, class: &str) -> (Vec<ObjectData>, Vec<String>) {
    let entities = model.by_type(class);
    let objects: Vec<ObjectData> = entities
        .par_iter()
        .map(|entity| ObjectData::from_entity(model, entity))
        .collect();
    let names: BTreeSet<String> = objects.iter().flat_map(ObjectData::attribute_names).collect();
    tracing::debug!(class, objects = objects.len(), attributes = names.len(), "Extracted objects");
    (objects, names.into_iter().collect())
}

/// Value of a base attribute or a `Pset.Prop` path
///
/// Property sets are searched before quantity sets; exact set names win over
/// case-insensitive matches.
pub fn attribute_value(object: &ObjectData, attribute: &str) -> PropertyValue {
    let Some((set_name, prop)) = attribute.split_once('.') else {
        return object.base_value(attribute);
    };
    let lookup = |sets: &PropertySets, exact: bool| {
        sets.iter()
            .find(|(name, _)| {
                if exact {
                    name.as_str() == set_name
                } else {
                    name.eq_ignore_ascii_case(set_name)
                }
            })
            .map(|(_, props)| props.get(prop).cloned().unwrap_or_default())
    };
    lookup(&object.property_sets, true)
        .or_else(|| lookup(&object.quantity_sets, true))
        .or_else(|| lookup(&object.property_sets, false))
        .or_else(|| lookup(&object.quantity_sets, false))
        .unwrap_or_default()
}

/// Wide table: base columns followed by one column per attribute
pub fn properties_table(objects: &[ObjectData], attributes: &[String]) -> Table {
    let mut table = Table::new(BASE_COLUMNS.iter().map(|c| c.to_string()).chain(attributes.iter().cloned()));
    for object in objects {
        let row = table
            .columns
            .iter()
            .map(|column| attribute_value(object, column))
            .collect();
        table.push_row(row);
    }
    table
}

/// Properties table over the structural target classes of the schema
///
/// Each object appears once, under the most specific target class it is an
/// instance of: an IfcWallStandardCase is listed as IfcWallStandardCase, an
/// IfcSlabStandardCase as IfcSlab.
pub fn model_properties_table(model: &IfcModel) -> Table {
    let targets = target_classes(model.schema());
    let mut tables = Vec::new();
    for class in &targets {
        let (mut objects, _) = objects_data_by_class(model, class);
        objects.retain(|o| {
            model
                .get(o.express_id)
                .is_some_and(|entity| target_class(model, entity, &targets) == Some(*class))
        });
        if objects.is_empty() {
            continue;
        }
        let attributes: Vec<String> = objects
            .iter()
            .flat_map(ObjectData::attribute_names)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        for object in objects.iter_mut() {
            object.class = class.to_string();
        }
        tables.push(properties_table(&objects, &attributes));
    }
    Table::concat(tables)
}

/// Deepest class of `targets` the entity is an instance of
fn target_class<'a>(model: &IfcModel, entity: &Entity, targets: &[&'a str]) -> Option<&'a str> {
    targets
        .iter()
        .copied()
        .filter(|class| model.is_a(entity, class))
        .max_by_key(|class| schema::ancestry(class).len())
}

/// Long quantities table: one row per object quantity
///
/// Objects and types are read class by class in sorted class order.
pub fn quantities_table(model: &IfcModel) -> Table {
    let mut by_class: BTreeMap<String, Vec<&Entity>> = BTreeMap::new();
    for entity in model.entities() {
        if model.is_a(entity, "IfcObjectDefinition") {
            by_class
                .entry(model.class_name(entity).into_owned())
                .or_default()
                .push(entity);
        }
    }

    let mut table = Table::new(QUANTITY_COLUMNS);
    for entities in by_class.values() {
        let objects: Vec<ObjectData> = entities
            .par_iter()
            .map(|entity| ObjectData::from_entity(model, entity))
            .collect();
        for object in &objects {
            let base: Vec<PropertyValue> = BASE_COLUMNS.iter().map(|c| object.base_value(c)).collect();
            for (set, quantities) in &object.quantity_sets {
                for (name, value) in quantities {
                    let mut row = base.clone();
                    row.push(set.as_str().into());
                    row.push(name.as_str().into());
                    row.push(value.clone());
                    table.push_row(row);
                }
            }
        }
    }
    table
}

/// Apply the Level, Class and Type filters in that order; `All` skips one
pub fn filter_level_class_type(table: &Table, level: &str, class: &str, type_name: &str) -> Table {
    table
        .filter_eq("Level", level)
        .filter_eq("Class", class)
        .filter_eq("Type", type_name)
}

/// Type selector options, narrowed to the chosen class
pub fn type_options(table: &Table, class: &str) -> Vec<String> {
    if class == ALL {
        table.options("Type")
    } else {
        table.filter_eq("Class", class).options("Type")
    }
}

/// Quantities view: descriptive columns, the quantity identity and the
/// numeric columns, closed by a `TOTAL` row
pub fn quantities_view(table: &Table) -> Table {
    let mut columns: Vec<String> = QUANTITY_FIXED_COLUMNS
        .iter()
        .chain(["QuantitySet", "QuantityName"].iter())
        .filter(|c| table.has_column(c))
        .map(|c| c.to_string())
        .collect();
    let fixed = columns.clone();
    let numeric: Vec<String> = table
        .numeric_columns()
        .into_iter()
        .filter(|c| c != "ExpressId" && !fixed.contains(c))
        .collect();
    columns.extend(numeric);
    table.select_existing(&columns).with_total_row(&fixed)
}

/// Distribution of one column for the properties review
pub fn value_distribution(table: &Table, column: &str) -> Table {
    let mut out = Table::new([column, "Count"]);
    for (value, count) in table.value_counts(column) {
        out.push_row(vec![value, PropertyValue::from(count as i64)]);
    }
    out
}

/// `{class: {set: [property]}}` sampled from the first instance of each
/// class in the file
///
/// Empty for schemas other than IFC2X3, IFC4 and IFC4X3.
pub fn ifc_structure(model: &IfcModel) -> BTreeMap<String, BTreeMap<String, Vec<String>>> {
    let mut structure = BTreeMap::new();
    if !model.schema().is_official() {
        return structure;
    }
    let mut first: BTreeMap<String, u32> = BTreeMap::new();
    for entity in model.entities() {
        first
            .entry(model.class_name(entity).into_owned())
            .or_insert(entity.id);
    }
    for (class, id) in first {
        let sets = element::get_psets(model, id, PsetFilter::All)
            .into_iter()
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, props)| (name, props.into_keys().collect()))
            .collect();
        structure.insert(class, sets);
    }
    structure
}

/// Header and project summary shown after upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectInfo {
    pub schema: String,
    pub file_name: Option<String>,
    pub originating_system: Option<String>,
    pub entity_count: usize,
    pub project_id: Option<u32>,
    pub global_id: Option<String>,
    pub name: Option<String>,
    pub long_name: Option<String>,
    pub description: Option<String>,
    pub phase: Option<String>,
}

pub fn project_info(model: &IfcModel) -> ProjectInfo {
    let project = model.project();
    let text = |attribute: &str| {
        project.and_then(|p| {
            bim45d_core::schema::attribute_index(&p.type_name, attribute)
                .and_then(|i| p.get_string(i))
                .map(str::to_string)
        })
    };
    ProjectInfo {
        schema: model.schema().to_string(),
        file_name: model.header().file_name.clone(),
        originating_system: model.header().originating_system.clone(),
        entity_count: model.len(),
        project_id: project.map(|p| p.id),
        global_id: project.and_then(|p| p.global_id()).map(str::to_string),
        name: project.and_then(|p| p.name()).map(str::to_string),
        long_name: text("LongName"),
        description: text("Description"),
        phase: text("Phase"),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Storey {
    pub id: u32,
    pub storey: Option<String>,
    pub elevation: Option<f64>,
}

/// Building storeys in file order
pub fn storeys(model: &IfcModel) -> Vec<Storey> {
    model
        .by_type("IfcBuildingStorey")
        .into_iter()
        .map(|s| Storey {
            id: s.id,
            storey: s.name().map(str::to_string),
            elevation: bim45d_core::schema::attribute_index(&s.type_name, "Elevation")
                .and_then(|i| s.get_float(i)),
        })
        .collect()
}

/// Classes present in the model, optionally only those under `parent`
pub fn types_in_model(model: &IfcModel, parent: Option<&str>) -> BTreeSet<String> {
    model
        .entities()
        .filter(|e| parent.map_or(true, |p| model.is_a(e, p)))
        .map(|e| model.class_name(e).into_owned())
        .collect()
}

/// Instance count of each class, subtypes included
pub fn type_occurrence<S: AsRef<str>>(model: &IfcModel, types: &[S]) -> BTreeMap<String, usize> {
    types
        .iter()
        .map(|t| (t.as_ref().to_string(), model.by_type(t.as_ref()).len()))
        .collect()
}

/// Chart series sorted by value descending, optionally above a threshold
pub fn x_and_y<K: Clone>(values: &[(K, f64)], higher_than: Option<f64>) -> (Vec<K>, Vec<f64>) {
    let mut sorted: Vec<(K, f64)> = values
        .iter()
        .filter(|(_, v)| higher_than.map_or(true, |h| *v > h))
        .cloned()
        .collect();
    sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    sorted.into_iter().unzip()
}

/// Set names found in `Set.Prop` columns
pub fn qset_columns(table: &Table) -> Vec<String> {
    let sets: BTreeSet<String> = table
        .columns
        .iter()
        .filter_map(|c| c.split_once('.').map(|(set, _)| set.to_string()))
        .collect();
    sets.into_iter().collect()
}

/// Property set names (`Pset_` prefix) found in the columns
pub fn pset_columns(table: &Table) -> Vec<String> {
    qset_columns(table)
        .into_iter()
        .filter(|s| s.starts_with("Pset_"))
        .collect()
}

/// Quantity names of one set found in the columns
pub fn quantities_in(table: &Table, qset: &str) -> Vec<String> {
    let prefix = format!("{}.", qset);
    let names: BTreeSet<String> = table
        .columns
        .iter()
        .filter_map(|c| c.strip_prefix(&prefix).map(str::to_string))
        .collect();
    names.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;

    #[test]
    fn test_objects_by_class() {
        let model = fixture::model();
        let (walls, attributes) = objects_data_by_class(&model, "IfcWall");
        assert_eq!(walls.len(), 2);
        assert_eq!(walls[0].level.as_deref(), Some("Level 0"));
        assert_eq!(walls[0].type_name.as_deref(), Some("RC Wall 300"));
        assert_eq!(walls[0].predefined_type.as_deref(), Some("SOLIDWALL"));
        assert_eq!(walls[1].predefined_type.as_deref(), Some("Retaining"));
        assert!(attributes.contains(&"Pset_WallCommon.FireRating".to_string()));
        assert!(attributes.contains(&"Qto_WallBaseQuantities.NetVolume".to_string()));
    }

    #[test]
    fn test_attribute_value_lookup() {
        let model = fixture::model();
        let (walls, _) = objects_data_by_class(&model, "IfcWall");
        assert_eq!(attribute_value(&walls[0], "Name"), PropertyValue::from("W-01"));
        assert_eq!(
            attribute_value(&walls[0], "pset_wallcommon.FireRating"),
            PropertyValue::from("REI 120")
        );
        assert_eq!(
            attribute_value(&walls[1], "Qto_WallBaseQuantities.Length"),
            PropertyValue::Real(5.0)
        );
        assert!(attribute_value(&walls[1], "Pset_WallCommon.FireRating").is_null());
        assert!(attribute_value(&walls[1], "Missing.Prop").is_null());
    }

    #[test]
    fn test_model_properties_table() {
        let model = fixture::model();
        let table = model_properties_table(&model);
        assert_eq!(&table.columns[..7], &BASE_COLUMNS);
        // 2 walls, 2 beams, column, slab, footing, bearing
        assert_eq!(table.len(), 8);
        assert_eq!(table.distinct("Class").len(), 6);
        assert!(table.has_column("Pset_BeamCommon.Span"));
        let beams = table.filter_eq("Class", "IfcBeam");
        assert_eq!(beams.cell(1, "Name"), Some(&PropertyValue::Null));
    }

    #[test]
    fn test_wall_standard_case_keeps_its_class() {
        let model = IfcModel::parse(
            "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC4'));\nENDSEC;\nDATA;\n\
             #1=IFCWALLSTANDARDCASE('2O2Fr$t4X7Zf8NOew3FLOH',$,'W-SC',$,$,$,$,$,$);\n\
             #2=IFCWALL('2O2Fr$t4X7Zf8NOew3FLOI',$,'W-01',$,$,$,$,$,$);\n\
             ENDSEC;\nEND-ISO-10303-21;\n",
        )
        .unwrap();
        let table = model_properties_table(&model);
        assert_eq!(table.len(), 2);
        let standard = table.filter_eq("Class", "IfcWallStandardCase");
        assert_eq!(standard.len(), 1);
        assert_eq!(standard.cell(0, "Name"), Some(&PropertyValue::from("W-SC")));
        assert_eq!(table.filter_eq("Class", "IfcWall").len(), 1);
    }

    #[test]
    fn test_quantities_table() {
        let model = fixture::model();
        let table = quantities_table(&model);
        assert_eq!(table.columns, QUANTITY_COLUMNS);
        assert_eq!(table.len(), 7);
        assert_eq!(table.cell(0, "Class"), Some(&PropertyValue::from("IfcBeam")));
        let walls = filter_level_class_type(&table, "Level 1", "IfcWall", ALL);
        assert_eq!(walls.len(), 2);
        let view = quantities_view(&walls);
        assert_eq!(view.len(), 3);
        let total = view.rows.last().unwrap();
        assert_eq!(total[view.column_index("GlobalId").unwrap()], PropertyValue::from("TOTAL"));
        assert_eq!(total[view.column_index("QuantityValue").unwrap()], PropertyValue::Real(9.5));
        assert!(!view.has_column("ExpressId"));
        assert_eq!(type_options(&table, "IfcBeam"), vec!["All"]);
    }

    #[test]
    fn test_structure_and_info() {
        let model = fixture::model();
        let structure = ifc_structure(&model);
        let wall = &structure["IfcWall"];
        assert_eq!(wall["Pset_WallCommon"].len(), 3);
        assert!(wall.contains_key("Qto_WallBaseQuantities"));
        assert!(structure["IfcTask"].is_empty());

        let info = project_info(&model);
        assert_eq!(info.schema, "IFC4X3");
        assert_eq!(info.name.as_deref(), Some("Deck Refurbishment"));
        assert_eq!(info.long_name.as_deref(), Some("Viaduct Deck Refurbishment"));
        assert_eq!(info.phase.as_deref(), Some("Design"));

        let levels = storeys(&model);
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[1].elevation, Some(3.5));
    }

    #[test]
    fn test_types_and_series() {
        let model = fixture::model();
        let elements = types_in_model(&model, Some("IfcBuiltElement"));
        assert!(elements.contains("IfcWall") && !elements.contains("IfcTask"));
        let counts = type_occurrence(&model, &["IfcBeam", "IfcWall", "IfcPile"]);
        assert_eq!(counts["IfcBeam"], 2);
        assert_eq!(counts["IfcPile"], 0);

        let (x, y) = x_and_y(&[("a", 1.0), ("b", 3.0), ("c", 0.5)], Some(0.9));
        assert_eq!(x, vec!["b", "a"]);
        assert_eq!(y, vec![3.0, 1.0]);
    }

    #[test]
    fn test_column_helpers() {
        let table = Table::new(["Name", "Pset_A.x", "Qto_B.Length", "Qto_B.Area"]);
        assert_eq!(qset_columns(&table), vec!["Pset_A", "Qto_B"]);
        assert_eq!(pset_columns(&table), vec!["Pset_A"]);
        assert_eq!(quantities_in(&table, "Qto_B"), vec!["Area", "Length"]);
    }
}
