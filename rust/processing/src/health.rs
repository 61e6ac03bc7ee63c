// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model health
//!
//! Structural object counts against the dictionary classes, entity
//! frequency, and a data richness verdict from the ratio of property sets to
//! structural objects. Also hosts the entity inspector.

use bim45d_core::writer::write_value;
use bim45d_core::{schema, AttributeValue, IfcModel, SchemaVersion};
use serde::Serialize;

use crate::dictionary;
use crate::error::Result;
use crate::report::ChartSeries;

pub const TOP_ENTITIES: usize = 10;
const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    DataRich,
    ModeratelyDetailed,
    GeometricallySimple,
}

impl Verdict {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 2.0 {
            Verdict::DataRich
        } else if ratio >= 1.0 {
            Verdict::ModeratelyDetailed
        } else {
            Verdict::GeometricallySimple
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Verdict::DataRich => {
                "The model is data-rich. A high ratio of properties to objects indicates that the elements are well-described and informative."
            }
            Verdict::ModeratelyDetailed => {
                "The model is moderately detailed. Most objects have basic data, but there is room for data enrichment."
            }
            Verdict::GeometricallySimple => {
                "The model is geometrically simple. A low ratio suggests that many objects may be missing crucial data."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassCount {
    pub class: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStats {
    pub schema: String,
    pub schema_warning: Option<String>,
    /// Dictionary classes present in the model, most frequent first
    pub structural: Vec<ClassCount>,
    /// Every class in the file, most frequent first
    pub entities: Vec<ClassCount>,
    pub total: usize,
    pub types: usize,
    pub most_common_name: String,
    pub most_common_count: usize,
    pub least_common_name: String,
    pub least_common_count: usize,
    pub num_property_sets: usize,
    pub property_ratio: f64,
    pub verdict: Verdict,
}

/// Warning shown when the model is not IFC4X3
pub fn schema_warning(model: &IfcModel) -> Option<String> {
    match model.schema() {
        SchemaVersion::Ifc4x3 => None,
        other => Some(format!(
            "Model schema detected: {}. This analyzer is designed for IFC4X3 and will use the IFC4x3 dictionary.",
            other
        )),
    }
}

pub fn health_stats(model: &IfcModel) -> HealthStats {
    let mut structural: Vec<ClassCount> = dictionary::classes()
        .into_iter()
        .map(|class| ClassCount {
            class: class.to_string(),
            count: model.by_type(class).len(),
        })
        .filter(|c| c.count > 0)
        .collect();
    structural.sort_by(|a, b| b.count.cmp(&a.count));

    let entities: Vec<ClassCount> = model
        .entity_counts()
        .into_iter()
        .map(|(class, count)| ClassCount { class, count })
        .collect();

    let total: usize = structural.iter().map(|c| c.count).sum();
    let num_property_sets = entities
        .iter()
        .find(|c| c.class == "IfcPropertySet")
        .map_or(0, |c| c.count);
    let property_ratio = if total > 0 {
        num_property_sets as f64 / total as f64
    } else {
        0.0
    };

    let (most_common_name, most_common_count) = structural
        .first()
        .map_or((NOT_AVAILABLE.to_string(), 0), |c| (c.class.clone(), c.count));
    let (least_common_name, least_common_count) = structural
        .last()
        .map_or((NOT_AVAILABLE.to_string(), 0), |c| (c.class.clone(), c.count));

    tracing::debug!(total, property_sets = num_property_sets, ratio = property_ratio, "Computed model health");

    HealthStats {
        schema: model.schema().to_string(),
        schema_warning: schema_warning(model),
        types: structural.len(),
        structural,
        entities,
        total,
        most_common_name,
        most_common_count,
        least_common_name,
        least_common_count,
        num_property_sets,
        property_ratio,
        verdict: Verdict::from_ratio(property_ratio),
    }
}

impl HealthStats {
    pub fn structural_chart(&self) -> ChartSeries {
        ChartSeries {
            title: "Building Objects Count".to_string(),
            labels: self.structural.iter().map(|c| c.class.clone()).collect(),
            values: self.structural.iter().map(|c| c.count as f64).collect(),
        }
    }

    pub fn entity_chart(&self, top: usize) -> ChartSeries {
        let shown = &self.entities[..top.min(self.entities.len())];
        ChartSeries {
            title: format!("Top {} IFC Entity Types Frequency", top),
            labels: shown.iter().map(|c| c.class.clone()).collect(),
            values: shown.iter().map(|c| c.count as f64).collect(),
        }
    }

    /// Plain-text analysis paragraph
    pub fn summary(&self) -> String {
        if self.total == 0 {
            return "No structural elements were found to generate an analysis.".to_string();
        }
        format!(
            "The analysis focuses on the {} structural element classes found in the model, totaling {} objects. \
             The most frequent element is {} with {} instances; the least frequent is {} with {} instances. \
             {} property sets were found, an average of {:.2} property sets for each structural object. {}",
            self.types,
            self.total,
            self.most_common_name,
            self.most_common_count,
            self.least_common_name,
            self.least_common_count,
            self.num_property_sets,
            self.property_ratio,
            self.verdict.message()
        )
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectedAttribute {
    pub name: String,
    pub value: String,
    /// Target id when the value is a reference
    pub reference: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectedEntity {
    pub id: u32,
    pub class: String,
    pub attributes: Vec<InspectedAttribute>,
    pub references: Vec<u32>,
    pub inverse_references: Vec<InspectedAttribute>,
}

fn describe(model: &IfcModel, id: u32) -> String {
    match model.get(id) {
        Some(entity) => match entity.name() {
            Some(name) => format!("#{}={}('{}')", id, model.class_name(entity), name),
            None => format!("#{}={}", id, model.class_name(entity)),
        },
        None => format!("#{}", id),
    }
}

fn push_attribute(model: &IfcModel, out: &mut Vec<InspectedAttribute>, name: String, value: &AttributeValue) {
    if let AttributeValue::List(items) = value {
        if items.len() < 10 {
            for (i, item) in items.iter().enumerate() {
                push_attribute(model, out, format!("{}[{}]", name, i), item);
            }
            return;
        }
        let mut text = String::new();
        write_value(value, &mut text);
        out.push(InspectedAttribute {
            name: format!("{}({})", name, items.len()),
            value: text,
            reference: None,
        });
        return;
    }

    let reference = value.as_entity_ref();
    let text = match reference {
        Some(id) => describe(model, id),
        None => {
            let mut text = String::new();
            write_value(value, &mut text);
            text
        }
    };
    out.push(InspectedAttribute {
        name,
        value: text,
        reference,
    });
}

/// Attributes, outgoing references and incoming references of one record
///
/// Lists shorter than ten items are expanded as `Name[i]`; longer lists are
/// summarized as `Name(n)`.
pub fn inspect_entity(model: &IfcModel, id: u32) -> Result<InspectedEntity> {
    let entity = model.entity(id)?;
    let names = schema::attribute_names(&entity.type_name);

    let mut attributes = Vec::with_capacity(entity.attributes.len());
    for (i, value) in entity.attributes.iter().enumerate() {
        let name = names
            .get(i)
            .map_or_else(|| format!("Attribute{}", i), |n| n.to_string());
        push_attribute(model, &mut attributes, name, value);
    }

    let inverse_references = model
        .inverse_ids(id)
        .iter()
        .map(|&source| InspectedAttribute {
            name: model
                .get(source)
                .map_or_else(String::new, |e| model.class_name(e).into_owned()),
            value: describe(model, source),
            reference: Some(source),
        })
        .collect();

    Ok(InspectedEntity {
        id,
        class: model.class_name(entity).into_owned(),
        attributes,
        references: entity.references(),
        inverse_references,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;

    #[test]
    fn test_health_stats() {
        let model = fixture::model();
        let stats = health_stats(&model);
        assert!(stats.schema_warning.is_none());

        let classes: Vec<&str> = stats.structural.iter().map(|c| c.class.as_str()).collect();
        assert_eq!(classes, vec!["IfcBeam", "IfcWall", "IfcColumn", "IfcSlab", "IfcFooting"]);
        assert_eq!(stats.total, 7);
        assert_eq!(stats.types, 5);
        assert_eq!((stats.most_common_name.as_str(), stats.most_common_count), ("IfcBeam", 2));
        assert_eq!((stats.least_common_name.as_str(), stats.least_common_count), ("IfcFooting", 1));
        assert_eq!(stats.num_property_sets, 4);
        assert!((stats.property_ratio - 4.0 / 7.0).abs() < 1e-9);
        assert_eq!(stats.verdict, Verdict::GeometricallySimple);

        let chart = stats.entity_chart(TOP_ENTITIES);
        assert_eq!(chart.labels.len(), TOP_ENTITIES);
        assert_eq!(chart.title, "Top 10 IFC Entity Types Frequency");
        assert!(stats.summary().contains("totaling 7 objects"));
    }

    #[test]
    fn test_verdict_thresholds() {
        assert_eq!(Verdict::from_ratio(2.0), Verdict::DataRich);
        assert_eq!(Verdict::from_ratio(1.0), Verdict::ModeratelyDetailed);
        assert_eq!(Verdict::from_ratio(0.99), Verdict::GeometricallySimple);
    }

    #[test]
    fn test_other_schema_stats() {
        let content = fixture::STRUCTURAL.replace("IFC4X3_ADD2", "IFC2X3");
        let model = IfcModel::parse(&content.replace("IFCBEAM(", "IFCPROXY(")).unwrap();
        let stats = health_stats(&model);
        assert!(stats.schema_warning.unwrap().contains("IFC2X3"));
        assert_eq!(stats.structural.len(), 4);
    }

    #[test]
    fn test_inspect_entity() {
        let model = fixture::model();
        let wall = inspect_entity(&model, 20).unwrap();
        assert_eq!(wall.class, "IfcWall");
        assert_eq!(wall.attributes[0].name, "GlobalId");
        assert_eq!(wall.attributes[2].value, "'W-01'");

        let rel = inspect_entity(&model, 30).unwrap();
        let related: Vec<&str> = rel.attributes.iter().map(|a| a.name.as_str()).collect();
        assert!(related.contains(&"RelatedElements[3]"));
        let bearing = rel.attributes.iter().find(|a| a.name == "RelatedElements[3]").unwrap();
        assert_eq!(bearing.reference, Some(27));
        assert_eq!(bearing.value, "#27=IfcBearing('BR-01')");

        assert!(wall.inverse_references.iter().any(|r| r.reference == Some(30)));
        assert!(inspect_entity(&model, 9999).is_err());
    }
}
