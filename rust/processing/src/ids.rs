// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IDS rules and compliance checks
//!
//! Rules are authored per class as a list of property requirements. They
//! travel as JSON (the rule list or an export configuration carrying
//! `ExportRules`) or as buildingSMART IDS 1.0 XML, and are checked against a
//! model object by object.

use std::collections::BTreeMap;
use std::io::Write;

use bim45d_core::element::{self, PropertySets, PsetFilter};
use bim45d_core::{schema, Entity, IfcModel, PropertyValue};
use chrono::NaiveDate;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::report::ChartSeries;
use crate::table::Table;

pub const IDS_NAMESPACE: &str = "http://standards.buildingsmart.org/IDS";
pub const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str =
    "http://standards.buildingsmart.org/IDS http://standards.buildingsmart.org/IDS/1.0/ids.xsd";
const PROPERTY_URI: &str = "https://identifier.buildingsmart.org/uri/buildingsmart/ifc/4.3/prop/";
const SPEC_NAME_PREFIX: &str = "Requirement for ";

pub const IDS_TITLE: &str = "Dynamic IDS";
pub const IDS_AUTHOR: &str = "generated@bim45d.local";

/// Property name that selects a whole property set
pub const ALL_PROPERTIES: &str = "ALL";

pub const RULES_JSON_FILE: &str = "dynamic_ids.json";
pub const IDS_XML_FILE: &str = "ids_rules.xml";
pub const TEST_RESULTS_FILE: &str = "ids_test_results.csv";

const UNNAMED: &str = "(Unnamed)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRequirement {
    #[serde(default)]
    pub property_set: String,
    #[serde(default)]
    pub property_name: String,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default, alias = "values", deserialize_with = "nullable_list", skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
}

impl PropertyRequirement {
    pub fn new(property_set: impl Into<String>, property_name: impl Into<String>, mandatory: bool) -> Self {
        Self {
            property_set: property_set.into(),
            property_name: property_name.into(),
            mandatory,
            allowed_values: Vec::new(),
        }
    }

    pub fn with_allowed_values<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdsRule {
    #[serde(default)]
    pub ifc_class: String,
    #[serde(default)]
    pub properties: Vec<PropertyRequirement>,
}

/// `null` reads as an empty list
fn nullable_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(values
        .unwrap_or_default()
        .into_iter()
        .map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect())
}

/// Session rule list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdsRuleBook {
    rules: Vec<IdsRule>,
}

impl IdsRuleBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(&self) -> &[IdsRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Append a one-requirement rule; blank class, set or property is rejected
    pub fn add(&mut self, ifc_class: &str, property_set: &str, property_name: &str, mandatory: bool) -> Result<()> {
        let (class, pset, prop) = (ifc_class.trim(), property_set.trim(), property_name.trim());
        if class.is_empty() || pset.is_empty() || prop.is_empty() {
            return Err(Error::invalid("IFC class, property set and property name are required"));
        }
        self.rules.push(IdsRule {
            ifc_class: class.to_string(),
            properties: vec![PropertyRequirement::new(pset, prop, mandatory)],
        });
        Ok(())
    }

    pub fn push(&mut self, rule: IdsRule) -> Result<()> {
        if rule.ifc_class.trim().is_empty() {
            return Err(Error::invalid("IFC class is required"));
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<IdsRule> {
        if index >= self.rules.len() {
            return Err(Error::RuleIndex {
                index,
                len: self.rules.len(),
            });
        }
        Ok(self.rules.remove(index))
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.rules)?)
    }

    pub fn to_ids_xml(&self, date: NaiveDate) -> Result<String> {
        to_ids_xml(&self.rules, date)
    }
}

/// One checked requirement on one element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationRow {
    #[serde(rename = "ElementID")]
    pub element_id: String,
    #[serde(rename = "ElementName")]
    pub element_name: String,
    #[serde(rename = "IFCClass")]
    pub ifc_class: String,
    #[serde(rename = "PropertySet")]
    pub property_set: String,
    #[serde(rename = "PropertyName")]
    pub property_name: String,
    #[serde(rename = "Value")]
    pub value: PropertyValue,
    #[serde(rename = "Compliant")]
    pub compliant: bool,
}

pub const RESULT_COLUMNS: [&str; 7] = [
    "ElementID",
    "ElementName",
    "IFCClass",
    "PropertySet",
    "PropertyName",
    "Value",
    "Compliant",
];

/// Locate a requirement on an element
///
/// A named set is matched exactly, then ignoring case; without a set the
/// first set carrying the property wins. Direct attributes (`Name`, `Tag`,
/// ...) are the last resort. Returns the resolved set name and the value.
fn lookup(entity: &Entity, psets: &PropertySets, requirement: &PropertyRequirement) -> (String, PropertyValue) {
    let prop = requirement.property_name.as_str();
    let pick = |props: &BTreeMap<String, PropertyValue>| -> PropertyValue {
        if prop == ALL_PROPERTIES {
            serde_json::to_string(props)
                .map(PropertyValue::Text)
                .unwrap_or_default()
        } else {
            props.get(prop).cloned().unwrap_or_default()
        }
    };

    let mut set_name = requirement.property_set.clone();
    let mut value = PropertyValue::Null;
    if !set_name.is_empty() {
        if let Some(props) = psets.get(&set_name) {
            value = pick(props);
        } else if let Some((name, props)) = psets.iter().find(|(name, _)| name.eq_ignore_ascii_case(&set_name)) {
            value = pick(props);
            set_name = name.clone();
        }
    } else if let Some((name, props)) = psets
        .iter()
        .find(|(_, props)| prop == ALL_PROPERTIES || props.contains_key(prop))
    {
        value = pick(props);
        set_name = name.clone();
    }

    if value.is_null() && !prop.is_empty() {
        if let Some(attr) = schema::attribute_index(&entity.type_name, prop).and_then(|i| entity.get(i)) {
            value = PropertyValue::from_attribute(attr);
        }
    }
    (set_name, value)
}

fn is_compliant(requirement: &PropertyRequirement, value: &PropertyValue) -> bool {
    if value.is_null() {
        return !requirement.mandatory;
    }
    requirement.allowed_values.is_empty() || requirement.allowed_values.contains(&value.to_string())
}

/// Check every rule against the objects of its class
///
/// Rules without a class, and classes absent from the model, add no rows.
pub fn validate(model: &IfcModel, rules: &[IdsRule]) -> Vec<ValidationRow> {
    let mut rows = Vec::new();
    for rule in rules {
        if rule.ifc_class.is_empty() {
            continue;
        }
        let elements = model.by_type(&rule.ifc_class);
        let checked: Vec<Vec<ValidationRow>> = elements
            .par_iter()
            .map(|entity| {
                let psets = element::get_psets(model, entity.id, PsetFilter::All);
                let element_id = entity
                    .global_id()
                    .map(str::to_string)
                    .unwrap_or_else(|| entity.id.to_string());
                let element_name = entity
                    .name()
                    .filter(|n| !n.is_empty())
                    .unwrap_or(UNNAMED)
                    .to_string();
                rule.properties
                    .iter()
                    .map(|requirement| {
                        let (property_set, value) = lookup(entity, &psets, requirement);
                        ValidationRow {
                            element_id: element_id.clone(),
                            element_name: element_name.clone(),
                            ifc_class: rule.ifc_class.clone(),
                            property_set,
                            property_name: requirement.property_name.clone(),
                            compliant: is_compliant(requirement, &value),
                            value,
                        }
                    })
                    .collect()
            })
            .collect();
        rows.extend(checked.into_iter().flatten());
    }
    tracing::debug!(
        rules = rules.len(),
        rows = rows.len(),
        failed = rows.iter().filter(|r| !r.compliant).count(),
        "IDS validation finished"
    );
    rows
}

/// Validation rows as a table, columns as in exports
pub fn results_table(rows: &[ValidationRow]) -> Table {
    let mut table = Table::new(RESULT_COLUMNS);
    for row in rows {
        table.push_row(vec![
            row.element_id.as_str().into(),
            row.element_name.as_str().into(),
            row.ifc_class.as_str().into(),
            row.property_set.as_str().into(),
            row.property_name.as_str().into(),
            row.value.clone(),
            PropertyValue::Bool(row.compliant),
        ]);
    }
    table
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingCount {
    pub property_name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidCount {
    pub property_name: String,
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSummary {
    pub ifc_class: String,
    pub passed: usize,
    pub total: usize,
    /// Percentage of compliant rows
    pub compliance: f64,
    pub missing: Vec<MissingCount>,
    pub invalid: Vec<InvalidCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationSummary {
    pub compliance_rate: f64,
    pub classes: Vec<ClassSummary>,
}

impl ValidationSummary {
    /// Compliance per class as a bar series
    pub fn chart(&self) -> ChartSeries {
        ChartSeries {
            title: "Compliance per IFC Class (%)".to_string(),
            labels: self.classes.iter().map(|c| c.ifc_class.clone()).collect(),
            values: self.classes.iter().map(|c| c.compliance).collect(),
        }
    }
}

fn percent(passed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        passed as f64 / total as f64 * 100.0
    }
}

fn display_name(name: &str) -> String {
    if name.is_empty() {
        UNNAMED.to_string()
    } else {
        name.to_string()
    }
}

/// Per class pass counts with the missing properties and rejected values
pub fn summarize(rows: &[ValidationRow]) -> ValidationSummary {
    let mut by_class: BTreeMap<&str, Vec<&ValidationRow>> = BTreeMap::new();
    for row in rows {
        by_class.entry(row.ifc_class.as_str()).or_default().push(row);
    }

    let classes = by_class
        .into_iter()
        .map(|(class, group)| {
            let total = group.len();
            let passed = group.iter().filter(|r| r.compliant).count();
            let mut missing: BTreeMap<String, usize> = BTreeMap::new();
            let mut invalid: BTreeMap<(String, String), usize> = BTreeMap::new();
            for row in group.iter().filter(|r| !r.compliant) {
                if row.value.is_null() {
                    *missing.entry(display_name(&row.property_name)).or_default() += 1;
                } else {
                    *invalid
                        .entry((display_name(&row.property_name), row.value.to_string()))
                        .or_default() += 1;
                }
            }
            ClassSummary {
                ifc_class: class.to_string(),
                passed,
                total,
                compliance: percent(passed, total),
                missing: missing
                    .into_iter()
                    .map(|(property_name, count)| MissingCount { property_name, count })
                    .collect(),
                invalid: invalid
                    .into_iter()
                    .map(|((property_name, value), count)| InvalidCount {
                        property_name,
                        value,
                        count,
                    })
                    .collect(),
            }
        })
        .collect();

    ValidationSummary {
        compliance_rate: percent(rows.iter().filter(|r| r.compliant).count(), rows.len()),
        classes,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Json,
    Csv,
}

/// Validation rows as a JSON array or CSV text
pub fn export_report(rows: &[ValidationRow], format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(rows)?),
        ReportFormat::Csv => results_table(rows).to_csv(),
    }
}

pub(crate) fn write_text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// `<name><ids:simpleValue>text</ids:simpleValue></name>`
fn write_simple_value<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    write_text_element(writer, "ids:simpleValue", text)?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_requirement<W: Write>(writer: &mut Writer<W>, requirement: &PropertyRequirement) -> Result<()> {
    let uri = format!("{}{}", PROPERTY_URI, requirement.property_name);
    let mut property = BytesStart::new("ids:property");
    property.push_attribute(("dataType", "IFCLABEL"));
    property.push_attribute(("uri", uri.as_str()));
    property.push_attribute((
        "cardinality",
        if requirement.mandatory { "required" } else { "optional" },
    ));
    writer.write_event(Event::Start(property))?;
    write_simple_value(writer, "ids:propertySet", &requirement.property_set)?;
    write_simple_value(writer, "ids:baseName", &requirement.property_name)?;

    if !requirement.allowed_values.is_empty() {
        writer.write_event(Event::Start(BytesStart::new("ids:value")))?;
        let mut restriction = BytesStart::new("xs:restriction");
        restriction.push_attribute(("base", "xs:string"));
        writer.write_event(Event::Start(restriction))?;
        for value in &requirement.allowed_values {
            let mut enumeration = BytesStart::new("xs:enumeration");
            enumeration.push_attribute(("value", value.as_str()));
            writer.write_event(Event::Empty(enumeration))?;
        }
        writer.write_event(Event::End(BytesEnd::new("xs:restriction")))?;
        writer.write_event(Event::End(BytesEnd::new("ids:value")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("ids:property")))?;
    Ok(())
}

/// Render rules as an IDS 1.0 document, one specification per rule
pub fn to_ids_xml(rules: &[IdsRule], date: NaiveDate) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("ids:ids");
    root.push_attribute(("xmlns:ids", IDS_NAMESPACE));
    root.push_attribute(("xmlns:xs", XS_NAMESPACE));
    root.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
    root.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
    writer.write_event(Event::Start(root))?;

    writer.write_event(Event::Start(BytesStart::new("ids:info")))?;
    write_text_element(&mut writer, "ids:title", IDS_TITLE)?;
    write_text_element(&mut writer, "ids:version", "1.0")?;
    write_text_element(&mut writer, "ids:author", IDS_AUTHOR)?;
    write_text_element(&mut writer, "ids:date", &date.format("%Y-%m-%d").to_string())?;
    writer.write_event(Event::End(BytesEnd::new("ids:info")))?;

    writer.write_event(Event::Start(BytesStart::new("ids:specifications")))?;
    for (i, rule) in rules.iter().enumerate() {
        let name = format!("{}{}", SPEC_NAME_PREFIX, rule.ifc_class);
        let identifier = format!("S{}", i + 1);
        let mut spec = BytesStart::new("ids:specification");
        spec.push_attribute(("ifcVersion", "IFC4X3"));
        spec.push_attribute(("name", name.as_str()));
        spec.push_attribute(("identifier", identifier.as_str()));
        writer.write_event(Event::Start(spec))?;

        let mut applicability = BytesStart::new("ids:applicability");
        applicability.push_attribute(("minOccurs", "0"));
        applicability.push_attribute(("maxOccurs", "unbounded"));
        writer.write_event(Event::Start(applicability))?;
        writer.write_event(Event::Start(BytesStart::new("ids:entity")))?;
        write_simple_value(&mut writer, "ids:name", &rule.ifc_class)?;
        writer.write_event(Event::End(BytesEnd::new("ids:entity")))?;
        writer.write_event(Event::End(BytesEnd::new("ids:applicability")))?;

        writer.write_event(Event::Start(BytesStart::new("ids:requirements")))?;
        for requirement in &rule.properties {
            write_requirement(&mut writer, requirement)?;
        }
        writer.write_event(Event::End(BytesEnd::new("ids:requirements")))?;
        writer.write_event(Event::End(BytesEnd::new("ids:specification")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("ids:specifications")))?;
    writer.write_event(Event::End(BytesEnd::new("ids:ids")))?;

    String::from_utf8(writer.into_inner()).map_err(|e| Error::Xml(e.to_string()))
}

#[derive(Default)]
struct SpecDraft {
    name: String,
    class: Option<String>,
    properties: Vec<PropertyRequirement>,
}

impl SpecDraft {
    fn finish(self) -> IdsRule {
        let ifc_class = self
            .class
            .unwrap_or_else(|| self.name.replace(SPEC_NAME_PREFIX, ""));
        IdsRule {
            ifc_class,
            properties: self.properties,
        }
    }
}

fn attribute(start: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Read IDS XML back into rules
///
/// Elements are matched by local name so any prefix, or none, is accepted.
pub fn parse_ids_xml(content: &str) -> Result<Vec<IdsRule>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut rules = Vec::new();
    let mut spec: Option<SpecDraft> = None;
    let mut property: Option<PropertyRequirement> = None;
    let mut saw_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                saw_root = true;
                let name = start.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"specification" => {
                        spec = Some(SpecDraft {
                            name: attribute(&start, b"name")?.unwrap_or_default(),
                            ..SpecDraft::default()
                        });
                    }
                    b"property" if spec.is_some() => {
                        let cardinality = attribute(&start, b"cardinality")?.unwrap_or_default();
                        property = Some(PropertyRequirement::new(
                            "",
                            "",
                            cardinality.to_ascii_lowercase().starts_with("required"),
                        ));
                    }
                    b"enumeration" => {
                        if let (Some(prop), Some(value)) = (property.as_mut(), attribute(&start, b"value")?) {
                            prop.allowed_values.push(value);
                        }
                    }
                    _ => {}
                }
                path.push(name);
            }
            Event::Empty(start) => {
                saw_root = true;
                if start.local_name().as_ref() == b"enumeration" {
                    if let (Some(prop), Some(value)) = (property.as_mut(), attribute(&start, b"value")?) {
                        prop.allowed_values.push(value);
                    }
                }
            }
            Event::Text(text) => {
                let text = text.unescape()?.trim().to_string();
                if text.is_empty() {
                    continue;
                }
                let inside = |name: &[u8]| path.iter().any(|p| p.as_slice() == name);
                let parent = path.len().checked_sub(2).map(|i| path[i].as_slice());
                let current = path.last().map(Vec::as_slice);
                if let Some(prop) = property.as_mut() {
                    match (parent, current) {
                        (Some(b"propertySet"), Some(b"simpleValue")) => prop.property_set = text,
                        (Some(b"baseName"), Some(b"simpleValue")) => prop.property_name = text,
                        (_, Some(b"enumeration")) => prop.allowed_values.push(text),
                        _ => {}
                    }
                } else if let Some(draft) = spec.as_mut() {
                    if inside(b"applicability") && current == Some(&b"simpleValue"[..]) && draft.class.is_none() {
                        draft.class = Some(text);
                    }
                }
            }
            Event::End(end) => {
                match end.local_name().as_ref() {
                    b"property" => {
                        if let (Some(draft), Some(prop)) = (spec.as_mut(), property.take()) {
                            draft.properties.push(prop);
                        }
                    }
                    b"specification" => {
                        if let Some(draft) = spec.take() {
                            rules.push(draft.finish());
                        }
                    }
                    _ => {}
                }
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(Error::Xml("document has no root element".to_string()));
    }
    Ok(rules)
}

fn string_field(rule: &Value, key: &str) -> String {
    rule.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Export-configuration rule turned into requirements
fn normalize_rule(rule: &Value) -> IdsRule {
    let property_set = string_field(rule, "property_set");
    let mandatory = rule.get("mandatory").and_then(Value::as_bool).unwrap_or(true);
    let include_all = rule
        .get("include_all_properties")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let properties = if include_all {
        vec![PropertyRequirement::new(&property_set, ALL_PROPERTIES, mandatory)]
    } else {
        let names: Vec<&str> = match rule.get("property_name") {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            Some(Value::String(name)) => vec![name.as_str()],
            _ => Vec::new(),
        };
        names
            .into_iter()
            .map(|name| PropertyRequirement::new(&property_set, name, mandatory))
            .collect()
    };
    IdsRule {
        ifc_class: string_field(rule, "ifc_class"),
        properties,
    }
}

/// Read a rule list or an export configuration's `ExportRules`
pub fn parse_rules_json(content: &str) -> Result<Vec<IdsRule>> {
    let document: Value = serde_json::from_str(content)?;
    let raw = match &document {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("ExportRules") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(Error::invalid(
                    "JSON must be an IDS rule list or an export configuration with 'ExportRules'",
                ))
            }
        },
        _ => {
            return Err(Error::invalid(
                "JSON must be an IDS rule list or an export configuration with 'ExportRules'",
            ))
        }
    };

    raw.iter()
        .map(|rule| {
            if !rule.is_object() {
                return Err(Error::invalid("every rule must be a JSON object"));
            }
            if rule.get("properties").is_some() {
                Ok(IdsRule::deserialize(rule)?)
            } else {
                Ok(normalize_rule(rule))
            }
        })
        .collect()
}

/// Load uploaded rules: IDS XML when the document is markup, JSON otherwise
pub fn load_rules(bytes: &[u8]) -> Result<Vec<IdsRule>> {
    let content = std::str::from_utf8(bytes).map_err(|e| Error::invalid(e.to_string()))?;
    let content = content.trim_start_matches('\u{feff}').trim_start();
    if content.starts_with('<') {
        let rules = parse_ids_xml(content)?;
        if rules.is_empty() {
            return Err(Error::invalid("No valid specifications found in the uploaded IDS XML"));
        }
        tracing::info!(rules = rules.len(), "Loaded IDS XML");
        Ok(rules)
    } else {
        let rules = parse_rules_json(content)?;
        tracing::info!(rules = rules.len(), "Loaded IDS JSON");
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;

    fn wall_rule() -> IdsRule {
        IdsRule {
            ifc_class: "IfcWall".to_string(),
            properties: vec![PropertyRequirement::new("Pset_WallCommon", "FireRating", true)],
        }
    }

    #[test]
    fn test_rule_book() {
        let mut book = IdsRuleBook::new();
        book.add("IfcWall", "Pset_WallCommon", "FireRating", true).unwrap();
        assert!(book.add("IfcWall", " ", "FireRating", true).is_err());
        assert_eq!(book.len(), 1);

        let err = book.remove(3).unwrap_err();
        assert!(matches!(err, Error::RuleIndex { index: 3, len: 1 }));
        assert_eq!(book.len(), 1);

        let json = book.to_json().unwrap();
        assert!(json.contains("\"property_set\": \"Pset_WallCommon\""));
        assert!(!json.contains("allowed_values"));

        book.remove(0).unwrap();
        assert!(book.is_empty());
    }

    #[test]
    fn test_validate_mandatory() {
        let model = fixture::model();
        let rows = validate(&model, &[wall_rule()]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].element_id, "0BIM45Dfixture00000020");
        assert_eq!(rows[0].value, PropertyValue::from("REI 120"));
        assert!(rows[0].compliant);
        assert_eq!(rows[1].element_name, "W-02");
        assert!(rows[1].value.is_null());
        assert!(!rows[1].compliant);
    }

    #[test]
    fn test_validate_allowed_values_and_fallbacks() {
        let model = fixture::model();
        let rules = vec![
            IdsRule {
                ifc_class: "IfcBeam".to_string(),
                properties: vec![
                    PropertyRequirement::new("pset_beamcommon", "FireRating", true).with_allowed_values(["R 90"]),
                    PropertyRequirement::new("", "Name", false),
                ],
            },
            IdsRule {
                ifc_class: "IfcTendon".to_string(),
                properties: vec![PropertyRequirement::new("Pset_TendonCommon", "Status", true)],
            },
        ];
        let rows = validate(&model, &rules);
        assert_eq!(rows.len(), 4);

        // case-insensitive set match resolves the stored name
        assert_eq!(rows[0].property_set, "Pset_BeamCommon");
        assert!(!rows[0].compliant);
        assert_eq!(rows[1].value, PropertyValue::from("B-01"));
        assert!(rows[1].compliant);
        assert_eq!(rows[2].element_name, "(Unnamed)");
        assert!(!rows[2].compliant);
        assert!(rows[3].compliant);
    }

    #[test]
    fn test_validate_whole_set() {
        let model = fixture::model();
        let rule = IdsRule {
            ifc_class: "IfcColumn".to_string(),
            properties: vec![PropertyRequirement::new("Pset_ColumnCommon", ALL_PROPERTIES, true)],
        };
        let rows = validate(&model, &[rule]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, PropertyValue::from("{\"LoadBearing\":true}"));
    }

    #[test]
    fn test_summarize() {
        let model = fixture::model();
        let rules = vec![
            wall_rule(),
            IdsRule {
                ifc_class: "IfcBeam".to_string(),
                properties: vec![
                    PropertyRequirement::new("Pset_BeamCommon", "FireRating", true).with_allowed_values(["R 90"]),
                ],
            },
        ];
        let summary = summarize(&validate(&model, &rules));
        assert_eq!(summary.compliance_rate, 25.0);
        assert_eq!(summary.classes.len(), 2);

        let beam = &summary.classes[0];
        assert_eq!(beam.ifc_class, "IfcBeam");
        assert_eq!((beam.passed, beam.total), (0, 2));
        assert_eq!(beam.missing[0].count, 1);
        assert_eq!(beam.invalid[0].value, "R 60");

        let wall = &summary.classes[1];
        assert_eq!(wall.compliance, 50.0);
        assert_eq!(wall.missing[0].property_name, "FireRating");

        let chart = summary.chart();
        assert_eq!(chart.labels, vec!["IfcBeam", "IfcWall"]);
        assert_eq!(chart.values, vec![0.0, 50.0]);
        assert_eq!(summarize(&[]).compliance_rate, 0.0);
    }

    #[test]
    fn test_xml_output() {
        let mut rule = wall_rule();
        rule.properties[0].allowed_values = vec!["REI 60".to_string(), "REI 120".to_string()];
        let date = NaiveDate::from_ymd_opt(2025, 9, 15).unwrap();
        let xml = to_ids_xml(&[rule.clone()], date).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("xmlns:ids=\"http://standards.buildingsmart.org/IDS\""));
        assert!(xml.contains("<ids:date>2025-09-15</ids:date>"));
        assert!(xml.contains("name=\"Requirement for IfcWall\" identifier=\"S1\""));
        assert!(xml.contains("cardinality=\"required\""));
        assert!(xml.contains("<xs:enumeration value=\"REI 120\"/>"));

        assert_eq!(parse_ids_xml(&xml).unwrap(), vec![rule]);
    }

    #[test]
    fn test_parse_unprefixed_xml() {
        let xml = r#"<ids><specifications>
            <specification name="Requirement for IfcSlab">
              <requirements>
                <property cardinality="optional">
                  <propertySet><simpleValue>Pset_SlabCommon</simpleValue></propertySet>
                  <baseName><simpleValue>IsExternal</simpleValue></baseName>
                  <value><restriction><enumeration>TRUE</enumeration></restriction></value>
                </property>
              </requirements>
            </specification>
          </specifications></ids>"#;
        let rules = parse_ids_xml(xml).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].ifc_class, "IfcSlab");
        let prop = &rules[0].properties[0];
        assert_eq!(prop.property_set, "Pset_SlabCommon");
        assert_eq!(prop.property_name, "IsExternal");
        assert!(!prop.mandatory);
        assert_eq!(prop.allowed_values, vec!["TRUE"]);
    }

    #[test]
    fn test_parse_rules_json() {
        let export = r#"{
            "Name": "Setup",
            "ExportRules": [
                {"ifc_class": "IfcWall", "property_set": "Pset_WallCommon", "property_name": ["FireRating", "IsExternal"]},
                {"ifc_class": "IfcBeam", "property_set": "Pset_BeamCommon", "include_all_properties": true, "mandatory": false}
            ]
        }"#;
        let rules = parse_rules_json(export).unwrap();
        assert_eq!(rules[0].properties.len(), 2);
        assert!(rules[0].properties[1].mandatory);
        assert_eq!(rules[1].properties[0].property_name, ALL_PROPERTIES);
        assert!(!rules[1].properties[0].mandatory);

        let list = r#"[{"ifc_class": "IfcWall", "properties": [
            {"property_set": "Pset_WallCommon", "property_name": "FireRating", "mandatory": true, "allowed_values": null},
            {"property_set": "Pset_WallCommon", "property_name": "Status", "values": ["NEW"]}
        ]}]"#;
        let rules = parse_rules_json(list).unwrap();
        assert!(rules[0].properties[0].allowed_values.is_empty());
        assert_eq!(rules[0].properties[1].allowed_values, vec!["NEW"]);

        assert!(parse_rules_json(r#"{"rules": []}"#).is_err());
        assert!(parse_rules_json("42").is_err());
    }

    #[test]
    fn test_load_rules_and_export() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let xml = to_ids_xml(&[wall_rule()], date).unwrap();
        assert_eq!(load_rules(xml.as_bytes()).unwrap(), vec![wall_rule()]);
        assert!(load_rules(b"<ids></ids>").is_err());

        let model = fixture::model();
        let rows = validate(&model, &load_rules(b"[{\"ifc_class\": \"IfcWall\", \"property_set\": \"Pset_WallCommon\", \"property_name\": [\"FireRating\"]}]").unwrap());
        let csv = export_report(&rows, ReportFormat::Csv).unwrap();
        assert!(csv.starts_with("ElementID,ElementName,IFCClass,PropertySet,PropertyName,Value,Compliant\n"));
        assert!(csv.contains("W-02,IfcWall,Pset_WallCommon,FireRating,,False"));

        let json = export_report(&rows, ReportFormat::Json).unwrap();
        assert!(json.contains("\"Compliant\": false"));
    }
}
