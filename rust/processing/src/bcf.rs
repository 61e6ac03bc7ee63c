// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Issue export
//!
//! Turns the latest IDS validation rows into issue lists: tab separated
//! text, an HTML table, or a BCF 2.1 style archive with one topic per
//! failed requirement.

use std::io::{Cursor, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};
use crate::ids::{results_table, write_text_element, ValidationRow};

pub const TXT_FILE: &str = "bcf_issues.txt";
pub const HTML_FILE: &str = "bcf_issues.html";
pub const ZIP_FILE: &str = "bcf_issues.bcfzip";
pub const BCF_VERSION: &str = "2.1";

/// One exported issue: a validation row picked by the user
pub type Issue = ValidationRow;

/// Which validation rows to export
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    #[default]
    All,
    Rows(Vec<usize>),
}

/// Selected rows, in row order; indexes past the end are ignored
pub fn select(rows: &[ValidationRow], selection: &Selection) -> Vec<Issue> {
    match selection {
        Selection::All => rows.to_vec(),
        Selection::Rows(indexes) => rows
            .iter()
            .enumerate()
            .filter(|(i, _)| indexes.contains(i))
            .map(|(_, row)| row.clone())
            .collect(),
    }
}

pub fn to_txt(issues: &[Issue]) -> Result<String> {
    results_table(issues).to_tsv()
}

pub fn to_html(issues: &[Issue]) -> String {
    results_table(issues).to_html()
}

fn title(issue: &Issue) -> String {
    if issue.value.is_null() {
        format!("{} {}: missing {}", issue.ifc_class, issue.element_name, issue.property_name)
    } else {
        format!(
            "{} {}: {} value '{}' not allowed",
            issue.ifc_class, issue.element_name, issue.property_name, issue.value
        )
    }
}

fn description(issue: &Issue) -> String {
    format!(
        "Element {} ({}) fails the requirement on {}.{}; found value: {}",
        issue.element_name,
        issue.element_id,
        issue.property_set,
        issue.property_name,
        if issue.value.is_null() {
            "none".to_string()
        } else {
            issue.value.to_string()
        }
    )
}

fn into_string(writer: Writer<Vec<u8>>) -> Result<String> {
    String::from_utf8(writer.into_inner()).map_err(|e| Error::Xml(e.to_string()))
}

fn version_xml() -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut root = BytesStart::new("Version");
    root.push_attribute(("VersionId", BCF_VERSION));
    writer.write_event(Event::Start(root))?;
    write_text_element(&mut writer, "DetailedVersion", BCF_VERSION)?;
    writer.write_event(Event::End(BytesEnd::new("Version")))?;
    into_string(writer)
}

fn markup_xml(issue: &Issue, topic: &Uuid, viewpoint: &Uuid, author: &str, date: &str) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("Markup")))?;

    let topic_guid = topic.to_string();
    let mut start = BytesStart::new("Topic");
    start.push_attribute(("Guid", topic_guid.as_str()));
    start.push_attribute(("TopicType", "Issue"));
    start.push_attribute(("TopicStatus", "Open"));
    writer.write_event(Event::Start(start))?;
    write_text_element(&mut writer, "Title", &title(issue))?;
    write_text_element(&mut writer, "Labels", &issue.ifc_class)?;
    write_text_element(&mut writer, "CreationDate", date)?;
    write_text_element(&mut writer, "CreationAuthor", author)?;
    write_text_element(&mut writer, "Description", &description(issue))?;
    writer.write_event(Event::End(BytesEnd::new("Topic")))?;

    let viewpoint_guid = viewpoint.to_string();
    let mut viewpoints = BytesStart::new("Viewpoints");
    viewpoints.push_attribute(("Guid", viewpoint_guid.as_str()));
    writer.write_event(Event::Start(viewpoints))?;
    write_text_element(&mut writer, "Viewpoint", "viewpoint.bcfv")?;
    writer.write_event(Event::End(BytesEnd::new("Viewpoints")))?;

    writer.write_event(Event::End(BytesEnd::new("Markup")))?;
    into_string(writer)
}

/// Viewpoint selecting the failing element by GlobalId
fn viewpoint_xml(issue: &Issue, viewpoint: &Uuid) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let guid = viewpoint.to_string();
    let mut root = BytesStart::new("VisualizationInfo");
    root.push_attribute(("Guid", guid.as_str()));
    writer.write_event(Event::Start(root))?;
    writer.write_event(Event::Start(BytesStart::new("Components")))?;
    writer.write_event(Event::Start(BytesStart::new("Selection")))?;
    let mut component = BytesStart::new("Component");
    component.push_attribute(("IfcGuid", issue.element_id.as_str()));
    writer.write_event(Event::Empty(component))?;
    writer.write_event(Event::End(BytesEnd::new("Selection")))?;
    writer.write_event(Event::End(BytesEnd::new("Components")))?;
    writer.write_event(Event::End(BytesEnd::new("VisualizationInfo")))?;
    into_string(writer)
}

/// BCF archive: `bcf.version`, a topic folder per failed row and
/// `issues.json` with every exported row
pub fn to_bcf_zip(issues: &[Issue], author: &str, date: DateTime<Utc>) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let created = date.to_rfc3339_opts(SecondsFormat::Secs, true);

    zip.start_file("bcf.version", options)?;
    zip.write_all(version_xml()?.as_bytes())?;

    let mut topics = 0usize;
    for issue in issues.iter().filter(|i| !i.compliant) {
        let topic = Uuid::new_v4();
        let viewpoint = Uuid::new_v4();
        zip.start_file(format!("{}/markup.bcf", topic), options)?;
        zip.write_all(markup_xml(issue, &topic, &viewpoint, author, &created)?.as_bytes())?;
        zip.start_file(format!("{}/viewpoint.bcfv", topic), options)?;
        zip.write_all(viewpoint_xml(issue, &viewpoint)?.as_bytes())?;
        topics += 1;
    }

    zip.start_file("issues.json", options)?;
    zip.write_all(serde_json::to_string_pretty(issues)?.as_bytes())?;

    let bytes = zip.finish()?.into_inner();
    tracing::info!(rows = issues.len(), topics, bytes = bytes.len(), "Built BCF archive");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use bim45d_core::PropertyValue;
    use chrono::TimeZone;
    use zip::ZipArchive;

    use super::*;

    fn row(id: &str, name: &str, value: PropertyValue, compliant: bool) -> ValidationRow {
        ValidationRow {
            element_id: id.to_string(),
            element_name: name.to_string(),
            ifc_class: "IfcWall".to_string(),
            property_set: "Pset_WallCommon".to_string(),
            property_name: "FireRating".to_string(),
            value,
            compliant,
        }
    }

    fn rows() -> Vec<Issue> {
        vec![
            row("0BIM45Dfixture00000020", "W-01", "REI 120".into(), true),
            row("0BIM45Dfixture00000021", "W-02", PropertyValue::Null, false),
            row("0BIM45Dfixture00000099", "W-03", "EI 30".into(), false),
        ]
    }

    #[test]
    fn test_select() {
        let rows = rows();
        assert_eq!(select(&rows, &Selection::All).len(), 3);
        let picked = select(&rows, &Selection::Rows(vec![2, 0, 7]));
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].element_name, "W-01");
        assert!(select(&rows, &Selection::Rows(vec![])).is_empty());
    }

    #[test]
    fn test_text_exports() {
        let rows = rows();
        let txt = to_txt(&rows).unwrap();
        assert!(txt.starts_with("ElementID\tElementName\tIFCClass"));
        assert_eq!(txt.lines().count(), 4);

        let html = to_html(&rows[..1]);
        assert!(html.contains("<td>REI 120</td>"));
    }

    #[test]
    fn test_bcf_zip() {
        let rows = rows();
        let date = Utc.with_ymd_and_hms(2025, 9, 15, 8, 0, 0).unwrap();
        let bytes = to_bcf_zip(&rows, "engineer@example.com", date).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        // version + two topics with markup and viewpoint + issues.json
        assert_eq!(archive.len(), 6);

        let mut version = String::new();
        archive.by_name("bcf.version").unwrap().read_to_string(&mut version).unwrap();
        assert!(version.contains("VersionId=\"2.1\""));

        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        let markups: Vec<&String> = names.iter().filter(|n| n.ends_with("/markup.bcf")).collect();
        assert_eq!(markups.len(), 2);

        let mut all_markup = String::new();
        for name in &names {
            if name.ends_with(".bcf") || name.ends_with(".bcfv") {
                archive.by_name(name).unwrap().read_to_string(&mut all_markup).unwrap();
            }
        }
        assert!(all_markup.contains("<CreationDate>2025-09-15T08:00:00Z</CreationDate>"));
        assert!(all_markup.contains("TopicStatus=\"Open\""));
        assert!(all_markup.contains("<Title>IfcWall W-02: missing FireRating</Title>"));
        assert!(all_markup.contains("IfcGuid=\"0BIM45Dfixture00000099\""));
        assert!(!all_markup.contains("0BIM45Dfixture00000020"));

        let mut issues = String::new();
        archive.by_name("issues.json").unwrap().read_to_string(&mut issues).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&issues).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 3);
    }
}
