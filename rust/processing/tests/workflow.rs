// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Page flows across modules: rules to issues, tables to reports,
//! schedules to the saved file

use std::io::{Cursor, Read};

use bim45d_core::IfcModel;
use bim45d_processing::bcf::{self, Selection};
use bim45d_processing::cost::{build_boq, PriceList};
use bim45d_processing::export_config::{ExportConfiguration, ExportRule};
use bim45d_processing::ids::{self, load_rules, summarize, validate, IdsRuleBook};
use bim45d_processing::objects::{filter_level_class_type, model_properties_table, quantities_table, quantities_view};
use bim45d_processing::report::{ReportBook, ReportComponent, REPORT_TITLE};
use bim45d_processing::schedule::{self, PlanRow};
use bim45d_processing::{health, ALL};
use chrono::{NaiveDate, TimeZone, Utc};

const STRUCTURAL: &str = include_str!("fixtures/structural.ifc");

fn model() -> IfcModel {
    IfcModel::parse(STRUCTURAL).expect("fixture parses")
}

#[test]
fn test_rules_to_bcf_issues() {
    let model = model();
    let mut book = IdsRuleBook::new();
    book.add("IfcWall", "Pset_WallCommon", "FireRating", true).unwrap();
    book.add("IfcBeam", "Pset_BeamCommon", "Span", true).unwrap();

    // IDS XML written by one session is read back by another
    let xml = book.to_ids_xml(NaiveDate::from_ymd_opt(2025, 9, 15).unwrap()).unwrap();
    let rules = load_rules(xml.as_bytes()).unwrap();
    assert_eq!(rules, book.rules());

    let rows = validate(&model, &rules);
    assert_eq!(rows.len(), 4);
    let summary = summarize(&rows);
    assert!((summary.compliance_rate - 50.0).abs() < 1e-9);

    let failed: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.compliant)
        .map(|(i, _)| i)
        .collect();
    let issues = bcf::select(&rows, &Selection::Rows(failed));
    assert_eq!(issues.len(), 2);

    let date = Utc.with_ymd_and_hms(2025, 9, 16, 9, 0, 0).unwrap();
    let archive = bcf::to_bcf_zip(&issues, "checker@example.com", date).unwrap();
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
    let mut issues_json = String::new();
    zip.by_name("issues.json").unwrap().read_to_string(&mut issues_json).unwrap();
    assert!(issues_json.contains("\"ElementName\": \"W-02\""));
    assert!(issues_json.contains("\"ElementName\": \"(Unnamed)\""));
}

#[test]
fn test_export_config_rules_drive_validation() {
    let mut config = ExportConfiguration::default();
    config
        .add_rule(ExportRule {
            ifc_class: "IfcWall".to_string(),
            property_set: "Pset_WallCommon".to_string(),
            property_name: vec!["IsExternal".to_string(), "FireRating".to_string()],
            include_all_properties: false,
            mandatory: true,
        })
        .unwrap();
    let json = config.to_json_pretty().unwrap();

    let rules = ids::load_rules(json.as_bytes()).unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].properties.len(), 2);

    let rows = validate(&model(), &rules);
    let csv = ids::export_report(&rows, ids::ReportFormat::Csv).unwrap();
    assert_eq!(csv.lines().count(), 5);
}

#[test]
fn test_tables_to_report() {
    let model = model();
    let properties = model_properties_table(&model);
    let walls = filter_level_class_type(&properties, ALL, "IfcWall", ALL);
    assert_eq!(walls.len(), 2);

    let quantities = quantities_view(&quantities_table(&model));
    let wall_quantities = filter_level_class_type(&quantities, ALL, "IfcWall", ALL);

    let mut book = ReportBook::new();
    book.add(ReportComponent::property(ALL, "IfcWall", ALL, "Pset_WallCommon.FireRating", &walls).unwrap());
    book.add(ReportComponent::quantity_table(
        ALL,
        "IfcWall",
        ALL,
        wall_quantities.with_total_row(&["Class"]),
    ));
    let volumes = wall_quantities.filter_eq("QuantityName", "NetVolume");
    book.add(ReportComponent::quantity(ALL, "IfcWall", ALL, "QuantityValue", &volumes).unwrap());

    let generated = NaiveDate::from_ymd_opt(2025, 9, 15).unwrap().and_hms_opt(10, 0, 0).unwrap();
    let html = book.to_html(REPORT_TITLE, generated);
    assert_eq!(html.matches("<h2>Component ").count(), 3);
    assert!(html.contains("Sum by QuantityValue"));
    assert!(html.contains("TOTAL"));

    let stats = health::health_stats(&model);
    assert_eq!(stats.most_common_name, "IfcBeam");
}

#[test]
fn test_schedule_edits_persist_and_price() {
    let mut model = model();
    let rows = vec![
        PlanRow {
            name: "Slab".to_string(),
            start: Some("2025-10-06T08:00:00".to_string()),
            duration: Some("P1W".to_string()),
            element_ids: Some("24".to_string()),
            ..PlanRow::default()
        },
        PlanRow {
            name: "Beams".to_string(),
            duration: Some("P3D".to_string()),
            element_ids: Some("22,26".to_string()),
            ..PlanRow::default()
        },
    ];
    schedule::create_tasks_from_plan(&mut model, 101, &rows, Some("Superstructure"), true).unwrap();

    let saved = IfcModel::parse(&model.to_step()).unwrap();
    let unscheduled = schedule::unscheduled_elements_table(&saved);
    let remaining: Vec<String> = unscheduled.column("Name").iter().map(|v| v.to_string()).collect();
    assert_eq!(remaining, vec!["C-01", "BR-01"]);

    let gantt = schedule::gantt(&saved, Some(101)).unwrap();
    assert!(gantt.iter().any(|g| g.task == "Slab"));

    let prices = PriceList::from([("IfcSlab".to_string(), 100.0)]);
    let boq = build_boq(&saved, &prices, &[]).unwrap();
    assert!((boq.grand_total - 1200.0).abs() < 1e-9);
}
