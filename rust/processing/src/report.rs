// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Report composer
//!
//! Tables and charts picked on the properties and quantities pages are
//! collected in a [`ReportBook`] and rendered as one standalone HTML page
//! or as an A4 PDF.

use std::fmt::Write;

use chrono::NaiveDateTime;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Rect, Rgb,
};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::objects::value_distribution;
use crate::table::{escape_html, Table, ALL};

pub const REPORT_TITLE: &str = "Custom Distribution Report";
pub const REPORT_FILE: &str = "report_distribution.html";
pub const REPORT_PDF_FILE: &str = "report_distribution.pdf";

/// Bar chart data: one value per label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub title: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ChartSeries {
    /// Labels and values taken from two columns of a table
    pub fn from_table(title: impl Into<String>, table: &Table, label_column: &str, value_column: &str) -> Result<Self> {
        let (Some(label_idx), Some(value_idx)) = (table.column_index(label_column), table.column_index(value_column))
        else {
            return Err(Error::invalid(format!(
                "chart needs columns '{}' and '{}'",
                label_column, value_column
            )));
        };
        Ok(ChartSeries {
            title: title.into(),
            labels: table.rows.iter().map(|r| r[label_idx].to_string()).collect(),
            values: table
                .rows
                .iter()
                .map(|r| r[value_idx].as_f64().unwrap_or(0.0))
                .collect(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Horizontal bars scaled to the largest value
    pub fn to_html(&self) -> String {
        let max = self.values.iter().cloned().fold(0.0_f64, f64::max);
        let mut out = String::from("<div class='chart'>\n");
        let _ = writeln!(out, "<h3>{}</h3>", escape_html(&self.title));
        for (label, value) in self.labels.iter().zip(&self.values) {
            let width = if max > 0.0 { value / max * 100.0 } else { 0.0 };
            let _ = writeln!(
                out,
                "<div class='bar-row'><span class='bar-label'>{}</span>\
                 <span class='bar' style='width:{:.1}%'></span>\
                 <span class='bar-value'>{}</span></div>",
                escape_html(if label.is_empty() { "(empty)" } else { label }),
                width,
                value
            );
        }
        out.push_str("</div>\n");
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Property,
    QuantityTable,
    Quantity,
}

impl ComponentKind {
    pub fn title(self) -> &'static str {
        match self {
            ComponentKind::Property => "Property",
            ComponentKind::QuantityTable => "Quantity_Table",
            ComponentKind::Quantity => "Quantity",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportComponent {
    pub kind: ComponentKind,
    pub level: String,
    pub class: String,
    pub type_filter: String,
    pub property: Option<String>,
    pub quantity: Option<String>,
    pub table: Table,
    pub chart: Option<ChartSeries>,
}

impl ReportComponent {
    /// Value distribution of one property over the filtered rows
    pub fn property(level: &str, class: &str, type_filter: &str, property: &str, filtered: &Table) -> Result<Self> {
        if !filtered.has_column(property) {
            return Err(Error::invalid(format!("unknown property column '{}'", property)));
        }
        let table = value_distribution(filtered, property);
        let chart = ChartSeries::from_table(format!("Distribution of {}", property), &table, property, "Count")?;
        Ok(ReportComponent {
            kind: ComponentKind::Property,
            level: level.to_string(),
            class: class.to_string(),
            type_filter: type_filter.to_string(),
            property: Some(property.to_string()),
            quantity: None,
            table,
            chart: Some(chart),
        })
    }

    /// The quantities table as displayed, total row included
    pub fn quantity_table(level: &str, class: &str, type_filter: &str, table: Table) -> Self {
        ReportComponent {
            kind: ComponentKind::QuantityTable,
            level: level.to_string(),
            class: class.to_string(),
            type_filter: type_filter.to_string(),
            property: None,
            quantity: None,
            table,
            chart: None,
        }
    }

    /// One numeric quantity per element, charted as sums per distinct value
    pub fn quantity(level: &str, class: &str, type_filter: &str, quantity: &str, filtered: &Table) -> Result<Self> {
        if !filtered.has_column(quantity) {
            return Err(Error::invalid(format!("unknown quantity column '{}'", quantity)));
        }
        let table = if filtered.has_column("GlobalId") {
            filtered.select_existing(&["GlobalId", "Class", "Name", quantity])
        } else {
            filtered.select(&[quantity])?
        };
        let groups = filtered.group_sum(&[quantity], quantity)?;
        let chart = ChartSeries {
            title: format!("Sum by {}", quantity),
            labels: groups.iter().map(|(key, _, _)| key[0].to_string()).collect(),
            values: groups.iter().map(|(_, _, sum)| *sum).collect(),
        };
        Ok(ReportComponent {
            kind: ComponentKind::Quantity,
            level: level.to_string(),
            class: class.to_string(),
            type_filter: type_filter.to_string(),
            property: None,
            quantity: Some(quantity.to_string()),
            table,
            chart: Some(chart),
        })
    }

    /// Short label for component lists
    pub fn label(&self) -> String {
        let subject = self
            .property
            .as_deref()
            .or(self.quantity.as_deref())
            .unwrap_or("");
        format!("{} - {}", self.kind.title(), subject)
    }

    fn filters(&self) -> impl Iterator<Item = (&'static str, &String)> {
        [("Level", &self.level), ("Class", &self.class), ("Type", &self.type_filter)]
            .into_iter()
            .filter(|(_, value)| !value.is_empty() && value.as_str() != ALL)
    }

    fn meta(&self) -> Vec<String> {
        self.filters()
            .map(|(name, value)| format!("{}: <b>{}</b>", name, escape_html(value)))
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportBook {
    components: Vec<ReportComponent>,
}

const STYLE: &str = "body{font-family: Arial, Helvetica, sans-serif; padding:24px; color:#1f2937;}
h1{margin:0 0 8px 0}
h2{margin:24px 0 8px 0; color:#111827}
.subtitle{color:#6b7280; margin-bottom:20px}
.meta{color:#666}
.chart{margin:12px 0}
.bar-row{display:flex; align-items:center; gap:8px; font-size:13px; margin:2px 0}
.bar-label{width:220px; overflow:hidden; text-overflow:ellipsis; white-space:nowrap}
.bar{display:inline-block; height:14px; background:#00c896}
table.tbl{width:100%; border-collapse:collapse; font-size:13px;}
table.tbl thead th{background:#f9fafb; text-align:left; border-bottom:1px solid #e5e7eb; padding:8px}
table.tbl td{border-bottom:1px solid #f3f4f6; padding:6px; vertical-align:top;}
table.tbl tr:nth-child(even){background:#fbfdff}
.footer{margin-top:24px; color:#9ca3af; font-size:12px}";

impl ReportBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn components(&self) -> &[ReportComponent] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn add(&mut self, component: ReportComponent) {
        tracing::debug!(kind = component.kind.title(), rows = component.table.len(), "Added report component");
        self.components.push(component);
    }

    pub fn remove(&mut self, index: usize) -> Result<ReportComponent> {
        if index >= self.components.len() {
            return Err(Error::RuleIndex {
                index,
                len: self.components.len(),
            });
        }
        Ok(self.components.remove(index))
    }

    pub fn clear(&mut self) {
        self.components.clear();
    }

    /// Standalone HTML page, components numbered from 1
    pub fn to_html(&self, title: &str, generated: NaiveDateTime) -> String {
        let title = escape_html(title);
        let mut out = String::new();
        let _ = write!(
            out,
            "<!doctype html>\n<html>\n<head>\n<meta charset='utf-8'/>\n<title>{title}</title>\n\
             <style>\n{STYLE}\n</style>\n</head>\n<body>\n<h1>{title}</h1>\n\
             <div class='subtitle'>Generated on: {}</div>\n",
            generated.format("%Y-%m-%d %H:%M")
        );

        for (i, component) in self.components.iter().enumerate() {
            let _ = writeln!(out, "<h2>Component {}: {}</h2>", i + 1, component.kind.title());
            let meta = component.meta();
            if !meta.is_empty() {
                let _ = writeln!(out, "<p class='meta'>{}</p>", meta.join(" \u{2022} "));
            }
            if let Some(chart) = component.chart.as_ref().filter(|c| !c.is_empty()) {
                out.push_str(&chart.to_html());
            }
            if component.table.is_empty() && component.table.columns.is_empty() {
                out.push_str("<p>No table available</p>\n");
            } else {
                out.push_str(&component.table.to_html_with_class("tbl"));
            }
        }

        out.push_str("<div class='footer'>End of report</div>\n</body>\n</html>\n");
        out
    }

    /// A4 PDF with the same layout as [`ReportBook::to_html`]
    pub fn to_pdf(&self, title: &str, generated: NaiveDateTime) -> Result<Vec<u8>> {
        let mut pdf = PdfPages::new(title)?;
        pdf.text(title, 16.0, true, MARGIN);
        pdf.text(&format!("Generated on: {}", generated.format("%Y-%m-%d %H:%M")), 9.0, false, MARGIN);
        pdf.gap(4.0);

        for (i, component) in self.components.iter().enumerate() {
            pdf.text(&format!("Component {}: {}", i + 1, component.kind.title()), 12.0, true, MARGIN);
            let meta: Vec<String> = component.filters().map(|(name, value)| format!("{}: {}", name, value)).collect();
            if !meta.is_empty() {
                pdf.text(&meta.join(" | "), 8.0, false, MARGIN);
            }
            if let Some(chart) = component.chart.as_ref().filter(|c| !c.is_empty()) {
                pdf.chart(chart);
            }
            if component.table.is_empty() && component.table.columns.is_empty() {
                pdf.text("No table available", 8.0, false, MARGIN);
            } else {
                pdf.table(&component.table);
            }
            pdf.gap(4.0);
        }
        pdf.text("End of report", 8.0, false, MARGIN);
        tracing::debug!(components = self.components.len(), pages = pdf.pages, "Rendered PDF report");
        pdf.finish()
    }
}

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const LAYER: &str = "Report";
/// Columns printed per table; the rest are counted in a note
const PDF_MAX_COLUMNS: usize = 8;
const BAR_LEFT: f32 = 75.0;
const BAR_MAX_WIDTH: f32 = 95.0;

/// Top-down writer over A4 pages; positions are in millimetres
struct PdfPages {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl PdfPages {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        })
    }

    /// Start a new page unless `height` still fits
    fn reserve(&mut self, height: f32) {
        if self.y - height >= MARGIN {
            return;
        }
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.pages += 1;
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn line_height(size: f32) -> f32 {
        size * 0.5
    }

    fn text(&mut self, text: &str, size: f32, bold: bool, x: f32) {
        let height = Self::line_height(size);
        self.reserve(height);
        self.y -= height;
        self.put(text, size, bold, x, self.y);
    }

    fn put(&self, text: &str, size: f32, bold: bool, x: f32, y: f32) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(y), font);
    }

    fn fill(&self, r: f32, g: f32, b: f32) {
        self.layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
    }

    fn rect(&self, x: f32, y: f32, width: f32, height: f32) {
        self.layer.add_rect(Rect::new(Mm(x), Mm(y), Mm(x + width), Mm(y + height)));
    }

    /// Horizontal bars scaled to the largest value
    fn chart(&mut self, chart: &ChartSeries) {
        self.text(&chart.title, 10.0, true, MARGIN);
        let max = chart.values.iter().cloned().fold(0.0_f64, f64::max);
        let row = Self::line_height(8.0) + 1.0;
        for (label, value) in chart.labels.iter().zip(&chart.values) {
            self.reserve(row);
            self.y -= row;
            let label = if label.is_empty() { "(empty)" } else { label };
            self.put(&clip(label, 40), 8.0, false, MARGIN, self.y);
            let width = if max > 0.0 { (value / max) as f32 * BAR_MAX_WIDTH } else { 0.0 };
            self.fill(0.0, 0.78, 0.59);
            self.rect(BAR_LEFT, self.y, width.max(0.2), row - 1.5);
            self.fill(0.0, 0.0, 0.0);
            self.put(&value.to_string(), 8.0, false, BAR_LEFT + width + 2.0, self.y);
        }
        self.gap(2.0);
    }

    /// Grid of cells with a shaded header, header repeated on new pages
    fn table(&mut self, table: &Table) {
        let shown = table.columns.len().min(PDF_MAX_COLUMNS).max(1);
        let col_width = (PAGE_WIDTH - 2.0 * MARGIN) / shown as f32;
        let size = 7.0;
        let row = Self::line_height(size) + 1.0;
        // Helvetica averages about half an em per character
        let max_chars = ((col_width / (size * 0.3528 * 0.5)) as usize).saturating_sub(1).max(3);

        let header = |pdf: &mut PdfPages| {
            pdf.reserve(row);
            pdf.y -= row;
            pdf.fill(0.85, 0.85, 0.85);
            pdf.rect(MARGIN, pdf.y - 1.0, PAGE_WIDTH - 2.0 * MARGIN, row);
            pdf.fill(0.0, 0.0, 0.0);
            for (i, column) in table.columns.iter().take(shown).enumerate() {
                pdf.put(&clip(column, max_chars), size, true, MARGIN + i as f32 * col_width + 0.5, pdf.y);
            }
        };

        header(self);
        for cells in &table.rows {
            if self.y - row < MARGIN {
                self.reserve(PAGE_HEIGHT);
                header(self);
            }
            self.y -= row;
            for (i, cell) in cells.iter().take(shown).enumerate() {
                self.put(&clip(&cell.to_string(), max_chars), size, false, MARGIN + i as f32 * col_width + 0.5, self.y);
            }
        }
        if table.columns.len() > shown {
            self.text(
                &format!("({} more columns in the HTML and XLSX exports)", table.columns.len() - shown),
                7.0,
                false,
                MARGIN,
            );
        }
    }

    fn finish(self) -> Result<Vec<u8>> {
        Ok(self.doc.save_to_bytes()?)
    }
}

/// First `max` characters, with `...` when cut
fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use bim45d_core::PropertyValue;
    use chrono::NaiveDate;

    use super::*;
    use crate::fixture;
    use crate::objects::{filter_level_class_type, model_properties_table, quantities_table, quantities_view};

    fn generated() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 15)
            .and_then(|d| d.and_hms_opt(8, 30, 0))
            .unwrap()
    }

    #[test]
    fn test_chart_from_table() {
        let mut table = Table::new(["FireRating", "Count"]);
        table.push_row(vec!["REI 120".into(), PropertyValue::from(3_i64)]);
        table.push_row(vec![PropertyValue::Null, PropertyValue::from(1_i64)]);
        let chart = ChartSeries::from_table("Distribution", &table, "FireRating", "Count").unwrap();
        assert_eq!(chart.labels, vec!["REI 120".to_string(), String::new()]);
        assert_eq!(chart.values, vec![3.0, 1.0]);

        let html = chart.to_html();
        assert!(html.contains("width:100.0%"));
        assert!(html.contains("(empty)"));
        assert!(ChartSeries::from_table("x", &table, "Missing", "Count").is_err());
    }

    #[test]
    fn test_property_component() {
        let model = fixture::model();
        let table = model_properties_table(&model);
        let walls = filter_level_class_type(&table, ALL, "IfcWall", ALL);
        let component = ReportComponent::property("Level 0", "IfcWall", ALL, "Pset_WallCommon.FireRating", &walls).unwrap();
        assert_eq!(component.kind, ComponentKind::Property);
        assert_eq!(component.table.columns, vec!["Pset_WallCommon.FireRating", "Count"]);
        let chart = component.chart.as_ref().unwrap();
        assert_eq!(chart.title, "Distribution of Pset_WallCommon.FireRating");
        assert_eq!(chart.values.iter().sum::<f64>(), walls.len() as f64);

        assert!(ReportComponent::property(ALL, ALL, ALL, "Nope.Nope", &walls).is_err());
    }

    #[test]
    fn test_report_book_html() {
        let model = fixture::model();
        let properties = model_properties_table(&model);
        let quantities = quantities_view(&quantities_table(&model));

        let mut book = ReportBook::new();
        book.add(ReportComponent::property("Level 0", "IfcWall", ALL, "Name", &properties.filter_eq("Class", "IfcWall")).unwrap());
        book.add(ReportComponent::quantity_table(ALL, ALL, ALL, quantities.clone()));
        assert_eq!(book.len(), 2);
        assert_eq!(book.components()[0].label(), "Property - Name");

        let html = book.to_html(REPORT_TITLE, generated());
        assert!(html.contains("<h1>Custom Distribution Report</h1>"));
        assert!(html.contains("Generated on: 2025-09-15 08:30"));
        assert!(html.contains("<h2>Component 1: Property</h2>"));
        assert!(html.contains("<h2>Component 2: Quantity_Table</h2>"));
        assert!(html.contains("Level: <b>Level 0</b> \u{2022} Class: <b>IfcWall</b>"));
        assert!(!html.contains("Type: <b>"));
        assert!(html.contains("<table class=\"tbl\">"));
        assert!(html.trim_end().ends_with("</html>"));

        // chart appears before its table
        let chart_at = html.find("<div class='chart'>").unwrap();
        let table_at = html.find("<table class=\"tbl\">").unwrap();
        assert!(chart_at < table_at);
    }

    /// Text shown on each page of a PDF, in drawing order
    fn pdf_page_texts(bytes: &[u8]) -> Vec<String> {
        let doc = lopdf::Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .values()
            .map(|&page| {
                let content = lopdf::content::Content::decode(&doc.get_page_content(page).unwrap()).unwrap();
                let mut text = String::new();
                for op in content.operations.iter().filter(|op| op.operator == "Tj" || op.operator == "TJ") {
                    for operand in &op.operands {
                        let parts = match operand.as_array() {
                            Ok(items) => items.iter().filter_map(|i| i.as_str().ok()).collect(),
                            Err(_) => operand.as_str().ok().into_iter().collect::<Vec<_>>(),
                        };
                        for part in parts {
                            text.push_str(&String::from_utf8_lossy(part));
                        }
                    }
                    text.push('\n');
                }
                text
            })
            .collect()
    }

    #[test]
    fn test_report_book_pdf() {
        let model = fixture::model();
        let properties = model_properties_table(&model);
        let mut book = ReportBook::new();
        book.add(ReportComponent::property("Level 0", "IfcWall", ALL, "Name", &properties.filter_eq("Class", "IfcWall")).unwrap());
        book.add(ReportComponent::quantity_table(ALL, ALL, ALL, quantities_view(&quantities_table(&model))));

        let bytes = book.to_pdf(REPORT_TITLE, generated()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let pages = pdf_page_texts(&bytes);
        assert_eq!(pages.len(), 1);
        let text = &pages[0];
        assert!(text.contains("Custom Distribution Report"));
        assert!(text.contains("Generated on: 2025-09-15 08:30"));
        assert!(text.contains("Component 1: Property"));
        assert!(text.contains("Level: Level 0 | Class: IfcWall"));
        assert!(text.contains("Distribution of Name"));
        assert!(text.contains("W-01"));
        assert!(text.contains("Component 2: Quantity_Table"));
    }

    #[test]
    fn test_long_pdf_table_breaks_pages() {
        let mut table = Table::new(["Name", "Value"]);
        for i in 0..200 {
            table.push_row(vec![format!("Row {}", i).into(), PropertyValue::from(i as i64)]);
        }
        let mut book = ReportBook::new();
        book.add(ReportComponent::quantity_table(ALL, ALL, ALL, table));

        let pages = pdf_page_texts(&book.to_pdf("Long", generated()).unwrap());
        assert!(pages.len() > 1);
        // header repeated at the top of the next page
        assert!(pages[1].starts_with("Name\nValue\n"));
        assert!(pages.last().unwrap().contains("Row 199"));
        assert!(pages.last().unwrap().contains("End of report"));
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip("IfcWall", 10), "IfcWall");
        assert_eq!(clip("Pset_WallCommon.FireRating", 10), "Pset_Wa...");
    }

    #[test]
    fn test_remove_and_clear() {
        let mut book = ReportBook::new();
        book.add(ReportComponent::quantity_table(ALL, ALL, ALL, Table::new(["A"])));
        assert!(matches!(book.remove(3), Err(Error::RuleIndex { index: 3, len: 1 })));
        assert_eq!(book.len(), 1);
        book.remove(0).unwrap();
        assert!(book.is_empty());

        book.add(ReportComponent::quantity_table(ALL, ALL, ALL, Table::new(["A"])));
        book.clear();
        assert!(book.is_empty());
    }
}
