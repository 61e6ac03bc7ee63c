// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Flattened tables
//!
//! Every property, quantity, schedule and validation view is a [`Table`]:
//! ordered named columns over rows of [`PropertyValue`] cells. Filtering,
//! counting and export are shared by all pages.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Write;

use bim45d_core::PropertyValue;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

/// Filter value that disables a filter
pub const ALL: &str = "All";

pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Excel limit on worksheet name length
const SHEET_NAME_MAX: usize = 31;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<PropertyValue>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row, padding missing trailing cells with nulls
    pub fn push_row(&mut self, mut row: Vec<PropertyValue>) {
        row.resize(self.columns.len(), PropertyValue::Null);
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cells of one column; empty when the column does not exist
    pub fn column(&self, name: &str) -> Vec<&PropertyValue> {
        match self.column_index(name) {
            Some(idx) => self.rows.iter().map(|row| &row[idx]).collect(),
            None => Vec::new(),
        }
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&PropertyValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Rows whose `column` renders as `value`
    ///
    /// [`ALL`] and unknown columns leave the table unfiltered.
    pub fn filter_eq(&self, column: &str, value: &str) -> Table {
        let Some(idx) = self.column_index(column).filter(|_| value != ALL) else {
            return self.clone();
        };
        Table {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| !row[idx].is_null() && row[idx].to_string() == value)
                .cloned()
                .collect(),
        }
    }

    pub fn filter(&self, mut predicate: impl FnMut(&[PropertyValue]) -> bool) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|row| predicate(row)).cloned().collect(),
        }
    }

    /// Sorted distinct non-null values of a column
    pub fn distinct(&self, column: &str) -> Vec<String> {
        let mut values: Vec<String> = self
            .column(column)
            .into_iter()
            .filter(|v| !v.is_null())
            .map(|v| v.to_string())
            .collect();
        values.sort();
        values.dedup();
        values
    }

    /// `All` followed by the distinct values, for filter selectors
    pub fn options(&self, column: &str) -> Vec<String> {
        std::iter::once(ALL.to_string())
            .chain(self.distinct(column))
            .collect()
    }

    /// Occurrences of each value including nulls, most frequent first
    pub fn value_counts(&self, column: &str) -> Vec<(PropertyValue, usize)> {
        let mut counts: Vec<(PropertyValue, usize)> = Vec::new();
        for value in self.column(column) {
            match counts.iter_mut().find(|(v, _)| v == value) {
                Some((_, n)) => *n += 1,
                None => counts.push((value.clone(), 1)),
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.to_string().cmp(&b.0.to_string())));
        counts
    }

    /// Drop columns where every cell is null
    pub fn drop_empty_columns(&self) -> Table {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&idx| self.rows.iter().any(|row| !row[idx].is_null()))
            .collect();
        self.project(&keep)
    }

    /// Columns with at least one number and nothing but numbers or nulls
    pub fn numeric_columns(&self) -> Vec<String> {
        (0..self.columns.len())
            .filter(|&idx| {
                let mut seen = false;
                for row in &self.rows {
                    match &row[idx] {
                        PropertyValue::Null => {}
                        PropertyValue::Integer(_) | PropertyValue::Real(_) => seen = true,
                        _ => return false,
                    }
                }
                seen
            })
            .map(|idx| self.columns[idx].clone())
            .collect()
    }

    /// Columns holding text or booleans
    pub fn descriptive_columns(&self) -> Vec<String> {
        let numeric = self.numeric_columns();
        self.drop_empty_columns()
            .columns
            .into_iter()
            .filter(|c| !numeric.contains(c))
            .collect()
    }

    fn project(&self, indices: &[usize]) -> Table {
        Table {
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    /// Keep the named columns in the given order
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Result<Table> {
        let indices = columns
            .iter()
            .map(|name| {
                self.column_index(name.as_ref())
                    .ok_or_else(|| Error::invalid(format!("unknown column '{}'", name.as_ref())))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self.project(&indices))
    }

    /// Keep the named columns that exist, silently skipping the others
    pub fn select_existing<S: AsRef<str>>(&self, columns: &[S]) -> Table {
        let indices: Vec<usize> = columns
            .iter()
            .filter_map(|name| self.column_index(name.as_ref()))
            .collect();
        self.project(&indices)
    }

    pub fn column_sum(&self, column: &str) -> f64 {
        self.column(column).into_iter().filter_map(PropertyValue::as_f64).sum()
    }

    /// Append a summary row: `TOTAL` under the fixed columns, sums under the
    /// numeric ones, nulls elsewhere
    pub fn with_total_row<S: AsRef<str>>(&self, fixed_columns: &[S]) -> Table {
        let mut out = self.clone();
        if self.rows.is_empty() {
            return out;
        }
        let numeric = self.numeric_columns();
        let total = self
            .columns
            .iter()
            .map(|column| {
                if fixed_columns.iter().any(|f| f.as_ref() == column) {
                    PropertyValue::from("TOTAL")
                } else if numeric.contains(column) {
                    PropertyValue::Real(self.column_sum(column))
                } else {
                    PropertyValue::Null
                }
            })
            .collect();
        out.rows.push(total);
        out
    }

    /// Stack tables, taking the union of their columns in first-seen order
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Table {
        let mut out = Table::default();
        for table in tables {
            for column in &table.columns {
                if !out.has_column(column) {
                    out.columns.push(column.clone());
                    for row in out.rows.iter_mut() {
                        row.push(PropertyValue::Null);
                    }
                }
            }
            let mapping: Vec<usize> = table
                .columns
                .iter()
                .filter_map(|c| out.column_index(c))
                .collect();
            for row in table.rows {
                let mut cells = vec![PropertyValue::Null; out.columns.len()];
                for (value, &target) in row.into_iter().zip(&mapping) {
                    cells[target] = value;
                }
                out.rows.push(cells);
            }
        }
        out
    }

    /// Stable sort by one column; nulls last
    pub fn sort_by_column(&mut self, column: &str) {
        if let Some(idx) = self.column_index(column) {
            self.rows.sort_by(|a, b| compare_cells(&a[idx], &b[idx]));
        }
    }

    /// Group on key columns and sum a value column
    ///
    /// Returns `(keys, row count, sum)` per group in key order.
    pub fn group_sum<S: AsRef<str>>(
        &self,
        keys: &[S],
        value_column: &str,
    ) -> Result<Vec<(Vec<PropertyValue>, usize, f64)>> {
        let key_idx = keys
            .iter()
            .map(|k| {
                self.column_index(k.as_ref())
                    .ok_or_else(|| Error::invalid(format!("unknown column '{}'", k.as_ref())))
            })
            .collect::<Result<Vec<_>>>()?;
        let value_idx = self
            .column_index(value_column)
            .ok_or_else(|| Error::invalid(format!("unknown column '{}'", value_column)))?;

        let mut groups: BTreeMap<Vec<String>, (Vec<PropertyValue>, usize, f64)> = BTreeMap::new();
        for row in &self.rows {
            let key: Vec<PropertyValue> = key_idx.iter().map(|&i| row[i].clone()).collect();
            let entry = groups
                .entry(key.iter().map(|v| v.to_string()).collect())
                .or_insert_with(|| (key, 0, 0.0));
            entry.1 += 1;
            entry.2 += row[value_idx].as_f64().unwrap_or(0.0);
        }
        Ok(groups.into_values().collect())
    }

    fn write_delimited(&self, delimiter: u8) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|v| v.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| Error::invalid(e.to_string()))
    }

    pub fn to_csv(&self) -> Result<String> {
        self.write_delimited(b',')
    }

    pub fn to_tsv(&self) -> Result<String> {
        self.write_delimited(b'\t')
    }

    /// `<table>` markup with escaped cells
    pub fn to_html(&self) -> String {
        self.to_html_with_class("data")
    }

    pub fn to_html_with_class(&self, class: &str) -> String {
        let mut out = format!("<table class=\"{}\">\n<thead><tr>", escape_html(class));
        for column in &self.columns {
            let _ = write!(out, "<th>{}</th>", escape_html(column));
        }
        out.push_str("</tr></thead>\n<tbody>\n");
        for row in &self.rows {
            out.push_str("<tr>");
            for cell in row {
                let _ = write!(out, "<td>{}</td>", escape_html(&cell.to_string()));
            }
            out.push_str("</tr>\n");
        }
        out.push_str("</tbody>\n</table>\n");
        out
    }

    /// Single-sheet workbook with a bold header row
    pub fn to_xlsx(&self, sheet_name: &str) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name_for(sheet_name, &[]))?;
        self.write_sheet(sheet)?;
        Ok(workbook.save_to_buffer()?)
    }

    fn write_sheet(&self, sheet: &mut Worksheet) -> Result<()> {
        let header = Format::new().set_bold();
        for (col, name) in self.columns.iter().enumerate() {
            sheet.write_string_with_format(0, sheet_col(col)?, name, &header)?;
        }
        for (i, row) in self.rows.iter().enumerate() {
            let r = u32::try_from(i + 1).map_err(|_| Error::invalid("too many rows for a worksheet"))?;
            for (col, value) in row.iter().enumerate() {
                let c = sheet_col(col)?;
                match value {
                    PropertyValue::Null => {}
                    PropertyValue::Bool(b) => {
                        sheet.write_boolean(r, c, *b)?;
                    }
                    PropertyValue::Integer(n) => {
                        sheet.write_number(r, c, *n as f64)?;
                    }
                    PropertyValue::Real(x) => {
                        sheet.write_number(r, c, *x)?;
                    }
                    PropertyValue::Text(text) => {
                        sheet.write_string(r, c, text)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// One JSON object per row, keys in column order
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records())?)
    }

    pub fn records(&self) -> Records<'_> {
        Records(self)
    }
}

/// Row-oriented serialization of a [`Table`]
pub struct Records<'a>(&'a Table);

struct Record<'a> {
    columns: &'a [String],
    row: &'a [PropertyValue],
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.columns.iter().zip(self.row) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl Serialize for Records<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.rows.len()))?;
        for row in &self.0.rows {
            seq.serialize_element(&Record {
                columns: &self.0.columns,
                row,
            })?;
        }
        seq.end()
    }
}

/// Workbook with one sheet per distinct value of `column`
///
/// Each sheet holds the matching rows with their all-null columns dropped.
/// Rows with a null key are left out.
pub fn workbook_by(table: &Table, column: &str) -> Result<Vec<u8>> {
    if !table.has_column(column) {
        return Err(Error::invalid(format!("unknown column '{}'", column)));
    }
    let mut workbook = Workbook::new();
    let mut names: Vec<String> = Vec::new();
    for value in table.distinct(column) {
        let part = table.filter_eq(column, &value).drop_empty_columns();
        let name = sheet_name_for(&value, &names);
        let sheet = workbook.add_worksheet();
        sheet.set_name(&name)?;
        part.write_sheet(sheet)?;
        names.push(name);
    }
    if names.is_empty() {
        let sheet = workbook.add_worksheet();
        table.write_sheet(sheet)?;
    }
    tracing::debug!(column, sheets = names.len(), "Built workbook");
    Ok(workbook.save_to_buffer()?)
}

fn sheet_col(col: usize) -> Result<u16> {
    u16::try_from(col).map_err(|_| Error::invalid("too many columns for a worksheet"))
}

/// Valid, unused worksheet name derived from `value`
fn sheet_name_for(value: &str, taken: &[String]) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { '_' } else { c })
        .take(SHEET_NAME_MAX)
        .collect();
    let base = match cleaned.trim_matches('\'') {
        "" => "Sheet".to_string(),
        name => name.to_string(),
    };
    let mut name = base.clone();
    let mut n = 1;
    while taken.iter().any(|t| t.eq_ignore_ascii_case(&name)) {
        n += 1;
        let suffix = format!(" ({})", n);
        let keep = SHEET_NAME_MAX.saturating_sub(suffix.len());
        name = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
    }
    name
}

/// Order cells: numbers numerically, text lexically, nulls last
pub fn compare_cells(a: &PropertyValue, b: &PropertyValue) -> Ordering {
    match (a, b) {
        (PropertyValue::Null, PropertyValue::Null) => Ordering::Equal,
        (PropertyValue::Null, _) => Ordering::Greater,
        (_, PropertyValue::Null) => Ordering::Less,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => a.to_string().cmp(&b.to_string()),
        },
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new(["Class", "Level", "Qto.Length", "Note"]);
        table.push_row(vec!["IfcWall".into(), "L1".into(), 2.0.into(), PropertyValue::Null]);
        table.push_row(vec!["IfcWall".into(), "L2".into(), 3.5.into()]);
        table.push_row(vec!["IfcBeam".into(), PropertyValue::Null, 1i64.into()]);
        table
    }

    #[test]
    fn test_filter_all_is_noop() {
        let table = sample();
        assert_eq!(table.filter_eq("Class", ALL).len(), 3);
        assert_eq!(table.filter_eq("Class", "IfcWall").len(), 2);
        assert_eq!(table.filter_eq("Missing", "x").len(), 3);
    }

    #[test]
    fn test_distinct_and_counts() {
        let table = sample();
        assert_eq!(table.distinct("Level"), vec!["L1", "L2"]);
        assert_eq!(table.options("Class"), vec!["All", "IfcBeam", "IfcWall"]);
        let counts = table.value_counts("Class");
        assert_eq!(counts[0], (PropertyValue::from("IfcWall"), 2));
        let levels = table.value_counts("Level");
        assert!(levels.iter().any(|(v, n)| v.is_null() && *n == 1));
    }

    #[test]
    fn test_empty_and_numeric_columns() {
        let table = sample();
        let trimmed = table.drop_empty_columns();
        assert!(!trimmed.has_column("Note"));
        assert_eq!(table.numeric_columns(), vec!["Qto.Length"]);
        assert_eq!(table.descriptive_columns(), vec!["Class", "Level"]);
    }

    #[test]
    fn test_total_row() {
        let table = sample().select(&["Class", "Qto.Length"]).unwrap();
        let totals = table.with_total_row(&["Class"]);
        assert_eq!(totals.len(), 4);
        let last = totals.rows.last().unwrap();
        assert_eq!(last[0], PropertyValue::from("TOTAL"));
        assert_eq!(last[1], PropertyValue::Real(6.5));
    }

    #[test]
    fn test_select_unknown_column_fails() {
        assert!(sample().select(&["Nope"]).is_err());
        assert_eq!(sample().select_existing(&["Nope", "Class"]).columns, vec!["Class"]);
    }

    #[test]
    fn test_concat_unions_columns() {
        let mut a = Table::new(["Name", "A"]);
        a.push_row(vec!["x".into(), 1i64.into()]);
        let mut b = Table::new(["Name", "B"]);
        b.push_row(vec!["y".into(), 2i64.into()]);
        let joined = Table::concat([a, b]);
        assert_eq!(joined.columns, vec!["Name", "A", "B"]);
        assert_eq!(joined.rows[0][2], PropertyValue::Null);
        assert_eq!(joined.rows[1][1], PropertyValue::Null);
        assert_eq!(joined.rows[1][2], PropertyValue::Integer(2));
    }

    #[test]
    fn test_group_sum() {
        let groups = sample().group_sum(&["Class"], "Qto.Length").unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].0, vec![PropertyValue::from("IfcWall")]);
        assert_eq!((groups[1].1, groups[1].2), (2, 5.5));
    }

    #[test]
    fn test_exports() {
        let table = sample();
        let csv = table.to_csv().unwrap();
        assert!(csv.starts_with("Class,Level,Qto.Length,Note\n"));
        assert!(csv.contains("IfcWall,L2,3.5,\n"));
        assert!(table.to_tsv().unwrap().contains("IfcBeam\t\t1\t"));

        let mut html_table = Table::new(["<b>"]);
        html_table.push_row(vec!["a & b".into()]);
        let html = html_table.to_html();
        assert!(html.contains("<th>&lt;b&gt;</th>"));
        assert!(html.contains("<td>a &amp; b</td>"));

        let json: serde_json::Value = serde_json::from_str(&table.to_json().unwrap()).unwrap();
        assert_eq!(json[0]["Qto.Length"], 2.0);
        assert!(json[2]["Level"].is_null());
    }

    fn read_sheet(bytes: &[u8], sheet: &str) -> calamine::Range<calamine::Data> {
        use calamine::Reader;
        let mut workbook: calamine::Xlsx<_> = calamine::open_workbook_from_rs(std::io::Cursor::new(bytes.to_vec())).unwrap();
        workbook.worksheet_range(sheet).unwrap()
    }

    #[test]
    fn test_xlsx_export() {
        use calamine::Data;
        let bytes = sample().to_xlsx("full_dataframe").unwrap();
        assert!(bytes.starts_with(b"PK"));

        let range = read_sheet(&bytes, "full_dataframe");
        assert_eq!(range.height(), 4);
        assert_eq!(range.get_value((0, 2)), Some(&Data::String("Qto.Length".into())));
        assert_eq!(range.get_value((2, 0)), Some(&Data::String("IfcWall".into())));
        assert_eq!(range.get_value((2, 2)), Some(&Data::Float(3.5)));
        assert_eq!(range.get_value((3, 2)), Some(&Data::Float(1.0)));
    }

    #[test]
    fn test_workbook_one_sheet_per_class() {
        use calamine::{Data, Reader};
        let bytes = workbook_by(&sample(), "Class").unwrap();
        let workbook: calamine::Xlsx<_> = calamine::open_workbook_from_rs(std::io::Cursor::new(bytes.clone())).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["IfcBeam".to_string(), "IfcWall".to_string()]);

        let walls = read_sheet(&bytes, "IfcWall");
        assert_eq!(walls.height(), 3);
        // Note is null on every wall row
        assert_eq!(walls.width(), 3);
        assert_eq!(walls.get_value((1, 1)), Some(&Data::String("L1".into())));

        let beams = read_sheet(&bytes, "IfcBeam");
        assert_eq!(beams.height(), 2);
        assert_eq!(beams.width(), 2);

        assert!(workbook_by(&sample(), "Missing").is_err());
    }

    #[test]
    fn test_sheet_names_are_valid_and_unique() {
        assert_eq!(sheet_name_for("Pset/Common:[x]", &[]), "Pset_Common__x_");
        assert_eq!(sheet_name_for("", &[]), "Sheet");
        let long = "IfcStructuralSurfaceMemberVarying";
        let first = sheet_name_for(long, &[]);
        assert_eq!(first.chars().count(), SHEET_NAME_MAX);
        let second = sheet_name_for(long, &[first.clone()]);
        assert!(second.ends_with(" (2)"));
        assert_eq!(second.chars().count(), SHEET_NAME_MAX);
    }

    #[test]
    fn test_sort_nulls_last() {
        let mut table = sample();
        table.sort_by_column("Level");
        assert!(table.rows[2][1].is_null());
        assert_eq!(table.rows[0][1], PropertyValue::from("L1"));
    }
}
