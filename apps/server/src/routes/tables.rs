// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property and quantity tables with Level, Class and Type filters.

use axum::{extract::Query, response::Response, Json};
use bim45d_processing::objects::{self, filter_level_class_type};
use bim45d_processing::report::ChartSeries;
use bim45d_processing::table::workbook_by;
use bim45d_processing::{Table, ALL};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::CurrentSession;
use crate::routes::{attachment, content, CSV, HTML, XLSX};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    #[default]
    Json,
    Csv,
    Html,
    Xlsx,
}

impl TableFormat {
    /// `stem.csv` or `stem.xlsx`
    pub fn file_name(self, stem: &str) -> String {
        match self {
            TableFormat::Xlsx => format!("{}.xlsx", stem),
            _ => format!("{}.csv", stem),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TableQuery {
    pub level: Option<String>,
    pub class: Option<String>,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub format: TableFormat,
    /// XLSX only: one worksheet per class
    #[serde(default)]
    pub by_class: bool,
}

impl TableQuery {
    fn level(&self) -> &str {
        self.level.as_deref().unwrap_or(ALL)
    }

    fn class(&self) -> &str {
        self.class.as_deref().unwrap_or(ALL)
    }

    fn type_name(&self) -> &str {
        self.type_name.as_deref().unwrap_or(ALL)
    }

    pub fn apply(&self, table: &Table) -> Table {
        filter_level_class_type(table, self.level(), self.class(), self.type_name())
    }
}

/// Table plus the filter choices of the unfiltered data
#[derive(Debug, Serialize)]
pub struct TableResponse {
    pub levels: Vec<String>,
    pub classes: Vec<String>,
    pub types: Vec<String>,
    pub table: Table,
}

fn respond(query: &TableQuery, full: &Table, table: Table, stem: &str) -> Result<Response, ApiError> {
    let file_name = query.format.file_name(stem);
    match query.format {
        TableFormat::Csv => attachment(CSV, &file_name, table.to_csv()?),
        TableFormat::Xlsx => {
            let bytes = if query.by_class {
                workbook_by(&table, "Class")?
            } else {
                table.to_xlsx(stem)?
            };
            attachment(XLSX, &file_name, bytes)
        }
        TableFormat::Html => content(HTML, table.to_html()),
        TableFormat::Json => {
            let body = TableResponse {
                levels: full.options("Level"),
                classes: full.options("Class"),
                types: objects::type_options(full, query.class()),
                table,
            };
            content(crate::routes::JSON, serde_json::to_vec(&body)?)
        }
    }
}

/// GET /api/v1/properties?level=&class=&type=&format=&by_class=
pub async fn properties(current: CurrentSession, Query(query): Query<TableQuery>) -> Result<Response, ApiError> {
    let model = current.model().await?;
    let full = tokio::task::spawn_blocking(move || objects::model_properties_table(&model)).await?;
    let filtered = query.apply(&full).drop_empty_columns();
    respond(&query, &full, filtered, "full_dataframe")
}

/// GET /api/v1/quantities?level=&class=&type=&format=&by_class=
pub async fn quantities(current: CurrentSession, Query(query): Query<TableQuery>) -> Result<Response, ApiError> {
    let model = current.model().await?;
    let full = tokio::task::spawn_blocking(move || objects::quantities_table(&model)).await?;
    let view = objects::quantities_view(&query.apply(&full));
    respond(&query, &full, view, "quantities")
}

#[derive(Debug, Deserialize)]
pub struct DistributionQuery {
    pub column: String,
    #[serde(flatten)]
    pub filter: TableQuery,
}

#[derive(Debug, Serialize)]
pub struct DistributionResponse {
    pub table: Table,
    pub chart: ChartSeries,
    pub chart_html: String,
}

/// GET /api/v1/properties/distribution?column=&level=&class=&type=
pub async fn distribution(
    current: CurrentSession,
    Query(query): Query<DistributionQuery>,
) -> Result<Json<DistributionResponse>, ApiError> {
    let model = current.model().await?;
    let full = tokio::task::spawn_blocking(move || objects::model_properties_table(&model)).await?;
    let filtered = query.filter.apply(&full);
    if !filtered.has_column(&query.column) {
        return Err(ApiError::BadRequest(format!("unknown column '{}'", query.column)));
    }
    let table = objects::value_distribution(&filtered, &query.column);
    let chart = ChartSeries::from_table(format!("Distribution of {}", query.column), &table, &query.column, "Count")?;
    Ok(Json(DistributionResponse {
        chart_html: chart.to_html(),
        table,
        chart,
    }))
}
