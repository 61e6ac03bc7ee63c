// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Report composer.

use axum::{
    extract::{Path, Query},
    response::Response,
    Json,
};
use bim45d_processing::objects::{self, filter_level_class_type};
use bim45d_processing::report::{ReportBook, ReportComponent, REPORT_FILE, REPORT_PDF_FILE, REPORT_TITLE};
use bim45d_processing::ALL;
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::CurrentSession;
use crate::routes::{attachment, HTML, PDF};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentRequestKind {
    Property,
    QuantityTable,
    Quantity,
}

#[derive(Debug, Deserialize)]
pub struct ComponentRequest {
    pub kind: ComponentRequestKind,
    #[serde(default = "all")]
    pub level: String,
    #[serde(default = "all")]
    pub class: String,
    #[serde(default = "all", rename = "type")]
    pub type_name: String,
    /// Property column, or the numeric quantity column (default `QuantityValue`)
    pub column: Option<String>,
    /// Restricts quantity components to one QuantityName
    pub quantity_name: Option<String>,
}

fn all() -> String {
    ALL.to_string()
}

#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub components: Vec<String>,
}

fn summary(book: &ReportBook) -> Json<ReportSummary> {
    Json(ReportSummary {
        components: book.components().iter().map(ReportComponent::label).collect(),
    })
}

/// GET /api/v1/report - component labels in order
pub async fn get_report(current: CurrentSession) -> Json<ReportSummary> {
    summary(&current.session.lock().await.report)
}

/// POST /api/v1/report/components
pub async fn add_component(
    current: CurrentSession,
    Json(request): Json<ComponentRequest>,
) -> Result<Json<ReportSummary>, ApiError> {
    let model = current.model().await?;
    let (level, class, type_name) = (request.level.as_str(), request.class.as_str(), request.type_name.as_str());

    let component = match request.kind {
        ComponentRequestKind::Property => {
            let column = request
                .column
                .as_deref()
                .ok_or_else(|| ApiError::BadRequest("property components need a column".to_string()))?;
            let table = tokio::task::spawn_blocking(move || objects::model_properties_table(&model)).await?;
            let filtered = filter_level_class_type(&table, level, class, type_name);
            ReportComponent::property(level, class, type_name, column, &filtered)?
        }
        ComponentRequestKind::QuantityTable => {
            let table = tokio::task::spawn_blocking(move || objects::quantities_table(&model)).await?;
            let view = objects::quantities_view(&filter_level_class_type(&table, level, class, type_name));
            ReportComponent::quantity_table(level, class, type_name, view)
        }
        ComponentRequestKind::Quantity => {
            let table = tokio::task::spawn_blocking(move || objects::quantities_table(&model)).await?;
            let mut filtered = filter_level_class_type(&table, level, class, type_name);
            if let Some(name) = request.quantity_name.as_deref() {
                filtered = filtered.filter_eq("QuantityName", name);
            }
            let column = request.column.as_deref().unwrap_or("QuantityValue");
            ReportComponent::quantity(level, class, type_name, column, &filtered)?
        }
    };

    let mut session = current.session.lock().await;
    session.report.add(component);
    Ok(summary(&session.report))
}

/// DELETE /api/v1/report/components/:index
pub async fn remove_component(
    current: CurrentSession,
    Path(index): Path<usize>,
) -> Result<Json<ReportSummary>, ApiError> {
    let mut session = current.session.lock().await;
    session.report.remove(index)?;
    Ok(summary(&session.report))
}

/// DELETE /api/v1/report
pub async fn clear(current: CurrentSession) -> Json<ReportSummary> {
    let mut session = current.session.lock().await;
    session.report.clear();
    summary(&session.report)
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub title: Option<String>,
}

impl DownloadQuery {
    fn title(&self) -> String {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(REPORT_TITLE)
            .to_string()
    }
}

async fn report_book(current: &CurrentSession) -> Result<ReportBook, ApiError> {
    let book = current.session.lock().await.report.clone();
    if book.is_empty() {
        return Err(ApiError::BadRequest("add at least one component to the report".to_string()));
    }
    Ok(book)
}

/// GET /api/v1/report/html?title= - standalone report page
pub async fn download(current: CurrentSession, Query(query): Query<DownloadQuery>) -> Result<Response, ApiError> {
    let book = report_book(&current).await?;
    attachment(HTML, REPORT_FILE, book.to_html(&query.title(), Local::now().naive_local()))
}

/// GET /api/v1/report/pdf?title= - the same report as an A4 PDF
pub async fn download_pdf(current: CurrentSession, Query(query): Query<DownloadQuery>) -> Result<Response, ApiError> {
    let book = report_book(&current).await?;
    let title = query.title();
    let generated = Local::now().naive_local();
    let bytes = tokio::task::spawn_blocking(move || book.to_pdf(&title, generated)).await??;
    tracing::info!(session = %current.id, bytes = bytes.len(), "Rendered PDF report");
    attachment(PDF, REPORT_PDF_FILE, bytes)
}
