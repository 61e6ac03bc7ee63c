// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IDS rule authoring and validation.

use axum::{
    extract::{Multipart, Path, Query},
    response::Response,
    Json,
};
use bim45d_processing::dictionary;
use bim45d_processing::ids::{
    self, IdsRule, IdsRuleBook, ReportFormat, ValidationRow, ValidationSummary, IDS_XML_FILE, RULES_JSON_FILE,
    TEST_RESULTS_FILE,
};
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::CurrentSession;
use crate::routes::{attachment, model::extract_file, CSV, JSON, XML};

/// GET /api/v1/dictionary
pub async fn dictionary_classes() -> Json<Vec<&'static str>> {
    Json(dictionary::classes())
}

/// GET /api/v1/dictionary/:class
pub async fn dictionary_psets(Path(class): Path<String>) -> Result<Json<Vec<&'static str>>, ApiError> {
    if !dictionary::contains_class(&class) {
        return Err(ApiError::NotFound(format!("class {} is not in the dictionary", class)));
    }
    Ok(Json(dictionary::psets(&class)))
}

/// GET /api/v1/dictionary/:class/:pset
pub async fn dictionary_properties(Path((class, pset)): Path<(String, String)>) -> Json<Vec<&'static str>> {
    Json(dictionary::properties(&class, &pset))
}

/// GET /api/v1/ids/rules
pub async fn list_rules(current: CurrentSession) -> Json<Vec<IdsRule>> {
    Json(current.session.lock().await.rules.rules().to_vec())
}

#[derive(Debug, Deserialize)]
pub struct RuleRequest {
    pub ifc_class: String,
    pub property_set: String,
    pub property_name: String,
    #[serde(default)]
    pub mandatory: bool,
}

/// POST /api/v1/ids/rules
pub async fn add_rule(current: CurrentSession, Json(request): Json<RuleRequest>) -> Result<Json<Vec<IdsRule>>, ApiError> {
    let mut session = current.session.lock().await;
    session.rules.add(
        &request.ifc_class,
        &request.property_set,
        &request.property_name,
        request.mandatory,
    )?;
    Ok(Json(session.rules.rules().to_vec()))
}

/// DELETE /api/v1/ids/rules/:index
pub async fn remove_rule(current: CurrentSession, Path(index): Path<usize>) -> Result<Json<Vec<IdsRule>>, ApiError> {
    let mut session = current.session.lock().await;
    session.rules.remove(index)?;
    Ok(Json(session.rules.rules().to_vec()))
}

/// DELETE /api/v1/ids/rules
pub async fn clear_rules(current: CurrentSession) -> Json<Vec<IdsRule>> {
    current.session.lock().await.rules.clear();
    Json(Vec::new())
}

/// POST /api/v1/ids/upload - replace the rules with an IDS XML or JSON file
pub async fn upload_rules(current: CurrentSession, mut multipart: Multipart) -> Result<Json<Vec<IdsRule>>, ApiError> {
    let (file_name, data) = extract_file(&mut multipart).await?;
    let mut book = IdsRuleBook::new();
    for rule in ids::load_rules(&data)? {
        book.push(rule)?;
    }
    tracing::info!(session = %current.id, file_name = %file_name, rules = book.len(), "Loaded IDS rules");
    let rules = book.rules().to_vec();
    current.session.lock().await.rules = book;
    Ok(Json(rules))
}

/// GET /api/v1/ids/download/:format - `json` or `xml`
pub async fn download_rules(current: CurrentSession, Path(format): Path<String>) -> Result<Response, ApiError> {
    let book = current.session.lock().await.rules.clone();
    if book.is_empty() {
        return Err(ApiError::BadRequest("no IDS rules to export".to_string()));
    }
    match format.as_str() {
        "json" => attachment(JSON, RULES_JSON_FILE, book.to_json()?),
        "xml" => attachment(XML, IDS_XML_FILE, book.to_ids_xml(Local::now().date_naive())?),
        other => Err(ApiError::BadRequest(format!("unknown rules format '{}'", other))),
    }
}

#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub rows: Vec<ValidationRow>,
    pub summary: ValidationSummary,
    pub chart: String,
}

/// POST /api/v1/ids/validate - check the model against the session rules
pub async fn run_validation(current: CurrentSession) -> Result<Json<ValidationResponse>, ApiError> {
    let (model, generation, rules) = {
        let session = current.session.lock().await;
        (session.model()?, session.generation(), session.rules.rules().to_vec())
    };
    if rules.is_empty() {
        return Err(ApiError::BadRequest("add at least one IDS rule first".to_string()));
    }

    let rows = tokio::task::spawn_blocking(move || ids::validate(&model, &rules)).await?;
    let summary = ids::summarize(&rows);
    tracing::info!(
        session = %current.id,
        rows = rows.len(),
        compliance = summary.compliance_rate,
        "IDS validation finished"
    );

    if !current
        .session
        .lock()
        .await
        .store_validation_rows(generation, rows.clone())
    {
        tracing::warn!(session = %current.id, "Model changed during IDS validation; rows not kept");
    }
    let chart = summary.chart().to_html();
    Ok(Json(ValidationResponse { rows, summary, chart }))
}

#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
    pub format: Option<ReportFormat>,
}

/// GET /api/v1/ids/results?format=json|csv - last validation rows
pub async fn results(current: CurrentSession, Query(query): Query<ResultsQuery>) -> Result<Response, ApiError> {
    let rows = current.session.lock().await.validation_rows.clone();
    if rows.is_empty() {
        return Err(ApiError::BadRequest("run the IDS validation first".to_string()));
    }
    match query.format.unwrap_or(ReportFormat::Json) {
        ReportFormat::Json => attachment(JSON, "ids_test_results.json", ids::export_report(&rows, ReportFormat::Json)?),
        ReportFormat::Csv => attachment(CSV, TEST_RESULTS_FILE, ids::export_report(&rows, ReportFormat::Csv)?),
    }
}
