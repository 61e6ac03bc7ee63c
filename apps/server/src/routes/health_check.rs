// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model health page: statistics and external validators.

use axum::{extract::State, response::Response, Json};
use bim45d_processing::health::{self, HealthStats, TOP_ENTITIES};
use bim45d_processing::validation::{self, ValidationReport, REPORT_FILE};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::CurrentSession;
use crate::routes::{attachment, JSON};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: HealthStats,
    pub summary: String,
    pub structural_chart: String,
    pub entity_chart: String,
}

/// GET /api/v1/health-check/stats
pub async fn stats(current: CurrentSession) -> Result<Json<StatsResponse>, ApiError> {
    let model = current.model().await?;
    let stats = tokio::task::spawn_blocking(move || health::health_stats(&model)).await?;
    Ok(Json(StatsResponse {
        summary: stats.summary(),
        structural_chart: stats.structural_chart().to_html(),
        entity_chart: stats.entity_chart(TOP_ENTITIES).to_html(),
        stats,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub rule_types: Option<Vec<String>>,
}

/// POST /api/v1/health-check/validate - syntax, schema and gherkin checks
pub async fn validate(
    State(state): State<AppState>,
    current: CurrentSession,
    request: Option<Json<ValidateRequest>>,
) -> Result<Json<ValidationReport>, ApiError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let mut config = state.config.validator();
    if let Some(rule_types) = &request.rule_types {
        config = config.with_rule_types(rule_types)?;
    }

    let (model, generation) = current.model_snapshot().await?;
    tracing::info!(session = %current.id, rule_types = ?config.rule_types, "Running external validators");
    let report = validation::run_all(&model, &config).await?;

    if !current
        .session
        .lock()
        .await
        .store_validation_report(generation, report.clone())
    {
        tracing::warn!(session = %current.id, "Model changed during validation; report not kept");
    }
    Ok(Json(report))
}

/// GET /api/v1/health-check/report - last validator report as a file
pub async fn report(current: CurrentSession) -> Result<Response, ApiError> {
    let report = current
        .session
        .lock()
        .await
        .validation_report
        .clone()
        .ok_or_else(|| ApiError::BadRequest("run the validation first".to_string()))?;
    attachment(JSON, REPORT_FILE, report.to_json()?)
}
