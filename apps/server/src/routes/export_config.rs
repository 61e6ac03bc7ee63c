// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Exporter configuration page.

use axum::{
    extract::{Multipart, Path},
    response::Response,
    Json,
};
use bim45d_processing::export_config::{
    ExportConfiguration, ExportRule, LevelOfDetail, OptionTable, ENTITY_CATALOG, EXCHANGE_REQUIREMENT,
    FACILITY_TYPE, IFC_FILE_TYPE, LINKED_FILES, PHASE, SITE_PLACEMENT, SPACE_BOUNDARIES,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::CurrentSession;
use crate::routes::{attachment, model::extract_file, JSON};

const CHOICES: [OptionTable; 7] = [
    EXCHANGE_REQUIREMENT,
    IFC_FILE_TYPE,
    PHASE,
    SPACE_BOUNDARIES,
    FACILITY_TYPE,
    LINKED_FILES,
    SITE_PLACEMENT,
];

#[derive(Debug, Serialize)]
pub struct ChoiceField {
    pub field: &'static str,
    pub labels: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub choices: Vec<ChoiceField>,
    pub entities: &'static [&'static str],
}

/// Apply a change to a copy of the session configuration
async fn update(
    current: &CurrentSession,
    change: impl FnOnce(&mut ExportConfiguration) -> bim45d_processing::Result<()>,
) -> Result<Json<ExportConfiguration>, ApiError> {
    let mut session = current.session.lock().await;
    let mut config = session.export_config.clone();
    change(&mut config)?;
    session.export_config = config.clone();
    Ok(Json(config))
}

/// GET /api/v1/export-config
pub async fn get_config(current: CurrentSession) -> Json<ExportConfiguration> {
    Json(current.session.lock().await.export_config.clone())
}

/// GET /api/v1/export-config/options - labels for every choice field
pub async fn options() -> Json<OptionsResponse> {
    let mut choices: Vec<ChoiceField> = CHOICES
        .iter()
        .map(|table| ChoiceField {
            field: table.field,
            labels: table.labels(),
        })
        .collect();
    choices.push(ChoiceField {
        field: "TessellationLevelOfDetail",
        labels: LevelOfDetail::ALL.iter().map(|l| l.label()).collect(),
    });
    Json(OptionsResponse {
        choices,
        entities: ENTITY_CATALOG,
    })
}

/// PUT /api/v1/export-config - replace the whole document
pub async fn replace_config(
    current: CurrentSession,
    Json(config): Json<ExportConfiguration>,
) -> Result<Json<ExportConfiguration>, ApiError> {
    update(&current, |slot| {
        config.settings.validate()?;
        for rule in &config.rules {
            rule.validate()?;
        }
        *slot = config;
        Ok(())
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct OptionRequest {
    pub field: String,
    pub label: String,
}

/// POST /api/v1/export-config/option - set a choice field by label
pub async fn set_option(
    current: CurrentSession,
    Json(request): Json<OptionRequest>,
) -> Result<Json<ExportConfiguration>, ApiError> {
    update(&current, |config| config.settings.set_option(&request.field, &request.label)).await
}

#[derive(Debug, Deserialize)]
pub struct EntitiesRequest {
    pub selected: Vec<String>,
}

/// POST /api/v1/export-config/entities - entities to keep in the export
pub async fn select_entities(
    current: CurrentSession,
    Json(request): Json<EntitiesRequest>,
) -> Result<Json<ExportConfiguration>, ApiError> {
    update(&current, |config| config.settings.select_entities(&request.selected)).await
}

/// POST /api/v1/export-config/rules
pub async fn add_rule(
    current: CurrentSession,
    Json(rule): Json<ExportRule>,
) -> Result<Json<ExportConfiguration>, ApiError> {
    update(&current, |config| config.add_rule(rule)).await
}

/// DELETE /api/v1/export-config/rules/:index
pub async fn remove_rule(
    current: CurrentSession,
    Path(index): Path<usize>,
) -> Result<Json<ExportConfiguration>, ApiError> {
    update(&current, |config| config.remove_rule(index).map(|_| ())).await
}

/// DELETE /api/v1/export-config/rules
pub async fn clear_rules(current: CurrentSession) -> Result<Json<ExportConfiguration>, ApiError> {
    update(&current, |config| {
        config.clear_rules();
        Ok(())
    })
    .await
}

/// POST /api/v1/export-config/upload - load a saved configuration file
pub async fn upload(current: CurrentSession, mut multipart: Multipart) -> Result<Json<ExportConfiguration>, ApiError> {
    let (_, data) = extract_file(&mut multipart).await?;
    let content = String::from_utf8(data).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let config = ExportConfiguration::from_json(&content)?;
    update(&current, |slot| {
        *slot = config;
        Ok(())
    })
    .await
}

/// GET /api/v1/export-config/download
pub async fn download(current: CurrentSession) -> Result<Response, ApiError> {
    let config = current.session.lock().await.export_config.clone();
    config.settings.validate()?;
    attachment(JSON, &config.file_name(), config.to_json_pretty()?)
}
