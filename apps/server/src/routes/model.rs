// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model upload, summary and download.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use bim45d_core::IfcModel;
use bim45d_processing::health::{inspect_entity, schema_warning, InspectedEntity};
use bim45d_processing::objects::{self, ProjectInfo, Storey};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::CurrentSession;
use crate::routes::{attachment, STEP};
use crate::services::session::LoadedModel;
use crate::AppState;

/// Uploaded file name and bytes from the `file` field.
pub async fn extract_file(multipart: &mut Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        tracing::debug!(field_name = %field_name, "Processing multipart field");

        if field_name == "file" {
            let file_name = field.file_name().unwrap_or("model.ifc").to_string();
            let bytes = field.bytes().await?;
            tracing::debug!(size = bytes.len(), file_name = %file_name, "Extracted file from multipart");
            return Ok((file_name, bytes.to_vec()));
        }
    }

    tracing::warn!("No 'file' field found in multipart request");
    Err(ApiError::MissingFile)
}

#[derive(Debug, Serialize)]
pub struct ModelResponse {
    pub cache_key: String,
    pub file_name: String,
    pub project: ProjectInfo,
    pub schema_warning: Option<String>,
}

impl ModelResponse {
    fn new(loaded: &LoadedModel) -> Self {
        Self {
            cache_key: loaded.cache_key.clone(),
            file_name: loaded.file_name.clone(),
            project: objects::project_info(&loaded.model),
            schema_warning: schema_warning(&loaded.model),
        }
    }
}

async fn parse(data: Vec<u8>) -> Result<IfcModel, ApiError> {
    tokio::task::spawn_blocking(move || IfcModel::from_bytes(&data))
        .await?
        .map_err(|e| ApiError::InvalidModel(e.to_string()))
}

async fn load_into(current: &CurrentSession, loaded: LoadedModel) -> Json<ModelResponse> {
    let response = ModelResponse::new(&loaded);
    current.session.lock().await.load(loaded);
    Json(response)
}

/// POST /api/v1/model - Upload an IFC file into the session.
pub async fn upload(
    State(state): State<AppState>,
    current: CurrentSession,
    mut multipart: Multipart,
) -> Result<Json<ModelResponse>, ApiError> {
    let (file_name, data) = extract_file(&mut multipart).await?;

    if data.len() > state.config.max_file_size_bytes() {
        return Err(ApiError::FileTooLarge {
            max_mb: state.config.max_file_size_mb,
        });
    }

    let cache_key = match state.cache.store_upload(&file_name, &data).await {
        Ok(key) => key,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to store upload; cached reload unavailable");
            crate::services::DiskCache::generate_key(&data)
        }
    };

    let size = data.len();
    let model = parse(data).await?;
    tracing::info!(
        session = %current.id,
        file_name = %file_name,
        size,
        entities = model.len(),
        schema = %model.schema(),
        "Loaded model"
    );

    Ok(load_into(
        &current,
        LoadedModel {
            cache_key,
            file_name,
            model: Arc::new(model),
        },
    )
    .await)
}

/// POST /api/v1/model/cached/:key - Reload a stored upload.
pub async fn load_cached(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(key): Path<String>,
) -> Result<Json<ModelResponse>, ApiError> {
    let (info, data) = state
        .cache
        .load_upload(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Cache key not found: {}", key)))?;
    tracing::info!(key = %key, "Cache HIT");

    let model = parse(data).await?;
    Ok(load_into(
        &current,
        LoadedModel {
            cache_key: key,
            file_name: info.file_name,
            model: Arc::new(model),
        },
    )
    .await)
}

/// GET /api/v1/model
pub async fn summary(current: CurrentSession) -> Result<Json<ModelResponse>, ApiError> {
    let session = current.session.lock().await;
    Ok(Json(ModelResponse::new(session.loaded()?)))
}

/// DELETE /api/v1/model
pub async fn remove(current: CurrentSession) -> StatusCode {
    current.session.lock().await.unload();
    StatusCode::NO_CONTENT
}

/// GET /api/v1/model/structure - `{class: {set: [property]}}`
pub async fn structure(
    current: CurrentSession,
) -> Result<Json<BTreeMap<String, BTreeMap<String, Vec<String>>>>, ApiError> {
    let model = current.model().await?;
    let structure = tokio::task::spawn_blocking(move || objects::ifc_structure(&model)).await?;
    Ok(Json(structure))
}

/// GET /api/v1/model/storeys
pub async fn storeys(current: CurrentSession) -> Result<Json<Vec<Storey>>, ApiError> {
    let model = current.model().await?;
    Ok(Json(objects::storeys(&model)))
}

#[derive(Debug, Deserialize)]
pub struct TypesQuery {
    pub parent: Option<String>,
}

/// GET /api/v1/model/types?parent=IfcElement - instance count per class
pub async fn types(
    current: CurrentSession,
    Query(query): Query<TypesQuery>,
) -> Result<Json<BTreeMap<String, usize>>, ApiError> {
    let model = current.model().await?;
    let classes: BTreeSet<String> = objects::types_in_model(&model, query.parent.as_deref());
    let classes: Vec<String> = classes.into_iter().collect();
    Ok(Json(objects::type_occurrence(&model, &classes)))
}

/// GET /api/v1/model/entities/:id
pub async fn inspect(current: CurrentSession, Path(id): Path<u32>) -> Result<Json<InspectedEntity>, ApiError> {
    let model = current.model().await?;
    Ok(Json(inspect_entity(&model, id)?))
}

/// GET /api/v1/model/download - STEP text including session edits
pub async fn download(current: CurrentSession) -> Result<Response, ApiError> {
    let (file_name, model) = {
        let session = current.session.lock().await;
        let loaded = session.loaded()?;
        (loaded.file_name.clone(), loaded.model.clone())
    };
    let step = tokio::task::spawn_blocking(move || model.to_step()).await?;
    attachment(STEP, &file_name, step)
}
