// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Issue export from the last IDS validation.

use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use bim45d_processing::bcf::{self, Selection, HTML_FILE, TXT_FILE, ZIP_FILE};
use chrono::Utc;
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::CurrentSession;
use crate::routes::{attachment, HTML, TEXT, ZIP};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub selection: Selection,
    pub author: Option<String>,
}

/// POST /api/v1/bcf/:format - `txt`, `html` or `bcfzip`
pub async fn export(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(format): Path<String>,
    request: Option<Json<ExportRequest>>,
) -> Result<Response, ApiError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let rows = current.session.lock().await.validation_rows.clone();
    if rows.is_empty() {
        return Err(ApiError::BadRequest("run the IDS validation first".to_string()));
    }
    let issues = bcf::select(&rows, &request.selection);
    if issues.is_empty() {
        return Err(ApiError::BadRequest("no issues selected".to_string()));
    }

    match format.as_str() {
        "txt" => attachment(TEXT, TXT_FILE, bcf::to_txt(&issues)?),
        "html" => attachment(HTML, HTML_FILE, bcf::to_html(&issues)),
        "bcfzip" | "zip" => {
            let author = request.author.unwrap_or_else(|| state.config.report_author.clone());
            let bytes = bcf::to_bcf_zip(&issues, &author, Utc::now())?;
            attachment(ZIP, ZIP_FILE, bytes)
        }
        other => Err(ApiError::BadRequest(format!("unknown issue format '{}'", other))),
    }
}
