// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    pub sessions: usize,
}

/// API information response.
#[derive(Debug, Serialize)]
pub struct ApiInfoResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: Vec<EndpointInfo>,
}

/// Endpoint information.
#[derive(Debug, Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

const fn endpoint(method: &'static str, path: &'static str, description: &'static str) -> EndpointInfo {
    EndpointInfo {
        method,
        path,
        description,
    }
}

/// GET /api/v1/health - Health check endpoint.
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "bim45d-server",
        sessions: state.sessions.len().await,
    })
}

/// GET / - API information endpoint.
pub async fn info() -> Json<ApiInfoResponse> {
    Json(ApiInfoResponse {
        service: "bim45d-server",
        version: env!("CARGO_PKG_VERSION"),
        description: "IFC model checking, IDS rules, reports, 4D schedules and 5D cost",
        endpoints: vec![
            endpoint("POST", "/api/v1/sessions", "Open a session; send its id as x-session-id"),
            endpoint("POST", "/api/v1/model", "Upload an IFC file (multipart field 'file')"),
            endpoint("POST", "/api/v1/model/cached/:key", "Reload a previous upload by content hash"),
            endpoint("GET", "/api/v1/model/download", "Download the model with session edits"),
            endpoint("GET", "/api/v1/export-config", "Exporter configuration"),
            endpoint("POST", "/api/v1/ids/rules", "Add an IDS rule"),
            endpoint("POST", "/api/v1/ids/validate", "Check the model against the IDS rules"),
            endpoint("GET", "/api/v1/health-check/stats", "Model health statistics"),
            endpoint("POST", "/api/v1/health-check/validate", "Run the external validators"),
            endpoint("GET", "/api/v1/properties", "Property table as json, csv, html or xlsx"),
            endpoint("GET", "/api/v1/quantities", "Quantity table as json, csv, html or xlsx"),
            endpoint("POST", "/api/v1/report/components", "Add a report component"),
            endpoint("GET", "/api/v1/report/pdf", "Report as PDF"),
            endpoint("POST", "/api/v1/bcf/:format", "Export issues as txt, html or bcfzip"),
            endpoint("GET", "/api/v1/schedules", "Work schedules"),
            endpoint("GET", "/api/v1/gantt", "Gantt rows"),
            endpoint("POST", "/api/v1/cost/boq", "Priced bill of quantities"),
        ],
    })
}
