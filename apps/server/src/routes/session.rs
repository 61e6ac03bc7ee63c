// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session lifecycle endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::CurrentSession;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub ttl_secs: u64,
}

/// POST /api/v1/sessions
pub async fn create(State(state): State<AppState>) -> (StatusCode, Json<SessionResponse>) {
    let session_id = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id,
            ttl_secs: state.config.session_ttl_secs,
        }),
    )
}

/// DELETE /api/v1/sessions
pub async fn close(State(state): State<AppState>, current: CurrentSession) -> Result<StatusCode, ApiError> {
    state.sessions.remove(&current.id).await;
    Ok(StatusCode::NO_CONTENT)
}
