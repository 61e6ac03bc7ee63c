// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request extractors.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use bim45d_core::IfcModel;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::ApiError;
use crate::services::session::{Session, SESSION_HEADER};
use crate::AppState;

/// Session named by the `x-session-id` header
pub struct CurrentSession {
    pub id: Uuid,
    pub session: Arc<Mutex<Session>>,
}

impl CurrentSession {
    /// Shared handle to the loaded model; the session lock is released on
    /// return
    pub async fn model(&self) -> Result<Arc<IfcModel>, ApiError> {
        self.session.lock().await.model()
    }

    /// Loaded model with the session generation it was read at
    pub async fn model_snapshot(&self) -> Result<(Arc<IfcModel>, u64), ApiError> {
        let session = self.session.lock().await;
        Ok((session.model()?, session.generation()))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .ok_or(ApiError::MissingSession)?;
        let session = state.sessions.get(&id).await?;
        Ok(Self { id, session })
    }
}
