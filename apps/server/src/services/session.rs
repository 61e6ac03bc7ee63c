// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-user page state.
//!
//! Each browser session owns one loaded model and what the pages built on
//! it: IDS rules, the export configuration, the last validation results and
//! the report under construction.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bim45d_core::IfcModel;
use bim45d_processing::export_config::ExportConfiguration;
use bim45d_processing::ids::{IdsRuleBook, ValidationRow};
use bim45d_processing::report::ReportBook;
use bim45d_processing::validation::ValidationReport;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the session id
pub const SESSION_HEADER: &str = "x-session-id";

/// A parsed upload
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub cache_key: String,
    pub file_name: String,
    pub model: Arc<IfcModel>,
}

#[derive(Debug, Default)]
pub struct Session {
    pub model: Option<LoadedModel>,
    pub rules: IdsRuleBook,
    pub export_config: ExportConfiguration,
    pub validation_rows: Vec<ValidationRow>,
    pub validation_report: Option<ValidationReport>,
    pub report: ReportBook,
    generation: u64,
}

impl Session {
    pub fn loaded(&self) -> Result<&LoadedModel, ApiError> {
        self.model.as_ref().ok_or(ApiError::NoModel)
    }

    pub fn model(&self) -> Result<Arc<IfcModel>, ApiError> {
        Ok(self.loaded()?.model.clone())
    }

    /// Counter bumped whenever the model changes
    ///
    /// Work that runs without the session lock compares it before storing
    /// results computed from an earlier model.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace the model and drop state computed from the previous one
    pub fn load(&mut self, loaded: LoadedModel) {
        self.model = Some(loaded);
        self.generation += 1;
        self.validation_rows.clear();
        self.validation_report = None;
        self.report.clear();
    }

    pub fn unload(&mut self) {
        self.model = None;
        self.generation += 1;
        self.validation_rows.clear();
        self.validation_report = None;
        self.report.clear();
    }

    /// Keep a validator report computed at `generation`; a report for an
    /// older model is dropped
    pub fn store_validation_report(&mut self, generation: u64, report: ValidationReport) -> bool {
        if generation != self.generation {
            return false;
        }
        self.validation_report = Some(report);
        true
    }

    /// Keep IDS rows computed at `generation`; rows for an older model are dropped
    pub fn store_validation_rows(&mut self, generation: u64, rows: Vec<ValidationRow>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.validation_rows = rows;
        true
    }

    /// Swap in an edited model, keeping the file name and cache key
    pub fn replace_model(&mut self, model: IfcModel) -> Result<(), ApiError> {
        let loaded = self.model.as_mut().ok_or(ApiError::NoModel)?;
        loaded.model = Arc::new(model);
        self.generation += 1;
        Ok(())
    }

    /// Apply an edit to a copy of the model and keep it only on success
    pub fn edit_model<T>(
        &mut self,
        edit: impl FnOnce(&mut IfcModel) -> bim45d_processing::Result<T>,
    ) -> Result<T, ApiError> {
        let mut model = (*self.model()?).clone();
        let value = edit(&mut model)?;
        self.replace_model(model)?;
        Ok(value)
    }
}

struct Entry {
    session: Arc<Mutex<Session>>,
    last_seen: Instant,
}

/// Sessions by id, dropped after `ttl` without requests
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Entry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let entry = Entry {
            session: Arc::new(Mutex::new(Session::default())),
            last_seen: Instant::now(),
        };
        self.sessions.write().await.insert(id, entry);
        tracing::info!(session = %id, "Created session");
        id
    }

    /// Session handle; refreshes its expiry
    pub async fn get(&self, id: &Uuid) -> Result<Arc<Mutex<Session>>, ApiError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| ApiError::SessionNotFound(id.to_string()))?;
        entry.last_seen = Instant::now();
        Ok(entry.session.clone())
    }

    pub async fn remove(&self, id: &Uuid) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::info!(session = %id, "Closed session");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle for longer than the TTL; returns how many went
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.ttl);
        before - sessions.len()
    }

    /// Background task running `sweep` every `interval`
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let expired = store.sweep().await;
                if expired > 0 {
                    tracing::info!(expired, "Expired idle sessions");
                }
            }
        })
    }
}
