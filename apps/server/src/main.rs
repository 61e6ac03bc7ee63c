// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BIM45D Server - IFC checking, reporting, 4D and 5D over HTTP.
//!
//! Each page of the application is a set of routes bound to a session:
//! open one with `POST /api/v1/sessions` and send its id in the
//! `x-session-id` header.
//!
//! # Endpoints
//!
//! - `GET /api/v1/health` - Health check
//! - `POST /api/v1/model` - Upload an IFC model into the session
//! - `POST /api/v1/model/cached/:key` - Reload an earlier upload
//! - `/api/v1/export-config/*` - Exporter configuration JSON
//! - `/api/v1/ids/*` - IDS rules, XML/JSON files and validation
//! - `/api/v1/health-check/*` - Model statistics and external validators
//! - `GET /api/v1/properties`, `GET /api/v1/quantities` - Filtered tables
//! - `/api/v1/report/*` - Report composer
//! - `POST /api/v1/bcf/:format` - Issue export
//! - `/api/v1/schedules`, `/api/v1/tasks`, `/api/v1/work-plans`,
//!   `/api/v1/calendars`, `/api/v1/gantt` - 4D
//! - `POST /api/v1/cost/boq` - 5D

use anyhow::Context;
use axum::{extract::DefaultBodyLimit, http::HeaderValue, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

mod config;
mod error;
mod extract;
mod routes;
mod services;

use config::Config;
use services::{DiskCache, SessionStore};

/// How often idle sessions are swept
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<DiskCache>,
    pub config: Arc<Config>,
    pub sessions: Arc<SessionStore>,
}

fn cors(config: &Config) -> CorsLayer {
    if config.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Router with middleware and state
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();
    routes::router()
        .layer(DefaultBodyLimit::max(config.max_file_size_bytes()))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
        .layer(cors(&config))
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug,bim45d_server=debug".into()),
        )
        .pretty()
        .init();

    let config = Config::from_env();

    tracing::info!(
        port = config.port,
        cache_dir = %config.cache_dir,
        max_file_size_mb = config.max_file_size_mb,
        worker_threads = config.worker_threads,
        session_ttl_secs = config.session_ttl_secs,
        validator_python = %config.validator_python,
        "Starting BIM45D Server"
    );

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads)
        .build_global()
        .context("Failed to initialize rayon thread pool")?;

    let cache = Arc::new(DiskCache::new(&config.cache_dir).await);
    let sessions = Arc::new(SessionStore::new(config.session_ttl()));
    sessions.spawn_sweeper(SWEEP_INTERVAL);

    let state = AppState {
        cache,
        config: Arc::new(config.clone()),
        sessions,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app(state)).await.context("Server error")?;
    Ok(())
}
