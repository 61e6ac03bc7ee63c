// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP routes, one module per page.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
    routing::{delete, get, post},
    Router,
};

use crate::error::ApiError;
use crate::AppState;

pub mod bcf;
pub mod cost;
pub mod export_config;
pub mod health;
pub mod health_check;
pub mod ids;
pub mod model;
pub mod report;
pub mod schedule;
pub mod session;
pub mod tables;

pub const CSV: &str = "text/csv; charset=utf-8";
pub const HTML: &str = "text/html; charset=utf-8";
pub const JSON: &str = "application/json";
pub const XML: &str = "application/xml";
pub const TEXT: &str = "text/plain; charset=utf-8";
pub const ZIP: &str = "application/zip";
pub const STEP: &str = "application/x-step";
pub const XLSX: &str = bim45d_processing::table::XLSX_CONTENT_TYPE;
pub const PDF: &str = "application/pdf";

/// Download response with a file name
pub fn attachment(content_type: &str, file_name: &str, body: impl Into<Body>) -> Result<Response, ApiError> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name.replace('"', "")),
        )
        .body(body.into())
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Inline response of the given content type
pub fn content(content_type: &str, body: impl Into<Body>) -> Result<Response, ApiError> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .body(body.into())
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Every API route, without middleware
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health::info))
        .route("/api/v1/health", get(health::check))
        // Sessions
        .route("/api/v1/sessions", post(session::create).delete(session::close))
        // Model
        .route("/api/v1/model", post(model::upload).get(model::summary).delete(model::remove))
        .route("/api/v1/model/cached/:key", post(model::load_cached))
        .route("/api/v1/model/structure", get(model::structure))
        .route("/api/v1/model/storeys", get(model::storeys))
        .route("/api/v1/model/types", get(model::types))
        .route("/api/v1/model/entities/:id", get(model::inspect))
        .route("/api/v1/model/download", get(model::download))
        // Export configuration
        .route(
            "/api/v1/export-config",
            get(export_config::get_config).put(export_config::replace_config),
        )
        .route("/api/v1/export-config/options", get(export_config::options))
        .route("/api/v1/export-config/option", post(export_config::set_option))
        .route("/api/v1/export-config/entities", post(export_config::select_entities))
        .route(
            "/api/v1/export-config/rules",
            post(export_config::add_rule).delete(export_config::clear_rules),
        )
        .route("/api/v1/export-config/rules/:index", delete(export_config::remove_rule))
        .route("/api/v1/export-config/upload", post(export_config::upload))
        .route("/api/v1/export-config/download", get(export_config::download))
        // IDS
        .route("/api/v1/dictionary", get(ids::dictionary_classes))
        .route("/api/v1/dictionary/:class", get(ids::dictionary_psets))
        .route("/api/v1/dictionary/:class/:pset", get(ids::dictionary_properties))
        .route("/api/v1/ids/rules", get(ids::list_rules).post(ids::add_rule).delete(ids::clear_rules))
        .route("/api/v1/ids/rules/:index", delete(ids::remove_rule))
        .route("/api/v1/ids/upload", post(ids::upload_rules))
        .route("/api/v1/ids/download/:format", get(ids::download_rules))
        .route("/api/v1/ids/validate", post(ids::run_validation))
        .route("/api/v1/ids/results", get(ids::results))
        // Model health
        .route("/api/v1/health-check/stats", get(health_check::stats))
        .route("/api/v1/health-check/validate", post(health_check::validate))
        .route("/api/v1/health-check/report", get(health_check::report))
        // Properties and quantities
        .route("/api/v1/properties", get(tables::properties))
        .route("/api/v1/properties/distribution", get(tables::distribution))
        .route("/api/v1/quantities", get(tables::quantities))
        // Report composer
        .route("/api/v1/report", get(report::get_report).delete(report::clear))
        .route("/api/v1/report/components", post(report::add_component))
        .route("/api/v1/report/components/:index", delete(report::remove_component))
        .route("/api/v1/report/html", get(report::download))
        .route("/api/v1/report/pdf", get(report::download_pdf))
        // Issues
        .route("/api/v1/bcf/:format", post(bcf::export))
        // 4D
        .route("/api/v1/schedules", get(schedule::list_schedules).post(schedule::create_schedule))
        .route("/api/v1/schedules/:id", delete(schedule::delete_schedule))
        .route(
            "/api/v1/schedules/:id/tasks",
            get(schedule::schedule_tasks).post(schedule::create_schedule_tasks),
        )
        .route("/api/v1/schedules/:id/plan", post(schedule::create_plan))
        .route("/api/v1/schedules/:id/assign", post(schedule::assign_tasks))
        .route("/api/v1/tasks", get(schedule::all_tasks).post(schedule::create_tasks))
        .route("/api/v1/tasks/nesting", get(schedule::nesting))
        .route("/api/v1/tasks/unassigned", get(schedule::unassigned))
        .route("/api/v1/tasks/:id", delete(schedule::delete_task))
        .route("/api/v1/work-plans", get(schedule::list_work_plans).post(schedule::create_work_plan))
        .route("/api/v1/work-plans/:id", delete(schedule::delete_work_plan))
        .route(
            "/api/v1/work-plans/:id/schedules/:schedule",
            post(schedule::aggregate_schedule),
        )
        .route("/api/v1/calendars", get(schedule::list_calendars).post(schedule::create_calendar))
        .route("/api/v1/calendars/:id", delete(schedule::delete_calendar))
        .route("/api/v1/calendars/:id/times", post(schedule::add_calendar_time))
        .route("/api/v1/calendars/:id/assign", post(schedule::assign_calendar))
        .route("/api/v1/unscheduled", get(schedule::unscheduled))
        .route("/api/v1/gantt", get(schedule::gantt))
        // 5D
        .route("/api/v1/cost/boq", post(cost::boq))
}
