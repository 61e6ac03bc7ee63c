// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 4D pages: work schedules, tasks, work plans and calendars.
//!
//! Every edit runs on a copy of the session model and replaces it only when
//! it succeeds, so the downloaded IFC carries the accepted edits.

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::Response,
    Json,
};
use bim45d_core::{Entity, IfcModel};
use bim45d_processing::schedule::{
    self, GanttRow, PlanRow, TaskOptions, TaskRow, WorkPlanInfo, WorkScheduleOptions,
};
use bim45d_processing::Table;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::CurrentSession;
use crate::routes::tables::TableFormat;
use crate::routes::{attachment, content, CSV, HTML, JSON, XLSX};

/// Id and name of a schedule, task, plan or calendar
#[derive(Debug, Serialize)]
pub struct Named {
    pub id: u32,
    pub name: Option<String>,
}

impl From<&Entity> for Named {
    fn from(entity: &Entity) -> Self {
        Named {
            id: entity.id,
            name: entity.name().map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Created {
    pub ids: Vec<u32>,
}

#[derive(Debug, Serialize)]
pub struct Removed {
    pub removed: Vec<u32>,
}

#[derive(Debug, Serialize)]
pub struct Assigned {
    pub assigned: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct FormatQuery {
    #[serde(default)]
    pub format: TableFormat,
}

fn table_response(table: Table, format: TableFormat, file_name: &str) -> Result<Response, ApiError> {
    match format {
        TableFormat::Csv => attachment(CSV, file_name, table.to_csv()?),
        TableFormat::Html => content(HTML, table.to_html()),
        TableFormat::Json => content(JSON, serde_json::to_vec(&table)?),
        TableFormat::Xlsx => {
            let stem = file_name.trim_end_matches(".csv");
            attachment(XLSX, &format!("{}.xlsx", stem), table.to_xlsx(stem)?)
        }
    }
}

/// Run `change` on a copy of the session model off the async executor
///
/// The session stays locked until the edited copy is swapped in, so edits
/// from one session apply in request order.
async fn edit<T, F>(current: &CurrentSession, change: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut IfcModel) -> bim45d_processing::Result<T> + Send + 'static,
{
    let mut session = current.session.lock().await;
    let base = session.model()?;
    let (model, value) = tokio::task::spawn_blocking(move || {
        let mut model = (*base).clone();
        change(&mut model).map(|value| (model, value))
    })
    .await??;
    session.replace_model(model)?;
    Ok(value)
}

// Work schedules

/// GET /api/v1/schedules
pub async fn list_schedules(current: CurrentSession) -> Result<Json<Vec<Named>>, ApiError> {
    let model = current.model().await?;
    Ok(Json(schedule::work_schedules(&model).into_iter().map(Named::from).collect()))
}

/// POST /api/v1/schedules
pub async fn create_schedule(
    current: CurrentSession,
    Json(options): Json<WorkScheduleOptions>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let id = edit(&current, move |model| schedule::create_work_schedule(model, &options)).await?;
    Ok((StatusCode::CREATED, Json(Created { ids: vec![id] })))
}

/// DELETE /api/v1/schedules/:id
pub async fn delete_schedule(current: CurrentSession, Path(id): Path<u32>) -> Result<Json<Removed>, ApiError> {
    let removed = edit(&current, move |model| schedule::delete_work_schedule(model, id)).await?;
    Ok(Json(Removed { removed }))
}

/// GET /api/v1/schedules/:id/tasks?format= - the schedule's task table
pub async fn schedule_tasks(
    current: CurrentSession,
    Path(id): Path<u32>,
    Query(query): Query<FormatQuery>,
) -> Result<Response, ApiError> {
    let model = current.model().await?;
    let table = schedule::tasks_table(&model, id)?;
    table_response(table, query.format, &format!("schedule_{}_tasks.csv", id))
}

#[derive(Debug, Deserialize)]
pub struct ElementTasksRequest {
    pub element_ids: Vec<u32>,
    #[serde(default)]
    pub name_prefix: String,
}

/// POST /api/v1/schedules/:id/tasks - one task per element in the schedule
pub async fn create_schedule_tasks(
    current: CurrentSession,
    Path(id): Path<u32>,
    Json(request): Json<ElementTasksRequest>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let ids = edit(&current, move |model| {
        schedule::create_tasks_for_elements_in_schedule(model, id, &request.element_ids, &request.name_prefix)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(Created { ids })))
}

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub rows: Vec<PlanRow>,
    pub summary_name: Option<String>,
    #[serde(default)]
    pub link_sequential: bool,
}

/// POST /api/v1/schedules/:id/plan - tasks from planner rows
pub async fn create_plan(
    current: CurrentSession,
    Path(id): Path<u32>,
    Json(request): Json<PlanRequest>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let ids = edit(&current, move |model| {
        schedule::create_tasks_from_plan(
            model,
            id,
            &request.rows,
            request.summary_name.as_deref(),
            request.link_sequential,
        )
    })
    .await?;
    Ok((StatusCode::CREATED, Json(Created { ids })))
}

#[derive(Debug, Deserialize)]
pub struct IdsRequest {
    pub ids: Vec<u32>,
}

/// POST /api/v1/schedules/:id/assign - control existing tasks
pub async fn assign_tasks(
    current: CurrentSession,
    Path(id): Path<u32>,
    Json(request): Json<IdsRequest>,
) -> Result<Json<Assigned>, ApiError> {
    let assigned = edit(&current, move |model| schedule::assign_tasks_to_schedule(model, id, &request.ids)).await?;
    Ok(Json(Assigned { assigned }))
}

// Tasks

#[derive(Debug, Default, Deserialize)]
pub struct TasksQuery {
    pub schedule: Option<u32>,
    #[serde(default)]
    pub format: TableFormat,
}

/// GET /api/v1/tasks?schedule=&format= - every task with its schedule
pub async fn all_tasks(current: CurrentSession, Query(query): Query<TasksQuery>) -> Result<Response, ApiError> {
    let model = current.model().await?;
    match query.format {
        TableFormat::Json => {
            let rows: Vec<TaskRow> = schedule::all_task_rows(&model, query.schedule)?;
            content(JSON, serde_json::to_vec(&rows)?)
        }
        format => table_response(schedule::all_tasks_table(&model, query.schedule)?, format, "tasks.csv"),
    }
}

#[derive(Debug, Deserialize)]
pub struct TasksRequest {
    pub element_ids: Vec<u32>,
    #[serde(default)]
    pub options: TaskOptions,
}

/// POST /api/v1/tasks - tasks for elements, outside any schedule
pub async fn create_tasks(
    current: CurrentSession,
    Json(request): Json<TasksRequest>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let ids = edit(&current, move |model| schedule::create_tasks(model, &request.element_ids, &request.options)).await?;
    Ok((StatusCode::CREATED, Json(Created { ids })))
}

/// DELETE /api/v1/tasks/:id
pub async fn delete_task(current: CurrentSession, Path(id): Path<u32>) -> Result<Json<Removed>, ApiError> {
    let removed = edit(&current, move |model| schedule::delete_task(model, id)).await?;
    Ok(Json(Removed { removed }))
}

/// GET /api/v1/tasks/nesting?format=
pub async fn nesting(current: CurrentSession, Query(query): Query<FormatQuery>) -> Result<Response, ApiError> {
    let model = current.model().await?;
    table_response(schedule::nesting_table(&model), query.format, "task_nesting.csv")
}

/// GET /api/v1/tasks/unassigned
pub async fn unassigned(current: CurrentSession) -> Result<Json<Vec<Named>>, ApiError> {
    let model = current.model().await?;
    Ok(Json(schedule::unassigned_tasks(&model).into_iter().map(Named::from).collect()))
}

/// GET /api/v1/unscheduled?format= - products without a scheduled task
pub async fn unscheduled(current: CurrentSession, Query(query): Query<FormatQuery>) -> Result<Response, ApiError> {
    let model = current.model().await?;
    let table = tokio::task::spawn_blocking(move || schedule::unscheduled_elements_table(&model)).await?;
    table_response(table, query.format, "unscheduled_elements.csv")
}

#[derive(Debug, Default, Deserialize)]
pub struct GanttQuery {
    pub schedule: Option<u32>,
}

/// GET /api/v1/gantt?schedule=
pub async fn gantt(current: CurrentSession, Query(query): Query<GanttQuery>) -> Result<Json<Vec<GanttRow>>, ApiError> {
    let model = current.model().await?;
    Ok(Json(schedule::gantt(&model, query.schedule)?))
}

// Work plans

/// GET /api/v1/work-plans
pub async fn list_work_plans(current: CurrentSession) -> Result<Json<Vec<WorkPlanInfo>>, ApiError> {
    let model = current.model().await?;
    Ok(Json(schedule::work_plans(&model)))
}

#[derive(Debug, Default, Deserialize)]
pub struct NameRequest {
    pub name: Option<String>,
}

/// POST /api/v1/work-plans
pub async fn create_work_plan(
    current: CurrentSession,
    request: Option<Json<NameRequest>>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let id = edit(&current, move |model| schedule::create_work_plan(model, request.name.as_deref())).await?;
    Ok((StatusCode::CREATED, Json(Created { ids: vec![id] })))
}

/// POST /api/v1/work-plans/:id/schedules/:schedule
pub async fn aggregate_schedule(
    current: CurrentSession,
    Path((plan, schedule_id)): Path<(u32, u32)>,
) -> Result<Json<Created>, ApiError> {
    let rel = edit(&current, move |model| {
        schedule::aggregate_schedule_to_work_plan(model, plan, schedule_id)
    })
    .await?;
    Ok(Json(Created { ids: vec![rel] }))
}

/// DELETE /api/v1/work-plans/:id
pub async fn delete_work_plan(current: CurrentSession, Path(id): Path<u32>) -> Result<Json<Removed>, ApiError> {
    let removed = edit(&current, move |model| schedule::delete_work_plan(model, id)).await?;
    Ok(Json(Removed { removed }))
}

// Calendars

/// GET /api/v1/calendars?format=
pub async fn list_calendars(current: CurrentSession, Query(query): Query<FormatQuery>) -> Result<Response, ApiError> {
    let model = current.model().await?;
    table_response(schedule::calendars_table(&model), query.format, "calendars.csv")
}

#[derive(Debug, Default, Deserialize)]
pub struct CalendarRequest {
    pub name: Option<String>,
    pub predefined_type: Option<String>,
    pub description: Option<String>,
}

/// POST /api/v1/calendars
pub async fn create_calendar(
    current: CurrentSession,
    Json(request): Json<CalendarRequest>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let id = edit(&current, move |model| {
        schedule::create_work_calendar(
            model,
            request.name.as_deref(),
            request.predefined_type.as_deref(),
            request.description.as_deref(),
        )
    })
    .await?;
    Ok((StatusCode::CREATED, Json(Created { ids: vec![id] })))
}

/// DELETE /api/v1/calendars/:id
pub async fn delete_calendar(current: CurrentSession, Path(id): Path<u32>) -> Result<Json<Removed>, ApiError> {
    let removed = edit(&current, move |model| schedule::delete_work_calendar(model, id)).await?;
    Ok(Json(Removed { removed }))
}

#[derive(Debug, Default, Deserialize)]
pub struct CalendarTimeRequest {
    pub name: Option<String>,
    pub start: Option<String>,
    pub finish: Option<String>,
    #[serde(default)]
    pub exception: bool,
}

/// POST /api/v1/calendars/:id/times - working or exception period
pub async fn add_calendar_time(
    current: CurrentSession,
    Path(id): Path<u32>,
    Json(request): Json<CalendarTimeRequest>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let time = edit(&current, move |model| {
        schedule::add_calendar_time(
            model,
            id,
            request.name.as_deref(),
            request.start.as_deref(),
            request.finish.as_deref(),
            request.exception,
        )
    })
    .await?;
    Ok((StatusCode::CREATED, Json(Created { ids: vec![time] })))
}

/// POST /api/v1/calendars/:id/assign
pub async fn assign_calendar(
    current: CurrentSession,
    Path(id): Path<u32>,
    Json(request): Json<IdsRequest>,
) -> Result<Json<Assigned>, ApiError> {
    let assigned = edit(&current, move |model| schedule::assign_calendar(model, id, &request.ids)).await?;
    Ok(Json(Assigned { assigned }))
}
