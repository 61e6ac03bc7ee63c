// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 4D scheduling
//!
//! Reads work plans, work schedules, tasks, nesting and calendars from the
//! model, and edits them in place so that the changes travel with the
//! downloaded file. Dates are kept as ISO 8601 text in the model and parsed
//! with chrono when derived values are needed.
//!
//! Every write resolves and checks its inputs first; a failing call leaves
//! the model untouched.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

use bim45d_core::{element, new_global_id, schema, AttributeValue, Entity, IfcModel, PropertyValue, SchemaVersion};
use chrono::{Months, NaiveDate, NaiveDateTime, TimeDelta};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::table::Table;

pub const TASKS_COLUMNS: [&str; 5] = ["Task", "Identification", "Start Date", "End Date", "Duration"];
pub const NESTING_COLUMNS: [&str; 8] = [
    "TaskId",
    "TaskName",
    "ParentId",
    "ParentName",
    "ScheduleId",
    "ScheduleName",
    "Start",
    "Finish",
];
pub const UNSCHEDULED_COLUMNS: [&str; 6] = ["ExpressId", "GlobalId", "Class", "Name", "Level", "Type"];
pub const CALENDAR_COLUMNS: [&str; 5] = ["Id", "Name", "PredefinedType", "WorkingTimes", "ExceptionTimes"];

pub const SCHEDULE_TYPES: [&str; 5] = ["ACTUAL", "BASELINE", "PLANNED", "USERDEFINED", "NOTDEFINED"];
pub const CALENDAR_TYPES: [&str; 5] = ["FIRSTSHIFT", "SECONDSHIFT", "THIRDSHIFT", "USERDEFINED", "NOTDEFINED"];

const DEFAULT_TASK_PREFIX: &str = "Task";
const DEFAULT_PLAN_NAME: &str = "WorkPlan";
const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ----------------------------------------------------------------------------
// Dates and durations
// ----------------------------------------------------------------------------

/// Parse `YYYY-MM-DD[(T| )HH:MM[:SS[.f]]]`; a bare date is midnight
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(value) = NaiveDateTime::parse_from_str(text, format) {
            return Some(value);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// `2025-09-15T08:00:00` → `15 Sep 25`; empty when not a date
pub fn format_date(iso: &str) -> String {
    parse_datetime(iso).map_or_else(String::new, |d| d.format("%d %b %y").to_string())
}

/// ISO 8601 duration `PnYnMnWnDTnHnMnS`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IsoDuration {
    pub years: u32,
    pub months: u32,
    pub weeks: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl FromStr for IsoDuration {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let invalid = || Error::invalid(format!("invalid ISO 8601 duration '{}'", text));
        let upper = text.trim().to_ascii_uppercase();
        let body = upper.strip_prefix('P').ok_or_else(invalid)?;
        if body.is_empty() {
            return Err(invalid());
        }

        let mut duration = IsoDuration::default();
        let mut number = String::new();
        let mut in_time = false;
        let mut any = false;
        for c in body.chars() {
            match c {
                '0'..='9' => number.push(c),
                'T' if !in_time && number.is_empty() => in_time = true,
                unit => {
                    let value: u32 = number.parse().map_err(|_| invalid())?;
                    number.clear();
                    let slot = match (in_time, unit) {
                        (false, 'Y') => &mut duration.years,
                        (false, 'M') => &mut duration.months,
                        (false, 'W') => &mut duration.weeks,
                        (false, 'D') => &mut duration.days,
                        (true, 'H') => &mut duration.hours,
                        (true, 'M') => &mut duration.minutes,
                        (true, 'S') => &mut duration.seconds,
                        _ => return Err(invalid()),
                    };
                    *slot = value;
                    any = true;
                }
            }
        }
        if !number.is_empty() || !any {
            return Err(invalid());
        }
        Ok(duration)
    }
}

impl IsoDuration {
    /// Calendar end of a span starting at `start`; the time part is ignored
    pub fn finish_from(&self, start: NaiveDateTime) -> Option<NaiveDateTime> {
        let months = self.years.checked_mul(12)?.checked_add(self.months)?;
        let days = i64::from(self.weeks) * 7 + i64::from(self.days);
        start
            .checked_add_months(Months::new(months))?
            .checked_add_signed(TimeDelta::try_days(days)?)
    }
}

/// Finish derived from a start and a duration text
pub fn finish_from_duration(start: NaiveDateTime, duration: &str) -> Option<NaiveDateTime> {
    duration.parse::<IsoDuration>().ok()?.finish_from(start)
}

fn checked_datetime(field: &str, value: Option<&str>) -> Result<Option<String>> {
    match value {
        None => Ok(None),
        Some(text) => parse_datetime(text)
            .map(|d| Some(d.format(ISO_FORMAT).to_string()))
            .ok_or_else(|| Error::invalid(format!("{}: invalid date '{}'", field, text))),
    }
}

fn checked_date(field: &str, value: Option<&str>) -> Result<Option<String>> {
    match value {
        None => Ok(None),
        Some(text) => parse_datetime(text)
            .map(|d| Some(d.format("%Y-%m-%d").to_string()))
            .ok_or_else(|| Error::invalid(format!("{}: invalid date '{}'", field, text))),
    }
}

fn checked_duration(value: Option<&str>) -> Result<Option<String>> {
    match value {
        None => Ok(None),
        Some(text) => {
            text.parse::<IsoDuration>()?;
            Ok(Some(text.trim().to_ascii_uppercase()))
        }
    }
}

fn checked_enum(field: &'static str, value: Option<&str>, allowed: &[&str], default: &str) -> Result<String> {
    let value = value.map_or_else(|| default.to_string(), |v| v.trim().to_ascii_uppercase());
    if allowed.contains(&value.as_str()) {
        Ok(value)
    } else {
        Err(Error::UnknownOption { field, value })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn timestamp() -> String {
    chrono::Local::now().naive_local().format(ISO_FORMAT).to_string()
}

// ----------------------------------------------------------------------------
// Attribute access by name
// ----------------------------------------------------------------------------

fn attr<'a>(entity: &'a Entity, name: &str) -> Option<&'a AttributeValue> {
    schema::attribute_index(&entity.type_name, name).and_then(|i| entity.get(i))
}

fn attr_ref(entity: &Entity, name: &str) -> Option<u32> {
    attr(entity, name).and_then(AttributeValue::as_entity_ref)
}

fn attr_refs(entity: &Entity, name: &str) -> Vec<u32> {
    schema::attribute_index(&entity.type_name, name).map_or_else(Vec::new, |i| entity.get_refs(i))
}

fn attr_text(entity: &Entity, name: &str) -> Option<String> {
    attr(entity, name).and_then(|v| v.as_string().or_else(|| v.as_enum()).map(str::to_string))
}

fn name_of(model: &IfcModel, id: u32) -> Option<String> {
    model.get(id).and_then(|e| e.name()).map(str::to_string)
}

fn text_or_null(value: Option<String>) -> PropertyValue {
    value.map_or(PropertyValue::Null, PropertyValue::Text)
}

fn id_or_null(id: Option<u32>) -> PropertyValue {
    id.map_or(PropertyValue::Null, PropertyValue::from)
}

// ----------------------------------------------------------------------------
// Reads
// ----------------------------------------------------------------------------

pub fn work_schedules(model: &IfcModel) -> Vec<&Entity> {
    model.by_type("IfcWorkSchedule")
}

/// Objects assigned to a control (schedule or calendar)
fn controlled_objects(model: &IfcModel, control: u32) -> Vec<u32> {
    model
        .inverse_of_type(control, "IfcRelAssignsToControl")
        .into_iter()
        .filter(|rel| attr_ref(rel, "RelatingControl") == Some(control))
        .flat_map(|rel| attr_refs(rel, "RelatedObjects"))
        .collect()
}

fn nested_tasks(model: &IfcModel, task: u32) -> Vec<u32> {
    model
        .inverse_of_type(task, "IfcRelNests")
        .into_iter()
        .filter(|rel| attr_ref(rel, "RelatingObject") == Some(task))
        .flat_map(|rel| attr_refs(rel, "RelatedObjects"))
        .filter(|id| model.get(*id).is_some_and(|e| model.is_a(e, "IfcTask")))
        .collect()
}

fn nest_parent(model: &IfcModel, task: u32) -> Option<u32> {
    model
        .inverse_of_type(task, "IfcRelNests")
        .into_iter()
        .find(|rel| attr_refs(rel, "RelatedObjects").contains(&task))
        .and_then(|rel| attr_ref(rel, "RelatingObject"))
}

/// Tasks controlled by a schedule followed by their nested subtasks,
/// depth first, each task once
pub fn schedule_tasks(model: &IfcModel, schedule: u32) -> Result<Vec<u32>> {
    model.entity_of(schedule, "IfcWorkSchedule")?;
    let mut out = Vec::new();
    let mut seen = FxHashSet::default();
    let roots: Vec<u32> = controlled_objects(model, schedule)
        .into_iter()
        .filter(|id| model.get(*id).is_some_and(|e| model.is_a(e, "IfcTask")))
        .collect();

    let mut stack: Vec<u32> = roots.into_iter().rev().collect();
    while let Some(task) = stack.pop() {
        if !seen.insert(task) {
            continue;
        }
        out.push(task);
        stack.extend(nested_tasks(model, task).into_iter().rev());
    }
    Ok(out)
}

pub fn all_schedule_task_ids(model: &IfcModel) -> FxHashSet<u32> {
    work_schedules(model)
        .iter()
        .filter_map(|ws| schedule_tasks(model, ws.id).ok())
        .flatten()
        .collect()
}

/// Products assigned to any scheduled task
pub fn scheduled_element_ids(model: &IfcModel) -> FxHashSet<u32> {
    let tasks = all_schedule_task_ids(model);
    model
        .by_type("IfcRelAssignsToProcess")
        .into_iter()
        .filter(|rel| attr_ref(rel, "RelatingProcess").is_some_and(|p| tasks.contains(&p)))
        .flat_map(|rel| attr_refs(rel, "RelatedObjects"))
        .filter(|id| model.get(*id).is_some_and(|e| model.is_a(e, "IfcProduct")))
        .collect()
}

pub fn unscheduled_elements_table(model: &IfcModel) -> Table {
    let scheduled = scheduled_element_ids(model);
    let mut table = Table::new(UNSCHEDULED_COLUMNS);
    for el in model.by_type("IfcElement") {
        if scheduled.contains(&el.id) {
            continue;
        }
        table.push_row(vec![
            PropertyValue::from(el.id),
            text_or_null(el.global_id().map(str::to_string)),
            PropertyValue::Text(model.class_name(el).into_owned()),
            text_or_null(el.name().map(str::to_string)),
            text_or_null(element::get_container(model, el.id).and_then(|c| c.name()).map(str::to_string)),
            text_or_null(element::get_type(model, el.id).and_then(|t| t.name()).map(str::to_string)),
        ]);
    }
    table
}

/// Schedule controlling each directly assigned task
pub fn task_to_schedule(model: &IfcModel) -> BTreeMap<u32, u32> {
    let mut map = BTreeMap::new();
    for ws in work_schedules(model) {
        for object in controlled_objects(model, ws.id) {
            if model.get(object).is_some_and(|e| model.is_a(e, "IfcTask")) {
                map.insert(object, ws.id);
            }
        }
    }
    map
}

/// Tasks not directly controlled by a work schedule
pub fn unassigned_tasks(model: &IfcModel) -> Vec<&Entity> {
    let map = task_to_schedule(model);
    model
        .by_type("IfcTask")
        .into_iter()
        .filter(|t| !map.contains_key(&t.id))
        .collect()
}

/// Dates of one task; finish derived from start and duration when absent
#[derive(Debug, Clone, PartialEq)]
struct TaskTiming {
    start: Option<NaiveDateTime>,
    finish: Option<NaiveDateTime>,
    declared_finish: Option<NaiveDateTime>,
    duration: Option<String>,
}

fn task_timing(model: &IfcModel, task: &Entity) -> TaskTiming {
    let time = attr_ref(task, "TaskTime").and_then(|id| model.get(id));
    let read = |name: &str| time.and_then(|t| attr_text(t, name));
    let start = read("ScheduleStart").and_then(|s| parse_datetime(&s));
    let declared_finish = read("ScheduleFinish").and_then(|s| parse_datetime(&s));
    let duration = read("ScheduleDuration");
    let finish = declared_finish.or_else(|| {
        start.zip(duration.as_deref()).and_then(|(s, d)| finish_from_duration(s, d))
    });
    TaskTiming {
        start,
        finish,
        declared_finish,
        duration,
    }
}

/// One task with derived dates, shared by the task tables and the Gantt view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRow {
    pub task_id: u32,
    pub task: Option<String>,
    pub identification: Option<String>,
    pub start: Option<NaiveDateTime>,
    pub finish: Option<NaiveDateTime>,
    pub duration: Option<String>,
    pub schedule: Option<String>,
}

fn by_dates(a: &TaskRow, b: &TaskRow) -> Ordering {
    fn missing_last(x: &Option<NaiveDateTime>, y: &Option<NaiveDateTime>) -> Ordering {
        match (x, y) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
    missing_last(&a.start, &b.start).then_with(|| missing_last(&a.finish, &b.finish))
}

fn task_rows(model: &IfcModel, schedule: u32) -> Result<Vec<TaskRow>> {
    let schedule_name = name_of(model, schedule);
    let mut rows: Vec<TaskRow> = schedule_tasks(model, schedule)?
        .into_iter()
        .filter_map(|id| model.get(id))
        .map(|task| {
            let timing = task_timing(model, task);
            TaskRow {
                task_id: task.id,
                task: task.name().map(str::to_string),
                identification: attr_text(task, "Identification"),
                start: timing.start,
                finish: timing.finish,
                duration: timing.duration,
                schedule: schedule_name.clone(),
            }
        })
        .collect();
    rows.sort_by(by_dates);
    Ok(rows)
}

/// Rows for one schedule, or for every schedule when `schedule` is `None`
pub fn all_task_rows(model: &IfcModel, schedule: Option<u32>) -> Result<Vec<TaskRow>> {
    let mut rows = match schedule {
        Some(id) => task_rows(model, id)?,
        None => {
            let mut rows = Vec::new();
            for ws in work_schedules(model) {
                rows.extend(task_rows(model, ws.id)?);
            }
            rows
        }
    };
    rows.sort_by(by_dates);
    Ok(rows)
}

fn date_cell(value: Option<NaiveDateTime>) -> PropertyValue {
    value.map_or(PropertyValue::Null, |d| PropertyValue::Text(d.format("%Y-%m-%d").to_string()))
}

fn task_cells(row: &TaskRow) -> Vec<PropertyValue> {
    vec![
        text_or_null(row.task.clone()),
        text_or_null(row.identification.clone()),
        date_cell(row.start),
        date_cell(row.finish),
        PropertyValue::Text(row.duration.clone().unwrap_or_default()),
    ]
}

/// Task, Identification, Start Date, End Date, Duration for one schedule
pub fn tasks_table(model: &IfcModel, schedule: u32) -> Result<Table> {
    let mut table = Table::new(TASKS_COLUMNS);
    for row in task_rows(model, schedule)? {
        table.push_row(task_cells(&row));
    }
    Ok(table)
}

/// Task table with an extra WorkSchedule column
pub fn all_tasks_table(model: &IfcModel, schedule: Option<u32>) -> Result<Table> {
    let mut table = Table::new(TASKS_COLUMNS.iter().copied().chain(["WorkSchedule"]));
    for row in all_task_rows(model, schedule)? {
        let mut cells = task_cells(&row);
        cells.push(text_or_null(row.schedule.clone()));
        table.push_row(cells);
    }
    Ok(table)
}

/// Rows with both dates, ready for a timeline chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GanttRow {
    pub task_id: u32,
    pub task: String,
    pub schedule: Option<String>,
    pub start: NaiveDateTime,
    pub finish: NaiveDateTime,
}

pub fn gantt(model: &IfcModel, schedule: Option<u32>) -> Result<Vec<GanttRow>> {
    Ok(all_task_rows(model, schedule)?
        .into_iter()
        .filter_map(|row| {
            Some(GanttRow {
                task_id: row.task_id,
                task: row.task.unwrap_or_else(|| format!("#{}", row.task_id)),
                schedule: row.schedule,
                start: row.start?,
                finish: row.finish?,
            })
        })
        .collect())
}

/// Every task with its nest parent and controlling schedule
pub fn nesting_table(model: &IfcModel) -> Table {
    let schedules = task_to_schedule(model);
    let mut table = Table::new(NESTING_COLUMNS);
    for task in model.by_type("IfcTask") {
        let parent = nest_parent(model, task.id);
        let schedule = schedules.get(&task.id).copied();
        let timing = task_timing(model, task);
        let iso = |d: Option<NaiveDateTime>| {
            d.map_or(PropertyValue::Null, |d| PropertyValue::Text(d.format(ISO_FORMAT).to_string()))
        };
        table.push_row(vec![
            PropertyValue::from(task.id),
            text_or_null(task.name().map(str::to_string)),
            id_or_null(parent),
            text_or_null(parent.and_then(|p| name_of(model, p))),
            id_or_null(schedule),
            text_or_null(schedule.and_then(|s| name_of(model, s))),
            iso(timing.start),
            iso(timing.declared_finish),
        ]);
    }
    table
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleRef {
    pub id: u32,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkPlanInfo {
    pub id: u32,
    pub name: Option<String>,
    pub schedules: Vec<ScheduleRef>,
}

/// Work plans with the schedules they aggregate
pub fn work_plans(model: &IfcModel) -> Vec<WorkPlanInfo> {
    model
        .by_type("IfcWorkPlan")
        .into_iter()
        .map(|plan| {
            let schedules = model
                .inverse_of_type(plan.id, "IfcRelAggregates")
                .into_iter()
                .filter(|rel| attr_ref(rel, "RelatingObject") == Some(plan.id))
                .flat_map(|rel| attr_refs(rel, "RelatedObjects"))
                .filter_map(|id| model.get(id))
                .filter(|e| model.is_a(e, "IfcWorkSchedule"))
                .map(|ws| ScheduleRef {
                    id: ws.id,
                    name: ws.name().map(str::to_string),
                })
                .collect();
            WorkPlanInfo {
                id: plan.id,
                name: plan.name().map(str::to_string),
                schedules,
            }
        })
        .collect()
}

pub fn calendars_table(model: &IfcModel) -> Table {
    let mut table = Table::new(CALENDAR_COLUMNS);
    for calendar in model.by_type("IfcWorkCalendar") {
        table.push_row(vec![
            PropertyValue::from(calendar.id),
            text_or_null(calendar.name().map(str::to_string)),
            text_or_null(attr_text(calendar, "PredefinedType")),
            PropertyValue::from(attr_refs(calendar, "WorkingTimes").len() as i64),
            PropertyValue::from(attr_refs(calendar, "ExceptionTimes").len() as i64),
        ]);
    }
    table
}

// ----------------------------------------------------------------------------
// Writes
// ----------------------------------------------------------------------------

/// Writes use the IFC4 attribute layouts. IFC2X3 has no IfcTaskTime and
/// lays out IfcTask and IfcWorkSchedule differently, so its models are
/// read-only here.
pub fn check_writable(model: &IfcModel) -> Result<()> {
    if *model.schema() == SchemaVersion::Ifc2x3 {
        return Err(Error::invalid(
            "4D editing needs an IFC4 or IFC4X3 model; IFC2X3 schedules are read-only",
        ));
    }
    Ok(())
}

/// New record of `class` with the named attributes set and the rest `$`
///
/// Rooted classes get a fresh GlobalId.
fn build(model: &mut IfcModel, class: &str, values: Vec<(&str, AttributeValue)>) -> Result<u32> {
    check_writable(model)?;
    let names = schema::attribute_names(class);
    let mut attributes = vec![AttributeValue::Null; names.len()];
    for (name, value) in values {
        let index = names
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::invalid(format!("{} has no attribute {}", class, name)))?;
        attributes[index] = value;
    }
    if schema::is_subtype_of(class, "IfcRoot") {
        if let Some(slot) = attributes.first_mut() {
            *slot = AttributeValue::String(new_global_id());
        }
    }
    Ok(model.create_entity(&class.to_ascii_uppercase(), attributes))
}

fn optional_text(value: Option<&str>) -> AttributeValue {
    value.map_or(AttributeValue::Null, |v| AttributeValue::String(v.to_string()))
}

fn optional_owned(value: Option<String>) -> AttributeValue {
    value.map_or(AttributeValue::Null, AttributeValue::String)
}

/// Add `related` to the relationship of `class` whose relating side is
/// `relating`, creating the relationship when none exists
fn relate(
    model: &mut IfcModel,
    class: &str,
    relating_attr: &str,
    relating: u32,
    related_attr: &str,
    related: &[u32],
) -> Result<u32> {
    check_writable(model)?;
    let existing = model
        .inverse_of_type(relating, class)
        .into_iter()
        .find(|rel| attr_ref(rel, relating_attr) == Some(relating))
        .map(|rel| rel.id);

    match existing {
        Some(rel) => {
            let index = schema::attribute_index(class, related_attr)
                .ok_or_else(|| Error::invalid(format!("{} has no attribute {}", class, related_attr)))?;
            for &id in related {
                model.push_reference(rel, index, id)?;
            }
            Ok(rel)
        }
        None => build(
            model,
            class,
            vec![
                (relating_attr, AttributeValue::EntityRef(relating)),
                (related_attr, related.to_vec().into()),
            ],
        ),
    }
}

fn assign_control(model: &mut IfcModel, control: u32, objects: &[u32]) -> Result<u32> {
    relate(model, "IfcRelAssignsToControl", "RelatingControl", control, "RelatedObjects", objects)
}

fn assign_process(model: &mut IfcModel, task: u32, objects: &[u32]) -> Result<u32> {
    relate(model, "IfcRelAssignsToProcess", "RelatingProcess", task, "RelatedObjects", objects)
}

fn nest(model: &mut IfcModel, parent: u32, children: &[u32]) -> Result<u32> {
    relate(model, "IfcRelNests", "RelatingObject", parent, "RelatedObjects", children)
}

fn declare_under_project(model: &mut IfcModel, definition: u32) -> Result<Option<u32>> {
    let Some(project) = model.project().map(|p| p.id) else {
        return Ok(None);
    };
    relate(model, "IfcRelDeclares", "RelatingContext", project, "RelatedDefinitions", &[definition]).map(Some)
}

fn link_finish_start(model: &mut IfcModel, predecessor: u32, successor: u32) -> Result<u32> {
    build(
        model,
        "IfcRelSequence",
        vec![
            ("RelatingProcess", AttributeValue::EntityRef(predecessor)),
            ("RelatedProcess", AttributeValue::EntityRef(successor)),
            ("SequenceType", AttributeValue::Enum("FINISH_START".to_string())),
        ],
    )
}

/// Checked task timing ready to be written
#[derive(Debug, Clone, Default)]
struct TimeValues {
    start: Option<String>,
    finish: Option<String>,
    duration: Option<String>,
}

impl TimeValues {
    fn checked(start: Option<&str>, finish: Option<&str>, duration: Option<&str>) -> Result<Self> {
        Ok(TimeValues {
            start: checked_datetime("start", start)?,
            finish: checked_datetime("finish", finish)?,
            duration: checked_duration(duration)?,
        })
    }

    fn is_empty(&self) -> bool {
        self.start.is_none() && self.finish.is_none() && self.duration.is_none()
    }
}

fn create_task(model: &mut IfcModel, name: &str, identification: Option<&str>, time: &TimeValues) -> Result<u32> {
    let task_time = if time.is_empty() {
        AttributeValue::Null
    } else {
        AttributeValue::EntityRef(build(
            model,
            "IfcTaskTime",
            vec![
                ("DurationType", AttributeValue::Enum("WORKTIME".to_string())),
                ("ScheduleDuration", optional_owned(time.duration.clone())),
                ("ScheduleStart", optional_owned(time.start.clone())),
                ("ScheduleFinish", optional_owned(time.finish.clone())),
            ],
        )?)
    };
    build(
        model,
        "IfcTask",
        vec![
            ("Name", AttributeValue::String(name.to_string())),
            ("Identification", optional_text(identification)),
            ("IsMilestone", AttributeValue::Enum("F".to_string())),
            ("TaskTime", task_time),
            ("PredefinedType", AttributeValue::Enum("CONSTRUCTION".to_string())),
        ],
    )
}

fn require_all(model: &IfcModel, ids: &[u32], class: &str) -> Result<()> {
    for &id in ids {
        model.entity_of(id, class)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkScheduleOptions {
    pub name: Option<String>,
    pub identification: Option<String>,
    /// PLANNED when absent
    pub predefined_type: Option<String>,
    pub start_time: Option<String>,
    pub finish_time: Option<String>,
    pub purpose: Option<String>,
}

/// New work schedule declared under the project; returns its id
///
/// StartTime defaults to the creation time.
pub fn create_work_schedule(model: &mut IfcModel, options: &WorkScheduleOptions) -> Result<u32> {
    let predefined = checked_enum("PredefinedType", non_blank(&options.predefined_type), &SCHEDULE_TYPES, "PLANNED")?;
    let start = checked_datetime("StartTime", non_blank(&options.start_time))?;
    let finish = checked_datetime("FinishTime", non_blank(&options.finish_time))?;
    let created = timestamp();

    let id = build(
        model,
        "IfcWorkSchedule",
        vec![
            ("Name", optional_text(non_blank(&options.name))),
            ("Identification", optional_text(non_blank(&options.identification))),
            ("CreationDate", AttributeValue::String(created.clone())),
            ("Purpose", optional_text(non_blank(&options.purpose))),
            ("StartTime", AttributeValue::String(start.unwrap_or(created))),
            ("FinishTime", optional_owned(finish)),
            ("PredefinedType", AttributeValue::Enum(predefined)),
        ],
    )?;
    declare_under_project(model, id)?;
    tracing::info!(schedule = id, "Created work schedule");
    Ok(id)
}

/// Remove a schedule; relationships left empty go with it
pub fn delete_work_schedule(model: &mut IfcModel, schedule: u32) -> Result<Vec<u32>> {
    model.entity_of(schedule, "IfcWorkSchedule")?;
    let removed = model.remove_entity(schedule)?;
    tracing::info!(schedule, removed = removed.len(), "Deleted work schedule");
    Ok(removed)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskMode {
    /// One task per element, named `<prefix>_<id>`
    #[default]
    PerElement,
    /// One task for all elements
    Single,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskOptions {
    pub name_prefix: String,
    pub identification_prefix: Option<String>,
    pub start: Option<String>,
    pub finish: Option<String>,
    pub duration: Option<String>,
    pub mode: TaskMode,
}

impl Default for TaskOptions {
    fn default() -> Self {
        TaskOptions {
            name_prefix: DEFAULT_TASK_PREFIX.to_string(),
            identification_prefix: None,
            start: None,
            finish: None,
            duration: None,
            mode: TaskMode::PerElement,
        }
    }
}

/// Tasks for elements, with a task time when any date or duration is given
///
/// Returns the created task ids.
pub fn create_tasks(model: &mut IfcModel, element_ids: &[u32], options: &TaskOptions) -> Result<Vec<u32>> {
    if element_ids.is_empty() {
        return Err(Error::invalid("no elements selected"));
    }
    require_all(model, element_ids, "IfcProduct")?;
    let time = TimeValues::checked(
        non_blank(&options.start),
        non_blank(&options.finish),
        non_blank(&options.duration),
    )?;
    let prefix = options.name_prefix.trim();
    let prefix = if prefix.is_empty() { DEFAULT_TASK_PREFIX } else { prefix };
    let ident_prefix = non_blank(&options.identification_prefix);

    let mut created = Vec::new();
    match options.mode {
        TaskMode::Single => {
            let task = create_task(model, prefix, ident_prefix, &time)?;
            assign_process(model, task, element_ids)?;
            created.push(task);
        }
        TaskMode::PerElement => {
            for &element in element_ids {
                let name = format!("{}_{}", prefix, element);
                let ident = ident_prefix.map(|p| format!("{}{}", p, element));
                let task = create_task(model, &name, ident.as_deref(), &time)?;
                assign_process(model, task, &[element])?;
                created.push(task);
            }
        }
    }
    tracing::info!(tasks = created.len(), mode = ?options.mode, "Created tasks");
    Ok(created)
}

/// One task per element, controlled by the schedule
pub fn create_tasks_for_elements_in_schedule(
    model: &mut IfcModel,
    schedule: u32,
    element_ids: &[u32],
    name_prefix: &str,
) -> Result<Vec<u32>> {
    model.entity_of(schedule, "IfcWorkSchedule")?;
    if element_ids.is_empty() {
        return Err(Error::invalid("no elements selected"));
    }
    require_all(model, element_ids, "IfcProduct")?;
    let prefix = if name_prefix.trim().is_empty() {
        DEFAULT_TASK_PREFIX
    } else {
        name_prefix.trim()
    };

    let mut created = Vec::with_capacity(element_ids.len());
    for &element in element_ids {
        let task = create_task(model, &format!("{}_{}", prefix, element), None, &TimeValues::default())?;
        assign_process(model, task, &[element])?;
        assign_control(model, schedule, &[task])?;
        created.push(task);
    }
    tracing::info!(schedule, tasks = created.len(), "Assigned element tasks to schedule");
    Ok(created)
}

/// One row of the task planner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanRow {
    pub name: String,
    pub identification: Option<String>,
    pub start: Option<String>,
    pub finish: Option<String>,
    pub duration: Option<String>,
    /// Element ids separated by `;`, `,` or whitespace
    pub element_ids: Option<String>,
}

/// Numeric tokens of an id list; anything else is skipped
pub fn parse_element_ids(text: &str) -> Vec<u32> {
    text.split(|c: char| c == ';' || c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|token| token.parse().ok())
        .collect()
}

/// Tasks from planner rows, nested under a summary task and optionally
/// chained finish to start
///
/// Rows without a name are skipped. An existing task of the schedule named
/// `summary_name` is reused. Element ids that do not resolve are ignored.
pub fn create_tasks_from_plan(
    model: &mut IfcModel,
    schedule: u32,
    rows: &[PlanRow],
    summary_name: Option<&str>,
    link_sequential: bool,
) -> Result<Vec<u32>> {
    model.entity_of(schedule, "IfcWorkSchedule")?;

    struct Planned<'a> {
        row: &'a PlanRow,
        time: TimeValues,
        elements: Vec<u32>,
    }
    let mut planned = Vec::new();
    for row in rows.iter().filter(|r| !r.name.trim().is_empty()) {
        let time = TimeValues::checked(non_blank(&row.start), non_blank(&row.finish), non_blank(&row.duration))
            .map_err(|e| Error::invalid(format!("task '{}': {}", row.name.trim(), e)))?;
        let elements = row
            .element_ids
            .as_deref()
            .map(parse_element_ids)
            .unwrap_or_default()
            .into_iter()
            .filter(|id| model.get(*id).is_some_and(|e| model.is_a(e, "IfcProduct")))
            .collect();
        planned.push(Planned { row, time, elements });
    }

    let summary = match summary_name.map(str::trim).filter(|s| !s.is_empty()) {
        None => None,
        Some(name) => {
            let existing = controlled_objects(model, schedule).into_iter().find(|id| {
                model
                    .get(*id)
                    .is_some_and(|e| model.is_a(e, "IfcTask") && e.name() == Some(name))
            });
            match existing {
                Some(id) => Some(id),
                None => {
                    let id = create_task(model, name, None, &TimeValues::default())?;
                    assign_control(model, schedule, &[id])?;
                    Some(id)
                }
            }
        }
    };

    let mut created = Vec::with_capacity(planned.len());
    for plan in &planned {
        let task = create_task(
            model,
            plan.row.name.trim(),
            non_blank(&plan.row.identification),
            &plan.time,
        )?;
        assign_control(model, schedule, &[task])?;
        if let Some(parent) = summary {
            nest(model, parent, &[task])?;
        }
        if !plan.elements.is_empty() {
            assign_process(model, task, &plan.elements)?;
        }
        created.push(task);
    }

    if link_sequential {
        for pair in created.windows(2) {
            link_finish_start(model, pair[0], pair[1])?;
        }
    }
    tracing::info!(schedule, tasks = created.len(), summary = ?summary, "Created tasks from plan");
    Ok(created)
}

/// Control existing tasks by a schedule; returns how many were assigned
pub fn assign_tasks_to_schedule(model: &mut IfcModel, schedule: u32, task_ids: &[u32]) -> Result<usize> {
    model.entity_of(schedule, "IfcWorkSchedule")?;
    require_all(model, task_ids, "IfcTask")?;
    if task_ids.is_empty() {
        return Ok(0);
    }
    assign_control(model, schedule, task_ids)?;
    Ok(task_ids.len())
}

/// Remove a task and its task time when nothing else uses it
pub fn delete_task(model: &mut IfcModel, task: u32) -> Result<Vec<u32>> {
    let task_time = attr_ref(model.entity_of(task, "IfcTask")?, "TaskTime");
    let mut removed = model.remove_entity(task)?;
    if let Some(time) = task_time {
        if model.get(time).is_some() && model.inverse_ids(time).is_empty() {
            removed.extend(model.remove_entity(time)?);
        }
    }
    tracing::info!(task, removed = removed.len(), "Deleted task");
    Ok(removed)
}

/// New work plan declared under the project; returns its id
pub fn create_work_plan(model: &mut IfcModel, name: Option<&str>) -> Result<u32> {
    let name = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or(DEFAULT_PLAN_NAME);
    let created = timestamp();
    let id = build(
        model,
        "IfcWorkPlan",
        vec![
            ("Name", AttributeValue::String(name.to_string())),
            ("CreationDate", AttributeValue::String(created.clone())),
            ("StartTime", AttributeValue::String(created)),
            ("PredefinedType", AttributeValue::Enum("NOTDEFINED".to_string())),
        ],
    )?;
    declare_under_project(model, id)?;
    tracing::info!(plan = id, "Created work plan");
    Ok(id)
}

pub fn aggregate_schedule_to_work_plan(model: &mut IfcModel, plan: u32, schedule: u32) -> Result<u32> {
    model.entity_of(plan, "IfcWorkPlan")?;
    model.entity_of(schedule, "IfcWorkSchedule")?;
    relate(model, "IfcRelAggregates", "RelatingObject", plan, "RelatedObjects", &[schedule])
}

pub fn delete_work_plan(model: &mut IfcModel, plan: u32) -> Result<Vec<u32>> {
    model.entity_of(plan, "IfcWorkPlan")?;
    Ok(model.remove_entity(plan)?)
}

pub fn create_work_calendar(
    model: &mut IfcModel,
    name: Option<&str>,
    predefined_type: Option<&str>,
    description: Option<&str>,
) -> Result<u32> {
    let predefined = checked_enum("PredefinedType", predefined_type, &CALENDAR_TYPES, "NOTDEFINED")?;
    build(
        model,
        "IfcWorkCalendar",
        vec![
            ("Name", optional_text(name)),
            ("Description", optional_text(description)),
            ("PredefinedType", AttributeValue::Enum(predefined)),
        ],
    )
}

pub fn delete_work_calendar(model: &mut IfcModel, calendar: u32) -> Result<Vec<u32>> {
    model.entity_of(calendar, "IfcWorkCalendar")?;
    Ok(model.remove_entity(calendar)?)
}

/// Append a working or exception period to a calendar; returns the work
/// time id
pub fn add_calendar_time(
    model: &mut IfcModel,
    calendar: u32,
    name: Option<&str>,
    start: Option<&str>,
    finish: Option<&str>,
    exception: bool,
) -> Result<u32> {
    let list = if exception { "ExceptionTimes" } else { "WorkingTimes" };
    let index = schema::attribute_index(&model.entity_of(calendar, "IfcWorkCalendar")?.type_name, list)
        .ok_or_else(|| Error::invalid(format!("calendar has no {} attribute", list)))?;
    let start = checked_date("Start", start)?;
    let finish = checked_date("Finish", finish)?;

    let time = build(
        model,
        "IfcWorkTime",
        vec![
            ("Name", optional_text(name)),
            ("Start", optional_owned(start)),
            ("Finish", optional_owned(finish)),
        ],
    )?;
    model.push_reference(calendar, index, time)?;
    Ok(time)
}

/// Control objects (usually tasks) by a calendar
pub fn assign_calendar(model: &mut IfcModel, calendar: u32, object_ids: &[u32]) -> Result<usize> {
    model.entity_of(calendar, "IfcWorkCalendar")?;
    require_all(model, object_ids, "IfcObject")?;
    if object_ids.is_empty() {
        return Ok(0);
    }
    assign_control(model, calendar, object_ids)?;
    Ok(object_ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;

    fn at(text: &str) -> NaiveDateTime {
        parse_datetime(text).unwrap()
    }

    #[test]
    fn test_parse_datetime_and_format() {
        assert_eq!(at("2025-09-15"), at("2025-09-15T00:00:00"));
        assert_eq!(at("2025-09-15 08:30"), at("2025-09-15T08:30:00"));
        assert!(parse_datetime("15/09/2025").is_none());
        assert_eq!(format_date("2025-09-15T08:00:00"), "15 Sep 25");
        assert_eq!(format_date("not a date"), "");
    }

    #[test]
    fn test_iso_duration() {
        assert_eq!(finish_from_duration(at("2025-09-15"), "P5D"), Some(at("2025-09-20")));
        assert_eq!(finish_from_duration(at("2025-09-22T08:00:00"), "P2W"), Some(at("2025-10-06T08:00:00")));
        assert_eq!(finish_from_duration(at("2025-01-31"), "P1M"), Some(at("2025-02-28")));
        assert_eq!(finish_from_duration(at("2025-01-01"), "P1Y2DT8H"), Some(at("2026-01-03")));

        let parsed: IsoDuration = "PT4H30M".parse().unwrap();
        assert_eq!((parsed.hours, parsed.minutes, parsed.days), (4, 30, 0));
        for bad in ["", "P", "5D", "P5", "PXD", "P1H"] {
            assert!(bad.parse::<IsoDuration>().is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_schedule_tasks_and_tables() {
        let model = fixture::model();
        assert_eq!(work_schedules(&model).len(), 1);
        assert_eq!(schedule_tasks(&model, 101).unwrap(), vec![111, 113, 114]);
        assert!(schedule_tasks(&model, 100).is_err());

        let table = tasks_table(&model, 101).unwrap();
        assert_eq!(table.columns, TASKS_COLUMNS.to_vec());
        assert_eq!(table.cell(0, "Task").unwrap().to_string(), "Foundations");
        assert_eq!(table.cell(0, "End Date").unwrap().to_string(), "2025-09-20");
        assert_eq!(table.cell(1, "End Date").unwrap().to_string(), "2025-10-06");
        assert_eq!(table.cell(2, "Task").unwrap().to_string(), "Walls L0");
        assert!(table.cell(2, "Start Date").unwrap().is_null());
        assert_eq!(table.cell(2, "Duration").unwrap().to_string(), "");

        let all = all_tasks_table(&model, None).unwrap();
        assert_eq!(all.cell(0, "WorkSchedule").unwrap().to_string(), "Structure");

        let bars = gantt(&model, Some(101)).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].task, "Walls");
    }

    #[test]
    fn test_assignment_views() {
        let model = fixture::model();
        let scheduled = scheduled_element_ids(&model);
        assert_eq!(scheduled, FxHashSet::from_iter([20, 21, 25]));

        let unscheduled = unscheduled_elements_table(&model);
        let ids: Vec<String> = unscheduled.column("ExpressId").iter().map(|v| v.to_string()).collect();
        assert_eq!(ids, vec!["22", "23", "24", "26", "27"]);
        assert_eq!(unscheduled.cell(0, "Level").unwrap().to_string(), "Level 1");

        let map = task_to_schedule(&model);
        assert_eq!(map.get(&111), Some(&101));
        assert!(!map.contains_key(&114));
        let unassigned: Vec<u32> = unassigned_tasks(&model).iter().map(|t| t.id).collect();
        assert_eq!(unassigned, vec![114, 120]);

        let nesting = nesting_table(&model);
        assert_eq!(nesting.len(), 4);
        let walls_l0 = nesting.filter_eq("TaskName", "Walls L0");
        assert_eq!(walls_l0.cell(0, "ParentName").unwrap().to_string(), "Walls");
        assert!(walls_l0.cell(0, "ScheduleId").unwrap().is_null());

        let plans = work_plans(&model);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].schedules[0].id, 101);

        let calendars = calendars_table(&model);
        assert_eq!(calendars.cell(0, "PredefinedType").unwrap().to_string(), "FIRSTSHIFT");
        assert_eq!(calendars.cell(0, "WorkingTimes").unwrap().as_f64(), Some(1.0));
    }

    #[test]
    fn test_create_tasks_per_element_and_single() {
        let mut model = fixture::model();
        let options = TaskOptions {
            name_prefix: "Erect".to_string(),
            identification_prefix: Some("E-".to_string()),
            start: Some("2025-10-01T08:00:00".to_string()),
            duration: Some("p3d".to_string()),
            ..TaskOptions::default()
        };
        let tasks = create_tasks(&mut model, &[22, 23], &options).unwrap();
        assert_eq!(tasks.len(), 2);
        let first = model.get(tasks[0]).unwrap();
        assert_eq!(first.name(), Some("Erect_22"));
        assert_eq!(attr_text(first, "Identification").as_deref(), Some("E-22"));
        let timing = task_timing(&model, first);
        assert_eq!(timing.finish, Some(at("2025-10-04T08:00:00")));

        let single = TaskOptions {
            name_prefix: "  ".to_string(),
            mode: TaskMode::Single,
            ..TaskOptions::default()
        };
        let tasks = create_tasks(&mut model, &[22, 23, 24], &single).unwrap();
        let task = model.get(tasks[0]).unwrap();
        assert_eq!(task.name(), Some("Task"));
        assert!(attr_ref(task, "TaskTime").is_none());
        let rel = model.inverse_of_type(tasks[0], "IfcRelAssignsToProcess");
        assert_eq!(attr_refs(rel[0], "RelatedObjects"), vec![22, 23, 24]);
    }

    #[test]
    fn test_writes_validate_before_mutating() {
        let mut model = fixture::model();
        let before = model.len();

        assert!(create_tasks(&mut model, &[22, 9999], &TaskOptions::default()).is_err());
        assert!(create_tasks(&mut model, &[], &TaskOptions::default()).is_err());
        let bad_duration = TaskOptions {
            duration: Some("five days".to_string()),
            ..TaskOptions::default()
        };
        assert!(create_tasks(&mut model, &[22], &bad_duration).is_err());
        let bad_type = WorkScheduleOptions {
            predefined_type: Some("SOMEDAY".to_string()),
            ..WorkScheduleOptions::default()
        };
        assert!(matches!(
            create_work_schedule(&mut model, &bad_type),
            Err(Error::UnknownOption { field: "PredefinedType", .. })
        ));
        assert!(assign_tasks_to_schedule(&mut model, 101, &[22]).is_err());
        assert!(add_calendar_time(&mut model, 130, None, Some("tomorrow"), None, false).is_err());
        assert!(delete_task(&mut model, 101).is_err());

        assert_eq!(model.len(), before);
    }

    #[test]
    fn test_schedule_and_plan_lifecycle() {
        let mut model = fixture::model();
        let options = WorkScheduleOptions {
            name: Some("Finishes".to_string()),
            start_time: Some("2025-11-01".to_string()),
            ..WorkScheduleOptions::default()
        };
        let schedule = create_work_schedule(&mut model, &options).unwrap();
        let ws = model.get(schedule).unwrap();
        assert_eq!(attr_text(ws, "StartTime").as_deref(), Some("2025-11-01T00:00:00"));
        assert_eq!(attr_text(ws, "PredefinedType").as_deref(), Some("PLANNED"));
        assert!(!model.inverse_of_type(schedule, "IfcRelDeclares").is_empty());

        let created = create_tasks_for_elements_in_schedule(&mut model, schedule, &[22, 23], "Paint").unwrap();
        assert_eq!(schedule_tasks(&model, schedule).unwrap(), created);
        assert!(scheduled_element_ids(&model).contains(&22));

        assert_eq!(assign_tasks_to_schedule(&mut model, schedule, &[120]).unwrap(), 1);
        assert_eq!(task_to_schedule(&model).get(&120), Some(&schedule));

        let plan = create_work_plan(&mut model, None).unwrap();
        assert_eq!(model.get(plan).unwrap().name(), Some("WorkPlan"));
        aggregate_schedule_to_work_plan(&mut model, plan, schedule).unwrap();
        let info = work_plans(&model).into_iter().find(|p| p.id == plan).unwrap();
        assert_eq!(info.schedules[0].name.as_deref(), Some("Finishes"));

        delete_work_plan(&mut model, plan).unwrap();
        assert!(model.get(plan).is_none());
        delete_work_schedule(&mut model, schedule).unwrap();
        assert!(schedule_tasks(&model, schedule).is_err());
        assert_eq!(work_schedules(&model).len(), 1);
    }

    #[test]
    fn test_create_tasks_from_plan() {
        let mut model = fixture::model();
        let rows = vec![
            PlanRow {
                name: "Excavate".to_string(),
                identification: Some("P1".to_string()),
                start: Some("2025-09-01T08:00:00".to_string()),
                duration: Some("P1W".to_string()),
                element_ids: Some("25; 9999, abc".to_string()),
                ..PlanRow::default()
            },
            PlanRow {
                name: "   ".to_string(),
                ..PlanRow::default()
            },
            PlanRow {
                name: "Pour".to_string(),
                element_ids: Some("24 23".to_string()),
                ..PlanRow::default()
            },
        ];
        let tasks = create_tasks_from_plan(&mut model, 101, &rows, Some("Plan Summary"), true).unwrap();
        assert_eq!(tasks.len(), 2);

        let summary = controlled_objects(&model, 101)
            .into_iter()
            .find(|id| model.get(*id).and_then(|e| e.name()) == Some("Plan Summary"))
            .unwrap();
        assert_eq!(nested_tasks(&model, summary), tasks);

        let sequence = model.inverse_of_type(tasks[0], "IfcRelSequence");
        assert_eq!(sequence.len(), 1);
        assert_eq!(attr_ref(sequence[0], "RelatedProcess"), Some(tasks[1]));
        assert_eq!(attr_text(sequence[0], "SequenceType").as_deref(), Some("FINISH_START"));

        let process = model.inverse_of_type(tasks[1], "IfcRelAssignsToProcess");
        assert_eq!(attr_refs(process[0], "RelatedObjects"), vec![24, 23]);

        // a second run reuses the summary task
        let again = create_tasks_from_plan(&mut model, 101, &rows[2..], Some("Plan Summary"), false).unwrap();
        assert_eq!(nested_tasks(&model, summary).len(), 3);
        assert_eq!(model.inverse_of_type(again[0], "IfcRelSequence").len(), 0);
        assert_eq!(parse_element_ids(" 1;2,,3\t4 x5 "), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_delete_task_cleans_relationships() {
        let mut model = fixture::model();
        let removed = delete_task(&mut model, 114).unwrap();
        assert!(removed.contains(&114));
        // nest and process relationships only served this task
        assert!(removed.contains(&116));
        assert!(removed.contains(&118));
        assert_eq!(schedule_tasks(&model, 101).unwrap(), vec![111, 113]);

        let removed = delete_task(&mut model, 111).unwrap();
        assert!(removed.contains(&110));
        assert!(removed.contains(&119));
        assert!(model.get(115).is_some());
    }

    #[test]
    fn test_calendars() {
        let mut model = fixture::model();
        let calendar = create_work_calendar(&mut model, Some("Night"), Some("thirdshift"), None).unwrap();
        add_calendar_time(&mut model, calendar, Some("Nights"), Some("2025-09-01"), Some("2025-12-31"), false).unwrap();
        add_calendar_time(&mut model, calendar, Some("Holiday"), Some("2025-12-25T00:00:00"), None, true).unwrap();
        assert_eq!(assign_calendar(&mut model, calendar, &[111, 113]).unwrap(), 2);

        let table = calendars_table(&model).filter_eq("Name", "Night");
        assert_eq!(table.cell(0, "PredefinedType").unwrap().to_string(), "THIRDSHIFT");
        assert_eq!(table.cell(0, "WorkingTimes").unwrap().as_f64(), Some(1.0));
        assert_eq!(table.cell(0, "ExceptionTimes").unwrap().as_f64(), Some(1.0));
        assert_eq!(controlled_objects(&model, calendar), vec![111, 113]);

        assert!(create_work_calendar(&mut model, None, Some("WEEKENDS"), None).is_err());
        delete_work_calendar(&mut model, calendar).unwrap();
        assert_eq!(calendars_table(&model).len(), 1);
    }

    #[test]
    fn test_edits_survive_step_roundtrip() {
        let mut model = fixture::model();
        let rows = vec![PlanRow {
            name: "Roof".to_string(),
            start: Some("2025-10-10".to_string()),
            duration: Some("P4D".to_string()),
            element_ids: Some("24".to_string()),
            ..PlanRow::default()
        }];
        create_tasks_from_plan(&mut model, 101, &rows, None, false).unwrap();

        let reloaded = IfcModel::parse(&model.to_step()).unwrap();
        let table = tasks_table(&reloaded, 101).unwrap();
        let roof = table.filter_eq("Task", "Roof");
        assert_eq!(roof.cell(0, "End Date").unwrap().to_string(), "2025-10-14");
        assert!(scheduled_element_ids(&reloaded).contains(&24));
    }

    #[test]
    fn test_ifc2x3_models_are_read_only() {
        let mut model = IfcModel::parse(
            "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC2X3'));\nENDSEC;\nDATA;\n\
             #1=IFCWALL('2O2Fr$t4X7Zf8NOew3FLOI',$,'W-01',$,$,$,$,$);\n\
             ENDSEC;\nEND-ISO-10303-21;\n",
        )
        .unwrap();
        let before = model.len();

        let err = create_work_schedule(&mut model, &WorkScheduleOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.to_string().contains("IFC2X3"));
        assert!(create_tasks(&mut model, &[1], &TaskOptions::default()).is_err());
        assert!(create_work_calendar(&mut model, Some("Site"), None, None).is_err());
        assert_eq!(model.len(), before);

        assert!(check_writable(&fixture::model()).is_ok());
    }
}
