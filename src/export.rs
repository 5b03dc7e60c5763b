use crate::activity::hours_of;
use crate::graph::ActivityGraph;
use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::Serialize;

/// One exported activity. Computed fields are `None` until a run sets them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub group: String,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub duration_hours: Option<f64>,
    pub earliest_start: Option<NaiveDateTime>,
    pub latest_start: Option<NaiveDateTime>,
    pub latest_end: Option<NaiveDateTime>,
    /// Time spent waiting for a window after the predecessor bound.
    pub window_wait_hours: Option<f64>,
    pub predecessors: Vec<String>,
    pub successors: Vec<String>,
    pub constraints: String,
    pub slack_hours: Option<f64>,
    pub float_hours: Option<f64>,
    pub is_critical: Option<bool>,
    pub constraint_unresolved: bool,
}

/// Read-only projection of the graph in input order.
pub fn schedule_rows(graph: &ActivityGraph) -> Vec<ScheduleRow> {
    graph
        .activities()
        .iter()
        .enumerate()
        .map(|(idx, activity)| ScheduleRow {
            id: activity.id.clone(),
            name: activity.name.clone(),
            description: activity.description.clone(),
            group: activity.group.clone(),
            start: activity.start,
            end: activity.end,
            duration_hours: activity.duration_hours(),
            earliest_start: activity.earliest_start,
            latest_start: activity.latest_start,
            latest_end: activity.latest_end,
            window_wait_hours: activity
                .start
                .zip(activity.earliest_start)
                .map(|(start, earliest)| hours_of(start - earliest)),
            predecessors: graph.predecessor_ids(idx),
            successors: graph.successor_ids(idx),
            constraints: activity.constraints.to_string(),
            slack_hours: activity.slack.map(hours_of),
            float_hours: activity.total_float.map(hours_of),
            is_critical: activity.is_critical,
            constraint_unresolved: activity.constraint_unresolved,
        })
        .collect()
}

fn datetime_series(name: &'static str, values: Vec<Option<i64>>) -> PolarsResult<Series> {
    Series::new(PlSmallStr::from_static(name), values)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
}

fn millis(time: Option<NaiveDateTime>) -> Option<i64> {
    time.map(|t| t.and_utc().timestamp_millis())
}

fn list_series(name: &'static str, lists: Vec<Vec<String>>) -> Series {
    let chunked: ListChunked = lists
        .into_iter()
        .map(|values| Series::new(PlSmallStr::EMPTY, values))
        .collect();
    chunked
        .into_series()
        .with_name(PlSmallStr::from_static(name))
}

pub fn rows_to_dataframe(rows: &[ScheduleRow]) -> PolarsResult<DataFrame> {
    let strings = |f: fn(&ScheduleRow) -> &String| -> Vec<String> {
        rows.iter().map(|row| f(row).clone()).collect()
    };
    let times = |f: fn(&ScheduleRow) -> Option<NaiveDateTime>| -> Vec<Option<i64>> {
        rows.iter().map(|row| millis(f(row))).collect()
    };
    let hours = |f: fn(&ScheduleRow) -> Option<f64>| -> Vec<Option<f64>> {
        rows.iter().map(f).collect()
    };

    let columns = vec![
        Series::new(PlSmallStr::from_static("id"), strings(|r| &r.id)),
        Series::new(PlSmallStr::from_static("name"), strings(|r| &r.name)),
        Series::new(
            PlSmallStr::from_static("description"),
            strings(|r| &r.description),
        ),
        Series::new(PlSmallStr::from_static("group"), strings(|r| &r.group)),
        datetime_series("start", times(|r| r.start))?,
        datetime_series("end", times(|r| r.end))?,
        Series::new(
            PlSmallStr::from_static("duration_hours"),
            hours(|r| r.duration_hours),
        ),
        datetime_series("earliest_start", times(|r| r.earliest_start))?,
        datetime_series("latest_start", times(|r| r.latest_start))?,
        datetime_series("latest_end", times(|r| r.latest_end))?,
        Series::new(
            PlSmallStr::from_static("window_wait_hours"),
            hours(|r| r.window_wait_hours),
        ),
        list_series(
            "predecessors",
            rows.iter().map(|r| r.predecessors.clone()).collect(),
        ),
        list_series(
            "successors",
            rows.iter().map(|r| r.successors.clone()).collect(),
        ),
        Series::new(
            PlSmallStr::from_static("constraints"),
            strings(|r| &r.constraints),
        ),
        Series::new(
            PlSmallStr::from_static("slack_hours"),
            hours(|r| r.slack_hours),
        ),
        Series::new(
            PlSmallStr::from_static("float_hours"),
            hours(|r| r.float_hours),
        ),
        Series::new(
            PlSmallStr::from_static("is_critical"),
            rows.iter().map(|r| r.is_critical).collect::<Vec<_>>(),
        ),
        Series::new(
            PlSmallStr::from_static("constraint_unresolved"),
            rows.iter()
                .map(|r| r.constraint_unresolved)
                .collect::<Vec<_>>(),
        ),
    ];

    DataFrame::new(columns.into_iter().map(IntoColumn::into_column).collect())
}
