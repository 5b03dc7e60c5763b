use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::fs;
use tempfile::NamedTempFile;
use tidal_schedule::persistence::{
    PersistenceError, load_scenario_from_json, save_scenario_to_json, save_schedule_to_csv,
    save_schedule_to_json,
};
use tidal_schedule::{TideWindow, WeatherLimit};

fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 10, day)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

const SCENARIO: &str = r#"{
  "config": {
    "project_name": "Harbour wall",
    "project_start": "2025-10-29T08:00:00",
    "best_effort": true
  },
  "windows": {
    "daylight": [
      { "start": "2025-10-29T07:00:00", "end": "2025-10-29T18:00:00" },
      { "start": "2025-10-30T07:00:00", "end": "2025-10-30T18:00:00" }
    ],
    "high_water_slack": [
      { "start": "2025-10-29T10:00:00", "end": "2025-10-29T12:00:00" },
      { "start": "2025-10-29T22:30:00", "end": "2025-10-30T00:30:00" }
    ],
    "weather": [
      { "time": "2025-10-29T08:00:00", "values": { "wind_speed": 8.0 } },
      { "time": "2025-10-29T12:00:00", "values": { "wind_speed": 9.0 } }
    ]
  },
  "constraints": {
    "HW-DAY": {
      "tide_window_required": "high-water-slack-only",
      "daylight_required": true,
      "max_wind_speed": 12.0
    }
  },
  "activities": [
    { "id": "A", "name": "Mobilise", "group": "Prep", "duration": 1.5 },
    { "id": "B", "name": "Place unit", "duration": "1", "predecessors": ["A"], "constraint_id": "HW-DAY" },
    { "id": "C", "name": "Grout", "duration": 2, "predecessors": ["B"] }
  ]
}"#;

fn scenario_file() -> NamedTempFile {
    let tmp = NamedTempFile::new().expect("create temp file");
    fs::write(tmp.path(), SCENARIO).expect("write scenario");
    tmp
}

#[test]
fn scenario_loads_constraints_and_windows() {
    let tmp = scenario_file();
    let mut schedule = load_scenario_from_json(tmp.path()).unwrap();

    assert_eq!(schedule.config().project_name, "Harbour wall");
    assert!(schedule.config().best_effort);
    let b = schedule.activity("B").unwrap();
    assert_eq!(b.constraint_id.as_deref(), Some("HW-DAY"));
    assert_eq!(b.constraints.tide_window, TideWindow::HighWaterSlackOnly);
    assert!(b.constraints.daylight_required);
    assert_eq!(b.constraints.weather_limits, vec![WeatherLimit::max("wind_speed", 12.0)]);

    schedule.refresh().unwrap();
    assert_eq!(schedule.activity("A").unwrap().end, Some(at(29, 9, 30)));
    assert_eq!(schedule.activity("B").unwrap().start, Some(at(29, 10, 30)));
    assert_eq!(schedule.activity("C").unwrap().end, Some(at(29, 13, 30)));
}

#[test]
fn scenario_round_trips_through_json() {
    let tmp = scenario_file();
    let original = load_scenario_from_json(tmp.path()).unwrap();

    let out = NamedTempFile::new().unwrap();
    save_scenario_to_json(&original, out.path()).unwrap();
    let reloaded = load_scenario_from_json(out.path()).unwrap();

    assert_eq!(original.activities(), reloaded.activities());
    assert_eq!(original.config(), reloaded.config());
    assert_eq!(original.windows(), reloaded.windows());
}

#[test]
fn unknown_constraint_id_is_invalid_data() {
    let tmp = NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        r#"{ "activities": [ { "id": "A", "duration": 1, "constraint_id": "MISSING" } ] }"#,
    )
    .unwrap();
    assert!(matches!(
        load_scenario_from_json(tmp.path()),
        Err(PersistenceError::InvalidData(_))
    ));
}

#[test]
fn overlapping_slack_windows_are_rejected_on_load() {
    let tmp = NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        r#"{ "windows": { "high_water_slack": [
              { "start": "2025-10-29T10:00:00", "end": "2025-10-29T12:00:00" },
              { "start": "2025-10-29T11:00:00", "end": "2025-10-29T13:00:00" } ] },
            "activities": [ { "id": "A", "duration": 1 } ] }"#,
    )
    .unwrap();
    assert!(matches!(
        load_scenario_from_json(tmp.path()),
        Err(PersistenceError::Schedule(tidal_schedule::ScheduleError::InvalidWindow(_)))
    ));
}

#[test]
fn cyclic_scenario_reports_schedule_error() {
    let tmp = NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        r#"{ "activities": [
              { "id": "A", "duration": 1, "predecessors": ["B"] },
              { "id": "B", "duration": 1, "predecessors": ["A"] } ] }"#,
    )
    .unwrap();
    assert!(matches!(
        load_scenario_from_json(tmp.path()),
        Err(PersistenceError::Schedule(_))
    ));
}

#[test]
fn csv_export_writes_one_row_per_activity() {
    let tmp = scenario_file();
    let mut schedule = load_scenario_from_json(tmp.path()).unwrap();
    schedule.refresh().unwrap();

    let out = NamedTempFile::new().unwrap();
    save_schedule_to_csv(&schedule, out.path()).unwrap();
    let text = fs::read_to_string(out.path()).unwrap();
    let mut lines = text.lines();

    let header = lines.next().unwrap();
    assert!(header.starts_with("id,name,description,group,start,end"));
    assert!(header.contains("window_wait_hours"));
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[1].starts_with("B,Place unit,,,2025-10-29 10:30,2025-10-29 11:30"));
}

#[test]
fn json_export_includes_computed_fields() {
    let tmp = scenario_file();
    let mut schedule = load_scenario_from_json(tmp.path()).unwrap();
    schedule.refresh().unwrap();

    let out = NamedTempFile::new().unwrap();
    save_schedule_to_json(&schedule, out.path()).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path()).unwrap()).unwrap();
    let rows = value.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1]["id"], "B");
    assert_eq!(rows[1]["start"], "2025-10-29T10:30:00");
    assert_eq!(rows[1]["window_wait_hours"], 1.0);
    assert_eq!(rows[1]["predecessors"][0], "A");
    assert_eq!(rows[0]["successors"][0], "B");
    assert_eq!(rows[2]["is_critical"], true);
}

#[test]
fn dataframe_projection_has_typed_columns() {
    let tmp = scenario_file();
    let mut schedule = load_scenario_from_json(tmp.path()).unwrap();
    schedule.refresh().unwrap();

    let df = schedule.to_dataframe().unwrap();
    assert_eq!(df.height(), 3);
    assert!(matches!(
        df.column("start").unwrap().dtype(),
        DataType::Datetime(TimeUnit::Milliseconds, None)
    ));
    let ids: Vec<Option<&str>> = df.column("id").unwrap().str().unwrap().into_iter().collect();
    assert_eq!(ids, vec![Some("A"), Some("B"), Some("C")]);
    let critical = df.column("is_critical").unwrap().bool().unwrap();
    assert_eq!(critical.get(2), Some(true));
    let constraints = df.column("constraints").unwrap().str().unwrap();
    assert_eq!(
        constraints.get(1),
        Some("tide=high-water-slack-only; daylight; max_wind_speed=12")
    );
}

#[test]
fn export_before_computing_leaves_times_empty() {
    let tmp = scenario_file();
    let schedule = load_scenario_from_json(tmp.path()).unwrap();
    let rows = schedule.export_rows();
    assert!(rows.iter().all(|row| row.start.is_none() && row.slack_hours.is_none()));
    assert_eq!(rows[2].duration_hours, Some(2.0));
}
