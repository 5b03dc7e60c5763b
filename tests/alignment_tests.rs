use chrono::{Duration, NaiveDate, NaiveDateTime};
use tidal_schedule::{
    Activity, Alignment, ConstraintSpec, EnvironmentalWindows, Schedule, ScheduleConfig,
    ScheduleError, ScheduleWarning, TideWindow, TimeWindow, WeatherLimit, WeatherSample,
    WeatherSeries, WindowAligner, WindowCategory,
};

fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 10, day)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn window(start: NaiveDateTime, end: NaiveDateTime) -> TimeWindow {
    TimeWindow::new(start, end).unwrap()
}

fn windows_with(category: WindowCategory, list: Vec<TimeWindow>) -> EnvironmentalWindows {
    let mut windows = EnvironmentalWindows::new();
    windows.extend_windows(category, list).unwrap();
    windows
}

#[test]
fn tide_activity_is_centred_in_slack_window() {
    let windows = windows_with(
        WindowCategory::HighWaterSlack,
        vec![window(at(29, 10, 0), at(29, 12, 0))],
    );
    let config = ScheduleConfig::default();
    let aligner = WindowAligner::new(&windows, &config);

    let start = aligner.find_feasible_start(
        &ConstraintSpec::tide(TideWindow::HighWaterSlackOnly),
        Duration::hours(1),
        at(29, 8, 0),
    );
    assert_eq!(start, Alignment::Aligned(at(29, 10, 30)));
}

#[test]
fn centred_candidate_before_bound_is_skipped() {
    let windows = windows_with(
        WindowCategory::HighWaterSlack,
        vec![
            window(at(29, 10, 0), at(29, 12, 0)),
            window(at(29, 22, 0), at(30, 0, 0)),
        ],
    );
    let config = ScheduleConfig::default();
    let aligner = WindowAligner::new(&windows, &config);

    let start = aligner.find_feasible_start(
        &ConstraintSpec::tide(TideWindow::HighWaterSlackOnly),
        Duration::hours(1),
        at(29, 11, 0),
    );
    assert_eq!(start, Alignment::Aligned(at(29, 22, 30)));
}

#[test]
fn any_slack_merges_high_and_low_water() {
    let mut windows = windows_with(
        WindowCategory::HighWaterSlack,
        vec![window(at(29, 22, 0), at(30, 0, 0))],
    );
    windows
        .add_window(
            WindowCategory::LowWaterSlack,
            window(at(29, 16, 0), at(29, 18, 0)),
        )
        .unwrap();
    let config = ScheduleConfig::default();
    let aligner = WindowAligner::new(&windows, &config);

    let any = aligner.find_feasible_start(
        &ConstraintSpec::tide(TideWindow::AnySlack),
        Duration::hours(1),
        at(29, 8, 0),
    );
    let high_only = aligner.find_feasible_start(
        &ConstraintSpec::tide(TideWindow::HighWaterSlackOnly),
        Duration::hours(1),
        at(29, 8, 0),
    );
    assert_eq!(any, Alignment::Aligned(at(29, 16, 30)));
    assert_eq!(high_only, Alignment::Aligned(at(29, 22, 30)));
}

#[test]
fn daylight_activity_fits_inside_one_window() {
    let windows = windows_with(
        WindowCategory::Daylight,
        vec![window(at(29, 7, 0), at(29, 18, 0))],
    );
    let config = ScheduleConfig::default();
    let aligner = WindowAligner::new(&windows, &config);

    let duration = Duration::hours(2);
    let start = aligner
        .find_feasible_start(&ConstraintSpec::daylight(), duration, at(29, 6, 0))
        .time()
        .unwrap();
    assert_eq!(start, at(29, 7, 0));
    assert!(start + duration <= at(29, 18, 0));
}

#[test]
fn daylight_windows_shorter_than_duration_are_skipped() {
    let windows = windows_with(
        WindowCategory::Daylight,
        vec![
            window(at(29, 7, 0), at(29, 8, 0)),
            window(at(30, 7, 0), at(30, 18, 0)),
        ],
    );
    let config = ScheduleConfig::default();
    let aligner = WindowAligner::new(&windows, &config);

    let start = aligner.find_feasible_start(
        &ConstraintSpec::daylight(),
        Duration::hours(3),
        at(29, 6, 0),
    );
    assert_eq!(start, Alignment::Aligned(at(30, 7, 0)));
}

#[test]
fn tide_with_daylight_requires_overlap() {
    let mut windows = windows_with(
        WindowCategory::HighWaterSlack,
        vec![
            window(at(29, 2, 0), at(29, 4, 0)),
            window(at(29, 14, 0), at(29, 16, 0)),
        ],
    );
    windows
        .add_window(WindowCategory::Daylight, window(at(29, 7, 0), at(29, 18, 0)))
        .unwrap();
    let config = ScheduleConfig::default();
    let aligner = WindowAligner::new(&windows, &config);

    let start = aligner.find_feasible_start(
        &ConstraintSpec::tide(TideWindow::HighWaterSlackOnly).with_daylight(),
        Duration::hours(1),
        at(29, 0, 0),
    );
    assert_eq!(start, Alignment::Aligned(at(29, 14, 30)));
}

fn wind_series(calm_from: NaiveDateTime, first: NaiveDateTime, last: NaiveDateTime) -> WeatherSeries {
    let mut samples = Vec::new();
    let mut time = first;
    while time <= last {
        let wind = if time < calm_from { 20.0 } else { 5.0 };
        samples.push(WeatherSample::new(time, [("wind_speed", wind)]));
        time += Duration::minutes(10);
    }
    WeatherSeries::new(samples)
}

#[test]
fn weather_limit_moves_tide_activity_to_next_window() {
    let mut windows = windows_with(
        WindowCategory::HighWaterSlack,
        vec![
            window(at(29, 10, 0), at(29, 12, 0)),
            window(at(29, 22, 0), at(30, 0, 0)),
        ],
    );
    windows.set_weather(wind_series(at(29, 18, 0), at(29, 0, 0), at(30, 6, 0)));
    let config = ScheduleConfig::default();
    let aligner = WindowAligner::new(&windows, &config);

    let spec = ConstraintSpec::tide(TideWindow::HighWaterSlackOnly)
        .with_limit(WeatherLimit::max("wind_speed", 12.0));
    let start = aligner.find_feasible_start(&spec, Duration::hours(1), at(29, 8, 0));
    assert_eq!(start, Alignment::Aligned(at(29, 22, 30)));
}

#[test]
fn weather_only_activity_scans_forward_in_steps() {
    let mut windows = EnvironmentalWindows::new();
    windows.set_weather(wind_series(at(29, 10, 0), at(29, 6, 0), at(29, 14, 0)));
    let config = ScheduleConfig::default();
    let aligner = WindowAligner::new(&windows, &config);

    let spec = ConstraintSpec::default().with_limit(WeatherLimit::max("wind_speed", 12.0));
    let start = aligner.find_feasible_start(&spec, Duration::hours(1), at(29, 8, 0));
    assert_eq!(start, Alignment::Aligned(at(29, 10, 0)));
}

#[test]
fn weather_only_search_stops_at_horizon() {
    let mut windows = EnvironmentalWindows::new();
    windows.set_weather(wind_series(at(30, 12, 0), at(29, 6, 0), at(30, 14, 0)));
    let config = ScheduleConfig::default().with_horizon(at(29, 0, 0), at(29, 20, 0));
    let aligner = WindowAligner::new(&windows, &config);

    let spec = ConstraintSpec::default().with_limit(WeatherLimit::max("wind_speed", 12.0));
    let start = aligner.find_feasible_start(&spec, Duration::hours(1), at(29, 8, 0));
    assert_eq!(start, Alignment::Unresolved);
}

#[test]
fn weather_only_bound_after_last_sample_is_accepted() {
    let mut windows = EnvironmentalWindows::new();
    windows.set_weather(WeatherSeries::new(vec![
        WeatherSample::new(at(29, 0, 0), [("wind_speed", 20.0)]),
        WeatherSample::new(at(29, 6, 0), [("wind_speed", 20.0)]),
    ]));
    let mut schedule = Schedule::new(
        vec![
            Activity::new("A", "Place armour", 1.0).constrained(
                ConstraintSpec::default().with_limit(WeatherLimit::max("wind_speed", 10.0)),
            ),
        ],
        windows,
        ScheduleConfig::starting_at(at(29, 8, 0)),
    )
    .unwrap();

    schedule.refresh().unwrap();
    assert_eq!(schedule.activity("A").unwrap().start, Some(at(29, 8, 0)));
}

#[test]
fn weather_only_latest_start_before_first_sample_is_accepted() {
    let mut windows = EnvironmentalWindows::new();
    windows.set_weather(wind_series(at(30, 0, 0), at(29, 12, 0), at(29, 18, 0)));
    let config = ScheduleConfig::default();
    let aligner = WindowAligner::new(&windows, &config);

    let spec = ConstraintSpec::default().with_limit(WeatherLimit::max("wind_speed", 12.0));
    assert_eq!(
        aligner.find_latest_feasible_start(&spec, Duration::hours(1), at(29, 10, 0)),
        Alignment::Aligned(at(29, 9, 0))
    );
}

#[test]
fn unconstrained_activity_keeps_its_bound() {
    let windows = EnvironmentalWindows::new();
    let config = ScheduleConfig::default();
    let aligner = WindowAligner::new(&windows, &config);
    assert_eq!(
        aligner.find_feasible_start(&ConstraintSpec::default(), Duration::hours(4), at(29, 9, 15)),
        Alignment::Aligned(at(29, 9, 15))
    );
}

#[test]
fn latest_start_fits_before_the_bound() {
    let windows = windows_with(
        WindowCategory::Daylight,
        vec![
            window(at(29, 7, 0), at(29, 18, 0)),
            window(at(30, 7, 0), at(30, 18, 0)),
        ],
    );
    let config = ScheduleConfig::default();
    let aligner = WindowAligner::new(&windows, &config);

    assert_eq!(
        aligner.find_latest_feasible_start(
            &ConstraintSpec::default(),
            Duration::hours(2),
            at(29, 12, 0)
        ),
        Alignment::Aligned(at(29, 10, 0))
    );
    assert_eq!(
        aligner.find_latest_feasible_start(
            &ConstraintSpec::daylight(),
            Duration::hours(2),
            at(30, 9, 0)
        ),
        Alignment::Aligned(at(30, 7, 0))
    );
    assert_eq!(
        aligner.find_latest_feasible_start(
            &ConstraintSpec::daylight(),
            Duration::hours(2),
            at(30, 8, 0)
        ),
        Alignment::Aligned(at(29, 16, 0))
    );
}

#[test]
fn latest_tide_start_is_centred() {
    let windows = windows_with(
        WindowCategory::HighWaterSlack,
        vec![
            window(at(29, 6, 0), at(29, 8, 0)),
            window(at(29, 9, 0), at(29, 11, 0)),
        ],
    );
    let config = ScheduleConfig::default();
    let aligner = WindowAligner::new(&windows, &config);

    let spec = ConstraintSpec::tide(TideWindow::HighWaterSlackOnly);
    assert_eq!(
        aligner.find_latest_feasible_start(&spec, Duration::hours(2), at(29, 12, 0)),
        Alignment::Aligned(at(29, 9, 0))
    );
    assert_eq!(
        aligner.find_latest_feasible_start(&spec, Duration::hours(2), at(29, 10, 0)),
        Alignment::Aligned(at(29, 6, 0))
    );
}

fn tide_only_schedule(best_effort: bool) -> Schedule {
    Schedule::new(
        vec![
            Activity::new("A", "Float in caisson", 1.0)
                .constrained(ConstraintSpec::tide(TideWindow::HighWaterSlackOnly)),
        ],
        EnvironmentalWindows::new(),
        ScheduleConfig::starting_at(at(29, 8, 0)).with_best_effort(best_effort),
    )
    .unwrap()
}

#[test]
fn unresolved_constraint_fails_without_best_effort() {
    let mut schedule = tide_only_schedule(false);
    let err = schedule.refresh().unwrap_err();
    assert!(matches!(err, ScheduleError::ConstraintUnresolved { ref id, .. } if id == "A"));
    assert!(!err.is_configuration_error());
    assert!(schedule.activities().iter().all(|a| a.start.is_none()));
}

#[test]
fn unresolved_constraint_falls_back_in_best_effort_mode() {
    let mut schedule = tide_only_schedule(true);
    let summary = schedule.refresh().unwrap();

    let activity = schedule.activity("A").unwrap();
    assert!(activity.constraint_unresolved);
    assert_eq!(activity.start, Some(at(29, 8, 0)));
    assert_eq!(summary.unresolved, vec!["A".to_string()]);
    assert!(summary.warnings.contains(&ScheduleWarning::UnresolvedConstraint {
        activity: "A".into(),
        fallback: at(29, 8, 0),
    }));
}

#[test]
fn unavailable_weather_metric_is_reported() {
    let mut windows = EnvironmentalWindows::new();
    windows.set_weather(wind_series(at(29, 0, 0), at(29, 0, 0), at(29, 23, 0)));
    let mut schedule = Schedule::new(
        vec![
            Activity::new("A", "Dive inspection", 1.0).constrained(
                ConstraintSpec::default().with_limit(WeatherLimit::min("visibility", 2.0)),
            ),
        ],
        windows,
        ScheduleConfig::starting_at(at(29, 8, 0)),
    )
    .unwrap();

    let summary = schedule.refresh().unwrap();
    assert_eq!(schedule.activity("A").unwrap().start, Some(at(29, 8, 0)));
    assert!(summary.warnings.contains(&ScheduleWarning::WeatherMetricUnavailable {
        activity: "A".into(),
        metric: "visibility".into(),
    }));
}
