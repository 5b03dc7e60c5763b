use crate::config::ScheduleConfig;
use crate::constraint::{ConstraintSpec, TideWindow};
use crate::windows::{TimeWindow, WindowCategory, WindowProvider};
use chrono::{Duration, NaiveDateTime, Timelike};

/// Outcome of a window search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Aligned(NaiveDateTime),
    /// No candidate satisfied the constraints before the horizon ran out.
    Unresolved,
}

impl Alignment {
    pub fn time(self) -> Option<NaiveDateTime> {
        match self {
            Alignment::Aligned(time) => Some(time),
            Alignment::Unresolved => None,
        }
    }
}

/// Drops seconds and sub-second parts.
pub fn truncate_to_minute(time: NaiveDateTime) -> NaiveDateTime {
    time - Duration::seconds(i64::from(time.second()))
        - Duration::nanoseconds(i64::from(time.nanosecond()))
}

/// Finds start times whose whole span satisfies an activity's environmental
/// constraints.
///
/// Tide-constrained activities are centred in a slack window. Daylight-only
/// activities must fit inside a single daylight window. Weather limits are
/// checked against every sample in `[start, start + duration)`; activities with
/// only weather limits are placed by stepping through time in fixed increments.
pub struct WindowAligner<'a> {
    provider: &'a dyn WindowProvider,
    horizon_start: Option<NaiveDateTime>,
    horizon_end: Option<NaiveDateTime>,
    step: Duration,
}

impl<'a> WindowAligner<'a> {
    pub fn new(provider: &'a dyn WindowProvider, config: &ScheduleConfig) -> Self {
        Self {
            provider,
            horizon_start: config.horizon_start,
            horizon_end: config.horizon_end,
            step: config.weather_step(),
        }
    }

    /// Earliest start `>= not_before` satisfying every constraint.
    pub fn find_feasible_start(
        &self,
        constraints: &ConstraintSpec,
        duration: Duration,
        not_before: NaiveDateTime,
    ) -> Alignment {
        if constraints.is_unconstrained() {
            return Alignment::Aligned(not_before);
        }

        if constraints.tide_window.is_required() {
            for window in self.tide_candidates(constraints.tide_window) {
                let start = truncate_to_minute(window.center() - duration / 2);
                if start < not_before {
                    continue;
                }
                if self.beyond_horizon_end(start) {
                    break;
                }
                if self.accepts_centred(constraints, start, duration) {
                    return Alignment::Aligned(start);
                }
            }
            return Alignment::Unresolved;
        }

        if constraints.daylight_required {
            for window in self.provider.daylight() {
                if window.start < not_before || window.duration() < duration {
                    continue;
                }
                let start = truncate_to_minute(window.start);
                if self.beyond_horizon_end(start) {
                    break;
                }
                if self.weather_admits(constraints, start, duration) {
                    return Alignment::Aligned(start);
                }
            }
            return Alignment::Unresolved;
        }

        self.scan_weather_forward(constraints, duration, not_before)
    }

    /// Latest start with `start + duration <= latest_end` satisfying every
    /// constraint.
    pub fn find_latest_feasible_start(
        &self,
        constraints: &ConstraintSpec,
        duration: Duration,
        latest_end: NaiveDateTime,
    ) -> Alignment {
        let latest_start = latest_end - duration;
        if constraints.is_unconstrained() {
            return Alignment::Aligned(latest_start);
        }

        if constraints.tide_window.is_required() {
            let mut candidates = self.tide_candidates(constraints.tide_window);
            candidates.reverse();
            for window in candidates {
                let start = truncate_to_minute(window.center() - duration / 2);
                if start > latest_start {
                    continue;
                }
                if self.before_horizon_start(start) {
                    break;
                }
                if self.accepts_centred(constraints, start, duration) {
                    return Alignment::Aligned(start);
                }
            }
            return Alignment::Unresolved;
        }

        if constraints.daylight_required {
            let mut daylight: Vec<TimeWindow> = self.provider.daylight().to_vec();
            daylight.sort_by(|a, b| b.end.cmp(&a.end));
            for window in daylight {
                let start = truncate_to_minute(window.end.min(latest_end) - duration);
                if start < window.start {
                    continue;
                }
                if self.before_horizon_start(start) {
                    break;
                }
                if self.weather_admits(constraints, start, duration) {
                    return Alignment::Aligned(start);
                }
            }
            return Alignment::Unresolved;
        }

        self.scan_weather_backward(constraints, duration, latest_start)
    }

    /// True when no weather sample inside `[start, start + duration)` breaks a
    /// declared limit. Metrics the series does not carry are treated as met.
    pub fn weather_admits(
        &self,
        constraints: &ConstraintSpec,
        start: NaiveDateTime,
        duration: Duration,
    ) -> bool {
        if !constraints.has_weather_limits() {
            return true;
        }
        let Some(series) = self.provider.weather() else {
            return true;
        };
        series
            .samples_between(start, start + duration)
            .iter()
            .all(|sample| {
                constraints.weather_limits.iter().all(|limit| {
                    sample
                        .value(&limit.metric)
                        .is_none_or(|value| limit.admits(value))
                })
            })
    }

    /// Declared weather metrics that the provider cannot check.
    pub fn unavailable_metrics(&self, constraints: &ConstraintSpec) -> Vec<String> {
        let series = self.provider.weather();
        constraints
            .weather_limits
            .iter()
            .filter(|limit| series.is_none_or(|series| !series.has_metric(&limit.metric)))
            .map(|limit| limit.metric.clone())
            .collect()
    }

    fn tide_candidates(&self, requirement: TideWindow) -> Vec<TimeWindow> {
        let mut windows: Vec<TimeWindow> = self
            .provider
            .windows(WindowCategory::HighWaterSlack)
            .to_vec();
        if requirement == TideWindow::AnySlack {
            windows.extend_from_slice(self.provider.windows(WindowCategory::LowWaterSlack));
        }
        windows.sort_by_key(|window| window.center());
        windows
    }

    fn accepts_centred(
        &self,
        constraints: &ConstraintSpec,
        start: NaiveDateTime,
        duration: Duration,
    ) -> bool {
        let end = start + duration;
        if constraints.daylight_required
            && !self
                .provider
                .daylight()
                .iter()
                .any(|window| window.overlaps(start, end))
        {
            return false;
        }
        self.weather_admits(constraints, start, duration)
    }

    fn scan_weather_forward(
        &self,
        constraints: &ConstraintSpec,
        duration: Duration,
        not_before: NaiveDateTime,
    ) -> Alignment {
        let Some(series) = self.provider.weather() else {
            return Alignment::Aligned(not_before);
        };
        let limit = match self.horizon_end {
            Some(end) => end,
            // Past the last sample no reading can break a limit, so the bound is still tried.
            None => series
                .last_time()
                .map_or(not_before, |last| last.max(not_before)),
        };
        let mut candidate = not_before;
        while candidate <= limit {
            if self.weather_admits(constraints, candidate, duration) {
                return Alignment::Aligned(candidate);
            }
            candidate += self.step;
        }
        Alignment::Unresolved
    }

    fn scan_weather_backward(
        &self,
        constraints: &ConstraintSpec,
        duration: Duration,
        latest_start: NaiveDateTime,
    ) -> Alignment {
        let Some(series) = self.provider.weather() else {
            return Alignment::Aligned(latest_start);
        };
        let mut candidate = truncate_to_minute(latest_start);
        let limit = match self.horizon_start {
            Some(start) => start,
            None => series
                .first_time()
                .map_or(candidate, |first| first.min(candidate)),
        };
        while candidate >= limit {
            if self.weather_admits(constraints, candidate, duration) {
                return Alignment::Aligned(candidate);
            }
            candidate -= self.step;
        }
        Alignment::Unresolved
    }

    fn beyond_horizon_end(&self, start: NaiveDateTime) -> bool {
        self.horizon_end.is_some_and(|end| start > end)
    }

    fn before_horizon_start(&self, start: NaiveDateTime) -> bool {
        self.horizon_start.is_some_and(|bound| start < bound)
    }
}
