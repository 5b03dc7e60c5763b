use crate::error::{ScheduleError, ScheduleResult};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Run-level settings for a schedule.
///
/// The project start is always supplied here; the engine never reads the clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub project_name: String,
    /// Earliest start for activities without predecessors.
    pub project_start: NaiveDateTime,
    /// Lower bound for backward window scans.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizon_start: Option<NaiveDateTime>,
    /// Upper bound for forward window scans. Candidates starting later are rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizon_end: Option<NaiveDateTime>,
    /// Fall back to the unconstrained bound when no window fits.
    pub best_effort: bool,
    /// Step used when scanning for weather-only constraints.
    pub weather_step_minutes: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            project_name: "New Project".to_string(),
            project_start: NaiveDate::from_ymd_opt(2025, 10, 29)
                .and_then(|date| date.and_hms_opt(8, 0, 0))
                .unwrap_or_default(),
            horizon_start: None,
            horizon_end: None,
            best_effort: false,
            weather_step_minutes: 10,
        }
    }
}

impl ScheduleConfig {
    pub fn starting_at(project_start: NaiveDateTime) -> Self {
        Self {
            project_start,
            ..Self::default()
        }
    }

    pub fn with_horizon(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.horizon_start = Some(start);
        self.horizon_end = Some(end);
        self
    }

    pub fn with_best_effort(mut self, best_effort: bool) -> Self {
        self.best_effort = best_effort;
        self
    }

    pub fn weather_step(&self) -> Duration {
        Duration::minutes(self.weather_step_minutes)
    }

    pub fn validate(&self) -> ScheduleResult<()> {
        if self.weather_step_minutes <= 0 {
            return Err(ScheduleError::InvalidConfig(format!(
                "weather_step_minutes must be positive (got {})",
                self.weather_step_minutes
            )));
        }
        if let (Some(start), Some(end)) = (self.horizon_start, self.horizon_end) {
            if start > end {
                return Err(ScheduleError::InvalidConfig(format!(
                    "horizon start {start} must be on or before horizon end {end}"
                )));
            }
        }
        Ok(())
    }
}
