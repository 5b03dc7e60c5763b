use crate::error::{ScheduleError, ScheduleResult};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> ScheduleResult<Self> {
        if end <= start {
            return Err(ScheduleError::InvalidWindow(format!(
                "window end {end} must be after start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn center(&self) -> NaiveDateTime {
        self.start + self.duration() / 2
    }

    /// True when `[start, end)` shares a positive-length stretch with this window.
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.end.min(end) > self.start.max(start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowCategory {
    Daylight,
    HighWaterSlack,
    LowWaterSlack,
}

/// One row of the weather table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub time: NaiveDateTime,
    pub values: BTreeMap<String, f64>,
}

impl WeatherSample {
    pub fn new<I, S>(time: NaiveDateTime, values: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            time,
            values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Value of `metric`, ignoring NaN readings.
    pub fn value(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).copied().filter(|v| !v.is_nan())
    }
}

/// Time-indexed weather measurements, kept sorted by time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<WeatherSample>", into = "Vec<WeatherSample>")]
pub struct WeatherSeries {
    samples: Vec<WeatherSample>,
}

impl WeatherSeries {
    pub fn new(mut samples: Vec<WeatherSample>) -> Self {
        samples.sort_by_key(|sample| sample.time);
        Self { samples }
    }

    pub fn samples(&self) -> &[WeatherSample] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first_time(&self) -> Option<NaiveDateTime> {
        self.samples.first().map(|sample| sample.time)
    }

    pub fn last_time(&self) -> Option<NaiveDateTime> {
        self.samples.last().map(|sample| sample.time)
    }

    /// Samples with `start <= time < end`.
    pub fn samples_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> &[WeatherSample] {
        let lo = self.samples.partition_point(|sample| sample.time < start);
        let hi = self.samples.partition_point(|sample| sample.time < end);
        &self.samples[lo..hi.max(lo)]
    }

    pub fn has_metric(&self, metric: &str) -> bool {
        self.samples
            .iter()
            .any(|sample| sample.values.contains_key(metric))
    }
}

impl From<Vec<WeatherSample>> for WeatherSeries {
    fn from(samples: Vec<WeatherSample>) -> Self {
        Self::new(samples)
    }
}

impl From<WeatherSeries> for Vec<WeatherSample> {
    fn from(series: WeatherSeries) -> Self {
        series.samples
    }
}

/// Source of environmental availability for the alignment search.
pub trait WindowProvider {
    /// Windows of one category in chronological order.
    fn windows(&self, category: WindowCategory) -> &[TimeWindow];

    fn weather(&self) -> Option<&WeatherSeries>;

    fn daylight(&self) -> &[TimeWindow] {
        self.windows(WindowCategory::Daylight)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvironmentalWindows {
    daylight: Vec<TimeWindow>,
    high_water_slack: Vec<TimeWindow>,
    low_water_slack: Vec<TimeWindow>,
    weather: Option<WeatherSeries>,
}

/// Serializable form of [`EnvironmentalWindows`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default)]
    pub daylight: Vec<TimeWindow>,
    #[serde(default)]
    pub high_water_slack: Vec<TimeWindow>,
    #[serde(default)]
    pub low_water_slack: Vec<TimeWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherSeries>,
}

impl EnvironmentalWindows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &WindowConfig) -> ScheduleResult<Self> {
        let mut windows = Self::new();
        windows.extend_windows(WindowCategory::Daylight, config.daylight.iter().copied())?;
        windows.extend_windows(
            WindowCategory::HighWaterSlack,
            config.high_water_slack.iter().copied(),
        )?;
        windows.extend_windows(
            WindowCategory::LowWaterSlack,
            config.low_water_slack.iter().copied(),
        )?;
        windows.weather = config.weather.clone();
        Ok(windows)
    }

    pub fn to_config(&self) -> WindowConfig {
        WindowConfig {
            daylight: self.daylight.clone(),
            high_water_slack: self.high_water_slack.clone(),
            low_water_slack: self.low_water_slack.clone(),
            weather: self.weather.clone(),
        }
    }

    fn list_mut(&mut self, category: WindowCategory) -> &mut Vec<TimeWindow> {
        match category {
            WindowCategory::Daylight => &mut self.daylight,
            WindowCategory::HighWaterSlack => &mut self.high_water_slack,
            WindowCategory::LowWaterSlack => &mut self.low_water_slack,
        }
    }

    /// Add a single window, keeping the category ordered.
    pub fn add_window(&mut self, category: WindowCategory, window: TimeWindow) -> ScheduleResult<()> {
        self.extend_windows(category, [window])
    }

    /// Add multiple windows at once. Windows of one category may touch but
    /// never overlap; on overlap nothing is added.
    pub fn extend_windows<I>(&mut self, category: WindowCategory, windows: I) -> ScheduleResult<()>
    where
        I: IntoIterator<Item = TimeWindow>,
    {
        let mut merged = self.windows(category).to_vec();
        for window in windows {
            merged.push(TimeWindow::new(window.start, window.end)?);
        }
        merged.sort_by_key(|window| window.start);
        if let Some(pair) = merged.windows(2).find(|pair| pair[1].start < pair[0].end) {
            return Err(ScheduleError::InvalidWindow(format!(
                "{category:?} windows {}..{} and {}..{} overlap",
                pair[0].start, pair[0].end, pair[1].start, pair[1].end
            )));
        }
        *self.list_mut(category) = merged;
        Ok(())
    }

    /// Add the same clock-time window for every day in a date range (inclusive).
    /// A `close` at or before `open` ends the window on the following day.
    pub fn add_daily_windows(
        &mut self,
        category: WindowCategory,
        first_day: NaiveDate,
        last_day: NaiveDate,
        open: NaiveTime,
        close: NaiveTime,
    ) -> ScheduleResult<()> {
        let mut windows = Vec::new();
        let mut day = first_day;
        while day <= last_day {
            let start = day.and_time(open);
            let mut end = day.and_time(close);
            if end <= start {
                end += Duration::days(1);
            }
            windows.push(TimeWindow { start, end });
            day += Duration::days(1);
        }
        self.extend_windows(category, windows)
    }

    pub fn set_weather(&mut self, series: WeatherSeries) {
        self.weather = Some(series);
    }

    pub fn count_windows(&self, category: WindowCategory) -> usize {
        self.windows(category).len()
    }
}

impl WindowProvider for EnvironmentalWindows {
    fn windows(&self, category: WindowCategory) -> &[TimeWindow] {
        match category {
            WindowCategory::Daylight => &self.daylight,
            WindowCategory::HighWaterSlack => &self.high_water_slack,
            WindowCategory::LowWaterSlack => &self.low_water_slack,
        }
    }

    fn weather(&self) -> Option<&WeatherSeries> {
        self.weather.as_ref()
    }
}
