use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which tidal slack windows an activity may be centred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TideWindow {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "any-slack", alias = "slack")]
    AnySlack,
    #[serde(rename = "high-water-slack-only", alias = "slackhw")]
    HighWaterSlackOnly,
}

impl TideWindow {
    pub fn is_required(self) -> bool {
        !matches!(self, TideWindow::None)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TideWindow::None => "none",
            TideWindow::AnySlack => "any-slack",
            TideWindow::HighWaterSlackOnly => "high-water-slack-only",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    Max,
    Min,
}

impl LimitKind {
    fn prefix(self) -> &'static str {
        match self {
            LimitKind::Max => "max_",
            LimitKind::Min => "min_",
        }
    }
}

/// A threshold on one metric of the weather series, e.g. `max_wind_speed = 12.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherLimit {
    pub metric: String,
    pub kind: LimitKind,
    pub threshold: f64,
}

impl WeatherLimit {
    pub fn max(metric: impl Into<String>, threshold: f64) -> Self {
        Self {
            metric: metric.into(),
            kind: LimitKind::Max,
            threshold,
        }
    }

    pub fn min(metric: impl Into<String>, threshold: f64) -> Self {
        Self {
            metric: metric.into(),
            kind: LimitKind::Min,
            threshold,
        }
    }

    /// Parses a `max_<metric>` / `min_<metric>` key.
    pub fn from_key(key: &str, threshold: f64) -> Result<Self, String> {
        let (kind, metric) = if let Some(metric) = key.strip_prefix(LimitKind::Max.prefix()) {
            (LimitKind::Max, metric)
        } else if let Some(metric) = key.strip_prefix(LimitKind::Min.prefix()) {
            (LimitKind::Min, metric)
        } else {
            return Err(format!("unrecognized constraint key '{key}'"));
        };
        if metric.is_empty() {
            return Err(format!("constraint key '{key}' names no metric"));
        }
        if !threshold.is_finite() {
            return Err(format!("constraint '{key}' has non-finite threshold {threshold}"));
        }
        Ok(Self {
            metric: metric.to_string(),
            kind,
            threshold,
        })
    }

    pub fn key(&self) -> String {
        format!("{}{}", self.kind.prefix(), self.metric)
    }

    pub fn admits(&self, value: f64) -> bool {
        match self.kind {
            LimitKind::Max => value <= self.threshold,
            LimitKind::Min => value >= self.threshold,
        }
    }
}

/// Environmental requirements of one activity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "ConstraintRecord", into = "ConstraintRecord")]
pub struct ConstraintSpec {
    pub tide_window: TideWindow,
    pub daylight_required: bool,
    pub weather_limits: Vec<WeatherLimit>,
}

impl ConstraintSpec {
    pub fn unconstrained() -> Self {
        Self::default()
    }

    pub fn tide(tide_window: TideWindow) -> Self {
        Self {
            tide_window,
            ..Self::default()
        }
    }

    pub fn daylight() -> Self {
        Self {
            daylight_required: true,
            ..Self::default()
        }
    }

    pub fn with_daylight(mut self) -> Self {
        self.daylight_required = true;
        self
    }

    pub fn with_limit(mut self, limit: WeatherLimit) -> Self {
        self.weather_limits.push(limit);
        self
    }

    pub fn has_window_requirement(&self) -> bool {
        self.tide_window.is_required() || self.daylight_required
    }

    pub fn has_weather_limits(&self) -> bool {
        !self.weather_limits.is_empty()
    }

    pub fn is_unconstrained(&self) -> bool {
        !self.has_window_requirement() && !self.has_weather_limits()
    }
}

impl fmt::Display for ConstraintSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.tide_window.is_required() {
            parts.push(format!("tide={}", self.tide_window.as_str()));
        }
        if self.daylight_required {
            parts.push("daylight".to_string());
        }
        for limit in &self.weather_limits {
            parts.push(format!("{}={}", limit.key(), limit.threshold));
        }
        write!(f, "{}", parts.join("; "))
    }
}

/// Flat key/value form used by constraint records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConstraintRecord {
    #[serde(default)]
    tide_window_required: TideWindow,
    #[serde(default)]
    daylight_required: bool,
    #[serde(flatten)]
    thresholds: BTreeMap<String, f64>,
}

impl TryFrom<ConstraintRecord> for ConstraintSpec {
    type Error = String;

    fn try_from(record: ConstraintRecord) -> Result<Self, Self::Error> {
        let weather_limits = record
            .thresholds
            .iter()
            .map(|(key, threshold)| WeatherLimit::from_key(key, *threshold))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            tide_window: record.tide_window_required,
            daylight_required: record.daylight_required,
            weather_limits,
        })
    }
}

impl From<ConstraintSpec> for ConstraintRecord {
    fn from(spec: ConstraintSpec) -> Self {
        Self {
            tide_window_required: spec.tide_window,
            daylight_required: spec.daylight_required,
            thresholds: spec
                .weather_limits
                .iter()
                .map(|limit| (limit.key(), limit.threshold))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_recognized_keys() {
        let spec: ConstraintSpec = serde_json::from_str(
            r#"{"tide_window_required": "high-water-slack-only", "daylight_required": true,
                "max_wind_speed": 12.5, "min_tidal_level": 1.2}"#,
        )
        .unwrap();
        assert_eq!(spec.tide_window, TideWindow::HighWaterSlackOnly);
        assert!(spec.daylight_required);
        assert_eq!(spec.weather_limits.len(), 2);
        assert!(spec.weather_limits.contains(&WeatherLimit::max("wind_speed", 12.5)));
        assert!(spec.weather_limits.contains(&WeatherLimit::min("tidal_level", 1.2)));
    }

    #[test]
    fn accepts_short_tide_aliases() {
        let spec: ConstraintSpec =
            serde_json::from_str(r#"{"tide_window_required": "slack"}"#).unwrap();
        assert_eq!(spec.tide_window, TideWindow::AnySlack);
        let spec: ConstraintSpec =
            serde_json::from_str(r#"{"tide_window_required": "slackhw"}"#).unwrap();
        assert_eq!(spec.tide_window, TideWindow::HighWaterSlackOnly);
    }

    #[test]
    fn rejects_unknown_threshold_keys() {
        let parsed = serde_json::from_str::<ConstraintSpec>(r#"{"wind_speed": 10.0}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn limits_admit_values_on_the_right_side() {
        let max = WeatherLimit::max("wave_height", 1.5);
        assert!(max.admits(1.5));
        assert!(!max.admits(1.6));
        let min = WeatherLimit::min("visibility", 2.0);
        assert!(min.admits(2.0));
        assert!(!min.admits(1.9));
    }
}
