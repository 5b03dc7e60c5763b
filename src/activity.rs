use crate::constraint::ConstraintSpec;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How long an activity lasts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DurationField", into = "DurationField")]
pub enum DurationSpec {
    /// Literal duration in hours.
    Fixed(f64),
    /// Ends exactly when the referenced activity starts.
    Until(String),
}

impl DurationSpec {
    pub fn hours(hours: f64) -> Self {
        DurationSpec::Fixed(hours)
    }

    pub fn until(reference: impl Into<String>) -> Self {
        DurationSpec::Until(reference.into())
    }

    pub fn reference(&self) -> Option<&str> {
        match self {
            DurationSpec::Until(reference) => Some(reference.as_str()),
            DurationSpec::Fixed(_) => None,
        }
    }

    /// Fixed durations rounded to whole minutes; `None` for derived durations
    /// and for lengths a `chrono::Duration` cannot hold.
    pub fn fixed_minutes(&self) -> Option<i64> {
        match self {
            DurationSpec::Fixed(hours) => {
                let minutes = (hours * 60.0).round();
                (minutes.abs() <= Duration::MAX.num_minutes() as f64).then_some(minutes as i64)
            }
            DurationSpec::Until(_) => None,
        }
    }

    pub fn fixed_span(&self) -> Option<Duration> {
        self.fixed_minutes().and_then(Duration::try_minutes)
    }
}

impl fmt::Display for DurationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationSpec::Fixed(hours) => write!(f, "{hours}"),
            DurationSpec::Until(reference) => write!(f, "until {reference}"),
        }
    }
}

impl FromStr for DurationSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed
            .get(..5)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("until"))
        {
            let reference = trimmed[5..].trim();
            if reference.is_empty() {
                return Err(format!("duration '{s}' names no activity"));
            }
            return Ok(DurationSpec::Until(reference.to_string()));
        }
        trimmed
            .parse::<f64>()
            .map(DurationSpec::Fixed)
            .map_err(|err| format!("invalid duration '{s}': {err}"))
    }
}

/// Wire form: a number of hours or a string such as `"4.5"` / `"until HW2"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum DurationField {
    Hours(f64),
    Text(String),
}

impl TryFrom<DurationField> for DurationSpec {
    type Error = String;

    fn try_from(field: DurationField) -> Result<Self, Self::Error> {
        match field {
            DurationField::Hours(hours) => Ok(DurationSpec::Fixed(hours)),
            DurationField::Text(text) => text.parse(),
        }
    }
}

impl From<DurationSpec> for DurationField {
    fn from(spec: DurationSpec) -> Self {
        match spec {
            DurationSpec::Fixed(hours) => DurationField::Hours(hours),
            DurationSpec::Until(reference) => DurationField::Text(format!("until {reference}")),
        }
    }
}

/// One schedulable unit of work.
///
/// The input fields are set by the caller; everything below `start` is
/// written by the engine and cleared by [`Activity::reset_computed`].
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub id: String,
    pub name: String,
    pub description: String,
    pub group: String,
    pub duration: DurationSpec,
    pub predecessors: Vec<String>,
    pub constraint_id: Option<String>,
    pub constraints: ConstraintSpec,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    /// Bound from predecessors before window alignment.
    pub earliest_start: Option<NaiveDateTime>,
    pub latest_start: Option<NaiveDateTime>,
    pub latest_end: Option<NaiveDateTime>,
    pub scheduled_duration: Option<Duration>,
    pub slack: Option<Duration>,
    pub total_float: Option<Duration>,
    pub is_critical: Option<bool>,
    /// Set when no window satisfied the constraints and a best-effort start was used.
    pub constraint_unresolved: bool,
}

impl Activity {
    pub fn new(id: impl Into<String>, name: impl Into<String>, duration_hours: f64) -> Self {
        Self::with_duration(id, name, DurationSpec::Fixed(duration_hours))
    }

    pub fn with_duration(
        id: impl Into<String>,
        name: impl Into<String>,
        duration: DurationSpec,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            group: String::new(),
            duration,
            predecessors: Vec::new(),
            constraint_id: None,
            constraints: ConstraintSpec::default(),
            start: None,
            end: None,
            earliest_start: None,
            latest_start: None,
            latest_end: None,
            scheduled_duration: None,
            slack: None,
            total_float: None,
            is_critical: None,
            constraint_unresolved: false,
        }
    }

    pub fn after<I, S>(mut self, predecessors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.predecessors = predecessors.into_iter().map(Into::into).collect();
        self
    }

    pub fn constrained(mut self, constraints: ConstraintSpec) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn has_derived_duration(&self) -> bool {
        matches!(self.duration, DurationSpec::Until(_))
    }

    /// Duration used for scheduling: the derived value once computed, else the fixed one.
    pub fn span(&self) -> Option<Duration> {
        self.scheduled_duration
            .or_else(|| self.duration.fixed_span())
    }

    pub fn duration_hours(&self) -> Option<f64> {
        self.span().map(hours_of)
    }

    pub fn is_scheduled(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    pub fn reset_computed(&mut self) {
        self.start = None;
        self.end = None;
        self.earliest_start = None;
        self.latest_start = None;
        self.latest_end = None;
        self.scheduled_duration = None;
        self.slack = None;
        self.total_float = None;
        self.is_critical = None;
        self.constraint_unresolved = false;
    }
}

pub fn hours_of(duration: Duration) -> f64 {
    duration.num_minutes() as f64 / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_until_references_case_insensitively() {
        assert_eq!(
            "Until HW2".parse::<DurationSpec>().unwrap(),
            DurationSpec::until("HW2")
        );
        assert_eq!("2.5".parse::<DurationSpec>().unwrap(), DurationSpec::hours(2.5));
        assert!("until ".parse::<DurationSpec>().is_err());
        assert!("soon".parse::<DurationSpec>().is_err());
    }

    #[test]
    fn fixed_durations_round_to_whole_minutes() {
        let activity = Activity::new("A", "Lift", 1.0 / 3.0);
        assert_eq!(activity.span(), Some(Duration::minutes(20)));
        assert_eq!(
            Activity::with_duration("B", "Wait", DurationSpec::until("A")).span(),
            None
        );
    }
}
