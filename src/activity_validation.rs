use crate::activity::{Activity, DurationSpec};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ActivityValidationError {
    message: String,
}

impl ActivityValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub fn validate_activity(activity: &Activity) -> Result<(), ActivityValidationError> {
    if activity.id.trim().is_empty() {
        return Err(ActivityValidationError::new(format!(
            "activity '{}' requires a non-empty id",
            activity.name
        )));
    }

    match &activity.duration {
        DurationSpec::Fixed(hours) => {
            if !hours.is_finite() || *hours <= 0.0 {
                return Err(ActivityValidationError::new(format!(
                    "activity {} has invalid duration {} (must be a positive number of hours)",
                    activity.id, hours
                )));
            }
            match activity.duration.fixed_span() {
                None => {
                    return Err(ActivityValidationError::new(format!(
                        "activity {} duration {}h is too long to schedule",
                        activity.id, hours
                    )));
                }
                Some(span) if span.num_minutes() < 1 => {
                    return Err(ActivityValidationError::new(format!(
                        "activity {} duration {}h is shorter than one minute",
                        activity.id, hours
                    )));
                }
                Some(_) => {}
            }
        }
        DurationSpec::Until(reference) => {
            if reference.trim().is_empty() {
                return Err(ActivityValidationError::new(format!(
                    "activity {} derives its duration from an empty reference",
                    activity.id
                )));
            }
            if *reference == activity.id {
                return Err(ActivityValidationError::new(format!(
                    "activity {} cannot derive its duration from itself",
                    activity.id
                )));
            }
        }
    }

    for limit in &activity.constraints.weather_limits {
        if !limit.threshold.is_finite() {
            return Err(ActivityValidationError::new(format!(
                "activity {} has non-finite threshold for '{}'",
                activity.id,
                limit.key()
            )));
        }
        if limit.metric.trim().is_empty() {
            return Err(ActivityValidationError::new(format!(
                "activity {} has a weather limit without a metric",
                activity.id
            )));
        }
    }

    Ok(())
}

pub fn validate_activity_collection(activities: &[Activity]) -> Result<(), ActivityValidationError> {
    let mut seen_ids = HashSet::with_capacity(activities.len());
    for activity in activities {
        if !seen_ids.insert(activity.id.as_str()) {
            return Err(ActivityValidationError::new(format!(
                "duplicate activity id {}",
                activity.id
            )));
        }
        validate_activity(activity)?;
    }
    Ok(())
}
