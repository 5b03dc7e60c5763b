use crate::activity_validation::ActivityValidationError;
use chrono::NaiveDateTime;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Failures that abort a scheduling run.
///
/// Everything except `ConstraintUnresolved` is a configuration problem in the
/// input data; `ConstraintUnresolved` is only raised when best-effort mode is off.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("precedence cycle detected involving activity '{0}'")]
    Cycle(String),

    #[error(
        "activity '{id}' has a non-positive derived duration: it starts at {start} but its reference starts at {end}"
    )]
    NonPositiveDerivedDuration {
        id: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("anchor activity '{0}' not found")]
    AnchorNotFound(String),

    #[error("anchor activity '{0}' has a derived duration and cannot be pinned")]
    AnchorDerivedDuration(String),

    #[error(
        "anchored schedule breaks precedence: '{predecessor}' ends at {end} after '{successor}' starts at {start}"
    )]
    AnchorPrecedenceViolated {
        predecessor: String,
        successor: String,
        end: NaiveDateTime,
        start: NaiveDateTime,
    },

    #[error("activity '{id}' derives its duration from unknown activity '{reference}'")]
    UnknownDurationReference { id: String, reference: String },

    #[error(transparent)]
    InvalidActivity(#[from] ActivityValidationError),

    #[error("invalid window: {0}")]
    InvalidWindow(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "activity '{id}' has no start satisfying its environmental constraints within the search horizon (bound {bound})"
    )]
    ConstraintUnresolved { id: String, bound: NaiveDateTime },

    #[error("activity '{0}' has not been forward scheduled")]
    NotScheduled(String),

    #[error("dataframe conversion error: {0}")]
    DataFrame(#[from] PolarsError),
}

impl ScheduleError {
    /// True for the fatal input-data errors of the taxonomy.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ScheduleError::Cycle(_)
                | ScheduleError::NonPositiveDerivedDuration { .. }
                | ScheduleError::AnchorNotFound(_)
                | ScheduleError::AnchorDerivedDuration(_)
                | ScheduleError::AnchorPrecedenceViolated { .. }
                | ScheduleError::UnknownDurationReference { .. }
                | ScheduleError::InvalidActivity(_)
                | ScheduleError::InvalidWindow(_)
                | ScheduleError::InvalidConfig(_)
        )
    }
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
