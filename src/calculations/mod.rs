pub mod alignment;
pub mod anchor;
pub mod backward_pass;
pub mod forward_pass;

pub use alignment::{Alignment, WindowAligner, truncate_to_minute};
pub use anchor::{AnchorPass, AnchorState};
pub use backward_pass::BackwardPass;
pub use forward_pass::ForwardPass;

use crate::activity::Activity;
use crate::error::{ScheduleError, ScheduleResult};
use crate::schedule::ScheduleWarning;
use chrono::NaiveDateTime;
use tracing::warn;

/// Turns a search result into a start time.
///
/// An unresolved search either fails the run or, in best-effort mode, falls
/// back to `fallback` and flags the activity.
pub(crate) fn resolve_alignment(
    activity: &mut Activity,
    alignment: Alignment,
    fallback: NaiveDateTime,
    best_effort: bool,
    warnings: &mut Vec<ScheduleWarning>,
) -> ScheduleResult<NaiveDateTime> {
    match alignment {
        Alignment::Aligned(start) => Ok(start),
        Alignment::Unresolved if best_effort => {
            warn!(
                activity = %activity.id,
                constraints = %activity.constraints,
                fallback = %fallback,
                "no window satisfies constraints; using best-effort start"
            );
            activity.constraint_unresolved = true;
            warnings.push(ScheduleWarning::UnresolvedConstraint {
                activity: activity.id.clone(),
                fallback,
            });
            Ok(fallback)
        }
        Alignment::Unresolved => Err(ScheduleError::ConstraintUnresolved {
            id: activity.id.clone(),
            bound: fallback,
        }),
    }
}

/// Records metrics an activity limits that the weather series does not carry.
pub(crate) fn note_unavailable_metrics(
    aligner: &WindowAligner<'_>,
    activity: &Activity,
    warnings: &mut Vec<ScheduleWarning>,
) {
    for metric in aligner.unavailable_metrics(&activity.constraints) {
        warn!(
            activity = %activity.id,
            metric = %metric,
            "weather metric not available; limit treated as satisfied"
        );
        warnings.push(ScheduleWarning::WeatherMetricUnavailable {
            activity: activity.id.clone(),
            metric,
        });
    }
}
