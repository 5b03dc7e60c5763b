use crate::error::{ScheduleError, ScheduleResult};
use crate::graph::ActivityGraph;
use chrono::{Duration, NaiveDateTime};
use std::collections::HashSet;
use tracing::debug;

/// Latest-time pass: latest start/end, slack, float and criticality.
///
/// Derived-duration activities and pinned activities keep their latest end at
/// their scheduled end, so they come out with zero float.
#[derive(Debug, Default)]
pub struct BackwardPass {
    pinned: HashSet<usize>,
}

impl BackwardPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pinned<I>(pinned: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        Self {
            pinned: pinned.into_iter().collect(),
        }
    }

    /// `order` must list every activity with predecessors before successors;
    /// it is walked in reverse. Returns the project end.
    pub fn execute(
        &self,
        graph: &mut ActivityGraph,
        order: &[usize],
    ) -> ScheduleResult<NaiveDateTime> {
        if let Some(unscheduled) = graph.activities().iter().find(|a| !a.is_scheduled()) {
            return Err(ScheduleError::NotScheduled(unscheduled.id.clone()));
        }
        let Some(project_end) = graph.project_end() else {
            return Err(ScheduleError::NotScheduled("<empty schedule>".to_string()));
        };

        for &idx in order.iter().rev() {
            let activity = graph.activity(idx);
            let (Some(start), Some(end)) = (activity.start, activity.end) else {
                return Err(ScheduleError::NotScheduled(activity.id.clone()));
            };
            let rigid = activity.has_derived_duration() || self.pinned.contains(&idx);

            let latest_end = if rigid {
                end
            } else {
                graph
                    .successors_of(idx)
                    .iter()
                    .filter_map(|&succ| graph.activity(succ).latest_start)
                    .fold(project_end, NaiveDateTime::min)
            };
            let duration = end - start;
            let latest_start = latest_end - duration;
            let slack = latest_start - start;

            let activity = graph.activity_mut(idx);
            activity.latest_end = Some(latest_end);
            activity.latest_start = Some(latest_start);
            activity.slack = Some(slack);
            activity.total_float = Some(if rigid {
                Duration::zero()
            } else {
                latest_end - start - duration
            });
            activity.is_critical = Some(slack == Duration::zero());
            debug!(
                activity = %activity.id,
                latest_start = %latest_start,
                latest_end = %latest_end,
                slack_minutes = slack.num_minutes(),
                "computed latest times"
            );
        }

        Ok(project_end)
    }
}
