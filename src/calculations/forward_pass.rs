use super::alignment::{WindowAligner, truncate_to_minute};
use super::{note_unavailable_metrics, resolve_alignment};
use crate::config::ScheduleConfig;
use crate::error::{ScheduleError, ScheduleResult};
use crate::graph::ActivityGraph;
use crate::schedule::ScheduleWarning;
use crate::windows::WindowProvider;
use chrono::{Duration, NaiveDateTime};
use std::collections::HashSet;
use tracing::debug;

/// Earliest-start propagation.
///
/// Each activity is placed once per run: an activity that already has a start
/// is treated as computed. Dependencies are visited with an explicit stack, so
/// long chains never grow the call stack and a dependency that is still being
/// expanded is reported as a cycle.
pub struct ForwardPass<'a> {
    aligner: WindowAligner<'a>,
    best_effort: bool,
    order: Vec<usize>,
    warnings: Vec<ScheduleWarning>,
}

impl<'a> ForwardPass<'a> {
    pub fn new(provider: &'a dyn WindowProvider, config: &ScheduleConfig) -> Self {
        Self {
            aligner: WindowAligner::new(provider, config),
            best_effort: config.best_effort,
            order: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Place every activity not yet scheduled.
    pub fn execute(
        &mut self,
        graph: &mut ActivityGraph,
        root_start: NaiveDateTime,
    ) -> ScheduleResult<()> {
        for idx in 0..graph.len() {
            self.compute(graph, idx, root_start)?;
        }
        Ok(())
    }

    /// Place `target` after its dependencies. `root_start` bounds activities
    /// without predecessors.
    pub fn compute(
        &mut self,
        graph: &mut ActivityGraph,
        target: usize,
        root_start: NaiveDateTime,
    ) -> ScheduleResult<()> {
        let mut stack = vec![(target, false)];
        let mut in_progress: HashSet<usize> = HashSet::new();

        while let Some((idx, expanded)) = stack.pop() {
            if graph.activity(idx).start.is_some() {
                continue;
            }
            if expanded {
                self.place(graph, idx, root_start)?;
                in_progress.remove(&idx);
                continue;
            }
            if !in_progress.insert(idx) {
                return Err(ScheduleError::Cycle(graph.activity(idx).id.clone()));
            }

            stack.push((idx, true));
            for dep in dependencies(graph, idx) {
                if graph.activity(dep).start.is_some() {
                    continue;
                }
                if in_progress.contains(&dep) {
                    return Err(ScheduleError::Cycle(graph.activity(dep).id.clone()));
                }
                stack.push((dep, false));
            }
        }
        Ok(())
    }

    fn place(
        &mut self,
        graph: &mut ActivityGraph,
        idx: usize,
        root_start: NaiveDateTime,
    ) -> ScheduleResult<()> {
        let bound = earliest_bound(graph, idx, root_start);
        let reference_start = match graph.reference_of(idx) {
            Some(reference) => {
                let referenced = graph.activity(reference);
                Some(
                    referenced
                        .start
                        .ok_or_else(|| ScheduleError::NotScheduled(referenced.id.clone()))?,
                )
            }
            None => None,
        };

        note_unavailable_metrics(&self.aligner, graph.activity(idx), &mut self.warnings);
        let activity = graph.activity_mut(idx);
        let nominal = activity.span().unwrap_or_else(Duration::zero);
        let alignment = self
            .aligner
            .find_feasible_start(&activity.constraints, nominal, bound);
        let start = truncate_to_minute(resolve_alignment(
            activity,
            alignment,
            bound,
            self.best_effort,
            &mut self.warnings,
        )?);

        let end = match reference_start {
            Some(reference_start) => {
                let end = truncate_to_minute(reference_start);
                if end <= start {
                    return Err(ScheduleError::NonPositiveDerivedDuration {
                        id: activity.id.clone(),
                        start,
                        end,
                    });
                }
                end
            }
            None => start + nominal,
        };

        activity.earliest_start = Some(bound);
        activity.start = Some(start);
        activity.end = Some(end);
        activity.scheduled_duration = Some(end - start);
        debug!(
            activity = %activity.id,
            earliest = %bound,
            start = %start,
            end = %end,
            "placed activity"
        );
        self.order.push(idx);
        Ok(())
    }

    /// Activities in the order they were placed.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn warnings(&self) -> &[ScheduleWarning] {
        &self.warnings
    }

    pub fn into_parts(self) -> (Vec<usize>, Vec<ScheduleWarning>) {
        (self.order, self.warnings)
    }
}

/// Latest predecessor end, or `root_start` without predecessors.
pub(crate) fn earliest_bound(
    graph: &ActivityGraph,
    idx: usize,
    root_start: NaiveDateTime,
) -> NaiveDateTime {
    let bound = graph
        .predecessors_of(idx)
        .iter()
        .filter_map(|&pred| graph.activity(pred).end)
        .max()
        .unwrap_or(root_start);
    truncate_to_minute(bound)
}

fn dependencies(graph: &ActivityGraph, idx: usize) -> Vec<usize> {
    let mut deps: Vec<usize> = graph.predecessors_of(idx).to_vec();
    if let Some(reference) = graph.reference_of(idx) {
        if !deps.contains(&reference) {
            deps.push(reference);
        }
    }
    // Reversed so the stack pops them in declaration order.
    deps.reverse();
    deps
}
