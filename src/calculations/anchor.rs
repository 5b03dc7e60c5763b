use super::alignment::{WindowAligner, truncate_to_minute};
use super::backward_pass::BackwardPass;
use super::forward_pass::{ForwardPass, earliest_bound};
use super::{note_unavailable_metrics, resolve_alignment};
use crate::config::ScheduleConfig;
use crate::error::{ScheduleError, ScheduleResult};
use crate::graph::ActivityGraph;
use crate::schedule::ScheduleWarning;
use crate::windows::WindowProvider;
use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Progress of an anchored run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorState {
    Reset,
    AnchorSet,
    BackwardChain,
    ForwardChain,
    Residual,
    Done,
}

/// Schedules around one activity pinned to a fixed start.
///
/// Ancestors of the anchor are placed as late as their constraints allow
/// before their successors. Descendants are placed forward from the anchor
/// and everything else forward from the start of the anchored span. A
/// derived-duration ancestor bounds the start of its reference and is then
/// filled in forward. A run that still breaks precedence is rejected, and the
/// closing backward pass keeps the anchor pinned.
pub struct AnchorPass<'a> {
    provider: &'a dyn WindowProvider,
    config: &'a ScheduleConfig,
    state: AnchorState,
    order: Vec<usize>,
    warnings: Vec<ScheduleWarning>,
}

impl<'a> AnchorPass<'a> {
    pub fn new(provider: &'a dyn WindowProvider, config: &'a ScheduleConfig) -> Self {
        Self {
            provider,
            config,
            state: AnchorState::Reset,
            order: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn state(&self) -> AnchorState {
        self.state
    }

    pub fn warnings(&self) -> &[ScheduleWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<ScheduleWarning> {
        self.warnings
    }

    fn transition(&mut self, next: AnchorState) {
        debug!(from = ?self.state, to = ?next, "anchor pass transition");
        self.state = next;
    }

    /// Runs the whole pass and returns the anchor's index.
    ///
    /// `anchor` is matched against ids first, then names.
    pub fn execute(
        &mut self,
        graph: &mut ActivityGraph,
        anchor: &str,
        at: NaiveDateTime,
    ) -> ScheduleResult<usize> {
        graph.reset_computed();
        self.order.clear();
        self.warnings.clear();
        self.state = AnchorState::Reset;

        let target = self.pin_anchor(graph, anchor, at)?;
        self.transition(AnchorState::AnchorSet);

        self.transition(AnchorState::BackwardChain);
        self.schedule_backward_chain(graph, target)?;

        self.transition(AnchorState::ForwardChain);
        let root_start = graph.project_start().unwrap_or(at);
        let mut forward = ForwardPass::new(self.provider, self.config);
        let descendants = graph.descendants(target);
        let chain: Vec<usize> = graph
            .topological_order()
            .iter()
            .copied()
            .filter(|idx| descendants.contains(idx))
            .collect();
        for idx in chain {
            forward.compute(graph, idx, root_start)?;
        }

        self.transition(AnchorState::Residual);
        forward.execute(graph, root_start)?;
        let (forward_order, forward_warnings) = forward.into_parts();
        self.order.extend(forward_order);
        self.warnings.extend(forward_warnings);

        for idx in 0..graph.len() {
            if graph.activity(idx).earliest_start.is_none() {
                let own_start = graph.activity(idx).start.unwrap_or(root_start);
                let bound = earliest_bound(graph, idx, own_start);
                graph.activity_mut(idx).earliest_start = Some(bound);
            }
        }

        check_precedence(graph)?;
        let order = graph.topological_order().to_vec();
        BackwardPass::with_pinned([target]).execute(graph, &order)?;
        self.transition(AnchorState::Done);
        Ok(target)
    }

    /// Activities placed by this pass: backward chain first, then forward.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    fn pin_anchor(
        &mut self,
        graph: &mut ActivityGraph,
        anchor: &str,
        at: NaiveDateTime,
    ) -> ScheduleResult<usize> {
        let target = graph
            .find(anchor)
            .ok_or_else(|| ScheduleError::AnchorNotFound(anchor.to_string()))?;
        let activity = graph.activity_mut(target);
        let span = match activity.span() {
            Some(span) if !activity.has_derived_duration() => span,
            _ => return Err(ScheduleError::AnchorDerivedDuration(activity.id.clone())),
        };

        let start = truncate_to_minute(at);
        activity.start = Some(start);
        activity.end = Some(start + span);
        activity.earliest_start = Some(start);
        activity.scheduled_duration = Some(span);
        debug!(activity = %activity.id, start = %start, "pinned anchor");
        self.order.push(target);
        Ok(target)
    }

    fn schedule_backward_chain(
        &mut self,
        graph: &mut ActivityGraph,
        target: usize,
    ) -> ScheduleResult<()> {
        let aligner = WindowAligner::new(self.provider, self.config);
        let upstream: HashSet<usize> = graph.upstream(target);
        let chain: Vec<usize> = graph
            .topological_order()
            .iter()
            .rev()
            .copied()
            .filter(|idx| upstream.contains(idx))
            .collect();
        // Latest start allowed for activities that end a derived duration.
        let mut reference_bounds: HashMap<usize, NaiveDateTime> = HashMap::new();

        for idx in chain {
            let activity = graph.activity(idx);
            let successor_bound = graph
                .successors_of(idx)
                .iter()
                .filter_map(|&succ| graph.activity(succ).start)
                .min();

            // A derived end is its reference's start: bound that start here and
            // leave the derived activity to the residual pass.
            if activity.has_derived_duration() {
                if let (Some(bound), Some(reference)) = (successor_bound, graph.reference_of(idx)) {
                    reference_bounds
                        .entry(reference)
                        .and_modify(|latest| *latest = (*latest).min(bound))
                        .or_insert(bound);
                }
                continue;
            }
            let Some(span) = activity.span() else {
                continue;
            };
            let reference_bound = reference_bounds.get(&idx).map(|&latest| latest + span);
            let Some(bound) = successor_bound.into_iter().chain(reference_bound).min() else {
                continue;
            };

            note_unavailable_metrics(&aligner, activity, &mut self.warnings);
            let alignment =
                aligner.find_latest_feasible_start(&activity.constraints, span, bound);
            let activity = graph.activity_mut(idx);
            let start = truncate_to_minute(resolve_alignment(
                activity,
                alignment,
                bound - span,
                self.config.best_effort,
                &mut self.warnings,
            )?);
            activity.start = Some(start);
            activity.end = Some(start + span);
            activity.scheduled_duration = Some(span);
            debug!(
                activity = %activity.id,
                bound = %bound,
                start = %start,
                "placed predecessor before anchor"
            );
            self.order.push(idx);
        }
        Ok(())
    }
}

/// Every predecessor must end before its successor starts once the anchored
/// run is complete.
fn check_precedence(graph: &ActivityGraph) -> ScheduleResult<()> {
    for idx in 0..graph.len() {
        let activity = graph.activity(idx);
        let Some(start) = activity.start else {
            continue;
        };
        for &pred in graph.predecessors_of(idx) {
            let predecessor = graph.activity(pred);
            if let Some(end) = predecessor.end.filter(|&end| end > start) {
                return Err(ScheduleError::AnchorPrecedenceViolated {
                    predecessor: predecessor.id.clone(),
                    successor: activity.id.clone(),
                    end,
                    start,
                });
            }
        }
    }
    Ok(())
}
