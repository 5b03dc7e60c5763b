use crate::activity::{Activity, hours_of};
use crate::calculations::{AnchorPass, BackwardPass, ForwardPass};
use crate::config::ScheduleConfig;
use crate::error::{ScheduleError, ScheduleResult};
use crate::export::{self, ScheduleRow};
use crate::graph::ActivityGraph;
use crate::windows::EnvironmentalWindows;
use chrono::NaiveDateTime;
use polars::prelude::DataFrame;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Recoverable condition found during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleWarning {
    /// A predecessor id that names no activity; the edge was ignored.
    MissingPredecessor { activity: String, predecessor: String },
    /// No window fit; the activity was placed at `fallback`.
    UnresolvedConstraint {
        activity: String,
        fallback: NaiveDateTime,
    },
    /// The weather series has no column for a limited metric.
    WeatherMetricUnavailable { activity: String, metric: String },
}

impl fmt::Display for ScheduleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleWarning::MissingPredecessor {
                activity,
                predecessor,
            } => write!(
                f,
                "activity {activity}: predecessor '{predecessor}' not found; ignored"
            ),
            ScheduleWarning::UnresolvedConstraint { activity, fallback } => write!(
                f,
                "activity {activity}: constraints unresolved; placed at {fallback}"
            ),
            ScheduleWarning::WeatherMetricUnavailable { activity, metric } => write!(
                f,
                "activity {activity}: weather metric '{metric}' unavailable; limit not checked"
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub activity_count: usize,
    pub critical_count: usize,
    pub critical_path: Vec<String>,
    pub project_start: Option<NaiveDateTime>,
    pub project_end: Option<NaiveDateTime>,
    pub anchor: Option<String>,
    pub unresolved: Vec<String>,
    pub warnings: Vec<ScheduleWarning>,
}

impl ScheduleSummary {
    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("activities={}", self.activity_count));
        parts.push(format!("critical={}", self.critical_count));
        if let Some(anchor) = &self.anchor {
            parts.push(format!("anchor={anchor}"));
        }
        if let Some(start) = self.project_start {
            parts.push(format!("start={}", start.format("%Y-%m-%d %H:%M")));
        }
        if let Some(end) = self.project_end {
            parts.push(format!("finish={}", end.format("%Y-%m-%d %H:%M")));
        }
        if !self.unresolved.is_empty() {
            parts.push(format!("unresolved={}", self.unresolved.join(",")));
        }
        if !self.warnings.is_empty() {
            parts.push(format!("warnings={}", self.warnings.len()));
        }
        if !self.critical_path.is_empty() {
            parts.push(format!("crit_path={}", self.critical_path.join("->")));
        }
        parts.join(", ")
    }
}

/// Result of one anchor time in [`Schedule::sweep_anchor_times`].
#[derive(Debug)]
pub struct AnchorSweepOutcome {
    pub at: NaiveDateTime,
    pub result: ScheduleResult<ScheduleSummary>,
}

/// Start and end in hours relative to a reference activity's start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelativeTiming {
    pub id: String,
    pub start_hours: f64,
    pub end_hours: f64,
}

#[derive(Debug, Clone)]
pub struct Schedule {
    graph: ActivityGraph,
    windows: EnvironmentalWindows,
    config: ScheduleConfig,
    warnings: Vec<ScheduleWarning>,
    forward_order: Vec<usize>,
    anchor: Option<usize>,
}

impl Schedule {
    pub fn new(
        activities: Vec<Activity>,
        windows: EnvironmentalWindows,
        config: ScheduleConfig,
    ) -> ScheduleResult<Self> {
        config.validate()?;
        let graph = ActivityGraph::build(activities)?;
        let mut schedule = Self {
            graph,
            windows,
            config,
            warnings: Vec::new(),
            forward_order: Vec::new(),
            anchor: None,
        };
        schedule.reset();
        Ok(schedule)
    }

    pub fn activities(&self) -> &[Activity] {
        self.graph.activities()
    }

    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.graph.get(id)
    }

    pub fn graph(&self) -> &ActivityGraph {
        &self.graph
    }

    pub fn windows(&self) -> &EnvironmentalWindows {
        &self.windows
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    pub fn warnings(&self) -> &[ScheduleWarning] {
        &self.warnings
    }

    /// Clears computed fields and per-run warnings.
    pub fn reset(&mut self) {
        self.graph.reset_computed();
        self.forward_order.clear();
        self.anchor = None;
        self.warnings = self
            .graph
            .missing_references()
            .iter()
            .map(|missing| ScheduleWarning::MissingPredecessor {
                activity: missing.activity.clone(),
                predecessor: missing.predecessor.clone(),
            })
            .collect();
    }

    pub fn forward_pass(&mut self) -> ScheduleResult<()> {
        self.reset();
        let mut pass = ForwardPass::new(&self.windows, &self.config);
        let outcome = pass.execute(&mut self.graph, self.config.project_start);
        let (order, warnings) = pass.into_parts();
        if let Err(err) = outcome {
            self.reset();
            return Err(err);
        }
        self.forward_order = order;
        self.warnings.extend(warnings);
        Ok(())
    }

    /// Requires a completed forward pass.
    pub fn backward_pass(&mut self) -> ScheduleResult<NaiveDateTime> {
        BackwardPass::new()
            .execute(&mut self.graph, &self.forward_order)
            .inspect_err(|_| self.reset())
    }

    /// Forward then backward pass from the configured project start.
    pub fn refresh(&mut self) -> ScheduleResult<ScheduleSummary> {
        self.forward_pass()?;
        self.backward_pass()?;
        let summary = self.summary();
        info!(
            activities = summary.activity_count,
            critical = summary.critical_count,
            warnings = summary.warnings.len(),
            "schedule refreshed"
        );
        Ok(summary)
    }

    /// Pins `anchor` (id or name) to start at `at` and schedules around it.
    pub fn schedule_around(
        &mut self,
        anchor: &str,
        at: NaiveDateTime,
    ) -> ScheduleResult<ScheduleSummary> {
        self.reset();
        let mut pass = AnchorPass::new(&self.windows, &self.config);
        let outcome = pass.execute(&mut self.graph, anchor, at);
        let order = pass.order().to_vec();
        let warnings = pass.into_warnings();
        match outcome {
            Ok(target) => {
                self.forward_order = order;
                self.warnings.extend(warnings);
                self.anchor = Some(target);
                let summary = self.summary();
                info!(
                    anchor = %self.graph.activity(target).id,
                    at = %at,
                    critical = summary.critical_count,
                    "schedule built around anchor"
                );
                Ok(summary)
            }
            Err(err) => {
                self.reset();
                Err(err)
            }
        }
    }

    /// Runs [`Schedule::schedule_around`] for each time on independent copies.
    pub fn sweep_anchor_times(
        &self,
        anchor: &str,
        times: &[NaiveDateTime],
    ) -> Vec<AnchorSweepOutcome> {
        times
            .par_iter()
            .map(|&at| {
                let mut copy = self.clone();
                AnchorSweepOutcome {
                    at,
                    result: copy.schedule_around(anchor, at),
                }
            })
            .collect()
    }

    pub fn summary(&self) -> ScheduleSummary {
        let activities = self.graph.activities();
        ScheduleSummary {
            activity_count: activities.len(),
            critical_count: activities
                .iter()
                .filter(|a| a.is_critical == Some(true))
                .count(),
            critical_path: self
                .critical_path()
                .into_iter()
                .map(|a| a.id.clone())
                .collect(),
            project_start: self.graph.project_start(),
            project_end: self.graph.project_end(),
            anchor: self.anchor.map(|idx| self.graph.activity(idx).id.clone()),
            unresolved: activities
                .iter()
                .filter(|a| a.constraint_unresolved)
                .map(|a| a.id.clone())
                .collect(),
            warnings: self.warnings.clone(),
        }
    }

    /// Critical activities ordered by start, then id.
    pub fn critical_path(&self) -> Vec<&Activity> {
        let mut critical: Vec<&Activity> = self
            .graph
            .activities()
            .iter()
            .filter(|a| a.is_critical == Some(true))
            .collect();
        critical.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        critical
    }

    /// Start/end of every scheduled activity in hours from `zero_activity`'s start.
    pub fn relative_hours(&self, zero_activity: &str) -> ScheduleResult<Vec<RelativeTiming>> {
        let idx = self
            .graph
            .find(zero_activity)
            .ok_or_else(|| ScheduleError::AnchorNotFound(zero_activity.to_string()))?;
        let reference = self.graph.activity(idx);
        let zero = reference
            .start
            .ok_or_else(|| ScheduleError::NotScheduled(reference.id.clone()))?;

        Ok(self
            .graph
            .activities()
            .iter()
            .filter_map(|activity| {
                let (start, end) = (activity.start?, activity.end?);
                Some(RelativeTiming {
                    id: activity.id.clone(),
                    start_hours: hours_of(start - zero),
                    end_hours: hours_of(end - zero),
                })
            })
            .collect())
    }

    pub fn export_rows(&self) -> Vec<ScheduleRow> {
        export::schedule_rows(&self.graph)
    }

    pub fn to_dataframe(&self) -> ScheduleResult<DataFrame> {
        Ok(export::rows_to_dataframe(&self.export_rows())?)
    }
}
