use crate::activity::Activity;
use crate::activity_validation;
use crate::error::{ScheduleError, ScheduleResult};
use chrono::NaiveDateTime;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::warn;

pub mod activity_dag;

pub use activity_dag::{ActivityDag, EdgeKind};

/// A predecessor id that names no activity in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingReference {
    pub activity: String,
    pub predecessor: String,
}

/// Activities plus their predecessor/successor index maps.
///
/// Adjacency is built once in [`ActivityGraph::build`] and never edited
/// afterwards; only the computed fields of the activities change between runs.
#[derive(Debug, Clone)]
pub struct ActivityGraph {
    activities: Vec<Activity>,
    index: HashMap<String, usize>,
    predecessors: Vec<Vec<usize>>,
    successors: Vec<Vec<usize>>,
    references: Vec<Option<usize>>,
    order: Vec<usize>,
    missing: Vec<MissingReference>,
}

impl ActivityGraph {
    pub fn build(activities: Vec<Activity>) -> ScheduleResult<Self> {
        activity_validation::validate_activity_collection(&activities)?;

        let index: HashMap<String, usize> = activities
            .iter()
            .enumerate()
            .map(|(idx, activity)| (activity.id.clone(), idx))
            .collect();

        let count = activities.len();
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); count];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); count];
        let mut references: Vec<Option<usize>> = vec![None; count];
        let mut missing = Vec::new();

        for (idx, activity) in activities.iter().enumerate() {
            for pred_id in activity.predecessors.iter().map(|p| p.trim()) {
                if pred_id.is_empty() {
                    continue;
                }
                match index.get(pred_id) {
                    Some(&pred) => {
                        if !predecessors[idx].contains(&pred) {
                            predecessors[idx].push(pred);
                            successors[pred].push(idx);
                        }
                    }
                    None => {
                        warn!(
                            activity = %activity.id,
                            predecessor = pred_id,
                            "predecessor not found in graph; ignoring"
                        );
                        missing.push(MissingReference {
                            activity: activity.id.clone(),
                            predecessor: pred_id.to_string(),
                        });
                    }
                }
            }

            if let Some(reference) = activity.duration.reference() {
                let target = index.get(reference.trim()).copied().ok_or_else(|| {
                    ScheduleError::UnknownDurationReference {
                        id: activity.id.clone(),
                        reference: reference.to_string(),
                    }
                })?;
                references[idx] = Some(target);
            }
        }

        let dag = ActivityDag::build(&predecessors, &references);
        let order = dag
            .topological_order()
            .map_err(|idx| ScheduleError::Cycle(activities[idx].id.clone()))?;

        Ok(Self {
            activities,
            index,
            predecessors,
            successors,
            references,
            order,
            missing,
        })
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn activity(&self, idx: usize) -> &Activity {
        &self.activities[idx]
    }

    pub(crate) fn activity_mut(&mut self, idx: usize) -> &mut Activity {
        &mut self.activities[idx]
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&Activity> {
        self.index_of(id).map(|idx| &self.activities[idx])
    }

    /// Looks an activity up by id, then by name.
    pub fn find(&self, id_or_name: &str) -> Option<usize> {
        self.index_of(id_or_name).or_else(|| {
            self.activities
                .iter()
                .position(|activity| activity.name == id_or_name)
        })
    }

    pub fn predecessors_of(&self, idx: usize) -> &[usize] {
        &self.predecessors[idx]
    }

    pub fn successors_of(&self, idx: usize) -> &[usize] {
        &self.successors[idx]
    }

    pub fn reference_of(&self, idx: usize) -> Option<usize> {
        self.references[idx]
    }

    pub fn predecessor_ids(&self, idx: usize) -> Vec<String> {
        self.ids(&self.predecessors[idx])
    }

    pub fn successor_ids(&self, idx: usize) -> Vec<String> {
        self.ids(&self.successors[idx])
    }

    fn ids(&self, indices: &[usize]) -> Vec<String> {
        indices
            .iter()
            .map(|&idx| self.activities[idx].id.clone())
            .collect()
    }

    /// Dependency order over precedence and duration-reference edges.
    pub fn topological_order(&self) -> &[usize] {
        &self.order
    }

    pub fn missing_references(&self) -> &[MissingReference] {
        &self.missing
    }

    /// Transitive predecessors of `idx` (excluding `idx`).
    pub fn ancestors(&self, idx: usize) -> HashSet<usize> {
        Self::reachable(idx, &self.predecessors)
    }

    /// Transitive successors of `idx` (excluding `idx`).
    pub fn descendants(&self, idx: usize) -> HashSet<usize> {
        Self::reachable(idx, &self.successors)
    }

    /// Everything `idx` waits on: transitive predecessors plus the activities
    /// whose starts fix a derived duration along the way.
    pub fn upstream(&self, idx: usize) -> HashSet<usize> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([idx]);
        while let Some(current) = queue.pop_front() {
            let deps = self.predecessors[current]
                .iter()
                .copied()
                .chain(self.references[current]);
            for next in deps {
                if next != idx && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    fn reachable(from: usize, adjacency: &[Vec<usize>]) -> HashSet<usize> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            for &next in &adjacency[current] {
                if next != from && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    pub fn reset_computed(&mut self) {
        for activity in &mut self.activities {
            activity.reset_computed();
        }
    }

    pub fn project_start(&self) -> Option<NaiveDateTime> {
        self.activities.iter().filter_map(|a| a.start).min()
    }

    pub fn project_end(&self) -> Option<NaiveDateTime> {
        self.activities.iter().filter_map(|a| a.end).max()
    }

    pub fn all_scheduled(&self) -> bool {
        self.activities.iter().all(Activity::is_scheduled)
    }
}
