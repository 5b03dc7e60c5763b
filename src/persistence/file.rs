use super::{PersistenceError, PersistenceResult};
use crate::activity::{Activity, DurationSpec};
use crate::config::ScheduleConfig;
use crate::constraint::ConstraintSpec;
use crate::export::ScheduleRow;
use crate::schedule::Schedule;
use crate::windows::{EnvironmentalWindows, WindowConfig};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

/// Activity input as stored in a scenario file.
///
/// Constraints come either from the shared table by `constraint_id` or inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub group: String,
    pub duration: DurationSpec,
    #[serde(default)]
    pub predecessors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_id: Option<String>,
    #[serde(default, skip_serializing_if = "ConstraintSpec::is_unconstrained")]
    pub constraints: ConstraintSpec,
}

impl ActivityRecord {
    fn into_activity(
        self,
        table: &BTreeMap<String, ConstraintSpec>,
    ) -> PersistenceResult<Activity> {
        let constraints = match &self.constraint_id {
            Some(key) => table.get(key).cloned().ok_or_else(|| {
                PersistenceError::InvalidData(format!(
                    "activity {} references unknown constraint '{key}'",
                    self.id
                ))
            })?,
            None => self.constraints,
        };
        let mut activity = Activity::with_duration(self.id, self.name, self.duration)
            .after(self.predecessors)
            .constrained(constraints)
            .in_group(self.group)
            .described(self.description);
        activity.constraint_id = self.constraint_id;
        Ok(activity)
    }
}

impl From<&Activity> for ActivityRecord {
    fn from(activity: &Activity) -> Self {
        let inline = if activity.constraint_id.is_some() {
            ConstraintSpec::default()
        } else {
            activity.constraints.clone()
        };
        Self {
            id: activity.id.clone(),
            name: activity.name.clone(),
            description: activity.description.clone(),
            group: activity.group.clone(),
            duration: activity.duration.clone(),
            predecessors: activity.predecessors.clone(),
            constraint_id: activity.constraint_id.clone(),
            constraints: inline,
        }
    }
}

/// Everything needed to rebuild a [`Schedule`]: settings, windows, the
/// constraint table and activity inputs. Computed fields are not stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSnapshot {
    #[serde(default)]
    pub config: ScheduleConfig,
    #[serde(default)]
    pub windows: WindowConfig,
    #[serde(default)]
    pub constraints: BTreeMap<String, ConstraintSpec>,
    pub activities: Vec<ActivityRecord>,
}

impl ScenarioSnapshot {
    pub fn from_schedule(schedule: &Schedule) -> Self {
        let mut constraints = BTreeMap::new();
        for activity in schedule.activities() {
            if let Some(key) = &activity.constraint_id {
                constraints.insert(key.clone(), activity.constraints.clone());
            }
        }
        Self {
            config: schedule.config().clone(),
            windows: schedule.windows().to_config(),
            constraints,
            activities: schedule.activities().iter().map(ActivityRecord::from).collect(),
        }
    }

    pub fn into_schedule(self) -> PersistenceResult<Schedule> {
        if self.activities.is_empty() {
            return Err(PersistenceError::InvalidData(
                "scenario contained no activities".into(),
            ));
        }
        let windows = EnvironmentalWindows::from_config(&self.windows)?;
        let activities = self
            .activities
            .into_iter()
            .map(|record| record.into_activity(&self.constraints))
            .collect::<PersistenceResult<Vec<_>>>()?;
        Ok(Schedule::new(activities, windows, self.config)?)
    }
}

pub fn save_scenario_to_json<P: AsRef<Path>>(
    schedule: &Schedule,
    path: P,
) -> PersistenceResult<()> {
    let snapshot = ScenarioSnapshot::from_schedule(schedule);
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    Ok(())
}

pub fn load_scenario_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Schedule> {
    let file = File::open(path)?;
    let snapshot: ScenarioSnapshot = serde_json::from_reader(file)?;
    snapshot.into_schedule()
}

/// Writes the exported rows (computed fields included) as a JSON array.
pub fn save_schedule_to_json<P: AsRef<Path>>(
    schedule: &Schedule,
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &schedule.export_rows())?;
    Ok(())
}

#[derive(Serialize)]
struct ScheduleCsvRecord {
    id: String,
    name: String,
    description: String,
    group: String,
    start: String,
    end: String,
    duration_hours: String,
    earliest_start: String,
    latest_start: String,
    latest_end: String,
    window_wait_hours: String,
    predecessors: String,
    successors: String,
    constraints: String,
    slack_hours: String,
    float_hours: String,
    is_critical: String,
    constraint_unresolved: bool,
}

impl From<&ScheduleRow> for ScheduleCsvRecord {
    fn from(row: &ScheduleRow) -> Self {
        Self {
            id: row.id.clone(),
            name: row.name.clone(),
            description: row.description.clone(),
            group: row.group.clone(),
            start: format_time(row.start),
            end: format_time(row.end),
            duration_hours: format_option_f64(row.duration_hours),
            earliest_start: format_time(row.earliest_start),
            latest_start: format_time(row.latest_start),
            latest_end: format_time(row.latest_end),
            window_wait_hours: format_option_f64(row.window_wait_hours),
            predecessors: row.predecessors.join(";"),
            successors: row.successors.join(";"),
            constraints: row.constraints.clone(),
            slack_hours: format_option_f64(row.slack_hours),
            float_hours: format_option_f64(row.float_hours),
            is_critical: row.is_critical.map(|c| c.to_string()).unwrap_or_default(),
            constraint_unresolved: row.constraint_unresolved,
        }
    }
}

pub fn save_schedule_to_csv<P: AsRef<Path>>(
    schedule: &Schedule,
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for row in schedule.export_rows() {
        writer.serialize(ScheduleCsvRecord::from(&row))?;
    }
    writer.flush()?;
    Ok(())
}

fn format_time(time: Option<NaiveDateTime>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn format_option_f64(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
