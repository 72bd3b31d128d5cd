use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::info;

use super::{
    entities::ActivityEntity,
    error::{EngineError, EngineResult},
    table::TableFile,
};

/// Fields of an activity before the store has assigned it an id.
#[derive(Debug, Clone)]
pub struct ActivityDraft {
    pub task_id: u64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: u32,
    pub logged_at: DateTime<Utc>,
    pub no_time_assigned: bool,
}

impl ActivityDraft {
    fn into_entity(self, id: u64) -> ActivityEntity {
        ActivityEntity {
            id,
            task_id: self.task_id,
            start_time: self.start_time,
            end_time: self.end_time,
            duration_minutes: self.duration_minutes,
            logged_at: self.logged_at,
            no_time_assigned: self.no_time_assigned,
        }
    }

    fn is_running(&self) -> bool {
        self.start_time.is_some() && self.end_time.is_none() && !self.no_time_assigned
    }
}

/// Query filter, matched against each activity's effective date.
#[derive(Debug, Clone, Copy)]
pub enum ActivityFilter {
    Day(NaiveDate),
    /// Inclusive on both ends.
    Range { from: NaiveDate, to: NaiveDate },
}

impl ActivityFilter {
    fn matches(&self, date: NaiveDate) -> bool {
        match *self {
            ActivityFilter::Day(day) => date == day,
            ActivityFilter::Range { from, to } => from <= date && date <= to,
        }
    }
}

/// Owns the activity table and the single-running-activity rule. All
/// mutations go through the write half of one lock, which makes the
/// check-and-insert for a second stopwatch atomic with respect to
/// concurrent writers.
pub struct ActivityStore {
    file: TableFile,
    activities: RwLock<Vec<ActivityEntity>>,
}

impl ActivityStore {
    pub async fn open(dir: &Path) -> EngineResult<Self> {
        let file = TableFile::new(dir, "activities.jsonl")?;
        let activities = file.load().await?;
        Ok(Self {
            file,
            activities: RwLock::new(activities),
        })
    }

    /// Assigns an id and persists the draft. A draft that would become a
    /// second running activity is rejected inside the same critical section
    /// that observed the first one.
    pub async fn insert(&self, draft: ActivityDraft) -> EngineResult<ActivityEntity> {
        let mut activities = self.activities.write().await;
        if draft.is_running() && activities.iter().any(|a| a.is_running()) {
            return Err(EngineError::conflict(
                "A task is already running. Stop it first.",
            ));
        }
        let id = activities.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        let activity = draft.into_entity(id);
        self.file.append(&activity).await?;
        activities.push(activity.clone());
        info!("Inserted activity {} for task {}", activity.id, activity.task_id);
        Ok(activity)
    }

    /// The live stopwatch, if one exists.
    pub async fn get_running(&self) -> Option<ActivityEntity> {
        self.activities
            .read()
            .await
            .iter()
            .find(|a| a.is_running())
            .cloned()
    }

    pub async fn get(&self, id: u64) -> EngineResult<ActivityEntity> {
        self.activities
            .read()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("Activity {id} not found")))
    }

    /// Applies a mutation to one activity and persists the result. The
    /// mutation can refuse the record (for example "not running"), in which
    /// case neither memory nor disk change.
    pub async fn update<F>(&self, id: u64, apply: F) -> EngineResult<ActivityEntity>
    where
        F: FnOnce(&mut ActivityEntity) -> EngineResult<()>,
    {
        let mut activities = self.activities.write().await;
        let Some(position) = activities.iter().position(|a| a.id == id) else {
            return Err(EngineError::not_found(format!("Activity {id} not found")));
        };
        let mut updated = activities.clone();
        apply(&mut updated[position])?;
        self.file.rewrite(&updated).await?;
        let activity = updated[position].clone();
        *activities = updated;
        Ok(activity)
    }

    /// Removes an activity regardless of its state, running included.
    pub async fn delete(&self, id: u64) -> EngineResult<()> {
        let mut activities = self.activities.write().await;
        let Some(position) = activities.iter().position(|a| a.id == id) else {
            return Err(EngineError::not_found(format!("Activity {id} not found")));
        };
        let mut remaining = activities.clone();
        remaining.remove(position);
        self.file.rewrite(&remaining).await?;
        *activities = remaining;
        info!("Deleted activity {id}");
        Ok(())
    }

    /// Activities matching the filter, most recently logged first.
    pub async fn query(&self, filter: ActivityFilter) -> EngineResult<Vec<ActivityEntity>> {
        if let ActivityFilter::Range { from, to } = filter {
            if from > to {
                return Err(EngineError::validation(format!(
                    "Malformed date range: {from} is after {to}"
                )));
            }
        }
        let mut matching: Vec<_> = self
            .activities
            .read()
            .await
            .iter()
            .filter(|a| filter.matches(a.effective_date()))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.logged_at.cmp(&a.logged_at));
        Ok(matching)
    }
}
