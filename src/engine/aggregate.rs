use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use chrono::{Duration, NaiveDate};

use crate::utils::{clock::Clock, time::month_bounds};

use super::{
    activities::{ActivityFilter, ActivityStore},
    entities::{ActivityEntity, TaskEntity},
    error::{EngineError, EngineResult},
    tasks::TaskStore,
};

/// Shown in place of a task that was deleted while its activities stayed
/// behind.
pub const DELETED_TASK_NAME: &str = "(deleted task)";
pub const DELETED_TASK_COLOR: &str = "#9e9e9e";

/// Stats default to the last month when the caller gives no range.
const DEFAULT_STATS_WINDOW_DAYS: i64 = 30;

/// An activity together with the owning task's current name and color. The
/// task reference is weak, so both fall back to a placeholder when the task
/// is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityDetail {
    pub activity: ActivityEntity,
    pub task_name: String,
    pub task_color: String,
}

/// Summed time for one task over a queried range.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskStats {
    pub task_id: u64,
    pub task_name: String,
    pub task_color: String,
    pub total_minutes: u64,
    /// Fractional hours, deliberately unrounded.
    pub total_hours: f64,
}

/// Read queries derived from the activity table: which calendar days have
/// entries, what happened on a day, and how the total splits across tasks.
pub struct AggregationEngine {
    tasks: Arc<TaskStore>,
    activities: Arc<ActivityStore>,
    clock: Arc<dyn Clock>,
}

impl AggregationEngine {
    pub fn new(tasks: Arc<TaskStore>, activities: Arc<ActivityStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            tasks,
            activities,
            clock,
        }
    }

    /// Distinct effective dates with at least one activity in the month.
    pub async fn days_with_activity(
        &self,
        year: i32,
        month: u32,
    ) -> EngineResult<BTreeSet<NaiveDate>> {
        let Some((from, to)) = month_bounds(year, month) else {
            return Err(EngineError::validation(format!(
                "{year}-{month} is not a valid month"
            )));
        };
        let activities = self.activities.query(ActivityFilter::Range { from, to }).await?;
        Ok(activities.iter().map(|a| a.effective_date()).collect())
    }

    /// Every activity on a day, enriched with task name and color, most
    /// recently logged first.
    pub async fn day_detail(&self, date: NaiveDate) -> EngineResult<Vec<ActivityDetail>> {
        let activities = self.activities.query(ActivityFilter::Day(date)).await?;
        let tasks = self.task_index().await;
        Ok(activities
            .into_iter()
            .map(|activity| enrich(activity, &tasks))
            .collect())
    }

    /// Enriched listing over an inclusive date range.
    pub async fn range_detail(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<Vec<ActivityDetail>> {
        let activities = self.activities.query(ActivityFilter::Range { from, to }).await?;
        let tasks = self.task_index().await;
        Ok(activities
            .into_iter()
            .map(|activity| enrich(activity, &tasks))
            .collect())
    }

    /// The live stopwatch with its task attached, if one exists.
    pub async fn running_detail(&self) -> EngineResult<Option<ActivityDetail>> {
        let Some(running) = self.activities.get_running().await else {
            return Ok(None);
        };
        let tasks = self.task_index().await;
        Ok(Some(enrich(running, &tasks)))
    }

    /// Total logged time per task over an inclusive date range. Omits tasks
    /// with nothing in the range and orders by descending total, ties
    /// broken by task id.
    pub async fn stats_by_task(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> EngineResult<Vec<TaskStats>> {
        let to = to.unwrap_or_else(|| self.clock.time().date_naive());
        let from = from.unwrap_or(to - Duration::days(DEFAULT_STATS_WINDOW_DAYS));

        let activities = self.activities.query(ActivityFilter::Range { from, to }).await?;
        let mut minutes_by_task = HashMap::<u64, u64>::new();
        for activity in &activities {
            *minutes_by_task.entry(activity.task_id).or_default() +=
                activity.duration_minutes as u64;
        }

        let tasks = self.task_index().await;
        let mut stats: Vec<_> = minutes_by_task
            .into_iter()
            .filter(|(_, minutes)| *minutes > 0)
            .map(|(task_id, total_minutes)| {
                let (task_name, task_color) = tasks
                    .get(&task_id)
                    .map(|t| (t.name.clone(), t.color.clone()))
                    .unwrap_or_else(|| {
                        (DELETED_TASK_NAME.to_string(), DELETED_TASK_COLOR.to_string())
                    });
                TaskStats {
                    task_id,
                    task_name,
                    task_color,
                    total_minutes,
                    total_hours: total_minutes as f64 / 60.0,
                }
            })
            .collect();
        stats.sort_by(|a, b| {
            b.total_minutes
                .cmp(&a.total_minutes)
                .then(a.task_id.cmp(&b.task_id))
        });
        Ok(stats)
    }

    async fn task_index(&self) -> HashMap<u64, TaskEntity> {
        self.tasks
            .list()
            .await
            .into_iter()
            .map(|t| (t.id, t))
            .collect()
    }
}

fn enrich(activity: ActivityEntity, tasks: &HashMap<u64, TaskEntity>) -> ActivityDetail {
    let (task_name, task_color) = tasks
        .get(&activity.task_id)
        .map(|t| (t.name.clone(), t.color.clone()))
        .unwrap_or_else(|| (DELETED_TASK_NAME.to_string(), DELETED_TASK_COLOR.to_string()));
    ActivityDetail {
        activity,
        task_name,
        task_color,
    }
}
