//! The tracking and aggregation core.
//! The basic idea is:
//!  - [tasks::TaskStore] and [activities::ActivityStore] own the two entity
//!    tables, persisted as JSON-lines files in the data directory.
//!  - [recorder::ActivityRecorder] performs the state-machine writes: start
//!    a stopwatch, stop it, log a finished entry.
//!  - [aggregate::AggregationEngine] answers the read queries: days with
//!    activity, day detail, per-task totals.
//!
//! The activity store is the single source of truth; at most one activity
//! system-wide is ever running.

pub mod activities;
pub mod aggregate;
pub mod color;
pub mod entities;
pub mod error;
pub mod recorder;
mod table;
pub mod tasks;

use std::{path::Path, sync::Arc};

use activities::ActivityStore;
use aggregate::AggregationEngine;
use recorder::ActivityRecorder;
use tasks::TaskStore;

use crate::utils::clock::Clock;

use self::error::EngineResult;

/// Everything a caller needs, wired over one data directory and one clock.
pub struct Engine {
    pub tasks: Arc<TaskStore>,
    pub activities: Arc<ActivityStore>,
    pub recorder: ActivityRecorder,
    pub aggregate: AggregationEngine,
}

impl Engine {
    pub async fn open(data_dir: &Path, clock: Arc<dyn Clock>) -> EngineResult<Engine> {
        let tasks = Arc::new(TaskStore::open(data_dir, clock.clone()).await?);
        let activities = Arc::new(ActivityStore::open(data_dir).await?);
        let recorder = ActivityRecorder::new(tasks.clone(), activities.clone(), clock.clone());
        let aggregate = AggregationEngine::new(tasks.clone(), activities.clone(), clock);
        Ok(Engine {
            tasks,
            activities,
            recorder,
            aggregate,
        })
    }
}

#[cfg(test)]
mod engine_tests {
    use std::sync::Arc;

    use anyhow::Result;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::utils::{clock::ManualClock, logging::TEST_LOGGING};

    use super::{error::EngineError, recorder::TimeShape, Engine};

    #[tokio::test]
    async fn test_stopwatch_round_trip_shows_up_in_stats() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let clock = Arc::new(ManualClock::starting_at(
            Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap(),
        ));
        let engine = Engine::open(dir.path(), clock.clone()).await?;

        let task = engine.tasks.create("Writing").await?;
        let started = engine.recorder.start_stopwatch(task.id).await?;
        clock.advance(Duration::minutes(25));
        let stopped = engine.recorder.stop(started.id).await?;
        assert_eq!(stopped.duration_minutes, 25);

        let stats = engine.aggregate.stats_by_task(None, None).await?;
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].task_name, "Writing");
        assert!((stats[0].total_hours - 25.0 / 60.0).abs() < 1e-4);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_starts_leave_one_running() -> Result<()> {
        let dir = tempdir()?;
        let clock = Arc::new(ManualClock::starting_at(
            Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap(),
        ));
        let engine = Arc::new(Engine::open(dir.path(), clock).await?);
        let task = engine.tasks.create("Writing").await?;

        let racers: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                let task_id = task.id;
                tokio::spawn(async move { engine.recorder.start_stopwatch(task_id).await })
            })
            .collect();

        let mut started = 0;
        let mut conflicts = 0;
        for racer in racers {
            match racer.await? {
                Ok(_) => started += 1,
                Err(EngineError::Conflict(_)) => conflicts += 1,
                Err(other) => return Err(other.into()),
            }
        }

        assert_eq!(started, 1);
        assert_eq!(conflicts, 7);
        assert!(engine.activities.get_running().await.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_state_survives_reopen() -> Result<()> {
        let dir = tempdir()?;
        let clock = Arc::new(ManualClock::starting_at(
            Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap(),
        ));

        {
            let engine = Engine::open(dir.path(), clock.clone()).await?;
            let task = engine.tasks.create("Writing").await?;
            engine
                .recorder
                .log_manual(task.id, TimeShape::DurationOnly { minutes: 45 }, None)
                .await?;
            engine.recorder.start_stopwatch(task.id).await?;
        }

        let engine = Engine::open(dir.path(), clock).await?;
        assert_eq!(engine.tasks.list().await.len(), 1);
        assert!(engine.activities.get_running().await.is_some());

        let detail = engine
            .aggregate
            .day_detail(chrono::NaiveDate::from_ymd_opt(2024, 3, 10).unwrap())
            .await?;
        assert_eq!(detail.len(), 2);
        Ok(())
    }
}
