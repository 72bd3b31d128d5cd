use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::utils::{clock::Clock, time::elapsed_minutes};

use super::{
    activities::{ActivityDraft, ActivityStore},
    entities::ActivityEntity,
    error::{EngineError, EngineResult},
    tasks::TaskStore,
};

/// How a manual entry specifies its elapsed time. Modeling the two cases as
/// a tagged variant keeps "both absent" and "both present" unrepresentable
/// past the boundary.
#[derive(Debug, Clone, Copy)]
pub enum TimeShape {
    Ranged {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    DurationOnly {
        /// Signed so that out-of-range input reaches validation instead of
        /// being rejected at parse time with a worse message.
        minutes: i64,
    },
}

impl TimeShape {
    /// Reconciles the loose optional fields a caller supplies into one of
    /// the two shapes. A start+end pair wins over a duration; a lone start
    /// or end is not a shape.
    pub fn from_parts(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        minutes: Option<i64>,
    ) -> EngineResult<TimeShape> {
        match (start, end, minutes) {
            (Some(start), Some(end), _) => Ok(TimeShape::Ranged { start, end }),
            (_, _, Some(minutes)) => Ok(TimeShape::DurationOnly { minutes }),
            _ => Err(EngineError::validation(
                "Enter either start+end time or total duration.",
            )),
        }
    }
}

/// State-machine operations over the activity table: start a stopwatch,
/// stop the running one, log a finished entry directly. Every timestamp is
/// read from the clock at the moment it is needed.
pub struct ActivityRecorder {
    tasks: Arc<TaskStore>,
    activities: Arc<ActivityStore>,
    clock: Arc<dyn Clock>,
}

impl ActivityRecorder {
    pub fn new(tasks: Arc<TaskStore>, activities: Arc<ActivityStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            tasks,
            activities,
            clock,
        }
    }

    /// Starts a live stopwatch for a task. The single-running-activity rule
    /// is global, so this conflicts with a stopwatch on any task.
    pub async fn start_stopwatch(&self, task_id: u64) -> EngineResult<ActivityEntity> {
        self.tasks.get(task_id).await?;
        let now = self.clock.time();
        self.activities
            .insert(ActivityDraft {
                task_id,
                start_time: Some(now),
                end_time: None,
                // Provisional until the stopwatch is stopped.
                duration_minutes: 0,
                logged_at: now,
                no_time_assigned: false,
            })
            .await
    }

    /// Closes a running stopwatch, fixing its end time and duration. An
    /// activity that exists but is not running counts as not found, same as
    /// an absent id.
    pub async fn stop(&self, activity_id: u64) -> EngineResult<ActivityEntity> {
        let end = self.clock.time();
        self.activities
            .update(activity_id, |activity| {
                let Some(start) = activity.start_time.filter(|_| activity.is_running()) else {
                    return Err(EngineError::not_found(format!(
                        "Activity {activity_id} is not running"
                    )));
                };
                activity.end_time = Some(end);
                activity.duration_minutes = elapsed_minutes(start, end);
                Ok(())
            })
            .await
    }

    /// Logs an already-finished entry. The record is inserted closed, so
    /// this never interacts with the running-activity rule.
    pub async fn log_manual(
        &self,
        task_id: u64,
        shape: TimeShape,
        logged_at: Option<DateTime<Utc>>,
    ) -> EngineResult<ActivityEntity> {
        self.tasks.get(task_id).await?;
        let draft = match shape {
            TimeShape::Ranged { start, end } => {
                if end <= start {
                    return Err(EngineError::validation("End time must be after start time"));
                }
                ActivityDraft {
                    task_id,
                    start_time: Some(start),
                    end_time: Some(end),
                    duration_minutes: elapsed_minutes(start, end),
                    logged_at: logged_at.unwrap_or(start),
                    no_time_assigned: false,
                }
            }
            TimeShape::DurationOnly { minutes } => {
                if minutes <= 0 {
                    return Err(EngineError::validation("Enter a valid duration in minutes"));
                }
                ActivityDraft {
                    task_id,
                    start_time: None,
                    end_time: None,
                    duration_minutes: minutes as u32,
                    logged_at: logged_at.unwrap_or_else(|| self.clock.time()),
                    no_time_assigned: true,
                }
            }
        };
        self.activities.insert(draft).await
    }

    /// Removes an entry. Allowed for any state, a running stopwatch
    /// included.
    pub async fn delete_activity(&self, activity_id: u64) -> EngineResult<()> {
        self.activities.delete(activity_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use chrono::{DateTime, Duration, Utc};
    use tempfile::tempdir;

    use crate::{
        engine::{
            activities::ActivityStore,
            error::EngineError,
            tasks::TaskStore,
        },
        utils::clock::{Clock, ManualClock, MockClock},
    };

    use super::{ActivityRecorder, TimeShape};

    const START: &str = "2024-03-05T09:00:00Z";

    fn start_instant() -> DateTime<Utc> {
        START.parse().unwrap()
    }

    async fn recorder_with_clock(
        dir: &std::path::Path,
        clock: Arc<dyn Clock>,
    ) -> Result<ActivityRecorder> {
        let tasks = Arc::new(TaskStore::open(dir, clock.clone()).await?);
        tasks.create("Writing").await?;
        let activities = Arc::new(ActivityStore::open(dir).await?);
        Ok(ActivityRecorder::new(tasks, activities, clock))
    }

    #[tokio::test]
    async fn test_start_requires_existing_task() -> Result<()> {
        let dir = tempdir()?;
        let clock = Arc::new(ManualClock::starting_at(start_instant()));
        let recorder = recorder_with_clock(dir.path(), clock).await?;

        assert!(matches!(
            recorder.start_stopwatch(99).await,
            Err(EngineError::NotFound(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_second_start_conflicts() -> Result<()> {
        let dir = tempdir()?;
        let clock = Arc::new(ManualClock::starting_at(start_instant()));
        let recorder = recorder_with_clock(dir.path(), clock).await?;

        recorder.start_stopwatch(1).await?;
        assert!(matches!(
            recorder.start_stopwatch(1).await,
            Err(EngineError::Conflict(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_stop_rounds_half_minute_up() -> Result<()> {
        let dir = tempdir()?;
        // Reads: task creation, stopwatch start, then stop 90 seconds later.
        let mut clock = MockClock::new();
        let mut readings = [
            start_instant(),
            start_instant(),
            start_instant() + Duration::seconds(90),
        ]
        .into_iter();
        clock
            .expect_time()
            .times(3)
            .returning(move || readings.next().unwrap());
        let recorder = recorder_with_clock(dir.path(), Arc::new(clock)).await?;

        let started = recorder.start_stopwatch(1).await?;
        let stopped = recorder.stop(started.id).await?;

        assert_eq!(stopped.duration_minutes, 2);
        assert_eq!(stopped.start_time, Some(start_instant()));
        assert_eq!(
            stopped.end_time,
            Some(start_instant() + Duration::seconds(90))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_stop_of_closed_activity_is_not_found() -> Result<()> {
        let dir = tempdir()?;
        let clock = Arc::new(ManualClock::starting_at(start_instant()));
        let recorder = recorder_with_clock(dir.path(), clock.clone()).await?;

        let started = recorder.start_stopwatch(1).await?;
        clock.advance(Duration::minutes(5));
        recorder.stop(started.id).await?;

        assert!(matches!(
            recorder.stop(started.id).await,
            Err(EngineError::NotFound(_))
        ));
        assert!(matches!(
            recorder.stop(999).await,
            Err(EngineError::NotFound(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_manual_ranged_entry() -> Result<()> {
        let dir = tempdir()?;
        let clock = Arc::new(ManualClock::starting_at(start_instant()));
        let recorder = recorder_with_clock(dir.path(), clock).await?;

        let start = start_instant();
        let end = start + Duration::minutes(30);
        let entry = recorder
            .log_manual(1, TimeShape::Ranged { start, end }, None)
            .await?;

        assert_eq!(entry.duration_minutes, 30);
        assert!(!entry.no_time_assigned);
        // logged_at falls back to the range start.
        assert_eq!(entry.logged_at, start);
        Ok(())
    }

    #[tokio::test]
    async fn test_manual_ranged_entry_rejects_inverted_range() -> Result<()> {
        let dir = tempdir()?;
        let clock = Arc::new(ManualClock::starting_at(start_instant()));
        let recorder = recorder_with_clock(dir.path(), clock).await?;

        let start = start_instant();
        for end in [start, start - Duration::minutes(1)] {
            assert!(matches!(
                recorder
                    .log_manual(1, TimeShape::Ranged { start, end }, None)
                    .await,
                Err(EngineError::Validation(_))
            ));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_manual_duration_only_entry() -> Result<()> {
        let dir = tempdir()?;
        let clock = Arc::new(ManualClock::starting_at(start_instant()));
        let recorder = recorder_with_clock(dir.path(), clock).await?;

        let entry = recorder
            .log_manual(1, TimeShape::DurationOnly { minutes: 45 }, None)
            .await?;

        assert!(entry.no_time_assigned);
        assert_eq!(entry.duration_minutes, 45);
        assert_eq!(entry.start_time, None);
        assert_eq!(entry.end_time, None);
        // Defaults to "now", which also becomes the effective date.
        assert_eq!(entry.logged_at, start_instant());
        assert_eq!(entry.effective_date(), start_instant().date_naive());
        Ok(())
    }

    #[tokio::test]
    async fn test_manual_duration_must_be_positive() -> Result<()> {
        let dir = tempdir()?;
        let clock = Arc::new(ManualClock::starting_at(start_instant()));
        let recorder = recorder_with_clock(dir.path(), clock).await?;

        for minutes in [0, -5] {
            let result = recorder
                .log_manual(1, TimeShape::DurationOnly { minutes }, None)
                .await;
            match result {
                Err(EngineError::Validation(message)) => {
                    assert_eq!(message, "Enter a valid duration in minutes")
                }
                other => panic!("Expected validation error, got {other:?}"),
            }
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_manual_entry_never_touches_running_stopwatch() -> Result<()> {
        let dir = tempdir()?;
        let clock = Arc::new(ManualClock::starting_at(start_instant()));
        let recorder = recorder_with_clock(dir.path(), clock).await?;

        let running = recorder.start_stopwatch(1).await?;
        recorder
            .log_manual(1, TimeShape::DurationOnly { minutes: 15 }, None)
            .await?;

        let still_running = recorder.stop(running.id).await?;
        assert_eq!(still_running.id, running.id);
        Ok(())
    }

    #[test]
    fn test_shape_from_parts() {
        let start = start_instant();
        let end = start + Duration::minutes(10);

        assert!(matches!(
            TimeShape::from_parts(Some(start), Some(end), Some(99)),
            Ok(TimeShape::Ranged { .. })
        ));
        assert!(matches!(
            TimeShape::from_parts(None, None, Some(45)),
            Ok(TimeShape::DurationOnly { minutes: 45 })
        ));
        // A lone start time is not a shape.
        match TimeShape::from_parts(Some(start), None, None) {
            Err(EngineError::Validation(message)) => {
                assert_eq!(message, "Enter either start+end time or total duration.")
            }
            other => panic!("Expected validation error, got {other:?}"),
        }
    }
}
