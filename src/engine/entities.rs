use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A named target that tracked time gets booked against. Immutable after
/// creation apart from deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEntity {
    pub id: u64,
    pub name: String,
    /// `#rrggbb` string assigned once at creation, stable for the task's
    /// lifetime.
    pub color: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
}

/// A single tracked stretch of work. Three shapes exist: a running stopwatch
/// (start without end), a closed range (start and end), and a duration-only
/// entry (no clock times at all, `no_time_assigned` set).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntity {
    pub id: u64,
    /// Weak reference. The task may have been deleted since this entry was
    /// logged; readers have to tolerate a dangling id.
    pub task_id: u64,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: u32,
    /// When the record was created. Duration-only entries are bucketed into
    /// calendar days by this instant.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub logged_at: DateTime<Utc>,
    #[serde(default)]
    pub no_time_assigned: bool,
}

impl ActivityEntity {
    /// A live stopwatch: started, not finished, and not a duration-only
    /// entry. At most one activity system-wide may satisfy this.
    pub fn is_running(&self) -> bool {
        self.start_time.is_some() && self.end_time.is_none() && !self.no_time_assigned
    }

    /// Calendar date used for bucketing: the start date when a clock range
    /// exists, otherwise the date the entry was logged.
    pub fn effective_date(&self) -> NaiveDate {
        self.start_time.unwrap_or(self.logged_at).date_naive()
    }
}
