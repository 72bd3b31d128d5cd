use chrono::{DateTime, Utc};

/// Represents an entity responsible for providing the current instant across
/// the application. Injecting it allows operations to be tested against a
/// controlled clock.
///
/// The clock must be read at the moment a timestamp is needed, never cached
/// across the steps of an operation.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock that starts at a fixed instant and only moves when told to.
#[cfg(test)]
pub struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn time(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
