use chrono::{DateTime, Utc};

/// Time source injected into the pipeline so extraction timestamps and
/// run durations are testable with a fixed clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
