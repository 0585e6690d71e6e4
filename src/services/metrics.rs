use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::models::{RunMetrics, RunStatus};

/// Assembles the `RunMetrics` row for one cycle. Owns the time arithmetic
/// so the orchestrator itself never touches a clock.
pub struct MetricsRecorder {
    clock: Arc<dyn Clock>,
    started_at: DateTime<Utc>,
}

impl MetricsRecorder {
    pub fn start(clock: Arc<dyn Clock>) -> Self {
        let started_at = clock.now();
        Self { clock, started_at }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finish(&self, extracted: i64, saved: i64, failed: i64) -> RunMetrics {
        let elapsed = self.clock.now() - self.started_at;
        RunMetrics {
            started_at: self.started_at,
            status: RunStatus::from_counts(saved, failed),
            extracted,
            saved,
            failed,
            duration_seconds: elapsed.num_milliseconds() as f64 / 1000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    struct SteppingClock {
        times: Mutex<Vec<DateTime<Utc>>>,
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            self.times.lock().unwrap().remove(0)
        }
    }

    #[test]
    fn finish_computes_duration_from_injected_clock() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let end = start + chrono::Duration::milliseconds(2500);
        let clock = Arc::new(SteppingClock {
            times: Mutex::new(vec![start, end]),
        });

        let recorder = MetricsRecorder::start(clock);
        let metrics = recorder.finish(3, 2, 1);

        assert_eq!(metrics.started_at, start);
        assert_eq!(metrics.duration_seconds, 2.5);
        assert_eq!(metrics.status, RunStatus::Partial);
        assert_eq!(metrics.extracted, 3);
        assert_eq!(metrics.saved, 2);
        assert_eq!(metrics.failed, 1);
    }
}
