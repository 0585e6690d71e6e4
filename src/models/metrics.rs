use chrono::{DateTime, Utc};

/// Terminal status of one extraction cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Partial,
    Failed,
}

impl RunStatus {
    /// `success` when no unit failed, `failed` when nothing was saved,
    /// `partial` in between.
    pub fn from_counts(saved: i64, failed: i64) -> Self {
        if failed == 0 {
            RunStatus::Success
        } else if saved > 0 {
            RunStatus::Partial
        } else {
            RunStatus::Failed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(RunStatus::Success),
            "partial" => Some(RunStatus::Partial),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}

/// One row per cycle in `metricas_etl`, written even under total failure.
#[derive(Debug, Clone, PartialEq)]
pub struct RunMetrics {
    pub started_at: DateTime<Utc>,
    pub status: RunStatus,
    pub extracted: i64,
    pub saved: i64,
    pub failed: i64,
    pub duration_seconds: f64,
}
