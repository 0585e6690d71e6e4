pub mod deal;
pub mod metrics;
pub mod record;
pub mod weather;

pub use deal::Deal;
pub use metrics::{RunMetrics, RunStatus};
pub use record::CanonicalRecord;
pub use weather::WeatherObservation;
