pub mod metrics;
pub mod pipeline;

pub use metrics::MetricsRecorder;
pub use pipeline::Pipeline;
