pub mod clients;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod services;
pub mod sources;
pub mod storage;

pub use clients::{Fetch, FetchOutcome, HttpClient};
pub use clock::{Clock, SystemClock};
pub use config::Settings;
pub use error::{Error, Result};
pub use models::{CanonicalRecord, RunMetrics, RunStatus};
pub use services::Pipeline;
pub use sources::SourceEndpoint;
pub use storage::Store;
