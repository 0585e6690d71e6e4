pub mod http;

pub use http::{Fetch, FetchOutcome, HttpClient};
