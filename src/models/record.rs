use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Normalized output of one raw API item, ready for persistence.
///
/// `fields` carries the full persisted key set for the record's domain.
/// Key names are kept in Spanish to stay byte-compatible with the schema
/// the existing dashboards read.
#[derive(Debug, Clone)]
pub struct CanonicalRecord {
    /// Natural key of the dimension this record belongs to (game title,
    /// city name).
    pub dimension_key: String,
    /// Descriptive dimension attributes written on first sight of the key.
    pub dimension_attrs: Map<String, Value>,
    /// Measured fields for the fact row.
    pub fields: Map<String, Value>,
    /// Time of processing, injected by the caller. The APIs do not supply
    /// their own timestamps.
    pub extracted_at: DateTime<Utc>,
}
