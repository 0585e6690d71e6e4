use chrono::{DateTime, Utc};
use serde_json::{json, Map};

use crate::models::CanonicalRecord;

/// One city's current weather, normalized from the Weatherstack payload.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherObservation {
    pub city: String,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub temperature: f64,
    pub feels_like: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub description: String,
    pub weather_code: Option<i64>,
    pub extracted_at: DateTime<Utc>,
}

impl WeatherObservation {
    pub fn into_record(self) -> CanonicalRecord {
        let mut fields = Map::new();
        fields.insert("ciudad".to_string(), json!(self.city));
        fields.insert("pais".to_string(), json!(self.country));
        fields.insert("latitud".to_string(), json!(self.latitude));
        fields.insert("longitud".to_string(), json!(self.longitude));
        fields.insert("temperatura".to_string(), json!(self.temperature));
        fields.insert("sensacion_termica".to_string(), json!(self.feels_like));
        fields.insert("humedad".to_string(), json!(self.humidity));
        fields.insert("velocidad_viento".to_string(), json!(self.wind_speed));
        fields.insert("descripcion".to_string(), json!(self.description));
        fields.insert("codigo_tiempo".to_string(), json!(self.weather_code));
        fields.insert(
            "fecha_extraccion".to_string(),
            json!(self.extracted_at.to_rfc3339()),
        );

        let mut dimension_attrs = Map::new();
        dimension_attrs.insert("pais".to_string(), json!(self.country));
        dimension_attrs.insert("latitud".to_string(), json!(self.latitude));
        dimension_attrs.insert("longitud".to_string(), json!(self.longitude));

        CanonicalRecord {
            dimension_key: self.city,
            dimension_attrs,
            fields,
            extracted_at: self.extracted_at,
        }
    }
}
