use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::models::WeatherObservation;
use crate::normalize::{coerce_f64, opt_f64, opt_i64, opt_str, Rejection};

/// Maps one raw Weatherstack response into a typed observation.
/// Temperature is the only mandatory measure; the city name is mandatory
/// too because it keys the dimension.
pub fn normalize_weather(raw: &Value, now: DateTime<Utc>) -> Result<WeatherObservation, Rejection> {
    let location = raw.get("location").cloned().unwrap_or(Value::Null);
    let current = raw.get("current").cloned().unwrap_or(Value::Null);

    let city = opt_str(&location, "name")
        .ok_or_else(|| Rejection { field: "location.name", reason: "missing city name".to_string() })?;

    let temperature = match current.get("temperature") {
        None | Some(Value::Null) => {
            return Err(Rejection {
                field: "current.temperature",
                reason: "missing mandatory numeric field".to_string(),
            })
        }
        Some(value) => coerce_f64(value).ok_or_else(|| Rejection {
            field: "current.temperature",
            reason: format!("not a number: {value}"),
        })?,
    };

    // Weatherstack returns descriptions as a one-element array.
    let description = current
        .get("weather_descriptions")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|d| d.as_str())
        .unwrap_or("N/A")
        .to_string();

    Ok(WeatherObservation {
        city,
        country: opt_str(&location, "country"),
        latitude: opt_f64(&location, "lat"),
        longitude: opt_f64(&location, "lon"),
        temperature,
        feels_like: opt_f64(&current, "feelslike"),
        humidity: opt_f64(&current, "humidity"),
        wind_speed: opt_f64(&current, "wind_speed"),
        description,
        weather_code: opt_i64(&current, "weather_code"),
        extracted_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn madrid() -> Value {
        json!({
            "location": {
                "name": "Madrid",
                "country": "Spain",
                "lat": "40.400",
                "lon": "-3.683"
            },
            "current": {
                "temperature": 24,
                "feelslike": 25,
                "humidity": 38,
                "wind_speed": 13,
                "weather_descriptions": ["Sunny"],
                "weather_code": 113
            }
        })
    }

    #[test]
    fn valid_payload_is_normalized() {
        let obs = normalize_weather(&madrid(), now()).unwrap();
        assert_eq!(obs.city, "Madrid");
        assert_eq!(obs.country.as_deref(), Some("Spain"));
        assert_eq!(obs.latitude, Some(40.4));
        assert_eq!(obs.temperature, 24.0);
        assert_eq!(obs.description, "Sunny");
        assert_eq!(obs.weather_code, Some(113));
        assert_eq!(obs.extracted_at, now());
    }

    #[test]
    fn missing_temperature_rejects_the_record() {
        let mut raw = madrid();
        raw["current"].as_object_mut().unwrap().remove("temperature");
        let rejection = normalize_weather(&raw, now()).unwrap_err();
        assert_eq!(rejection.field, "current.temperature");
    }

    #[test]
    fn missing_city_name_rejects_the_record() {
        let raw = json!({"current": {"temperature": 20}});
        assert_eq!(
            normalize_weather(&raw, now()).unwrap_err().field,
            "location.name"
        );
    }

    #[test]
    fn optional_fields_degrade_to_defaults() {
        let raw = json!({
            "location": {"name": "Lima"},
            "current": {"temperature": "18"}
        });
        let obs = normalize_weather(&raw, now()).unwrap();
        assert_eq!(obs.country, None);
        assert_eq!(obs.humidity, None);
        assert_eq!(obs.description, "N/A");
        assert_eq!(obs.temperature, 18.0);
    }

    #[test]
    fn record_carries_the_persisted_key_set() {
        let record = normalize_weather(&madrid(), now()).unwrap().into_record();
        assert_eq!(record.dimension_key, "Madrid");
        for key in [
            "ciudad",
            "pais",
            "latitud",
            "longitud",
            "temperatura",
            "sensacion_termica",
            "humedad",
            "velocidad_viento",
            "descripcion",
            "codigo_tiempo",
            "fecha_extraccion",
        ] {
            assert!(record.fields.contains_key(key), "missing key {key}");
        }
    }
}
