use std::collections::HashMap;

use serde_json::Value;

use crate::config::{DealsConfig, WeatherConfig};
use crate::error::{Error, Result};

/// Which API a cycle pulls from. Decides how units of work are expanded
/// and how a unit's payload splits into raw items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Deals,
    Weather,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Deals => "deals",
            Domain::Weather => "weather",
        }
    }

    /// Splits one unit's payload into raw items. The deals endpoint returns
    /// a flat JSON array; Weatherstack returns one object per city and
    /// reports failures in-body under an `error` key with a 200 status.
    pub fn items(&self, payload: Value) -> Result<Vec<Value>> {
        match self {
            Domain::Deals => payload
                .as_array()
                .cloned()
                .ok_or_else(|| Error::Api("expected a JSON array of deals".to_string())),
            Domain::Weather => {
                if let Some(err) = payload.get("error") {
                    let info = err
                        .get("info")
                        .and_then(|i| i.as_str())
                        .unwrap_or("unknown API error");
                    return Err(Error::Api(info.to_string()));
                }
                Ok(vec![payload])
            }
        }
    }
}

/// One API call target within a cycle.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    pub label: String,
    pub url: String,
    pub params: Vec<(String, String)>,
}

/// Immutable source configuration built once per cycle.
#[derive(Debug, Clone)]
pub enum SourceEndpoint {
    DealsList {
        url: String,
        params: HashMap<String, String>,
    },
    WeatherByCity {
        url: String,
        api_key: String,
        cities: Vec<String>,
    },
}

impl SourceEndpoint {
    pub fn deals(config: &DealsConfig) -> Self {
        SourceEndpoint::DealsList {
            url: config.base_url.clone(),
            params: config.params.clone(),
        }
    }

    pub fn weather(config: &WeatherConfig) -> Self {
        SourceEndpoint::WeatherByCity {
            url: format!("{}/current", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            cities: config.cities.clone(),
        }
    }

    pub fn domain(&self) -> Domain {
        match self {
            SourceEndpoint::DealsList { .. } => Domain::Deals,
            SourceEndpoint::WeatherByCity { .. } => Domain::Weather,
        }
    }

    /// Expands the endpoint into units of work: a single call for the flat
    /// deals list, one call per configured city for weather.
    pub fn units(&self) -> Vec<WorkUnit> {
        match self {
            SourceEndpoint::DealsList { url, params } => {
                let mut params: Vec<(String, String)> = params
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                params.sort();

                vec![WorkUnit {
                    label: "deals".to_string(),
                    url: url.clone(),
                    params,
                }]
            }
            SourceEndpoint::WeatherByCity {
                url,
                api_key,
                cities,
            } => cities
                .iter()
                .map(|city| {
                    let city = city.trim().to_string();
                    WorkUnit {
                        label: city.clone(),
                        url: url.clone(),
                        params: vec![
                            ("access_key".to_string(), api_key.clone()),
                            ("query".to_string(), city),
                        ],
                    }
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deals_endpoint_expands_to_one_unit() {
        let endpoint = SourceEndpoint::DealsList {
            url: "https://www.cheapshark.com/api/1.0/deals".to_string(),
            params: HashMap::from([("storeID".to_string(), "1".to_string())]),
        };

        let units = endpoint.units();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].label, "deals");
        assert!(units[0].params.contains(&("storeID".to_string(), "1".to_string())));
    }

    #[test]
    fn weather_endpoint_expands_per_city() {
        let endpoint = SourceEndpoint::WeatherByCity {
            url: "http://api.weatherstack.com/current".to_string(),
            api_key: "k".to_string(),
            cities: vec!["Madrid".to_string(), " Lima ".to_string()],
        };

        let units = endpoint.units();
        assert_eq!(units.len(), 2);
        assert_eq!(units[1].label, "Lima");
        assert!(units[1].params.contains(&("query".to_string(), "Lima".to_string())));
    }

    #[test]
    fn deals_items_require_an_array() {
        assert_eq!(Domain::Deals.items(json!([{"title": "a"}])).unwrap().len(), 1);
        assert!(Domain::Deals.items(json!({"title": "a"})).is_err());
    }

    #[test]
    fn weather_error_payload_fails_the_unit() {
        let payload = json!({"success": false, "error": {"code": 101, "info": "invalid key"}});
        match Domain::Weather.items(payload) {
            Err(Error::Api(info)) => assert_eq!(info, "invalid key"),
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
