use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub http: HttpConfig,
    pub deals: Option<DealsConfig>,
    pub weather: Option<WeatherConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_retry_after")]
    pub retry_after_default_seconds: u64,
    #[serde(default = "default_retry_after_max")]
    pub retry_after_max_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            retry_after_default_seconds: default_retry_after(),
            retry_after_max_seconds: default_retry_after_max(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_retry_after() -> u64 {
    5
}

fn default_retry_after_max() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct DealsConfig {
    pub base_url: String,
    #[serde(default)]
    pub params: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    pub base_url: String,
    pub api_key: String,
    pub cities: Vec<String>,
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
