use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::disease::{DEFAULT_BASE_URL, DEFAULT_GEO_REFERENCE_URL};
use crate::domain::GeoPoint;
use crate::error::CovidError;
use crate::geo::US_CENTER;
use crate::range::DEFAULT_SUPPORTED_YEARS;

pub const DEFAULT_CONFIG_FILE: &str = "covid-dash.json";
pub const BASE_URL_ENV: &str = "COVID_DASH_BASE_URL";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub geo_reference_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub supported_years: Option<Vec<i32>>,
    #[serde(default)]
    pub fallback_center: Option<CenterEntry>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct CenterEntry {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub base_url: String,
    pub geo_reference_url: String,
    pub timeout: Duration,
    pub supported_years: Vec<i32>,
    pub fallback_center: GeoPoint,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            base_url: DEFAULT_BASE_URL.to_string(),
            geo_reference_url: DEFAULT_GEO_REFERENCE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            supported_years: DEFAULT_SUPPORTED_YEARS.to_vec(),
            fallback_center: US_CENTER,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, CovidError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let env_base_url = std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty());

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default(), env_base_url);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| CovidError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| CovidError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config, env_base_url)
    }

    pub fn resolve_config(
        config: Config,
        base_url_override: Option<String>,
    ) -> Result<ResolvedConfig, CovidError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let timeout_secs = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(CovidError::ConfigParse(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        let supported_years = config
            .supported_years
            .unwrap_or_else(|| DEFAULT_SUPPORTED_YEARS.to_vec());
        if supported_years.is_empty() {
            return Err(CovidError::ConfigParse(
                "supported_years must not be empty".to_string(),
            ));
        }

        let fallback_center = match config.fallback_center {
            Some(center) => {
                if !(-90.0..=90.0).contains(&center.latitude)
                    || !(-180.0..=180.0).contains(&center.longitude)
                {
                    return Err(CovidError::ConfigParse(format!(
                        "fallback_center out of range: {}, {}",
                        center.latitude, center.longitude
                    )));
                }
                GeoPoint::new(center.latitude, center.longitude)
            }
            None => US_CENTER,
        };

        let base_url = base_url_override
            .or(config.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(ResolvedConfig {
            schema_version,
            base_url,
            geo_reference_url: config
                .geo_reference_url
                .unwrap_or_else(|| DEFAULT_GEO_REFERENCE_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            supported_years,
            fallback_center,
        })
    }
}
