use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::debug;

use crate::config::ResolvedConfig;
use crate::domain::Scope;
use crate::error::CovidError;

pub const DEFAULT_BASE_URL: &str = "https://disease.sh/v3/covid-19";
pub const DEFAULT_GEO_REFERENCE_URL: &str = "https://gist.githubusercontent.com/meiqimichelle/7727723/raw/0109432d22f28fd1a669a3fd113e41c4193dbb5d/USstates_avg_latLong";

pub trait DiseaseClient: Send + Sync {
    fn list_countries(&self) -> Result<Value, CovidError>;
    fn list_states(&self) -> Result<Value, CovidError>;
    fn snapshot(&self, scope: &Scope) -> Result<Value, CovidError>;
    fn historical(&self, scope: &Scope, last_days: u32) -> Result<Value, CovidError>;
    fn state_centers(&self) -> Result<Value, CovidError>;
}

#[derive(Clone)]
pub struct DiseaseHttpClient {
    client: Client,
    base_url: String,
    geo_reference_url: String,
}

impl DiseaseHttpClient {
    pub fn new(config: &ResolvedConfig) -> Result<Self, CovidError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("covid-dash/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CovidError::UpstreamHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|err| CovidError::UpstreamHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            geo_reference_url: config.geo_reference_url.clone(),
        })
    }

    fn get_json(&self, url: Url, scope: Option<&Scope>) -> Result<Value, CovidError> {
        debug!(%url, "GET");
        let response = self.client.get(url).send().map_err(|err| {
            if err.is_timeout() {
                CovidError::UpstreamHttp(format!("request timed out: {err}"))
            } else {
                CovidError::UpstreamHttp(err.to_string())
            }
        })?;
        let response = Self::handle_status(response, scope)?;
        response
            .json::<Value>()
            .map_err(|err| CovidError::UpstreamPayload(err.to_string()))
    }

    fn handle_status(
        response: reqwest::blocking::Response,
        scope: Option<&Scope>,
    ) -> Result<reqwest::blocking::Response, CovidError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        if status == 404 {
            if let Some(scope) = scope {
                return Err(CovidError::ScopeNotFound(scope.to_string()));
            }
        }
        let message = response
            .text()
            .unwrap_or_else(|_| "upstream request failed".to_string());
        Err(CovidError::UpstreamStatus { status, message })
    }
}

impl DiseaseClient for DiseaseHttpClient {
    fn list_countries(&self) -> Result<Value, CovidError> {
        self.get_json(endpoint(&self.base_url, &["countries"])?, None)
    }

    fn list_states(&self) -> Result<Value, CovidError> {
        self.get_json(endpoint(&self.base_url, &["states"])?, None)
    }

    fn snapshot(&self, scope: &Scope) -> Result<Value, CovidError> {
        self.get_json(snapshot_url(&self.base_url, scope)?, Some(scope))
    }

    fn historical(&self, scope: &Scope, last_days: u32) -> Result<Value, CovidError> {
        self.get_json(historical_url(&self.base_url, scope, last_days)?, Some(scope))
    }

    fn state_centers(&self) -> Result<Value, CovidError> {
        let url = Url::parse(&self.geo_reference_url)
            .map_err(|err| CovidError::UpstreamHttp(err.to_string()))?;
        self.get_json(url, None)
    }
}

pub fn endpoint(base: &str, segments: &[&str]) -> Result<Url, CovidError> {
    let mut url = Url::parse(base).map_err(|err| CovidError::UpstreamHttp(err.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| CovidError::UpstreamHttp(format!("base url cannot carry a path: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub fn snapshot_url(base: &str, scope: &Scope) -> Result<Url, CovidError> {
    let mut url = match scope {
        Scope::WorldAggregate => endpoint(base, &["all"])?,
        Scope::Country(name) => endpoint(base, &["countries", name])?,
        Scope::UsAggregate => endpoint(base, &["countries", "usa"])?,
        Scope::UsState(name) => endpoint(base, &["states", name])?,
    };
    if matches!(scope, Scope::Country(_) | Scope::UsAggregate) {
        url.query_pairs_mut().append_pair("strict", "true");
    }
    Ok(url)
}

pub fn historical_url(base: &str, scope: &Scope, last_days: u32) -> Result<Url, CovidError> {
    let mut url = match scope {
        Scope::WorldAggregate => endpoint(base, &["historical", "all"])?,
        Scope::Country(name) => endpoint(base, &["historical", name])?,
        Scope::UsAggregate => endpoint(base, &["historical", "usa"])?,
        Scope::UsState(name) => endpoint(base, &["nyt", "states", name])?,
    };
    url.query_pairs_mut()
        .append_pair("lastdays", &last_days.to_string());
    Ok(url)
}
