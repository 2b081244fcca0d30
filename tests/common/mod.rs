#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;

use chrono::NaiveDate;
use serde_json::Value;

use covid_dash::disease::DiseaseClient;
use covid_dash::domain::Scope;
use covid_dash::error::CovidError;

pub fn fixture(name: &str) -> Value {
    let raw = fs::read_to_string(format!("tests/fixtures/{name}")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

type Hook = Box<dyn Fn() + Send + Sync>;

/// Serves fixtures by scope; an unknown scope answers like an upstream 404.
#[derive(Default)]
pub struct MockClient {
    pub countries: Mutex<Option<Value>>,
    pub states: Mutex<Option<Value>>,
    pub snapshots: HashMap<String, Value>,
    pub historical: HashMap<String, Value>,
    pub centers: Option<Value>,
    pub calls: Mutex<Vec<String>>,
    pub on_snapshot: Option<Hook>,
}

impl MockClient {
    /// France, Washington, Puerto Rico, the world and the US aggregate.
    pub fn with_fixtures() -> Self {
        let mut snapshots = HashMap::new();
        snapshots.insert("world".to_string(), fixture("snapshot_world.json"));
        snapshots.insert("country:France".to_string(), fixture("snapshot_france.json"));
        snapshots.insert("usa".to_string(), fixture("snapshot_usa.json"));
        snapshots.insert(
            "state:Washington".to_string(),
            fixture("snapshot_washington.json"),
        );
        snapshots.insert(
            "state:Puerto Rico".to_string(),
            fixture("snapshot_puerto_rico.json"),
        );

        let mut historical = HashMap::new();
        historical.insert("world".to_string(), fixture("historical_all.json"));
        historical.insert("usa".to_string(), fixture("historical_all.json"));
        historical.insert("country:France".to_string(), fixture("historical_france.json"));
        historical.insert("state:Washington".to_string(), fixture("nyt_washington.json"));
        historical.insert("state:Puerto Rico".to_string(), fixture("nyt_washington.json"));

        Self {
            countries: Mutex::new(Some(fixture("countries.json"))),
            states: Mutex::new(Some(fixture("states.json"))),
            snapshots,
            historical,
            centers: Some(fixture("state_centers.json")),
            calls: Mutex::new(Vec::new()),
            on_snapshot: None,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn unavailable() -> CovidError {
    CovidError::UpstreamHttp("connection refused".to_string())
}

impl DiseaseClient for MockClient {
    fn list_countries(&self) -> Result<Value, CovidError> {
        self.record("countries".to_string());
        self.countries.lock().unwrap().clone().ok_or_else(unavailable)
    }

    fn list_states(&self) -> Result<Value, CovidError> {
        self.record("states".to_string());
        self.states.lock().unwrap().clone().ok_or_else(unavailable)
    }

    fn snapshot(&self, scope: &Scope) -> Result<Value, CovidError> {
        self.record(format!("snapshot:{scope}"));
        if let Some(hook) = &self.on_snapshot {
            hook();
        }
        self.snapshots
            .get(&scope.to_string())
            .cloned()
            .ok_or_else(|| CovidError::ScopeNotFound(scope.to_string()))
    }

    fn historical(&self, scope: &Scope, last_days: u32) -> Result<Value, CovidError> {
        self.record(format!("historical:{scope}:{last_days}"));
        self.historical
            .get(&scope.to_string())
            .cloned()
            .ok_or_else(|| CovidError::ScopeNotFound(scope.to_string()))
    }

    fn state_centers(&self) -> Result<Value, CovidError> {
        self.record("centers".to_string());
        self.centers.clone().ok_or_else(unavailable)
    }
}
