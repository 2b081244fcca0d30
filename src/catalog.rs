use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{info, warn};

use crate::disease::DiseaseClient;
use crate::domain::Scope;
use crate::error::CovidError;

/// Entries of the upstream state list that are not US states or territories.
pub const NON_GEOGRAPHIC_JURISDICTIONS: &[&str] = &[
    "Diamond Princess Ship",
    "Grand Princess Ship",
    "Wuhan Repatriated",
    "Federal Prisons",
    "Veteran Affairs",
    "US Military",
    "Navajo Nation",
];

pub type NameSet = Arc<BTreeSet<String>>;

#[derive(Debug, Default)]
struct CachedSet {
    inner: RwLock<Option<NameSet>>,
}

impl CachedSet {
    fn get(&self) -> Option<NameSet> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn replace(&self, names: NameSet) {
        match self.inner.write() {
            Ok(mut guard) => *guard = Some(names),
            Err(poisoned) => *poisoned.into_inner() = Some(names),
        }
    }
}

pub struct ScopeCatalog<C: DiseaseClient> {
    client: Arc<C>,
    countries: CachedSet,
    states: CachedSet,
}

impl<C: DiseaseClient> ScopeCatalog<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            countries: CachedSet::default(),
            states: CachedSet::default(),
        }
    }

    pub fn list_countries(&self) -> Result<NameSet, CovidError> {
        if let Some(names) = self.countries.get() {
            return Ok(names);
        }
        self.refresh_countries()
    }

    pub fn list_us_states(&self) -> Result<NameSet, CovidError> {
        if let Some(names) = self.states.get() {
            return Ok(names);
        }
        self.refresh_us_states()
    }

    pub fn countries_or_empty(&self) -> NameSet {
        self.list_countries().unwrap_or_else(|err| {
            warn!("country catalog unavailable, search disabled: {err}");
            NameSet::default()
        })
    }

    pub fn us_states_or_empty(&self) -> NameSet {
        self.list_us_states().unwrap_or_else(|err| {
            warn!("state catalog unavailable, search disabled: {err}");
            NameSet::default()
        })
    }

    pub fn refresh(&self) -> Result<(), CovidError> {
        self.refresh_countries()?;
        self.refresh_us_states()?;
        Ok(())
    }

    fn refresh_countries(&self) -> Result<NameSet, CovidError> {
        let raw = self
            .client
            .list_countries()
            .map_err(|err| CovidError::CatalogUnavailable(err.to_string()))?;
        let names = Arc::new(parse_names(&raw, "country")?);
        info!(count = names.len(), "country catalog loaded");
        self.countries.replace(names.clone());
        Ok(names)
    }

    fn refresh_us_states(&self) -> Result<NameSet, CovidError> {
        let raw = self
            .client
            .list_states()
            .map_err(|err| CovidError::CatalogUnavailable(err.to_string()))?;
        let mut names = parse_names(&raw, "state")?;
        names.retain(|name| !NON_GEOGRAPHIC_JURISDICTIONS.contains(&name.as_str()));
        let names = Arc::new(names);
        info!(count = names.len(), "state catalog loaded");
        self.states.replace(names.clone());
        Ok(names)
    }

    pub fn validate(&self, scope: &Scope) -> Result<Scope, CovidError> {
        match scope {
            Scope::WorldAggregate | Scope::UsAggregate => Ok(scope.clone()),
            Scope::Country(name) => {
                let names = self.list_countries()?;
                canonical_name(&names, name)
                    .map(Scope::Country)
                    .ok_or_else(|| CovidError::UnknownScope(scope.to_string()))
            }
            Scope::UsState(name) => {
                let names = self.list_us_states()?;
                canonical_name(&names, name)
                    .map(Scope::UsState)
                    .ok_or_else(|| CovidError::UnknownScope(scope.to_string()))
            }
        }
    }
}

fn canonical_name(names: &BTreeSet<String>, wanted: &str) -> Option<String> {
    let wanted = wanted.trim();
    if names.contains(wanted) {
        return Some(wanted.to_string());
    }
    names
        .iter()
        .find(|name| name.eq_ignore_ascii_case(wanted))
        .cloned()
}

pub fn parse_names(raw: &Value, field: &str) -> Result<BTreeSet<String>, CovidError> {
    let entries = raw.as_array().ok_or_else(|| {
        CovidError::CatalogUnavailable(format!("expected a list of {field} entries"))
    })?;
    entries
        .iter()
        .map(|entry| {
            entry
                .get(field)
                .and_then(Value::as_str)
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .ok_or_else(|| {
                    CovidError::CatalogUnavailable(format!("{field} entry without a name"))
                })
        })
        .collect()
}
