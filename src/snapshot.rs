use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::disease::DiseaseClient;
use crate::domain::Scope;
use crate::error::CovidError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub cases: Option<u64>,
    pub today_cases: Option<u64>,
    pub deaths: Option<u64>,
    pub today_deaths: Option<u64>,
    pub recovered: Option<u64>,
    pub today_recovered: Option<u64>,
    pub active: Option<u64>,
    pub critical: Option<u64>,
}

impl Totals {
    pub fn is_empty(&self) -> bool {
        *self == Totals::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryInfo {
    pub iso2: Option<String>,
    pub iso3: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub flag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub name: String,
    pub updated: Option<DateTime<Utc>>,
    pub totals: Totals,
    pub population: Option<u64>,
    pub tests: Option<u64>,
    pub country_info: Option<CountryInfo>,
}

impl Snapshot {
    pub fn rows(&self) -> Vec<(&'static str, Option<u64>)> {
        let totals = &self.totals;
        vec![
            ("Cases", totals.cases),
            ("Cases today", totals.today_cases),
            ("Deaths", totals.deaths),
            ("Deaths today", totals.today_deaths),
            ("Recovered", totals.recovered),
            ("Recovered today", totals.today_recovered),
            ("Active", totals.active),
            ("Critical", totals.critical),
        ]
    }
}

pub struct SnapshotFetcher<C: DiseaseClient> {
    client: Arc<C>,
}

impl<C: DiseaseClient> SnapshotFetcher<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    pub fn fetch_snapshot(&self, scope: &Scope) -> Result<Snapshot, CovidError> {
        let raw = self.client.snapshot(scope)?;
        let snapshot = parse_snapshot(scope, &raw)?;
        debug!(scope = %scope, updated = ?snapshot.updated, "snapshot fetched");
        Ok(snapshot)
    }
}

pub fn parse_snapshot(scope: &Scope, raw: &Value) -> Result<Snapshot, CovidError> {
    let object = raw
        .as_object()
        .ok_or_else(|| CovidError::UpstreamPayload("snapshot is not an object".to_string()))?;

    if object.contains_key("message") && !object.contains_key("cases") {
        return Err(CovidError::ScopeNotFound(scope.to_string()));
    }

    let totals = Totals {
        cases: count_field(object, "cases")?,
        today_cases: count_field(object, "todayCases")?,
        deaths: count_field(object, "deaths")?,
        today_deaths: count_field(object, "todayDeaths")?,
        recovered: count_field(object, "recovered")?,
        today_recovered: count_field(object, "todayRecovered")?,
        active: count_field(object, "active")?,
        critical: count_field(object, "critical")?,
    };
    if totals.is_empty() {
        return Err(CovidError::UpstreamPayload(format!(
            "snapshot for {scope} carries no totals"
        )));
    }

    let name = object
        .get("country")
        .or_else(|| object.get("state"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| scope.label().to_string());

    let updated = match object.get("updated") {
        None | Some(Value::Null) => None,
        Some(value) => {
            let millis = value.as_i64().ok_or_else(|| {
                CovidError::UpstreamPayload(format!("updated is not a timestamp: {value}"))
            })?;
            DateTime::from_timestamp_millis(millis)
        }
    };

    let country_info = match object.get("countryInfo") {
        Some(Value::Object(info)) => Some(parse_country_info(info)?),
        _ => None,
    };

    Ok(Snapshot {
        name,
        updated,
        totals,
        population: count_field(object, "population")?,
        tests: count_field(object, "tests")?,
        country_info,
    })
}

fn parse_country_info(info: &Map<String, Value>) -> Result<CountryInfo, CovidError> {
    let text = |key: &str| info.get(key).and_then(Value::as_str).map(str::to_string);
    Ok(CountryInfo {
        iso2: text("iso2"),
        iso3: text("iso3"),
        latitude: coordinate_field(info, "lat")?,
        longitude: coordinate_field(info, "long")?,
        flag: text("flag"),
    })
}

fn count_field(object: &Map<String, Value>, key: &str) -> Result<Option<u64>, CovidError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or_else(|| {
            CovidError::UpstreamPayload(format!("{key} is not a non-negative integer: {value}"))
        }),
    }
}

fn coordinate_field(object: &Map<String, Value>, key: &str) -> Result<Option<f64>, CovidError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_f64().map(Some).ok_or_else(|| {
            CovidError::UpstreamPayload(format!("{key} is not a coordinate: {value}"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_fields_stay_absent() {
        let raw = json!({ "state": "Texas", "cases": 10, "deaths": 1, "recovered": null });
        let snapshot = parse_snapshot(&Scope::UsState("Texas".to_string()), &raw).unwrap();
        assert_eq!(snapshot.name, "Texas");
        assert_eq!(snapshot.totals.cases, Some(10));
        assert_eq!(snapshot.totals.recovered, None);
        assert_eq!(snapshot.totals.critical, None);
    }

    #[test]
    fn negative_count_is_malformed() {
        let raw = json!({ "cases": -3 });
        assert_matches!(
            parse_snapshot(&Scope::WorldAggregate, &raw),
            Err(CovidError::UpstreamPayload(_))
        );
    }

    #[test]
    fn message_body_is_scope_not_found() {
        let raw = json!({ "message": "Country not found or doesn't have any cases" });
        assert_matches!(
            parse_snapshot(&Scope::Country("Wakanda".to_string()), &raw),
            Err(CovidError::ScopeNotFound(_))
        );
    }

    #[test]
    fn rows_follow_dashboard_order() {
        let raw = json!({ "cases": 5, "todayCases": 1 });
        let snapshot = parse_snapshot(&Scope::WorldAggregate, &raw).unwrap();
        let rows = snapshot.rows();
        assert_eq!(rows[0], ("Cases", Some(5)));
        assert_eq!(rows[1], ("Cases today", Some(1)));
        assert_eq!(rows[7], ("Critical", None));
        assert_eq!(snapshot.name, "Worldwide");
    }
}
