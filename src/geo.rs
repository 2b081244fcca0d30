use std::sync::Arc;

use serde_json::Value;

use crate::disease::DiseaseClient;
use crate::domain::{GeoPoint, Scope};
use crate::error::CovidError;
use crate::snapshot::{Snapshot, parse_snapshot};

pub const US_CENTER: GeoPoint = GeoPoint {
    latitude: 37.0902,
    longitude: -95.7129,
    flag: None,
};

pub const WORLD_CENTER: GeoPoint = GeoPoint {
    latitude: 0.0,
    longitude: 0.0,
    flag: None,
};

pub struct GeoLocator<C: DiseaseClient> {
    client: Arc<C>,
}

impl<C: DiseaseClient> GeoLocator<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    pub fn locate(&self, scope: &Scope) -> Result<GeoPoint, CovidError> {
        match scope {
            Scope::WorldAggregate => Ok(WORLD_CENTER),
            Scope::UsAggregate => Ok(US_CENTER),
            Scope::Country(_) => {
                let raw = self.client.snapshot(scope)?;
                let snapshot = parse_snapshot(scope, &raw)?;
                from_snapshot(scope, &snapshot)
            }
            Scope::UsState(name) => {
                let raw = self.client.state_centers()?;
                find_state_center(&raw, name)
            }
        }
    }
}

pub fn from_snapshot(scope: &Scope, snapshot: &Snapshot) -> Result<GeoPoint, CovidError> {
    let info = snapshot
        .country_info
        .as_ref()
        .ok_or_else(|| CovidError::GeoNotFound(scope.to_string()))?;
    match (info.latitude, info.longitude) {
        (Some(latitude), Some(longitude)) => Ok(GeoPoint {
            latitude,
            longitude,
            flag: info.flag.clone(),
        }),
        _ => Err(CovidError::GeoNotFound(scope.to_string())),
    }
}

pub fn find_state_center(raw: &Value, state: &str) -> Result<GeoPoint, CovidError> {
    let entries = raw.as_array().ok_or_else(|| {
        CovidError::UpstreamPayload("state reference table is not a list".to_string())
    })?;
    for entry in entries {
        let name = entry.get("state").and_then(Value::as_str).ok_or_else(|| {
            CovidError::UpstreamPayload(format!("state reference entry without a name: {entry}"))
        })?;
        if !name.trim().eq_ignore_ascii_case(state.trim()) {
            continue;
        }
        let latitude = coordinate(entry, "latitude")?;
        let longitude = coordinate(entry, "longitude")?;
        return Ok(GeoPoint::new(latitude, longitude));
    }
    Err(CovidError::GeoNotFound(format!("state:{state}")))
}

fn coordinate(entry: &Value, key: &str) -> Result<f64, CovidError> {
    let value = entry.get(key);
    value
        .and_then(Value::as_f64)
        .or_else(|| value.and_then(Value::as_str).and_then(|text| text.trim().parse().ok()))
        .ok_or_else(|| CovidError::UpstreamPayload(format!("{key} missing or not numeric: {entry}")))
}
