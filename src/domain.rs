use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CovidError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Scope {
    WorldAggregate,
    Country(String),
    UsAggregate,
    UsState(String),
}

impl Scope {
    pub fn scope_type(&self) -> &'static str {
        match self {
            Scope::WorldAggregate => "world",
            Scope::Country(_) => "country",
            Scope::UsAggregate => "usa",
            Scope::UsState(_) => "state",
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Scope::Country(name) | Scope::UsState(name) => Some(name),
            Scope::WorldAggregate | Scope::UsAggregate => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Scope::WorldAggregate => "Worldwide",
            Scope::UsAggregate => "United States",
            Scope::Country(name) | Scope::UsState(name) => name,
        }
    }

    pub fn reports_recovered(&self) -> bool {
        !matches!(self, Scope::UsState(_))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::WorldAggregate => write!(f, "world"),
            Scope::UsAggregate => write!(f, "usa"),
            Scope::Country(name) => write!(f, "country:{name}"),
            Scope::UsState(name) => write!(f, "state:{name}"),
        }
    }
}

impl FromStr for Scope {
    type Err = CovidError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "world" | "all" => return Ok(Scope::WorldAggregate),
            "usa" | "us" => return Ok(Scope::UsAggregate),
            _ => {}
        }
        let (kind, rest) = trimmed
            .split_once(':')
            .ok_or_else(|| CovidError::InvalidScope(value.to_string()))?;
        let name = rest.trim();
        if name.is_empty() {
            return Err(CovidError::InvalidScope(value.to_string()));
        }
        match kind.trim() {
            "country" => Ok(Scope::Country(name.to_string())),
            "state" => Ok(Scope::UsState(name.to_string())),
            _ => Err(CovidError::InvalidScope(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DateRangeSelection {
    Default,
    ExplicitDate(NaiveDate),
    ExplicitYear(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub day_count: u32,
}

impl ResolvedRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub flag: Option<String>,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            flag: None,
        }
    }
}
