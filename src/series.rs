//! Metrics are joined on the parsed date, never by position. Any key set
//! mismatch is an error.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::disease::DiseaseClient;
use crate::domain::{ResolvedRange, Scope};
use crate::error::CovidError;

pub const NON_METRIC_KEYS: &[&str] = &[
    "state", "county", "fips", "updated", "date", "country", "province",
];

const CASES: &str = "cases";
const DEATHS: &str = "deaths";
const RECOVERED: &str = "recovered";

const DATE_FORMATS: &[&str] = &["%m/%d/%y", "%Y-%m-%d"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub cases: u64,
    pub deaths: u64,
    pub recovered: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimeSeries {
    points: Vec<SeriesPoint>,
}

impl TimeSeries {
    fn from_points(points: Vec<SeriesPoint>) -> Result<Self, CovidError> {
        for pair in points.windows(2) {
            let (prev, next) = (pair[0].date, pair[1].date);
            if prev.succ_opt() != Some(next) {
                return Err(CovidError::SeriesGap {
                    after: prev,
                    before: next,
                });
            }
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|point| point.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|point| point.date)
    }

    pub fn has_recovered(&self) -> bool {
        !self.points.is_empty() && self.points.iter().all(|point| point.recovered.is_some())
    }

    pub fn clamp_to(self, range: &ResolvedRange) -> Self {
        Self {
            points: self
                .points
                .into_iter()
                .filter(|point| range.contains(point.date))
                .collect(),
        }
    }

    fn without_recovered(self) -> Self {
        Self {
            points: self
                .points
                .into_iter()
                .map(|point| SeriesPoint {
                    recovered: None,
                    ..point
                })
                .collect(),
        }
    }

    pub fn chart(&self) -> ChartData {
        ChartData {
            dates: self.points.iter().map(|point| point.date).collect(),
            cases: self.points.iter().map(|point| point.cases).collect(),
            deaths: self.points.iter().map(|point| point.deaths).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChartData {
    pub dates: Vec<NaiveDate>,
    pub cases: Vec<u64>,
    pub deaths: Vec<u64>,
}

pub struct SeriesFetcher<C: DiseaseClient> {
    client: Arc<C>,
}

impl<C: DiseaseClient> SeriesFetcher<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    pub fn fetch_series(
        &self,
        scope: &Scope,
        range: &ResolvedRange,
    ) -> Result<TimeSeries, CovidError> {
        let raw = self.client.historical(scope, range.day_count)?;
        if is_not_found_message(&raw) {
            return Err(CovidError::ScopeNotFound(scope.to_string()));
        }
        let mut series = parse_series(&raw)?.clamp_to(range);
        if !scope.reports_recovered() {
            series = series.without_recovered();
        }
        if series.is_empty() {
            return Err(CovidError::EmptySeries(format!(
                "{scope} between {} and {}",
                range.start, range.end
            )));
        }
        debug!(
            scope_type = scope.scope_type(),
            name = scope.name().unwrap_or("-"),
            points = series.len(),
            first = ?series.first_date(),
            last = ?series.last_date(),
            "series normalized"
        );
        Ok(series)
    }
}

fn is_not_found_message(raw: &Value) -> bool {
    raw.as_object().is_some_and(|object| {
        object.contains_key("message")
            && !object.contains_key("timeline")
            && !object.contains_key(CASES)
    })
}

pub fn normalize(raw: &Value) -> Result<TimeSeries, CovidError> {
    let series = parse_series(raw)?;
    if series.is_empty() {
        return Err(CovidError::EmptySeries("historical payload".to_string()));
    }
    Ok(series)
}

fn parse_series(raw: &Value) -> Result<TimeSeries, CovidError> {
    match raw {
        Value::Array(records) => normalize_records(records),
        Value::Object(object) => match object.get("timeline") {
            Some(Value::Object(timeline)) => normalize_timeline(timeline),
            Some(other) => Err(CovidError::UpstreamPayload(format!(
                "timeline is not an object: {other}"
            ))),
            None => normalize_timeline(object),
        },
        other => Err(CovidError::UpstreamPayload(format!(
            "unexpected historical payload: {other}"
        ))),
    }
}

pub fn normalize_timeline(timeline: &Map<String, Value>) -> Result<TimeSeries, CovidError> {
    let cases = metric_column(timeline, CASES)?
        .ok_or_else(|| CovidError::UpstreamPayload("timeline has no cases".to_string()))?;
    let deaths = metric_column(timeline, DEATHS)?
        .ok_or_else(|| CovidError::UpstreamPayload("timeline has no deaths".to_string()))?;
    let recovered = metric_column(timeline, RECOVERED)?;

    check_same_keys(&cases, &deaths, DEATHS)?;
    if let Some(recovered) = &recovered {
        check_same_keys(&cases, recovered, RECOVERED)?;
    }

    let points = cases
        .iter()
        .map(|(date, cases)| {
            Ok(SeriesPoint {
                date: *date,
                cases: *cases,
                deaths: lookup(&deaths, *date, DEATHS)?,
                recovered: match &recovered {
                    Some(column) => Some(lookup(column, *date, RECOVERED)?),
                    None => None,
                },
            })
        })
        .collect::<Result<Vec<_>, CovidError>>()?;
    TimeSeries::from_points(points)
}

pub fn normalize_records(records: &[Value]) -> Result<TimeSeries, CovidError> {
    let mut rows = BTreeMap::<NaiveDate, SeriesPoint>::new();
    let mut with_recovered = 0usize;

    for record in records {
        let object = record.as_object().ok_or_else(|| {
            CovidError::UpstreamPayload(format!("historical record is not an object: {record}"))
        })?;
        let date_text = object.get("date").and_then(Value::as_str).ok_or_else(|| {
            CovidError::UpstreamPayload(format!("historical record without a date: {record}"))
        })?;
        let date = parse_date_key(date_text)?;

        let mut cases = None;
        let mut deaths = None;
        let mut recovered = None;
        for (key, value) in object {
            if NON_METRIC_KEYS.contains(&key.as_str()) {
                continue;
            }
            match key.as_str() {
                CASES => cases = Some(parse_count(key, value)?),
                DEATHS => deaths = Some(parse_count(key, value)?),
                RECOVERED => recovered = Some(parse_count(key, value)?),
                other => debug!(key = other, "ignoring unknown series field"),
            }
        }

        let point = SeriesPoint {
            date,
            cases: cases.ok_or_else(|| join_error(CASES, date))?,
            deaths: deaths.ok_or_else(|| join_error(DEATHS, date))?,
            recovered,
        };
        if point.recovered.is_some() {
            with_recovered += 1;
        }
        if rows.insert(date, point).is_some() {
            return Err(CovidError::UpstreamPayload(format!(
                "duplicate entry for {date}"
            )));
        }
    }

    // Recovered is either reported for every day or for none.
    if with_recovered != 0 && with_recovered != rows.len() {
        if let Some(point) = rows.values().find(|point| point.recovered.is_none()) {
            return Err(join_error(RECOVERED, point.date));
        }
    }

    TimeSeries::from_points(rows.into_values().collect())
}

fn metric_column(
    timeline: &Map<String, Value>,
    metric: &str,
) -> Result<Option<BTreeMap<NaiveDate, u64>>, CovidError> {
    let Some(value) = timeline.get(metric) else {
        return Ok(None);
    };
    let entries = value.as_object().ok_or_else(|| {
        CovidError::UpstreamPayload(format!("{metric} is not a date-keyed object"))
    })?;
    let mut column = BTreeMap::new();
    for (key, value) in entries {
        let date = parse_date_key(key)?;
        if column.insert(date, parse_count(metric, value)?).is_some() {
            return Err(CovidError::UpstreamPayload(format!(
                "duplicate {metric} entry for {date}"
            )));
        }
    }
    Ok(Some(column))
}

fn check_same_keys(
    cases: &BTreeMap<NaiveDate, u64>,
    other: &BTreeMap<NaiveDate, u64>,
    other_metric: &str,
) -> Result<(), CovidError> {
    if let Some(date) = cases.keys().find(|date| !other.contains_key(date)) {
        return Err(join_error(other_metric, *date));
    }
    if let Some(date) = other.keys().find(|date| !cases.contains_key(date)) {
        return Err(join_error(CASES, *date));
    }
    Ok(())
}

fn lookup(
    column: &BTreeMap<NaiveDate, u64>,
    date: NaiveDate,
    metric: &str,
) -> Result<u64, CovidError> {
    column
        .get(&date)
        .copied()
        .ok_or_else(|| join_error(metric, date))
}

fn join_error(metric: &str, date: NaiveDate) -> CovidError {
    CovidError::SeriesJoin {
        metric: metric.to_string(),
        date,
    }
}

pub fn parse_date_key(key: &str) -> Result<NaiveDate, CovidError> {
    let key = key.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(key, format).ok())
        .ok_or_else(|| CovidError::UpstreamPayload(format!("unparseable date key: {key}")))
}

fn parse_count(metric: &str, value: &Value) -> Result<u64, CovidError> {
    value.as_u64().ok_or_else(|| {
        CovidError::UpstreamPayload(format!("{metric} is not a non-negative integer: {value}"))
    })
}
