use std::path::PathBuf;

use chrono::NaiveDate;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CovidError {
    #[error("invalid date range: start {start} is not before end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("unsupported year: {year} (supported: {supported})")]
    UnsupportedYear { year: i32, supported: String },

    #[error("invalid scope: {0} (expected world, usa, country:<name> or state:<name>)")]
    InvalidScope(String),

    #[error("scope catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("unknown scope: {0} is not in the catalog")]
    UnknownScope(String),

    #[error("scope not found upstream: {0}")]
    ScopeNotFound(String),

    #[error("upstream request failed: {0}")]
    UpstreamHttp(String),

    #[error("upstream returned status {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    #[error("malformed upstream payload: {0}")]
    UpstreamPayload(String),

    #[error("no usable data points for {0}")]
    EmptySeries(String),

    #[error("series metrics do not join: {metric} has no entry for {date}")]
    SeriesJoin { metric: String, date: NaiveDate },

    #[error("series has a gap between {after} and {before}")]
    SeriesGap { after: NaiveDate, before: NaiveDate },

    #[error("no location known for {0}")]
    GeoNotFound(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),
}
