use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use chrono::NaiveDate;
use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::ScopeCatalog;
use crate::config::ResolvedConfig;
use crate::disease::DiseaseClient;
use crate::domain::{DateRangeSelection, GeoPoint, ResolvedRange, Scope};
use crate::error::CovidError;
use crate::geo::{self, GeoLocator};
use crate::range::RangeResolver;
use crate::series::{ChartData, SeriesFetcher, TimeSeries};
use crate::snapshot::{Snapshot, SnapshotFetcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Range,
    Catalog,
    Snapshot,
    Series,
    Geo,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Range => write!(f, "date range"),
            Stage::Catalog => write!(f, "scope catalog"),
            Stage::Snapshot => write!(f, "snapshot fetch"),
            Stage::Series => write!(f, "series fetch"),
            Stage::Geo => write!(f, "geo lookup"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Scope,
    Range,
    Connectivity,
    Data,
    Configuration,
}

#[derive(Debug, Error, Diagnostic)]
#[error("{stage} failed")]
pub struct PresentError {
    pub stage: Stage,
    #[source]
    pub source: CovidError,
}

impl PresentError {
    pub fn new(stage: Stage, source: CovidError) -> Self {
        Self { stage, source }
    }

    pub fn category(&self) -> ErrorCategory {
        match &self.source {
            CovidError::InvalidRange { .. } | CovidError::UnsupportedYear { .. } => {
                ErrorCategory::Range
            }
            CovidError::InvalidScope(_)
            | CovidError::UnknownScope(_)
            | CovidError::ScopeNotFound(_) => ErrorCategory::Scope,
            CovidError::CatalogUnavailable(_)
            | CovidError::UpstreamHttp(_)
            | CovidError::UpstreamStatus { .. } => ErrorCategory::Connectivity,
            CovidError::UpstreamPayload(_)
            | CovidError::EmptySeries(_)
            | CovidError::SeriesJoin { .. }
            | CovidError::SeriesGap { .. }
            | CovidError::GeoNotFound(_) => ErrorCategory::Data,
            CovidError::ConfigRead(_) | CovidError::ConfigParse(_) => {
                ErrorCategory::Configuration
            }
        }
    }

    pub fn user_message(&self) -> String {
        let hint = match self.category() {
            ErrorCategory::Scope => "check the country or state name",
            ErrorCategory::Range => "pick a start date before today or a supported year",
            ErrorCategory::Connectivity => "the statistics service could not be reached, try again",
            ErrorCategory::Data => "the statistics service returned unusable data",
            ErrorCategory::Configuration => "fix the configuration file",
        };
        format!("{}: {} ({hint})", self.stage, self.source)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Presentation {
    pub scope: Scope,
    pub range: ResolvedRange,
    pub snapshot: Snapshot,
    pub series: TimeSeries,
    pub chart: ChartData,
    pub geo: GeoPoint,
    pub geo_fallback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
pub struct SelectionGate {
    latest: AtomicU64,
}

impl SelectionGate {
    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

pub struct Dashboard<C: DiseaseClient> {
    resolver: RangeResolver,
    catalog: ScopeCatalog<C>,
    snapshots: SnapshotFetcher<C>,
    series: SeriesFetcher<C>,
    geo: GeoLocator<C>,
    fallback_center: GeoPoint,
}

impl<C: DiseaseClient> Dashboard<C> {
    pub fn new(client: C, config: &ResolvedConfig) -> Self {
        Self::with_client(Arc::new(client), config)
    }

    pub fn with_client(client: Arc<C>, config: &ResolvedConfig) -> Self {
        Self {
            resolver: RangeResolver::new(config.supported_years.clone()),
            catalog: ScopeCatalog::new(client.clone()),
            snapshots: SnapshotFetcher::new(client.clone()),
            series: SeriesFetcher::new(client.clone()),
            geo: GeoLocator::new(client),
            fallback_center: config.fallback_center.clone(),
        }
    }

    pub fn resolver(&self) -> &RangeResolver {
        &self.resolver
    }

    pub fn catalog(&self) -> &ScopeCatalog<C> {
        &self.catalog
    }

    pub fn snapshots(&self) -> &SnapshotFetcher<C> {
        &self.snapshots
    }

    pub fn series(&self) -> &SeriesFetcher<C> {
        &self.series
    }

    pub fn geo(&self) -> &GeoLocator<C> {
        &self.geo
    }

    pub fn fallback_center(&self) -> &GeoPoint {
        &self.fallback_center
    }

    pub fn prepare(
        &self,
        scope: &Scope,
        selection: DateRangeSelection,
        today: NaiveDate,
    ) -> Result<(Scope, ResolvedRange), PresentError> {
        let range = self
            .resolver
            .resolve(selection, today)
            .map_err(|err| PresentError::new(Stage::Range, err))?;
        let scope = self
            .catalog
            .validate(scope)
            .map_err(|err| PresentError::new(Stage::Catalog, err))?;
        Ok((scope, range))
    }

    pub fn present(
        &self,
        scope: &Scope,
        selection: DateRangeSelection,
        today: NaiveDate,
    ) -> Result<Presentation, PresentError> {
        let (scope, range) = self.prepare(scope, selection, today)?;

        let (snapshot, series, located) = thread::scope(|s| {
            let snapshot = s.spawn(|| self.snapshots.fetch_snapshot(&scope));
            let series = s.spawn(|| self.series.fetch_series(&scope, &range));
            // Country coordinates ride along in the snapshot payload.
            let located = match &scope {
                Scope::Country(_) => None,
                _ => Some(s.spawn(|| self.geo.locate(&scope))),
            };
            (
                join_worker(snapshot),
                join_worker(series),
                located.map(join_worker),
            )
        });

        let snapshot = snapshot.map_err(|err| PresentError::new(Stage::Snapshot, err))?;
        let series = series.map_err(|err| PresentError::new(Stage::Series, err))?;
        let located = match located {
            Some(result) => result,
            None => geo::from_snapshot(&scope, &snapshot),
        };
        let (geo, geo_fallback) = match located {
            Ok(point) => (point, false),
            Err(CovidError::GeoNotFound(name)) => {
                warn!("no location for {name}, using fallback center");
                (self.fallback_center.clone(), true)
            }
            Err(err) => return Err(PresentError::new(Stage::Geo, err)),
        };

        Ok(Presentation {
            chart: series.chart(),
            scope,
            range,
            snapshot,
            series,
            geo,
            geo_fallback,
        })
    }

    pub fn present_latest(
        &self,
        gate: &SelectionGate,
        scope: &Scope,
        selection: DateRangeSelection,
        today: NaiveDate,
    ) -> Result<Option<Presentation>, PresentError> {
        let ticket = gate.issue();
        let result = self.present(scope, selection, today);
        if !gate.is_current(ticket) {
            debug!(scope = %scope, "discarding superseded selection");
            return Ok(None);
        }
        result.map(Some)
    }
}

fn join_worker<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    match handle.join() {
        Ok(value) => value,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}
