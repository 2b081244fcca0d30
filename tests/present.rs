mod common;

use std::sync::Arc;

use assert_matches::assert_matches;

use covid_dash::config::ResolvedConfig;
use covid_dash::domain::{DateRangeSelection, Scope};
use covid_dash::error::CovidError;
use covid_dash::geo::US_CENTER;
use covid_dash::present::{Dashboard, ErrorCategory, SelectionGate, Stage};

use common::{MockClient, date};

fn dashboard(client: MockClient) -> Dashboard<MockClient> {
    Dashboard::new(client, &ResolvedConfig::default())
}

#[test]
fn presents_world_with_default_range() {
    let dashboard = dashboard(MockClient::with_fixtures());
    let presentation = dashboard
        .present(&Scope::WorldAggregate, DateRangeSelection::Default, date(2020, 2, 1))
        .unwrap();

    assert_eq!(presentation.range.start, date(2020, 1, 22));
    assert_eq!(presentation.range.day_count, 10);
    assert_eq!(presentation.series.len(), 10);
    assert_eq!(presentation.chart.cases.len(), presentation.chart.deaths.len());
    assert_eq!(presentation.chart.dates.len(), 10);
    assert_eq!(presentation.snapshot.name, "Worldwide");
    assert_eq!(presentation.geo.latitude, 0.0);
    assert!(!presentation.geo_fallback);
}

#[test]
fn country_geo_reuses_snapshot_payload() {
    let client = MockClient::with_fixtures();
    let dashboard = dashboard(client);
    let presentation = dashboard
        .present(
            &Scope::Country("france".to_string()),
            DateRangeSelection::Default,
            date(2020, 2, 1),
        )
        .unwrap();

    assert_eq!(presentation.scope, Scope::Country("France".to_string()));
    assert_eq!(presentation.geo.latitude, 46.0);
    assert!(presentation.geo.flag.is_some());
}

#[test]
fn territory_falls_back_to_us_center() {
    let dashboard = dashboard(MockClient::with_fixtures());
    let presentation = dashboard
        .present(
            &Scope::UsState("Puerto Rico".to_string()),
            DateRangeSelection::Default,
            date(2020, 2, 1),
        )
        .unwrap();

    assert!(presentation.geo_fallback);
    assert_eq!(presentation.geo, US_CENTER);
    assert!(!presentation.series.has_recovered());
}

#[test]
fn us_aggregate_uses_usa_snapshot_and_fixed_center() {
    let dashboard = dashboard(MockClient::with_fixtures());
    let presentation = dashboard
        .present(&Scope::UsAggregate, DateRangeSelection::Default, date(2020, 2, 1))
        .unwrap();

    assert_eq!(presentation.snapshot.name, "USA");
    assert_eq!(presentation.snapshot.totals.cases, Some(109_724_537));
    assert_eq!(presentation.snapshot.population, Some(334_805_269));
    assert_eq!(presentation.geo, US_CENTER);
    assert!(!presentation.geo_fallback);
}

#[test]
fn centers_outage_fails_at_geo_stage() {
    let mut client = MockClient::with_fixtures();
    client.centers = None;
    let client = Arc::new(client);
    let dashboard = Dashboard::with_client(client.clone(), &ResolvedConfig::default());
    let err = dashboard
        .present(
            &Scope::UsState("Washington".to_string()),
            DateRangeSelection::Default,
            date(2020, 2, 1),
        )
        .unwrap_err();

    assert_eq!(err.stage, Stage::Geo);
    assert_eq!(err.category(), ErrorCategory::Connectivity);
    assert_matches!(err.source, CovidError::UpstreamHttp(_));
    assert_eq!(client.count("centers"), 1);
}

#[test]
fn range_errors_fail_before_any_request() {
    let client = Arc::new(MockClient::with_fixtures());
    let dashboard = Dashboard::with_client(client.clone(), &ResolvedConfig::default());
    let err = dashboard
        .present(
            &Scope::Country("France".to_string()),
            DateRangeSelection::ExplicitDate(date(2030, 1, 1)),
            date(2020, 2, 1),
        )
        .unwrap_err();

    assert_eq!(err.stage, Stage::Range);
    assert_eq!(err.category(), ErrorCategory::Range);
    assert_matches!(err.source, CovidError::InvalidRange { .. });
    assert!(client.calls().is_empty());
}

#[test]
fn unknown_scope_fails_before_fetching() {
    let client = Arc::new(MockClient::with_fixtures());
    let dashboard = Dashboard::with_client(client.clone(), &ResolvedConfig::default());
    let err = dashboard
        .present(
            &Scope::Country("Wakanda".to_string()),
            DateRangeSelection::Default,
            date(2020, 2, 1),
        )
        .unwrap_err();

    assert_eq!(err.stage, Stage::Catalog);
    assert_eq!(err.category(), ErrorCategory::Scope);
    assert_eq!(client.calls(), vec!["countries".to_string()]);
}

#[test]
fn stale_catalog_surfaces_snapshot_not_found() {
    let client = MockClient::with_fixtures();
    *client.countries.lock().unwrap() =
        Some(serde_json::json!([{ "country": "Germany" }, { "country": "France" }]));
    let dashboard = dashboard(client);
    let err = dashboard
        .present(
            &Scope::Country("Germany".to_string()),
            DateRangeSelection::Default,
            date(2020, 2, 1),
        )
        .unwrap_err();

    assert_eq!(err.stage, Stage::Snapshot);
    assert_matches!(err.source, CovidError::ScopeNotFound(_));
}

#[test]
fn series_failures_are_tagged_with_series_stage() {
    let mut client = MockClient::with_fixtures();
    client.historical.insert(
        "usa".to_string(),
        serde_json::json!({
            "country": "USA",
            "timeline": {
                "cases": { "1/22/20": 1, "1/23/20": 1 },
                "deaths": { "1/23/20": 0, "1/22/20": 0, "1/24/20": 0 }
            }
        }),
    );
    let dashboard = dashboard(client);
    let err = dashboard
        .present(&Scope::UsAggregate, DateRangeSelection::Default, date(2020, 2, 1))
        .unwrap_err();

    assert_eq!(err.stage, Stage::Series);
    assert_eq!(err.category(), ErrorCategory::Data);
    assert_matches!(err.source, CovidError::SeriesJoin { .. });
}

#[test]
fn catalog_outage_does_not_block_aggregates() {
    let client = MockClient::with_fixtures();
    *client.countries.lock().unwrap() = None;
    *client.states.lock().unwrap() = None;
    let dashboard = dashboard(client);
    assert!(
        dashboard
            .present(&Scope::UsAggregate, DateRangeSelection::Default, date(2020, 2, 1))
            .is_ok()
    );
    let err = dashboard
        .present(
            &Scope::UsState("Washington".to_string()),
            DateRangeSelection::Default,
            date(2020, 2, 1),
        )
        .unwrap_err();
    assert_eq!(err.stage, Stage::Catalog);
    assert_eq!(err.category(), ErrorCategory::Connectivity);
}

#[test]
fn superseded_selection_is_discarded() {
    let gate = Arc::new(SelectionGate::default());
    let mut client = MockClient::with_fixtures();
    let newer = gate.clone();
    client.on_snapshot = Some(Box::new(move || {
        newer.issue();
    }));
    let dashboard = dashboard(client);

    let result = dashboard
        .present_latest(&gate, &Scope::WorldAggregate, DateRangeSelection::Default, date(2020, 2, 1))
        .unwrap();
    assert!(result.is_none());
}

#[test]
fn latest_selection_is_kept() {
    let gate = SelectionGate::default();
    let dashboard = dashboard(MockClient::with_fixtures());
    let result = dashboard
        .present_latest(&gate, &Scope::WorldAggregate, DateRangeSelection::Default, date(2020, 2, 1))
        .unwrap();
    assert!(result.is_some());
}
