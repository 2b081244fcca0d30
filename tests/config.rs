use std::fs;
use std::time::Duration;

use assert_matches::assert_matches;

use covid_dash::config::ConfigLoader;
use covid_dash::error::CovidError;

#[test]
fn reads_explicit_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("dash.json");
    fs::write(
        &path,
        r#"{
            "schema_version": 1,
            "base_url": "http://localhost:3000/v3/covid-19/",
            "timeout_secs": 5,
            "supported_years": [2021, 2022, 2023],
            "fallback_center": { "latitude": 0.0, "longitude": 0.0 }
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    if std::env::var(covid_dash::config::BASE_URL_ENV).is_err() {
        assert_eq!(resolved.base_url, "http://localhost:3000/v3/covid-19");
    }
    assert_eq!(resolved.timeout, Duration::from_secs(5));
    assert_eq!(resolved.supported_years, vec![2021, 2022, 2023]);
    assert_eq!(resolved.fallback_center.latitude, 0.0);
}

#[test]
fn explicit_path_must_exist() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("missing.json");
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(CovidError::ConfigRead(_))
    );
}

#[test]
fn malformed_config_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("dash.json");
    fs::write(&path, r#"{ "timeout_secs": "soon" }"#).unwrap();
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(CovidError::ConfigParse(_))
    );
}

#[test]
fn out_of_range_fallback_center_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("dash.json");
    fs::write(
        &path,
        r#"{ "fallback_center": { "latitude": 123.0, "longitude": 0.0 } }"#,
    )
    .unwrap();
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(CovidError::ConfigParse(_))
    );
}
