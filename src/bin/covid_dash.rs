use std::process::ExitCode;

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use covid_dash::config::ConfigLoader;
use covid_dash::disease::DiseaseHttpClient;
use covid_dash::domain::{DateRangeSelection, Scope};
use covid_dash::error::CovidError;
use covid_dash::output::{JsonOutput, OutputMode};
use covid_dash::present::{Dashboard, ErrorCategory, PresentError, Stage};
use covid_dash::tui::Tui;

#[derive(Parser)]
#[command(name = "covid-dash")]
#[command(about = "COVID-19 statistics dashboards for the world, countries and US states")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "List country names accepted as country:<name>")]
    Countries,
    #[command(about = "List US state names accepted as state:<name>")]
    States,
    #[command(about = "Show current totals for a scope")]
    Snapshot(ScopeArgs),
    #[command(about = "Show the daily historical series for a scope")]
    Series(ShowArgs),
    #[command(about = "Show the map location of a scope")]
    Locate(ScopeArgs),
    #[command(about = "Open the dashboard for a scope (default: world)")]
    Show(ShowArgs),
}

#[derive(Args, Clone)]
struct ScopeArgs {
    /// world, usa, country:<name> or state:<name>
    scope: String,
}

#[derive(Args, Clone)]
struct ShowArgs {
    /// world, usa, country:<name> or state:<name>
    #[arg(default_value = "world")]
    scope: String,

    /// Start date (YYYY-MM-DD); defaults to all available data
    #[arg(long, conflicts_with = "year")]
    since: Option<NaiveDate>,

    /// Start from January 1 of this year
    #[arg(long)]
    year: Option<i32>,
}

impl ShowArgs {
    fn selection(&self) -> DateRangeSelection {
        match (self.since, self.year) {
            (Some(date), _) => DateRangeSelection::ExplicitDate(date),
            (None, Some(year)) => DateRangeSelection::ExplicitYear(year),
            (None, None) => DateRangeSelection::Default,
        }
    }
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<PresentError>() {
            return ExitCode::from(map_category(error.category()));
        }
        if let Some(error) = report.downcast_ref::<CovidError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_category(category: ErrorCategory) -> u8 {
    match category {
        ErrorCategory::Scope | ErrorCategory::Range | ErrorCategory::Configuration => 2,
        ErrorCategory::Connectivity => 3,
        ErrorCategory::Data => 4,
    }
}

fn map_exit_code(error: &CovidError) -> u8 {
    match error {
        CovidError::InvalidRange { .. }
        | CovidError::UnsupportedYear { .. }
        | CovidError::InvalidScope(_)
        | CovidError::UnknownScope(_)
        | CovidError::ScopeNotFound(_)
        | CovidError::ConfigRead(_)
        | CovidError::ConfigParse(_) => 2,
        CovidError::CatalogUnavailable(_)
        | CovidError::UpstreamHttp(_)
        | CovidError::UpstreamStatus { .. } => 3,
        CovidError::UpstreamPayload(_)
        | CovidError::EmptySeries(_)
        | CovidError::SeriesJoin { .. }
        | CovidError::SeriesGap { .. }
        | CovidError::GeoNotFound(_) => 4,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let client = DiseaseHttpClient::new(&config)?;
    let dashboard = Dashboard::new(client, &config);
    let today = Local::now().date_naive();

    let command = cli.command.unwrap_or(Command::Show(ShowArgs {
        scope: "world".to_string(),
        since: None,
        year: None,
    }));

    match command {
        Command::Countries => {
            let names = dashboard.catalog().countries_or_empty();
            JsonOutput::print_names(&names).into_diagnostic()
        }
        Command::States => {
            let names = dashboard.catalog().us_states_or_empty();
            JsonOutput::print_names(&names).into_diagnostic()
        }
        Command::Snapshot(args) => {
            let scope = validated_scope(&dashboard, &args.scope)?;
            let snapshot = dashboard
                .snapshots()
                .fetch_snapshot(&scope)
                .map_err(|err| PresentError::new(Stage::Snapshot, err))?;
            JsonOutput::print_snapshot(&snapshot).into_diagnostic()
        }
        Command::Series(args) => {
            let scope: Scope = args.scope.parse()?;
            let (scope, range) = dashboard.prepare(&scope, args.selection(), today)?;
            let series = dashboard
                .series()
                .fetch_series(&scope, &range)
                .map_err(|err| PresentError::new(Stage::Series, err))?;
            JsonOutput::print_series(&series).into_diagnostic()
        }
        Command::Locate(args) => {
            let scope = validated_scope(&dashboard, &args.scope)?;
            let point = match dashboard.geo().locate(&scope) {
                Ok(point) => point,
                Err(CovidError::GeoNotFound(name)) => {
                    warn!("no location for {name}, using fallback center");
                    dashboard.fallback_center().clone()
                }
                Err(err) => return Err(PresentError::new(Stage::Geo, err).into()),
            };
            JsonOutput::print_geo(&point).into_diagnostic()
        }
        Command::Show(args) => {
            let scope: Scope = args.scope.parse()?;
            let presentation = match dashboard.present(&scope, args.selection(), today) {
                Ok(presentation) => presentation,
                Err(err) => {
                    if matches!(output_mode, OutputMode::NonInteractive) {
                        JsonOutput::print_error(&err).into_diagnostic()?;
                    }
                    return Err(err.into());
                }
            };
            match output_mode {
                OutputMode::NonInteractive => {
                    JsonOutput::print_presentation(&presentation).into_diagnostic()
                }
                OutputMode::Interactive => Tui::new(&presentation).run(),
            }
        }
    }
}

fn validated_scope<C>(dashboard: &Dashboard<C>, raw: &str) -> miette::Result<Scope>
where
    C: covid_dash::disease::DiseaseClient,
{
    let scope: Scope = raw.parse()?;
    let scope = dashboard
        .catalog()
        .validate(&scope)
        .map_err(|err| PresentError::new(Stage::Catalog, err))?;
    Ok(scope)
}
