use std::collections::BTreeSet;
use std::io::{self, Write};

use serde::Serialize;

use crate::domain::GeoPoint;
use crate::present::{ErrorCategory, PresentError, Presentation, Stage};
use crate::series::TimeSeries;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

#[derive(Debug, Serialize)]
struct ErrorReport {
    stage: Stage,
    category: ErrorCategory,
    message: String,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_names(names: &BTreeSet<String>) -> io::Result<()> {
        Self::print_json(names)
    }

    pub fn print_snapshot(snapshot: &Snapshot) -> io::Result<()> {
        Self::print_json(snapshot)
    }

    pub fn print_series(series: &TimeSeries) -> io::Result<()> {
        Self::print_json(series)
    }

    pub fn print_geo(point: &GeoPoint) -> io::Result<()> {
        Self::print_json(point)
    }

    pub fn print_presentation(presentation: &Presentation) -> io::Result<()> {
        Self::print_json(presentation)
    }

    pub fn print_error(error: &PresentError) -> io::Result<()> {
        Self::print_json(&ErrorReport {
            stage: error.stage,
            category: error.category(),
            message: error.user_message(),
        })
    }

    fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
