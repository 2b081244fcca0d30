pub mod catalog;
pub mod config;
pub mod disease;
pub mod domain;
pub mod error;
pub mod geo;
pub mod output;
pub mod present;
pub mod range;
pub mod series;
pub mod snapshot;
pub mod tui;
