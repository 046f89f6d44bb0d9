//! Common functionality for energy-report.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod aggregate;
pub mod calendar;
pub mod cli;
pub mod cost;
pub mod dataset;
pub mod id;
pub mod input;
pub mod log;
pub mod output;
pub mod palette;
pub mod plot;
pub mod report;
pub mod results;
pub mod scenario;
pub mod settings;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get config dir for program.
///
/// If the platform has no config directory, the current directory is used.
pub fn get_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_default();
    path.push("energy-report");

    path
}
