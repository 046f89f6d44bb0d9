//! Code for loading program settings.
use crate::get_config_dir;
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use crate::plot::ImageFormat;
use anyhow::{Result, ensure};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# This file contains the program settings for energy-report
# Uncomment a setting to change its value
";

/// Default log level for program
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Default root folder containing time-stamped result folders
fn default_results_dir() -> PathBuf {
    PathBuf::from("result")
}

/// Default tick stride for capacity plots
fn default_xtick_stride() -> usize {
    2
}

/// Default font size for plot labels
fn default_font_size() -> u32 {
    16
}

/// Default image formats written for each figure
fn default_image_formats() -> Vec<ImageFormat> {
    vec![ImageFormat::Png, ImageFormat::Svg]
}

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    let mut path = get_config_dir();
    path.push(SETTINGS_FILE_NAME);

    path
}

/// Program settings from config file
#[derive(Debug, DocumentedFields, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// The default program log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Folder in which the solver writes its time-stamped result folders
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Only every n-th tick is labelled on the capacity axes
    #[serde(default = "default_xtick_stride")]
    pub xtick_stride: usize,
    /// Font size for axis labels and legends
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    /// Image formats to write for each figure ("png" and/or "svg")
    #[serde(default = "default_image_formats")]
    pub image_formats: Vec<ImageFormat>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            results_dir: default_results_dir(),
            xtick_stride: default_xtick_stride(),
            font_size: default_font_size(),
            image_formats: default_image_formats(),
        }
    }
}

impl Settings {
    /// Read the contents of the program settings file.
    ///
    /// If the file is not present, default values for settings will be used
    ///
    /// # Returns
    ///
    /// The program settings as a `Settings` struct or an error if the file is invalid
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    /// Read from the specified path, falling back to defaults if the file doesn't exist
    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        let settings: Settings = read_toml(file_path)?;
        settings.validate()?;

        Ok(settings)
    }

    /// Check that settings values are usable
    fn validate(&self) -> Result<()> {
        ensure!(self.xtick_stride > 0, "xtick_stride cannot be zero");
        ensure!(
            !self.image_formats.is_empty(),
            "At least one image format must be given"
        );

        Ok(())
    }

    /// The contents of the default settings file
    pub fn default_file_contents() -> String {
        // Settings object with default values set by serde
        let settings: Settings =
            toml::from_str("").expect("Cannot create settings from empty TOML file");

        // Convert to TOML
        let settings_raw = toml::to_string(&settings).expect("Could not convert settings to TOML");

        // Iterate through the generated TOML, commenting out lines and adding docs
        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        for line in settings_raw.split('\n') {
            if let Some(last) = line.find('=') {
                // Add documentation from doc comments
                let field = line[..last].trim();

                // Use doc comment to document parameter. All fields should have doc comments.
                let docs = Settings::get_field_docs(field).expect("Missing doc comment for field");
                for line in docs.split('\n') {
                    write!(&mut out, "\n# # {}\n", line.trim()).unwrap();
                }

                writeln!(&mut out, "# {}", line.trim()).unwrap();
            }
        }

        out
    }
}
