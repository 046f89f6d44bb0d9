//! Finding result files written by a batch of model runs.
use anyhow::{Context, Result, ensure};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use strum::Display;

/// Prefix of the names of result files
const RESULT_FILE_PREFIX: &str = "scenario_";

/// The kind of container results are stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ResultFileType {
    /// HDF5 container
    Hdf5,
    /// Spreadsheet workbook
    Xlsx,
}

impl ResultFileType {
    /// The file extension for this type
    pub fn extension(self) -> &'static str {
        match self {
            Self::Hdf5 => "h5",
            Self::Xlsx => "xlsx",
        }
    }
}

/// Find the most recently modified subdirectory of `root`
pub fn most_recent_entry(root: &Path) -> Result<PathBuf> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    let entries = fs::read_dir(root)
        .with_context(|| format!("Could not read results directory {}", root.display()))?;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().is_none_or(|(time, _)| modified > *time) {
            newest = Some((modified, entry.path()));
        }
    }

    newest
        .map(|(_, path)| path)
        .with_context(|| format!("No result directories found in {}", root.display()))
}

/// List the result files of one type in `folder`, sorted by name
fn list_result_files(folder: &Path, file_type: ResultFileType) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        let matches = path.is_file()
            && path.extension().is_some_and(|ext| ext == file_type.extension())
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(RESULT_FILE_PREFIX));
        if matches {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

/// Find the result files in `folder`.
///
/// HDF5 containers are preferred. If there are none, spreadsheet reports are used instead.
pub fn glob_result_files(folder: &Path) -> Result<(Vec<PathBuf>, ResultFileType)> {
    let context = || format!("Could not list result files in {}", folder.display());

    let files = list_result_files(folder, ResultFileType::Hdf5).with_context(context)?;
    if !files.is_empty() {
        return Ok((files, ResultFileType::Hdf5));
    }

    let files = list_result_files(folder, ResultFileType::Xlsx).with_context(context)?;
    ensure!(
        !files.is_empty(),
        "No result files found in {}",
        folder.display()
    );

    Ok((files, ResultFileType::Xlsx))
}

/// The scenario name for a result file (e.g. "co2_limit" for "scenario_co2_limit.h5")
pub fn scenario_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();

    stem.strip_prefix(RESULT_FILE_PREFIX)
        .unwrap_or(&stem)
        .to_string()
}
