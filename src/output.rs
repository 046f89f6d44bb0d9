//! The module responsible for writing report files to disk.
use crate::aggregate::capacity::CapacityTables;
use crate::aggregate::flow::FlowTables;
use crate::calendar::PeriodKind;
use crate::id::{CommodityID, SiteID};
use crate::results::{CapacityPair, FlowSide};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix of all report file names
const REPORT_FILE_PREFIX: &str = "scenario";

/// Name used in place of a site when capacities of all sites are summed
const ALL_SITES: &str = "all";

/// Create a new output directory, if it does not already exist
pub fn create_output_directory(output_dir: &Path) -> Result<()> {
    if output_dir.is_dir() {
        // already exists
        return Ok(());
    }

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(())
}

/// Replace characters which are not safe in file names with underscores
pub fn sanitise_file_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Names the files of the report for one scenario
#[derive(Debug, Clone, PartialEq)]
pub struct ReportNamer {
    output_dir: PathBuf,
    scenario: String,
}

impl ReportNamer {
    /// Create a new [`ReportNamer`]
    pub fn new(output_dir: &Path, scenario: &str) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            scenario: sanitise_file_name(scenario),
        }
    }

    /// Join name parts into a path in the output directory, without an extension
    fn stem<'a, I>(&self, parts: I) -> PathBuf
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut name = format!("{REPORT_FILE_PREFIX}_{}", self.scenario);
        for part in parts {
            name.push('_');
            name.push_str(&sanitise_file_name(part));
        }

        self.output_dir.join(name)
    }

    /// The stem for the capacity chart (e.g. `scenario_base_Mid`)
    pub fn capacity_stem(&self, site: Option<&SiteID>) -> PathBuf {
        self.stem([site.map_or(ALL_SITES, SiteID::as_str)])
    }

    /// The stem for a whole-year pie chart (e.g. `scenario_base_Mid_Elec_year_production`)
    pub fn year_stem(&self, site: &SiteID, demand: &CommodityID, side: FlowSide) -> PathBuf {
        let side = side.to_string();
        self.stem([site.as_str(), demand.as_str(), "year", &side])
    }

    /// The stem for a chart of flows per period (e.g. `scenario_base_Mid_Elec_month_consumption`)
    pub fn period_stem(
        &self,
        site: &SiteID,
        demand: &CommodityID,
        kind: PeriodKind,
        side: FlowSide,
    ) -> PathBuf {
        let side = side.to_string();
        self.stem([site.as_str(), demand.as_str(), kind.name(), &side])
    }

    /// The path of a CSV file in the output directory.
    ///
    /// The extension is appended, as the scenario name may itself contain dots.
    fn csv_path(&self, name: &str) -> PathBuf {
        let mut path = self.stem([name]).into_os_string();
        path.push(".csv");
        path.into()
    }

    /// The path of the capacity summary CSV file
    pub fn capacities_csv(&self) -> PathBuf {
        self.csv_path("capacities")
    }

    /// The path of the flow summary CSV file
    pub fn flows_csv(&self) -> PathBuf {
        self.csv_path("flows")
    }
}

/// Represents a row of the capacity summary CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CapacityRow {
    technology: String,
    group: String,
    dimension: String,
    total: f64,
    new: f64,
    installed: f64,
}

impl CapacityRow {
    /// Create a new [`CapacityRow`]
    fn new(technology: &str, group: &str, dimension: &str, capacity: CapacityPair) -> Self {
        Self {
            technology: technology.to_string(),
            group: group.to_string(),
            dimension: dimension.to_string(),
            total: capacity.total,
            new: capacity.new,
            installed: capacity.installed(),
        }
    }
}

/// Represents a row of the flow summary CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct FlowRow {
    site: SiteID,
    demand: CommodityID,
    direction: String,
    label: String,
    period: String,
    value: f64,
}

/// Write the capacity tables to a CSV file
pub fn write_capacity_summary(path: &Path, tables: &CapacityTables) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for (name, capacity) in &tables.processes {
        writer.serialize(CapacityRow::new(name, "process", "power", *capacity))?;
    }
    for (name, capacity) in &tables.storages {
        writer.serialize(CapacityRow::new(name, "storage", "power", capacity.power))?;
        writer.serialize(CapacityRow::new(name, "storage", "energy", capacity.energy))?;
    }
    writer.flush()?;

    Ok(())
}

/// Write the flow tables to a CSV file
pub fn write_flow_summary(path: &Path, flows: &FlowTables) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for table in flows.values() {
        for (key, value) in table.records() {
            writer.serialize(FlowRow {
                site: table.site.clone(),
                demand: table.demand.clone(),
                direction: key.direction.to_string(),
                label: key.label.to_string(),
                period: key.period.label(),
                value,
            })?;
        }
    }
    writer
        .flush()
        .with_context(|| format!("Could not write {}", path.display()))?;

    Ok(())
}
