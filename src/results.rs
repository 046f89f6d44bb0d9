//! Raw results of a solved model, as read from a solved-model handle or a persisted container.
use crate::id::{CommodityID, SiteID};
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;
use std::rc::Rc;
use strum::Display;
use unicase::UniCase;

pub mod discovery;
pub mod workbook;
use workbook::open_result_file;

/// Values of new capacity this far outside the valid range are clamped rather than rejected
const CAPACITY_TOLERANCE: f64 = 1e-6;

/// A (site, demand commodity) pair for which flows are reported
pub type SitePair = (SiteID, CommodityID);

/// The direction of a commodity flow, relative to a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize)]
pub enum FlowDirection {
    /// Created by a process at the site
    Produced,
    /// Consumed by a process at the site
    Consumed,
    /// Imported from another site
    Imported,
    /// Exported to another site
    Exported,
}

impl FlowDirection {
    /// Interpret a column group header from a time series sheet.
    ///
    /// Returns `None` for groups which are not flows (e.g. demand or storage levels).
    pub fn from_header(header: &str) -> Option<Self> {
        let header = UniCase::new(header.trim());
        [
            ("Created", Self::Produced),
            ("Produced", Self::Produced),
            ("Consumed", Self::Consumed),
            ("Import", Self::Imported),
            ("Imported", Self::Imported),
            ("Export", Self::Exported),
            ("Exported", Self::Exported),
        ]
        .into_iter()
        .find_map(|(name, direction)| (UniCase::new(name) == header).then_some(direction))
    }

    /// Which side of the commodity balance this flow is on
    pub fn side(self) -> FlowSide {
        match self {
            Self::Produced | Self::Imported => FlowSide::Production,
            Self::Consumed | Self::Exported => FlowSide::Consumption,
        }
    }
}

/// One side of a commodity balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum FlowSide {
    /// Production and imports
    Production,
    /// Consumption and exports
    Consumption,
}

impl FlowSide {
    /// The flow directions on this side of the balance
    pub fn directions(self) -> [FlowDirection; 2] {
        match self {
            Self::Production => [FlowDirection::Produced, FlowDirection::Imported],
            Self::Consumption => [FlowDirection::Consumed, FlowDirection::Exported],
        }
    }
}

/// Installed and newly built capacity
#[derive(Debug, Clone, Copy, Default, PartialEq, derive_more::Add, Serialize)]
pub struct CapacityPair {
    /// Total installed capacity, including new capacity
    pub total: f64,
    /// Capacity built in this model run
    pub new: f64,
}

impl CapacityPair {
    /// Create a new [`CapacityPair`], checking that `total >= new >= 0`.
    ///
    /// Values slightly outside this range because of solver tolerances are clamped.
    pub fn new(total: f64, new: f64) -> Result<Self> {
        ensure!(
            total.is_finite() && new.is_finite(),
            "Capacities must be finite numbers"
        );
        ensure!(
            new >= -CAPACITY_TOLERANCE && new <= total + CAPACITY_TOLERANCE,
            "New capacity ({new}) must be between zero and total capacity ({total})"
        );
        let new = new.max(0.0);

        Ok(Self {
            total: total.max(new),
            new,
        })
    }

    /// The capacity which existed before this model run
    pub fn installed(&self) -> f64 {
        self.total - self.new
    }
}

/// Capacity of a process at a site
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessCapacity {
    /// The site of the process
    pub site: SiteID,
    /// The process name
    pub process: Rc<str>,
    /// Power capacity
    pub power: CapacityPair,
}

/// Capacity of a storage at a site
#[derive(Debug, Clone, PartialEq)]
pub struct StorageCapacity {
    /// The site of the storage
    pub site: SiteID,
    /// The storage type
    pub storage: Rc<str>,
    /// The stored commodity
    pub commodity: CommodityID,
    /// Power (charge/discharge) capacity
    pub power: CapacityPair,
    /// Energy (content) capacity
    pub energy: CapacityPair,
}

/// A single flow column of a time series
#[derive(Debug, Clone, PartialEq)]
pub struct FlowColumn {
    /// The direction of the flow
    pub direction: FlowDirection,
    /// What the flow comes from or goes to (e.g. a process or another site)
    pub label: Rc<str>,
    /// One value per timestep
    pub values: Vec<f64>,
}

/// Flows of a demand commodity at a site, for each timestep
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    timesteps: Vec<u32>,
    columns: Vec<FlowColumn>,
}

impl TimeSeries {
    /// Create a new [`TimeSeries`], checking that every column has one value per timestep
    pub fn new(timesteps: Vec<u32>, columns: Vec<FlowColumn>) -> Result<Self> {
        for column in &columns {
            ensure!(
                column.values.len() == timesteps.len(),
                "Column {} ({}) has {} values but there are {} timesteps",
                column.label,
                column.direction,
                column.values.len(),
                timesteps.len()
            );
        }

        Ok(Self { timesteps, columns })
    }

    /// The timesteps of the series
    pub fn timesteps(&self) -> &[u32] {
        &self.timesteps
    }

    /// The flow columns of the series
    pub fn columns(&self) -> &[FlowColumn] {
        &self.columns
    }
}

/// Somewhere results of a solved model can be read from.
///
/// Lookups return `Ok(None)` when the requested table is absent, which is not an error.
pub trait ResultStore {
    /// Capacities of processes at every site
    fn process_capacities(&mut self) -> Result<Option<Vec<ProcessCapacity>>>;

    /// Capacities of storages at every site
    fn storage_capacities(&mut self) -> Result<Option<Vec<StorageCapacity>>>;

    /// The flow time series for a demand commodity at a site
    fn timeseries(&mut self, site: &SiteID, demand: &CommodityID) -> Result<Option<TimeSeries>>;

    /// All (site, demand) pairs with a time series
    fn timeseries_pairs(&mut self) -> Vec<SitePair>;
}

/// Results held in memory, as produced by a solver run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResults {
    /// Process capacities, if reported
    pub process_capacities: Option<Vec<ProcessCapacity>>,
    /// Storage capacities, if reported
    pub storage_capacities: Option<Vec<StorageCapacity>>,
    /// Flow time series for each (site, demand) pair
    pub timeseries: IndexMap<SitePair, TimeSeries>,
}

impl ResultStore for ModelResults {
    fn process_capacities(&mut self) -> Result<Option<Vec<ProcessCapacity>>> {
        Ok(self.process_capacities.clone())
    }

    fn storage_capacities(&mut self) -> Result<Option<Vec<StorageCapacity>>> {
        Ok(self.storage_capacities.clone())
    }

    fn timeseries(&mut self, site: &SiteID, demand: &CommodityID) -> Result<Option<TimeSeries>> {
        Ok(self.timeseries.get(&(site.clone(), demand.clone())).cloned())
    }

    fn timeseries_pairs(&mut self) -> Vec<SitePair> {
        self.timeseries.keys().cloned().collect()
    }
}

/// Where results for a report come from
#[derive(Debug)]
pub enum ResultSource {
    /// A solved model held in memory
    Model(ModelResults),
    /// A persisted result container
    File(PathBuf),
}

impl ResultSource {
    /// Choose a result source.
    ///
    /// Exactly one of `model` and `result_file` must be given.
    pub fn new(model: Option<ModelResults>, result_file: Option<PathBuf>) -> Result<Self> {
        match (model, result_file) {
            (Some(model), None) => Ok(Self::Model(model)),
            (None, Some(path)) => Ok(Self::File(path)),
            (Some(_), Some(_)) => {
                bail!("Specify either a solved model or a result file, not both")
            }
            (None, None) => bail!("Specify either a solved model or a result file"),
        }
    }

    /// Open the source for reading
    pub fn open(self) -> Result<Box<dyn ResultStore>> {
        match self {
            Self::Model(model) => Ok(Box::new(model)),
            Self::File(path) => open_result_file(&path)
                .with_context(|| format!("Could not open result file {}", path.display())),
        }
    }
}
