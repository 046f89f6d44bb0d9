//! Build summary tables from the results of a solved model.
use crate::id::{CommodityID, SiteID};
use crate::results::{ResultSource, ResultStore, SitePair};
use anyhow::{Context, Result};
use log::{debug, info, warn};

pub mod capacity;
pub mod flow;
use capacity::{CapacityTables, aggregate_capacities};
use flow::{FlowTable, FlowTables};

/// Options controlling which results are summarised
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateOptions {
    /// Only summarise capacities at this site
    pub site: Option<SiteID>,
    /// Technologies to leave out of the capacity tables
    pub exclude: Vec<String>,
    /// The (site, demand) pairs to summarise flows for. If `None`, all pairs are used.
    pub pairs: Option<Vec<SitePair>>,
}

/// Read results and build the capacity and flow tables
pub fn aggregate(
    source: ResultSource,
    options: &AggregateOptions,
) -> Result<(CapacityTables, FlowTables)> {
    let mut store = source.open()?;
    aggregate_store(store.as_mut(), options)
}

/// Build the capacity and flow tables from an open result store
pub fn aggregate_store(
    store: &mut dyn ResultStore,
    options: &AggregateOptions,
) -> Result<(CapacityTables, FlowTables)> {
    let processes = store
        .process_capacities()
        .context("Failed to read process capacities")?;
    let storages = store
        .storage_capacities()
        .context("Failed to read storage capacities")?;
    let capacities = aggregate_capacities(
        processes.as_deref(),
        storages.as_deref(),
        options.site.as_ref(),
        &options.exclude,
    );
    debug!(
        "Aggregated capacities of {} processes and {} storages",
        capacities.processes.len(),
        capacities.storages.len()
    );

    let pairs = options
        .pairs
        .clone()
        .unwrap_or_else(|| store.timeseries_pairs());
    let flows = pairs
        .into_iter()
        .map(|(site, demand)| {
            let table = aggregate_pair(store, site.clone(), demand.clone());
            ((site, demand), table)
        })
        .collect();

    Ok((capacities, flows))
}

/// Build the flow table for one pair.
///
/// Missing or malformed time series give an empty table.
fn aggregate_pair(
    store: &mut dyn ResultStore,
    site: SiteID,
    demand: CommodityID,
) -> FlowTable {
    match store.timeseries(&site, &demand) {
        Ok(Some(series)) => FlowTable::from_timeseries(site, demand, &series),
        Ok(None) => {
            info!("No time series for {demand} at {site}");
            FlowTable::empty(site, demand)
        }
        Err(err) => {
            warn!("Skipping flows of {demand} at {site}: {err:#}");
            FlowTable::empty(site, demand)
        }
    }
}
