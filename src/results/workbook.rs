//! Reading results from the spreadsheet report of a solved model.
use super::{
    CapacityPair, FlowColumn, FlowDirection, ProcessCapacity, ResultStore, SitePair,
    StorageCapacity, TimeSeries,
};
use crate::id::{CommodityID, SiteID};
use crate::input::input_err_msg;
use anyhow::{Context, Result, anyhow, bail, ensure};
use calamine::{Data, Reader, Sheets};
use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, warn};
use std::io::{Read, Seek};
use std::path::Path;
use unicase::UniCase;

/// The name of the sheet with process capacities
pub const PROCESS_CAPACITY_SHEET: &str = "Process caps";

/// The name of the sheet with storage capacities
pub const STORAGE_CAPACITY_SHEET: &str = "Storage caps";

/// The name of the sheet with whole-year sums per (site, demand) pair
pub const COMMODITY_SUMS_SHEET: &str = "Commodity sums";

/// Number of index columns (direction and label) in the commodity sums sheet
const COMMODITY_SUMS_INDEX_LEVELS: usize = 2;

/// Suffix of the names of time series sheets
const TIMESERIES_SUFFIX: &str = " timeseries";

/// The maximum length of a sheet name
const MAX_SHEET_NAME_LENGTH: usize = 31;

/// A table of cells, one row per entry
pub type Cells = Vec<Vec<Data>>;

/// A source of named sheets of cells
pub trait SheetSource {
    /// The names of all sheets
    fn sheet_names(&self) -> Vec<String>;

    /// Read a sheet, returning `None` if there is no sheet with this name
    fn read_sheet(&mut self, name: &str) -> Result<Option<Cells>>;
}

impl<RS: Read + Seek> SheetSource for Sheets<RS> {
    fn sheet_names(&self) -> Vec<String> {
        Reader::sheet_names(self)
    }

    fn read_sheet(&mut self, name: &str) -> Result<Option<Cells>> {
        if !Reader::sheet_names(self).iter().any(|sheet| sheet == name) {
            return Ok(None);
        }

        let range = self
            .worksheet_range(name)
            .map_err(|err| anyhow!("Could not read sheet '{name}': {err}"))?;

        // Ranges start at the first used cell, so pad back to A1
        let (first_row, first_col) = range.start().unwrap_or((0, 0));
        let padding = vec![Data::Empty; first_col as usize];
        let mut cells: Cells = vec![Vec::new(); first_row as usize];
        cells.extend(range.rows().map(|row| {
            let mut padded = padding.clone();
            padded.extend_from_slice(row);
            padded
        }));

        Ok(Some(cells))
    }
}

impl SheetSource for IndexMap<String, Cells> {
    fn sheet_names(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Option<Cells>> {
        Ok(self.get(name).cloned())
    }
}

/// Results read from a workbook
pub struct WorkbookResults<S> {
    source: S,
}

impl<S: SheetSource> WorkbookResults<S> {
    /// Read results from the given sheets
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: SheetSource> ResultStore for WorkbookResults<S> {
    fn process_capacities(&mut self) -> Result<Option<Vec<ProcessCapacity>>> {
        let Some(cells) = self.source.read_sheet(PROCESS_CAPACITY_SHEET)? else {
            debug!("No sheet '{PROCESS_CAPACITY_SHEET}' in results");
            return Ok(None);
        };

        parse_process_capacities(&cells)
            .with_context(|| format!("Invalid data in sheet '{PROCESS_CAPACITY_SHEET}'"))
    }

    fn storage_capacities(&mut self) -> Result<Option<Vec<StorageCapacity>>> {
        let Some(cells) = self.source.read_sheet(STORAGE_CAPACITY_SHEET)? else {
            debug!("No sheet '{STORAGE_CAPACITY_SHEET}' in results");
            return Ok(None);
        };

        parse_storage_capacities(&cells)
            .with_context(|| format!("Invalid data in sheet '{STORAGE_CAPACITY_SHEET}'"))
    }

    fn timeseries(&mut self, site: &SiteID, demand: &CommodityID) -> Result<Option<TimeSeries>> {
        let name = timeseries_sheet_name(site, demand);
        let Some(cells) = self.source.read_sheet(&name)? else {
            return Ok(None);
        };

        parse_timeseries(&cells)
            .map(Some)
            .with_context(|| format!("Invalid data in sheet '{name}'"))
    }

    fn timeseries_pairs(&mut self) -> Vec<SitePair> {
        match self.source.read_sheet(COMMODITY_SUMS_SHEET) {
            Ok(Some(cells)) => {
                let pairs = parse_commodity_sum_pairs(&cells);
                if !pairs.is_empty() {
                    return pairs;
                }
                warn!("No (site, demand) columns in sheet '{COMMODITY_SUMS_SHEET}'");
            }
            Ok(None) => debug!("No sheet '{COMMODITY_SUMS_SHEET}' in results"),
            Err(err) => warn!("{err:#}"),
        }

        self.source
            .sheet_names()
            .iter()
            .filter_map(|name| {
                let pair = parse_timeseries_sheet_name(name);
                if pair.is_none() && name.contains('.') {
                    debug!("Cannot infer site and commodity from sheet name '{name}'");
                }
                pair
            })
            .collect()
    }
}

/// Open a persisted result container.
///
/// HDF5 containers are read through the spreadsheet report written alongside them.
pub fn open_result_file(path: &Path) -> Result<Box<dyn ResultStore>> {
    let is_hdf5 = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("h5"));
    let workbook_path = if is_hdf5 {
        let report = path.with_extension("xlsx");
        ensure!(
            report.is_file(),
            "No spreadsheet report found for {} (expected {})",
            path.display(),
            report.display()
        );
        report
    } else {
        path.to_path_buf()
    };

    let sheets = calamine::open_workbook_auto(&workbook_path)
        .map_err(|err| anyhow!("{err}"))
        .with_context(|| input_err_msg(&workbook_path))?;

    Ok(Box::new(WorkbookResults::new(sheets)))
}

/// The name of the sheet holding the time series for a (site, demand) pair
pub fn timeseries_sheet_name(site: &SiteID, demand: &CommodityID) -> String {
    format!("{site}.{demand}{TIMESERIES_SUFFIX}")
        .chars()
        .take(MAX_SHEET_NAME_LENGTH)
        .collect()
}

/// Recover the (site, demand) pair from a time series sheet name.
///
/// Names truncated part way through the suffix are recognised. Returns `None` for other sheets
/// and for names truncated within the demand.
fn parse_timeseries_sheet_name(name: &str) -> Option<SitePair> {
    let (site, rest) = name.split_once('.')?;
    if site.is_empty() {
        return None;
    }

    (1..=TIMESERIES_SUFFIX.len())
        .rev()
        .filter_map(|len| rest.strip_suffix(&TIMESERIES_SUFFIX[..len]))
        .filter(|demand| !demand.is_empty())
        .map(|demand| (SiteID::from(site), CommodityID::from(demand)))
        .find(|(site, demand)| timeseries_sheet_name(site, demand) == name)
}

/// Read the (site, demand) pairs from the columns of the commodity sums sheet.
///
/// Value columns are either named `site.demand` or have the site (merged) and demand in two
/// header rows.
fn parse_commodity_sum_pairs(cells: &[Vec<Data>]) -> Vec<SitePair> {
    let Some(header) = cells.first() else {
        return Vec::new();
    };
    let names: Vec<_> = header
        .iter()
        .skip(COMMODITY_SUMS_INDEX_LEVELS)
        .map(cell_text)
        .collect();

    let pairs: Vec<(String, String)> = if names.iter().flatten().any(|name| name.contains('.')) {
        names
            .iter()
            .flatten()
            .filter_map(|name| name.split_once('.'))
            .filter(|(site, demand)| !site.is_empty() && !demand.is_empty())
            .map(|(site, demand)| (site.to_string(), demand.to_string()))
            .collect()
    } else if let Some(demands) = cells.get(1) {
        let sites = forward_fill(header.iter().skip(COMMODITY_SUMS_INDEX_LEVELS));
        let demands = demands.iter().skip(COMMODITY_SUMS_INDEX_LEVELS).map(cell_text);
        sites
            .into_iter()
            .zip(demands)
            .filter_map(|(site, demand)| Some((site?, demand?)))
            .collect()
    } else {
        Vec::new()
    };

    pairs
        .into_iter()
        .unique()
        .map(|(site, demand)| (site.as_str().into(), demand.as_str().into()))
        .collect()
}

/// The text of a cell, if it is not blank
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(value) => {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        }
        other => Some(other.to_string()),
    }
}

/// The numeric value of a cell. Blank cells are zero.
fn cell_value(cell: Option<&Data>) -> Result<f64> {
    match cell {
        None | Some(Data::Empty) => Ok(0.0),
        Some(Data::Float(value)) => Ok(*value),
        Some(Data::Int(value)) => Ok(*value as f64),
        Some(Data::String(value)) => crate::input::parse_number(value),
        Some(other) => bail!("Invalid number: '{other}'"),
    }
}

/// Fill blank cells with the last non-blank value before them, as for merged cells
fn forward_fill<'a, I>(cells: I) -> Vec<Option<String>>
where
    I: IntoIterator<Item = &'a Data>,
{
    let mut last = None;
    cells
        .into_iter()
        .map(|cell| {
            if let Some(text) = cell_text(cell) {
                last = Some(text);
            }
            last.clone()
        })
        .collect()
}

/// A row of a table with index columns and named value columns
struct IndexedRow {
    index: Vec<String>,
    values: Vec<f64>,
}

/// Read a table with `index_levels` index columns followed by value columns.
///
/// Returns `None` if any of `value_names` is not a column of the table.
fn parse_indexed_table(
    cells: &[Vec<Data>],
    index_levels: usize,
    value_names: &[&str],
) -> Result<Option<Vec<IndexedRow>>> {
    let Some((header, data)) = cells.split_first() else {
        return Ok(Some(Vec::new()));
    };

    let mut value_columns = Vec::with_capacity(value_names.len());
    for name in value_names {
        let column = header.iter().enumerate().skip(index_levels).find_map(|(i, cell)| {
            cell_text(cell)
                .is_some_and(|text| UniCase::new(text.as_str()) == UniCase::new(*name))
                .then_some(i)
        });
        let Some(column) = column else {
            warn!("Missing column '{name}'; ignoring table");
            return Ok(None);
        };
        value_columns.push(column);
    }

    let mut index: Vec<Option<String>> = vec![None; index_levels];
    let mut rows = Vec::with_capacity(data.len());
    for (row_number, row) in data.iter().enumerate() {
        if row.iter().all(|cell| cell_text(cell).is_none()) {
            continue;
        }

        for (level, value) in index.iter_mut().enumerate() {
            if let Some(text) = row.get(level).and_then(cell_text) {
                *value = Some(text);
            }
        }
        let Some(row_index) = index.iter().cloned().collect::<Option<Vec<_>>>() else {
            bail!("Missing index value in data row {}", row_number + 1);
        };

        let values = value_columns
            .iter()
            .map(|&column| cell_value(row.get(column)))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("Invalid value in data row {}", row_number + 1))?;

        rows.push(IndexedRow {
            index: row_index,
            values,
        });
    }

    Ok(Some(rows))
}

/// Parse the process capacity sheet
fn parse_process_capacities(cells: &[Vec<Data>]) -> Result<Option<Vec<ProcessCapacity>>> {
    let Some(rows) = parse_indexed_table(cells, 2, &["Total", "New"])? else {
        return Ok(None);
    };

    rows.into_iter()
        .map(|row| {
            let [site, process] = <[String; 2]>::try_from(row.index)
                .map_err(|_| anyhow!("Expected two index columns"))?;
            let power = CapacityPair::new(row.values[0], row.values[1])
                .with_context(|| format!("Invalid capacity for process {process} at {site}"))?;

            Ok(ProcessCapacity {
                site: site.into(),
                process: process.into(),
                power,
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

/// Parse the storage capacity sheet
fn parse_storage_capacities(cells: &[Vec<Data>]) -> Result<Option<Vec<StorageCapacity>>> {
    let Some(rows) = parse_indexed_table(cells, 3, &["C Total", "C New", "P Total", "P New"])?
    else {
        return Ok(None);
    };

    rows.into_iter()
        .map(|row| {
            let [site, storage, commodity] = <[String; 3]>::try_from(row.index)
                .map_err(|_| anyhow!("Expected three index columns"))?;
            let context = || format!("Invalid capacity for storage {storage} at {site}");
            let energy = CapacityPair::new(row.values[0], row.values[1]).with_context(context)?;
            let power = CapacityPair::new(row.values[2], row.values[3]).with_context(context)?;

            Ok(StorageCapacity {
                site: site.into(),
                storage: storage.into(),
                commodity: commodity.into(),
                power,
                energy,
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

/// Interpret the first cell of a row as a timestep, if it is one
fn parse_timestep(cell: Option<&Data>) -> Option<u32> {
    let value = match cell? {
        Data::Int(value) => *value as f64,
        Data::Float(value) => *value,
        Data::String(value) => value.trim().parse().ok()?,
        _ => return None,
    };

    (value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX)).then_some(value as u32)
}

/// Parse a time series sheet.
///
/// The first two rows are headers: the flow direction (merged across its columns) and the
/// contributor label. Rows whose first cell is not a timestep (such as the index name row)
/// are skipped.
fn parse_timeseries(cells: &[Vec<Data>]) -> Result<TimeSeries> {
    ensure!(cells.len() >= 2, "Expected two header rows");
    let groups = forward_fill(cells[0].iter().skip(1));
    let labels = &cells[1];

    let mut columns: Vec<(usize, FlowDirection, String)> = Vec::new();
    for (offset, group) in groups.iter().enumerate() {
        let column = offset + 1;
        let Some(direction) = group.as_deref().and_then(FlowDirection::from_header) else {
            continue;
        };
        let Some(label) = labels.get(column).and_then(cell_text) else {
            bail!("Missing label for {direction} column {}", column + 1);
        };
        columns.push((column, direction, label));
    }

    let mut timesteps = Vec::new();
    let mut values = vec![Vec::new(); columns.len()];
    for row in &cells[2..] {
        let Some(timestep) = parse_timestep(row.first()) else {
            continue;
        };

        for ((column, _, label), values) in columns.iter().zip(values.iter_mut()) {
            let value = cell_value(row.get(*column))
                .with_context(|| format!("Invalid value for {label} at timestep {timestep}"))?;
            values.push(value);
        }
        timesteps.push(timestep);
    }

    let columns = columns
        .into_iter()
        .zip(values)
        .map(|((_, direction, label), values)| FlowColumn {
            direction,
            label: label.into(),
            values,
        })
        .collect();

    TimeSeries::new(timesteps, columns)
}
