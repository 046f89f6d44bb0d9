//! The tabular input dataset of an energy system model.
//!
//! A dataset is a set of parameter tables, each stored as a CSV file in the model directory. The
//! leading columns of each table identify a row (e.g. site and process) and all remaining columns
//! hold numeric parameters.
use crate::input::{input_err_msg, parse_number};
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use strum::{Display, EnumIter, IntoEnumIterator};
use unicase::UniCase;

/// The kinds of parameter table in a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Global properties, such as the CO2 limit
    Global,
    /// Commodities available at each site
    Commodity,
    /// Conversion processes at each site
    Process,
    /// Storages for each site and commodity
    Storage,
    /// Demand-side management parameters
    Dsm,
}

impl TableKind {
    /// The name of the CSV file holding this table
    pub fn file_name(self) -> String {
        format!("{self}.csv")
    }

    /// The names of the columns which identify a row
    pub fn key_columns(self) -> &'static [&'static str] {
        match self {
            Self::Global => &["property"],
            Self::Commodity => &["site", "commodity", "type"],
            Self::Process => &["site", "process"],
            Self::Storage => &["site", "storage", "commodity"],
            Self::Dsm => &["site", "commodity"],
        }
    }

    /// Whether the table may be left out of a model directory
    fn is_optional(self) -> bool {
        self == Self::Dsm
    }
}

/// Identifies a row in a [`ParameterTable`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey(pub Vec<String>);

impl RowKey {
    /// Create a key from its parts
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.iter().join(", "))
    }
}

/// Normalise a field name so that `cap-up`, `cap_up` and `Cap-Up` are all equivalent
fn normalise_field_name(name: &str) -> UniCase<String> {
    UniCase::new(name.trim().replace('-', "_"))
}

/// A table of numeric parameters with rows identified by a key
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTable {
    key_columns: Vec<String>,
    value_columns: Vec<String>,
    rows: IndexMap<RowKey, Vec<f64>>,
}

impl ParameterTable {
    /// Create an empty table with the given columns
    pub fn new(key_columns: Vec<String>, value_columns: Vec<String>) -> Self {
        Self {
            key_columns,
            value_columns,
            rows: IndexMap::new(),
        }
    }

    /// Create an empty table of the given kind, with only key columns
    fn empty(kind: TableKind) -> Self {
        Self::new(
            kind.key_columns().iter().map(ToString::to_string).collect(),
            Vec::new(),
        )
    }

    /// Read a table of the given kind from CSV data
    pub fn from_reader<R: Read>(kind: TableKind, reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers()?.clone();
        let key_names = kind.key_columns();
        ensure!(
            headers.len() >= key_names.len(),
            "Expected key columns {} but found {}",
            key_names.join(", "),
            headers.iter().join(", ")
        );
        for (header, expected) in headers.iter().zip(key_names) {
            ensure!(
                normalise_field_name(header) == normalise_field_name(expected),
                "Expected key column '{expected}' but found '{header}'"
            );
        }

        let mut table = Self::new(
            headers
                .iter()
                .take(key_names.len())
                .map(ToString::to_string)
                .collect(),
            headers
                .iter()
                .skip(key_names.len())
                .map(ToString::to_string)
                .collect(),
        );

        for (row_num, record) in reader.records().enumerate() {
            let record = record?;
            let key = RowKey::new(record.iter().take(key_names.len()));
            let values: Vec<f64> = record
                .iter()
                .skip(key_names.len())
                .map(parse_number)
                .try_collect()
                .with_context(|| format!("Invalid value in data row {}", row_num + 1))?;
            table.insert(key, values)?;
        }

        Ok(table)
    }

    /// Write the table as CSV data
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.key_columns.iter().chain(&self.value_columns))?;
        for (key, values) in &self.rows {
            let values = values.iter().map(ToString::to_string);
            writer.write_record(key.0.iter().cloned().chain(values))?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Add a new row to the table
    pub fn insert(&mut self, key: RowKey, values: Vec<f64>) -> Result<()> {
        ensure!(
            key.0.len() == self.key_columns.len(),
            "Row key {key} has the wrong number of columns"
        );
        ensure!(
            values.len() == self.value_columns.len(),
            "Row {key} has {} values but the table has {} value columns",
            values.len(),
            self.value_columns.len()
        );
        ensure!(!self.rows.contains_key(&key), "Duplicate row {key}");
        self.rows.insert(key, values);

        Ok(())
    }

    /// The position of the named value column, if present
    fn value_index(&self, field: &str) -> Option<usize> {
        let field = normalise_field_name(field);
        self.value_columns
            .iter()
            .position(|column| normalise_field_name(column) == field)
    }

    /// The position of the named key column, if present
    fn key_index(&self, column: &str) -> Option<usize> {
        let column = normalise_field_name(column);
        self.key_columns
            .iter()
            .position(|name| normalise_field_name(name) == column)
    }

    /// Look up a value, returning `None` if the row or field is absent
    pub fn get(&self, key: &RowKey, field: &str) -> Option<f64> {
        let index = self.value_index(field)?;
        self.rows.get(key).map(|values| values[index])
    }

    /// Get a mutable reference to a value.
    ///
    /// Fails if the row or the field does not exist.
    pub fn value_mut(&mut self, key: &RowKey, field: &str) -> Result<&mut f64> {
        let Some(index) = self.value_index(field) else {
            bail!("Unknown field '{field}'");
        };
        let values = self
            .rows
            .get_mut(key)
            .with_context(|| format!("No row {key}"))?;

        Ok(&mut values[index])
    }

    /// Apply `f` to a field of every row whose key column `column` equals `value`.
    ///
    /// Returns the number of rows changed.
    pub fn update_where<F>(&mut self, column: &str, value: &str, field: &str, f: F) -> Result<usize>
    where
        F: Fn(f64) -> f64,
    {
        let key_index = self
            .key_index(column)
            .with_context(|| format!("Unknown key column '{column}'"))?;
        let value_index = self
            .value_index(field)
            .with_context(|| format!("Unknown field '{field}'"))?;

        let mut count = 0;
        for (key, values) in &mut self.rows {
            if key.0[key_index] == value {
                values[value_index] = f(values[value_index]);
                count += 1;
            }
        }

        Ok(count)
    }

    /// Remove all rows, keeping the columns
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Iterate over row keys
    pub fn keys(&self) -> impl Iterator<Item = &RowKey> {
        self.rows.keys()
    }

    /// The number of rows in the table
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A complete model input dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    global: ParameterTable,
    commodity: ParameterTable,
    process: ParameterTable,
    storage: ParameterTable,
    dsm: ParameterTable,
}

impl Dataset {
    /// Create an empty dataset
    pub fn new() -> Self {
        Self {
            global: ParameterTable::empty(TableKind::Global),
            commodity: ParameterTable::empty(TableKind::Commodity),
            process: ParameterTable::empty(TableKind::Process),
            storage: ParameterTable::empty(TableKind::Storage),
            dsm: ParameterTable::empty(TableKind::Dsm),
        }
    }

    /// Read a dataset from the CSV files in `model_dir`
    pub fn from_path(model_dir: &Path) -> Result<Self> {
        let mut dataset = Self::new();
        for kind in TableKind::iter() {
            let file_path = model_dir.join(kind.file_name());
            if kind.is_optional() && !file_path.is_file() {
                continue;
            }

            let file = File::open(&file_path).with_context(|| input_err_msg(&file_path))?;
            *dataset.table_mut(kind) =
                ParameterTable::from_reader(kind, file).with_context(|| input_err_msg(&file_path))?;
        }

        Ok(dataset)
    }

    /// Write every table as a CSV file in `output_dir`
    pub fn write_to(&self, output_dir: &Path) -> Result<()> {
        for kind in TableKind::iter() {
            let file_path = output_dir.join(kind.file_name());
            let file = File::create(&file_path)
                .with_context(|| format!("Failed to create {}", file_path.display()))?;
            self.table(kind).to_writer(file)?;
        }

        Ok(())
    }

    /// Get the table of the given kind
    pub fn table(&self, kind: TableKind) -> &ParameterTable {
        match kind {
            TableKind::Global => &self.global,
            TableKind::Commodity => &self.commodity,
            TableKind::Process => &self.process,
            TableKind::Storage => &self.storage,
            TableKind::Dsm => &self.dsm,
        }
    }

    /// Get a mutable reference to the table of the given kind
    pub fn table_mut(&mut self, kind: TableKind) -> &mut ParameterTable {
        match kind {
            TableKind::Global => &mut self.global,
            TableKind::Commodity => &mut self.commodity,
            TableKind::Process => &mut self.process,
            TableKind::Storage => &mut self.storage,
            TableKind::Dsm => &mut self.dsm,
        }
    }
}

impl Default for Dataset {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, dataset};
    use rstest::rstest;
    use tempfile::tempdir;

    #[test]
    fn test_from_reader() {
        let csv = "site,process,inst-cap,cap-up\nNorth,Hydro plant,0,inf\nMid,Gas plant,10,50\n";
        let table = ParameterTable::from_reader(TableKind::Process, csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        let key = RowKey::new(["North", "Hydro plant"]);
        assert_eq!(table.get(&key, "cap_up"), Some(f64::INFINITY));
        assert_eq!(table.get(&key, "inst-cap"), Some(0.0));
        assert_eq!(table.get(&key, "missing"), None);
        assert_eq!(table.get(&RowKey::new(["South", "Hydro plant"]), "cap-up"), None);
    }

    #[test]
    fn test_from_reader_bad_key_column() {
        let csv = "site,technology,inst-cap\nNorth,Hydro plant,0\n";
        assert_error!(
            ParameterTable::from_reader(TableKind::Process, csv.as_bytes()),
            "Expected key column 'process' but found 'technology'"
        );
    }

    #[test]
    fn test_from_reader_duplicate_row() {
        let csv = "site,process,inst-cap\nNorth,Hydro plant,0\nNorth,Hydro plant,1\n";
        assert_error!(
            ParameterTable::from_reader(TableKind::Process, csv.as_bytes()),
            "Duplicate row (North, Hydro plant)"
        );
    }

    #[test]
    fn test_from_reader_bad_value() {
        let csv = "site,process,inst-cap\nNorth,Hydro plant,lots\n";
        assert_error!(
            ParameterTable::from_reader(TableKind::Process, csv.as_bytes()),
            "Invalid value in data row 1"
        );
    }

    #[rstest]
    fn test_value_mut(mut dataset: Dataset) {
        let table = dataset.table_mut(TableKind::Process);
        let key = RowKey::new(["North", "Hydro plant"]);
        *table.value_mut(&key, "cap-up").unwrap() = 5.0;
        assert_eq!(table.get(&key, "cap-up"), Some(5.0));

        assert_error!(
            table.value_mut(&RowKey::new(["South", "Hydro plant"]), "cap-up"),
            "No row (South, Hydro plant)"
        );
        assert_error!(table.value_mut(&key, "colour"), "Unknown field 'colour'");
    }

    #[rstest]
    fn test_update_where(mut dataset: Dataset) {
        let table = dataset.table_mut(TableKind::Commodity);
        let count = table
            .update_where("type", "Stock", "price", |price| price * 2.0)
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            table.get(&RowKey::new(["Mid", "Gas", "Stock"]), "price"),
            Some(54.0)
        );
        assert_eq!(
            table.get(&RowKey::new(["Mid", "CO2", "Env"]), "price"),
            Some(0.0)
        );
    }

    #[rstest]
    fn test_write_and_read_round_trip(dataset: Dataset) {
        let dir = tempdir().unwrap();
        dataset.write_to(dir.path()).unwrap();
        assert_eq!(Dataset::from_path(dir.path()).unwrap(), dataset);
    }

    #[test]
    fn test_from_path_missing_required_table() {
        let dir = tempdir().unwrap();
        assert!(Dataset::from_path(dir.path()).is_err());
    }
}
