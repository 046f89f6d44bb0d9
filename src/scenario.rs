//! Scenarios are named sequences of overrides applied to a model input dataset.
//!
//! Overrides are applied to a copy of the base dataset, so the base dataset is never modified.
//! Overrides are not idempotent: applying a scaling override twice scales the value twice.
use crate::cost::{Technology, cost_curve};
use crate::dataset::{Dataset, RowKey, TableKind};
use crate::input::{input_err_msg, read_toml};
use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

const SCENARIOS_FILE_NAME: &str = "scenarios.toml";

/// A single change to a dataset
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Override {
    /// Multiply a field of one row by a factor
    Scale {
        /// The table containing the row
        table: TableKind,
        /// The key of the row
        key: Vec<String>,
        /// The field to change
        field: String,
        /// The factor to multiply by
        factor: f64,
    },
    /// Assign a new value to a field of one row
    Set {
        /// The table containing the row
        table: TableKind,
        /// The key of the row
        key: Vec<String>,
        /// The field to change
        field: String,
        /// The new value
        value: f64,
    },
    /// Multiply a field of every row whose key column has a given value
    ScaleWhere {
        /// The table to change
        table: TableKind,
        /// The key column to match on
        column: String,
        /// The value the key column must have
        equals: String,
        /// The field to change
        field: String,
        /// The factor to multiply by
        factor: f64,
    },
    /// Remove all rows from a table
    Clear {
        /// The table to empty
        table: TableKind,
    },
    /// Set investment and fixed costs of known technologies from their cost curves
    CostCurves {
        /// The year of installation
        year: f64,
    },
}

impl Override {
    /// Apply the override to `dataset` in place.
    ///
    /// Fails if a referenced row or field doesn't exist.
    fn apply(&self, dataset: &mut Dataset) -> Result<()> {
        match self {
            Self::Scale {
                table,
                key,
                field,
                factor,
            } => {
                *value_mut(dataset, *table, key, field)? *= factor;
            }
            Self::Set {
                table,
                key,
                field,
                value,
            } => {
                *value_mut(dataset, *table, key, field)? = *value;
            }
            Self::ScaleWhere {
                table,
                column,
                equals,
                field,
                factor,
            } => {
                let count = dataset
                    .table_mut(*table)
                    .update_where(column, equals, field, |value| value * factor)
                    .with_context(|| format!("In {table} table"))?;
                debug!("Scaled {field} in {count} row(s) of {table} table where {column} = {equals}");
            }
            Self::Clear { table } => dataset.table_mut(*table).clear(),
            Self::CostCurves { year } => apply_cost_curves(dataset, *year)?,
        }

        Ok(())
    }

    /// A short name for the kind of override, used in error messages
    fn kind(&self) -> &'static str {
        match self {
            Self::Scale { .. } => "scale",
            Self::Set { .. } => "set",
            Self::ScaleWhere { .. } => "scale_where",
            Self::Clear { .. } => "clear",
            Self::CostCurves { .. } => "cost_curves",
        }
    }
}

fn value_mut<'a>(
    dataset: &'a mut Dataset,
    table: TableKind,
    key: &[String],
    field: &str,
) -> Result<&'a mut f64> {
    dataset
        .table_mut(table)
        .value_mut(&RowKey(key.to_vec()), field)
        .with_context(|| format!("In {table} table"))
}

/// Set costs of every process and storage named after a known technology
fn apply_cost_curves(dataset: &mut Dataset, year: f64) -> Result<()> {
    let process = dataset.table_mut(TableKind::Process);
    let keys: Vec<_> = process.keys().cloned().collect();
    for key in keys {
        let Ok(technology) = Technology::from_str(&key.0[1]) else {
            continue;
        };
        let costs = cost_curve(technology, year);
        *process.value_mut(&key, "inv-cost")? = costs.investment.value();
        *process.value_mut(&key, "fix-cost")? = costs.fixed.value();
        debug!("Set costs of process {key} from {technology} cost curve for {year}");
    }

    let storage = dataset.table_mut(TableKind::Storage);
    let keys: Vec<_> = storage.keys().cloned().collect();
    for key in keys {
        let Ok(technology) = Technology::from_str(&key.0[1]) else {
            continue;
        };
        let costs = cost_curve(technology, year);
        *storage.value_mut(&key, "inv-cost-p")? = costs.investment.value();
        *storage.value_mut(&key, "fix-cost-p")? = costs.fixed.value();
        if let Some(energy) = costs.energy {
            *storage.value_mut(&key, "inv-cost-c")? = energy.value();
        }
        debug!("Set costs of storage {key} from {technology} cost curve for {year}");
    }

    Ok(())
}

/// Apply `overrides` in order to a copy of `base`.
///
/// An empty list of overrides gives a dataset equal to `base`.
pub fn apply_overrides(base: &Dataset, overrides: &[Override]) -> Result<Dataset> {
    let mut dataset = base.clone();
    for (num, item) in overrides.iter().enumerate() {
        item.apply(&mut dataset)
            .with_context(|| format!("Failed to apply override {} ({})", num + 1, item.kind()))?;
    }

    Ok(dataset)
}

/// A named set of changes to a dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// The name of the scenario
    pub name: String,
    /// A description of the scenario
    pub description: String,
    /// The overrides making up the scenario, in order of application
    pub overrides: Vec<Override>,
}

impl Scenario {
    /// Apply the scenario to a copy of `base`
    pub fn apply(&self, base: &Dataset) -> Result<Dataset> {
        apply_overrides(base, &self.overrides)
            .with_context(|| format!("Failed to apply scenario {}", self.name))
    }
}

/// A map of scenarios, keyed by name
pub type ScenarioMap = IndexMap<String, Scenario>;

fn scale(table: TableKind, key: &[&str], field: &str, factor: f64) -> Override {
    Override::Scale {
        table,
        key: key.iter().map(ToString::to_string).collect(),
        field: field.to_string(),
        factor,
    }
}

fn builtin(name: &str, description: &str, overrides: Vec<Override>) -> (String, Scenario) {
    let scenario = Scenario {
        name: name.to_string(),
        description: description.to_string(),
        overrides,
    };

    (name.to_string(), scenario)
}

/// The scenarios which are always available
pub fn builtin_scenarios() -> ScenarioMap {
    let stock_prices = vec![Override::ScaleWhere {
        table: TableKind::Commodity,
        column: "type".into(),
        equals: "Stock".into(),
        field: "price".into(),
        factor: 1.5,
    }];
    let co2_limit = vec![scale(TableKind::Global, &["CO2 limit"], "value", 0.05)];
    let north_process_caps = vec![
        scale(TableKind::Process, &["North", "Hydro plant"], "cap-up", 0.5),
        scale(TableKind::Process, &["North", "Biomass plant"], "cap-up", 0.25),
    ];
    let all_together = [
        stock_prices.clone(),
        co2_limit.clone(),
        north_process_caps.clone(),
    ]
    .concat();

    [
        builtin("base", "The unmodified dataset", Vec::new()),
        builtin(
            "stock_prices",
            "Stock commodity prices increased by 50%",
            stock_prices,
        ),
        builtin("co2_limit", "Global CO2 limit cut to 5%", co2_limit),
        builtin(
            "co2_tax_mid",
            "CO2 price of 50 in site Mid",
            vec![Override::Set {
                table: TableKind::Commodity,
                key: vec!["Mid".into(), "CO2".into(), "Env".into()],
                field: "price".into(),
                value: 50.0,
            }],
        ),
        builtin(
            "north_process_caps",
            "Lower maximum installable capacities in North",
            north_process_caps,
        ),
        builtin(
            "no_dsm",
            "No demand-side management",
            vec![Override::Clear {
                table: TableKind::Dsm,
            }],
        ),
        builtin(
            "all_together",
            "Stock prices, CO2 limit and North process caps combined",
            all_together,
        ),
    ]
    .into_iter()
    .collect()
}

/// A scenario as defined in a scenarios file
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioDefinition {
    #[serde(default)]
    description: String,
    /// Names of earlier scenarios whose overrides are applied first
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    overrides: Vec<Override>,
}

#[derive(Debug, Deserialize)]
struct ScenariosFile {
    #[serde(default)]
    scenarios: IndexMap<String, ScenarioDefinition>,
}

/// Add scenarios defined in a file to `scenarios`, replacing any with the same name
fn add_scenario_definitions(
    scenarios: &mut ScenarioMap,
    definitions: IndexMap<String, ScenarioDefinition>,
) -> Result<()> {
    for (name, definition) in definitions {
        let mut overrides = Vec::new();
        for included in &definition.include {
            let Some(scenario) = scenarios.get(included) else {
                bail!("Scenario {name} includes unknown scenario {included}");
            };
            overrides.extend(scenario.overrides.iter().cloned());
        }
        overrides.extend(definition.overrides);

        let scenario = Scenario {
            name: name.clone(),
            description: definition.description,
            overrides,
        };
        scenarios.insert(name, scenario);
    }

    Ok(())
}

/// Get the built-in scenarios plus those defined in the model directory's `scenarios.toml`.
///
/// The scenarios file is optional.
pub fn load_scenarios(model_dir: &Path) -> Result<ScenarioMap> {
    let mut scenarios = builtin_scenarios();
    let file_path = model_dir.join(SCENARIOS_FILE_NAME);
    if file_path.is_file() {
        let file: ScenariosFile = read_toml(&file_path)?;
        add_scenario_definitions(&mut scenarios, file.scenarios)
            .with_context(|| input_err_msg(&file_path))?;
    }

    Ok(scenarios)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, dataset};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    fn get_value(dataset: &Dataset, table: TableKind, key: &[&str], field: &str) -> f64 {
        dataset
            .table(table)
            .get(&RowKey::new(key.iter().copied()), field)
            .unwrap()
    }

    #[rstest]
    fn test_apply_no_overrides_is_identity(dataset: Dataset) {
        let copy = dataset.clone();
        let result = apply_overrides(&dataset, &[]).unwrap();
        assert_eq!(result, dataset);
        assert_eq!(dataset, copy);
    }

    #[rstest]
    fn test_base_scenario_is_identity(dataset: Dataset) {
        let scenarios = builtin_scenarios();
        assert_eq!(scenarios["base"].apply(&dataset).unwrap(), dataset);
    }

    #[rstest]
    fn test_apply_does_not_mutate_base(dataset: Dataset) {
        let copy = dataset.clone();
        let scenarios = builtin_scenarios();
        let result = scenarios["north_process_caps"].apply(&dataset).unwrap();
        assert_ne!(result, dataset);
        assert_eq!(dataset, copy);
    }

    #[rstest]
    fn test_north_process_caps(dataset: Dataset) {
        let scenarios = builtin_scenarios();
        let result = scenarios["north_process_caps"].apply(&dataset).unwrap();
        assert_eq!(
            get_value(&result, TableKind::Process, &["North", "Hydro plant"], "cap-up"),
            100.0
        );
        assert_eq!(
            get_value(&result, TableKind::Process, &["North", "Biomass plant"], "cap-up"),
            25.0
        );
    }

    #[rstest]
    fn test_reapplying_compounds(dataset: Dataset) {
        let scenarios = builtin_scenarios();
        let scenario = &scenarios["co2_limit"];
        let once = scenario.apply(&dataset).unwrap();
        let twice = scenario.apply(&once).unwrap();
        let limit = get_value(&dataset, TableKind::Global, &["CO2 limit"], "value");
        assert_approx_eq!(
            f64,
            get_value(&twice, TableKind::Global, &["CO2 limit"], "value"),
            limit * 0.05 * 0.05
        );
    }

    #[rstest]
    fn test_stock_prices_and_co2_tax(dataset: Dataset) {
        let scenarios = builtin_scenarios();
        let result = scenarios["stock_prices"].apply(&dataset).unwrap();
        assert_eq!(
            get_value(&result, TableKind::Commodity, &["Mid", "Gas", "Stock"], "price"),
            40.5
        );
        assert_eq!(
            get_value(&result, TableKind::Commodity, &["Mid", "CO2", "Env"], "price"),
            0.0
        );

        let result = scenarios["co2_tax_mid"].apply(&dataset).unwrap();
        assert_eq!(
            get_value(&result, TableKind::Commodity, &["Mid", "CO2", "Env"], "price"),
            50.0
        );
    }

    #[rstest]
    fn test_no_dsm(dataset: Dataset) {
        let scenarios = builtin_scenarios();
        let result = scenarios["no_dsm"].apply(&dataset).unwrap();
        assert!(result.table(TableKind::Dsm).is_empty());
        assert!(!dataset.table(TableKind::Dsm).is_empty());
    }

    #[rstest]
    fn test_missing_row_is_error(dataset: Dataset) {
        let overrides = [scale(TableKind::Process, &["South", "Hydro plant"], "cap-up", 2.0)];
        let result = apply_overrides(&dataset, &overrides);
        assert_error!(result, "Failed to apply override 1 (scale)");
    }

    #[rstest]
    fn test_cost_curves(dataset: Dataset) {
        let overrides = [Override::CostCurves { year: 2030.0 }];
        let result = apply_overrides(&dataset, &overrides).unwrap();
        let expected = cost_curve(Technology::Gaskessel, 2030.0);
        assert_eq!(
            get_value(&result, TableKind::Process, &["Mid", "Gaskessel"], "inv-cost"),
            expected.investment.value()
        );
        assert_eq!(
            get_value(&result, TableKind::Process, &["Mid", "Gaskessel"], "fix-cost"),
            expected.fixed.value()
        );

        // Processes which aren't known technologies are left alone
        assert_eq!(
            get_value(&result, TableKind::Process, &["North", "Hydro plant"], "inv-cost"),
            get_value(&dataset, TableKind::Process, &["North", "Hydro plant"], "inv-cost")
        );

        let expected = cost_curve(Technology::Batterie, 2030.0);
        assert_eq!(
            get_value(&result, TableKind::Storage, &["Mid", "Batterie", "Elec"], "inv-cost-c"),
            expected.energy.unwrap().value()
        );
    }

    #[test]
    fn test_load_scenarios_from_file() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(SCENARIOS_FILE_NAME),
            r#"
[scenarios.cheap_storage]
description = "Cheaper batteries on top of higher stock prices"
include = ["stock_prices"]

[[scenarios.cheap_storage.overrides]]
kind = "scale"
table = "storage"
key = ["Mid", "Batterie", "Elec"]
field = "inv-cost-p"
factor = 0.5
"#,
        )
        .unwrap();

        let scenarios = load_scenarios(dir.path()).unwrap();
        let scenario = &scenarios["cheap_storage"];
        assert_eq!(scenario.overrides.len(), 2);
        assert_eq!(scenario.overrides[0], builtin_scenarios()["stock_prices"].overrides[0]);
        assert!(scenarios.contains_key("base"));
    }

    #[test]
    fn test_load_scenarios_unknown_include() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(SCENARIOS_FILE_NAME),
            "[scenarios.broken]\ninclude = [\"nonexistent\"]\n",
        )
        .unwrap();

        assert!(load_scenarios(dir.path()).is_err());
    }

    #[test]
    fn test_load_scenarios_no_file() {
        let dir = tempdir().unwrap();
        assert_eq!(load_scenarios(dir.path()).unwrap(), builtin_scenarios());
    }
}
