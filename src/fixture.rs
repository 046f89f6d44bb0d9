//! Fixtures for tests

use crate::calendar::HOURS_PER_YEAR;
use crate::dataset::{Dataset, ParameterTable, TableKind};
use crate::results::workbook::{
    Cells, PROCESS_CAPACITY_SHEET, STORAGE_CAPACITY_SHEET, timeseries_sheet_name,
};
use crate::results::{
    CapacityPair, FlowColumn, FlowDirection, ModelResults, ProcessCapacity, StorageCapacity,
    TimeSeries,
};
use calamine::Data;
use indexmap::{IndexMap, indexmap};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

fn table(kind: TableKind, csv: &str) -> ParameterTable {
    ParameterTable::from_reader(kind, csv.as_bytes()).unwrap()
}

#[fixture]
pub fn dataset() -> Dataset {
    let mut dataset = Dataset::new();
    *dataset.table_mut(TableKind::Global) = table(
        TableKind::Global,
        "property,value\nCO2 limit,150000000\nCost limit,inf\n",
    );
    *dataset.table_mut(TableKind::Commodity) = table(
        TableKind::Commodity,
        "site,commodity,type,price,max,maxperhour
Mid,Gas,Stock,27,inf,inf
Mid,CO2,Env,0,inf,inf
Mid,Elec,Demand,0,0,0
North,Biomass,Stock,6,inf,inf
",
    );
    *dataset.table_mut(TableKind::Process) = table(
        TableKind::Process,
        "site,process,inst-cap,cap-up,inv-cost,fix-cost
Mid,Gaskessel,0,10000,150000,3000
Mid,Gas plant,0,80000,450000,6000
North,Hydro plant,0,200,1600000,20000
North,Biomass plant,0,100,875000,0
",
    );
    *dataset.table_mut(TableKind::Storage) = table(
        TableKind::Storage,
        "site,storage,commodity,cap-up-c,inv-cost-p,fix-cost-p,inv-cost-c
Mid,Batterie,Elec,inf,250000,5000,200000
",
    );
    *dataset.table_mut(TableKind::Dsm) = table(
        TableKind::Dsm,
        "site,commodity,delay,cap-max-do,cap-max-up\nMid,Elec,3,2000,2000\n",
    );

    dataset
}

fn text(value: &str) -> Data {
    Data::String(value.to_string())
}

#[fixture]
pub fn result_sheets() -> IndexMap<String, Cells> {
    let float = Data::Float;
    indexmap! {
        PROCESS_CAPACITY_SHEET.to_string() => vec![
            vec![text("Site"), text("Process"), text("Total"), text("New")],
            vec![text("Mid"), text("Gas plant"), float(100.0), float(0.0)],
            vec![Data::Empty, text("Photovoltaics"), float(50.0), float(50.0)],
            vec![Data::Empty, text("Wind"), float(0.05), float(0.0)],
            vec![text("North"), text("Hydro plant"), float(200.0), float(20.0)],
        ],
        STORAGE_CAPACITY_SHEET.to_string() => vec![
            vec![
                text("Site"),
                text("Storage"),
                text("Commodity"),
                text("C Total"),
                text("C New"),
                text("P Total"),
                text("P New"),
            ],
            vec![
                text("Mid"),
                text("Battery"),
                text("Elec"),
                float(400.0),
                float(100.0),
                float(100.0),
                float(25.0),
            ],
            vec![
                text("North"),
                text("Battery"),
                text("Elec"),
                float(0.05),
                float(0.0),
                float(0.01),
                float(0.0),
            ],
        ],
        timeseries_sheet_name(&"Mid".into(), &"Elec".into()) => vec![
            vec![Data::Empty, text("Created"), Data::Empty, text("Consumed"), text("Demand")],
            vec![
                Data::Empty,
                text("Gas plant"),
                text("Photovoltaics"),
                text("Battery"),
                text("Elec"),
            ],
            vec![text("t"), Data::Empty, Data::Empty, Data::Empty, Data::Empty],
            vec![Data::Int(0), float(0.0), float(0.0), float(0.0), float(0.0)],
            vec![Data::Int(1), float(10.0), float(5.0), float(2.0), float(13.0)],
            vec![Data::Int(2), float(12.0), Data::Empty, float(1.0), float(11.0)],
        ],
    }
}

fn process_capacity(site: &str, process: &str, total: f64, new: f64) -> ProcessCapacity {
    ProcessCapacity {
        site: site.into(),
        process: process.into(),
        power: CapacityPair::new(total, new).unwrap(),
    }
}

#[fixture]
pub fn process_capacities() -> Vec<ProcessCapacity> {
    vec![
        process_capacity("Mid", "Gas plant", 100.0, 0.0),
        process_capacity("Mid", "Photovoltaics", 50.0, 50.0),
        process_capacity("Mid", "Wind park", 0.05, 0.0),
        process_capacity("Mid", "Slack powerplant", 1000.0, 0.0),
        process_capacity("North", "Gas plant", 30.0, 0.0),
        process_capacity("North", "Hydro plant", 200.0, 20.0),
    ]
}

#[fixture]
pub fn storage_capacities() -> Vec<StorageCapacity> {
    vec![
        StorageCapacity {
            site: "Mid".into(),
            storage: "Battery".into(),
            commodity: "Elec".into(),
            power: CapacityPair::new(100.0, 25.0).unwrap(),
            energy: CapacityPair::new(400.0, 100.0).unwrap(),
        },
        StorageCapacity {
            site: "North".into(),
            storage: "Pumped storage".into(),
            commodity: "Elec".into(),
            power: CapacityPair::new(0.01, 0.0).unwrap(),
            energy: CapacityPair::new(0.05, 0.0).unwrap(),
        },
    ]
}

fn constant_column(direction: FlowDirection, label: &str, value: f64) -> FlowColumn {
    // Timestep 0 is the initialisation step, with a value which must be ignored
    let values = std::iter::once(1000.0)
        .chain(std::iter::repeat_n(value, HOURS_PER_YEAR as usize))
        .collect();

    FlowColumn {
        direction,
        label: label.into(),
        values,
    }
}

/// A whole year of hourly flows, with a constant value for each column
#[fixture]
pub fn annual_timeseries() -> TimeSeries {
    TimeSeries::new(
        (0..=HOURS_PER_YEAR).collect(),
        vec![
            constant_column(FlowDirection::Produced, "Gas plant", 1.0),
            constant_column(FlowDirection::Produced, "Photovoltaics", 0.5),
            constant_column(FlowDirection::Consumed, "Battery", 0.5),
            constant_column(FlowDirection::Exported, "South", 0.25),
            constant_column(FlowDirection::Imported, "North", 1e-9),
        ],
    )
    .unwrap()
}

#[fixture]
pub fn model_results(
    process_capacities: Vec<ProcessCapacity>,
    storage_capacities: Vec<StorageCapacity>,
    annual_timeseries: TimeSeries,
) -> ModelResults {
    ModelResults {
        process_capacities: Some(process_capacities),
        storage_capacities: Some(storage_capacities),
        timeseries: indexmap! {("Mid".into(), "Elec".into()) => annual_timeseries},
    }
}
