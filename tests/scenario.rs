//! Integration tests for the `scenario build` and `example scenario` commands.
use energy_report::cli::example::handle_example_scenario_command;
use energy_report::cli::handle_scenario_build_command;
use energy_report::dataset::{Dataset, RowKey, TableKind};
use energy_report::settings::Settings;
use std::path::PathBuf;
use tempfile::tempdir;

/// Get the path to the example model.
fn get_model_dir() -> PathBuf {
    PathBuf::from("demos/simple")
}

/// An integration test for building scenario datasets.
///
/// Both commands are run in one test, as the logger can only be initialised once.
#[test]
fn test_handle_scenario_commands() {
    unsafe { std::env::set_var("ENERGY_REPORT_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let output_dir = tempdir.path().join("north_process_caps");
    handle_scenario_build_command(
        &get_model_dir(),
        "north_process_caps",
        Some(&output_dir),
        Some(Settings::default()),
    )
    .unwrap();

    let base = Dataset::from_path(&get_model_dir()).unwrap();
    let dataset = Dataset::from_path(&output_dir).unwrap();
    let key = RowKey::new(["North", "Hydro plant"]);
    assert_eq!(
        dataset.table(TableKind::Process).get(&key, "cap-up"),
        base.table(TableKind::Process)
            .get(&key, "cap-up")
            .map(|cap| cap * 0.5)
    );

    // Second time will fail because the logging is already initialised
    let output_dir = tempdir.path().join("all_together");
    assert_eq!(
        handle_example_scenario_command(
            "simple",
            "all_together",
            Some(&output_dir),
            Some(Settings::default())
        )
        .unwrap_err()
        .chain()
        .next()
        .unwrap()
        .to_string(),
        "Failed to initialise logging."
    );
}
