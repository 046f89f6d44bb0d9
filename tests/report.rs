//! Integration tests for the `report` command.
use energy_report::cli::{ReportOpts, handle_report_command};
use energy_report::log::is_logger_initialised;
use energy_report::plot::ImageFormat;
use energy_report::settings::Settings;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// Get the path to the test result file.
fn get_result_file() -> PathBuf {
    PathBuf::from("tests/data/scenario_base.xlsx")
}

fn report_opts(output_dir: &Path) -> ReportOpts {
    ReportOpts {
        output_dir: Some(output_dir.to_path_buf()),
        site: None,
        exclude: vec!["Slack powerplant".to_string()],
        pairs: Vec::new(),
        no_processes: false,
        no_storages: false,
        xticks: None,
    }
}

/// An integration test for the `report` command.
#[test]
fn test_handle_report_command() {
    unsafe { std::env::set_var("ENERGY_REPORT_LOG_LEVEL", "off") };

    let results_root = tempdir().unwrap();
    let result_dir = results_root.path().join("20261019T120000");
    fs::create_dir(&result_dir).unwrap();
    fs::copy(get_result_file(), result_dir.join("scenario_base.xlsx")).unwrap();

    // Save report to non-existent directory to check that directory creation works
    let output = tempdir().unwrap();
    let output_dir = output.path().join("report");
    let settings = Settings {
        image_formats: vec![ImageFormat::Svg],
        ..Settings::default()
    };
    handle_report_command(
        Some(results_root.path()),
        &report_opts(&output_dir),
        Some(settings),
    )
    .unwrap();
    assert!(is_logger_initialised());

    let capacities = fs::read_to_string(output_dir.join("scenario_base_capacities.csv")).unwrap();
    assert!(capacities.contains("Photovoltaics,process,power,50.0,50.0,0.0"));
    assert!(capacities.contains("Battery,storage,energy,400.0,100.0,300.0"));
    assert!(!capacities.contains("Slack powerplant"));

    let flows = fs::read_to_string(output_dir.join("scenario_base_flows.csv")).unwrap();
    assert!(flows.contains("Mid,Elec,Produced,Gas plant,Year,31.0"));
    assert!(output_dir.join("scenario_base_all.svg").is_file());
    assert!(
        output_dir
            .join("scenario_base_Mid_Elec_month_production.svg")
            .is_file()
    );
    assert!(output_dir.join("energy_report_info.log").is_file());
}
