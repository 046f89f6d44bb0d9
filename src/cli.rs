//! The command line interface for generating scenarios and reports.
use crate::aggregate::AggregateOptions;
use crate::cost::{Technology, cost_curve};
use crate::dataset::Dataset;
use crate::id::{CommodityID, SiteID};
use crate::log;
use crate::output::create_output_directory;
use crate::plot::capacity::CapacityPlotOptions;
use crate::report::{ReportOptions, write_folder_reports};
use crate::results::SitePair;
use crate::results::discovery::most_recent_entry;
use crate::scenario::load_scenarios;
use crate::settings::Settings;
use ::log::info;
use anyhow::{Context, Result, ensure};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for energy-report.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the report command
#[derive(Args)]
pub struct ReportOpts {
    /// Directory for output files (defaults to the result folder)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Only show capacities at this site
    #[arg(long)]
    pub site: Option<String>,
    /// Technologies to leave out of the capacity chart
    #[arg(long = "drop", value_name = "TECHNOLOGY")]
    pub exclude: Vec<String>,
    /// (site, demand) pairs to chart flows for, as `site.demand` (defaults to all pairs)
    #[arg(long = "pair", value_name = "SITE.DEMAND", value_parser = parse_site_pair)]
    pub pairs: Vec<(String, String)>,
    /// Leave process capacities out of the capacity chart
    #[arg(long)]
    pub no_processes: bool,
    /// Leave storage capacities out of the capacity chart
    #[arg(long)]
    pub no_storages: bool,
    /// Label every n-th tick on capacity axes
    #[arg(long)]
    pub xticks: Option<usize>,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Write charts and summary tables for the most recent solver results.
    Report {
        /// Folder containing time-stamped result folders (defaults to the one in settings).
        results_dir: Option<PathBuf>,
        /// Other report options
        #[command(flatten)]
        opts: ReportOpts,
    },
    /// Manage scenarios.
    Scenario {
        /// The available subcommands for managing scenarios.
        #[command(subcommand)]
        subcommand: ScenarioSubcommands,
    },
    /// Print the cost curve of a technology.
    Costs {
        /// The name of the technology (e.g. "PV Dach").
        technology: String,
        /// First year of installation
        #[arg(long, default_value_t = 2020)]
        from: u32,
        /// Last year of installation
        #[arg(long, default_value_t = 2050)]
        to: u32,
        /// Step between years
        #[arg(long, default_value_t = 5)]
        step: u32,
    },
    /// Manage example models.
    Example {
        /// The available subcommands for managing example models.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

/// The available subcommands for managing scenarios.
#[derive(Subcommand)]
enum ScenarioSubcommands {
    /// List the scenarios available for a model.
    List {
        /// The path to the model directory.
        model_dir: PathBuf,
    },
    /// Write the dataset of a scenario to a new directory.
    Build {
        /// The path to the model directory.
        model_dir: PathBuf,
        /// The name of the scenario.
        name: String,
        /// Directory for the modified dataset (defaults to `scenario_{name}`)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Report { results_dir, opts } => {
                handle_report_command(results_dir.as_deref(), &opts, None)
            }
            Self::Scenario { subcommand } => match subcommand {
                ScenarioSubcommands::List { model_dir } => handle_scenario_list_command(&model_dir),
                ScenarioSubcommands::Build {
                    model_dir,
                    name,
                    output_dir,
                } => handle_scenario_build_command(&model_dir, &name, output_dir.as_deref(), None),
            },
            Self::Costs {
                technology,
                from,
                to,
                step,
            } => handle_costs_command(&technology, from, to, step),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start energy-report
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ energy-report --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        // Output program help in markdown format
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Parse a (site, demand) pair written as `site.demand`
fn parse_site_pair(value: &str) -> Result<(String, String)> {
    let (site, demand) = value
        .split_once('.')
        .with_context(|| format!("Expected SITE.DEMAND but got '{value}'"))?;
    ensure!(
        !site.is_empty() && !demand.is_empty(),
        "Expected SITE.DEMAND but got '{value}'"
    );

    Ok((site.to_string(), demand.to_string()))
}

/// Load program settings, if not provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    if let Some(settings) = settings {
        Ok(settings)
    } else {
        Settings::load().context("Failed to load settings.")
    }
}

/// Combine command-line options with program settings
fn report_options(opts: &ReportOpts, settings: &Settings) -> ReportOptions {
    ReportOptions {
        aggregate: AggregateOptions {
            site: opts.site.as_deref().map(SiteID::new),
            exclude: opts.exclude.clone(),
            pairs: (!opts.pairs.is_empty()).then(|| {
                opts.pairs
                    .iter()
                    .map(|(site, demand)| (SiteID::new(site), CommodityID::new(demand)))
                    .collect::<Vec<SitePair>>()
            }),
        },
        capacity: CapacityPlotOptions {
            font_size: settings.font_size,
            xtick_stride: opts.xticks.unwrap_or(settings.xtick_stride),
            show_processes: !opts.no_processes,
            show_storages: !opts.no_storages,
        },
        image_formats: settings.image_formats.clone(),
        ..ReportOptions::default()
    }
}

/// Handle the `report` command.
pub fn handle_report_command(
    results_dir: Option<&Path>,
    opts: &ReportOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    ensure!(
        opts.xticks != Some(0),
        "The tick stride must be greater than zero"
    );

    // Find the most recent result folder
    let results_dir = results_dir.unwrap_or(&settings.results_dir);
    let folder = most_recent_entry(results_dir)?;

    // Get path to output folder
    let output_path = opts.output_dir.as_deref().unwrap_or(&folder);
    create_output_directory(output_path).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_path.display()
        )
    })?;

    // Initialise program logger
    log::init(Some(&settings.log_level), Some(output_path))
        .context("Failed to initialise logging.")?;
    info!("Reading results from {}", folder.display());
    info!("Output folder: {}", output_path.display());

    let options = report_options(opts, &settings);
    let written = write_folder_reports(&folder, output_path, &options)?;
    info!("Report complete! {} files written", written.len());

    Ok(())
}

/// Handle the `scenario list` command.
fn handle_scenario_list_command(model_dir: &Path) -> Result<()> {
    let scenarios = load_scenarios(model_dir)?;
    for scenario in scenarios.values() {
        println!("{}: {}", scenario.name, scenario.description);
    }

    Ok(())
}

/// Handle the `scenario build` command.
pub fn handle_scenario_build_command(
    model_dir: &Path,
    name: &str,
    output_dir: Option<&Path>,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;

    // Initialise program logger (we won't save log files when building scenarios)
    log::init(Some(&settings.log_level), None).context("Failed to initialise logging.")?;

    let scenarios = load_scenarios(model_dir)?;
    let scenario = scenarios
        .get(name)
        .with_context(|| format!("Unknown scenario: {name}"))?;
    let base = Dataset::from_path(model_dir).context("Failed to load dataset.")?;
    let dataset = scenario.apply(&base)?;

    let pathbuf: PathBuf;
    let output_path = if let Some(p) = output_dir {
        p
    } else {
        pathbuf = PathBuf::from(format!("scenario_{name}"));
        &pathbuf
    };
    create_output_directory(output_path).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_path.display()
        )
    })?;
    dataset.write_to(output_path)?;
    info!(
        "Wrote dataset for scenario {name} to {}",
        output_path.display()
    );

    Ok(())
}

/// Handle the `costs` command.
fn handle_costs_command(technology: &str, from: u32, to: u32, step: u32) -> Result<()> {
    let technology: Technology = technology
        .parse()
        .with_context(|| format!("Unknown technology: {technology}"))?;
    ensure!(step > 0, "Step must be greater than zero");
    ensure!(from <= to, "First year must not be after last year");

    println!("year,investment,fixed,energy");
    for year in (from..=to).step_by(step as usize) {
        let point = cost_curve(technology, f64::from(year));
        let energy = point
            .energy
            .map(|energy| format!("{:.2}", energy.value()))
            .unwrap_or_default();
        println!(
            "{year},{:.2},{:.2},{energy}",
            point.investment.value(),
            point.fixed.value()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_site_pair() {
        let pair = parse_site_pair("Mid.Elec").unwrap();
        assert_eq!(pair, ("Mid".to_string(), "Elec".to_string()));
    }

    #[rstest]
    #[case("MidElec")]
    #[case(".Elec")]
    #[case("Mid.")]
    fn test_parse_site_pair_invalid(#[case] value: &str) {
        assert!(parse_site_pair(value).is_err());
    }

    #[test]
    fn test_report_options() {
        let opts = ReportOpts {
            output_dir: None,
            site: Some("Mid".into()),
            exclude: vec!["Slack powerplant".into()],
            pairs: vec![("Mid".into(), "Heat".into())],
            no_processes: false,
            no_storages: true,
            xticks: Some(3),
        };
        let options = report_options(&opts, &Settings::default());

        assert_eq!(options.aggregate.site, Some(SiteID::new("Mid")));
        let pairs: Vec<SitePair> = vec![(SiteID::new("Mid"), CommodityID::new("Heat"))];
        assert_eq!(options.aggregate.pairs, Some(pairs));
        assert_eq!(options.capacity.xtick_stride, 3);
        assert!(options.capacity.show_processes);
        assert!(!options.capacity.show_storages);
        assert_eq!(options.image_formats, Settings::default().image_formats);
    }

    #[test]
    fn test_costs_unknown_technology() {
        assert!(handle_costs_command("Fusion", 2020, 2050, 5).is_err());
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
