//! Generating the charts and summary tables for solved scenarios.
use crate::aggregate::flow::FlowTable;
use crate::aggregate::{AggregateOptions, aggregate};
use crate::calendar::PeriodKind;
use crate::output::{ReportNamer, write_capacity_summary, write_flow_summary};
use crate::palette::Palette;
use crate::plot::capacity::{CapacityFigure, CapacityLayout, CapacityPlotOptions};
use crate::plot::energy::{PeriodFigure, YearShareFigure};
use crate::plot::{DEFAULT_FIGURE_SIZE, ImageFormat, save_figure};
use crate::results::discovery::{glob_result_files, scenario_name};
use crate::results::{FlowSide, ResultSource};
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Options controlling what goes into a report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    /// Which results to aggregate
    pub aggregate: AggregateOptions,
    /// How to draw the capacity chart
    pub capacity: CapacityPlotOptions,
    /// The formats each figure is written in
    pub image_formats: Vec<ImageFormat>,
    /// The size of each figure in pixels
    pub figure_size: (u32, u32),
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            aggregate: AggregateOptions::default(),
            capacity: CapacityPlotOptions::default(),
            image_formats: vec![ImageFormat::Png, ImageFormat::Svg],
            figure_size: DEFAULT_FIGURE_SIZE,
        }
    }
}

/// Write the report for one scenario to `output_dir`, returning the paths of the files written
pub fn write_report(
    source: ResultSource,
    scenario: &str,
    output_dir: &Path,
    options: &ReportOptions,
) -> Result<Vec<PathBuf>> {
    let (capacities, flows) = aggregate(source, &options.aggregate)?;
    let namer = ReportNamer::new(output_dir, scenario);
    let palette = Palette::default();
    let mut written = Vec::new();

    // An empty capacity chart is still saved, as a blank canvas
    let figure = CapacityFigure::new(&capacities, options.capacity.clone(), &palette);
    if figure.layout() == CapacityLayout::Empty {
        info!("No capacities to show for scenario {scenario}");
    }
    let stem = namer.capacity_stem(options.aggregate.site.as_ref());
    written.extend(save_figure(
        &figure,
        &stem,
        &options.image_formats,
        options.figure_size,
    )?);

    for table in flows.values() {
        if table.is_empty() {
            debug!("No flows for {}.{}", table.site, table.demand);
            continue;
        }
        written.extend(write_energy_figures(table, &namer, &palette, options)?);
    }

    let path = namer.capacities_csv();
    write_capacity_summary(&path, &capacities)?;
    written.push(path);

    let path = namer.flows_csv();
    write_flow_summary(&path, &flows)?;
    written.push(path);

    Ok(written)
}

/// Draw the pie and per-period charts for both sides of one flow table
fn write_energy_figures(
    table: &FlowTable,
    namer: &ReportNamer,
    palette: &Palette,
    options: &ReportOptions,
) -> Result<Vec<PathBuf>> {
    let font_size = options.capacity.font_size;
    let mut written = Vec::new();
    for side in [FlowSide::Production, FlowSide::Consumption] {
        if let Some(figure) = YearShareFigure::new(table, side, palette, font_size) {
            let stem = namer.year_stem(&table.site, &table.demand, side);
            written.extend(save_figure(
                &figure,
                &stem,
                &options.image_formats,
                options.figure_size,
            )?);
        }

        for kind in [PeriodKind::Month, PeriodKind::Week] {
            if let Some(figure) = PeriodFigure::new(table, side, kind, palette, font_size) {
                let stem = namer.period_stem(&table.site, &table.demand, kind, side);
                written.extend(save_figure(
                    &figure,
                    &stem,
                    &options.image_formats,
                    options.figure_size,
                )?);
            }
        }
    }

    Ok(written)
}

/// Write a report for every result file in `folder`, returning the paths of the files written
pub fn write_folder_reports(
    folder: &Path,
    output_dir: &Path,
    options: &ReportOptions,
) -> Result<Vec<PathBuf>> {
    let (files, file_type) = glob_result_files(folder)?;
    info!(
        "Found {} {file_type} result file(s) in {}",
        files.len(),
        folder.display()
    );

    let mut written = Vec::new();
    for file in files {
        let scenario = scenario_name(&file);
        info!("Writing report for scenario {scenario}");
        let paths = write_report(ResultSource::File(file.clone()), &scenario, output_dir, options)
            .with_context(|| format!("Failed to write report for {}", file.display()))?;
        written.extend(paths);
    }

    Ok(written)
}
