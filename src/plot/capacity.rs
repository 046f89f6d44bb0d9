//! Horizontal bar charts of installed and new capacity.
use super::{Axis, FONT_FAMILY, Figure};
use crate::aggregate::capacity::CapacityTables;
use crate::palette::{INSTALLED_COLOUR, NEW_COLOUR, Palette};
use crate::results::CapacityPair;
use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::rc::Rc;

/// Label for power capacity axes
const POWER_AXIS_LABEL: &str = "Power Capacity (MW)";

/// Label for energy capacity axes
const ENERGY_AXIS_LABEL: &str = "Energy Capacity (MWh)";

/// Options for capacity charts
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityPlotOptions {
    /// Font size for axis descriptions. Tick labels are two points smaller.
    pub font_size: u32,
    /// Label every `xtick_stride`-th tick
    pub xtick_stride: usize,
    /// Whether to include process capacities
    pub show_processes: bool,
    /// Whether to include storage capacities
    pub show_storages: bool,
}

impl Default for CapacityPlotOptions {
    fn default() -> Self {
        Self {
            font_size: 16,
            xtick_stride: 2,
            show_processes: true,
            show_storages: true,
        }
    }
}

/// Where the legend goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendPosition {
    /// Top right corner
    UpperRight,
    /// Top, centred
    UpperCenter,
    /// Top left corner
    UpperLeft,
}

impl From<LegendPosition> for SeriesLabelPosition {
    fn from(position: LegendPosition) -> Self {
        match position {
            LegendPosition::UpperRight => Self::UpperRight,
            LegendPosition::UpperCenter => Self::UpperMiddle,
            LegendPosition::UpperLeft => Self::UpperLeft,
        }
    }
}

/// The arrangement of panels in a capacity chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityLayout {
    /// Nothing to show
    Empty,
    /// A single panel of process power capacities
    ProcessesOnly,
    /// Storage power and energy panels side by side
    StoragesOnly,
    /// Processes above storages, with heights in proportion to their row counts
    Both {
        /// Number of process rows
        process_rows: usize,
        /// Number of storage rows
        storage_rows: usize,
    },
}

impl CapacityLayout {
    /// Choose the layout for the given tables
    pub fn plan(tables: &CapacityTables, options: &CapacityPlotOptions) -> Self {
        let process_rows = if options.show_processes {
            tables.processes.len()
        } else {
            0
        };
        let storage_rows = if options.show_storages {
            tables.storages.len()
        } else {
            0
        };

        match (process_rows, storage_rows) {
            (0, 0) => Self::Empty,
            (_, 0) => Self::ProcessesOnly,
            (0, _) => Self::StoragesOnly,
            (process_rows, storage_rows) => Self::Both {
                process_rows,
                storage_rows,
            },
        }
    }

    /// Where the legend goes, if there is one
    pub fn legend_position(self) -> Option<LegendPosition> {
        match self {
            Self::Empty => None,
            Self::ProcessesOnly => Some(LegendPosition::UpperRight),
            Self::StoragesOnly => Some(LegendPosition::UpperCenter),
            Self::Both { .. } => Some(LegendPosition::UpperLeft),
        }
    }

    /// The fraction of the height taken by the process panel
    pub fn process_height_fraction(self) -> f64 {
        match self {
            Self::Empty | Self::StoragesOnly => 0.0,
            Self::ProcessesOnly => 1.0,
            Self::Both {
                process_rows,
                storage_rows,
            } => process_rows as f64 / (process_rows + storage_rows) as f64,
        }
    }
}

/// The largest of some values, or zero if there are none
fn max_of<I: Iterator<Item = f64>>(values: I) -> f64 {
    values.fold(0.0, f64::max)
}

/// One panel of horizontal bars
struct Panel<'a> {
    rows: Vec<(&'a Rc<str>, CapacityPair)>,
    axis: &'a Axis,
    description: &'static str,
    show_names: bool,
    show_tick_labels: bool,
    legend: Option<LegendPosition>,
}

/// A chart of process and storage capacities
pub struct CapacityFigure<'a> {
    tables: &'a CapacityTables,
    options: CapacityPlotOptions,
    palette: &'a Palette,
    layout: CapacityLayout,
}

impl<'a> CapacityFigure<'a> {
    /// Create a new [`CapacityFigure`]
    pub fn new(
        tables: &'a CapacityTables,
        options: CapacityPlotOptions,
        palette: &'a Palette,
    ) -> Self {
        let layout = CapacityLayout::plan(tables, &options);
        Self {
            tables,
            options,
            palette,
            layout,
        }
    }

    /// The layout of the chart
    pub fn layout(&self) -> CapacityLayout {
        self.layout
    }

    /// The axes for process power, storage power and storage energy.
    ///
    /// When processes are shown, the process and storage power axes share their range.
    fn axes(&self) -> (Axis, Axis, Axis) {
        let stride = self.options.xtick_stride;

        let process_max = if self.options.show_processes {
            max_of(self.tables.processes.values().map(|cap| cap.total))
        } else {
            0.0
        };
        let mut storage_power_max =
            max_of(self.tables.storages.values().map(|cap| cap.power.total));
        if matches!(self.layout, CapacityLayout::Both { .. }) {
            storage_power_max = storage_power_max.max(process_max);
        }
        let energy_max = max_of(self.tables.storages.values().map(|cap| cap.energy.total));

        let process_axis = match self.layout {
            CapacityLayout::Both { .. } => Axis::new(storage_power_max, stride),
            _ => Axis::new(process_max, stride),
        };

        (
            process_axis,
            Axis::new(storage_power_max, stride),
            Axis::new(energy_max, stride),
        )
    }

    /// Draw one panel of bars
    fn draw_panel<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        panel: &Panel<'_>,
    ) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let font_size = self.options.font_size;
        let tick_font_size = font_size.saturating_sub(2).max(1);
        let name_width = if panel.show_names {
            let longest = panel.rows.iter().map(|(name, _)| name.chars().count());
            longest.max().unwrap_or(0) as u32 * tick_font_size * 3 / 5 + 10
        } else {
            10
        };

        let row_count = panel.rows.len() as i32;
        let mut chart = ChartBuilder::on(area)
            .margin(10)
            .x_label_area_size(font_size * 3)
            .y_label_area_size(name_width)
            .build_cartesian_2d(0.0..panel.axis.max, (0..row_count).into_segmented())?;

        let x_formatter = |x: &f64| {
            if panel.show_tick_labels {
                panel.axis.tick_label(*x)
            } else {
                String::new()
            }
        };
        let y_formatter = |y: &SegmentValue<i32>| match y {
            SegmentValue::CenterOf(row) if panel.show_names => usize::try_from(*row)
                .ok()
                .and_then(|row| panel.rows.get(row))
                .map(|(name, _)| name.to_string())
                .unwrap_or_default(),
            _ => String::new(),
        };
        chart
            .configure_mesh()
            .disable_y_mesh()
            .x_labels(panel.axis.tick_count())
            .y_labels(panel.rows.len() + 1)
            .x_desc(panel.description)
            .axis_desc_style((FONT_FAMILY, font_size))
            .label_style((FONT_FAMILY, tick_font_size))
            .x_label_formatter(&x_formatter)
            .y_label_formatter(&y_formatter)
            .draw()?;

        let installed_colour = self.palette.colour(INSTALLED_COLOUR);
        let new_colour = self.palette.colour(NEW_COLOUR);
        let bar = |row: usize, start: f64, end: f64, colour: RGBColor| {
            let row = row as i32;
            let mut rect = Rectangle::new(
                [
                    (start, SegmentValue::Exact(row)),
                    (end, SegmentValue::Exact(row + 1)),
                ],
                colour.filled(),
            );
            rect.set_margin(4, 4, 0, 0);
            rect
        };

        chart
            .draw_series(
                panel
                    .rows
                    .iter()
                    .enumerate()
                    .map(|(row, (_, cap))| bar(row, 0.0, cap.installed(), installed_colour)),
            )?
            .label("Installed")
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 6), (x + 12, y + 6)], installed_colour.filled())
            });
        chart
            .draw_series(
                panel
                    .rows
                    .iter()
                    .enumerate()
                    .map(|(row, (_, cap))| bar(row, cap.installed(), cap.total, new_colour)),
            )?
            .label("New")
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 6), (x + 12, y + 6)], new_colour.filled())
            });

        if let Some(position) = panel.legend {
            chart
                .configure_series_labels()
                .position(position.into())
                .label_font((FONT_FAMILY, tick_font_size))
                .background_style(&WHITE.mix(0.8))
                .draw()?;
        }

        Ok(())
    }
}

impl Figure for CapacityFigure<'_> {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        root.fill(&WHITE)?;
        let legend = self.layout.legend_position();
        if self.layout == CapacityLayout::Empty {
            return Ok(());
        }

        let (process_axis, storage_power_axis, energy_axis) = self.axes();
        let process_panel = Panel {
            rows: self
                .tables
                .processes
                .iter()
                .map(|(name, cap)| (name, *cap))
                .collect(),
            axis: &process_axis,
            description: POWER_AXIS_LABEL,
            show_names: true,
            // Process ticks are only labelled when the axis is not shared with storages
            show_tick_labels: self.layout == CapacityLayout::ProcessesOnly,
            legend,
        };
        let storage_legend = match self.layout {
            CapacityLayout::StoragesOnly => legend,
            _ => None,
        };
        let storage_power_panel = Panel {
            rows: self
                .tables
                .storages
                .iter()
                .map(|(name, cap)| (name, cap.power))
                .collect(),
            axis: &storage_power_axis,
            description: POWER_AXIS_LABEL,
            show_names: true,
            show_tick_labels: true,
            legend: storage_legend,
        };
        let energy_panel = Panel {
            rows: self
                .tables
                .storages
                .iter()
                .map(|(name, cap)| (name, cap.energy))
                .collect(),
            axis: &energy_axis,
            description: ENERGY_AXIS_LABEL,
            show_names: false,
            show_tick_labels: true,
            legend: None,
        };

        match self.layout {
            CapacityLayout::Empty => {}
            CapacityLayout::ProcessesOnly => self.draw_panel(root, &process_panel)?,
            CapacityLayout::StoragesOnly => {
                let (left, right) = root.split_horizontally(root.dim_in_pixel().0 / 2);
                self.draw_panel(&left, &storage_power_panel)?;
                self.draw_panel(&right, &energy_panel)?;
            }
            CapacityLayout::Both { .. } => {
                let height = f64::from(root.dim_in_pixel().1);
                let split = (height * self.layout.process_height_fraction()) as u32;
                let (upper, lower) = root.split_vertically(split);
                let (process_area, _) = upper.split_horizontally(upper.dim_in_pixel().0 / 2);
                let (power_area, energy_area) =
                    lower.split_horizontally(lower.dim_in_pixel().0 / 2);
                self.draw_panel(&process_area, &process_panel)?;
                self.draw_panel(&power_area, &storage_power_panel)?;
                self.draw_panel(&energy_area, &energy_panel)?;
            }
        }

        Ok(())
    }
}
