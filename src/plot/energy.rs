//! Charts of commodity flows: whole-year pie charts and stacked bars per period.
use super::{Axis, FONT_FAMILY, Figure, font};
use crate::aggregate::flow::{FlowShare, FlowTable, PeriodSeries};
use crate::calendar::PeriodKind;
use crate::id::CommodityID;
use crate::palette::Palette;
use crate::results::FlowSide;
use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;

/// The demand commodity whose flows are masses rather than energy
const CO2_COMMODITY: &str = "CO2";

/// Flows are reported in MWh (or t) and shown in GWh (or kt)
const UNIT_SCALE: f64 = 1000.0;

/// Shares at or below this percentage are not labelled on pie charts
const PIE_LABEL_MIN_PERCENT: f64 = 10.0;

/// The unit flows are shown in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowUnit {
    /// Gigawatt hours
    GWh,
    /// Kilotonnes
    Kt,
}

impl FlowUnit {
    /// The unit for flows of a demand commodity
    pub fn for_demand(demand: &CommodityID) -> Self {
        if is_co2(demand) { Self::Kt } else { Self::GWh }
    }

    /// The label for the unit
    pub fn label(self) -> &'static str {
        match self {
            Self::GWh => "GWh",
            Self::Kt => "kt",
        }
    }

    /// Convert a flow from the model's units into this unit
    pub fn scale(self, value: f64) -> f64 {
        value / UNIT_SCALE
    }
}

/// Whether a demand commodity is CO2
fn is_co2(demand: &CommodityID) -> bool {
    demand.as_str().eq_ignore_ascii_case(CO2_COMMODITY)
}

/// Whether flows of this demand on this side are charted.
///
/// CO2 is never charted on the consumption side.
pub fn is_charted(demand: &CommodityID, side: FlowSide) -> bool {
    !(side == FlowSide::Consumption && is_co2(demand))
}

/// The label shown on a pie slice: the rounded percentage, for large enough shares only
pub fn pie_label(value: f64, total: f64) -> String {
    let percent = 100.0 * value / total;
    if percent > PIE_LABEL_MIN_PERCENT {
        format!("{percent:.0}%")
    } else {
        String::new()
    }
}

/// Add the values of each period, giving the height of the stacked bars
fn stack_heights(series: &[PeriodSeries], periods: usize) -> Vec<f64> {
    let mut heights = vec![0.0; periods];
    for contributor in series {
        for (height, value) in heights.iter_mut().zip(&contributor.values) {
            *height += value;
        }
    }

    heights
}

/// Draw a legend of coloured squares down the left edge of an area
fn draw_legend<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    entries: &[(&str, RGBColor)],
    font_size: u32,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let line_height = (font_size * 3 / 2) as i32;
    for (i, (label, colour)) in entries.iter().enumerate() {
        let y = 20 + i as i32 * line_height;
        area.draw(&Rectangle::new([(0, y), (12, y + 12)], colour.filled()))?;
        area.draw(&Text::new(
            label.to_string(),
            (20, y),
            font(font_size),
        ))?;
    }

    Ok(())
}

/// A pie chart of whole-year shares of one side of a commodity balance
pub struct YearShareFigure<'a> {
    title: String,
    shares: Vec<FlowShare>,
    palette: &'a Palette,
    font_size: u32,
}

impl<'a> YearShareFigure<'a> {
    /// Create the chart for one side of a flow table.
    ///
    /// Returns `None` if the side is not charted or there is nothing to show.
    pub fn new(
        table: &FlowTable,
        side: FlowSide,
        palette: &'a Palette,
        font_size: u32,
    ) -> Option<Self> {
        if !is_charted(&table.demand, side) {
            return None;
        }

        let shares = table.year_shares(side);
        let total: f64 = shares.iter().map(|share| share.value).sum();
        if shares.is_empty() || total <= 0.0 {
            return None;
        }

        Some(Self {
            title: format!("{} {} ({side})", table.site, table.demand),
            shares,
            palette,
            font_size,
        })
    }

    /// The labels shown on the slices
    pub fn slice_labels(&self) -> Vec<String> {
        let total: f64 = self.shares.iter().map(|share| share.value).sum();
        self.shares
            .iter()
            .map(|share| pie_label(share.value, total))
            .collect()
    }
}

impl Figure for YearShareFigure<'_> {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        root.fill(&WHITE)?;
        let area = root.titled(&self.title, font(self.font_size + 4))?;
        let (width, height) = area.dim_in_pixel();
        let (pie_area, legend_area) = area.split_horizontally(width * 2 / 3);

        let center = ((width / 3) as i32, (height / 2) as i32);
        let radius = f64::from(width.min(height)) * 0.35;
        let sizes: Vec<f64> = self.shares.iter().map(|share| share.value).collect();
        let colours: Vec<RGBColor> = self
            .shares
            .iter()
            .map(|share| self.palette.colour(share.colour))
            .collect();
        let labels = self.slice_labels();

        let mut pie = Pie::new(&center, &radius, &sizes, &colours, &labels);
        pie.start_angle(90.0);
        pie.label_style(font(self.font_size).color(&BLACK));
        pie.label_offset(-20.0);
        pie_area.draw(&pie)?;

        let entries: Vec<_> = self
            .shares
            .iter()
            .zip(&colours)
            .map(|(share, colour)| (&*share.label, *colour))
            .collect();
        draw_legend(&legend_area, &entries, self.font_size)
    }
}

/// Stacked bars of one side of a commodity balance for each period of a kind
pub struct PeriodFigure<'a> {
    title: String,
    kind: PeriodKind,
    unit: FlowUnit,
    series: Vec<PeriodSeries>,
    palette: &'a Palette,
    font_size: u32,
}

impl<'a> PeriodFigure<'a> {
    /// Create the chart for one side of a flow table.
    ///
    /// Values are converted to GWh (kt for CO2). Returns `None` if the side is not charted or
    /// there is nothing to show.
    pub fn new(
        table: &FlowTable,
        side: FlowSide,
        kind: PeriodKind,
        palette: &'a Palette,
        font_size: u32,
    ) -> Option<Self> {
        if !is_charted(&table.demand, side) {
            return None;
        }

        let unit = FlowUnit::for_demand(&table.demand);
        let series: Vec<_> = table
            .period_series(side, kind)
            .into_iter()
            .map(|mut contributor| {
                for value in &mut contributor.values {
                    *value = unit.scale(*value);
                }
                contributor
            })
            .collect();
        if series.is_empty() {
            return None;
        }

        Some(Self {
            title: format!("{} {} ({side})", table.site, table.demand),
            kind,
            unit,
            series,
            palette,
            font_size,
        })
    }

    /// The stacked contributors, in units of [`Self::unit`]
    pub fn series(&self) -> &[PeriodSeries] {
        &self.series
    }

    /// The unit values are shown in
    pub fn unit(&self) -> FlowUnit {
        self.unit
    }

    /// Only label every n-th period, so that week labels do not overlap
    fn label_every(&self) -> usize {
        match self.kind {
            PeriodKind::Month => 1,
            PeriodKind::Week => 4,
        }
    }
}

impl Figure for PeriodFigure<'_> {
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        root.fill(&WHITE)?;
        let periods = self.kind.count();
        let heights = stack_heights(&self.series, periods);
        let axis = Axis::new(heights.iter().copied().fold(0.0, f64::max), 1);
        let tick_font_size = self.font_size.saturating_sub(2).max(1);

        let mut chart = ChartBuilder::on(root)
            .caption(&self.title, (FONT_FAMILY, self.font_size + 4))
            .margin(15)
            .x_label_area_size(self.font_size * 3)
            .y_label_area_size(self.font_size * 5)
            .build_cartesian_2d((0..periods as i32).into_segmented(), 0.0..axis.max)?;

        let label_every = self.label_every();
        let x_formatter = |x: &SegmentValue<i32>| match x {
            SegmentValue::CenterOf(index) => usize::try_from(*index)
                .ok()
                .filter(|index| index % label_every == 0)
                .map(|index| self.kind.label(index))
                .unwrap_or_default(),
            _ => String::new(),
        };
        let y_formatter = |y: &f64| axis.tick_label(*y);
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(periods + 1)
            .y_labels(axis.tick_count())
            .x_label_formatter(&x_formatter)
            .y_label_formatter(&y_formatter)
            .y_desc(format!("Energy ({})", self.unit.label()))
            .axis_desc_style((FONT_FAMILY, self.font_size))
            .label_style((FONT_FAMILY, tick_font_size))
            .draw()?;

        let mut bottoms = vec![0.0; periods];
        for contributor in &self.series {
            let colour = self.palette.colour(contributor.colour);
            let bars: Vec<_> = contributor
                .values
                .iter()
                .zip(&bottoms)
                .enumerate()
                .map(|(index, (value, bottom))| {
                    let index = index as i32;
                    let mut rect = Rectangle::new(
                        [
                            (SegmentValue::Exact(index), *bottom),
                            (SegmentValue::Exact(index + 1), bottom + value),
                        ],
                        colour.filled(),
                    );
                    rect.set_margin(0, 0, 2, 2);
                    rect
                })
                .collect();
            chart
                .draw_series(bars)?
                .label(contributor.label.to_string())
                .legend(move |(x, y)| {
                    Rectangle::new([(x, y - 6), (x + 12, y + 6)], colour.filled())
                });

            for (bottom, value) in bottoms.iter_mut().zip(&contributor.values) {
                *bottom += value;
            }
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .label_font((FONT_FAMILY, tick_font_size))
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::annual_timeseries;
    use crate::plot::{ImageFormat, save_figure};
    use crate::results::TimeSeries;
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::tempdir;

    /// Draw a figure to an SVG file, returning the file contents
    fn draw_svg<F: Figure>(figure: &F) -> String {
        let dir = tempdir().unwrap();
        let stem = dir.path().join("flows");
        let paths = save_figure(figure, &stem, &[ImageFormat::Svg], (800, 600)).unwrap();
        fs::read_to_string(&paths[0]).unwrap()
    }

    #[fixture]
    fn table(annual_timeseries: TimeSeries) -> FlowTable {
        FlowTable::from_timeseries("Mid".into(), "Elec".into(), &annual_timeseries)
    }

    #[rstest]
    #[case(50.0, 100.0, "50%")]
    #[case(10.6, 100.0, "11%")]
    #[case(10.0, 100.0, "")]
    #[case(1.0, 3.0, "33%")]
    #[case(0.0, 3.0, "")]
    fn test_pie_label(#[case] value: f64, #[case] total: f64, #[case] expected: &str) {
        assert_eq!(pie_label(value, total), expected);
    }

    #[test]
    fn test_co2_excluded_from_consumption() {
        let co2 = CommodityID::from("CO2");
        let elec = CommodityID::from("Elec");
        assert!(is_charted(&co2, FlowSide::Production));
        assert!(!is_charted(&co2, FlowSide::Consumption));
        assert!(is_charted(&elec, FlowSide::Consumption));

        let palette = Palette::default();
        let table = FlowTable::empty("Mid".into(), co2);
        assert!(YearShareFigure::new(&table, FlowSide::Consumption, &palette, 16).is_none());
        assert!(
            PeriodFigure::new(
                &table,
                FlowSide::Consumption,
                PeriodKind::Month,
                &palette,
                16
            )
            .is_none()
        );
    }

    #[test]
    fn test_units() {
        assert_eq!(FlowUnit::for_demand(&"CO2".into()), FlowUnit::Kt);
        assert_eq!(FlowUnit::for_demand(&"Elec".into()), FlowUnit::GWh);
        assert_approx_eq!(f64, FlowUnit::GWh.scale(8760.0), 8.76);
    }

    #[rstest]
    fn test_period_figure_scaled(table: FlowTable) {
        let palette = Palette::default();
        let figure = PeriodFigure::new(
            &table,
            FlowSide::Production,
            PeriodKind::Month,
            &palette,
            16,
        )
        .unwrap();
        assert_eq!(figure.unit(), FlowUnit::GWh);

        let gas = &figure.series()[0];
        assert_eq!(&*gas.label, "Gas plant");
        assert_eq!(gas.values.len(), 12);
        assert_approx_eq!(f64, gas.values[0], 0.744); // 744 MWh in January
        assert_eq!(Some(gas.colour), table.colours().index_of("Gas plant"));

        let heights = stack_heights(figure.series(), 12);
        assert_approx_eq!(f64, heights[1], 672.0 * 1.5 / 1000.0);
    }

    #[rstest]
    fn test_year_share_labels(table: FlowTable) {
        let palette = Palette::default();
        let figure = YearShareFigure::new(&table, FlowSide::Production, &palette, 16).unwrap();

        // Gas plant produces twice as much as photovoltaics
        assert_eq!(figure.slice_labels(), ["67%", "33%"]);
    }

    #[test]
    fn test_empty_table_gives_no_figures() {
        let palette = Palette::default();
        let table = FlowTable::empty("Mid".into(), "Elec".into());
        assert!(YearShareFigure::new(&table, FlowSide::Production, &palette, 16).is_none());
        assert!(
            PeriodFigure::new(&table, FlowSide::Production, PeriodKind::Week, &palette, 16)
                .is_none()
        );
    }

    #[rstest]
    fn test_draw_year_shares(table: FlowTable) {
        let palette = Palette::default();
        let figure = YearShareFigure::new(&table, FlowSide::Production, &palette, 16).unwrap();
        let svg = draw_svg(&figure);
        assert!(svg.contains("Mid Elec (production)"));
        assert!(svg.contains("Photovoltaics"));
        assert!(svg.contains("67%"));
    }

    #[rstest]
    #[case(PeriodKind::Month, ">Jan<")]
    #[case(PeriodKind::Week, ">W1<")]
    fn test_draw_periods(table: FlowTable, #[case] kind: PeriodKind, #[case] first_label: &str) {
        let palette = Palette::default();
        let figure = PeriodFigure::new(&table, FlowSide::Consumption, kind, &palette, 16).unwrap();
        let svg = draw_svg(&figure);
        assert!(svg.contains(first_label));
        assert!(svg.contains("Energy (GWh)"));
        assert!(svg.contains("Battery"));
    }
}
