//! Drawing figures and saving them as image files.
use anyhow::{Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use strum::{Display, EnumIter};

pub mod capacity;
pub mod energy;

/// The font family used for all text
pub const FONT_FAMILY: &str = "sans-serif";

/// The default size of a figure in pixels
pub const DEFAULT_FIGURE_SIZE: (u32, u32) = (1100, 700);

/// Headroom added above the largest value on an axis
const AXIS_HEADROOM: f64 = 1.1;

/// The number of ticks aimed for before thinning
const TARGET_TICKS: f64 = 8.0;

/// The font for free-standing text of the given size
pub fn font(size: u32) -> FontDesc<'static> {
    FontDesc::new(FontFamily::SansSerif, f64::from(size), FontStyle::Normal)
}

/// The image formats figures can be saved in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageFormat {
    /// Portable Network Graphics (raster)
    Png,
    /// Scalable Vector Graphics
    Svg,
}

impl ImageFormat {
    /// The file extension for this format
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }
}

/// Something which can be drawn onto a drawing area
pub trait Figure {
    /// Draw the figure, filling the whole of `root`
    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static;
}

/// The path of the image file for a figure (e.g. `stem.png`)
pub fn image_path(stem: &Path, format: ImageFormat) -> PathBuf {
    let mut name = OsString::from(stem.as_os_str());
    name.push(".");
    name.push(format.extension());
    name.into()
}

/// Draw a figure to one file per image format, returning the paths written
pub fn save_figure<F: Figure>(
    figure: &F,
    stem: &Path,
    formats: &[ImageFormat],
    size: (u32, u32),
) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(formats.len());
    for &format in formats {
        let path = image_path(stem, format);
        let result = match format {
            ImageFormat::Png => {
                let root = BitMapBackend::new(&path, size).into_drawing_area();
                figure.draw(&root).and_then(|()| Ok(root.present()?))
            }
            ImageFormat::Svg => {
                let root = SVGBackend::new(&path, size).into_drawing_area();
                figure.draw(&root).and_then(|()| Ok(root.present()?))
            }
        };
        result.with_context(|| format!("Failed to draw {}", path.display()))?;
        paths.push(path);
    }

    Ok(paths)
}

/// Format a number rounded to an integer, grouping thousands with commas (e.g. "1,234,567")
pub fn group_thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        grouped.push('-');
    }
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    grouped
}

/// Round a step size up to 1, 2 or 5 times a power of ten
fn nice_step(raw: f64) -> f64 {
    let magnitude = 10f64.powf(raw.log10().floor());
    let fraction = raw / magnitude;
    let nice = if fraction <= 1.0 {
        1.0
    } else if fraction <= 2.0 {
        2.0
    } else if fraction <= 5.0 {
        5.0
    } else {
        10.0
    };

    nice * magnitude
}

/// A linear axis starting at zero
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    /// The upper limit of the axis
    pub max: f64,
    /// The distance between neighbouring ticks
    pub step: f64,
    /// Where labelled ticks go
    pub ticks: Vec<f64>,
}

impl Axis {
    /// An axis for values up to `data_max`, labelling every `stride`-th tick.
    ///
    /// The axis extends 10% beyond `data_max`. If there are no positive values, the axis
    /// covers zero to one.
    pub fn new(data_max: f64, stride: usize) -> Self {
        let max = if data_max > 0.0 && data_max.is_finite() {
            data_max * AXIS_HEADROOM
        } else {
            1.0
        };

        let step = nice_step(max / TARGET_TICKS);
        let ticks = (0u32..)
            .map(|i| f64::from(i) * step)
            .take_while(|tick| *tick <= max)
            .step_by(stride.max(1))
            .collect();

        Self { max, step, ticks }
    }

    /// The number of ticks on the axis, labelled or not
    pub fn tick_count(&self) -> usize {
        (self.max / self.step).floor() as usize + 1
    }

    /// The label for a tick: the grouped value for labelled ticks, otherwise blank
    pub fn tick_label(&self, value: f64) -> String {
        let tolerance = self.step * 1e-6;
        if self.ticks.iter().any(|tick| (tick - value).abs() <= tolerance) {
            group_thousands(value)
        } else {
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, "0")]
    #[case(999.4, "999")]
    #[case(1000.0, "1,000")]
    #[case(1234567.0, "1,234,567")]
    #[case(100000.0, "100,000")]
    #[case(-12345.0, "-12,345")]
    fn test_group_thousands(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(group_thousands(value), expected);
    }

    #[rstest]
    #[case(0.3, 0.5)]
    #[case(1.0, 1.0)]
    #[case(13.75, 20.0)]
    #[case(4500.0, 5000.0)]
    #[case(7.0, 10.0)]
    fn test_nice_step(#[case] raw: f64, #[case] expected: f64) {
        assert_approx_eq!(f64, nice_step(raw), expected);
    }

    #[test]
    fn test_axis() {
        let axis = Axis::new(100.0, 1);
        assert_approx_eq!(f64, axis.max, 110.0);
        assert_eq!(axis.ticks, [0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);

        // Keep every second tick
        let axis = Axis::new(100.0, 2);
        assert_eq!(axis.ticks, [0.0, 40.0, 80.0]);
    }

    #[test]
    fn test_axis_tick_labels() {
        let axis = Axis::new(10000.0, 2);
        assert_approx_eq!(f64, axis.step, 2000.0);
        assert_eq!(axis.tick_count(), 6);
        assert_eq!(axis.tick_label(0.0), "0");
        assert_eq!(axis.tick_label(2000.0), "");
        assert_eq!(axis.tick_label(4000.0), "4,000");
        assert_eq!(axis.tick_label(8000.0 + 1e-9), "8,000");
    }

    #[test]
    fn test_axis_without_data() {
        let axis = Axis::new(0.0, 2);
        assert_eq!(axis.max, 1.0);
        assert_eq!(axis.ticks.first(), Some(&0.0));
    }

    #[test]
    fn test_image_path() {
        let stem = Path::new("out/scenario_co2_limit_Mid");
        assert_eq!(
            image_path(stem, ImageFormat::Png),
            Path::new("out/scenario_co2_limit_Mid.png")
        );
        assert_eq!(
            image_path(stem, ImageFormat::Svg),
            Path::new("out/scenario_co2_limit_Mid.svg")
        );
    }
}
