//! Colours for plots.
//!
//! Each contributor to a (site, demand) pair gets a fixed index into a categorical palette, so
//! that it is drawn in the same colour on every chart for that pair.
use indexmap::IndexMap;
use plotters::style::RGBColor;
use std::rc::Rc;

/// A fixed list of colours
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colours: Vec<RGBColor>,
}

/// Colour for installed capacity
pub const INSTALLED_COLOUR: usize = 1;

/// Colour for newly built capacity
pub const NEW_COLOUR: usize = 3;

impl Default for Palette {
    fn default() -> Self {
        Self::new(vec![
            RGBColor(176, 196, 222), // lightsteelblue
            RGBColor(100, 149, 237), // cornflowerblue
            RGBColor(65, 105, 225),  // royalblue
            RGBColor(144, 238, 144), // lightgreen
            RGBColor(250, 128, 114), // salmon
            RGBColor(60, 179, 113),  // mediumseagreen
            RGBColor(218, 112, 214), // orchid
            RGBColor(222, 184, 135), // burlywood
            RGBColor(238, 232, 170), // palegoldenrod
            RGBColor(188, 184, 138), // sage
            RGBColor(135, 206, 250), // lightskyblue
            RGBColor(178, 34, 34),   // firebrick
            RGBColor(0, 0, 255),     // blue
            RGBColor(0, 100, 0),     // darkgreen
        ])
    }
}

impl Palette {
    /// Create a palette from a non-empty list of colours
    pub fn new(colours: Vec<RGBColor>) -> Self {
        assert!(!colours.is_empty(), "Palette cannot be empty");
        Self { colours }
    }

    /// Get the colour for an index, wrapping around if the index exceeds the palette length
    pub fn colour(&self, index: usize) -> RGBColor {
        self.colours[index % self.colours.len()]
    }

    /// The number of distinct colours
    pub fn len(&self) -> usize {
        self.colours.len()
    }

    /// Whether the palette has no colours (never true)
    pub fn is_empty(&self) -> bool {
        self.colours.is_empty()
    }
}

/// A stable mapping from contributor labels to colour indexes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColourAssignment {
    indexes: IndexMap<Rc<str>, usize>,
}

impl ColourAssignment {
    /// Assign colour indexes to labels.
    ///
    /// Labels are sorted and de-duplicated first, so the assignment depends only on the set of
    /// labels, not on the order in which they were encountered.
    pub fn new<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a Rc<str>>,
    {
        let mut labels: Vec<_> = labels.into_iter().cloned().collect();
        labels.sort();
        labels.dedup();

        Self {
            indexes: labels
                .into_iter()
                .enumerate()
                .map(|(index, label)| (label, index))
                .collect(),
        }
    }

    /// The colour index for `label`, if it is known
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.indexes.get(label).copied()
    }

    /// The number of labels with colours
    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    /// Whether no labels have colours
    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<Rc<str>> {
        names.iter().map(|name| Rc::from(*name)).collect()
    }

    #[test]
    fn test_assignment_independent_of_order() {
        let a = ColourAssignment::new(&labels(&["PV", "Gas plant", "Import", "PV"]));
        let b = ColourAssignment::new(&labels(&["Import", "PV", "Gas plant"]));
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.index_of("Gas plant"), Some(0));
        assert_eq!(a.index_of("Import"), Some(1));
        assert_eq!(a.index_of("PV"), Some(2));
        assert_eq!(a.index_of("Wind"), None);
    }

    #[test]
    fn test_palette_wraps_around() {
        let palette = Palette::default();
        assert_eq!(palette.len(), 14);
        assert_eq!(palette.colour(0), palette.colour(14));
        assert_eq!(palette.colour(INSTALLED_COLOUR), RGBColor(100, 149, 237));
    }
}
