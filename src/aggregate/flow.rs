//! Flow summary tables: commodity flows summed over periods of the year.
use crate::calendar::{PeriodKind, in_year};
use crate::id::{CommodityID, SiteID};
use crate::palette::ColourAssignment;
use crate::results::{FlowDirection, FlowSide, SitePair, TimeSeries};
use indexmap::IndexMap;
use itertools::Itertools;
use std::rc::Rc;

/// Whole-year flows at or below this value are not reported
pub const FLOW_THRESHOLD: f64 = 1e-4;

/// The period a flow is summed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Period {
    /// A calendar month, indexed from zero
    Month(usize),
    /// A week of 168 hours, indexed from zero
    Week(usize),
    /// The whole year
    Year,
}

impl Period {
    /// The period of the given kind with the given index
    pub fn of_kind(kind: PeriodKind, index: usize) -> Self {
        match kind {
            PeriodKind::Month => Self::Month(index),
            PeriodKind::Week => Self::Week(index),
        }
    }

    /// A short label for the period
    pub fn label(self) -> String {
        match self {
            Self::Month(index) => PeriodKind::Month.label(index),
            Self::Week(index) => PeriodKind::Week.label(index),
            Self::Year => "Year".to_string(),
        }
    }
}

/// Key of a flow record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlowKey {
    /// Direction of the flow
    pub direction: FlowDirection,
    /// Contributor to the flow
    pub label: Rc<str>,
    /// The period the flow is summed over
    pub period: Period,
}

/// One contributor's share of one side of the balance
#[derive(Debug, Clone, PartialEq)]
pub struct FlowShare {
    /// The contributor
    pub label: Rc<str>,
    /// Index into the palette
    pub colour: usize,
    /// The flow
    pub value: f64,
}

/// One contributor's flows for each period of a kind
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSeries {
    /// The contributor
    pub label: Rc<str>,
    /// Index into the palette
    pub colour: usize,
    /// One value per period
    pub values: Vec<f64>,
}

/// Flows of a demand commodity at a site, summed over periods
#[derive(Debug, Clone, PartialEq)]
pub struct FlowTable {
    /// The site
    pub site: SiteID,
    /// The demand commodity
    pub demand: CommodityID,
    colours: ColourAssignment,
    sums: IndexMap<FlowKey, f64>,
}

impl FlowTable {
    /// A table with no flows
    pub fn empty(site: SiteID, demand: CommodityID) -> Self {
        Self {
            site,
            demand,
            colours: ColourAssignment::default(),
            sums: IndexMap::new(),
        }
    }

    /// Sum a time series over months, weeks and the whole year.
    ///
    /// Whole-year sums at or below [`FLOW_THRESHOLD`] are dropped.
    pub fn from_timeseries(site: SiteID, demand: CommodityID, series: &TimeSeries) -> Self {
        let colours = ColourAssignment::new(series.columns().iter().map(|column| &column.label));

        let mut sums = IndexMap::new();
        for column in series.columns() {
            let mut year = 0.0;
            for (&timestep, &value) in series.timesteps().iter().zip(&column.values) {
                if in_year(timestep) {
                    year += value;
                }

                for kind in [PeriodKind::Month, PeriodKind::Week] {
                    if let Some(index) = kind.period_of(timestep) {
                        let key = FlowKey {
                            direction: column.direction,
                            label: column.label.clone(),
                            period: Period::of_kind(kind, index),
                        };
                        *sums.entry(key).or_insert(0.0) += value;
                    }
                }
            }

            if year > FLOW_THRESHOLD {
                let key = FlowKey {
                    direction: column.direction,
                    label: column.label.clone(),
                    period: Period::Year,
                };
                *sums.entry(key).or_insert(0.0) += year;
            }
        }
        sums.sort_by(|a, _, b, _| {
            (a.period, a.direction, &a.label).cmp(&(b.period, b.direction, &b.label))
        });

        Self {
            site,
            demand,
            colours,
            sums,
        }
    }

    /// Whether the table has no flows
    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    /// The colour assignment for contributors to this pair
    pub fn colours(&self) -> &ColourAssignment {
        &self.colours
    }

    /// The summed flow for a direction, contributor and period
    pub fn get(&self, direction: FlowDirection, label: &str, period: Period) -> Option<f64> {
        let key = FlowKey {
            direction,
            label: label.into(),
            period,
        };
        self.sums.get(&key).copied()
    }

    /// All flow records, ordered by period, direction and contributor
    pub fn records(&self) -> impl Iterator<Item = (&FlowKey, f64)> {
        self.sums.iter().map(|(key, value)| (key, *value))
    }

    /// Sum the flows on one side of the balance for a period, by contributor
    fn side_sums(&self, side: FlowSide, period: Period) -> IndexMap<Rc<str>, f64> {
        let directions = side.directions();
        let mut sums: IndexMap<Rc<str>, f64> = IndexMap::new();
        for (key, value) in &self.sums {
            if key.period == period && directions.contains(&key.direction) {
                *sums.entry(key.label.clone()).or_insert(0.0) += value;
            }
        }

        sums
    }

    /// The colour index for a contributor
    fn colour_of(&self, label: &str) -> usize {
        self.colours.index_of(label).unwrap_or_default()
    }

    /// Whole-year shares of each contributor to one side of the balance, in colour order
    pub fn year_shares(&self, side: FlowSide) -> Vec<FlowShare> {
        self.side_sums(side, Period::Year)
            .into_iter()
            .map(|(label, value)| FlowShare {
                colour: self.colour_of(&label),
                label,
                value,
            })
            .sorted_by_key(|share| share.colour)
            .collect()
    }

    /// Flows on one side of the balance for every period of a kind.
    ///
    /// Only contributors with a whole-year share are included.
    pub fn period_series(&self, side: FlowSide, kind: PeriodKind) -> Vec<PeriodSeries> {
        let periods: Vec<_> = (0..kind.count())
            .map(|index| self.side_sums(side, Period::of_kind(kind, index)))
            .collect();

        self.year_shares(side)
            .into_iter()
            .map(|share| PeriodSeries {
                values: periods
                    .iter()
                    .map(|sums| sums.get(&share.label).copied().unwrap_or_default())
                    .collect(),
                label: share.label,
                colour: share.colour,
            })
            .collect()
    }
}

/// Flow tables for each (site, demand) pair
pub type FlowTables = IndexMap<SitePair, FlowTable>;
