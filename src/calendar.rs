//! The fixed calendar used to partition an hourly annual time series into months and weeks.
//!
//! Timesteps are numbered from 1 to 8760. Timestep 0, the initialisation step of an 8761-slot
//! series, belongs to no period. Months cover the whole year, but the 52 weeks only cover the
//! first 8736 hours: the last day of the year is not part of any week.
use chrono::Month;
use std::ops::Range;

/// The number of hours in the (non-leap) model year
pub const HOURS_PER_YEAR: u32 = 8760;

/// The number of hours in a week
pub const HOURS_PER_WEEK: u32 = 168;

/// The number of whole weeks in a year
pub const WEEKS_PER_YEAR: usize = 52;

/// The number of months in a year
pub const MONTHS_PER_YEAR: usize = 12;

/// The number of days in each calendar month
const DAYS_PER_MONTH: [u32; MONTHS_PER_YEAR] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// The first timestep of the year
pub const FIRST_TIMESTEP: u32 = 1;

/// The granularity of a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodKind {
    /// Calendar months
    Month,
    /// Weeks of 168 hours
    Week,
}

impl PeriodKind {
    /// The number of periods of this kind in a year
    pub fn count(self) -> usize {
        match self {
            Self::Month => MONTHS_PER_YEAR,
            Self::Week => WEEKS_PER_YEAR,
        }
    }

    /// Find the period containing `timestep`, if any
    pub fn period_of(self, timestep: u32) -> Option<usize> {
        match self {
            Self::Month => month_of(timestep),
            Self::Week => week_of(timestep),
        }
    }

    /// A short label for the period with the given index (e.g. "Jan" or "W1")
    pub fn label(self, index: usize) -> String {
        match self {
            Self::Month => Month::try_from(index as u8 + 1)
                .map(|month| month.name()[..3].to_string())
                .unwrap_or_else(|_| format!("M{}", index + 1)),
            Self::Week => format!("W{}", index + 1),
        }
    }

    /// Name used in output file names
    pub fn name(self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Week => "week",
        }
    }
}

/// The range of timesteps covered by each month
pub fn month_ranges() -> [Range<u32>; MONTHS_PER_YEAR] {
    let mut start = FIRST_TIMESTEP;
    DAYS_PER_MONTH.map(|days| {
        let end = start + days * 24;
        let range = start..end;
        start = end;
        range
    })
}

/// Whether `timestep` lies within the model year
pub fn in_year(timestep: u32) -> bool {
    (FIRST_TIMESTEP..FIRST_TIMESTEP + HOURS_PER_YEAR).contains(&timestep)
}

/// Find the month containing `timestep`
pub fn month_of(timestep: u32) -> Option<usize> {
    if !in_year(timestep) {
        return None;
    }

    month_ranges()
        .iter()
        .position(|range| range.contains(&timestep))
}

/// Find the week containing `timestep`.
///
/// Returns `None` for the last 24 hours of the year, which are not part of any week.
pub fn week_of(timestep: u32) -> Option<usize> {
    let offset = timestep.checked_sub(FIRST_TIMESTEP)?;
    let week = (offset / HOURS_PER_WEEK) as usize;
    (week < WEEKS_PER_YEAR).then_some(week)
}
