//! Cost curves for technologies, giving costs as a function of the year of installation.
//!
//! Investment costs were fitted as exponential (`a * exp(b * year)`) or power (`a * year^b`)
//! curves for each technology. Fixed costs are always a technology-specific share of the
//! investment cost.
use crate::units::{
    Dimensionless, MoneyPerCapacity, MoneyPerCapacityPerYear, MoneyPerEnergyCapacity, PerYear,
};
use strum::{Display, EnumIter, EnumString};

/// A technology with a known cost curve
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Technology {
    #[strum(serialize = "Wind")]
    Wind,
    #[strum(serialize = "PV Freiflaeche")]
    PvFreiflaeche,
    #[strum(serialize = "PV Dach")]
    PvDach,
    #[strum(serialize = "Laufwasser")]
    Laufwasser,
    #[strum(serialize = "Gasturbine")]
    Gasturbine,
    #[strum(serialize = "GuD")]
    GuD,
    #[strum(serialize = "Heizwerk")]
    Heizwerk,
    #[strum(serialize = "Biogas KWK")]
    BiogasKwk,
    #[strum(serialize = "Biogas Aufbereitung")]
    BiogasAufbereitung,
    #[strum(serialize = "Abfall KWK")]
    AbfallKwk,
    #[strum(serialize = "Solar dez")]
    SolarDez,
    #[strum(serialize = "Solar zentr")]
    SolarZentr,
    #[strum(serialize = "Biomasse KWK")]
    BiomasseKwk,
    #[strum(serialize = "Oelkessel")]
    Oelkessel,
    #[strum(serialize = "Holzkessel")]
    Holzkessel,
    #[strum(serialize = "Gaskessel")]
    Gaskessel,
    #[strum(serialize = "GWWP")]
    Gwwp,
    #[strum(serialize = "Batterie")]
    Batterie,
    #[strum(serialize = "Waermenetz")]
    Waermenetz,
    #[strum(serialize = "Puffer zentr")]
    PufferZentr,
    #[strum(serialize = "Puffer dez")]
    PufferDez,
}

/// The shape of a fitted cost curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurveShape {
    /// `coefficient * exp(rate * year)`
    #[allow(missing_docs)]
    Exponential { coefficient: f64, rate: f64 },
    /// `coefficient * year^exponent`
    #[allow(missing_docs)]
    Power { coefficient: f64, exponent: f64 },
}

impl CurveShape {
    /// Evaluate the curve for the given year
    pub fn evaluate(&self, year: f64) -> f64 {
        match *self {
            Self::Exponential { coefficient, rate } => coefficient * (year * rate).exp(),
            Self::Power {
                coefficient,
                exponent,
            } => coefficient * year.powf(exponent),
        }
    }
}

/// The cost curves for a single technology
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostCurve {
    /// Investment cost per unit of power capacity
    pub investment: CurveShape,
    /// Share of the investment cost paid every year as fixed cost
    pub fixed_rate: PerYear,
    /// Investment cost per unit of energy capacity (storages only)
    pub energy: Option<CurveShape>,
}

const fn exponential(coefficient: f64, rate: f64) -> CurveShape {
    CurveShape::Exponential { coefficient, rate }
}

const fn constant(coefficient: f64) -> CurveShape {
    CurveShape::Power {
        coefficient,
        exponent: 0.0,
    }
}

/// Fixed cost rate given as a percentage of investment cost
const fn percent(value: f64) -> PerYear {
    PerYear(value / 100.0)
}

impl Technology {
    /// The fitted cost curve for this technology
    pub fn curve(self) -> CostCurve {
        let (investment, fixed_rate, energy) = match self {
            Self::Wind => (exponential(6.089e+11, -0.006_443), percent(2.0), None),
            Self::PvFreiflaeche => (exponential(3.185e+24, -0.021), percent(1.5), None),
            Self::PvDach => (exponential(4.432e+15, -0.010_92), percent(2.0), None),
            Self::Laufwasser => (exponential(2.17e+06, 0.000_466_1), percent(4.5), None),
            Self::Gasturbine => (exponential(9.088e+06, -0.001_092), percent(5.2), None),
            Self::GuD => (exponential(2.03e+06, 0.0), percent(5.2), None),
            Self::Heizwerk => (constant(153_400.0 / 0.94), percent(2.0), None),
            Self::BiogasKwk => (exponential(1.358e+19, -0.014_37), percent(6.1), None),
            Self::BiogasAufbereitung => (exponential(1.458e+14, -0.009_123), percent(6.0), None),
            Self::AbfallKwk => (exponential(3.993e+13, -0.007_803), percent(4.5), None),
            Self::SolarDez => (exponential(300_000.0, 0.0), percent(1.3), None),
            Self::SolarZentr => (exponential(190_000.0, 0.0), percent(1.4), None),
            Self::BiomasseKwk => (exponential(4.911e+15, -0.010_56), percent(3.3), None),
            Self::Oelkessel => (constant(863_000.0), percent(1.0), None),
            Self::Holzkessel => (exponential(2.528e+11, -0.006_021), percent(2.0), None),
            Self::Gaskessel => (constant(660_000.0), percent(1.0), None),
            Self::Gwwp => (exponential(1.218e+11, -0.005_767), percent(4.0), None),
            Self::Batterie => (
                exponential(3.47e+55, -0.057_09),
                percent(1.4),
                Some(exponential(1.357e+49, -0.049_57)),
            ),
            Self::Waermenetz => (exponential(1.044e+09, -0.003_54), percent(3.0), None),
            Self::PufferZentr => (constant(200_000.0), percent(1.0), Some(constant(3869.0))),
            Self::PufferDez => (constant(150_000.0), percent(1.0), Some(constant(42_992.0))),
        };

        CostCurve {
            investment,
            fixed_rate,
            energy,
        }
    }
}

/// The costs of a technology installed in a given year
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostPoint {
    /// Investment cost per unit of power capacity
    pub investment: MoneyPerCapacity,
    /// Annual fixed cost per unit of power capacity
    pub fixed: MoneyPerCapacityPerYear,
    /// Investment cost per unit of energy capacity, for storages
    pub energy: Option<MoneyPerEnergyCapacity>,
}

/// Evaluate the cost curve of `technology` for the installation year `year`
pub fn cost_curve(technology: Technology, year: f64) -> CostPoint {
    let curve = technology.curve();
    let investment = MoneyPerCapacity(curve.investment.evaluate(year));

    CostPoint {
        investment,
        fixed: investment * curve.fixed_rate,
        energy: curve
            .energy
            .map(|shape| MoneyPerEnergyCapacity(shape.evaluate(year))),
    }
}

/// Calculates the annuity factor (capital recovery factor) for a depreciation period and WACC.
///
/// The factor is used to annualise investment costs over the depreciation period.
pub fn annuity_factor(depreciation: u32, wacc: Dimensionless) -> PerYear {
    if depreciation == 0 {
        return PerYear(0.0);
    }
    if wacc == Dimensionless(0.0) {
        return PerYear(1.0 / f64::from(depreciation));
    }
    let factor = (Dimensionless(1.0) + wacc).powi(depreciation as i32);
    PerYear(((wacc * factor) / (factor - Dimensionless(1.0))).0)
}

/// The investment cost of `technology` installed in `year`, annualised over its depreciation
pub fn annualised_investment(
    technology: Technology,
    year: f64,
    depreciation: u32,
    wacc: Dimensionless,
) -> MoneyPerCapacityPerYear {
    cost_curve(technology, year).investment * annuity_factor(depreciation, wacc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_fixed_cost_is_rate_times_investment() {
        for technology in Technology::iter() {
            let rate = technology.curve().fixed_rate;
            for year in [1990.0, 2020.0, 2035.5, 2050.0] {
                let point = cost_curve(technology, year);
                assert_eq!(point.fixed.0, point.investment.0 * rate.0);
            }
        }
    }

    #[rstest]
    #[case(Technology::Heizwerk, 2020.0, 153_400.0 / 0.94)]
    #[case(Technology::Gaskessel, 2030.0, 660_000.0)]
    #[case(Technology::GuD, 2040.0, 2.03e+06)]
    #[case(Technology::Wind, 2020.0, 6.089e+11 * (2020.0f64 * -0.006_443).exp())]
    fn test_cost_curve_investment(
        #[case] technology: Technology,
        #[case] year: f64,
        #[case] expected: f64,
    ) {
        let point = cost_curve(technology, year);
        assert_approx_eq!(f64, point.investment.0, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_cost_curve_decreases_for_learning_technologies() {
        let early = cost_curve(Technology::PvDach, 2020.0).investment;
        let late = cost_curve(Technology::PvDach, 2040.0).investment;
        assert!(late < early);
    }

    #[test]
    fn test_cost_curve_energy_only_for_storages() {
        assert!(cost_curve(Technology::Batterie, 2030.0).energy.is_some());
        assert_eq!(
            cost_curve(Technology::PufferDez, 2030.0).energy,
            Some(MoneyPerEnergyCapacity(42_992.0))
        );
        assert!(cost_curve(Technology::Wind, 2030.0).energy.is_none());
        assert!(cost_curve(Technology::Waermenetz, 2030.0).energy.is_none());
    }

    #[rstest]
    #[case("Wind", Technology::Wind)]
    #[case("pv freiflaeche", Technology::PvFreiflaeche)]
    #[case("Puffer zentr", Technology::PufferZentr)]
    #[case("gwwp", Technology::Gwwp)]
    fn test_technology_from_str(#[case] name: &str, #[case] expected: Technology) {
        assert_eq!(Technology::from_str(name).unwrap(), expected);
    }

    #[test]
    fn test_technology_display_round_trip() {
        for technology in Technology::iter() {
            assert_eq!(
                Technology::from_str(&technology.to_string()).unwrap(),
                technology
            );
        }
    }

    #[rstest]
    #[case(0, 0.05, 0.0)] // Edge case: depreciation == 0
    #[case(10, 0.0, 0.1)] // Other edge case: wacc == 0
    #[case(10, 0.05, 0.129_504_574_965_456_7)]
    #[case(5, 0.03, 0.218_354_571_400_576_2)]
    fn test_annuity_factor(#[case] depreciation: u32, #[case] wacc: f64, #[case] expected: f64) {
        let result = annuity_factor(depreciation, Dimensionless(wacc));
        assert_approx_eq!(f64, result.0, expected, epsilon = 1e-10);
    }

    #[test]
    fn test_annualised_investment() {
        let result = annualised_investment(Technology::Gaskessel, 2020.0, 20, Dimensionless(0.0));
        assert_approx_eq!(f64, result.0, 33_000.0, epsilon = 1e-8);
    }
}
