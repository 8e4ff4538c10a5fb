//! Compound annual emissions forecast under a simplified policy model.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::instrument::PolicyInstrument;
use crate::schema::forecast;
use crate::vectorizer::PolicyVector;

/// Baseline reduction of 1% per year.
pub const BASE_ANNUAL_REDUCTION: f64 = 0.01;
/// Cap on the price multiplier.
pub const MAX_PRICE_FACTOR: f64 = 1.5;
pub const DEFAULT_BASE_YEAR: i32 = 2025;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastInput {
    /// MtCO₂e in the base year.
    pub initial_emissions: f64,
    pub instrument: PolicyInstrument,
    pub price_signal: f64,
    /// Share of emissions covered, 0–100.
    pub coverage_pct: f64,
    pub duration_years: u32,
    pub sectors_covered: u8,
}

impl ForecastInput {
    /// Take price, duration, sectors and instrument from a policy vector.
    /// A non-positive duration forecasts no years.
    pub fn from_vector(vector: &PolicyVector, initial_emissions: f64, coverage_pct: f64) -> Self {
        Self {
            initial_emissions,
            instrument: vector.inferred_instrument(),
            price_signal: vector.price_signal,
            coverage_pct,
            duration_years: vector.duration_years.max(0) as u32,
            sectors_covered: vector.num_sectors_covered.min(5),
        }
    }

    pub fn annual_reduction(&self) -> f64 {
        let price_factor = (self.price_signal / 100.0).min(MAX_PRICE_FACTOR);
        let coverage_factor = self.coverage_pct / 100.0;
        let sector_factor = f64::from(self.sectors_covered) / 5.0;
        BASE_ANNUAL_REDUCTION
            * price_factor
            * coverage_factor
            * sector_factor
            * self.instrument.forecast_multiplier()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    /// `(year, projected MtCO₂e)` from the base year through the last year.
    pub trajectory: Vec<(i32, f64)>,
    pub annual_reduction: f64,
    pub initial_emissions: f64,
    pub final_emissions: f64,
    pub total_reduction: f64,
    pub percent_reduction: f64,
    /// Total reduction per forecast year; 0 for a zero-year forecast.
    pub average_reduction: f64,
}

impl Forecast {
    pub fn to_frame(&self) -> Result<DataFrame> {
        let years: Vec<i32> = self.trajectory.iter().map(|(y, _)| *y).collect();
        let values: Vec<f64> = self.trajectory.iter().map(|(_, v)| *v).collect();
        Ok(DataFrame::new(vec![
            Column::new(forecast::YEAR.into(), &years),
            Column::new(forecast::PROJECTED_EMISSIONS_MT.into(), &values),
        ])?)
    }
}

/// Apply the annual reduction for `duration_years`, never dropping below 0.
pub fn forecast_policy_impact(input: &ForecastInput, base_year: i32) -> Forecast {
    let rate = input.annual_reduction();
    let mut trajectory = Vec::with_capacity(input.duration_years as usize + 1);
    let mut current = input.initial_emissions;
    trajectory.push((base_year, current));

    for step in 1..=input.duration_years {
        current = (current * (1.0 - rate)).max(0.0);
        trajectory.push((base_year + step as i32, current));
    }

    let total_reduction = input.initial_emissions - current;
    Forecast {
        trajectory,
        annual_reduction: rate,
        initial_emissions: input.initial_emissions,
        final_emissions: current,
        total_reduction,
        percent_reduction: if input.initial_emissions != 0.0 {
            total_reduction / input.initial_emissions * 100.0
        } else {
            0.0
        },
        average_reduction: if input.duration_years > 0 {
            total_reduction / f64::from(input.duration_years)
        } else {
            0.0
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    fn input(instrument: PolicyInstrument) -> ForecastInput {
        ForecastInput {
            initial_emissions: 100.0,
            instrument,
            price_signal: 100.0,
            coverage_pct: 100.0,
            duration_years: 2,
            sectors_covered: 5,
        }
    }

    #[test]
    fn full_coverage_tax_reduces_one_percent_a_year() {
        let f = forecast_policy_impact(&input(PolicyInstrument::Tax), DEFAULT_BASE_YEAR);
        assert!(is_close!(f.annual_reduction, 0.01));
        assert_eq!(f.trajectory.len(), 3);
        assert_eq!(f.trajectory[2].0, 2027);
        assert!(is_close!(f.final_emissions, 98.01));
        assert!(is_close!(f.percent_reduction, 1.99));
        assert!(is_close!(f.average_reduction, 0.995));
    }

    #[test]
    fn instrument_multipliers_and_price_cap() {
        let mut hybrid = input(PolicyInstrument::Hybrid);
        hybrid.price_signal = 1_000.0;
        assert!(is_close!(hybrid.annual_reduction(), 0.01 * 1.5 * 1.2));
        assert!(is_close!(input(PolicyInstrument::Ets).annual_reduction(), 0.009));
    }

    #[test]
    fn emissions_never_go_negative() {
        let mut steep = input(PolicyInstrument::Tax);
        steep.coverage_pct = 20_000.0;
        let mut f = forecast_policy_impact(&steep, 2025);
        assert_eq!(f.final_emissions, 0.0);
        assert_eq!(f.total_reduction, 100.0);

        steep.initial_emissions = 0.0;
        f = forecast_policy_impact(&steep, 2025);
        assert_eq!(f.percent_reduction, 0.0);
    }

    #[test]
    fn zero_duration_is_a_single_point() {
        let mut once = input(PolicyInstrument::Other);
        once.duration_years = 0;
        let f = forecast_policy_impact(&once, 2030);
        assert_eq!(f.trajectory, vec![(2030, 100.0)]);
        assert_eq!(f.average_reduction, 0.0);
        assert_eq!(f.to_frame().unwrap().height(), 1);
    }
}
