//! Fossil vs renewable consumption (OWID energy columns).

use polars::prelude::*;

use crate::error::Result;
use crate::frames;
use crate::schema::energy;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyYear {
    pub year: i64,
    pub fossil: f64,
    pub renewables: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthYear {
    pub year: i64,
    pub fossil_growth: Option<f64>,
    pub renewable_growth: Option<f64>,
}

impl GrowthYear {
    /// Renewable growth minus fossil growth, when both are defined.
    pub fn displacement_score(&self) -> Option<f64> {
        Some(self.renewable_growth? - self.fossil_growth?)
    }
}

/// Percent change from `prev` to `cur`. Undefined when `prev` is 0.
pub fn pct_change(prev: f64, cur: f64) -> Option<f64> {
    (prev != 0.0).then(|| (cur - prev) / prev * 100.0)
}

pub fn displacement_score_from_totals(prev: &EnergyYear, cur: &EnergyYear) -> Option<f64> {
    growth_between(prev, cur).displacement_score()
}

fn growth_between(prev: &EnergyYear, cur: &EnergyYear) -> GrowthYear {
    GrowthYear {
        year: cur.year,
        fossil_growth: pct_change(prev.fossil, cur.fossil),
        renewable_growth: pct_change(prev.renewables, cur.renewables),
    }
}

fn summed(columns: &[&str]) -> Expr {
    columns
        .iter()
        .map(|c| col(*c).fill_null(lit(0.0)))
        .reduce(|a, b| a + b)
        .unwrap_or_else(|| lit(0.0))
}

/// Per-year fossil and renewable totals for one ISO code, sorted by year.
/// Null source cells count as 0; rows without a year are dropped.
pub fn energy_totals(df: &DataFrame, iso_code: &str) -> Result<Vec<EnergyYear>> {
    frames::require_columns(df, &[energy::ISO_CODE, energy::YEAR])?;
    frames::require_columns(df, &energy::FOSSIL_SOURCES)?;
    frames::require_columns(df, &energy::RENEWABLE_SOURCES)?;

    let mut country = frames::filter_eq(df, energy::ISO_CODE, iso_code)?;
    for source in energy::FOSSIL_SOURCES.iter().chain(energy::RENEWABLE_SOURCES.iter()) {
        country = frames::parse_float(country, source)?;
    }

    let totals = country
        .lazy()
        .select([
            col(energy::YEAR),
            summed(&energy::FOSSIL_SOURCES).alias(energy::FOSSIL_ENERGY),
            summed(&energy::RENEWABLE_SOURCES).alias(energy::RENEWABLES_ENERGY),
        ])
        .collect()?;

    let years = frames::i64_values(&totals, energy::YEAR)?;
    let fossil = frames::f64_values(&totals, energy::FOSSIL_ENERGY)?;
    let renewables = frames::f64_values(&totals, energy::RENEWABLES_ENERGY)?;

    let mut rows: Vec<EnergyYear> = years
        .into_iter()
        .zip(fossil.into_iter().zip(renewables))
        .filter_map(|(year, (f, r))| {
            Some(EnergyYear {
                year: year?,
                fossil: f?,
                renewables: r?,
            })
        })
        .collect();
    rows.sort_by_key(|r| r.year);

    tracing::debug!(iso_code, years = rows.len(), "Computed energy totals");
    Ok(rows)
}

/// Growth of every year after the first, relative to the previous row.
pub fn growth_rates(totals: &[EnergyYear]) -> Vec<GrowthYear> {
    totals
        .windows(2)
        .map(|pair| growth_between(&pair[0], &pair[1]))
        .collect()
}

/// `(year, displacement_score)` for every year that has one.
pub fn displacement_scores(df: &DataFrame, iso_code: &str) -> Result<DataFrame> {
    let (years, scores): (Vec<i64>, Vec<f64>) = growth_rates(&energy_totals(df, iso_code)?)
        .iter()
        .filter_map(|g| Some((g.year, g.displacement_score()?)))
        .unzip();

    Ok(DataFrame::new(vec![
        Column::new(energy::YEAR.into(), &years),
        Column::new(energy::DISPLACEMENT_SCORE.into(), &scores),
    ])?)
}

/// Fossil and renewable percentage of their combined total. Years with a
/// zero total are skipped.
pub fn energy_shares(df: &DataFrame, iso_code: &str) -> Result<DataFrame> {
    let mut years = Vec::new();
    let mut fossil = Vec::new();
    let mut renewable = Vec::new();

    for row in energy_totals(df, iso_code)? {
        let total = row.fossil + row.renewables;
        if total == 0.0 {
            continue;
        }
        years.push(row.year);
        fossil.push(row.fossil / total * 100.0);
        renewable.push(row.renewables / total * 100.0);
    }

    Ok(DataFrame::new(vec![
        Column::new(energy::YEAR.into(), &years),
        Column::new(energy::FOSSIL_SHARE.into(), &fossil),
        Column::new(energy::RENEWABLE_SHARE.into(), &renewable),
    ])?)
}

/// Displacement scores of every ISO code in the frame, labelled with the
/// country name. With `latest_only` each country contributes its most
/// recent scored year.
pub fn compare_displacement_scores(df: &DataFrame, latest_only: bool) -> Result<DataFrame> {
    let codes = frames::str_values(df, energy::ISO_CODE)?;
    let names = frames::str_values(df, energy::COUNTRY)?;

    let mut seen: Vec<(String, String)> = Vec::new();
    for (code, name) in codes.into_iter().zip(names) {
        let Some(code) = code.filter(|c| !c.trim().is_empty()) else {
            continue;
        };
        if !seen.iter().any(|(c, _)| *c == code) {
            seen.push((code.clone(), name.unwrap_or(code)));
        }
    }

    let mut years = Vec::new();
    let mut countries = Vec::new();
    let mut scores = Vec::new();

    for (code, name) in &seen {
        let scored: Vec<(i64, f64)> = growth_rates(&energy_totals(df, code)?)
            .iter()
            .filter_map(|g| Some((g.year, g.displacement_score()?)))
            .collect();
        let selected: &[(i64, f64)] = match (latest_only, scored.last()) {
            (true, Some(_)) => &scored[scored.len() - 1..],
            (true, None) => &[],
            (false, _) => &scored,
        };
        for (year, score) in selected {
            years.push(*year);
            countries.push(name.clone());
            scores.push(*score);
        }
    }

    tracing::info!(countries = seen.len(), rows = years.len(), "Compared displacement scores");
    Ok(DataFrame::new(vec![
        Column::new(energy::YEAR.into(), &years),
        Column::new(energy::COUNTRY.into(), &countries),
        Column::new(energy::DISPLACEMENT_SCORE.into(), &scores),
    ])?)
}
