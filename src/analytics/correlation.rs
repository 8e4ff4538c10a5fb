//! Year-aligned correlations between two country series.

use std::collections::BTreeMap;

use polars::prelude::*;

use super::stats::pearson;
use super::StatOutcome;
use crate::error::Result;
use crate::frames;
use crate::schema::{correlation, emissions, energy};

/// Value per year.
pub type YearSeries = BTreeMap<i64, f64>;

/// How duplicate rows for the same year are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregate {
    #[default]
    Sum,
    Mean,
}

/// Series of `value_column` for rows where `key_column == key`, one value per
/// year. Rows with a missing year or value are dropped.
pub fn year_series(
    df: &DataFrame,
    key_column: &str,
    key: &str,
    year_column: &str,
    value_column: &str,
    aggregate: Aggregate,
) -> Result<YearSeries> {
    frames::require_columns(df, &[key_column, year_column, value_column])?;

    let subset = frames::filter_eq(df, key_column, key)?;
    let subset = frames::parse_int(subset, year_column)?;
    let subset = frames::parse_float(subset, value_column)?;

    let agg = match aggregate {
        Aggregate::Sum => col(value_column).sum(),
        Aggregate::Mean => col(value_column).mean(),
    };
    let grouped = subset
        .lazy()
        .filter(col(year_column).is_not_null().and(col(value_column).is_not_null()))
        .group_by([col(year_column)])
        .agg([agg])
        .collect()?;

    let years = frames::i64_values(&grouped, year_column)?;
    let values = frames::f64_values(&grouped, value_column)?;
    Ok(years
        .into_iter()
        .zip(values)
        .filter_map(|(y, v)| Some((y?, v?)))
        .collect())
}

/// EDGAR emissions (summed over sectors) for one country code.
pub fn emission_series(df: &DataFrame, country_code: &str) -> Result<YearSeries> {
    year_series(
        df,
        emissions::COUNTRY_CODE,
        country_code,
        emissions::YEAR,
        emissions::EMISSIONS_MT,
        Aggregate::Sum,
    )
}

/// OWID renewable share of primary energy for one ISO code.
pub fn renewable_share_series(df: &DataFrame, iso_code: &str) -> Result<YearSeries> {
    year_series(
        df,
        energy::ISO_CODE,
        iso_code,
        energy::YEAR,
        energy::RENEWABLES_SHARE,
        Aggregate::Mean,
    )
}

/// Inner join on year after moving `second` forward by `lag` years:
/// `second[y]` is paired with `first[y + lag]`. Rows are
/// `(year_in_first, first, second)`, ascending.
pub fn aligned_pairs(first: &YearSeries, second: &YearSeries, lag: i64) -> Vec<(i64, f64, f64)> {
    second
        .iter()
        .filter_map(|(year, b)| {
            let shifted = year + lag;
            first.get(&shifted).map(|a| (shifted, *a, *b))
        })
        .collect()
}

pub fn lagged_correlation(
    first: &YearSeries,
    second: &YearSeries,
    lag: i64,
    min_pairs: usize,
) -> StatOutcome<f64> {
    let pairs = aligned_pairs(first, second, lag);
    if let Some(short) = StatOutcome::require(min_pairs, pairs.len()) {
        return short;
    }
    let (xs, ys): (Vec<f64>, Vec<f64>) = pairs.iter().map(|(_, a, b)| (*a, *b)).unzip();
    pearson(&xs, &ys)
}

/// Emissions vs renewable share in the same year.
pub fn correlation_emission_renewable(
    emissions_df: &DataFrame,
    energy_df: &DataFrame,
    country_code: &str,
    min_pairs: usize,
) -> Result<StatOutcome<f64>> {
    lag_correlation(emissions_df, energy_df, country_code, 0, min_pairs)
}

/// Renewable share this year vs emissions `lag` years later.
pub fn lag_correlation(
    emissions_df: &DataFrame,
    energy_df: &DataFrame,
    country_code: &str,
    lag: i64,
    min_pairs: usize,
) -> Result<StatOutcome<f64>> {
    let emitted = emission_series(emissions_df, country_code)?;
    let renewable = renewable_share_series(energy_df, country_code)?;
    let outcome = lagged_correlation(&emitted, &renewable, lag, min_pairs);
    tracing::debug!(country_code, lag, ?outcome, "Lag correlation");
    Ok(outcome)
}

/// Joined table behind the emission/renewable comparison chart.
pub fn pairs_frame(first: &YearSeries, second: &YearSeries, lag: i64) -> Result<DataFrame> {
    let pairs = aligned_pairs(first, second, lag);
    let years: Vec<i64> = pairs.iter().map(|p| p.0).collect();
    let a: Vec<f64> = pairs.iter().map(|p| p.1).collect();
    let b: Vec<f64> = pairs.iter().map(|p| p.2).collect();
    Ok(DataFrame::new(vec![
        Column::new(correlation::YEAR.into(), &years),
        Column::new(correlation::FIRST.into(), &a),
        Column::new(correlation::SECOND.into(), &b),
    ])?)
}

/// Correlation at every lag in `0..=max_lag`.
pub fn lag_profile(
    first: &YearSeries,
    second: &YearSeries,
    max_lag: i64,
    min_pairs: usize,
) -> Vec<(i64, StatOutcome<f64>)> {
    (0..=max_lag.max(0))
        .map(|lag| (lag, lagged_correlation(first, second, lag, min_pairs)))
        .collect()
}

/// `lag_profile` as a frame; undefined correlations are null.
pub fn lag_profile_frame(
    first: &YearSeries,
    second: &YearSeries,
    max_lag: i64,
    min_pairs: usize,
) -> Result<DataFrame> {
    let profile = lag_profile(first, second, max_lag, min_pairs);
    let lags: Vec<i64> = profile.iter().map(|(lag, _)| *lag).collect();
    let values: Vec<Option<f64>> = profile.iter().map(|(_, o)| o.as_value().copied()).collect();
    let pairs: Vec<u32> = lags
        .iter()
        .map(|lag| aligned_pairs(first, second, *lag).len() as u32)
        .collect();
    Ok(DataFrame::new(vec![
        Column::new(correlation::LAG_YEARS.into(), &lags),
        Column::new(correlation::CORRELATION.into(), &values),
        Column::new(correlation::PAIRS.into(), &pairs),
    ])?)
}
