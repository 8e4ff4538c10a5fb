//! Trend statistics on a single yearly series.

use polars::prelude::*;

use super::correlation::YearSeries;
use super::stats::{linear_slope, mean, rolling_mean, welch_t_test, WelchTest};
use super::StatOutcome;
use crate::error::Result;
use crate::frames;
use crate::schema::{long, policy_meta};
use crate::vectorizer::trailing_year;

/// Years of data required on each side of a policy adoption year.
pub const ADOPTION_MARGIN_YEARS: i64 = 3;

fn split(series: &YearSeries) -> (Vec<f64>, Vec<f64>) {
    series.iter().map(|(y, v)| (*y as f64, *v)).unzip()
}

/// Least-squares slope in units per year.
pub fn slope(series: &YearSeries) -> Option<f64> {
    let (xs, ys) = split(series);
    linear_slope(&xs, &ys)
}

/// Least-squares slope scaled to units per decade.
pub fn rate_of_change_per_decade(series: &YearSeries) -> Option<f64> {
    slope(series).map(|s| s * 10.0)
}

/// Trailing rolling mean over consecutive entries (not calendar years).
pub fn rolling_series(series: &YearSeries, window: usize) -> YearSeries {
    let (years, values): (Vec<i64>, Vec<f64>) = series.iter().map(|(y, v)| (*y, *v)).unzip();
    years.into_iter().zip(rolling_mean(&values, window)).collect()
}

/// `(year, value)` frame of a series, ascending by year.
pub fn series_frame(series: &YearSeries) -> Result<DataFrame> {
    let years: Vec<i64> = series.keys().copied().collect();
    let values: Vec<f64> = series.values().copied().collect();
    Ok(DataFrame::new(vec![
        Column::new(long::YEAR.into(), &years),
        Column::new(long::VALUE.into(), &values),
    ])?)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrePostComparison {
    pub adoption_year: i64,
    pub pre_mean: f64,
    pub post_mean: f64,
    /// `post_mean - pre_mean`.
    pub delta: f64,
    /// Delta relative to the pre-adoption mean, in percent.
    pub delta_pct: Option<f64>,
    pub pre_slope: Option<f64>,
    pub post_slope: Option<f64>,
    pub peak_year: i64,
    /// Negative when the series peaked before adoption.
    pub years_to_peak: i64,
    pub t_test: StatOutcome<WelchTest>,
}

impl PrePostComparison {
    /// The series is falling after adoption.
    pub fn declined_after(&self) -> bool {
        self.post_slope.is_some_and(|s| s < 0.0)
    }
}

/// Compare a series before (`year < adoption`) and after (`year >= adoption`)
/// a policy was adopted. The adoption year must leave
/// [`ADOPTION_MARGIN_YEARS`] of data on each side of the observed range.
pub fn pre_post_comparison(
    series: &YearSeries,
    adoption_year: i64,
    min_samples: usize,
) -> StatOutcome<PrePostComparison> {
    let (Some((&first, _)), Some((&last, _))) = (series.first_key_value(), series.last_key_value())
    else {
        return StatOutcome::InsufficientData {
            required: ADOPTION_MARGIN_YEARS as usize,
            available: 0,
        };
    };
    let margin = (adoption_year - first).min(last - adoption_year);
    if margin < ADOPTION_MARGIN_YEARS {
        return StatOutcome::InsufficientData {
            required: ADOPTION_MARGIN_YEARS as usize,
            available: margin.max(0) as usize,
        };
    }

    let pre: YearSeries = series.range(..adoption_year).map(|(y, v)| (*y, *v)).collect();
    let post: YearSeries = series.range(adoption_year..).map(|(y, v)| (*y, *v)).collect();
    let pre_values: Vec<f64> = pre.values().copied().collect();
    let post_values: Vec<f64> = post.values().copied().collect();

    let (Some(pre_mean), Some(post_mean)) = (mean(&pre_values), mean(&post_values)) else {
        return StatOutcome::Degenerate;
    };
    let delta = post_mean - pre_mean;

    // First year holding the maximum value.
    let mut peak_year = first;
    let mut peak_value = f64::NEG_INFINITY;
    for (year, value) in series {
        if *value > peak_value {
            peak_value = *value;
            peak_year = *year;
        }
    }

    StatOutcome::Value(PrePostComparison {
        adoption_year,
        pre_mean,
        post_mean,
        delta,
        delta_pct: (pre_mean != 0.0).then(|| delta / pre_mean * 100.0),
        pre_slope: slope(&pre),
        post_slope: slope(&post),
        peak_year,
        years_to_peak: peak_year - adoption_year,
        t_test: welch_t_test(&pre_values, &post_values, min_samples),
    })
}

/// Adoption year of the first policy row whose jurisdiction contains
/// `country` (case-insensitive) and whose status ends in a year.
pub fn policy_adoption_year(meta: &DataFrame, country: &str) -> Result<Option<i64>> {
    let jurisdictions = frames::str_values(meta, policy_meta::JURISDICTION)?;
    let statuses = frames::str_values(meta, policy_meta::STATUS)?;
    let needle = country.trim().to_lowercase();

    Ok(jurisdictions
        .iter()
        .zip(&statuses)
        .filter(|(j, _)| j.as_deref().is_some_and(|j| j.to_lowercase().contains(&needle)))
        .find_map(|(_, status)| status.as_deref().and_then(trailing_year)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;
    use polars::prelude::*;

    fn series(start: i64, values: &[f64]) -> YearSeries {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + i as i64, *v))
            .collect()
    }

    #[test]
    fn per_decade_rate() {
        let s = series(1980, &[14.0, 14.02, 14.04, 14.06]);
        assert!(is_close!(rate_of_change_per_decade(&s).unwrap(), 0.2));
        assert_eq!(rate_of_change_per_decade(&series(2000, &[1.0])), None);
    }

    #[test]
    fn rolling_keeps_years() {
        let smoothed = rolling_series(&series(2000, &[1.0, 3.0, 5.0]), 2);
        assert_eq!(smoothed.get(&2000), Some(&1.0));
        assert_eq!(smoothed.get(&2002), Some(&4.0));

        let df = series_frame(&smoothed).unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(frames::i64_values(&df, long::YEAR).unwrap()[2], Some(2002));
    }

    #[test]
    fn pre_post_on_a_turning_series() {
        let s = series(2000, &[10.0, 11.0, 12.0, 13.0, 12.0, 11.0, 10.0, 9.0]);
        let cmp = pre_post_comparison(&s, 2004, 3).value().unwrap();
        assert_eq!(cmp.pre_mean, 11.5);
        assert_eq!(cmp.post_mean, 10.5);
        assert_eq!(cmp.delta, -1.0);
        assert!(is_close!(cmp.pre_slope.unwrap(), 1.0));
        assert!(is_close!(cmp.post_slope.unwrap(), -1.0));
        assert!(cmp.declined_after());
        assert_eq!(cmp.peak_year, 2003);
        assert_eq!(cmp.years_to_peak, -1);
        assert!(cmp.t_test.is_value());
    }

    #[test]
    fn adoption_too_close_to_the_edge() {
        let s = series(2000, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(
            pre_post_comparison(&s, 2001, 3),
            StatOutcome::InsufficientData { required: 3, available: 1 }
        );
        assert!(!pre_post_comparison(&YearSeries::new(), 2001, 3).is_value());
    }

    #[test]
    fn adoption_year_from_metadata() {
        let meta = DataFrame::new(vec![
            Column::new(policy_meta::JURISDICTION.into(), &[Some("Sweden"), Some("EU ETS (incl. Sweden)"), None]),
            Column::new(policy_meta::STATUS.into(), &[Some("Under consideration"), Some("Implemented 2005"), Some("2001")]),
        ])
        .unwrap();
        assert_eq!(policy_adoption_year(&meta, "sweden").unwrap(), Some(2005));
        assert_eq!(policy_adoption_year(&meta, "Norway").unwrap(), None);
    }
}
