//! Signed CO₂-equivalent impact estimates for a matched activity.
//!
//! Every failure mode (unparseable factor, missing unit cost, unknown
//! country) yields `None`; callers decide how to surface it.

use crate::catalog::{ActivityCatalogEntry, CountryFactor, InputKind};

pub const DEFAULT_DECIMALS: u32 = 2;

/// Parse an emission-per-unit cell such as `"–1.6 tons"` or `"+2,500 kt"`.
///
/// En-dash, em-dash and the Unicode minus are read as a minus sign. An
/// `Mt`/`kt` unit, attached (`"1.6Mt"`) or as the next token, scales the
/// value to tons.
pub fn parse_emission_value(raw: &str) -> Option<f64> {
    let normalized: String = raw
        .chars()
        .filter(|c| *c != '+' && *c != ',')
        .map(|c| match c {
            '–' | '—' | '−' => '-',
            other => other,
        })
        .collect();

    let mut tokens = normalized.split_whitespace();
    let first = tokens.next()?;
    let (number, attached) = split_unit_suffix(first);
    let value = number.parse::<f64>().ok().filter(|v| v.is_finite())?;

    let scale = attached
        .or_else(|| tokens.next().and_then(unit_scale))
        .unwrap_or(1.0);
    Some(value * scale)
}

fn unit_scale(token: &str) -> Option<f64> {
    let lower = token.to_ascii_lowercase();
    if lower.starts_with("mt") {
        Some(1e6)
    } else if lower.starts_with("kt") {
        Some(1e3)
    } else {
        None
    }
}

/// Splits `"1.6Mt"` into `("1.6", Some(1e6))`; other tokens pass through.
fn split_unit_suffix(token: &str) -> (&str, Option<f64>) {
    if token.len() > 2 && token.is_char_boundary(token.len() - 2) {
        let (number, suffix) = token.split_at(token.len() - 2);
        if let Some(scale) = unit_scale(suffix) {
            return (number, Some(scale));
        }
    }
    (token, None)
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Effective units the user input represents.
///
/// Budget entries divide by the default unit cost and, when the entry uses
/// displacement accounting, scale by the country's displacement ratio.
/// Quantity entries pass the input through unchanged.
pub fn estimate_units(
    entry: &ActivityCatalogEntry,
    user_input: f64,
    country: Option<&CountryFactor>,
) -> Option<f64> {
    match entry.input_kind {
        InputKind::Budget => {
            let unit_cost = entry.default_unit_cost.filter(|c| *c != 0.0)?;
            let ratio = if entry.uses_displacement {
                country?.displacement_ratio
            } else {
                1.0
            };
            Some(user_input / unit_cost * ratio)
        }
        InputKind::Quantity(_) => Some(user_input),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Estimator {
    decimals: u32,
}

impl Default for Estimator {
    fn default() -> Self {
        Self {
            decimals: DEFAULT_DECIMALS,
        }
    }
}

impl Estimator {
    pub fn new(decimals: u32) -> Self {
        Self { decimals }
    }

    /// Impact in tons CO₂e: units × emission-per-unit, rounded. Negative
    /// values are avoided emissions.
    pub fn estimate(
        &self,
        entry: &ActivityCatalogEntry,
        user_input: f64,
        country: Option<&CountryFactor>,
    ) -> Option<f64> {
        let Some(per_unit) = parse_emission_value(&entry.emission_per_unit) else {
            tracing::warn!(
                activity = %entry.activity_class,
                value = %entry.emission_per_unit,
                "Unparseable emission factor"
            );
            return None;
        };

        let Some(units) = estimate_units(entry, user_input, country) else {
            tracing::warn!(
                activity = %entry.activity_class,
                input_kind = entry.input_kind.as_str(),
                "Could not derive units from user input"
            );
            return None;
        };

        Some(round_to(units * per_unit, self.decimals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    fn budget_entry(unit_cost: Option<f64>, uses_displacement: bool) -> ActivityCatalogEntry {
        ActivityCatalogEntry {
            default_unit_cost: unit_cost,
            uses_displacement,
            ..ActivityCatalogEntry::new("EV Subsidy", "ev", "–1.6 tons")
        }
    }

    fn india() -> CountryFactor {
        CountryFactor {
            country: "India".into(),
            displacement_ratio: 0.8,
            efficiency: 0.7,
        }
    }

    #[test]
    fn parses_dashes_and_units() {
        assert_eq!(parse_emission_value("–1.6 tons"), Some(-1.6));
        assert_eq!(parse_emission_value("— 3"), None);
        assert_eq!(parse_emission_value("−0.25 t"), Some(-0.25));
        assert_eq!(parse_emission_value("+2,500 tons"), Some(2500.0));
        assert_eq!(parse_emission_value("-0.5 Mt"), Some(-500_000.0));
        assert_eq!(parse_emission_value("4 kt CO2e"), Some(4000.0));
        assert_eq!(parse_emission_value("1.6Mt"), Some(1_600_000.0));
        assert_eq!(parse_emission_value("-2kt"), Some(-2000.0));
        assert_eq!(parse_emission_value("–3KT CO2e"), Some(-3000.0));
        assert_eq!(parse_emission_value("Mt"), None);
        assert_eq!(parse_emission_value("about 4"), None);
        assert_eq!(parse_emission_value(""), None);
        assert_eq!(parse_emission_value("NaN tons"), None);
    }

    #[test]
    fn budget_units_use_displacement_ratio() {
        let units = estimate_units(&budget_entry(Some(5000.0), true), 10_000.0, Some(&india()));
        assert!(is_close!(units.unwrap(), 1.6));
    }

    #[test]
    fn budget_units_ignore_country_without_displacement() {
        let units = estimate_units(&budget_entry(Some(5000.0), false), 10_000.0, None);
        assert_eq!(units, Some(2.0));
    }

    #[test]
    fn budget_requires_nonzero_unit_cost() {
        assert_eq!(estimate_units(&budget_entry(None, false), 10.0, None), None);
        assert_eq!(estimate_units(&budget_entry(Some(0.0), false), 10.0, None), None);
    }

    #[test]
    fn displacement_requires_country() {
        assert_eq!(estimate_units(&budget_entry(Some(5000.0), true), 10.0, None), None);
    }

    #[test]
    fn quantity_input_passes_through() {
        let entry = ActivityCatalogEntry {
            input_kind: InputKind::Quantity("km".into()),
            uses_displacement: true,
            ..ActivityCatalogEntry::new("Rail", "rail", "-0.3 tons")
        };
        assert_eq!(estimate_units(&entry, 42.0, None), Some(42.0));
        assert_eq!(Estimator::default().estimate(&entry, 42.0, None), Some(-12.6));
    }

    #[test]
    fn estimate_rounds_to_configured_decimals() {
        let entry = budget_entry(Some(3000.0), false);
        assert_eq!(Estimator::default().estimate(&entry, 10_000.0, None), Some(-5.33));
        assert_eq!(Estimator::new(0).estimate(&entry, 10_000.0, None), Some(-5.0));
    }

    #[test]
    fn unparseable_factor_is_absent() {
        let entry = ActivityCatalogEntry::new("Broken", "x", "n/a");
        assert_eq!(Estimator::default().estimate(&entry, 1.0, None), None);
    }
}
