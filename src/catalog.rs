//! Static reference tables: the activity emission-factor catalog and the
//! per-country composite factors. Both are loaded once and never mutated.

use std::path::Path;

use polars::prelude::DataFrame;

use crate::error::Result;
use crate::frames::{self, optional_str_values, parse_number, str_values};
use crate::schema::{activity, country};

/// What kind of number the user has to supply for an activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    /// Monetary budget, converted to units through the default unit cost.
    Budget,
    /// A physical quantity (km, hectares, units, ...) used as-is.
    Quantity(String),
}

impl InputKind {
    /// Missing or blank tags default to `Budget`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()) {
            None => InputKind::Budget,
            Some(tag) if tag.is_empty() || tag == "budget" => InputKind::Budget,
            Some(tag) => InputKind::Quantity(tag),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            InputKind::Budget => "budget",
            InputKind::Quantity(tag) => tag,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityCatalogEntry {
    pub activity_class: String,
    /// Lower-cased, trimmed, never blank.
    pub keywords: Vec<String>,
    /// Signed factor as written in the table, e.g. `"–1.6 tons"`.
    pub emission_per_unit: String,
    pub unit: String,
    pub input_kind: InputKind,
    pub default_unit_cost: Option<f64>,
    pub uses_displacement: bool,
    pub instrument_type: String,
    pub sector: String,
}

impl ActivityCatalogEntry {
    pub fn new(activity_class: &str, keywords: &str, emission_per_unit: &str) -> Self {
        Self {
            activity_class: activity_class.trim().to_string(),
            keywords: split_keywords(keywords),
            emission_per_unit: emission_per_unit.to_string(),
            unit: String::new(),
            input_kind: InputKind::Budget,
            default_unit_cost: None,
            uses_displacement: false,
            instrument_type: String::new(),
            sector: String::new(),
        }
    }
}

/// Split a comma-separated keyword cell. Blank fragments are dropped so an
/// empty cell never matches every text.
pub fn split_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|kw| kw.trim().to_lowercase())
        .filter(|kw| !kw.is_empty())
        .collect()
}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|s| s.trim().to_lowercase()).as_deref(),
        Some("true" | "yes" | "y" | "1" | "1.0")
    )
}

#[derive(Debug, Clone, Default)]
pub struct ActivityCatalog {
    entries: Vec<ActivityCatalogEntry>,
}

impl ActivityCatalog {
    pub fn new(entries: Vec<ActivityCatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let df = frames::read_csv_as_strings(path, None)?;
        let catalog = Self::from_frame(&df)?;
        tracing::info!(path = %path.display(), entries = catalog.len(), "Loaded activity catalog");
        Ok(catalog)
    }

    /// Build from a string frame with the activity-table columns.
    ///
    /// Required columns: Activity Class, Keywords, CO₂e Impact.
    /// The remaining columns are optional and default to blank / budget /
    /// no displacement.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        frames::require_columns(df, &activity::REQUIRED)?;

        let classes = str_values(df, activity::ACTIVITY_CLASS)?;
        let keywords = str_values(df, activity::KEYWORDS)?;
        let impacts = str_values(df, activity::CO2E_IMPACT)?;
        let units = optional_str_values(df, activity::UNIT)?;
        let input_types = optional_str_values(df, activity::REQUIRED_INPUT_TYPE)?;
        let unit_costs = optional_str_values(df, activity::DEFAULT_UNIT_COST)?;
        let displacement = optional_str_values(df, activity::USES_DISPLACEMENT)?;
        let instruments = optional_str_values(df, activity::INSTRUMENT_TYPE)?;
        let sectors = optional_str_values(df, activity::SECTOR)?;

        let mut entries = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let Some(class) = classes[i].as_deref().map(str::trim).filter(|c| !c.is_empty())
            else {
                tracing::warn!(row = i, "Skipping activity row without a class name");
                continue;
            };

            entries.push(ActivityCatalogEntry {
                activity_class: class.to_string(),
                keywords: split_keywords(keywords[i].as_deref().unwrap_or("")),
                emission_per_unit: impacts[i].clone().unwrap_or_default(),
                unit: units[i].as_deref().unwrap_or("").trim().to_string(),
                input_kind: InputKind::parse(input_types[i].as_deref()),
                default_unit_cost: unit_costs[i].as_deref().and_then(parse_number),
                uses_displacement: parse_flag(displacement[i].as_deref()),
                instrument_type: instruments[i].as_deref().unwrap_or("").trim().to_string(),
                sector: sectors[i].as_deref().unwrap_or("").trim().to_string(),
            });
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ActivityCatalogEntry] {
        &self.entries
    }

    pub fn get(&self, activity_class: &str) -> Option<&ActivityCatalogEntry> {
        self.entries
            .iter()
            .find(|e| e.activity_class == activity_class)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Country factors ─────────────────────────────────────────────────────────

/// Efficiency used when the table cell is blank or malformed.
pub const DEFAULT_EFFICIENCY: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct CountryFactor {
    pub country: String,
    pub displacement_ratio: f64,
    pub efficiency: f64,
}

#[derive(Debug, Clone, Default)]
pub struct CountryFactors {
    rows: Vec<CountryFactor>,
}

impl CountryFactors {
    pub fn new(rows: Vec<CountryFactor>) -> Self {
        Self { rows }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let df = frames::read_csv_as_strings(path, None)?;
        let factors = Self::from_frame(&df)?;
        tracing::info!(path = %path.display(), countries = factors.len(), "Loaded country factors");
        Ok(factors)
    }

    /// Rows without a parseable displacement ratio are skipped.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let names = str_values(df, country::COUNTRY)?;
        let ratios = str_values(df, country::DISPLACEMENT_RATIO)?;
        let efficiency = optional_str_values(df, country::EFFICIENCY)?;

        let mut rows = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let Some(name) = names[i].as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
                continue;
            };
            let Some(ratio) = ratios[i].as_deref().and_then(parse_number) else {
                tracing::warn!(country = name, "Skipping country without a displacement ratio");
                continue;
            };
            rows.push(CountryFactor {
                country: name.to_string(),
                displacement_ratio: ratio,
                efficiency: efficiency[i]
                    .as_deref()
                    .and_then(parse_number)
                    .unwrap_or(DEFAULT_EFFICIENCY),
            });
        }

        Ok(Self { rows })
    }

    /// Case-insensitive lookup on the trimmed country name.
    pub fn find(&self, name: &str) -> Option<&CountryFactor> {
        let needle = name.trim().to_lowercase();
        self.rows
            .iter()
            .find(|row| row.country.to_lowercase() == needle)
    }

    pub fn displacement_ratio(&self, name: &str) -> Option<f64> {
        self.find(name).map(|row| row.displacement_ratio)
    }

    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.country.as_str())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn activity_frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new(activity::ACTIVITY_CLASS.into(), &[Some("EV Subsidy"), Some(" "), Some("Afforestation")]),
            Column::new(activity::KEYWORDS.into(), &[Some("Electric Vehicle, EV ,subsidy"), Some("x"), None]),
            Column::new(activity::CO2E_IMPACT.into(), &[Some("–1.6 tons"), Some("1"), Some("-20 tons")]),
            Column::new(activity::REQUIRED_INPUT_TYPE.into(), &[Some("Budget"), None, Some("hectares")]),
            Column::new(activity::DEFAULT_UNIT_COST.into(), &[Some("5000"), None, Some("")]),
            Column::new(activity::USES_DISPLACEMENT.into(), &[Some("True"), None, Some("False")]),
            Column::new(activity::SECTOR.into(), &[Some("Transport"), None, Some("LULUCF")]),
        ])
        .unwrap()
    }

    #[test]
    fn catalog_from_frame_normalizes_cells() {
        let catalog = ActivityCatalog::from_frame(&activity_frame()).unwrap();
        assert_eq!(catalog.len(), 2);

        let ev = catalog.get("EV Subsidy").unwrap();
        assert_eq!(ev.keywords, vec!["electric vehicle", "ev", "subsidy"]);
        assert_eq!(ev.input_kind, InputKind::Budget);
        assert_eq!(ev.default_unit_cost, Some(5000.0));
        assert!(ev.uses_displacement);
        assert_eq!(ev.unit, "");

        let forest = catalog.get("Afforestation").unwrap();
        assert!(forest.keywords.is_empty());
        assert_eq!(forest.input_kind, InputKind::Quantity("hectares".into()));
        assert_eq!(forest.default_unit_cost, None);
        assert!(!forest.uses_displacement);
    }

    #[test]
    fn catalog_requires_core_columns() {
        let df = DataFrame::new(vec![Column::new(activity::ACTIVITY_CLASS.into(), &["A"])]).unwrap();
        assert!(ActivityCatalog::from_frame(&df).is_err());
    }

    #[test]
    fn blank_keyword_cells_produce_no_keywords() {
        assert!(split_keywords("").is_empty());
        assert!(split_keywords(" , ,").is_empty());
    }

    #[test]
    fn country_lookup_is_case_insensitive() {
        let df = DataFrame::new(vec![
            Column::new(country::COUNTRY.into(), &["  India ", "Chad", "Peru"]),
            Column::new(country::DISPLACEMENT_RATIO.into(), &["0.8", "n/a", "0.4"]),
            Column::new(country::EFFICIENCY.into(), &[Some("0.7"), Some("0.1"), None]),
        ])
        .unwrap();
        let factors = CountryFactors::from_frame(&df).unwrap();

        assert_eq!(factors.len(), 2);
        assert_eq!(factors.displacement_ratio("INDIA"), Some(0.8));
        assert_eq!(factors.displacement_ratio("Chad"), None);
        assert_eq!(factors.find("peru").unwrap().efficiency, DEFAULT_EFFICIENCY);
    }
}
