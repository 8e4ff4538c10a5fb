//! Fixed-schema numeric encoding of carbon-pricing policy metadata.

use std::path::Path;

use chrono::Datelike;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, Result};
use crate::frames::{self, optional_str_values};
use crate::instrument::{InstrumentFlags, InstrumentKeywords, PolicyInstrument};
use crate::schema::{policy_meta, vector};

/// One raw metadata row. Every field is optional; missing columns and empty
/// cells are both `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyMetadata {
    pub jurisdiction: Option<String>,
    pub status: Option<String>,
    pub price: Option<String>,
    /// Presence cells for `policy_meta::SECTORS`, same order.
    pub sectors: [Option<String>; 5],
    pub relation: Option<String>,
    pub policy_type: Option<String>,
}

impl PolicyMetadata {
    pub fn from_frame(df: &DataFrame) -> Result<Vec<Self>> {
        let jurisdiction = optional_str_values(df, policy_meta::JURISDICTION)?;
        let status = optional_str_values(df, policy_meta::STATUS)?;
        let price = optional_str_values(df, policy_meta::PRICE)?;
        let relation = optional_str_values(df, policy_meta::RELATION)?;
        let policy_type = optional_str_values(df, policy_meta::TYPE)?;
        let sectors = policy_meta::SECTORS
            .iter()
            .map(|name| optional_str_values(df, name))
            .collect::<Result<Vec<_>>>()?;

        Ok((0..df.height())
            .map(|i| PolicyMetadata {
                jurisdiction: jurisdiction[i].clone(),
                status: status[i].clone(),
                price: price[i].clone(),
                sectors: std::array::from_fn(|s| sectors[s][i].clone()),
                relation: relation[i].clone(),
                policy_type: policy_type[i].clone(),
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyVector {
    pub jurisdiction: String,
    pub duration_years: i64,
    pub is_active: u8,
    pub price_signal: f64,
    pub num_sectors_covered: u8,
    pub covers_transport: u8,
    pub covers_industry: u8,
    pub covers_buildings: u8,
    pub covers_agriculture: u8,
    pub covers_lulucf: u8,
    pub subsidy_overlap: u8,
    pub tax_relief_overlap: u8,
    pub policy_type_tax: u8,
    pub policy_type_ets: u8,
    pub policy_type_hybrid: u8,
}

impl PolicyVector {
    /// Numeric features in `vector::FEATURES` order.
    pub fn features(&self) -> [f64; 14] {
        [
            self.duration_years as f64,
            self.is_active as f64,
            self.price_signal,
            self.num_sectors_covered as f64,
            self.covers_transport as f64,
            self.covers_industry as f64,
            self.covers_buildings as f64,
            self.covers_agriculture as f64,
            self.covers_lulucf as f64,
            self.subsidy_overlap as f64,
            self.tax_relief_overlap as f64,
            self.policy_type_tax as f64,
            self.policy_type_ets as f64,
            self.policy_type_hybrid as f64,
        ]
    }

    fn from_features(jurisdiction: String, f: [f64; 14]) -> Self {
        let flag = |v: f64| u8::from(v != 0.0);
        Self {
            jurisdiction,
            duration_years: f[0] as i64,
            is_active: flag(f[1]),
            price_signal: f[2],
            num_sectors_covered: f[3] as u8,
            covers_transport: flag(f[4]),
            covers_industry: flag(f[5]),
            covers_buildings: flag(f[6]),
            covers_agriculture: flag(f[7]),
            covers_lulucf: flag(f[8]),
            subsidy_overlap: flag(f[9]),
            tax_relief_overlap: flag(f[10]),
            policy_type_tax: flag(f[11]),
            policy_type_ets: flag(f[12]),
            policy_type_hybrid: flag(f[13]),
        }
    }

    pub fn instrument_flags(&self) -> InstrumentFlags {
        InstrumentFlags {
            tax: self.policy_type_tax == 1,
            ets: self.policy_type_ets == 1,
            hybrid: self.policy_type_hybrid == 1,
        }
    }

    /// Single instrument view of the (possibly overlapping) type flags.
    pub fn inferred_instrument(&self) -> PolicyInstrument {
        self.instrument_flags().instrument()
    }
}

// ── Field parsers ───────────────────────────────────────────────────────────

/// The 4-digit year ending a status string such as `"Implemented 2005"`.
pub fn trailing_year(status: &str) -> Option<i64> {
    let tail: Vec<char> = status.trim().chars().rev().take(4).collect();
    if tail.len() < 4 || !tail.iter().all(|c| c.is_ascii_digit()) {
        return None;
    }
    tail.into_iter().rev().collect::<String>().parse().ok()
}

/// Years since the status year, or 0 when there is none.
pub fn parse_duration(status: Option<&str>, current_year: i32) -> i64 {
    status
        .and_then(trailing_year)
        .map_or(0, |year| current_year as i64 - year)
}

pub fn parse_active(status: Option<&str>) -> u8 {
    u8::from(contains_ci(status, "implemented"))
}

/// Numeric price from cells like `"€ 45.2"`, `"US$ 12 per ton"` or `"30"`.
pub fn parse_price(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return 0.0;
    };
    let cleaned = raw.replace("â‚¬", "").replace('€', "").replace("US$", "").replace('$', "");
    cleaned
        .split_whitespace()
        .next()
        .and_then(frames::parse_number)
        .unwrap_or(0.0)
}

/// Non-null and non-blank after trimming.
pub fn is_present(cell: Option<&str>) -> u8 {
    u8::from(cell.is_some_and(|c| !c.trim().is_empty()))
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

// ── Vectorizer ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Vectorizer {
    current_year: i32,
    keywords: InstrumentKeywords,
}

impl Default for Vectorizer {
    fn default() -> Self {
        Self::new(chrono::Local::now().year())
    }
}

impl Vectorizer {
    pub fn new(current_year: i32) -> Self {
        Self {
            current_year,
            keywords: InstrumentKeywords::default(),
        }
    }

    pub fn with_keywords(mut self, keywords: InstrumentKeywords) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    pub fn vectorize(&self, row: &PolicyMetadata) -> PolicyVector {
        let status = row.status.as_deref();
        let flags: [u8; 5] = std::array::from_fn(|i| is_present(row.sectors[i].as_deref()));
        let relation = row.relation.as_deref();
        let types = self.keywords.flags(row.policy_type.as_deref().unwrap_or(""));

        PolicyVector {
            jurisdiction: row.jurisdiction.clone().unwrap_or_default(),
            duration_years: parse_duration(status, self.current_year),
            is_active: parse_active(status),
            price_signal: parse_price(row.price.as_deref()),
            num_sectors_covered: flags.iter().sum(),
            covers_transport: flags[0],
            covers_industry: flags[1],
            covers_buildings: flags[2],
            covers_agriculture: flags[3],
            covers_lulucf: flags[4],
            subsidy_overlap: u8::from(contains_ci(relation, "subsidy")),
            tax_relief_overlap: u8::from(contains_ci(relation, "relief")),
            policy_type_tax: u8::from(types.tax),
            policy_type_ets: u8::from(types.ets),
            policy_type_hybrid: u8::from(types.hybrid),
        }
    }

    pub fn vectorize_frame(&self, df: &DataFrame) -> Result<Vec<PolicyVector>> {
        let rows = PolicyMetadata::from_frame(df)?;
        let vectors: Vec<PolicyVector> = rows.iter().map(|r| self.vectorize(r)).collect();
        tracing::info!(rows = vectors.len(), year = self.current_year, "Vectorized policy metadata");
        Ok(vectors)
    }
}

/// Drop rows without a jurisdiction or with a non-positive duration.
pub fn clean_vectors(vectors: Vec<PolicyVector>) -> Vec<PolicyVector> {
    vectors
        .into_iter()
        .filter(|v| !v.jurisdiction.trim().is_empty() && v.duration_years > 0)
        .collect()
}

/// Z-score every feature column (population standard deviation). Columns
/// with zero variance map to 0.
pub fn standardize(vectors: &[PolicyVector]) -> Vec<[f64; 14]> {
    if vectors.is_empty() {
        return Vec::new();
    }
    let rows: Vec<[f64; 14]> = vectors.iter().map(PolicyVector::features).collect();
    let n = rows.len() as f64;

    let mut mean = [0.0f64; 14];
    for row in &rows {
        for (m, v) in mean.iter_mut().zip(row) {
            *m += v / n;
        }
    }
    let mut std = [0.0f64; 14];
    for row in &rows {
        for j in 0..14 {
            std[j] += (row[j] - mean[j]).powi(2) / n;
        }
    }
    for s in std.iter_mut() {
        *s = s.sqrt();
    }

    rows.into_iter()
        .map(|row| {
            std::array::from_fn(|j| {
                if std[j] > 0.0 {
                    (row[j] - mean[j]) / std[j]
                } else {
                    0.0
                }
            })
        })
        .collect()
}

// ── Table I/O ───────────────────────────────────────────────────────────────

pub fn vectors_to_frame(vectors: &[PolicyVector]) -> Result<DataFrame> {
    let jurisdictions: Vec<String> = vectors.iter().map(|v| v.jurisdiction.clone()).collect();
    let mut columns = vec![Column::new(vector::JURISDICTION.into(), &jurisdictions)];

    for (j, name) in vector::FEATURES.iter().enumerate() {
        let column = if *name == vector::PRICE_SIGNAL {
            let values: Vec<f64> = vectors.iter().map(|v| v.price_signal).collect();
            Column::new((*name).into(), &values)
        } else {
            let values: Vec<i64> = vectors.iter().map(|v| v.features()[j] as i64).collect();
            Column::new((*name).into(), &values)
        };
        columns.push(column);
    }

    Ok(DataFrame::new(columns)?)
}

pub fn vectors_from_frame(df: &DataFrame) -> Result<Vec<PolicyVector>> {
    frames::require_columns(df, &[vector::JURISDICTION])?;
    frames::require_columns(df, &vector::FEATURES)?;

    let jurisdictions = optional_str_values(df, vector::JURISDICTION)?;
    let features = vector::FEATURES
        .iter()
        .map(|name| frames::f64_values(df, name))
        .collect::<Result<Vec<_>>>()?;

    (0..df.height())
        .map(|i| {
            let mut f = [0.0f64; 14];
            for (j, column) in features.iter().enumerate() {
                f[j] = column[i].ok_or_else(|| {
                    PolicyError::InvalidData(format!(
                        "Missing value for '{}' at row {i}",
                        vector::FEATURES[j]
                    ))
                })?;
            }
            Ok(PolicyVector::from_features(
                jurisdictions[i].clone().unwrap_or_default(),
                f,
            ))
        })
        .collect()
}

pub fn write_vectors_csv(path: &Path, vectors: &[PolicyVector]) -> Result<()> {
    let mut df = vectors_to_frame(vectors)?;
    frames::write_csv(&mut df, path)?;
    tracing::info!(path = %path.display(), rows = vectors.len(), "Wrote policy vectors");
    Ok(())
}

pub fn read_vectors_csv(path: &Path) -> Result<Vec<PolicyVector>> {
    let df = frames::read_csv_as_strings(path, None)?;
    vectors_from_frame(&df)
}
