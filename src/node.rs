//! Policy node construction: classify, estimate, decorate.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{ActivityCatalog, CountryFactors, DEFAULT_EFFICIENCY};
use crate::classifier::classify;
use crate::estimator::{round_to, Estimator};

/// Instrument label used when the catalog entry does not name one.
pub const DEFAULT_INSTRUMENT: &str = "Subsidy";
const TITLE_FALLBACK_CHARS: usize = 80;

/// Raw user submission.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyRecord {
    pub text: String,
    pub country: String,
    pub title: String,
    pub date: NaiveDate,
    pub graph_intent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alignment {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeColor {
    Green,
    Red,
    Gray,
}

impl Alignment {
    /// Negative impact (avoided emissions) is positive alignment.
    pub fn from_impact(impact: f64) -> Self {
        if impact < 0.0 {
            Alignment::Positive
        } else if impact > 0.0 {
            Alignment::Negative
        } else {
            Alignment::Neutral
        }
    }

    pub fn color(&self) -> NodeColor {
        match self {
            Alignment::Positive => NodeColor::Green,
            Alignment::Negative => NodeColor::Red,
            Alignment::Neutral => NodeColor::Gray,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Positive => "Positive",
            Alignment::Negative => "Negative",
            Alignment::Neutral => "Neutral",
        }
    }
}

impl NodeColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeColor::Green => "green",
            NodeColor::Red => "red",
            NodeColor::Gray => "gray",
        }
    }
}

// ── Sector lookups ──────────────────────────────────────────────────────────

/// Sector → department / beneficiary / influencer tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorLookup {
    pub departments: HashMap<String, String>,
    pub beneficiaries: HashMap<String, String>,
    pub influencers: HashMap<String, String>,
    pub default_department: String,
    pub default_beneficiary: String,
    pub default_influencer: String,
}

fn table(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Default for SectorLookup {
    fn default() -> Self {
        Self {
            departments: table(&[
                ("Transport", "Ministry of Transport"),
                ("Electricity", "Ministry of Energy"),
                ("Cement", "Ministry of Industry"),
                ("Agriculture", "Ministry of Agriculture"),
                ("Waste", "Urban Development"),
            ]),
            beneficiaries: table(&[
                ("Transport", "Urban Citizens"),
                ("Cement", "Cement Companies"),
                ("Electricity", "Power Producers"),
            ]),
            influencers: table(&[
                ("Transport", "UNEP, EV Lobbies"),
                ("Cement", "IPCC, Carbon Funders"),
                ("Electricity", "Renewable Advocates"),
            ]),
            default_department: "General".into(),
            default_beneficiary: "Public".into(),
            default_influencer: "General Influencers".into(),
        }
    }
}

impl SectorLookup {
    pub fn department(&self, sector: &str) -> &str {
        self.departments.get(sector).unwrap_or(&self.default_department)
    }

    pub fn beneficiary(&self, sector: &str) -> &str {
        self.beneficiaries.get(sector).unwrap_or(&self.default_beneficiary)
    }

    pub fn influencer(&self, sector: &str) -> &str {
        self.influencers.get(sector).unwrap_or(&self.default_influencer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSizeBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for NodeSizeBounds {
    fn default() -> Self {
        Self { min: 10.0, max: 100.0 }
    }
}

impl NodeSizeBounds {
    pub fn size_for(&self, impact: f64) -> f64 {
        impact.abs().max(self.min).min(self.max)
    }
}

// ── Node ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyNode {
    #[serde(rename = "Policy Node")]
    pub id: String,
    #[serde(rename = "Policy Title")]
    pub title: String,
    #[serde(rename = "Display Name")]
    pub display_name: String,
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Graph Intent")]
    pub graph_intent: String,
    #[serde(rename = "Original Text")]
    pub original_text: String,
    #[serde(rename = "Activity Class")]
    pub activity_class: String,
    #[serde(rename = "Sector")]
    pub sector: String,
    #[serde(rename = "Dept")]
    pub department: String,
    #[serde(rename = "Beneficiary")]
    pub beneficiary: String,
    #[serde(rename = "Influencer")]
    pub influencer: String,
    #[serde(rename = "Instrument")]
    pub instrument: String,
    #[serde(rename = "Unit")]
    pub unit: String,
    /// Signed tons CO₂e.
    #[serde(rename = "CO₂e Impact")]
    pub impact_tons: f64,
    #[serde(rename = "CO₂ Impact (Mt ±)")]
    pub impact_mt: f64,
    #[serde(rename = "Efficiency")]
    pub efficiency: f64,
    #[serde(rename = "Alignment")]
    pub alignment: Alignment,
    #[serde(rename = "Node Color")]
    pub node_color: NodeColor,
    #[serde(rename = "Node Size")]
    pub node_size: f64,
}

/// Why a record did not become a node. Recoverable; the caller reports it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NodeRejection {
    #[error("Policy text did not match any activity")]
    Unmatched,
    #[error("Country '{0}' is not in the country factor table")]
    UnknownCountry(String),
    #[error("Impact could not be estimated for activity '{0}'")]
    ImpactUnavailable(String),
}

pub struct NodeBuilder<'a> {
    catalog: &'a ActivityCatalog,
    countries: &'a CountryFactors,
    sectors: &'a SectorLookup,
    estimator: Estimator,
    size_bounds: NodeSizeBounds,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(
        catalog: &'a ActivityCatalog,
        countries: &'a CountryFactors,
        sectors: &'a SectorLookup,
    ) -> Self {
        Self {
            catalog,
            countries,
            sectors,
            estimator: Estimator::default(),
            size_bounds: NodeSizeBounds::default(),
        }
    }

    pub fn with_estimator(mut self, estimator: Estimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_size_bounds(mut self, bounds: NodeSizeBounds) -> Self {
        self.size_bounds = bounds;
        self
    }

    pub fn build(&self, record: &PolicyRecord, user_input: f64) -> Result<PolicyNode, NodeRejection> {
        let classification = classify(&record.text, self.catalog);
        let entry = classification.entry.ok_or(NodeRejection::Unmatched)?;

        let country = self
            .countries
            .find(&record.country)
            .ok_or_else(|| NodeRejection::UnknownCountry(record.country.clone()))?;

        let impact = self
            .estimator
            .estimate(entry, user_input, Some(country))
            .ok_or_else(|| NodeRejection::ImpactUnavailable(entry.activity_class.clone()))?;

        let alignment = Alignment::from_impact(impact);
        let title = match record.title.trim() {
            "" => record.text.trim().chars().take(TITLE_FALLBACK_CHARS).collect(),
            t => t.to_string(),
        };
        let instrument = if entry.instrument_type.is_empty() {
            DEFAULT_INSTRUMENT.to_string()
        } else {
            entry.instrument_type.clone()
        };

        let node = PolicyNode {
            id: Uuid::new_v4().to_string(),
            display_name: format!("{} ({})", title, record.date),
            title,
            date: record.date,
            country: country.country.clone(),
            graph_intent: record.graph_intent.trim().to_string(),
            original_text: record.text.clone(),
            activity_class: entry.activity_class.clone(),
            sector: entry.sector.clone(),
            department: self.sectors.department(&entry.sector).to_string(),
            beneficiary: self.sectors.beneficiary(&entry.sector).to_string(),
            influencer: self.sectors.influencer(&entry.sector).to_string(),
            instrument,
            unit: entry.unit.clone(),
            impact_tons: impact,
            impact_mt: round_to(impact / 1e6, 4),
            efficiency: if country.efficiency.is_finite() {
                country.efficiency
            } else {
                DEFAULT_EFFICIENCY
            },
            alignment,
            node_color: alignment.color(),
            node_size: self.size_bounds.size_for(impact),
        };

        tracing::info!(
            id = %node.id,
            activity = %node.activity_class,
            impact = node.impact_tons,
            alignment = node.alignment.as_str(),
            "Built policy node"
        );
        Ok(node)
    }
}
