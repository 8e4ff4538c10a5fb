use std::fmt;

use serde::{Deserialize, Serialize};

/// Carbon-pricing instrument family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyInstrument {
    Tax,
    #[serde(rename = "ETS")]
    Ets,
    Hybrid,
    Other,
}

impl PolicyInstrument {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyInstrument::Tax => "Tax",
            PolicyInstrument::Ets => "ETS",
            PolicyInstrument::Hybrid => "Hybrid",
            PolicyInstrument::Other => "Other",
        }
    }

    /// Relative effectiveness used by the emissions forecast.
    pub fn forecast_multiplier(&self) -> f64 {
        match self {
            PolicyInstrument::Tax => 1.0,
            PolicyInstrument::Ets => 0.9,
            PolicyInstrument::Hybrid => 1.2,
            PolicyInstrument::Other => 1.0,
        }
    }
}

impl fmt::Display for PolicyInstrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Independent keyword hits for each instrument family.
///
/// More than one flag can be set ("Carbon tax with trading component").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstrumentFlags {
    pub tax: bool,
    pub ets: bool,
    pub hybrid: bool,
}

impl InstrumentFlags {
    /// Collapse to one instrument. Precedence: Tax, ETS, Hybrid.
    pub fn instrument(&self) -> PolicyInstrument {
        if self.tax {
            PolicyInstrument::Tax
        } else if self.ets {
            PolicyInstrument::Ets
        } else if self.hybrid {
            PolicyInstrument::Hybrid
        } else {
            PolicyInstrument::Other
        }
    }
}

/// Keyword configuration for recognising instrument families in the free-text
/// "Type" field. Matching is case-insensitive substring search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentKeywords {
    pub tax: Vec<String>,
    pub ets: Vec<String>,
    pub hybrid: Vec<String>,
}

impl Default for InstrumentKeywords {
    fn default() -> Self {
        Self {
            tax: vec!["tax".into()],
            ets: vec!["ets".into(), "trading".into()],
            hybrid: vec!["hybrid".into()],
        }
    }
}

impl InstrumentKeywords {
    pub fn flags(&self, type_text: &str) -> InstrumentFlags {
        let text = type_text.to_lowercase();
        let hit = |keywords: &[String]| {
            keywords
                .iter()
                .any(|kw| !kw.is_empty() && text.contains(&kw.to_lowercase()))
        };
        InstrumentFlags {
            tax: hit(&self.tax),
            ets: hit(&self.ets),
            hybrid: hit(&self.hybrid),
        }
    }

    pub fn classify(&self, type_text: &str) -> PolicyInstrument {
        self.flags(type_text).instrument()
    }
}
