//! Keyword-count matching of free-text policy descriptions against the
//! activity catalog.

use crate::catalog::{ActivityCatalog, ActivityCatalogEntry};

/// Outcome of classifying one description. Never an error: an unmatched
/// text has `matched == false` and no entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification<'a> {
    pub matched: bool,
    pub entry: Option<&'a ActivityCatalogEntry>,
    /// Number of the entry's keywords found in the text.
    pub score: usize,
    pub keywords_matched: Vec<String>,
}

impl<'a> Classification<'a> {
    fn no_match() -> Self {
        Self {
            matched: false,
            entry: None,
            score: 0,
            keywords_matched: Vec::new(),
        }
    }

    pub fn activity_class(&self) -> Option<&'a str> {
        self.entry.map(|e| e.activity_class.as_str())
    }
}

/// Keyword hit count of every catalog entry, in catalog order.
pub fn keyword_scores(text: &str, catalog: &ActivityCatalog) -> Vec<usize> {
    let text = text.to_lowercase();
    catalog
        .entries()
        .iter()
        .map(|entry| entry.keywords.iter().filter(|kw| text.contains(kw.as_str())).count())
        .collect()
}

/// Pick the entry with the most keyword hits. Ties go to the earliest entry.
pub fn classify<'a>(text: &str, catalog: &'a ActivityCatalog) -> Classification<'a> {
    let scores = keyword_scores(text, catalog);

    let mut best: Option<(usize, usize)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((idx, score));
        }
    }

    let Some((idx, score)) = best.filter(|&(_, score)| score > 0) else {
        tracing::debug!(entries = catalog.len(), "No activity matched policy text");
        return Classification::no_match();
    };

    let entry = &catalog.entries()[idx];
    let lowered = text.to_lowercase();
    let keywords_matched = entry
        .keywords
        .iter()
        .filter(|kw| lowered.contains(kw.as_str()))
        .cloned()
        .collect();

    tracing::debug!(activity = %entry.activity_class, score, "Classified policy text");
    Classification {
        matched: true,
        entry: Some(entry),
        score,
        keywords_matched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ActivityCatalog {
        ActivityCatalog::new(vec![
            ActivityCatalogEntry::new("EV Subsidy", "electric vehicle, ev, charging", "–1.6 tons"),
            ActivityCatalogEntry::new("Solar Rooftop", "solar, rooftop, panel", "–0.9 tons"),
            ActivityCatalogEntry::new("Empty", "", "0"),
            ActivityCatalogEntry::new("Solar Farm", "solar, farm", "–1.2 tons"),
        ])
    }

    #[test]
    fn unrelated_text_is_no_match() {
        let catalog = catalog();
        let result = classify("Reform of pension contributions", &catalog);
        assert!(!result.matched);
        assert!(result.entry.is_none());
        assert_eq!(result.score, 0);
    }

    #[test]
    fn empty_text_is_no_match() {
        assert!(!classify("", &catalog()).matched);
    }

    #[test]
    fn empty_catalog_is_no_match() {
        assert!(!classify("solar", &ActivityCatalog::default()).matched);
    }

    #[test]
    fn highest_count_wins_case_insensitively() {
        let catalog = catalog();
        let result = classify("Grants for SOLAR ROOFTOP panel installs", &catalog);
        assert!(result.matched);
        assert_eq!(result.activity_class(), Some("Solar Rooftop"));
        assert_eq!(result.score, 3);
        assert_eq!(result.keywords_matched, vec!["solar", "rooftop", "panel"]);
    }

    #[test]
    fn ties_go_to_first_entry() {
        // "solar" hits both solar entries once.
        let catalog = catalog();
        let result = classify("national solar programme", &catalog);
        assert_eq!(result.activity_class(), Some("Solar Rooftop"));
    }

    #[test]
    fn full_keyword_list_never_loses_to_a_lower_score() {
        let catalog = catalog();
        for entry in catalog.entries() {
            if entry.keywords.is_empty() {
                continue;
            }
            let text = entry.keywords.join(" and ");
            let scores = keyword_scores(&text, &catalog);
            let result = classify(&text, &catalog);
            assert!(result.matched);
            assert!(result.score >= entry.keywords.len());
            assert!(scores.iter().all(|&s| s <= result.score));
        }
    }
}
