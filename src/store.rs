//! File-backed policy node repository.
//!
//! The whole file is read, modified in memory and rewritten atomically
//! (temp file in the same directory, then rename). Writers in separate
//! processes are not coordinated.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tempfile::NamedTempFile;

use crate::error::Result;
use crate::node::{Alignment, PolicyNode};

#[derive(Debug, Clone)]
pub struct NodeStore {
    path: PathBuf,
}

impl NodeStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored nodes in file order. A missing file is an empty store.
    pub fn load(&self) -> Result<Vec<PolicyNode>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let nodes: Vec<PolicyNode> = serde_json::from_reader(reader)?;
        tracing::debug!(path = %self.path.display(), nodes = nodes.len(), "Loaded node store");
        Ok(nodes)
    }

    pub fn append(&self, node: PolicyNode) -> Result<()> {
        let mut nodes = self.load()?;
        tracing::info!(id = %node.id, total = nodes.len() + 1, "Appending policy node");
        nodes.push(node);
        self.write_all(&nodes)
    }

    /// Matching nodes, newest date first.
    pub fn list(&self, filter: &NodeFilter) -> Result<Vec<PolicyNode>> {
        let mut nodes: Vec<PolicyNode> = self
            .load()?
            .into_iter()
            .filter(|n| filter.matches(n))
            .collect();
        nodes.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(nodes)
    }

    /// Remove the node with `id`. Returns `false` (and leaves the file
    /// untouched) when no node has that id.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut nodes = self.load()?;
        let before = nodes.len();
        nodes.retain(|n| n.id != id);
        if nodes.len() == before {
            tracing::debug!(id, "Delete requested for unknown node");
            return Ok(false);
        }
        self.write_all(&nodes)?;
        tracing::info!(id, remaining = nodes.len(), "Deleted policy node");
        Ok(true)
    }

    fn write_all(&self, nodes: &[PolicyNode]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, nodes)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}

/// Conjunctive filter over stored nodes. Empty lists and `None` bounds
/// match everything.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    /// Case-insensitive substring of the title.
    pub title_contains: Option<String>,
    pub countries: Vec<String>,
    pub sectors: Vec<String>,
    pub intents: Vec<String>,
    pub alignments: Vec<Alignment>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub min_impact_mt: Option<f64>,
    pub max_impact_mt: Option<f64>,
}

fn in_list(list: &[String], value: &str) -> bool {
    list.is_empty() || list.iter().any(|v| v.eq_ignore_ascii_case(value))
}

impl NodeFilter {
    pub fn matches(&self, node: &PolicyNode) -> bool {
        if let Some(needle) = &self.title_contains {
            if !node.title.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        in_list(&self.countries, &node.country)
            && in_list(&self.sectors, &node.sector)
            && in_list(&self.intents, &node.graph_intent)
            && (self.alignments.is_empty() || self.alignments.contains(&node.alignment))
            && self.date_from.map_or(true, |d| node.date >= d)
            && self.date_to.map_or(true, |d| node.date <= d)
            && self.min_impact_mt.map_or(true, |m| node.impact_mt >= m)
            && self.max_impact_mt.map_or(true, |m| node.impact_mt <= m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeColor;

    fn node(id: &str, date: (i32, u32, u32), country: &str, impact: f64) -> PolicyNode {
        let alignment = Alignment::from_impact(impact);
        PolicyNode {
            id: id.into(),
            title: format!("Policy {id}"),
            display_name: format!("Policy {id}"),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            country: country.into(),
            graph_intent: "Decarbonise".into(),
            original_text: "text".into(),
            activity_class: "EV Subsidy".into(),
            sector: "Transport".into(),
            department: "Ministry of Transport".into(),
            beneficiary: "Urban Citizens".into(),
            influencer: "UNEP, EV Lobbies".into(),
            instrument: "Subsidy".into(),
            unit: "vehicle".into(),
            impact_tons: impact,
            impact_mt: impact / 1e6,
            efficiency: 0.5,
            alignment,
            node_color: alignment.color(),
            node_size: 10.0,
        }
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = NodeStore::open(dir.path().join("policy_nodes.json"));
        assert!(store.load().unwrap().is_empty());
        assert!(!store.delete("nope").unwrap());
        assert!(!store.path().exists());
    }

    #[test]
    fn append_list_delete_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("policy_nodes.json");

        let store = NodeStore::open(&path);
        store.append(node("a", (2023, 1, 1), "India", -5e6)).unwrap();
        store.append(node("b", (2025, 6, 1), "Chile", 2e6)).unwrap();
        store.append(node("c", (2024, 2, 1), "India", 0.0)).unwrap();

        let reopened = NodeStore::open(&path);
        let ids: Vec<String> = reopened
            .list(&NodeFilter::default())
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        assert!(reopened.delete("c").unwrap());
        assert!(!reopened.delete("c").unwrap());
        let remaining = NodeStore::open(&path).load().unwrap();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0], node("a", (2023, 1, 1), "India", -5e6));
    }

    #[test]
    fn filters_combine() {
        let a = node("a", (2023, 1, 1), "India", -5e6);
        let b = node("b", (2025, 6, 1), "Chile", 2e6);

        let by_country = NodeFilter {
            countries: vec!["INDIA".into()],
            ..Default::default()
        };
        assert!(by_country.matches(&a));
        assert!(!by_country.matches(&b));

        let by_alignment = NodeFilter {
            alignments: vec![Alignment::Negative],
            ..Default::default()
        };
        assert!(by_alignment.matches(&b));
        assert_eq!(b.node_color, NodeColor::Red);

        let by_range = NodeFilter {
            date_from: NaiveDate::from_ymd_opt(2024, 1, 1),
            min_impact_mt: Some(0.0),
            title_contains: Some("policy B".into()),
            ..Default::default()
        };
        assert!(!by_range.matches(&a));
        assert!(by_range.matches(&b));
    }
}
