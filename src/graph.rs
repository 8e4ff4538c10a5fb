use std::collections::{BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use polars::prelude::*;

use crate::error::Result;
use crate::node::PolicyNode;
use crate::schema::graph;

/// Vertex payload.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphVertex {
    /// Central node: the intent itself, or "{country} Policies".
    Hub { label: String, title: String, country: String },
    Policy(Box<PolicyNode>),
}

impl GraphVertex {
    pub fn key(&self) -> &str {
        match self {
            GraphVertex::Hub { label, .. } => label,
            GraphVertex::Policy(node) => &node.id,
        }
    }
}

/// Intent-centred star graph for the rendering layer.
///
/// One hub vertex with an edge to every policy node of the selected intent
/// (optionally restricted to one country).
pub struct PolicyGraph {
    graph: DiGraph<GraphVertex, ()>,
    /// Map from vertex key (hub label or node id) → NodeIndex.
    node_map: HashMap<String, NodeIndex>,
    hub: NodeIndex,
}

impl PolicyGraph {
    pub fn build(nodes: &[PolicyNode], intent: &str, country: Option<&str>) -> Self {
        let mut graph = DiGraph::new();
        let mut node_map: HashMap<String, NodeIndex> = HashMap::new();

        let hub_vertex = match country {
            Some(c) => GraphVertex::Hub {
                label: format!("{c} Policies"),
                title: format!("{intent} - {c}"),
                country: c.to_string(),
            },
            None => GraphVertex::Hub {
                label: intent.to_string(),
                title: intent.to_string(),
                country: "Global".to_string(),
            },
        };
        let hub_key = hub_vertex.key().to_string();
        let hub = graph.add_node(hub_vertex);
        node_map.insert(hub_key, hub);

        for node in nodes {
            if node.graph_intent != intent || country.is_some_and(|c| node.country != c) {
                continue;
            }
            let idx = *node_map
                .entry(node.id.clone())
                .or_insert_with(|| graph.add_node(GraphVertex::Policy(Box::new(node.clone()))));
            graph.update_edge(hub, idx, ());
        }

        tracing::debug!(
            intent,
            country = country.unwrap_or("all"),
            vertices = graph.node_count(),
            "Built policy graph"
        );
        Self { graph, node_map, hub }
    }

    pub fn hub(&self) -> &GraphVertex {
        &self.graph[self.hub]
    }

    pub fn policies(&self) -> impl Iterator<Item = &PolicyNode> {
        self.graph
            .neighbors_directed(self.hub, Direction::Outgoing)
            .filter_map(|idx| match &self.graph[idx] {
                GraphVertex::Policy(node) => Some(node.as_ref()),
                GraphVertex::Hub { .. } => None,
            })
    }

    pub fn policy_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// A graph with only the hub is not worth rendering.
    pub fn is_empty(&self) -> bool {
        self.policy_count() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.node_map.contains_key(key)
    }

    pub fn total_impact_mt(&self) -> f64 {
        self.policies().map(|n| n.impact_mt).sum()
    }

    /// One row per edge with the child's display attributes.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let parent_key = self.hub().key().to_string();

        let mut parents = Vec::new();
        let mut children = Vec::new();
        let mut titles = Vec::new();
        let mut countries = Vec::new();
        let mut sectors = Vec::new();
        let mut impacts = Vec::new();
        let mut sizes = Vec::new();
        let mut colors = Vec::new();

        let mut policies: Vec<&PolicyNode> = self.policies().collect();
        policies.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

        for node in policies {
            parents.push(parent_key.clone());
            children.push(node.id.clone());
            titles.push(node.title.clone());
            countries.push(node.country.clone());
            sectors.push(node.sector.clone());
            impacts.push(node.impact_mt);
            sizes.push(node.node_size);
            colors.push(node.node_color.as_str().to_string());
        }

        Ok(DataFrame::new(vec![
            Column::new(graph::PARENT.into(), &parents),
            Column::new(graph::CHILD.into(), &children),
            Column::new(graph::TITLE.into(), &titles),
            Column::new(graph::COUNTRY.into(), &countries),
            Column::new(graph::SECTOR.into(), &sectors),
            Column::new(graph::IMPACT_MT.into(), &impacts),
            Column::new(graph::NODE_SIZE.into(), &sizes),
            Column::new(graph::NODE_COLOR.into(), &colors),
        ])?)
    }
}

/// Distinct graph intents, sorted.
pub fn graph_intents(nodes: &[PolicyNode]) -> Vec<String> {
    nodes
        .iter()
        .map(|n| n.graph_intent.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct countries with at least one node under `intent`, sorted.
pub fn countries_for_intent(nodes: &[PolicyNode], intent: &str) -> Vec<String> {
    nodes
        .iter()
        .filter(|n| n.graph_intent == intent)
        .map(|n| n.country.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Alignment, NodeColor};
    use chrono::NaiveDate;

    fn node(id: &str, intent: &str, country: &str, impact_mt: f64) -> PolicyNode {
        let alignment = Alignment::from_impact(impact_mt);
        PolicyNode {
            id: id.into(),
            title: id.to_uppercase(),
            display_name: id.into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            country: country.into(),
            graph_intent: intent.into(),
            original_text: String::new(),
            activity_class: "EV Subsidy".into(),
            sector: "Transport".into(),
            department: String::new(),
            beneficiary: String::new(),
            influencer: String::new(),
            instrument: "Subsidy".into(),
            unit: String::new(),
            impact_tons: impact_mt * 1e6,
            impact_mt,
            efficiency: 0.5,
            alignment,
            node_color: alignment.color(),
            node_size: 10.0,
        }
    }

    fn nodes() -> Vec<PolicyNode> {
        vec![
            node("a", "Mobility", "India", -0.5),
            node("b", "Mobility", "Chile", 0.25),
            node("c", "Heat", "India", -1.0),
            node("d", "Mobility", "India", -0.25),
        ]
    }

    #[test]
    fn intent_graph_links_every_matching_node() {
        let g = PolicyGraph::build(&nodes(), "Mobility", None);
        assert_eq!(g.policy_count(), 3);
        assert!(g.contains("Mobility"));
        assert!(!g.contains("c"));
        assert_eq!(g.total_impact_mt(), -0.5);
        assert!(matches!(g.hub(), GraphVertex::Hub { country, .. } if country == "Global"));
    }

    #[test]
    fn country_graph_uses_country_hub() {
        let g = PolicyGraph::build(&nodes(), "Mobility", Some("India"));
        assert_eq!(g.policy_count(), 2);
        assert_eq!(g.hub().key(), "India Policies");

        let df = g.to_frame().unwrap();
        assert_eq!(df.height(), 2);
        let parents: Vec<Option<&str>> = df.column(graph::PARENT).unwrap().str().unwrap().into_iter().collect();
        assert_eq!(parents, vec![Some("India Policies"); 2]);
        let colors: Vec<Option<&str>> = df.column(graph::NODE_COLOR).unwrap().str().unwrap().into_iter().collect();
        assert_eq!(colors, vec![Some(NodeColor::Green.as_str()); 2]);
    }

    #[test]
    fn unknown_intent_is_empty() {
        let g = PolicyGraph::build(&nodes(), "Nothing", None);
        assert!(g.is_empty());
        assert_eq!(g.to_frame().unwrap().height(), 0);
    }

    #[test]
    fn intents_and_countries_are_sorted_sets() {
        let nodes = nodes();
        assert_eq!(graph_intents(&nodes), vec!["Heat", "Mobility"]);
        assert_eq!(countries_for_intent(&nodes, "Mobility"), vec!["Chile", "India"]);
    }
}
