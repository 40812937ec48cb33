use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

/// Which axis carries depth. `Horizontal` lays levels out left to right and
/// stacks siblings top to bottom; `Vertical` swaps the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "horizontal" | "LR" => Some(Self::Horizontal),
            "vertical" | "TD" | "TB" => Some(Self::Vertical),
            _ => None,
        }
    }
}

/// Marks a cycle-breaking copy of another node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashedInfo {
    pub original_id: String,
    pub min_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashed: Option<DashedInfo>,
}

impl Node {
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            classes: Vec::new(),
            dashed: None,
        }
    }

    pub fn is_ghost(&self) -> bool {
        self.dashed.is_some()
    }

    /// Id used for size lookups; ghosts share their original's measurement.
    pub fn size_key(&self) -> &str {
        self.dashed
            .as_ref()
            .map(|info| info.original_id.as_str())
            .unwrap_or(self.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub is_dashed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_to: Option<String>,
}

impl Edge {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            label: None,
            is_dashed: false,
            original_to: None,
        }
    }

    pub fn labeled(from: &str, to: &str, label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
            ..Self::new(from, to)
        }
    }

    pub fn has_label(&self) -> bool {
        self.label
            .as_deref()
            .map(|label| !label.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("duplicate node id: {id}")]
    DuplicateNode { id: String },

    #[error("node id must not be empty")]
    EmptyNodeId,

    #[error("invalid graph JSON: {0}")]
    Json(#[from] json5::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    #[serde(default)]
    pub orientation: Orientation,
    /// Declaration order is significant: it breaks every tie in layout.
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a graph document. Accepts plain JSON as well as
    /// JSON5 (comments, trailing commas).
    pub fn from_json_str(input: &str) -> Result<Self, GraphError> {
        let mut graph: Graph = json5::from_str(input)?;
        for node in &mut graph.nodes {
            if node.label.is_empty() {
                node.label = node.id.clone();
            }
        }
        graph.validate()?;
        Ok(graph)
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if node.id.is_empty() {
                return Err(GraphError::EmptyNodeId);
            }
            if !seen.insert(node.id.as_str()) {
                return Err(GraphError::DuplicateNode {
                    id: node.id.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn ensure_node(&mut self, id: &str, label: Option<String>) {
        if let Some(node) = self.nodes.iter_mut().find(|node| node.id == id) {
            if let Some(label) = label {
                node.label = label;
            }
            return;
        }
        let label = label.unwrap_or_else(|| id.to_string());
        self.nodes.push(Node::new(id, &label));
    }

    pub fn add_edge(&mut self, edge: Edge) {
        self.ensure_node(&edge.from, None);
        self.ensure_node(&edge.to, None);
        self.edges.push(edge);
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Returns the visible part of the graph when the given nodes are
    /// collapsed. Collapsed nodes stay visible; anything reachable only
    /// through a collapsed node is hidden together with its edges.
    pub fn without_collapsed(&self, collapsed: &BTreeSet<String>) -> Graph {
        if collapsed.is_empty() {
            return self.clone();
        }
        let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &self.edges {
            outgoing
                .entry(edge.from.as_str())
                .or_default()
                .push(edge.to.as_str());
        }
        // Everything below a collapsed node is a hiding candidate.
        let mut below: HashSet<&str> = HashSet::new();
        for id in collapsed {
            for child in outgoing.get(id.as_str()).into_iter().flatten() {
                if below.insert(*child) {
                    reach(vec![*child], &mut below, &outgoing, collapsed);
                }
            }
        }

        // Candidates that are still reachable from an unaffected node stay.
        let seeds: Vec<&str> = self
            .nodes
            .iter()
            .map(|node| node.id.as_str())
            .filter(|id| !below.contains(id))
            .collect();
        let mut visible: HashSet<&str> = seeds.iter().copied().collect();
        reach(seeds, &mut visible, &outgoing, collapsed);

        let nodes: Vec<Node> = self
            .nodes
            .iter()
            .filter(|node| visible.contains(node.id.as_str()))
            .cloned()
            .collect();
        let edges = self
            .edges
            .iter()
            .filter(|edge| {
                !collapsed.contains(&edge.from)
                    && visible.contains(edge.from.as_str())
                    && visible.contains(edge.to.as_str())
            })
            .cloned()
            .collect();
        Graph {
            orientation: self.orientation,
            nodes,
            edges,
        }
    }
}

fn reach<'a>(
    seeds: Vec<&'a str>,
    visited: &mut HashSet<&'a str>,
    outgoing: &HashMap<&'a str, Vec<&'a str>>,
    collapsed: &BTreeSet<String>,
) {
    let mut queue: VecDeque<&str> = seeds.into_iter().collect();
    while let Some(current) = queue.pop_front() {
        if collapsed.contains(current) {
            continue;
        }
        for child in outgoing.get(current).into_iter().flatten() {
            if visited.insert(*child) {
                queue.push_back(*child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Graph {
        let mut graph = Graph::new();
        graph.add_edge(Edge::new("A", "B"));
        graph.add_edge(Edge::new("B", "C"));
        graph.add_edge(Edge::new("A", "D"));
        graph
    }

    #[test]
    fn add_edge_creates_missing_nodes_in_order() {
        let graph = chain();
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C", "D"]);
        assert_eq!(graph.node("C").map(|n| n.label.as_str()), Some("C"));
    }

    #[test]
    fn from_json_accepts_json5_and_defaults_labels() {
        let graph = Graph::from_json_str(
            r#"{
                // comments are fine
                orientation: "vertical",
                nodes: [{ id: "A" }, { id: "B", label: "Beta" },],
                edges: [{ from: "A", to: "B", label: "go" }],
            }"#,
        )
        .expect("graph should parse");
        assert_eq!(graph.orientation, Orientation::Vertical);
        assert_eq!(graph.nodes[0].label, "A");
        assert_eq!(graph.nodes[1].label, "Beta");
        assert!(graph.edges[0].has_label());
        assert!(!graph.edges[0].is_dashed);
    }

    #[test]
    fn from_json_rejects_duplicate_ids() {
        let err = Graph::from_json_str(r#"{"nodes":[{"id":"A"},{"id":"A"}]}"#).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateNode { ref id } if id == "A"));
    }

    #[test]
    fn from_json_rejects_empty_ids() {
        let err = Graph::from_json_str(r#"{"nodes":[{"id":""}]}"#).unwrap_err();
        assert!(matches!(err, GraphError::EmptyNodeId));
    }

    #[test]
    fn collapsing_hides_descendants_only() {
        let graph = chain();
        let collapsed: BTreeSet<String> = ["B".to_string()].into_iter().collect();
        let visible = graph.without_collapsed(&collapsed);
        let ids: Vec<&str> = visible.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "D"]);
        assert_eq!(visible.edges.len(), 2);
    }

    #[test]
    fn collapsing_keeps_nodes_reachable_another_way() {
        let mut graph = chain();
        graph.add_edge(Edge::new("D", "C"));
        let collapsed: BTreeSet<String> = ["B".to_string()].into_iter().collect();
        let visible = graph.without_collapsed(&collapsed);
        assert!(visible.node("C").is_some());
        assert!(visible.edges.iter().all(|e| e.from != "B"));
    }

    #[test]
    fn ghost_nodes_share_their_original_size_key() {
        let mut ghost = Node::new("A~ghost0", "A");
        ghost.dashed = Some(DashedInfo {
            original_id: "A".to_string(),
            min_depth: 3,
        });
        assert!(ghost.is_ghost());
        assert_eq!(ghost.size_key(), "A");
    }
}
