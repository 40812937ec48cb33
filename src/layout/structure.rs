//! Depth layering of the cycle-free graph.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use crate::config::LevelPolicy;
use crate::ir::{Edge, Node};

#[derive(Debug, Clone, Default)]
pub struct Structure {
    pub roots: Vec<String>,
    /// Index = depth. Within a level, nodes keep declaration order.
    pub levels: Vec<Vec<String>>,
    pub children: BTreeMap<String, Vec<String>>,
    pub parents: BTreeMap<String, Vec<String>>,
    pub depth: HashMap<String, usize>,
    /// Propagation stopped at the `|V|^2` safety cap.
    pub propagation_capped: bool,
}

impl Structure {
    pub fn depth_of(&self, id: &str) -> Option<usize> {
        self.depth.get(id).copied()
    }

    pub fn children_of(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parents_of(&self, id: &str) -> &[String] {
        self.parents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Assigns every node a level by breadth-first propagation from the roots.
///
/// `edges` must already be free of back edges. Edges naming unknown nodes
/// are ignored. A child whose level changes is re-enqueued; the walk is
/// capped at `|V|^2` dequeues so a cyclic input still terminates.
pub fn analyze_structure(nodes: &[Node], edges: &[Edge], policy: LevelPolicy) -> Structure {
    let n = nodes.len();
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();

    let mut child_idx: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut parent_idx: Vec<Vec<usize>> = vec![Vec::new(); n];
    for edge in edges {
        let (Some(&from), Some(&to)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str()))
        else {
            continue;
        };
        if !child_idx[from].contains(&to) {
            child_idx[from].push(to);
            parent_idx[to].push(from);
        }
    }

    let min_depth: Vec<usize> = nodes
        .iter()
        .map(|node| node.dashed.as_ref().map(|info| info.min_depth).unwrap_or(0))
        .collect();

    let mut roots: Vec<usize> = (0..n).filter(|idx| parent_idx[*idx].is_empty()).collect();
    if roots.is_empty() && n > 0 {
        tracing::debug!(first = %nodes[0].id, "no root found, treating first node as root");
        roots.push(0);
    }

    let mut level: Vec<Option<usize>> = vec![None; n];
    let cap = (n * n).max(1);
    let mut dequeued = 0usize;
    let mut capped = false;
    let mut seeds = roots.clone();
    let mut queue = VecDeque::new();

    loop {
        for &seed in &seeds {
            if level[seed].is_none() {
                level[seed] = Some(min_depth[seed]);
                queue.push_back(seed);
            }
        }
        while let Some(current) = queue.pop_front() {
            dequeued += 1;
            if dequeued > cap {
                capped = true;
                break;
            }
            let Some(current_level) = level[current] else {
                continue;
            };
            for &child in &child_idx[current] {
                let candidate = (current_level + 1).max(min_depth[child]);
                let update = match (level[child], policy) {
                    (None, _) => true,
                    (Some(existing), LevelPolicy::Deepest) => candidate > existing,
                    (Some(existing), LevelPolicy::Shallowest) => candidate < existing,
                };
                if update {
                    level[child] = Some(candidate);
                    queue.push_back(child);
                }
            }
        }
        if capped {
            tracing::warn!(nodes = n, cap, "level propagation hit its iteration cap");
            break;
        }
        // A component with no strict root: start again from its first node.
        match (0..n).find(|idx| level[*idx].is_none()) {
            Some(next) => {
                roots.push(next);
                seeds = vec![next];
            }
            None => break,
        }
    }

    let raw: Vec<usize> = (0..n)
        .map(|idx| level[idx].unwrap_or(min_depth[idx]))
        .collect();
    // Drop empty levels by renumbering the occupied ones densely.
    let occupied: BTreeSet<usize> = raw.iter().copied().collect();
    let dense: HashMap<usize, usize> = occupied
        .iter()
        .enumerate()
        .map(|(dense, value)| (*value, dense))
        .collect();

    let mut levels: Vec<Vec<String>> = vec![Vec::new(); occupied.len()];
    let mut depth = HashMap::with_capacity(n);
    for (idx, node) in nodes.iter().enumerate() {
        let d = dense.get(&raw[idx]).copied().unwrap_or(0);
        levels[d].push(node.id.clone());
        depth.insert(node.id.clone(), d);
    }

    let mut children = BTreeMap::new();
    let mut parents = BTreeMap::new();
    for (idx, node) in nodes.iter().enumerate() {
        if !child_idx[idx].is_empty() {
            children.insert(
                node.id.clone(),
                child_idx[idx].iter().map(|c| nodes[*c].id.clone()).collect(),
            );
        }
        if !parent_idx[idx].is_empty() {
            parents.insert(
                node.id.clone(),
                parent_idx[idx].iter().map(|p| nodes[*p].id.clone()).collect(),
            );
        }
    }

    Structure {
        roots: roots.iter().map(|idx| nodes[*idx].id.clone()).collect(),
        levels,
        children,
        parents,
        depth,
        propagation_capped: capped,
    }
}
