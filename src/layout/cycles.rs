//! Cycle breaking.
//!
//! An edge `u -> v` is a back edge when `v` can still reach `u` once the edge
//! itself is ignored. Back edges are taken out of the layering graph; the
//! pipeline draws each one as a dashed edge into a ghost copy of its target.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::ir::{DashedInfo, Edge, Node};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgePartition {
    /// Indices of edges kept in the layering graph, in declaration order.
    pub regular: Vec<usize>,
    /// Indices of back edges, in declaration order.
    pub back: Vec<usize>,
}

/// Splits `edges` into regular and back edges.
///
/// Edges are tested one at a time against the edges still considered
/// regular. Retreating edges (target discovered no later than source in a
/// depth-first walk from the roots) are tested first, so in a plain loop the
/// edge returning to the entry node is the one that gets cut.
pub fn detect_back_edges(nodes: &[Node], edges: &[Edge]) -> EdgePartition {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();
    let endpoints: Vec<Option<(usize, usize)>> = edges
        .iter()
        .map(|edge| Some((*index.get(edge.from.as_str())?, *index.get(edge.to.as_str())?)))
        .collect();

    let mut outgoing: Vec<Vec<(usize, usize)>> = vec![Vec::new(); nodes.len()];
    for (edge_idx, ends) in endpoints.iter().enumerate() {
        if let Some((from, to)) = *ends {
            outgoing[from].push((edge_idx, to));
        }
    }

    let preorder = dfs_preorder(nodes.len(), &outgoing);
    let mut order: Vec<usize> = (0..edges.len())
        .filter(|idx| endpoints[*idx].is_some())
        .collect();
    order.sort_by_key(|idx| {
        let (from, to) = endpoints[*idx].unwrap_or_default();
        (preorder[to] > preorder[from], *idx)
    });

    let mut active = vec![true; edges.len()];
    let mut back = Vec::new();
    for edge_idx in order {
        let Some((from, to)) = endpoints[edge_idx] else {
            continue;
        };
        if from == to || reaches(to, from, edge_idx, &outgoing, &active) {
            active[edge_idx] = false;
            back.push(edge_idx);
            tracing::trace!(
                from = %edges[edge_idx].from,
                to = %edges[edge_idx].to,
                "back edge"
            );
        }
    }
    back.sort_unstable();

    let regular = (0..edges.len())
        .filter(|idx| active[*idx] && endpoints[*idx].is_some())
        .collect();
    EdgePartition { regular, back }
}

fn dfs_preorder(node_count: usize, outgoing: &[Vec<(usize, usize)>]) -> Vec<usize> {
    let mut indegree = vec![0usize; node_count];
    for targets in outgoing {
        for &(_, to) in targets {
            indegree[to] += 1;
        }
    }
    let starts = (0..node_count)
        .filter(|idx| indegree[*idx] == 0)
        .chain(0..node_count);

    let mut preorder = vec![usize::MAX; node_count];
    let mut counter = 0usize;
    for start in starts {
        if preorder[start] != usize::MAX {
            continue;
        }
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if preorder[node] != usize::MAX {
                continue;
            }
            preorder[node] = counter;
            counter += 1;
            for &(_, child) in outgoing[node].iter().rev() {
                if preorder[child] == usize::MAX {
                    stack.push(child);
                }
            }
        }
    }
    preorder
}

/// Breadth-first reachability from `start` to `goal` over active edges,
/// ignoring edge `skip`.
fn reaches(
    start: usize,
    goal: usize,
    skip: usize,
    outgoing: &[Vec<(usize, usize)>],
    active: &[bool],
) -> bool {
    let mut seen = vec![false; outgoing.len()];
    let mut queue = VecDeque::from([start]);
    seen[start] = true;
    while let Some(node) = queue.pop_front() {
        if node == goal {
            return true;
        }
        for &(edge_idx, next) in &outgoing[node] {
            if edge_idx == skip || !active[edge_idx] || seen[next] {
                continue;
            }
            seen[next] = true;
            queue.push_back(next);
        }
    }
    false
}

/// Builds one ghost node and one dashed edge per back edge.
///
/// `depths` holds the layering of the regular graph; a ghost never sits
/// shallower than one level below the back edge's source.
pub fn synthesize_ghosts(
    nodes: &[Node],
    edges: &[Edge],
    back: &[usize],
    depths: &HashMap<String, usize>,
) -> (Vec<Node>, Vec<Edge>) {
    let mut taken: HashSet<String> = nodes.iter().map(|node| node.id.clone()).collect();
    let mut per_target: HashMap<&str, usize> = HashMap::new();
    let mut ghosts = Vec::with_capacity(back.len());
    let mut dashed = Vec::with_capacity(back.len());

    for &edge_idx in back {
        let Some(edge) = edges.get(edge_idx) else {
            continue;
        };
        let Some(original) = nodes.iter().find(|node| node.id == edge.to) else {
            continue;
        };
        let counter = per_target.entry(edge.to.as_str()).or_insert(0);
        let mut id = format!("{}~ghost{}", edge.to, counter);
        while taken.contains(&id) {
            *counter += 1;
            id = format!("{}~ghost{}", edge.to, counter);
        }
        *counter += 1;
        taken.insert(id.clone());

        let min_depth = depths.get(&edge.from).copied().unwrap_or(0) + 1;
        ghosts.push(Node {
            id: id.clone(),
            label: original.label.clone(),
            classes: original.classes.clone(),
            dashed: Some(DashedInfo {
                original_id: original.id.clone(),
                min_depth,
            }),
        });
        dashed.push(Edge {
            from: edge.from.clone(),
            to: id,
            label: edge.label.clone(),
            is_dashed: true,
            original_to: Some(edge.to.clone()),
        });
    }
    (ghosts, dashed)
}
