// Node placement. Depth picks the primary-axis offset shared by a whole
// level; the secondary axis stacks each node beside its best parent while
// keeping clear of the level-mates already placed.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use super::label_placement::incoming_label_stacks;
use super::structure::Structure;
use super::types::{LayoutMetadata, PlacedNode};
use crate::config::LayoutConfig;
use crate::ir::{Edge, Node};
use crate::measure::Size;

#[derive(Debug, Clone, Default)]
pub struct Placement {
    pub nodes: BTreeMap<String, PlacedNode>,
    /// Levels in final stacking order.
    pub levels: Vec<Vec<String>>,
    pub metadata: LayoutMetadata,
}

/// Gap a node needs below the previous level-mate: the base spacing plus
/// room for the labels stacked above it.
pub(crate) fn required_spacing(id: &str, label_stacks: &HashMap<String, f32>, config: &LayoutConfig) -> f32 {
    config.node_spacing + label_stacks.get(id).copied().unwrap_or(0.0)
}

pub fn place_nodes(
    nodes: &[Node],
    structure: &Structure,
    edges: &[Edge],
    sizes: &HashMap<String, Size>,
    label_sizes: &[Option<Size>],
    config: &LayoutConfig,
) -> Placement {
    let metadata = level_geometry(structure, edges, sizes, config);
    let label_stacks = incoming_label_stacks(edges, label_sizes, config.label_gap);
    let input_order: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect();
    let by_id: HashMap<&str, &Node> = nodes.iter().map(|node| (node.id.as_str(), node)).collect();

    let mut placed: BTreeMap<String, PlacedNode> = BTreeMap::new();
    let mut levels = Vec::with_capacity(structure.levels.len());

    for (depth, level) in structure.levels.iter().enumerate() {
        let ordered = order_level(level, structure, &placed, &input_order);
        let x = metadata.level_offsets.get(depth).copied().unwrap_or(0.0);
        let mut level_bottom: Option<f32> = None;

        for id in &ordered {
            let Some(node) = by_id.get(id.as_str()) else {
                continue;
            };
            let size = sizes.get(id).copied().unwrap_or_default();
            let floor = match level_bottom {
                Some(bottom) => bottom + required_spacing(id, &label_stacks, config),
                None => 0.0,
            };
            // The floor already sits below every level-mate placed so far, so
            // each parent only contributes its own edge.
            let best_parent = structure
                .parents_of(id)
                .iter()
                .filter_map(|parent| placed.get(parent))
                .map(|parent| parent_anchor(parent, size, config).max(floor))
                .min_by(f32::total_cmp);
            let y = best_parent.unwrap_or(floor);
            tracing::trace!(node = %id, depth, x, y, "placed node");

            level_bottom = Some(y + size.height);
            placed.insert(
                id.clone(),
                PlacedNode {
                    id: id.clone(),
                    label: node.label.clone(),
                    depth,
                    x,
                    y,
                    width: size.width,
                    height: size.height,
                    classes: node.classes.clone(),
                    dashed: node.dashed.clone(),
                },
            );
        }
        levels.push(ordered);
    }

    tracing::debug!(nodes = placed.len(), levels = levels.len(), "placed nodes");
    Placement {
        nodes: placed,
        levels,
        metadata,
    }
}

fn parent_anchor(parent: &PlacedNode, size: Size, config: &LayoutConfig) -> f32 {
    if config.center_on_parent {
        parent.rect().center_y() - size.height / 2.0
    } else {
        parent.y
    }
}

/// Groups siblings: the key is the best placed parent's position, then the
/// node's slot among that parent's children, then declaration order.
fn order_level(
    level: &[String],
    structure: &Structure,
    placed: &BTreeMap<String, PlacedNode>,
    input_order: &HashMap<&str, usize>,
) -> Vec<String> {
    let mut keyed: Vec<(f32, usize, usize, &String)> = level
        .iter()
        .map(|id| {
            let parent = structure
                .parents_of(id)
                .iter()
                .filter_map(|parent| placed.get(parent))
                .min_by(|a, b| a.y.total_cmp(&b.y));
            let (parent_y, slot) = match parent {
                Some(parent) => {
                    let slot = structure
                        .children_of(&parent.id)
                        .iter()
                        .position(|child| child == id)
                        .unwrap_or(usize::MAX);
                    (parent.y, slot)
                }
                None => (f32::INFINITY, usize::MAX),
            };
            let order = input_order.get(id.as_str()).copied().unwrap_or(usize::MAX);
            (parent_y, slot, order, id)
        })
        .collect();
    keyed.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then(a.1.cmp(&b.1))
            .then(a.2.cmp(&b.2))
            .then_with(|| a.3.cmp(b.3))
    });
    keyed.into_iter().map(|(_, _, _, id)| id.clone()).collect()
}

/// Primary-axis offset and extent of every level.
///
/// The gap after level `k` is `edge_clearance` plus a spacing that grows with
/// the number of edges passing between `k` and `k + 1`, clamped to
/// `[min_level_spacing, max_level_spacing]`.
pub(crate) fn level_geometry(
    structure: &Structure,
    edges: &[Edge],
    sizes: &HashMap<String, Size>,
    config: &LayoutConfig,
) -> LayoutMetadata {
    let level_sizes: Vec<f32> = structure
        .levels
        .iter()
        .map(|level| {
            level
                .iter()
                .filter_map(|id| sizes.get(id))
                .map(|size| size.width)
                .fold(0.0, f32::max)
        })
        .collect();

    let mut passing = vec![0usize; level_sizes.len()];
    for edge in edges {
        let (Some(a), Some(b)) = (structure.depth_of(&edge.from), structure.depth_of(&edge.to)) else {
            continue;
        };
        let (lo, hi) = match a.cmp(&b) {
            Ordering::Less => (a, b),
            Ordering::Greater => (b, a),
            Ordering::Equal => continue,
        };
        // `passing[k]` counts edges crossing the gap in front of level `k`.
        for slot in passing.iter_mut().take(hi + 1).skip(lo + 1) {
            *slot += 1;
        }
    }

    let min_spacing = config.min_level_spacing.min(config.max_level_spacing);
    let mut level_offsets = Vec::with_capacity(level_sizes.len());
    let mut cursor = 0.0f32;
    for depth in 0..level_sizes.len() {
        if depth > 0 {
            let dynamic = config.min_level_spacing + passing[depth] as f32 * config.level_spacing_per_edge;
            let spacing = dynamic.clamp(min_spacing, config.max_level_spacing);
            cursor += level_sizes[depth - 1] + config.edge_clearance + spacing;
        }
        level_offsets.push(cursor);
    }

    LayoutMetadata {
        level_offsets,
        level_sizes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LevelPolicy;
    use crate::layout::structure::analyze_structure;

    fn build(
        ids: &[&str],
        pairs: &[(&str, &str)],
    ) -> (Vec<Node>, Vec<Edge>, Structure, HashMap<String, Size>) {
        let nodes: Vec<Node> = ids.iter().map(|id| Node::new(id, id)).collect();
        let edges: Vec<Edge> = pairs.iter().map(|(a, b)| Edge::new(a, b)).collect();
        let structure = analyze_structure(&nodes, &edges, LevelPolicy::Deepest);
        let sizes = ids
            .iter()
            .map(|id| (id.to_string(), Size::new(60.0, 30.0)))
            .collect();
        (nodes, edges, structure, sizes)
    }

    #[test]
    fn single_chain_stays_on_one_line() {
        let (nodes, edges, structure, sizes) = build(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        let config = LayoutConfig::default();
        let placement = place_nodes(&nodes, &structure, &edges, &sizes, &[None, None], &config);
        let ys: Vec<f32> = ["A", "B", "C"].iter().map(|id| placement.nodes[*id].y).collect();
        assert_eq!(ys, vec![0.0, 0.0, 0.0]);
        let xs: Vec<f32> = ["A", "B", "C"].iter().map(|id| placement.nodes[*id].x).collect();
        assert!(xs[0] < xs[1] && xs[1] < xs[2]);
    }

    #[test]
    fn child_aligns_with_parent_top_unless_centering() {
        let nodes: Vec<Node> = ["P", "C"].iter().map(|id| Node::new(id, id)).collect();
        let edges = vec![Edge::new("P", "C")];
        let structure = analyze_structure(&nodes, &edges, LevelPolicy::Deepest);
        let sizes: HashMap<String, Size> = [
            ("P".to_string(), Size::new(80.0, 100.0)),
            ("C".to_string(), Size::new(80.0, 30.0)),
        ]
        .into_iter()
        .collect();

        let config = LayoutConfig::default();
        let aligned = place_nodes(&nodes, &structure, &edges, &sizes, &[None], &config);
        assert_eq!(aligned.nodes["C"].y, aligned.nodes["P"].y);

        let centered_config = LayoutConfig {
            center_on_parent: true,
            ..LayoutConfig::default()
        };
        let centered = place_nodes(&nodes, &structure, &edges, &sizes, &[None], &centered_config);
        assert_eq!(centered.nodes["C"].y, 35.0);
    }

    #[test]
    fn siblings_stack_with_base_spacing() {
        let (nodes, edges, structure, sizes) =
            build(&["R", "A", "B", "C"], &[("R", "A"), ("R", "B"), ("R", "C")]);
        let config = LayoutConfig::default();
        let placement = place_nodes(&nodes, &structure, &edges, &sizes, &[None; 3], &config);
        let a = &placement.nodes["A"];
        let b = &placement.nodes["B"];
        let c = &placement.nodes["C"];
        assert_eq!(placement.levels[1], vec!["A", "B", "C"]);
        assert_eq!(b.y, a.y + 30.0 + config.node_spacing);
        assert_eq!(c.y, b.y + 30.0 + config.node_spacing);
        assert_eq!(a.x, b.x);
    }

    #[test]
    fn labels_inflate_spacing_above_their_target() {
        let nodes: Vec<Node> = ["R", "A", "B"].iter().map(|id| Node::new(id, id)).collect();
        let edges = vec![Edge::new("R", "A"), Edge::labeled("R", "B", "yes")];
        let structure = analyze_structure(&nodes, &edges, LevelPolicy::Deepest);
        let sizes: HashMap<String, Size> = ["R", "A", "B"]
            .iter()
            .map(|id| (id.to_string(), Size::new(60.0, 30.0)))
            .collect();
        let config = LayoutConfig::default();
        let labels = vec![None, Some(Size::new(24.0, 12.0))];
        let placement = place_nodes(&nodes, &structure, &edges, &sizes, &labels, &config);
        let gap = placement.nodes["B"].y - (placement.nodes["A"].y + 30.0);
        assert_eq!(gap, config.node_spacing + 12.0 + config.label_gap);
    }

    #[test]
    fn children_follow_their_parents_order() {
        let (nodes, edges, structure, sizes) = build(
            &["R", "P", "Q", "q1", "p1"],
            &[("R", "P"), ("R", "Q"), ("Q", "q1"), ("P", "p1")],
        );
        let config = LayoutConfig::default();
        let placement = place_nodes(&nodes, &structure, &edges, &sizes, &[None; 4], &config);
        assert_eq!(placement.levels[2], vec!["p1", "q1"]);
        assert!(placement.nodes["p1"].y < placement.nodes["q1"].y);
    }

    #[test]
    fn level_spacing_grows_with_passing_edges_and_is_clamped() {
        let (_, _, structure, sizes) = build(&["R", "A", "B"], &[("R", "A"), ("R", "B")]);
        let mut config = LayoutConfig::default();
        let few = vec![Edge::new("R", "A")];
        let many: Vec<Edge> = (0..100).map(|_| Edge::new("R", "B")).collect();

        let a = level_geometry(&structure, &few, &sizes, &config);
        assert_eq!(
            a.level_offsets[1],
            60.0 + config.edge_clearance + config.min_level_spacing + config.level_spacing_per_edge
        );
        let b = level_geometry(&structure, &many, &sizes, &config);
        assert_eq!(b.level_offsets[1], 60.0 + config.edge_clearance + config.max_level_spacing);

        config.level_spacing_per_edge = 0.0;
        let c = level_geometry(&structure, &many, &sizes, &config);
        assert_eq!(c.level_offsets[1], 60.0 + config.edge_clearance + config.min_level_spacing);
        assert_eq!(c.level_sizes, vec![60.0, 60.0]);
    }
}
