// Post-placement collision passes. Each pass repeats until nothing moves or
// `collision_max_iterations` is reached. Nodes only ever move down the
// secondary axis, and a moved node drags every later level-mate with it.

use std::collections::{BTreeMap, HashMap};

use super::label_placement::{incoming_label_stacks, predict_label_positions};
use super::placement::required_spacing;
use super::types::{CollisionReport, GEOM_EPS, LayoutMetadata, PassReport, PlacedNode};
use crate::config::LayoutConfig;
use crate::ir::Edge;
use crate::measure::Size;

/// Edges spanning more levels than this are left to the router.
const GHOST_EDGE_MAX_SPAN: usize = 2;

pub(crate) struct CollisionContext<'a> {
    pub levels: &'a [Vec<String>],
    pub edges: &'a [Edge],
    pub label_sizes: &'a [Option<Size>],
    pub metadata: &'a LayoutMetadata,
    pub config: &'a LayoutConfig,
}

pub(crate) fn resolve_collisions(
    nodes: &mut BTreeMap<String, PlacedNode>,
    ctx: &CollisionContext<'_>,
) -> CollisionReport {
    let cap = ctx.config.collision_max_iterations;
    let label_stacks = incoming_label_stacks(ctx.edges, ctx.label_sizes, ctx.config.label_gap);

    let ghost_vs_edge = run_pass(cap, || ghost_edge_pass(nodes, ctx));
    let sibling = run_pass(cap, || sibling_pass(nodes, ctx, &label_stacks));
    let node_vs_label = run_pass(cap, || node_label_pass(nodes, ctx));

    let report = CollisionReport {
        ghost_vs_edge,
        sibling,
        node_vs_label,
    };
    for (pass, result) in [
        ("ghost-vs-edge", ghost_vs_edge),
        ("sibling", sibling),
        ("node-vs-label", node_vs_label),
    ] {
        if !result.converged {
            tracing::warn!(pass, iterations = result.iterations, "collision pass stopped at its cap");
        }
    }
    tracing::debug!(?report, "resolved collisions");
    report
}

fn run_pass(cap: usize, mut step: impl FnMut() -> bool) -> PassReport {
    let mut report = PassReport::default();
    while report.iterations < cap {
        report.iterations += 1;
        if !step() {
            report.converged = true;
            break;
        }
    }
    report
}

/// Moves `id` down to `new_y` and shifts every level-mate stacked after it
/// by the same amount. Returns whether anything moved.
fn push_down(
    nodes: &mut BTreeMap<String, PlacedNode>,
    levels: &[Vec<String>],
    id: &str,
    new_y: f32,
) -> bool {
    let Some((old_y, depth)) = nodes.get(id).map(|node| (node.y, node.depth)) else {
        return false;
    };
    let delta = new_y - old_y;
    if delta <= GEOM_EPS {
        return false;
    }
    let stacked = stacking_order(nodes, levels.get(depth).map(Vec::as_slice).unwrap_or(&[]));
    let Some(start) = stacked.iter().position(|member| member == id) else {
        return false;
    };
    for member in &stacked[start..] {
        if let Some(node) = nodes.get_mut(member) {
            node.y += delta;
        }
    }
    tracing::trace!(node = id, delta, "pushed node down");
    true
}

/// Level members sorted by current position; ties keep level order.
fn stacking_order(nodes: &BTreeMap<String, PlacedNode>, level: &[String]) -> Vec<String> {
    let mut members: Vec<(f32, &String)> = level
        .iter()
        .filter_map(|id| nodes.get(id).map(|node| (node.y, id)))
        .collect();
    members.sort_by(|a, b| a.0.total_cmp(&b.0));
    members.into_iter().map(|(_, id)| id.clone()).collect()
}

/// Rough lane of a source before routing: halfway into the next level gap.
fn estimated_lane(source: &PlacedNode, metadata: &LayoutMetadata, config: &LayoutConfig) -> f32 {
    let right = source.rect().right();
    let next = metadata
        .level_offsets
        .get(source.depth + 1)
        .copied()
        .unwrap_or(right + config.lane_min_offset * 2.0);
    (right + next) / 2.0
}

fn ghost_edge_pass(nodes: &mut BTreeMap<String, PlacedNode>, ctx: &CollisionContext<'_>) -> bool {
    let ghosts: Vec<String> = nodes
        .values()
        .filter(|node| node.is_ghost())
        .map(|node| node.id.clone())
        .collect();
    let mut changed = false;

    for ghost_id in &ghosts {
        for edge in ctx.edges.iter().filter(|edge| !edge.is_dashed) {
            if edge.from == *ghost_id || edge.to == *ghost_id {
                continue;
            }
            let (Some(source), Some(target), Some(ghost)) =
                (nodes.get(&edge.from), nodes.get(&edge.to), nodes.get(ghost_id))
            else {
                continue;
            };
            if target.depth <= source.depth || target.depth - source.depth > GHOST_EDGE_MAX_SPAN {
                continue;
            }
            let lane = estimated_lane(source, ctx.metadata, ctx.config);
            let source_y = source.rect().center_y();
            let target_y = target.rect().center_y();
            let (top, bottom) = (source_y.min(target_y), source_y.max(target_y));

            let rect = ghost.rect();
            let on_lane = rect.crossed_by_vertical(lane, top, bottom);
            let on_approach = rect.crossed_by_horizontal(target_y, lane, target.x);
            if on_lane || on_approach {
                let new_y = bottom + ctx.config.node_spacing;
                changed |= push_down(nodes, ctx.levels, ghost_id, new_y);
            }
        }
    }
    changed
}

fn sibling_pass(
    nodes: &mut BTreeMap<String, PlacedNode>,
    ctx: &CollisionContext<'_>,
    label_stacks: &HashMap<String, f32>,
) -> bool {
    let mut changed = false;
    for level in ctx.levels {
        let stacked = stacking_order(nodes, level);
        for pair in stacked.windows(2) {
            let (Some(prev), Some(next)) = (nodes.get(&pair[0]), nodes.get(&pair[1])) else {
                continue;
            };
            let required = prev.rect().bottom() + required_spacing(&next.id, label_stacks, ctx.config);
            if next.y < required - GEOM_EPS {
                changed |= push_down(nodes, ctx.levels, &pair[1], required);
            }
        }
    }
    changed
}

fn node_label_pass(nodes: &mut BTreeMap<String, PlacedNode>, ctx: &CollisionContext<'_>) -> bool {
    let labels = predict_label_positions(ctx.edges, ctx.label_sizes, nodes, ctx.config.label_gap);
    let mut changed = false;
    for level in ctx.levels {
        for id in level {
            let Some(node) = nodes.get(id) else {
                continue;
            };
            let rect = node.rect();
            let hit = labels
                .iter()
                .filter(|label| label.to != *id)
                .map(|label| label.rect())
                .filter(|label| rect.intersects(label))
                .map(|label| label.bottom())
                .fold(None, |acc: Option<f32>, bottom| Some(acc.map_or(bottom, |a| a.max(bottom))));
            if let Some(bottom) = hit {
                changed |= push_down(nodes, ctx.levels, id, bottom + ctx.config.node_spacing);
            }
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::DashedInfo;

    fn node(id: &str, depth: usize, x: f32, y: f32) -> PlacedNode {
        PlacedNode {
            id: id.to_string(),
            label: id.to_string(),
            depth,
            x,
            y,
            width: 60.0,
            height: 30.0,
            classes: Vec::new(),
            dashed: None,
        }
    }

    fn map(list: Vec<PlacedNode>) -> BTreeMap<String, PlacedNode> {
        list.into_iter().map(|node| (node.id.clone(), node)).collect()
    }

    fn levels(list: &[&[&str]]) -> Vec<Vec<String>> {
        list.iter()
            .map(|level| level.iter().map(|id| id.to_string()).collect())
            .collect()
    }

    fn metadata() -> LayoutMetadata {
        LayoutMetadata {
            level_offsets: vec![0.0, 150.0, 300.0],
            level_sizes: vec![60.0, 60.0, 60.0],
        }
    }

    #[test]
    fn overlapping_siblings_cascade_down() {
        let mut nodes = map(vec![node("A", 0, 0.0, 0.0), node("B", 0, 0.0, 10.0), node("C", 0, 0.0, 60.0)]);
        let lv = levels(&[&["A", "B", "C"]]);
        let config = LayoutConfig::default();
        let meta = metadata();
        let ctx = CollisionContext {
            levels: &lv,
            edges: &[],
            label_sizes: &[],
            metadata: &meta,
            config: &config,
        };
        let report = resolve_collisions(&mut nodes, &ctx);

        assert_eq!(nodes["B"].y, 50.0);
        assert_eq!(nodes["C"].y, 100.0);
        assert!(report.sibling.converged);
        assert_eq!(report.sibling.iterations, 2);
    }

    #[test]
    fn wide_label_pushes_node_in_next_level() {
        let mut nodes = map(vec![
            node("R", 0, 0.0, 100.0),
            node("T", 1, 150.0, 100.0),
            node("X", 2, 300.0, 70.0),
        ]);
        let lv = levels(&[&["R"], &["T"], &["X"]]);
        let edges = vec![Edge::labeled("R", "T", "a very wide label")];
        let label_sizes = vec![Some(Size::new(200.0, 12.0))];
        let config = LayoutConfig::default();
        let meta = metadata();
        let ctx = CollisionContext {
            levels: &lv,
            edges: &edges,
            label_sizes: &label_sizes,
            metadata: &meta,
            config: &config,
        };
        let report = resolve_collisions(&mut nodes, &ctx);

        let label_bottom = 100.0 - config.label_gap;
        assert_eq!(nodes["X"].y, label_bottom + config.node_spacing);
        assert_eq!(nodes["T"].y, 100.0, "the label's own target stays");
        assert!(report.node_vs_label.converged);
    }

    #[test]
    fn ghost_on_a_short_edge_lane_moves_below_it() {
        let mut ghost = node("A~ghost0", 0, 0.0, 40.0);
        ghost.width = 140.0;
        ghost.dashed = Some(DashedInfo {
            original_id: "A".to_string(),
            min_depth: 0,
        });
        let mut nodes = map(vec![node("S", 0, 0.0, 0.0), ghost, node("T", 1, 150.0, 80.0)]);
        let lv = levels(&[&["S", "A~ghost0"], &["T"]]);
        let edges = vec![Edge::new("S", "T")];
        let config = LayoutConfig::default();
        let meta = metadata();
        let ctx = CollisionContext {
            levels: &lv,
            edges: &edges,
            label_sizes: &[None],
            metadata: &meta,
            config: &config,
        };
        let report = resolve_collisions(&mut nodes, &ctx);

        let edge_bottom = 95.0;
        assert!(nodes["A~ghost0"].y >= edge_bottom + config.node_spacing);
        assert!(report.ghost_vs_edge.converged);
    }

    #[test]
    fn passes_stop_at_the_iteration_cap() {
        let mut nodes = map(vec![node("A", 0, 0.0, 0.0), node("B", 0, 0.0, 0.0)]);
        let lv = levels(&[&["A", "B"]]);
        let config = LayoutConfig {
            collision_max_iterations: 1,
            ..LayoutConfig::default()
        };
        let meta = metadata();
        let ctx = CollisionContext {
            levels: &lv,
            edges: &[],
            label_sizes: &[],
            metadata: &meta,
            config: &config,
        };
        let report = resolve_collisions(&mut nodes, &ctx);
        assert_eq!(report.sibling.iterations, 1);
        assert!(!report.sibling.converged);
        assert_eq!(nodes["A"].y, 0.0);
        assert_eq!(nodes["B"].y, 50.0);
    }
}
