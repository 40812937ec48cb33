//! The layout pipeline.
//!
//! `compute_layout` is the second phase of the two-phase contract: it takes
//! sizes measured in phase one and produces positions, routes, label boxes
//! and per-level metadata in one stateless pass. Internally everything is
//! computed with depth along x; vertical graphs are transposed at the end.

mod collision;
pub mod crossings;
pub mod cycles;
mod label_placement;
mod orient;
pub mod path;
mod placement;
mod routing;
pub mod structure;
pub(crate) mod types;

pub use crossings::detect_crossings;
pub use cycles::{EdgePartition, detect_back_edges, synthesize_ghosts};
pub use path::{insert_jumps, render_path, round_corners};
pub use structure::{Structure, analyze_structure};
pub use types::*;

use std::collections::HashMap;

use crate::config::LayoutConfig;
use crate::ir::{Edge, Graph, Node, Orientation};
use crate::measure::{Measurements, Size};

use collision::{CollisionContext, resolve_collisions};
use label_placement::predict_label_positions;
use placement::{Placement, place_nodes};
use routing::{RoutingContext, route_edges};

pub fn compute_layout(graph: &Graph, measurements: &Measurements, config: &LayoutConfig) -> LayoutResult {
    let vertical = graph.orientation == Orientation::Vertical;
    let frame = |size: Size| if vertical { size.transposed() } else { size };

    let mut nodes: Vec<Node> = Vec::with_capacity(graph.nodes.len());
    let mut sizes: HashMap<String, Size> = HashMap::with_capacity(graph.nodes.len());
    for node in &graph.nodes {
        match measurements.node_size(&node.id) {
            Some(size) => {
                sizes.insert(node.id.clone(), frame(size));
                nodes.push(node.clone());
            }
            None => tracing::debug!(node = %node.id, "node has no measured size, excluded"),
        }
    }

    let mut skipped_edges = 0usize;
    let edges: Vec<Edge> = graph
        .edges
        .iter()
        .filter(|edge| {
            let visible = sizes.contains_key(&edge.from) && sizes.contains_key(&edge.to);
            if !visible {
                skipped_edges += 1;
                tracing::warn!(from = %edge.from, to = %edge.to, "edge endpoint missing, edge skipped");
            }
            visible
        })
        .cloned()
        .collect();

    let partition = detect_back_edges(&nodes, &edges);
    let back_edges: Vec<BackEdge> = partition
        .back
        .iter()
        .map(|idx| BackEdge {
            from: edges[*idx].from.clone(),
            to: edges[*idx].to.clone(),
        })
        .collect();
    let mut laid_edges: Vec<Edge> = partition.regular.iter().map(|idx| edges[*idx].clone()).collect();

    let mut structure = analyze_structure(&nodes, &laid_edges, config.level_policy);
    let mut propagation_capped = structure.propagation_capped;
    if config.ghost_back_edges && !partition.back.is_empty() {
        let (ghosts, dashed) = synthesize_ghosts(&nodes, &edges, &partition.back, &structure.depth);
        for ghost in &ghosts {
            if let Some(size) = sizes.get(ghost.size_key()).copied() {
                sizes.insert(ghost.id.clone(), size);
            }
        }
        nodes.extend(ghosts);
        laid_edges.extend(dashed);
        structure = analyze_structure(&nodes, &laid_edges, config.level_policy);
        propagation_capped |= structure.propagation_capped;
    }
    tracing::debug!(
        nodes = nodes.len(),
        edges = laid_edges.len(),
        back_edges = back_edges.len(),
        levels = structure.levels.len(),
        "layered graph"
    );

    let label_sizes: Vec<Option<Size>> = laid_edges
        .iter()
        .map(|edge| {
            edge.label
                .as_deref()
                .filter(|_| edge.has_label())
                .and_then(|text| measurements.label_size(text))
                .map(frame)
        })
        .collect();

    let Placement {
        nodes: mut placed,
        levels,
        metadata,
    } = place_nodes(&nodes, &structure, &laid_edges, &sizes, &label_sizes, config);

    let collisions = resolve_collisions(
        &mut placed,
        &CollisionContext {
            levels: &levels,
            edges: &laid_edges,
            label_sizes: &label_sizes,
            metadata: &metadata,
            config,
        },
    );

    let label_positions = predict_label_positions(&laid_edges, &label_sizes, &placed, config.label_gap);
    let mut edge_routes = route_edges(&RoutingContext {
        nodes: &placed,
        edges: &laid_edges,
        structure: &structure,
        metadata: &metadata,
        labels: &label_positions,
        config,
    });

    let crossings = detect_crossings(&edge_routes, config.crossing_epsilon, config.jump_radius * 2.0);
    for (route, found) in edge_routes.iter_mut().zip(crossings) {
        route.path = render_path(&route.segments, &found, config.jump_radius, config.corner_radius);
        route.crossings = found;
    }

    let mut result = LayoutResult {
        orientation: Orientation::Horizontal,
        nodes: placed,
        edge_routes,
        label_positions,
        metadata,
        back_edges,
        width: 0.0,
        height: 0.0,
        diagnostics: LayoutDiagnostics {
            collisions,
            propagation_capped,
            skipped_edges,
        },
    };
    normalize_layout(&mut result, config.padding);
    if vertical {
        orient::transpose(&mut result);
    }
    result
}

/// Moves the drawing so its top-left content corner sits at `padding`, and
/// sizes the canvas to the content plus `padding` on every side.
fn normalize_layout(result: &mut LayoutResult, padding: f32) {
    let Some((min_x, min_y, max_x, max_y)) = content_bounds(result) else {
        result.width = padding * 2.0;
        result.height = padding * 2.0;
        return;
    };
    orient::translate(result, padding - min_x, padding - min_y);
    result.width = max_x - min_x + padding * 2.0;
    result.height = max_y - min_y + padding * 2.0;
}

fn content_bounds(result: &LayoutResult) -> Option<(f32, f32, f32, f32)> {
    let mut bounds: Option<(f32, f32, f32, f32)> = None;
    let mut include = |x0: f32, y0: f32, x1: f32, y1: f32| {
        bounds = Some(match bounds {
            None => (x0, y0, x1, y1),
            Some((a, b, c, d)) => (a.min(x0), b.min(y0), c.max(x1), d.max(y1)),
        });
    };
    for node in result.nodes.values() {
        include(node.x, node.y, node.x + node.width, node.y + node.height);
    }
    for label in &result.label_positions {
        include(label.x, label.y, label.x + label.width, label.y + label.height);
    }
    // Routing can place waypoints outside node bounds; jump arcs bulge past their row.
    for route in &result.edge_routes {
        for command in &route.path.commands {
            let to = command.end();
            match *command {
                PathCommand::ArcTo { radius, .. } => include(to.x, to.y - radius, to.x, to.y + radius),
                PathCommand::QuadTo { ctrl, .. } => {
                    include(to.x, to.y, to.x, to.y);
                    include(ctrl.x, ctrl.y, ctrl.x, ctrl.y);
                }
                _ => include(to.x, to.y, to.x, to.y),
            }
        }
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(ids: &[&str], pairs: &[(&str, &str)]) -> Graph {
        let mut graph = Graph::new();
        for id in ids {
            graph.ensure_node(id, None);
        }
        for (from, to) in pairs {
            graph.add_edge(Edge::new(from, to));
        }
        graph
    }

    fn sized(graph: &Graph) -> Measurements {
        let mut measurements = Measurements::new();
        for node in &graph.nodes {
            measurements.insert_node_size(&node.id, Size::new(80.0, 40.0));
        }
        measurements
    }

    #[test]
    fn empty_graph_is_just_padding() {
        let config = LayoutConfig::default();
        let result = compute_layout(&Graph::new(), &Measurements::new(), &config);
        assert!(result.nodes.is_empty());
        assert_eq!(result.width, config.padding * 2.0);
    }

    #[test]
    fn content_starts_at_padding() {
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("A", "C")]);
        let config = LayoutConfig::default();
        let result = compute_layout(&g, &sized(&g), &config);
        let min_x = result.nodes.values().map(|n| n.x).fold(f32::INFINITY, f32::min);
        let min_y = result.nodes.values().map(|n| n.y).fold(f32::INFINITY, f32::min);
        assert_eq!(min_x, config.padding);
        assert!(min_y >= config.padding - GEOM_EPS);
        for node in result.nodes.values() {
            assert!(node.x + node.width <= result.width - config.padding + GEOM_EPS);
            assert!(node.y + node.height <= result.height - config.padding + GEOM_EPS);
        }
    }

    #[test]
    fn unmeasured_nodes_and_their_edges_are_skipped() {
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("B", "C")]);
        let mut measurements = Measurements::new();
        measurements.insert_node_size("A", Size::new(80.0, 40.0));
        measurements.insert_node_size("B", Size::new(80.0, 40.0));
        let result = compute_layout(&g, &measurements, &LayoutConfig::default());
        assert_eq!(result.nodes.len(), 2);
        assert_eq!(result.edge_routes.len(), 1);
        assert_eq!(result.diagnostics.skipped_edges, 1);
    }

    #[test]
    fn cycle_produces_a_ghost_and_a_dashed_route() {
        let g = graph(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("C", "A")]);
        let result = compute_layout(&g, &sized(&g), &LayoutConfig::default());
        assert_eq!(
            result.back_edges,
            vec![BackEdge {
                from: "C".to_string(),
                to: "A".to_string()
            }]
        );
        let ghost = result.nodes.get("A~ghost0").expect("ghost placed");
        assert_eq!(ghost.depth, 3);
        let dashed: Vec<&EdgeRoute> = result.edge_routes.iter().filter(|r| r.is_dashed).collect();
        assert_eq!(dashed.len(), 1);
        assert_eq!(dashed[0].to, "A~ghost0");
    }

    #[test]
    fn ghosts_can_be_turned_off() {
        let g = graph(&["A", "B"], &[("A", "B"), ("B", "A")]);
        let config = LayoutConfig {
            ghost_back_edges: false,
            ..LayoutConfig::default()
        };
        let result = compute_layout(&g, &sized(&g), &config);
        assert_eq!(result.back_edges.len(), 1);
        assert_eq!(result.nodes.len(), 2);
        assert_eq!(result.edge_routes.len(), 1);
    }

    #[test]
    fn vertical_layout_runs_depth_down_the_page() {
        let mut g = graph(&["A", "B"], &[("A", "B")]);
        g.orientation = Orientation::Vertical;
        let result = compute_layout(&g, &sized(&g), &LayoutConfig::default());
        let a = &result.nodes["A"];
        let b = &result.nodes["B"];
        assert_eq!(a.x, b.x);
        assert!(b.y > a.y + a.height);
        assert_eq!((a.width, a.height), (80.0, 40.0));
        let route = &result.edge_routes[0];
        assert_eq!(route.arrow_point.y, b.y);
        assert_eq!(result.orientation, Orientation::Vertical);
    }
}
