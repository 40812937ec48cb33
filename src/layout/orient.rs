// Whole-result frame transforms. The pipeline always works with depth on x;
// vertical layouts are produced by mirroring the finished result across the
// main diagonal.

use super::types::{LayoutResult, PathCommand, Point};
use crate::ir::Orientation;

/// Shifts every coordinate of `result` by `(dx, dy)`.
pub(crate) fn translate(result: &mut LayoutResult, dx: f32, dy: f32) {
    let shift = |point: &mut Point| {
        point.x += dx;
        point.y += dy;
    };
    for node in result.nodes.values_mut() {
        node.x += dx;
        node.y += dy;
    }
    for route in &mut result.edge_routes {
        for segment in &mut route.segments {
            shift(&mut segment.start);
            shift(&mut segment.end);
        }
        shift(&mut route.arrow_point);
        for crossing in &mut route.crossings {
            shift(&mut crossing.point);
        }
        for command in &mut route.path.commands {
            match command {
                PathCommand::MoveTo { to } | PathCommand::LineTo { to } | PathCommand::ArcTo { to, .. } => {
                    shift(to)
                }
                PathCommand::QuadTo { ctrl, to } => {
                    shift(ctrl);
                    shift(to);
                }
            }
        }
    }
    for label in &mut result.label_positions {
        label.x += dx;
        label.y += dy;
    }
    for offset in &mut result.metadata.level_offsets {
        *offset += dx;
    }
}

/// Mirrors `result` across the diagonal so depth runs down the y axis.
pub(crate) fn transpose(result: &mut LayoutResult) {
    for node in result.nodes.values_mut() {
        std::mem::swap(&mut node.x, &mut node.y);
        std::mem::swap(&mut node.width, &mut node.height);
    }
    for route in &mut result.edge_routes {
        for segment in &mut route.segments {
            *segment = segment.transposed();
        }
        route.arrow_point = route.arrow_point.transposed();
        for crossing in &mut route.crossings {
            crossing.point = crossing.point.transposed();
        }
        for command in &mut route.path.commands {
            *command = command.transposed();
        }
    }
    for label in &mut result.label_positions {
        std::mem::swap(&mut label.x, &mut label.y);
        std::mem::swap(&mut label.width, &mut label.height);
    }
    std::mem::swap(&mut result.width, &mut result.height);
    result.orientation = match result.orientation {
        Orientation::Horizontal => Orientation::Vertical,
        Orientation::Vertical => Orientation::Horizontal,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::types::{
        EdgePath, EdgeRoute, LayoutDiagnostics, LayoutMetadata, PlacedNode, Segment, SegmentKind,
    };
    use std::collections::BTreeMap;

    fn sample() -> LayoutResult {
        let node = PlacedNode {
            id: "A".to_string(),
            label: "A".to_string(),
            depth: 0,
            x: 10.0,
            y: 20.0,
            width: 60.0,
            height: 30.0,
            classes: Vec::new(),
            dashed: None,
        };
        let segments = vec![
            Segment::horizontal(Point::new(0.0, 0.0), 20.0),
            Segment::arc(Point::new(20.0, 0.0), Point::new(30.0, 0.0), 5.0, true),
        ];
        LayoutResult {
            orientation: Orientation::Horizontal,
            nodes: BTreeMap::from([("A".to_string(), node)]),
            edge_routes: vec![EdgeRoute {
                edge_index: 0,
                from: "A".to_string(),
                to: "B".to_string(),
                is_dashed: false,
                arrow_point: Point::new(30.0, 0.0),
                segments,
                crossings: Vec::new(),
                path: EdgePath {
                    commands: vec![PathCommand::MoveTo { to: Point::new(0.0, 0.0) }],
                },
            }],
            label_positions: Vec::new(),
            metadata: LayoutMetadata {
                level_offsets: vec![10.0],
                level_sizes: vec![60.0],
            },
            back_edges: Vec::new(),
            width: 100.0,
            height: 50.0,
            diagnostics: LayoutDiagnostics::default(),
        }
    }

    #[test]
    fn transpose_swaps_axes_and_flips_arcs() {
        let mut result = sample();
        transpose(&mut result);
        let node = &result.nodes["A"];
        assert_eq!((node.x, node.y, node.width, node.height), (20.0, 10.0, 30.0, 60.0));
        let route = &result.edge_routes[0];
        assert_eq!(route.segments[0].kind, SegmentKind::Vertical);
        assert_eq!(route.segments[1].arc.map(|arc| arc.sweep), Some(false));
        assert_eq!(route.arrow_point, Point::new(0.0, 30.0));
        assert_eq!((result.width, result.height), (50.0, 100.0));
        assert_eq!(result.orientation, Orientation::Vertical);
    }

    #[test]
    fn translate_moves_everything_together() {
        let mut result = sample();
        translate(&mut result, 5.0, -2.0);
        assert_eq!(result.nodes["A"].x, 15.0);
        assert_eq!(result.edge_routes[0].segments[1].end, Point::new(35.0, -2.0));
        assert_eq!(result.edge_routes[0].path.commands[0].end(), Point::new(5.0, -2.0));
        assert_eq!(result.metadata.level_offsets, vec![15.0]);
    }
}
