use std::collections::BTreeMap;

use serde::Serialize;

use crate::ir::{DashedInfo, Orientation};

pub(crate) const GEOM_EPS: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn approx_eq(self, other: Point, eps: f32) -> bool {
        (self.x - other.x).abs() <= eps && (self.y - other.y).abs() <= eps
    }

    pub(crate) fn transposed(self) -> Self {
        Self {
            x: self.y,
            y: self.x,
        }
    }
}

/// Axis-aligned box, `x`/`y` at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    pub fn inflate(&self, pad_x: f32, pad_y: f32) -> Rect {
        Rect::new(
            self.x - pad_x,
            self.y - pad_y,
            self.width + pad_x * 2.0,
            self.height + pad_y * 2.0,
        )
    }

    /// Strict interior overlap; touching edges do not count.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right() - GEOM_EPS
            && other.x < self.right() - GEOM_EPS
            && self.y < other.bottom() - GEOM_EPS
            && other.y < self.bottom() - GEOM_EPS
    }

    pub fn overlaps_y(&self, top: f32, bottom: f32) -> bool {
        self.y < bottom - GEOM_EPS && top < self.bottom() - GEOM_EPS
    }

    pub fn overlaps_x(&self, left: f32, right: f32) -> bool {
        self.x < right - GEOM_EPS && left < self.right() - GEOM_EPS
    }

    /// Whether the vertical line `x` between `y0` and `y1` passes through the box.
    pub fn crossed_by_vertical(&self, x: f32, y0: f32, y1: f32) -> bool {
        x > self.x + GEOM_EPS
            && x < self.right() - GEOM_EPS
            && self.overlaps_y(y0.min(y1), y0.max(y1))
    }

    /// Whether the horizontal line `y` between `x0` and `x1` passes through the box.
    pub fn crossed_by_horizontal(&self, y: f32, x0: f32, x1: f32) -> bool {
        y > self.y + GEOM_EPS
            && y < self.bottom() - GEOM_EPS
            && self.overlaps_x(x0.min(x1), x0.max(x1))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedNode {
    pub id: String,
    pub label: String,
    pub depth: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashed: Option<DashedInfo>,
}

impl PlacedNode {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn is_ghost(&self) -> bool {
        self.dashed.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Horizontal,
    Vertical,
    Arc,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcParams {
    pub radius: f32,
    pub sweep: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub kind: SegmentKind,
    pub start: Point,
    pub end: Point,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arc: Option<ArcParams>,
}

impl Segment {
    pub fn horizontal(start: Point, end_x: f32) -> Self {
        Self {
            kind: SegmentKind::Horizontal,
            start,
            end: Point::new(end_x, start.y),
            arc: None,
        }
    }

    pub fn vertical(start: Point, end_y: f32) -> Self {
        Self {
            kind: SegmentKind::Vertical,
            start,
            end: Point::new(start.x, end_y),
            arc: None,
        }
    }

    pub fn arc(start: Point, end: Point, radius: f32, sweep: bool) -> Self {
        Self {
            kind: SegmentKind::Arc,
            start,
            end,
            arc: Some(ArcParams { radius, sweep }),
        }
    }

    pub fn length(&self) -> f32 {
        let dx = self.end.x - self.start.x;
        let dy = self.end.y - self.start.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_straight(&self) -> bool {
        self.kind != SegmentKind::Arc
    }

    /// Unit direction of a straight segment.
    pub fn direction(&self) -> (f32, f32) {
        let len = self.length();
        if len <= GEOM_EPS {
            return (0.0, 0.0);
        }
        (
            (self.end.x - self.start.x) / len,
            (self.end.y - self.start.y) / len,
        )
    }

    pub(crate) fn transposed(&self) -> Segment {
        let kind = match self.kind {
            SegmentKind::Horizontal => SegmentKind::Vertical,
            SegmentKind::Vertical => SegmentKind::Horizontal,
            SegmentKind::Arc => SegmentKind::Arc,
        };
        Segment {
            kind,
            start: self.start.transposed(),
            end: self.end.transposed(),
            // Mirroring across the diagonal flips the turning direction.
            arc: self.arc.map(|arc| ArcParams {
                radius: arc.radius,
                sweep: !arc.sweep,
            }),
        }
    }
}

/// One drawing instruction of a rendered edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum PathCommand {
    MoveTo { to: Point },
    LineTo { to: Point },
    QuadTo { ctrl: Point, to: Point },
    ArcTo { radius: f32, sweep: bool, to: Point },
}

impl PathCommand {
    pub fn end(&self) -> Point {
        match *self {
            PathCommand::MoveTo { to }
            | PathCommand::LineTo { to }
            | PathCommand::QuadTo { to, .. }
            | PathCommand::ArcTo { to, .. } => to,
        }
    }

    pub(crate) fn transposed(&self) -> PathCommand {
        match *self {
            PathCommand::MoveTo { to } => PathCommand::MoveTo {
                to: to.transposed(),
            },
            PathCommand::LineTo { to } => PathCommand::LineTo {
                to: to.transposed(),
            },
            PathCommand::QuadTo { ctrl, to } => PathCommand::QuadTo {
                ctrl: ctrl.transposed(),
                to: to.transposed(),
            },
            PathCommand::ArcTo { radius, sweep, to } => PathCommand::ArcTo {
                radius,
                sweep: !sweep,
                to: to.transposed(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EdgePath {
    pub commands: Vec<PathCommand>,
}

impl EdgePath {
    /// SVG path data (`d` attribute).
    pub fn to_svg(&self) -> String {
        let mut d = String::new();
        for command in &self.commands {
            if !d.is_empty() {
                d.push(' ');
            }
            match command {
                PathCommand::MoveTo { to } => d.push_str(&format!("M {:.2} {:.2}", to.x, to.y)),
                PathCommand::LineTo { to } => d.push_str(&format!("L {:.2} {:.2}", to.x, to.y)),
                PathCommand::QuadTo { ctrl, to } => d.push_str(&format!(
                    "Q {:.2} {:.2} {:.2} {:.2}",
                    ctrl.x, ctrl.y, to.x, to.y
                )),
                PathCommand::ArcTo { radius, sweep, to } => d.push_str(&format!(
                    "A {radius:.2} {radius:.2} 0 0 {} {:.2} {:.2}",
                    u8::from(*sweep),
                    to.x,
                    to.y
                )),
            }
        }
        d
    }

    pub fn arc_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, PathCommand::ArcTo { .. }))
            .count()
    }

    pub fn curve_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, PathCommand::QuadTo { .. }))
            .count()
    }
}

/// A point where a horizontal segment of one edge passes over a vertical
/// segment of another.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Crossing {
    pub segment_index: usize,
    pub point: Point,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRoute {
    /// Index into the laid-out edge list (input edges followed by dashed ghost edges).
    pub edge_index: usize,
    pub from: String,
    pub to: String,
    pub is_dashed: bool,
    pub segments: Vec<Segment>,
    pub arrow_point: Point,
    /// Sorted by segment, then ascending along the jump axis.
    pub crossings: Vec<Crossing>,
    pub path: EdgePath,
}

impl EdgeRoute {
    pub fn points(&self) -> Vec<Point> {
        let mut points = Vec::with_capacity(self.segments.len() + 1);
        if let Some(first) = self.segments.first() {
            points.push(first.start);
        }
        for segment in &self.segments {
            points.push(segment.end);
        }
        points
    }

    pub fn is_continuous(&self, eps: f32) -> bool {
        self.segments
            .windows(2)
            .all(|pair| pair[0].end.approx_eq(pair[1].start, eps))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelPosition {
    pub edge_index: usize,
    pub from: String,
    pub to: String,
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LabelPosition {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Per-level geometry along the depth axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutMetadata {
    pub level_offsets: Vec<f32>,
    pub level_sizes: Vec<f32>,
}

impl LayoutMetadata {
    pub fn level_end(&self, depth: usize) -> Option<f32> {
        Some(self.level_offsets.get(depth)? + self.level_sizes.get(depth)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackEdge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollisionReport {
    pub ghost_vs_edge: PassReport,
    pub sibling: PassReport,
    pub node_vs_label: PassReport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDiagnostics {
    pub collisions: CollisionReport,
    pub propagation_capped: bool,
    pub skipped_edges: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResult {
    pub orientation: Orientation,
    pub nodes: BTreeMap<String, PlacedNode>,
    pub edge_routes: Vec<EdgeRoute>,
    pub label_positions: Vec<LabelPosition>,
    pub metadata: LayoutMetadata,
    pub back_edges: Vec<BackEdge>,
    pub width: f32,
    pub height: f32,
    pub diagnostics: LayoutDiagnostics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_rects_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&Rect::new(5.0, 5.0, 10.0, 10.0)));
    }

    #[test]
    fn vertical_line_through_box() {
        let rect = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(rect.crossed_by_vertical(15.0, 0.0, 100.0));
        assert!(!rect.crossed_by_vertical(10.0, 0.0, 100.0));
        assert!(!rect.crossed_by_vertical(15.0, 31.0, 100.0));
    }

    #[test]
    fn transposed_arc_flips_sweep() {
        let seg = Segment::arc(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 5.0, true);
        let t = seg.transposed();
        assert_eq!(t.end, Point::new(0.0, 10.0));
        assert_eq!(t.arc.map(|a| a.sweep), Some(false));
        let h = Segment::horizontal(Point::new(0.0, 3.0), 7.0).transposed();
        assert_eq!(h.kind, SegmentKind::Vertical);
    }

    #[test]
    fn svg_path_formats_every_command() {
        let path = EdgePath {
            commands: vec![
                PathCommand::MoveTo { to: Point::new(0.0, 0.0) },
                PathCommand::LineTo { to: Point::new(5.0, 0.0) },
                PathCommand::ArcTo {
                    radius: 5.0,
                    sweep: true,
                    to: Point::new(15.0, 0.0),
                },
                PathCommand::QuadTo {
                    ctrl: Point::new(20.0, 0.0),
                    to: Point::new(20.0, 5.0),
                },
            ],
        };
        assert_eq!(
            path.to_svg(),
            "M 0.00 0.00 L 5.00 0.00 A 5.00 5.00 0 0 1 15.00 0.00 Q 20.00 0.00 20.00 5.00"
        );
        assert_eq!(path.arc_count(), 1);
        assert_eq!(path.curve_count(), 1);
    }
}
