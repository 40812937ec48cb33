// Segment lists to drawable paths: jump arcs over crossings, then rounded
// corners where both legs are long enough.

use super::types::{Crossing, EdgePath, GEOM_EPS, PathCommand, Point, Segment, SegmentKind};

pub fn render_path(segments: &[Segment], crossings: &[Crossing], jump_radius: f32, corner_radius: f32) -> EdgePath {
    let expanded = insert_jumps(segments, crossings, jump_radius);
    round_corners(&expanded, corner_radius)
}

/// Splits each horizontal segment around its crossings with a semicircle of
/// `radius` that bulges toward negative y. Crossings closer than `radius` to
/// either end of their segment, or overlapping a previous jump, are dropped.
pub fn insert_jumps(segments: &[Segment], crossings: &[Crossing], radius: f32) -> Vec<Segment> {
    let mut out = Vec::with_capacity(segments.len() + crossings.len() * 2);
    for (idx, segment) in segments.iter().enumerate() {
        if segment.kind != SegmentKind::Horizontal || radius <= 0.0 {
            out.push(*segment);
            continue;
        }
        let forward = segment.end.x >= segment.start.x;
        let (lo, hi) = if forward {
            (segment.start.x, segment.end.x)
        } else {
            (segment.end.x, segment.start.x)
        };
        let mut xs: Vec<f32> = crossings
            .iter()
            .filter(|crossing| crossing.segment_index == idx)
            .map(|crossing| crossing.point.x)
            .filter(|x| *x - lo >= radius + GEOM_EPS && hi - *x >= radius + GEOM_EPS)
            .collect();
        xs.sort_by(f32::total_cmp);
        if !forward {
            xs.reverse();
        }

        let y = segment.start.y;
        let mut cursor = segment.start;
        for x in xs {
            let (before, after) = if forward {
                (x - radius, x + radius)
            } else {
                (x + radius, x - radius)
            };
            let behind = if forward {
                before < cursor.x - GEOM_EPS
            } else {
                before > cursor.x + GEOM_EPS
            };
            if behind {
                continue;
            }
            if (before - cursor.x).abs() > GEOM_EPS {
                out.push(Segment::horizontal(cursor, before));
                cursor = Point::new(before, y);
            }
            // Clockwise in y-down space when travelling +x, so always over the top.
            let arc = Segment::arc(cursor, Point::new(after, y), radius, forward);
            cursor = arc.end;
            out.push(arc);
        }
        if (segment.end.x - cursor.x).abs() > GEOM_EPS {
            out.push(Segment::horizontal(cursor, segment.end.x));
        }
    }
    out
}

/// Path commands for `segments`, replacing the corner between two
/// perpendicular straight segments with a quadratic curve when both are
/// longer than `2 * radius`. Arcs are emitted as-is.
pub fn round_corners(segments: &[Segment], radius: f32) -> EdgePath {
    let Some(first) = segments.first() else {
        return EdgePath::default();
    };
    let mut commands = Vec::with_capacity(segments.len() * 2 + 1);
    commands.push(PathCommand::MoveTo { to: first.start });

    for (idx, segment) in segments.iter().enumerate() {
        if let Some(arc) = segment.arc.filter(|_| segment.kind == SegmentKind::Arc) {
            commands.push(PathCommand::ArcTo {
                radius: arc.radius,
                sweep: arc.sweep,
                to: segment.end,
            });
            continue;
        }
        match segments.get(idx + 1) {
            Some(next) if can_round(segment, next, radius) => {
                let (dx, dy) = segment.direction();
                let (nx, ny) = next.direction();
                let corner = segment.end;
                commands.push(PathCommand::LineTo {
                    to: Point::new(corner.x - dx * radius, corner.y - dy * radius),
                });
                commands.push(PathCommand::QuadTo {
                    ctrl: corner,
                    to: Point::new(corner.x + nx * radius, corner.y + ny * radius),
                });
            }
            _ => commands.push(PathCommand::LineTo { to: segment.end }),
        }
    }
    EdgePath { commands }
}

fn can_round(a: &Segment, b: &Segment, radius: f32) -> bool {
    radius > 0.0
        && a.is_straight()
        && b.is_straight()
        && a.kind != b.kind
        && a.length() > radius * 2.0
        && b.length() > radius * 2.0
}
