// Crossings between one route's horizontal runs and another route's
// verticals. Corner joins and T-junctions are not crossings.

use super::types::{Crossing, EdgeRoute, Point, SegmentKind};

/// For each route, the points where its horizontal segments pass over a
/// vertical segment of a different route.
///
/// Both coordinates must lie strictly inside the other segment's span by more
/// than `epsilon`, so shared endpoints never count. Crossings on one segment
/// closer than `merge_distance` collapse into the first of them. The result
/// is ordered by segment index, then ascending x.
pub fn detect_crossings(routes: &[EdgeRoute], epsilon: f32, merge_distance: f32) -> Vec<Vec<Crossing>> {
    let verticals: Vec<(usize, f32, f32, f32)> = routes
        .iter()
        .enumerate()
        .flat_map(|(route_idx, route)| {
            route
                .segments
                .iter()
                .filter(|segment| segment.kind == SegmentKind::Vertical)
                .map(move |segment| {
                    let (y0, y1) = ordered(segment.start.y, segment.end.y);
                    (route_idx, segment.start.x, y0, y1)
                })
        })
        .collect();

    let mut result = Vec::with_capacity(routes.len());
    for (route_idx, route) in routes.iter().enumerate() {
        let mut crossings = Vec::new();
        for (segment_index, segment) in route.segments.iter().enumerate() {
            if segment.kind != SegmentKind::Horizontal {
                continue;
            }
            let y = segment.start.y;
            let (x0, x1) = ordered(segment.start.x, segment.end.x);
            let mut xs: Vec<f32> = verticals
                .iter()
                .filter(|(owner, ..)| *owner != route_idx)
                .filter(|(_, x, y0, y1)| {
                    y > y0 + epsilon && y < y1 - epsilon && *x > x0 + epsilon && *x < x1 - epsilon
                })
                .map(|(_, x, ..)| *x)
                .collect();
            xs.sort_by(f32::total_cmp);

            let mut last: Option<f32> = None;
            for x in xs {
                if last.is_some_and(|prev| x - prev < merge_distance) {
                    continue;
                }
                last = Some(x);
                crossings.push(Crossing {
                    segment_index,
                    point: Point::new(x, y),
                });
            }
        }
        result.push(crossings);
    }

    tracing::debug!(
        crossings = result.iter().map(Vec::len).sum::<usize>(),
        "detected crossings"
    );
    result
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::types::{EdgePath, Segment};

    fn route(edge_index: usize, segments: Vec<Segment>) -> EdgeRoute {
        EdgeRoute {
            edge_index,
            from: format!("s{edge_index}"),
            to: format!("t{edge_index}"),
            is_dashed: false,
            arrow_point: segments.last().map(|s| s.end).unwrap_or_default(),
            segments,
            crossings: Vec::new(),
            path: EdgePath::default(),
        }
    }

    fn h(x0: f32, x1: f32, y: f32) -> Segment {
        Segment::horizontal(Point::new(x0, y), x1)
    }

    fn v(x: f32, y0: f32, y1: f32) -> Segment {
        Segment::vertical(Point::new(x, y0), y1)
    }

    #[test]
    fn genuine_crossing_is_found() {
        let routes = vec![route(0, vec![h(0.0, 40.0, 20.0)]), route(1, vec![v(15.0, 0.0, 40.0)])];
        let found = detect_crossings(&routes, 1.0, 10.0);
        assert_eq!(
            found[0],
            vec![Crossing {
                segment_index: 0,
                point: Point::new(15.0, 20.0)
            }]
        );
        assert!(found[1].is_empty(), "verticals never carry crossings");
    }

    #[test]
    fn shared_endpoints_are_not_crossings() {
        let corner = vec![route(0, vec![h(0.0, 10.0, 0.0)]), route(1, vec![v(10.0, 0.0, 10.0)])];
        assert!(detect_crossings(&corner, 1.0, 10.0)[0].is_empty());

        let tee = vec![route(0, vec![h(0.0, 20.0, 0.0)]), route(1, vec![v(10.0, 0.0, 10.0)])];
        assert!(detect_crossings(&tee, 1.0, 10.0)[0].is_empty());
    }

    #[test]
    fn own_segments_never_cross() {
        let routes = vec![route(0, vec![v(10.0, -10.0, 0.0), h(10.0, 0.0, 0.0), v(5.0, 0.0, 10.0)])];
        let loop_route = vec![route(0, vec![h(0.0, 20.0, 5.0), v(20.0, 5.0, -5.0), h(20.0, 10.0, -5.0), v(10.0, -5.0, 10.0)])];
        assert!(detect_crossings(&routes, 1.0, 10.0)[0].is_empty());
        assert!(detect_crossings(&loop_route, 1.0, 10.0)[0].is_empty());
    }

    #[test]
    fn crossings_are_sorted_and_merged() {
        let routes = vec![
            route(0, vec![h(100.0, 0.0, 20.0)]),
            route(1, vec![v(70.0, 0.0, 40.0)]),
            route(2, vec![v(30.0, 0.0, 40.0)]),
            route(3, vec![v(33.0, 0.0, 40.0)]),
        ];
        let found = detect_crossings(&routes, 1.0, 10.0);
        let xs: Vec<f32> = found[0].iter().map(|c| c.point.x).collect();
        assert_eq!(xs, vec![30.0, 70.0]);
    }
}
