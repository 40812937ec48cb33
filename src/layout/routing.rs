// Orthogonal edge routing.
//
// Every routed edge leaves its source on the trailing side, drops (or rises)
// along the source's lane, and enters the target on its leading side. Lanes
// are shared by all outgoing edges of a source. A final approach that would
// run through a node either shifts onto a clear row inside the target, or
// gets a dogleg: a second vertical in the gap in front of the target's level.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::structure::Structure;
use super::types::{
    EdgePath, EdgeRoute, GEOM_EPS, LabelPosition, LayoutMetadata, PlacedNode, Point, Rect, Segment,
    SegmentKind,
};
use crate::config::LayoutConfig;
use crate::ir::Edge;

pub(crate) struct RoutingContext<'a> {
    pub nodes: &'a BTreeMap<String, PlacedNode>,
    pub edges: &'a [Edge],
    pub structure: &'a Structure,
    pub metadata: &'a LayoutMetadata,
    pub labels: &'a [LabelPosition],
    pub config: &'a LayoutConfig,
}

#[derive(Clone, Copy)]
struct Candidate<'a> {
    edge_index: usize,
    edge: &'a Edge,
    source: &'a PlacedNode,
    target: &'a PlacedNode,
}

impl Candidate<'_> {
    fn source_y(&self) -> f32 {
        self.source.rect().center_y()
    }

    fn target_y(&self) -> f32 {
        self.target.rect().center_y()
    }

    /// Where the route meets the target: its leading side when the lane lies
    /// in front of it, its trailing side otherwise.
    fn entry_x(&self, lane: f32) -> f32 {
        if lane < self.target.x {
            self.target.x
        } else {
            self.target.rect().right()
        }
    }
}

/// A box routes must keep out of, remembering what it belongs to so an
/// edge never avoids its own endpoints or its own label.
struct Obstacle<'a> {
    rect: Rect,
    node: Option<&'a str>,
    edge_index: Option<usize>,
}

impl Obstacle<'_> {
    fn blocks(&self, candidate: &Candidate<'_>) -> bool {
        match (self.node, self.edge_index) {
            (Some(id), _) => id != candidate.source.id && id != candidate.target.id,
            (None, Some(edge_index)) => edge_index != candidate.edge_index,
            (None, None) => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Approach {
    /// Final horizontal at this row.
    Direct(f32),
    /// Detour row between the lane and the second vertical.
    Dogleg(f32),
}

pub(crate) fn route_edges(ctx: &RoutingContext<'_>) -> Vec<EdgeRoute> {
    let mut straight = Vec::new();
    let mut routed = Vec::new();
    for (edge_index, edge) in ctx.edges.iter().enumerate() {
        let (Some(source), Some(target)) = (ctx.nodes.get(&edge.from), ctx.nodes.get(&edge.to)) else {
            tracing::debug!(from = %edge.from, to = %edge.to, "edge endpoint not placed, not routed");
            continue;
        };
        if source.id == target.id {
            continue;
        }
        let candidate = Candidate {
            edge_index,
            edge,
            source,
            target,
        };
        if is_straight(&candidate, ctx.structure) {
            straight.push(candidate);
        } else {
            routed.push(candidate);
        }
    }

    let node_obstacles: Vec<Obstacle<'_>> = ctx
        .nodes
        .values()
        .map(|node| Obstacle {
            rect: node
                .rect()
                .inflate(ctx.config.node_obstacle_pad, ctx.config.node_obstacle_pad),
            node: Some(node.id.as_str()),
            edge_index: None,
        })
        .collect();
    let label_obstacles: Vec<Obstacle<'_>> = ctx
        .labels
        .iter()
        .map(|label| Obstacle {
            rect: label
                .rect()
                .inflate(ctx.config.label_obstacle_pad, ctx.config.label_obstacle_pad),
            node: None,
            edge_index: Some(label.edge_index),
        })
        .collect();

    let lanes = assign_lanes(&routed, &node_obstacles, &label_obstacles, ctx);
    let approaches: Vec<Approach> = routed
        .iter()
        .map(|candidate| {
            let lane = lane_of(&lanes, candidate);
            plan_approach(candidate, lane, &node_obstacles, ctx.config)
        })
        .collect();
    let dogleg_x = assign_dogleg_columns(&routed, &approaches, &lanes, ctx.metadata);

    let mut routes: Vec<EdgeRoute> = Vec::with_capacity(straight.len() + routed.len());
    for candidate in &straight {
        let y = candidate.source_y();
        let points = [
            Point::new(candidate.source.rect().right(), y),
            Point::new(candidate.target.x, y),
        ];
        routes.push(finish_route(candidate, &points));
    }
    for (idx, candidate) in routed.iter().enumerate() {
        let lane = lane_of(&lanes, candidate);
        let mut points = initial_run(candidate, lane, &node_obstacles, &label_obstacles);
        let entry_x = candidate.entry_x(lane);
        match approaches[idx] {
            Approach::Direct(row) => {
                points.push(Point::new(lane, row));
                points.push(Point::new(entry_x, row));
            }
            Approach::Dogleg(row) => {
                let column = dogleg_x.get(&idx).copied().unwrap_or((lane + entry_x) / 2.0);
                let target_y = candidate.target_y();
                tracing::trace!(
                    from = %candidate.edge.from,
                    to = %candidate.edge.to,
                    row,
                    column,
                    "dogleg"
                );
                points.push(Point::new(lane, row));
                points.push(Point::new(column, row));
                points.push(Point::new(column, target_y));
                points.push(Point::new(entry_x, target_y));
            }
        }
        routes.push(finish_route(candidate, &points));
    }
    routes.sort_by_key(|route| route.edge_index);

    tracing::debug!(
        straight = straight.len(),
        routed = routed.len(),
        doglegs = dogleg_x.len(),
        "routed edges"
    );
    routes
}

/// A one-to-one hop between centered neighbours renders as one horizontal.
fn is_straight(candidate: &Candidate<'_>, structure: &Structure) -> bool {
    (candidate.source_y() - candidate.target_y()).abs() <= GEOM_EPS
        && candidate.target.depth == candidate.source.depth + 1
        && structure.children_of(&candidate.source.id).len() == 1
        && structure.parents_of(&candidate.target.id).len() == 1
}

fn lane_of(lanes: &HashMap<String, f32>, candidate: &Candidate<'_>) -> f32 {
    lanes
        .get(&candidate.source.id)
        .copied()
        .unwrap_or(candidate.source.rect().right())
}

/// Base lanes per depth cluster, then a uniform per-depth push to clear
/// nodes and labels crossed by the lane verticals.
fn assign_lanes(
    routed: &[Candidate<'_>],
    node_obstacles: &[Obstacle<'_>],
    label_obstacles: &[Obstacle<'_>],
    ctx: &RoutingContext<'_>,
) -> HashMap<String, f32> {
    let mut lanes = base_lanes(routed, ctx.config);

    let mut depth_push: BTreeMap<usize, f32> = BTreeMap::new();
    for candidate in routed {
        let lane = lane_of(&lanes, candidate);
        let push = clearance_push(candidate, lane, node_obstacles, label_obstacles);
        let entry = depth_push.entry(candidate.source.depth).or_insert(0.0);
        *entry = entry.max(push);
    }

    let mut nearest_target: HashMap<&str, f32> = HashMap::new();
    for candidate in routed {
        if candidate.target.x > candidate.source.rect().right() {
            let slot = nearest_target
                .entry(candidate.source.id.as_str())
                .or_insert(f32::INFINITY);
            *slot = slot.min(candidate.target.x);
        }
    }

    let mut pushed: HashSet<&str> = HashSet::new();
    for candidate in routed {
        if !pushed.insert(candidate.source.id.as_str()) {
            continue;
        }
        let push = depth_push.get(&candidate.source.depth).copied().unwrap_or(0.0);
        if push <= GEOM_EPS {
            continue;
        }
        let Some(lane) = lanes.get_mut(&candidate.source.id) else {
            continue;
        };
        let mut shifted = *lane + push;
        if let Some(limit) = nearest_target.get(candidate.source.id.as_str()) {
            shifted = shifted.min(limit - 1.0);
        }
        *lane = shifted.max(*lane);
        tracing::trace!(source = %candidate.source.id, push, lane = *lane, "lane pushed");
    }
    lanes
}

fn base_lanes(routed: &[Candidate<'_>], config: &LayoutConfig) -> HashMap<String, f32> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut by_depth: BTreeMap<usize, Vec<&PlacedNode>> = BTreeMap::new();
    for candidate in routed {
        if seen.insert(candidate.source.id.as_str()) {
            by_depth
                .entry(candidate.source.depth)
                .or_default()
                .push(candidate.source);
        }
    }

    let mut lanes = HashMap::new();
    for (depth, mut sources) in by_depth {
        sources.sort_by(|a, b| a.rect().right().total_cmp(&b.rect().right()));
        let mut clusters: Vec<Vec<&PlacedNode>> = Vec::new();
        let mut last_right: Option<f32> = None;
        for source in sources {
            let right = source.rect().right();
            let starts_cluster = last_right.is_none_or(|last| right - last > config.lane_cluster_gap);
            match clusters.last_mut() {
                Some(cluster) if !starts_cluster => cluster.push(source),
                _ => clusters.push(vec![source]),
            }
            last_right = Some(right);
        }

        let passing = routed
            .iter()
            .filter(|candidate| candidate.source.depth < depth && depth < candidate.target.depth)
            .count();

        for mut cluster in clusters {
            cluster.sort_by(|a, b| {
                a.rect()
                    .center_y()
                    .total_cmp(&b.rect().center_y())
                    .then_with(|| a.id.cmp(&b.id))
            });
            let max_right = cluster
                .iter()
                .map(|source| source.rect().right())
                .fold(f32::NEG_INFINITY, f32::max);
            let min_child_left = routed
                .iter()
                .filter(|candidate| cluster.iter().any(|source| source.id == candidate.source.id))
                .map(|candidate| candidate.target.x)
                .filter(|x| *x > max_right)
                .fold(f32::INFINITY, f32::min);
            let min_child_left = if min_child_left.is_finite() {
                min_child_left
            } else {
                max_right + config.lane_min_offset * 2.0
            };
            let slots = cluster.len().max(passing).max(1) as f32;
            for (idx, source) in cluster.iter().enumerate() {
                let spread = (min_child_left - max_right) * (idx as f32 + 1.0) / (slots + 1.0);
                let lane = (max_right + spread).max(source.rect().right() + config.lane_min_offset);
                lanes.insert(source.id.clone(), lane);
            }
        }
    }
    lanes
}

/// Rightward distance the lane vertical of `candidate` must move so it no
/// longer passes through any obstacle lying in front of the target.
fn clearance_push(
    candidate: &Candidate<'_>,
    lane: f32,
    node_obstacles: &[Obstacle<'_>],
    label_obstacles: &[Obstacle<'_>],
) -> f32 {
    let y0 = candidate.source_y();
    let y1 = candidate.target_y();
    let relevant: Vec<&Rect> = node_obstacles
        .iter()
        .chain(label_obstacles)
        .filter(|obstacle| obstacle.blocks(candidate))
        .map(|obstacle| &obstacle.rect)
        .filter(|rect| rect.right() < candidate.target.x)
        .collect();

    let mut x = lane;
    for _ in 0..=relevant.len() {
        let hit = relevant
            .iter()
            .filter(|rect| rect.crossed_by_vertical(x, y0, y1))
            .map(|rect| rect.right())
            .fold(None, |acc: Option<f32>, right| Some(acc.map_or(right, |a| a.max(right))));
        match hit {
            Some(right) => x = right,
            None => break,
        }
    }
    x - lane
}

fn plan_approach(
    candidate: &Candidate<'_>,
    lane: f32,
    node_obstacles: &[Obstacle<'_>],
    config: &LayoutConfig,
) -> Approach {
    let target_y = candidate.target_y();
    let entry_x = candidate.entry_x(lane);
    let blockers: Vec<Rect> = node_obstacles
        .iter()
        .filter(|obstacle| obstacle.blocks(candidate))
        .map(|obstacle| obstacle.rect)
        .collect();
    if !blockers
        .iter()
        .any(|rect| rect.crossed_by_horizontal(target_y, lane, entry_x))
    {
        return Approach::Direct(target_y);
    }

    let row = clear_row(target_y, lane, entry_x, &blockers);
    let target = candidate.target.rect();
    let inside_target = row > target.y + GEOM_EPS && row < target.bottom() - GEOM_EPS;
    if (row - target_y).abs() <= config.dogleg_threshold && inside_target {
        Approach::Direct(row)
    } else {
        Approach::Dogleg(row)
    }
}

/// Nearest row to `y` where a horizontal over `[x0, x1]` crosses no box.
/// Ties go upward.
fn clear_row(y: f32, x0: f32, x1: f32, rects: &[Rect]) -> f32 {
    let up = scan_row(y, x0, x1, rects, true);
    let down = scan_row(y, x0, x1, rects, false);
    if y - up <= down - y { up } else { down }
}

fn scan_row(mut y: f32, x0: f32, x1: f32, rects: &[Rect], upward: bool) -> f32 {
    for _ in 0..=rects.len() {
        let hits = rects
            .iter()
            .filter(|rect| rect.crossed_by_horizontal(y, x0, x1));
        let next = if upward {
            hits.map(|rect| rect.y).fold(None, |acc: Option<f32>, v| Some(acc.map_or(v, |a| a.min(v))))
        } else {
            hits.map(|rect| rect.bottom())
                .fold(None, |acc: Option<f32>, v| Some(acc.map_or(v, |a| a.max(v))))
        };
        match next {
            Some(v) => y = v,
            None => break,
        }
    }
    y
}

/// Second-vertical columns, spread evenly through the gap in front of the
/// target's level among all doglegs entering that level.
fn assign_dogleg_columns(
    routed: &[Candidate<'_>],
    approaches: &[Approach],
    lanes: &HashMap<String, f32>,
    metadata: &LayoutMetadata,
) -> HashMap<usize, f32> {
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (idx, approach) in approaches.iter().enumerate() {
        if matches!(approach, Approach::Dogleg(_)) {
            groups.entry(routed[idx].target.depth).or_default().push(idx);
        }
    }

    // Doglegs run behind the lanes already occupying the same gap.
    let mut deepest_lane: HashMap<usize, f32> = HashMap::new();
    for candidate in routed {
        let lane = lane_of(lanes, candidate);
        let slot = deepest_lane.entry(candidate.source.depth).or_insert(lane);
        *slot = slot.max(lane);
    }

    let mut columns = HashMap::new();
    for (depth, mut members) in groups {
        members.sort_by(|a, b| {
            routed[*a]
                .target_y()
                .total_cmp(&routed[*b].target_y())
                .then(routed[*a].edge_index.cmp(&routed[*b].edge_index))
        });
        let gap_start = depth
            .checked_sub(1)
            .map(|prev| {
                let level_end = metadata.level_end(prev).unwrap_or(f32::NEG_INFINITY);
                let lane = deepest_lane.get(&prev).copied().unwrap_or(f32::NEG_INFINITY);
                level_end.max(lane)
            })
            .unwrap_or(f32::NEG_INFINITY);
        let count = members.len() as f32;
        for (slot, idx) in members.iter().enumerate() {
            let candidate = &routed[*idx];
            let lane = lane_of(lanes, candidate);
            let entry_x = candidate.entry_x(lane);
            let start = gap_start.max(lane);
            let column = start + (entry_x - start) * (slot as f32 + 1.0) / (count + 1.0);
            columns.insert(*idx, column);
        }
    }
    columns
}

/// Points from the source's trailing side to the lane. When the run out of
/// the source is blocked, a short stub steps onto a clear row first.
fn initial_run(
    candidate: &Candidate<'_>,
    lane: f32,
    node_obstacles: &[Obstacle<'_>],
    label_obstacles: &[Obstacle<'_>],
) -> Vec<Point> {
    let start = Point::new(candidate.source.rect().right(), candidate.source_y());
    let blockers: Vec<Rect> = node_obstacles
        .iter()
        .chain(label_obstacles)
        .filter(|obstacle| obstacle.blocks(candidate))
        .map(|obstacle| obstacle.rect)
        .filter(|rect| rect.crossed_by_horizontal(start.y, start.x, lane))
        .collect();
    let Some(first_left) = blockers
        .iter()
        .map(|rect| rect.x)
        .filter(|x| *x > start.x)
        .fold(None, |acc: Option<f32>, x| Some(acc.map_or(x, |a| a.min(x))))
    else {
        return vec![start, Point::new(lane, start.y)];
    };

    let stub_x = (start.x + first_left) / 2.0;
    let all: Vec<Rect> = node_obstacles
        .iter()
        .chain(label_obstacles)
        .filter(|obstacle| obstacle.blocks(candidate))
        .map(|obstacle| obstacle.rect)
        .collect();
    let row = clear_row(start.y, stub_x, lane, &all);
    tracing::trace!(from = %candidate.edge.from, stub_x, row, "initial stub");
    vec![
        start,
        Point::new(stub_x, start.y),
        Point::new(stub_x, row),
        Point::new(lane, row),
    ]
}

fn finish_route(candidate: &Candidate<'_>, points: &[Point]) -> EdgeRoute {
    let segments = segments_from_points(points);
    let arrow_point = segments
        .last()
        .map(|segment| segment.end)
        .or_else(|| points.last().copied())
        .unwrap_or_default();
    EdgeRoute {
        edge_index: candidate.edge_index,
        from: candidate.edge.from.clone(),
        to: candidate.edge.to.clone(),
        is_dashed: candidate.edge.is_dashed,
        segments,
        arrow_point,
        crossings: Vec::new(),
        path: EdgePath::default(),
    }
}

/// Orthogonal segments through `points`. Zero-length hops are dropped and
/// collinear runs in the same direction are merged. Each segment starts
/// exactly where the previous one ended.
pub(crate) fn segments_from_points(points: &[Point]) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    let Some(&first) = points.first() else {
        return segments;
    };
    let mut cursor = first;
    for &next in &points[1..] {
        let mut pieces = Vec::with_capacity(2);
        if (next.x - cursor.x).abs() > GEOM_EPS {
            pieces.push(Segment::horizontal(cursor, next.x));
        }
        let corner = pieces.last().map(|segment| segment.end).unwrap_or(cursor);
        if (next.y - corner.y).abs() > GEOM_EPS {
            pieces.push(Segment::vertical(corner, next.y));
        }
        for piece in pieces {
            cursor = piece.end;
            match segments.last_mut() {
                Some(last) if same_run(last, &piece) => last.end = piece.end,
                _ => segments.push(piece),
            }
        }
    }
    segments
}

fn same_run(a: &Segment, b: &Segment) -> bool {
    if a.kind != b.kind || a.kind == SegmentKind::Arc {
        return false;
    }
    let (ax, ay) = a.direction();
    let (bx, by) = b.direction();
    ax * bx + ay * by > 0.0
}
