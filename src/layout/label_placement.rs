// Edge label boxes. Labels of solid edges stack upward from the top edge of
// their target node, one slot per distinct label text.

use std::collections::{BTreeMap, HashMap};

use super::types::{LabelPosition, PlacedNode};
use crate::ir::Edge;
use crate::measure::Size;

fn labeled_solid(edge: &Edge) -> Option<&str> {
    if edge.is_dashed {
        return None;
    }
    edge.label.as_deref().filter(|_| edge.has_label())
}

/// Height reserved above each target for its stacked labels, `label_gap`
/// included per slot. Targets without labels are absent.
pub(crate) fn incoming_label_stacks(
    edges: &[Edge],
    label_sizes: &[Option<Size>],
    label_gap: f32,
) -> HashMap<String, f32> {
    let mut seen: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut stacks: HashMap<String, f32> = HashMap::new();
    for (idx, edge) in edges.iter().enumerate() {
        let Some(text) = labeled_solid(edge) else {
            continue;
        };
        let Some(size) = label_sizes.get(idx).copied().flatten() else {
            continue;
        };
        let texts = seen.entry(edge.to.as_str()).or_default();
        if texts.contains(&text) {
            continue;
        }
        texts.push(text);
        *stacks.entry(edge.to.clone()).or_insert(0.0) += size.height + label_gap;
    }
    stacks
}

/// Predicts the box of every solid labeled edge whose target is placed.
///
/// Slot `i` of a target sits directly above slot `i - 1`; the first slot
/// sits `label_gap` above the node. Edges repeating a label text already
/// stacked on the same target share that slot.
pub(crate) fn predict_label_positions(
    edges: &[Edge],
    label_sizes: &[Option<Size>],
    nodes: &BTreeMap<String, PlacedNode>,
    label_gap: f32,
) -> Vec<LabelPosition> {
    let mut slots: HashMap<&str, Vec<(&str, f32)>> = HashMap::new();
    let mut used: HashMap<&str, f32> = HashMap::new();
    let mut positions = Vec::new();

    for (idx, edge) in edges.iter().enumerate() {
        let Some(text) = labeled_solid(edge) else {
            continue;
        };
        let Some(size) = label_sizes.get(idx).copied().flatten() else {
            continue;
        };
        let Some(target) = nodes.get(&edge.to) else {
            continue;
        };
        let target_slots = slots.entry(edge.to.as_str()).or_default();
        let y = match target_slots.iter().find(|(existing, _)| *existing == text) {
            Some((_, y)) => *y,
            None => {
                let offset = used.entry(edge.to.as_str()).or_insert(0.0);
                *offset += size.height + label_gap;
                let y = target.y - *offset;
                target_slots.push((text, y));
                y
            }
        };
        positions.push(LabelPosition {
            edge_index: idx,
            from: edge.from.clone(),
            to: edge.to.clone(),
            text: text.to_string(),
            x: target.x,
            y,
            width: size.width,
            height: size.height,
        });
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed(id: &str, x: f32, y: f32) -> PlacedNode {
        PlacedNode {
            id: id.to_string(),
            label: id.to_string(),
            depth: 0,
            x,
            y,
            width: 60.0,
            height: 30.0,
            classes: Vec::new(),
            dashed: None,
        }
    }

    #[test]
    fn labels_stack_above_their_target() {
        let edges = vec![
            Edge::labeled("A", "T", "yes"),
            Edge::labeled("B", "T", "no"),
            Edge::labeled("C", "T", "yes"),
        ];
        let sizes = vec![Some(Size::new(20.0, 10.0)); 3];
        let nodes: BTreeMap<String, PlacedNode> =
            [("T".to_string(), placed("T", 100.0, 200.0))].into_iter().collect();

        let labels = predict_label_positions(&edges, &sizes, &nodes, 4.0);
        assert_eq!(labels.len(), 3);
        assert_eq!(labels[0].y, 186.0);
        assert_eq!(labels[1].y, 172.0);
        assert_eq!(labels[2].y, labels[0].y, "repeated text shares its slot");
        assert!(labels.iter().all(|label| label.x == 100.0));

        let stacks = incoming_label_stacks(&edges, &sizes, 4.0);
        assert_eq!(stacks.get("T").copied(), Some(28.0));
    }

    #[test]
    fn dashed_and_unlabeled_edges_have_no_box() {
        let mut dashed = Edge::labeled("A", "T", "back");
        dashed.is_dashed = true;
        let edges = vec![dashed, Edge::new("B", "T")];
        let sizes = vec![Some(Size::new(20.0, 10.0)), None];
        let nodes: BTreeMap<String, PlacedNode> =
            [("T".to_string(), placed("T", 0.0, 0.0))].into_iter().collect();
        assert!(predict_label_positions(&edges, &sizes, &nodes, 4.0).is_empty());
        assert!(incoming_label_stacks(&edges, &sizes, 4.0).is_empty());
    }
}
