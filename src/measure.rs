//! First half of the two-phase layout contract: turn every node and edge
//! label into a size before any position is computed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;
use crate::ir::Graph;
use crate::text_metrics::TextMeasurer;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub(crate) fn transposed(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

/// Natural sizes of node boxes and edge label boxes, keyed by node id and
/// by label text respectively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Measurements {
    nodes: BTreeMap<String, Size>,
    labels: BTreeMap<String, Size>,
}

impl Measurements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Measures every node and every edge label of `graph`.
    pub fn measure(graph: &Graph, measurer: &dyn TextMeasurer, config: &LayoutConfig) -> Self {
        let mut measurements = Self::new();
        for node in &graph.nodes {
            let block = measure_block(&node.label, config.font_size, measurer, config);
            let width = (block.width + config.node_padding_x * 2.0).max(config.min_node_width);
            let height = (block.height + config.node_padding_y * 2.0).max(config.min_node_height);
            measurements.insert_node_size(&node.id, Size::new(width, height));
        }
        for edge in &graph.edges {
            let Some(label) = edge.label.as_deref().filter(|_| edge.has_label()) else {
                continue;
            };
            if measurements.labels.contains_key(label) {
                continue;
            }
            let block = measure_block(label, config.label_font_size(), measurer, config);
            let size = Size::new(
                block.width + config.label_padding_x * 2.0,
                block.height + config.label_padding_y * 2.0,
            );
            measurements.insert_label_size(label, size);
        }
        tracing::debug!(
            nodes = measurements.nodes.len(),
            labels = measurements.labels.len(),
            "measured graph"
        );
        measurements
    }

    pub fn insert_node_size(&mut self, id: &str, size: Size) {
        self.nodes.insert(id.to_string(), size);
    }

    pub fn insert_label_size(&mut self, text: &str, size: Size) {
        self.labels.insert(text.to_string(), size);
    }

    pub fn node_size(&self, id: &str) -> Option<Size> {
        self.nodes.get(id).copied()
    }

    pub fn label_size(&self, text: &str) -> Option<Size> {
        self.labels.get(text).copied()
    }
}

/// Splits, wraps and measures a label.
pub fn measure_block(
    text: &str,
    font_size: f32,
    measurer: &dyn TextMeasurer,
    config: &LayoutConfig,
) -> TextBlock {
    let max_width = config.max_label_width_chars.max(1) as f32 * measurer.average_char_width(font_size);
    let mut lines = Vec::new();
    for line in split_lines(text) {
        lines.extend(wrap_line(&line, max_width, font_size, measurer));
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    let width = lines
        .iter()
        .map(|line| measurer.text_width(line, font_size))
        .fold(0.0, f32::max);
    let height = lines.len() as f32 * font_size * config.label_line_height;
    TextBlock {
        lines,
        width,
        height,
    }
}

pub fn split_lines(text: &str) -> Vec<String> {
    text.replace("<br/>", "\n")
        .replace("<br>", "\n")
        .replace("\\n", "\n")
        .split('\n')
        .map(|line| line.trim().to_string())
        .collect()
}

fn wrap_line(line: &str, max_width: f32, font_size: f32, measurer: &dyn TextMeasurer) -> Vec<String> {
    if measurer.text_width(line, font_size) <= max_width {
        return vec![line.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if measurer.text_width(&candidate, font_size) > max_width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
