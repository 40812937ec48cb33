use crate::config::{LayoutConfig, RenderConfig};
use crate::layout::{EdgeRoute, LabelPosition, LayoutResult, PlacedNode};
use crate::measure::measure_block;
use crate::text_metrics::FontMetricsMeasurer;
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

pub fn render_svg(layout: &LayoutResult, theme: &Theme, config: &LayoutConfig) -> String {
    let mut svg = String::new();
    let width = layout.width;
    let height = layout.height;
    let measurer = FontMetricsMeasurer::for_config(config);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"0 0 {width:.2} {height:.2}\">",
    ));

    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    svg.push_str("<defs>");
    for (id, color) in [("arrow", theme.edge_color(false)), ("arrow-dashed", theme.edge_color(true))] {
        svg.push_str(&format!(
            "<marker id=\"{id}\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{color}\"/></marker>",
        ));
    }
    svg.push_str("</defs>");

    for route in &layout.edge_routes {
        svg.push_str(&edge_svg(route, theme));
    }

    for label in &layout.label_positions {
        svg.push_str(&label_svg(label, theme, config, &measurer));
    }

    for node in layout.nodes.values() {
        svg.push_str(&node_svg(node, theme, config, &measurer));
    }

    svg.push_str("</svg>");
    svg
}

fn edge_svg(route: &EdgeRoute, theme: &Theme) -> String {
    let d = route.path.to_svg();
    if d.is_empty() {
        return String::new();
    }
    let stroke = theme.edge_color(route.is_dashed);
    let (dash, marker) = if route.is_dashed {
        (" stroke-dasharray=\"5 4\"", "arrow-dashed")
    } else {
        ("", "arrow")
    };
    format!(
        "<path d=\"{d}\" fill=\"none\" stroke=\"{stroke}\" stroke-width=\"1.4\"{dash} marker-end=\"url(#{marker})\" data-from=\"{}\" data-to=\"{}\"/>",
        escape_xml(&route.from),
        escape_xml(&route.to)
    )
}

fn label_svg(label: &LabelPosition, theme: &Theme, config: &LayoutConfig, measurer: &FontMetricsMeasurer) -> String {
    let mut out = format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"3\" ry=\"3\" fill=\"{}\"/>",
        label.x, label.y, label.width, label.height, theme.edge_label_background
    );
    let font_size = config.label_font_size();
    let block = measure_block(&label.text, font_size, measurer, config);
    let center_x = label.x + label.width / 2.0;
    let center_y = label.y + label.height / 2.0;
    out.push_str(&text_block_svg(
        center_x,
        center_y,
        &block.lines,
        font_size,
        &theme.edge_label_text_color,
        theme,
        config,
    ));
    out
}

fn node_svg(node: &PlacedNode, theme: &Theme, config: &LayoutConfig, measurer: &FontMetricsMeasurer) -> String {
    let (fill, stroke) = theme.node_colors(node.is_ghost());
    let dash = if node.is_ghost() { " stroke-dasharray=\"6 4\"" } else { "" };
    let mut out = format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"6\" ry=\"6\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"1.4\"{dash} data-id=\"{}\"/>",
        node.x,
        node.y,
        node.width,
        node.height,
        escape_xml(&node.id)
    );
    let block = measure_block(&node.label, config.font_size, measurer, config);
    let center_x = node.x + node.width / 2.0;
    let center_y = node.y + node.height / 2.0;
    out.push_str(&text_block_svg(
        center_x,
        center_y,
        &block.lines,
        config.font_size,
        &theme.primary_text_color,
        theme,
        config,
    ));
    out
}

fn text_block_svg(
    x: f32,
    y: f32,
    lines: &[String],
    font_size: f32,
    fill: &str,
    theme: &Theme,
    config: &LayoutConfig,
) -> String {
    let line_height = font_size * config.label_line_height;
    let total_height = lines.len() as f32 * line_height;
    // Baseline of the first line, roughly centring cap height in its slot.
    let start_y = y - total_height / 2.0 + line_height / 2.0 + font_size * 0.35;
    let mut text = String::new();

    text.push_str(&format!(
        "<text x=\"{x:.2}\" y=\"{start_y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{font_size:.2}\" fill=\"{fill}\">",
        escape_xml(&theme.font_family)
    ));

    for (idx, line) in lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { line_height };
        text.push_str(&format!(
            "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>",
            escape_xml(line)
        ));
    }

    text.push_str("</text>");
    text
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = theme
        .font_family
        .split(',')
        .map(|part| part.trim().trim_matches('"').trim_matches('\''))
        .find(|part| !part.is_empty())
        .unwrap_or("sans-serif")
        .to_string();
    if let Some(size) = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .or_else(|| usvg::Size::from_wh(800.0, 600.0))
    {
        opt.default_size = size;
    }
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

/// Stub kept so callers compile without the `png` feature.
#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig, _theme: &Theme) -> Result<()> {
    anyhow::bail!("PNG output requires the `png` feature")
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Edge, Graph};
    use crate::layout::compute_layout;
    use crate::measure::Measurements;
    use crate::text_metrics::FixedWidthMeasurer;

    fn render(graph: &Graph) -> String {
        let config = LayoutConfig::deterministic();
        let measurements = Measurements::measure(graph, &FixedWidthMeasurer::default(), &config);
        let layout = compute_layout(graph, &measurements, &config);
        render_svg(&layout, &Theme::modern(), &config)
    }

    #[test]
    fn render_svg_basic() {
        let mut graph = Graph::new();
        graph.ensure_node("A", Some("Alpha".to_string()));
        graph.ensure_node("B", Some("Beta".to_string()));
        graph.add_edge(Edge::labeled("A", "B", "go"));
        let svg = render(&graph);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Alpha"));
        assert!(svg.contains(">go</tspan>"));
        assert!(svg.contains("marker-end=\"url(#arrow)\""));
    }

    #[test]
    fn ghost_nodes_and_back_edges_are_dashed() {
        let mut graph = Graph::new();
        for id in ["A", "B"] {
            graph.ensure_node(id, None);
        }
        graph.add_edge(Edge::new("A", "B"));
        graph.add_edge(Edge::new("B", "A"));
        let svg = render(&graph);
        assert!(svg.contains("url(#arrow-dashed)"));
        assert!(svg.contains("data-id=\"A~ghost0\""));
        assert_eq!(svg.matches("stroke-dasharray=\"6 4\"").count(), 1);
    }

    #[test]
    fn text_is_escaped() {
        let mut graph = Graph::new();
        graph.ensure_node("A", Some("a < b & c".to_string()));
        let svg = render(&graph);
        assert!(svg.contains("a &lt; b &amp; c"));
    }
}
