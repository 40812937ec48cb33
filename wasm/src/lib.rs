use serde::Deserialize;
use treeroute::layout_dump::LayoutDump;
use treeroute::render::render_svg;
use treeroute::{FontMetricsMeasurer, Graph, LayoutConfig, LayoutResult, Measurements, Theme, compute_layout};
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutOptions {
    theme: Option<String>,
    layout: Option<LayoutConfig>,
}

fn parse_options(options_json: Option<String>) -> Result<LayoutOptions, String> {
    match options_json {
        Some(raw) => serde_json::from_str(&raw).map_err(|error| error.to_string()),
        None => Ok(LayoutOptions::default()),
    }
}

fn layout_config(options: &LayoutOptions) -> LayoutConfig {
    let mut config = options.layout.clone().unwrap_or_default();
    // No system fonts inside the browser sandbox.
    config.fast_text_metrics = true;
    config
}

fn run_layout(graph_json: &str, sizes_json: Option<String>, options: &LayoutOptions) -> Result<LayoutResult, String> {
    let graph = Graph::from_json_str(graph_json).map_err(|error| error.to_string())?;
    let config = layout_config(options);
    let measurements = match sizes_json {
        Some(raw) => serde_json::from_str::<Measurements>(&raw).map_err(|error| error.to_string())?,
        None => Measurements::measure(&graph, &FontMetricsMeasurer::for_config(&config), &config),
    };
    Ok(compute_layout(&graph, &measurements, &config))
}

/// Lays out `graph_json` and returns the JSON layout dump. `sizes_json`
/// carries host-measured `{nodes, labels}` sizes; without it labels are
/// measured with calibrated fallback widths.
#[wasm_bindgen]
pub fn layout_graph(graph_json: &str, sizes_json: Option<String>, options_json: Option<String>) -> Result<String, JsValue> {
    let options = parse_options(options_json).map_err(|error| JsValue::from_str(&error))?;
    let layout = run_layout(graph_json, sizes_json, &options).map_err(|error| JsValue::from_str(&error))?;
    LayoutDump::from_layout(&layout)
        .to_json()
        .map_err(|error| JsValue::from_str(&error.to_string()))
}

#[wasm_bindgen]
pub fn render_graph_svg(graph_json: &str, sizes_json: Option<String>, options_json: Option<String>) -> Result<String, JsValue> {
    let options = parse_options(options_json).map_err(|error| JsValue::from_str(&error))?;
    let layout = run_layout(graph_json, sizes_json, &options).map_err(|error| JsValue::from_str(&error))?;
    let theme = if options.theme.as_deref() == Some("modern") {
        Theme::modern()
    } else {
        Theme::classic()
    };
    Ok(render_svg(&layout, &theme, &layout_config(&options)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAPH: &str = r#"{
        nodes: [{id: "A"}, {id: "B"}, {id: "C"}],
        edges: [{from: "A", to: "B", label: "yes"}, {from: "B", to: "C"}, {from: "C", to: "A"}],
    }"#;

    #[test]
    fn host_sizes_are_used_verbatim() {
        let sizes = r#"{"nodes": {"A": {"width": 100, "height": 50}, "B": {"width": 100, "height": 50}, "C": {"width": 100, "height": 50}}, "labels": {"yes": {"width": 30, "height": 16}}}"#;
        let layout = run_layout(GRAPH, Some(sizes.to_string()), &LayoutOptions::default()).expect("layout");
        assert_eq!(layout.nodes["A"].width, 100.0);
        assert_eq!(layout.back_edges.len(), 1);
        assert_eq!(layout.label_positions.len(), 1);
    }

    #[test]
    fn options_override_layout_constants() {
        let options = parse_options(Some(r#"{"layout": {"padding": 50}}"#.to_string())).expect("options");
        let layout = run_layout(GRAPH, None, &options).expect("layout");
        let min_x = layout.nodes.values().map(|n| n.x).fold(f32::INFINITY, f32::min);
        assert_eq!(min_x, 50.0);
    }
}
