//! Deterministic layered layout and orthogonal edge routing for directed graphs.
//!
//! Layout is two-phase: [`Measurements`] first turns every node and edge label
//! into a size, then [`compute_layout`] places nodes by depth, routes each edge
//! as horizontal and vertical segments, and marks crossings with jump arcs.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod measure;
pub mod render;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, LevelPolicy, RenderConfig};
pub use ir::{Edge, Graph, GraphError, Node, Orientation};
pub use layout::{LayoutResult, compute_layout};
pub use measure::{Measurements, Size};
pub use text_metrics::{FixedWidthMeasurer, FontMetricsMeasurer, TextMeasurer};
pub use theme::Theme;

/// Measures `graph` with `measurer` and lays it out in one call.
pub fn layout_graph(graph: &Graph, measurer: &dyn TextMeasurer, config: &LayoutConfig) -> LayoutResult {
    let measurements = Measurements::measure(graph, measurer, config);
    compute_layout(graph, &measurements, config)
}

/// Parses a JSON graph, lays it out and renders SVG with `theme`.
pub fn render_json(input: &str, theme: &Theme, config: &LayoutConfig) -> Result<String, GraphError> {
    let graph = Graph::from_json_str(input)?;
    let layout = layout_graph(&graph, &FontMetricsMeasurer::for_config(config), config);
    Ok(render::render_svg(&layout, theme, config))
}
