use crate::config::load_config;
use crate::ir::{Graph, Orientation};
use crate::layout::compute_layout;
use crate::layout_dump::write_layout_dump;
use crate::measure::Measurements;
use crate::render::{render_svg, write_output_png, write_output_svg};
use crate::text_metrics::FontMetricsMeasurer;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::collections::BTreeSet;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "TREEROUTE_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "treeroute",
    version,
    about = "Layered layout and orthogonal edge routing for directed graphs"
)]
pub struct Args {
    /// Input graph (JSON or JSON5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. SVG and JSON default to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme, themeVariables, layout, render)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Pre-measured node and label sizes; skips text measurement
    #[arg(short = 's', long = "sizes")]
    pub sizes: Option<PathBuf>,

    /// Overrides the orientation declared in the input graph
    #[arg(long = "orientation", value_enum)]
    pub orientation: Option<OrientationArg>,

    /// Collapse a node, hiding everything reachable only through it
    #[arg(long = "collapse")]
    pub collapse: Vec<String>,

    /// Width
    #[arg(short = 'w', long = "width", default_value_t = 1200.0)]
    pub width: f32,

    /// Height
    #[arg(short = 'H', long = "height", default_value_t = 800.0)]
    pub height: f32,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OrientationArg {
    Horizontal,
    Vertical,
}

impl From<OrientationArg> for Orientation {
    fn from(value: OrientationArg) -> Self {
        match value {
            OrientationArg::Horizontal => Orientation::Horizontal,
            OrientationArg::Vertical => Orientation::Vertical,
        }
    }
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())
        .with_context(|| format!("failed to load config {:?}", args.config))?;
    config.render.width = args.width;
    config.render.height = args.height;

    let input = read_input(args.input.as_deref())?;
    let mut graph = Graph::from_json_str(&input).context("invalid input graph")?;
    if let Some(orientation) = args.orientation {
        graph.orientation = orientation.into();
    }
    if !args.collapse.is_empty() {
        let collapsed: BTreeSet<String> = args.collapse.iter().cloned().collect();
        graph = graph.without_collapsed(&collapsed);
    }

    let measurements = match args.sizes.as_deref() {
        Some(path) => read_sizes(path)?,
        None => Measurements::measure(&graph, &FontMetricsMeasurer::for_config(&config.layout), &config.layout),
    };
    let layout = compute_layout(&graph, &measurements, &config.layout);
    tracing::info!(
        nodes = layout.nodes.len(),
        edges = layout.edge_routes.len(),
        width = layout.width,
        height = layout.height,
        "layout complete"
    );

    match args.output_format {
        OutputFormat::Svg => {
            let svg = render_svg(&layout, &config.theme, &config.layout);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let svg = render_svg(&layout, &config.theme, &config.layout);
            write_output_png(&svg, &output, &config.render, &config.theme)?;
        }
        OutputFormat::Json => {
            write_layout_dump(args.output.as_deref(), &layout)?;
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path.filter(|path| *path != Path::new("-")) {
        return std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn read_sizes(path: &Path) -> Result<Measurements> {
    let contents = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(serde_json::from_str(&contents)?)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
