use crate::ir::Orientation;
use crate::layout::{BackEdge, LayoutDiagnostics, LayoutResult};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub orientation: Orientation,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub labels: Vec<LabelDump>,
    pub level_offsets: Vec<f32>,
    pub level_sizes: Vec<f32>,
    pub back_edges: Vec<BackEdge>,
    pub diagnostics: LayoutDiagnostics,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub label: String,
    pub depth: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub ghost_of: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub from: String,
    pub to: String,
    pub dashed: bool,
    pub points: Vec<[f32; 2]>,
    pub arrow: [f32; 2],
    pub crossings: Vec<[f32; 2]>,
    pub path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDump {
    pub from: String,
    pub to: String,
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LayoutDump {
    pub fn from_layout(layout: &LayoutResult) -> Self {
        let nodes = layout
            .nodes
            .values()
            .map(|node| NodeDump {
                id: node.id.clone(),
                label: node.label.clone(),
                depth: node.depth,
                x: node.x,
                y: node.y,
                width: node.width,
                height: node.height,
                ghost_of: node.dashed.as_ref().map(|info| info.original_id.clone()),
            })
            .collect();

        let edges = layout
            .edge_routes
            .iter()
            .map(|route| EdgeDump {
                from: route.from.clone(),
                to: route.to.clone(),
                dashed: route.is_dashed,
                points: route.points().iter().map(|p| [p.x, p.y]).collect(),
                arrow: [route.arrow_point.x, route.arrow_point.y],
                crossings: route.crossings.iter().map(|c| [c.point.x, c.point.y]).collect(),
                path: route.path.to_svg(),
            })
            .collect();

        let labels = layout
            .label_positions
            .iter()
            .map(|label| LabelDump {
                from: label.from.clone(),
                to: label.to.clone(),
                text: label.text.clone(),
                x: label.x,
                y: label.y,
                width: label.width,
                height: label.height,
            })
            .collect();

        LayoutDump {
            orientation: layout.orientation,
            width: layout.width,
            height: layout.height,
            nodes,
            edges,
            labels,
            level_offsets: layout.metadata.level_offsets.clone(),
            level_sizes: layout.metadata.level_sizes.clone(),
            back_edges: layout.back_edges.clone(),
            diagnostics: layout.diagnostics.clone(),
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Writes the dump to `path`, or to stdout when no path is given.
pub fn write_layout_dump(path: Option<&Path>, layout: &LayoutResult) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout);
    match path {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            serde_json::to_writer_pretty(&mut writer, &dump)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}
