use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a node reached along several parent paths picks its depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelPolicy {
    /// Deepest parent + 1. Every edge then points strictly forward.
    #[default]
    Deepest,
    /// Shallowest parent + 1.
    Shallowest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Outer margin around the whole drawing.
    pub padding: f32,
    /// Base gap between stacked nodes of one level.
    pub node_spacing: f32,
    /// Fixed clearance added between a level's widest node and the next level.
    pub edge_clearance: f32,
    pub min_level_spacing: f32,
    pub max_level_spacing: f32,
    /// Extra inter-level spacing per edge passing between two adjacent levels.
    pub level_spacing_per_edge: f32,
    /// Vertical gap between stacked edge labels and between a label and its target.
    pub label_gap: f32,
    pub label_padding_x: f32,
    pub label_padding_y: f32,
    /// Minimum distance between a source's trailing edge and its lane.
    pub lane_min_offset: f32,
    /// Sources further apart than this on the primary axis never share lane numbering.
    pub lane_cluster_gap: f32,
    pub node_obstacle_pad: f32,
    pub label_obstacle_pad: f32,
    /// Approach shifts at or below this stay a single horizontal.
    pub dogleg_threshold: f32,
    pub collision_max_iterations: usize,
    pub corner_radius: f32,
    pub jump_radius: f32,
    pub crossing_epsilon: f32,
    pub level_policy: LevelPolicy,
    /// Draw back edges as dashed edges into synthesized ghost nodes.
    pub ghost_back_edges: bool,
    /// Center a child on its parent's center line instead of aligning top edges.
    pub center_on_parent: bool,
    pub font_size: f32,
    pub font_family: String,
    pub node_padding_x: f32,
    pub node_padding_y: f32,
    pub min_node_width: f32,
    pub min_node_height: f32,
    pub label_font_scale: f32,
    pub label_line_height: f32,
    pub max_label_width_chars: usize,
    pub fast_text_metrics: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            padding: 20.0,
            node_spacing: 20.0,
            edge_clearance: 30.0,
            min_level_spacing: 30.0,
            max_level_spacing: 120.0,
            level_spacing_per_edge: 6.0,
            label_gap: 4.0,
            label_padding_x: 4.0,
            label_padding_y: 2.0,
            lane_min_offset: 15.0,
            lane_cluster_gap: 200.0,
            node_obstacle_pad: 8.0,
            label_obstacle_pad: 3.0,
            dogleg_threshold: 4.0,
            collision_max_iterations: 5,
            corner_radius: 6.0,
            jump_radius: 5.0,
            crossing_epsilon: 1.0,
            level_policy: LevelPolicy::Deepest,
            ghost_back_edges: true,
            center_on_parent: false,
            font_size: 14.0,
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            node_padding_x: 16.0,
            node_padding_y: 10.0,
            min_node_width: 60.0,
            min_node_height: 32.0,
            label_font_scale: 0.85,
            label_line_height: 1.4,
            max_label_width_chars: 28,
            fast_text_metrics: false,
        }
    }
}

impl LayoutConfig {
    /// Settings that make measurement independent of installed fonts.
    pub fn deterministic() -> Self {
        Self {
            fast_text_metrics: true,
            ..Self::default()
        }
    }

    pub fn label_font_size(&self) -> f32 {
        self.font_size * self.label_font_scale
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::classic();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    primary_color: Option<String>,
    primary_text_color: Option<String>,
    primary_border_color: Option<String>,
    line_color: Option<String>,
    dashed_line_color: Option<String>,
    ghost_color: Option<String>,
    ghost_border_color: Option<String>,
    edge_label_background: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    background: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfig>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        match theme_name {
            "modern" => config.theme = Theme::modern(),
            "classic" | "default" => config.theme = Theme::classic(),
            other => tracing::warn!(theme = other, "unknown theme name, keeping default"),
        }
        config.render.background = config.theme.background.clone();
    }

    if let Some(layout) = parsed.layout {
        config.layout = layout;
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v.clone();
            config.layout.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
            config.layout.font_size = v;
        }
        if let Some(v) = vars.primary_color {
            config.theme.primary_color = v;
        }
        if let Some(v) = vars.primary_text_color {
            config.theme.primary_text_color = v;
        }
        if let Some(v) = vars.primary_border_color {
            config.theme.primary_border_color = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.dashed_line_color {
            config.theme.dashed_line_color = v;
        }
        if let Some(v) = vars.ghost_color {
            config.theme.ghost_color = v;
        }
        if let Some(v) = vars.ghost_border_color {
            config.theme.ghost_border_color = v;
        }
        if let Some(v) = vars.edge_label_background {
            config.theme.edge_label_background = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v.clone();
            config.render.background = v;
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
        if let Some(v) = render.background {
            config.render.background = v;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_the_collision_cap_at_five() {
        let config = LayoutConfig::default();
        assert_eq!(config.collision_max_iterations, 5);
        assert_eq!(config.lane_cluster_gap, 200.0);
        assert_eq!(config.level_policy, LevelPolicy::Deepest);
        assert!(config.min_level_spacing <= config.max_level_spacing);
    }

    #[test]
    fn partial_layout_section_keeps_other_defaults() {
        let config = parse_config(r#"{"layout": {"nodeSpacing": 44, "levelPolicy": "shallowest"}}"#)
            .expect("config should parse");
        assert_eq!(config.layout.node_spacing, 44.0);
        assert_eq!(config.layout.level_policy, LevelPolicy::Shallowest);
        assert_eq!(config.layout.corner_radius, LayoutConfig::default().corner_radius);
    }

    #[test]
    fn theme_variables_flow_into_measurement_font() {
        let config = parse_config(
            r##"{"theme": "modern", "themeVariables": {"fontSize": 18, "lineColor": "#123456"}}"##,
        )
        .expect("config should parse");
        assert_eq!(config.layout.font_size, 18.0);
        assert_eq!(config.theme.font_size, 18.0);
        assert_eq!(config.theme.line_color, "#123456");
    }

    #[test]
    fn missing_path_yields_defaults() {
        let config = load_config(None).expect("defaults");
        assert_eq!(config.render.width, 1200.0);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(parse_config("{not json").is_err());
    }
}
