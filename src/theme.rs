use serde::{Deserialize, Serialize};

/// Colors and fonts used when drawing a finished layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub primary_color: String,
    pub primary_text_color: String,
    pub primary_border_color: String,
    pub line_color: String,
    /// Stroke and arrowhead color of back edges drawn into a ghost.
    pub dashed_line_color: String,
    /// Fill of a ghost node.
    pub ghost_color: String,
    /// Dashed outline of a ghost node.
    pub ghost_border_color: String,
    pub edge_label_background: String,
    pub edge_label_text_color: String,
    pub background: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 14.0,
            primary_color: "#ECECFF".to_string(),
            primary_text_color: "#333333".to_string(),
            primary_border_color: "#9370DB".to_string(),
            line_color: "#333333".to_string(),
            dashed_line_color: "#888888".to_string(),
            ghost_color: "#F6F6FF".to_string(),
            ghost_border_color: "#B0A4D8".to_string(),
            edge_label_background: "#E8E8E8".to_string(),
            edge_label_text_color: "#333333".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            primary_color: "#F8FAFF".to_string(),
            primary_text_color: "#1C2430".to_string(),
            primary_border_color: "#C7D2E5".to_string(),
            line_color: "#7A8AA6".to_string(),
            dashed_line_color: "#A9B4C7".to_string(),
            ghost_color: "#FFFFFF".to_string(),
            ghost_border_color: "#C7D2E5".to_string(),
            edge_label_background: "#FFFFFF".to_string(),
            edge_label_text_color: "#4A5568".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    /// Fill and border for a node, switching to the ghost palette for copies.
    pub fn node_colors(&self, ghost: bool) -> (&str, &str) {
        if ghost {
            (self.ghost_color.as_str(), self.ghost_border_color.as_str())
        } else {
            (self.primary_color.as_str(), self.primary_border_color.as_str())
        }
    }

    pub fn edge_color(&self, dashed: bool) -> &str {
        if dashed {
            self.dashed_line_color.as_str()
        } else {
            self.line_color.as_str()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ghosts_and_back_edges_use_their_own_palette() {
        let theme = Theme::classic();
        assert_eq!(theme.node_colors(true), ("#F6F6FF", "#B0A4D8"));
        assert_eq!(theme.node_colors(false), ("#ECECFF", "#9370DB"));
        assert_eq!(theme.edge_color(true), "#888888");
        assert_eq!(theme.edge_color(false), theme.line_color.as_str());
    }
}
