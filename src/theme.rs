use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub line_height: f32,
    /// Skip font lookup and use the built-in per-character width table.
    pub fast_text_metrics: bool,
    pub label_text_color: String,
    pub label_background: String,
    pub label_border: String,
    pub leader_color: String,
    pub point_fill: String,
    pub point_stroke: String,
    pub point_opacity: f32,
    pub axis_color: String,
    pub axis_text_color: String,
    pub background: String,
}

impl Theme {
    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 11.0,
            line_height: 1.3,
            fast_text_metrics: false,
            label_text_color: "#1C2430".to_string(),
            label_background: "rgba(255,255,255,0.85)".to_string(),
            label_border: "#C7D2E5".to_string(),
            leader_color: "#7A8AA6".to_string(),
            point_fill: "#4E79A7".to_string(),
            point_stroke: "#2F4B6B".to_string(),
            point_opacity: 0.7,
            axis_color: "#7A8AA6".to_string(),
            axis_text_color: "#1C2430".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn classic() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 12.0,
            line_height: 1.4,
            fast_text_metrics: false,
            label_text_color: "#333333".to_string(),
            label_background: "#E8E8E8".to_string(),
            label_border: "#9370DB".to_string(),
            leader_color: "#333333".to_string(),
            point_fill: "#ECECFF".to_string(),
            point_stroke: "#9370DB".to_string(),
            point_opacity: 0.9,
            axis_color: "#333333".to_string(),
            axis_text_color: "#333333".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "modern" => Some(Self::modern()),
            "classic" | "default" => Some(Self::classic()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::modern()
    }
}
