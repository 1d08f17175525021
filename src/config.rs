use crate::error::{DeclutterError, Result, read_file};
use crate::mapper::PlotRect;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Knobs of the declutter engine. Pure input: replaced wholesale, never derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Radius (px) used for anchor density and post-relaxation crowding.
    pub collision_radius: f32,
    /// Most labels allowed inside one collision radius. `0` disables culling.
    pub density_threshold: usize,
    /// Repulsion numerator; the push between two overlapping labels is
    /// `force_strength / distance`.
    pub force_strength: f32,
    /// Restoring pull toward the label's home position, per iteration.
    pub anchor_strength: f32,
    /// Extra restoring pull for large bubbles, scaled by normalized size.
    pub size_gravity: f32,
    /// Extra repulsion per neighbouring anchor. `0` ignores density.
    pub density_weight: f32,
    /// Fraction of the previous step carried into the next one.
    pub damping: f32,
    pub max_step: f32,
    pub iterations: usize,
    /// Gap between the top of a bubble and the bottom of its label.
    pub vertical_offset: f32,
    pub overlap_padding: f32,
    pub plot_margin: f32,
    pub max_displacement: f32,
    pub leader_threshold: f32,
    pub label_padding_x: f32,
    pub label_padding_y: f32,
    pub min_plot_size: f32,
    /// Above this many labels the pairwise passes use a spatial grid.
    pub grid_threshold: usize,
    pub debounce_ms: u64,
    pub bubble_min_radius: f32,
    pub bubble_max_radius: f32,
}

impl Tolerances {
    pub fn standard() -> Self {
        Self {
            collision_radius: 30.0,
            density_threshold: 4,
            force_strength: 120.0,
            anchor_strength: 0.05,
            size_gravity: 0.5,
            density_weight: 0.15,
            damping: 0.0,
            max_step: 8.0,
            iterations: 120,
            vertical_offset: 4.0,
            overlap_padding: 2.0,
            plot_margin: 4.0,
            max_displacement: 80.0,
            leader_threshold: 5.0,
            label_padding_x: 4.0,
            label_padding_y: 2.0,
            min_plot_size: 20.0,
            grid_threshold: 256,
            debounce_ms: 75,
            bubble_min_radius: 4.0,
            bubble_max_radius: 18.0,
        }
    }

    /// Tighter variant for small charts: shorter relaxation, more labels per
    /// neighbourhood, damped steps.
    pub fn compact() -> Self {
        Self {
            collision_radius: 20.0,
            density_threshold: 6,
            force_strength: 80.0,
            anchor_strength: 0.08,
            size_gravity: 0.3,
            density_weight: 0.1,
            damping: 0.3,
            max_step: 6.0,
            iterations: 80,
            vertical_offset: 2.0,
            overlap_padding: 1.0,
            plot_margin: 2.0,
            max_displacement: 60.0,
            leader_threshold: 5.0,
            label_padding_x: 3.0,
            label_padding_y: 1.5,
            min_plot_size: 20.0,
            grid_threshold: 256,
            debounce_ms: 50,
            bubble_min_radius: 3.0,
            bubble_max_radius: 12.0,
        }
    }

    pub fn preset(name: &str) -> Result<Self> {
        match name {
            "standard" | "default" => Ok(Self::standard()),
            "compact" => Ok(Self::compact()),
            other => Err(DeclutterError::UnknownPreset(other.to_string())),
        }
    }

    pub fn reset_to_defaults(&mut self) {
        *self = Self::default();
    }

    /// Clamp values that would make the simulation misbehave.
    pub fn sanitized(mut self) -> Self {
        fn non_negative(name: &str, value: &mut f32) {
            if !value.is_finite() || *value < 0.0 {
                tracing::warn!(knob = name, value = *value, "tolerance clamped to 0");
                *value = 0.0;
            }
        }
        non_negative("collision_radius", &mut self.collision_radius);
        non_negative("force_strength", &mut self.force_strength);
        non_negative("anchor_strength", &mut self.anchor_strength);
        non_negative("size_gravity", &mut self.size_gravity);
        non_negative("density_weight", &mut self.density_weight);
        non_negative("max_step", &mut self.max_step);
        non_negative("vertical_offset", &mut self.vertical_offset);
        non_negative("overlap_padding", &mut self.overlap_padding);
        non_negative("plot_margin", &mut self.plot_margin);
        non_negative("max_displacement", &mut self.max_displacement);
        non_negative("leader_threshold", &mut self.leader_threshold);
        non_negative("label_padding_x", &mut self.label_padding_x);
        non_negative("label_padding_y", &mut self.label_padding_y);
        non_negative("min_plot_size", &mut self.min_plot_size);
        non_negative("bubble_min_radius", &mut self.bubble_min_radius);
        if !self.damping.is_finite() || !(0.0..1.0).contains(&self.damping) {
            tracing::warn!(value = self.damping, "damping clamped into [0, 0.95]");
            self.damping = if self.damping.is_finite() {
                self.damping.clamp(0.0, 0.95)
            } else {
                0.0
            };
        }
        if !self.bubble_max_radius.is_finite() || self.bubble_max_radius < self.bubble_min_radius {
            self.bubble_max_radius = self.bubble_min_radius;
        }
        self
    }

    pub fn bubble_radius(&self, normalized_z: f64) -> f32 {
        let t = if normalized_z.is_finite() {
            normalized_z.clamp(0.0, 1.0) as f32
        } else {
            0.0
        };
        self.bubble_min_radius + t * (self.bubble_max_radius - self.bubble_min_radius)
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
    /// Space reserved around the plot area for axes: left, top, right, bottom.
    pub padding: [f32; 4],
}

impl RenderConfig {
    pub fn plot_rect(&self) -> PlotRect {
        let [left, top, right, bottom] = self.padding;
        PlotRect::new(
            left,
            top,
            (self.width - left - right).max(0.0),
            (self.height - top - bottom).max(0.0),
        )
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 640.0,
            background: "#FFFFFF".to_string(),
            padding: [72.0, 24.0, 24.0, 56.0],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub tolerances: Tolerances,
    pub theme: Theme,
    pub render: RenderConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TolerancesFile {
    collision_radius: Option<f32>,
    density_threshold: Option<usize>,
    force_strength: Option<f32>,
    anchor_strength: Option<f32>,
    size_gravity: Option<f32>,
    density_weight: Option<f32>,
    damping: Option<f32>,
    max_step: Option<f32>,
    iterations: Option<usize>,
    vertical_offset: Option<f32>,
    overlap_padding: Option<f32>,
    plot_margin: Option<f32>,
    max_displacement: Option<f32>,
    leader_threshold: Option<f32>,
    label_padding_x: Option<f32>,
    label_padding_y: Option<f32>,
    min_plot_size: Option<f32>,
    grid_threshold: Option<usize>,
    debounce_ms: Option<u64>,
    bubble_min_radius: Option<f32>,
    bubble_max_radius: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeFile {
    font_family: Option<String>,
    font_size: Option<f32>,
    line_height: Option<f32>,
    fast_text_metrics: Option<bool>,
    label_text_color: Option<String>,
    label_background: Option<String>,
    label_border: Option<String>,
    leader_color: Option<String>,
    point_fill: Option<String>,
    point_stroke: Option<String>,
    point_opacity: Option<f32>,
    axis_color: Option<String>,
    axis_text_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderFile {
    width: Option<f32>,
    height: Option<f32>,
    background: Option<String>,
    padding: Option<[f32; 4]>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    preset: Option<String>,
    theme: Option<String>,
    tolerances: Option<TolerancesFile>,
    theme_variables: Option<ThemeFile>,
    render: Option<RenderFile>,
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    load_config_with_preset(path, None)
}

/// Like [`load_config`], with `preset` replacing the file's own preset as the
/// base that the file's `tolerances` overrides are applied on.
pub fn load_config_with_preset(path: Option<&Path>, preset: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => parse_config_with_preset(&read_file(path)?, preset),
        None => merge_config(ConfigFile::default(), preset),
    }
}

/// Parse a JSON5 config and merge it over the defaults.
pub fn parse_config(contents: &str) -> Result<Config> {
    parse_config_with_preset(contents, None)
}

pub fn parse_config_with_preset(contents: &str, preset: Option<&str>) -> Result<Config> {
    merge_config(json5::from_str(contents)?, preset)
}

fn merge_config(parsed: ConfigFile, preset: Option<&str>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(name) = preset.or(parsed.preset.as_deref()) {
        config.tolerances = Tolerances::preset(name)?;
    }
    if let Some(name) = parsed.theme.as_deref() {
        config.theme =
            Theme::by_name(name).ok_or_else(|| DeclutterError::UnknownTheme(name.to_string()))?;
        config.render.background = config.theme.background.clone();
    }

    if let Some(t) = parsed.tolerances {
        let tol = &mut config.tolerances;
        if let Some(v) = t.collision_radius {
            tol.collision_radius = v;
        }
        if let Some(v) = t.density_threshold {
            tol.density_threshold = v;
        }
        if let Some(v) = t.force_strength {
            tol.force_strength = v;
        }
        if let Some(v) = t.anchor_strength {
            tol.anchor_strength = v;
        }
        if let Some(v) = t.size_gravity {
            tol.size_gravity = v;
        }
        if let Some(v) = t.density_weight {
            tol.density_weight = v;
        }
        if let Some(v) = t.damping {
            tol.damping = v;
        }
        if let Some(v) = t.max_step {
            tol.max_step = v;
        }
        if let Some(v) = t.iterations {
            tol.iterations = v;
        }
        if let Some(v) = t.vertical_offset {
            tol.vertical_offset = v;
        }
        if let Some(v) = t.overlap_padding {
            tol.overlap_padding = v;
        }
        if let Some(v) = t.plot_margin {
            tol.plot_margin = v;
        }
        if let Some(v) = t.max_displacement {
            tol.max_displacement = v;
        }
        if let Some(v) = t.leader_threshold {
            tol.leader_threshold = v;
        }
        if let Some(v) = t.label_padding_x {
            tol.label_padding_x = v;
        }
        if let Some(v) = t.label_padding_y {
            tol.label_padding_y = v;
        }
        if let Some(v) = t.min_plot_size {
            tol.min_plot_size = v;
        }
        if let Some(v) = t.grid_threshold {
            tol.grid_threshold = v;
        }
        if let Some(v) = t.debounce_ms {
            tol.debounce_ms = v;
        }
        if let Some(v) = t.bubble_min_radius {
            tol.bubble_min_radius = v;
        }
        if let Some(v) = t.bubble_max_radius {
            tol.bubble_max_radius = v;
        }
    }
    config.tolerances = config.tolerances.sanitized();

    if let Some(vars) = parsed.theme_variables {
        let theme = &mut config.theme;
        if let Some(v) = vars.font_family {
            theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            theme.font_size = v;
        }
        if let Some(v) = vars.line_height {
            theme.line_height = v;
        }
        if let Some(v) = vars.fast_text_metrics {
            theme.fast_text_metrics = v;
        }
        if let Some(v) = vars.label_text_color {
            theme.label_text_color = v;
        }
        if let Some(v) = vars.label_background {
            theme.label_background = v;
        }
        if let Some(v) = vars.label_border {
            theme.label_border = v;
        }
        if let Some(v) = vars.leader_color {
            theme.leader_color = v;
        }
        if let Some(v) = vars.point_fill {
            theme.point_fill = v;
        }
        if let Some(v) = vars.point_stroke {
            theme.point_stroke = v;
        }
        if let Some(v) = vars.point_opacity {
            theme.point_opacity = v;
        }
        if let Some(v) = vars.axis_color {
            theme.axis_color = v;
        }
        if let Some(v) = vars.axis_text_color {
            theme.axis_text_color = v;
        }
        if let Some(v) = vars.background {
            theme.background = v.clone();
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
        if let Some(v) = render.padding {
            config.render.padding = v;
        }
    }

    Ok(config)
}
