use crate::config::RenderConfig;
use crate::layout::{LabelLayout, PlacedLabel};
use crate::mapper::{AxisScale, CoordinateMapper, PlotRect};
use crate::model::{ChartSpec, MetricSpec};
use crate::scale::ScaleMode;
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

const TICK_LENGTH: f32 = 5.0;
const LINEAR_TICKS: usize = 5;

pub fn render_svg(
    layout: &LabelLayout,
    chart: &ChartSpec,
    theme: &Theme,
    config: &RenderConfig,
) -> String {
    let mut svg = String::new();
    let width = config.width.max(200.0);
    let height = config.height.max(200.0);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        config.background
    ));

    let plot = layout.plot;
    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1\"/>",
        plot.x, plot.y, plot.width, plot.height, theme.axis_color
    ));

    if let Some(mapper) = &layout.mapper {
        svg.push_str(&axis_ticks_svg(mapper, theme));
    }
    svg.push_str(&axis_captions_svg(plot, chart, theme));

    for point in &layout.points {
        svg.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\" fill-opacity=\"{}\" stroke=\"{}\" stroke-width=\"1\"/>",
            point.x, point.y, point.radius, theme.point_fill, theme.point_opacity, theme.point_stroke
        ));
    }

    // Leaders go under every label so no line crosses label text.
    for label in layout.labels.iter().filter(|label| label.leader) {
        let (x, y) = leader_end(label);
        svg.push_str(&format!(
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{x:.2}\" y2=\"{y:.2}\" stroke=\"{}\" stroke-width=\"0.8\"/>",
            label.anchor_x, label.anchor_y, theme.leader_color
        ));
    }

    for label in &layout.labels {
        let (rx, ry, rw, rh) = label.rect();
        svg.push_str(&format!(
            "<rect x=\"{rx:.2}\" y=\"{ry:.2}\" width=\"{rw:.2}\" height=\"{rh:.2}\" rx=\"3\" ry=\"3\" fill=\"{}\" stroke=\"{}\" stroke-width=\"0.6\"/>",
            theme.label_background, theme.label_border
        ));
        svg.push_str(&text_svg(
            label.x,
            label.y,
            &label.text,
            theme,
            theme.label_text_color.as_str(),
            "middle",
        ));
    }

    svg.push_str("</svg>");
    svg
}

/// Point on the label border closest to its anchor, so the leader stops at
/// the box instead of running under the text.
fn leader_end(label: &PlacedLabel) -> (f32, f32) {
    let (x, y, w, h) = label.rect();
    (
        label.anchor_x.clamp(x, x + w),
        label.anchor_y.clamp(y, y + h),
    )
}

fn axis_captions_svg(plot: PlotRect, chart: &ChartSpec, theme: &Theme) -> String {
    let mut out = String::new();
    let x_caption = axis_caption(&chart.x);
    let y_caption = axis_caption(&chart.y);
    let (cx, _) = plot.center();
    out.push_str(&text_svg(
        cx,
        plot.bottom() + theme.font_size * 3.2,
        &x_caption,
        theme,
        theme.axis_text_color.as_str(),
        "middle",
    ));
    let y_x = plot.x - theme.font_size * 4.5;
    let y_y = plot.y + plot.height * 0.5;
    out.push_str(&format!(
        "<g transform=\"rotate(-90 {y_x:.2} {y_y:.2})\">{}</g>",
        text_svg(
            y_x,
            y_y,
            &y_caption,
            theme,
            theme.axis_text_color.as_str(),
            "middle"
        )
    ));
    out
}

fn axis_caption(metric: &MetricSpec) -> String {
    let mut caption = metric.title().to_string();
    if metric.scale == ScaleMode::Log {
        caption.push_str(" (log)");
    }
    if let Some(hint) = metric.direction.hint() {
        caption.push(' ');
        caption.push_str(hint);
    }
    caption
}

fn axis_ticks_svg(mapper: &CoordinateMapper, theme: &Theme) -> String {
    let plot = mapper.plot();
    let mut out = String::new();
    for value in tick_values(mapper.x_scale()) {
        let x = mapper.map_x(value);
        out.push_str(&format!(
            "<line x1=\"{x:.2}\" y1=\"{:.2}\" x2=\"{x:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"1\"/>",
            plot.bottom(),
            plot.bottom() + TICK_LENGTH,
            theme.axis_color
        ));
        out.push_str(&text_svg(
            x,
            plot.bottom() + TICK_LENGTH + theme.font_size,
            &format_tick(value),
            theme,
            theme.axis_text_color.as_str(),
            "middle",
        ));
    }
    for value in tick_values(mapper.y_scale()) {
        let y = mapper.map_y(value);
        out.push_str(&format!(
            "<line x1=\"{:.2}\" y1=\"{y:.2}\" x2=\"{:.2}\" y2=\"{y:.2}\" stroke=\"{}\" stroke-width=\"1\"/>",
            plot.x - TICK_LENGTH,
            plot.x,
            theme.axis_color
        ));
        out.push_str(&text_svg(
            plot.x - TICK_LENGTH - 2.0,
            y,
            &format_tick(value),
            theme,
            theme.axis_text_color.as_str(),
            "end",
        ));
    }
    out
}

/// Evenly spaced values on linear axes, powers of ten on log axes. Log axes
/// spanning less than a decade fall back to their end points.
fn tick_values(scale: &AxisScale) -> Vec<f64> {
    let (low, high) = scale.domain();
    match scale.mode() {
        ScaleMode::Linear => (0..LINEAR_TICKS)
            .map(|i| low + (high - low) * i as f64 / (LINEAR_TICKS - 1) as f64)
            .collect(),
        ScaleMode::Log => {
            let first = low.log10().ceil() as i32;
            let last = high.log10().floor() as i32;
            if last < first {
                return vec![low, high];
            }
            (first..=last).map(|exp| 10f64.powi(exp)).collect()
        }
    }
}

fn format_tick(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e9 {
        format!("{:.1}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}K", value / 1e3)
    } else if abs >= 10.0 || abs == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn text_svg(x: f32, y: f32, text: &str, theme: &Theme, fill: &str, anchor: &str) -> String {
    format!(
        "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"{anchor}\" dominant-baseline=\"central\" font-family=\"{}\" font-size=\"{}\" fill=\"{fill}\">{}</text>",
        escape_xml(&theme.font_family),
        theme.font_size,
        escape_xml(text)
    )
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
        .next()
        .map(|family| family.trim().trim_matches('"').to_string())
        .unwrap_or_else(|| "sans-serif".to_string());
    opt.fontdb_mut().load_system_fonts();
    if let Some(size) = usvg::Size::from_wh(render_cfg.width, render_cfg.height) {
        opt.default_size = size;
    }

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
