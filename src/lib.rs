#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod layout;
pub mod layout_dump;
pub mod mapper;
pub mod model;
pub mod orchestrator;
pub mod render;
pub mod scale;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, RenderConfig, Tolerances, load_config};
pub use error::{DeclutterError, Result};
pub use layout::{LabelLayout, PlacedLabel, compute_label_layout};
pub use mapper::{CoordinateMapper, PlotRect};
pub use model::{ChartSpec, DataFile, MetricSpec, ScatterPoint, build_points};
pub use orchestrator::DeclutterOrchestrator;
pub use scale::{AxisDomain, ScaleMode, compute_domain, normalize_values};
pub use theme::Theme;

use std::time::Instant;

/// Lay out labels for `data` in one pass, on the plot rectangle derived from
/// `config.render`. `zoom` of 1 shows the full domain.
pub fn declutter(data: &DataFile, config: &Config, zoom: f64) -> LabelLayout {
    let now = Instant::now();
    let mut orchestrator = DeclutterOrchestrator::new(data.chart.clone(), config);
    orchestrator.mount(Some(config.render.plot_rect()), now);
    orchestrator.set_zoom(zoom, now);
    orchestrator.set_records(data.records.clone(), now);
    orchestrator.flush();
    (*orchestrator.layout()).clone()
}
