//! Owns everything a layout pass depends on and decides when to run one.
//!
//! Every input change bumps the generation and (re)arms a debounce
//! deadline; [`DeclutterOrchestrator::poll`] runs the pass once the inputs
//! have been quiet long enough. A pass works on an owned snapshot, so it can
//! be run elsewhere and handed back through [`DeclutterOrchestrator::commit`],
//! which drops results older than the latest request.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::config::{Config, Tolerances};
use crate::layout::{AxisSpec, LabelLayout, LayoutInput, compute_label_layout};
use crate::mapper::PlotRect;
use crate::model::{Axis, ChartSpec, MetricSpec, build_points};
use crate::scale::ScaleMode;
use crate::theme::Theme;

pub struct DeclutterOrchestrator {
    records: Arc<Vec<Value>>,
    chart: ChartSpec,
    zoom: f64,
    plot: Option<PlotRect>,
    tolerances: Tolerances,
    theme: Theme,
    /// Latest requested generation.
    generation: u64,
    /// Debounce deadline of the pending request, if any.
    pending: Option<Instant>,
    mounted: bool,
    layout: Arc<LabelLayout>,
    error: Option<String>,
}

/// Input snapshot of one layout pass.
#[derive(Debug, Clone)]
pub struct LayoutPass {
    pub generation: u64,
    records: Arc<Vec<Value>>,
    chart: ChartSpec,
    zoom: f64,
    plot: Option<PlotRect>,
    tolerances: Tolerances,
    theme: Theme,
}

impl LayoutPass {
    pub fn run(&self) -> LabelLayout {
        let points = build_points(&self.records, &self.chart);
        let (x_domain, y_domain) = self.chart.axis_domains(&points);
        compute_label_layout(&LayoutInput {
            generation: self.generation,
            points: &points,
            x_axis: AxisSpec::new(self.chart.x.scale, x_domain),
            y_axis: AxisSpec::new(self.chart.y.scale, y_domain),
            plot: self.plot,
            zoom: self.zoom,
            tolerances: &self.tolerances,
            theme: &self.theme,
        })
    }
}

impl DeclutterOrchestrator {
    pub fn new(chart: ChartSpec, config: &Config) -> Self {
        Self {
            records: Arc::new(Vec::new()),
            chart,
            zoom: 1.0,
            plot: None,
            tolerances: config.tolerances.clone().sanitized(),
            theme: config.theme.clone(),
            generation: 0,
            pending: None,
            mounted: false,
            layout: Arc::new(LabelLayout::empty(0, PlotRect::default())),
            error: None,
        }
    }

    /// Start reacting to changes. Schedules a first pass.
    pub fn mount(&mut self, plot: Option<PlotRect>, now: Instant) {
        self.mounted = true;
        self.plot = plot;
        self.request(now);
    }

    /// Stop reacting; cancels any pending pass and clears the published layout.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.pending = None;
        self.generation += 1;
        self.layout = Arc::new(LabelLayout::empty(
            self.generation,
            self.plot.unwrap_or_default(),
        ));
    }

    pub fn set_records(&mut self, records: Vec<Value>, now: Instant) {
        self.records = Arc::new(records);
        self.error = None;
        self.request(now);
    }

    /// Record an upstream load failure. Publishes an empty layout and holds
    /// off layout until new records arrive.
    pub fn set_load_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(error = %message, "data load failed, labels cleared");
        self.error = Some(message);
        self.pending = None;
        self.generation += 1;
        self.layout = Arc::new(LabelLayout::empty(
            self.generation,
            self.plot.unwrap_or_default(),
        ));
    }

    pub fn set_chart(&mut self, chart: ChartSpec, now: Instant) {
        if chart != self.chart {
            self.chart = chart;
            self.request(now);
        }
    }

    pub fn set_metric(&mut self, axis: Axis, metric: MetricSpec, now: Instant) {
        if *self.chart.metric(axis) != metric {
            *self.chart.metric_mut(axis) = metric;
            self.request(now);
        }
    }

    pub fn set_scale(&mut self, axis: Axis, scale: ScaleMode, now: Instant) {
        let metric = self.chart.metric_mut(axis);
        if metric.scale != scale {
            metric.scale = scale;
            self.request(now);
        }
    }

    /// Non-positive or non-finite factors are ignored.
    pub fn set_zoom(&mut self, zoom: f64, now: Instant) {
        if !zoom.is_finite() || zoom <= 0.0 {
            tracing::warn!(zoom, "ignoring invalid zoom factor");
            return;
        }
        if zoom != self.zoom {
            self.zoom = zoom;
            self.request(now);
        }
    }

    pub fn resize(&mut self, plot: Option<PlotRect>, now: Instant) {
        if plot != self.plot {
            self.plot = plot;
            self.request(now);
        }
    }

    /// Replace all tolerances at once.
    pub fn set_tolerances(&mut self, tolerances: Tolerances, now: Instant) {
        self.tolerances = tolerances.sanitized();
        self.request(now);
    }

    pub fn reset_tolerances(&mut self, now: Instant) {
        self.tolerances.reset_to_defaults();
        self.request(now);
    }

    pub fn set_theme(&mut self, theme: Theme, now: Instant) {
        self.theme = theme;
        self.request(now);
    }

    fn request(&mut self, now: Instant) {
        self.generation += 1;
        if self.mounted {
            self.pending = Some(now + Duration::from_millis(self.tolerances.debounce_ms));
        }
    }

    /// Run the pending pass if its debounce window has elapsed. Returns
    /// whether a new layout was published.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(deadline) if deadline <= now => self.flush(),
            _ => false,
        }
    }

    /// Run the pending pass now, ignoring the debounce window.
    pub fn flush(&mut self) -> bool {
        match self.begin_pass() {
            Some(pass) => {
                let layout = pass.run();
                self.commit(layout)
            }
            None => false,
        }
    }

    /// Take the pending request as a snapshot, or `None` if nothing should run.
    pub fn begin_pass(&mut self) -> Option<LayoutPass> {
        self.pending.take()?;
        if !self.mounted || self.error.is_some() {
            return None;
        }
        Some(LayoutPass {
            generation: self.generation,
            records: Arc::clone(&self.records),
            chart: self.chart.clone(),
            zoom: self.zoom,
            plot: self.plot,
            tolerances: self.tolerances.clone(),
            theme: self.theme.clone(),
        })
    }

    /// Publish `layout` unless a newer request has been made since its pass
    /// began.
    pub fn commit(&mut self, layout: LabelLayout) -> bool {
        if layout.generation < self.generation || !self.mounted {
            tracing::warn!(
                stale = layout.generation,
                latest = self.generation,
                "dropping stale layout"
            );
            return false;
        }
        self.layout = Arc::new(layout);
        true
    }

    pub fn layout(&self) -> Arc<LabelLayout> {
        Arc::clone(&self.layout)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn chart(&self) -> &ChartSpec {
        &self.chart
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chart() -> ChartSpec {
        ChartSpec::new(
            MetricSpec::new("pe", "pe"),
            MetricSpec::new("growth", "growth"),
            MetricSpec::new("cap", "cap").with_scale(ScaleMode::Log),
        )
    }

    fn records() -> Vec<Value> {
        vec![
            json!({"id": "1", "ticker": "AAA", "pe": 10.0, "growth": 0.1, "cap": 1e9}),
            json!({"id": "2", "ticker": "BBB", "pe": 25.0, "growth": 0.4, "cap": 5e10}),
            json!({"id": "3", "ticker": "CCC", "pe": 40.0, "growth": -0.2, "cap": 3e8}),
        ]
    }

    fn orchestrator() -> DeclutterOrchestrator {
        let mut config = Config::default();
        config.theme.fast_text_metrics = true;
        DeclutterOrchestrator::new(chart(), &config)
    }

    fn plot() -> Option<PlotRect> {
        Some(PlotRect::new(0.0, 0.0, 600.0, 400.0))
    }

    #[test]
    fn changes_are_debounced_into_one_pass() {
        let t0 = Instant::now();
        let mut orch = orchestrator();
        orch.mount(plot(), t0);
        orch.set_records(records(), t0 + Duration::from_millis(10));
        orch.set_zoom(1.5, t0 + Duration::from_millis(50));

        assert!(!orch.poll(t0 + Duration::from_millis(100)));
        assert!(orch.is_pending());
        assert!(orch.poll(t0 + Duration::from_millis(125)));
        assert!(!orch.is_pending());
        assert_eq!(orch.layout().generation, orch.generation());
        assert!(!orch.poll(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn stale_results_are_dropped() {
        let t0 = Instant::now();
        let mut orch = orchestrator();
        orch.mount(plot(), t0);
        orch.set_records(records(), t0);

        let pass = orch.begin_pass().expect("pending pass");
        orch.resize(Some(PlotRect::new(0.0, 0.0, 640.0, 400.0)), t0);
        assert!(!orch.commit(pass.run()));
        assert!(orch.layout().labels.is_empty());

        assert!(orch.flush());
        assert_eq!(orch.layout().labels.len(), 3);
    }

    #[test]
    fn load_error_short_circuits_layout() {
        let t0 = Instant::now();
        let mut orch = orchestrator();
        orch.mount(plot(), t0);
        orch.set_records(records(), t0);
        assert!(orch.flush());
        assert!(!orch.layout().labels.is_empty());

        orch.set_load_error("timeout");
        assert_eq!(orch.error(), Some("timeout"));
        assert!(orch.layout().labels.is_empty());
        orch.set_zoom(1.2, t0);
        assert!(!orch.flush());

        orch.set_records(records(), t0);
        assert!(orch.error().is_none());
        assert!(orch.flush());
        assert!(!orch.layout().labels.is_empty());
    }

    #[test]
    fn nothing_runs_before_mount_or_after_unmount() {
        let t0 = Instant::now();
        let mut orch = orchestrator();
        orch.set_records(records(), t0);
        assert!(!orch.is_pending());
        assert!(!orch.flush());

        orch.mount(plot(), t0);
        assert!(orch.flush());
        orch.unmount();
        assert!(orch.layout().labels.is_empty());
        orch.set_zoom(3.0, t0);
        assert!(!orch.flush());
    }

    #[test]
    fn zero_points_and_missing_plot_give_empty_layouts() {
        let t0 = Instant::now();
        let mut orch = orchestrator();
        orch.mount(plot(), t0);
        assert!(orch.flush());
        assert!(orch.layout().labels.is_empty());
        assert!(orch.error().is_none());

        orch.set_records(records(), t0);
        orch.resize(None, t0);
        assert!(orch.flush());
        assert!(orch.layout().labels.is_empty());
    }

    #[test]
    fn unchanged_inputs_do_not_schedule() {
        let t0 = Instant::now();
        let mut orch = orchestrator();
        orch.mount(plot(), t0);
        assert!(orch.flush());
        let generation = orch.generation();
        orch.resize(plot(), t0);
        orch.set_scale(Axis::Size, ScaleMode::Log, t0);
        orch.set_zoom(-1.0, t0);
        assert_eq!(orch.generation(), generation);
        assert!(!orch.is_pending());
    }

    fn labelled(orch: &DeclutterOrchestrator) -> Vec<String> {
        let mut ids: Vec<String> = orch.layout().labels.iter().map(|l| l.id.clone()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn scale_and_metric_changes_recompute() {
        let t0 = Instant::now();
        let mut config = Config::default();
        config.theme.fast_text_metrics = true;
        let chart = ChartSpec::new(
            MetricSpec::new("x", "x"),
            MetricSpec::new("y", "y"),
            MetricSpec::new("z", "z"),
        );
        let mut orch = DeclutterOrchestrator::new(chart, &config);
        orch.mount(plot(), t0);
        orch.set_records(
            vec![
                json!({"id": "1", "ticker": "POS", "x": 5.0, "d": 10.0, "y": 1.0, "z": 1.0}),
                json!({"id": "2", "ticker": "NEG", "x": -3.0, "d": 500.0, "y": 2.0, "z": 2.0}),
            ],
            t0,
        );
        assert!(orch.flush());
        assert_eq!(labelled(&orch), ["NEG", "POS"]);

        let generation = orch.generation();
        orch.set_scale(Axis::X, ScaleMode::Log, t0);
        assert!(orch.generation() > generation);
        assert!(orch.is_pending());
        assert!(orch.flush());
        assert_eq!(labelled(&orch), ["POS"]);
        assert_eq!(orch.layout().stats.points, 1);

        orch.set_metric(Axis::X, MetricSpec::new("d", "d").with_scale(ScaleMode::Log), t0);
        assert!(orch.flush());
        assert_eq!(labelled(&orch), ["NEG", "POS"]);
        assert_eq!(orch.chart().x.key, "d");
    }

    #[test]
    fn chart_and_theme_changes_schedule_a_pass() {
        let t0 = Instant::now();
        let mut orch = orchestrator();
        orch.mount(plot(), t0);
        orch.set_records(records(), t0);
        assert!(orch.flush());

        let generation = orch.generation();
        orch.set_chart(chart(), t0);
        assert_eq!(orch.generation(), generation);
        assert!(!orch.is_pending());

        let mut swapped = chart();
        std::mem::swap(&mut swapped.x, &mut swapped.y);
        orch.set_chart(swapped, t0);
        assert!(orch.is_pending());
        assert!(orch.flush());
        assert_eq!(orch.chart().x.key, "growth");
        assert_eq!(orch.layout().labels.len(), 3);

        let mut theme = orch.theme().clone();
        theme.font_size += 2.0;
        orch.set_theme(theme, t0);
        assert!(orch.is_pending());
        assert!(orch.flush());
        assert_eq!(orch.layout().generation, orch.generation());
    }

    #[test]
    fn reset_restores_default_tolerances() {
        let t0 = Instant::now();
        let mut orch = orchestrator();
        orch.set_tolerances(Tolerances::compact(), t0);
        assert_eq!(orch.tolerances(), &Tolerances::compact());
        orch.reset_tolerances(t0);
        assert_eq!(orch.tolerances(), &Tolerances::standard());
    }
}
