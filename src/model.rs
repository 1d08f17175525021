//! Chart inputs: metric selection, scatter points built from raw records.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, read_file};
use crate::scale::{AxisDomain, ScaleMode, compute_domain, normalize_values};

/// Display-only semantics of a metric. Never consulted by the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
    #[default]
    Neutral,
}

impl Direction {
    pub fn hint(self) -> Option<&'static str> {
        match self {
            Direction::HigherIsBetter => Some("higher is better"),
            Direction::LowerIsBetter => Some("lower is better"),
            Direction::Neutral => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSpec {
    pub key: String,
    /// Dotted path into a record, e.g. `"valuation.pe"`.
    pub path: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub scale: ScaleMode,
    #[serde(default)]
    pub direction: Direction,
    /// Domain reported by the rendering surface; computed from the data when absent.
    #[serde(default)]
    pub domain: Option<[f64; 2]>,
}

impl MetricSpec {
    pub fn new(key: &str, path: &str) -> Self {
        Self {
            key: key.to_string(),
            path: path.to_string(),
            label: None,
            scale: ScaleMode::Linear,
            direction: Direction::Neutral,
            domain: None,
        }
    }

    pub fn with_scale(mut self, scale: ScaleMode) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_domain(mut self, low: f64, high: f64) -> Self {
        self.domain = Some([low, high]);
        self
    }

    pub fn title(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.key)
    }

    /// The explicit domain when it is valid for the scale, otherwise a domain
    /// computed from `values`.
    pub fn axis_domain(&self, values: &[f64]) -> AxisDomain {
        self.domain
            .and_then(|[low, high]| AxisDomain::fixed(low, high, self.scale))
            .unwrap_or_else(|| compute_domain(values, self.scale))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Size,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    pub x: MetricSpec,
    pub y: MetricSpec,
    /// Bubble size metric.
    pub z: MetricSpec,
    #[serde(default = "default_label_path")]
    pub label_path: String,
    #[serde(default = "default_id_path")]
    pub id_path: String,
}

fn default_label_path() -> String {
    "ticker".to_string()
}

fn default_id_path() -> String {
    "id".to_string()
}

impl ChartSpec {
    pub fn new(x: MetricSpec, y: MetricSpec, z: MetricSpec) -> Self {
        Self {
            x,
            y,
            z,
            label_path: default_label_path(),
            id_path: default_id_path(),
        }
    }

    pub fn metric(&self, axis: Axis) -> &MetricSpec {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Size => &self.z,
        }
    }

    pub fn metric_mut(&mut self, axis: Axis) -> &mut MetricSpec {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Size => &mut self.z,
        }
    }

    /// Domains for the x and y axes, computed from the same filtered points
    /// that get mapped.
    pub fn axis_domains(&self, points: &[ScatterPoint]) -> (AxisDomain, AxisDomain) {
        let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
        (self.x.axis_domain(&xs), self.y.axis_domain(&ys))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    /// Unique within one build.
    pub id: String,
    pub label: String,
    pub source_id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub normalized_z: f64,
    /// Index of the source record.
    pub record: usize,
}

/// Read a numeric metric off `record` by dotted path. Missing, null and
/// non-numeric values are absent, never zero.
pub fn read_metric(record: &Value, path: &str) -> Option<f64> {
    match lookup(record, path)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub fn read_text(record: &Value, path: &str) -> Option<String> {
    match lookup(record, path)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = record;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    (!current.is_null()).then_some(current)
}

/// Build one scatter point per qualifying record.
///
/// A record is dropped when any of x/y/z is absent, non-finite, or
/// non-positive on a log axis.
pub fn build_points(records: &[Value], chart: &ChartSpec) -> Vec<ScatterPoint> {
    let mut points = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        let (Some(x), Some(y), Some(z)) = (
            read_metric(record, &chart.x.path),
            read_metric(record, &chart.y.path),
            read_metric(record, &chart.z.path),
        ) else {
            continue;
        };
        if !chart.x.scale.accepts(x) || !chart.y.scale.accepts(y) || !chart.z.scale.accepts(z) {
            continue;
        }
        let source_id = read_text(record, &chart.id_path).unwrap_or_else(|| idx.to_string());
        let label = read_text(record, &chart.label_path).unwrap_or_else(|| source_id.clone());
        points.push(ScatterPoint {
            id: String::new(),
            label,
            source_id,
            x,
            y,
            z,
            normalized_z: 0.0,
            record: idx,
        });
    }

    let zs: Vec<f64> = points.iter().map(|p| p.z).collect();
    for (point, nz) in points.iter_mut().zip(normalize_values(&zs, chart.z.scale)) {
        point.normalized_z = nz;
    }
    assign_unique_ids(&mut points);
    points
}

/// Labels shared by several points get the source identifier appended; any
/// remaining clash gets an ordinal.
fn assign_unique_ids(points: &mut [ScatterPoint]) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for point in points.iter() {
        *counts.entry(point.label.as_str()).or_default() += 1;
    }
    let ids: Vec<String> = points
        .iter()
        .map(|point| {
            if counts.get(point.label.as_str()).copied().unwrap_or(0) > 1 {
                format!("{}-{}", point.label, point.source_id)
            } else {
                point.label.clone()
            }
        })
        .collect();

    let mut taken: HashSet<String> = HashSet::new();
    for (point, id) in points.iter_mut().zip(ids) {
        let mut candidate = id.clone();
        let mut ordinal = 2;
        while taken.contains(&candidate) {
            candidate = format!("{id}-{ordinal}");
            ordinal += 1;
        }
        taken.insert(candidate.clone());
        point.id = candidate;
    }
}

/// On-disk input: chart selection plus raw records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFile {
    pub chart: ChartSpec,
    #[serde(default)]
    pub records: Vec<Value>,
}

pub fn load_data_file(path: &Path) -> Result<DataFile> {
    parse_data_file(&read_file(path)?)
}

pub fn parse_data_file(contents: &str) -> Result<DataFile> {
    Ok(serde_json::from_str(contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chart() -> ChartSpec {
        ChartSpec::new(
            MetricSpec::new("pe", "valuation.pe"),
            MetricSpec::new("growth", "growth"),
            MetricSpec::new("cap", "marketCap").with_scale(ScaleMode::Log),
        )
    }

    #[test]
    fn read_metric_follows_dotted_paths() {
        let record = json!({"valuation": {"pe": 12.5}, "list": [1, {"v": "3.5"}]});
        assert_eq!(read_metric(&record, "valuation.pe"), Some(12.5));
        assert_eq!(read_metric(&record, "list.1.v"), Some(3.5));
        assert_eq!(read_metric(&record, "valuation.missing"), None);
        assert_eq!(read_metric(&json!({"a": null}), "a"), None);
        assert_eq!(read_metric(&json!({"a": "n/a"}), "a"), None);
    }

    #[test]
    fn records_with_missing_or_invalid_metrics_are_dropped() {
        let records = vec![
            json!({"id": 1, "ticker": "AAA", "valuation": {"pe": 10}, "growth": 2, "marketCap": 100}),
            json!({"id": 2, "ticker": "BBB", "valuation": {"pe": null}, "growth": 2, "marketCap": 100}),
            json!({"id": 3, "ticker": "CCC", "valuation": {"pe": 12}, "growth": 3, "marketCap": 0}),
            json!({"id": 4, "ticker": "DDD", "valuation": {"pe": 14}, "growth": 4, "marketCap": 1000}),
        ];
        let points = build_points(&records, &chart());
        let ids: Vec<&str> = points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["AAA", "DDD"]);
        assert_eq!(points[0].normalized_z, 0.0);
        assert_eq!(points[1].normalized_z, 1.0);
        assert_eq!(points[1].record, 3);
    }

    #[test]
    fn duplicate_labels_are_disambiguated_by_source_id() {
        let records = vec![
            json!({"id": 17, "ticker": "ACME", "valuation": {"pe": 1}, "growth": 1, "marketCap": 1}),
            json!({"id": 42, "ticker": "ACME", "valuation": {"pe": 2}, "growth": 2, "marketCap": 2}),
            json!({"id": 5, "ticker": "ZETA", "valuation": {"pe": 3}, "growth": 3, "marketCap": 3}),
        ];
        let points = build_points(&records, &chart());
        let ids: Vec<&str> = points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["ACME-17", "ACME-42", "ZETA"]);
    }

    #[test]
    fn clashing_disambiguated_ids_get_an_ordinal() {
        let records = vec![
            json!({"id": 1, "ticker": "X", "valuation": {"pe": 1}, "growth": 1, "marketCap": 1}),
            json!({"id": 1, "ticker": "X", "valuation": {"pe": 2}, "growth": 2, "marketCap": 2}),
        ];
        let points = build_points(&records, &chart());
        assert_eq!(points[0].id, "X-1");
        assert_eq!(points[1].id, "X-1-2");
    }

    #[test]
    fn explicit_domain_overrides_computed_one() {
        let metric = MetricSpec::new("pe", "pe").with_domain(0.0, 50.0);
        assert_eq!(
            metric.axis_domain(&[3.0, 4.0]),
            AxisDomain::Fixed {
                low: 0.0,
                high: 50.0
            }
        );
        let invalid = MetricSpec::new("pe", "pe")
            .with_scale(ScaleMode::Log)
            .with_domain(0.0, 50.0);
        assert!(matches!(
            invalid.axis_domain(&[3.0, 4.0]),
            AxisDomain::Fixed { .. }
        ));
        assert_eq!(invalid.axis_domain(&[]), AxisDomain::Auto);
    }

    #[test]
    fn data_file_parses_chart_and_records() {
        let file = parse_data_file(
            r#"{
                "chart": {
                    "x": {"key": "pe", "path": "pe"},
                    "y": {"key": "roe", "path": "roe", "direction": "higherIsBetter"},
                    "z": {"key": "cap", "path": "cap", "scale": "log"}
                },
                "records": [{"ticker": "AAA", "pe": 1, "roe": 2, "cap": 3}]
            }"#,
        )
        .expect("parse");
        assert_eq!(file.chart.label_path, "ticker");
        assert_eq!(file.chart.y.direction, Direction::HigherIsBetter);
        assert_eq!(file.chart.z.scale, ScaleMode::Log);
        assert_eq!(file.records.len(), 1);
    }
}
