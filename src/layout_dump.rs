use crate::layout::LabelLayout;
use crate::mapper::PlotRect;
use crate::model::ChartSpec;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Serializable snapshot of a published layout: the label descriptors the
/// rendering surface consumes, plus the anchors and pass counters.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub generation: u64,
    pub plot: PlotRect,
    pub x_axis: AxisDump,
    pub y_axis: AxisDump,
    pub labels: Vec<LabelDump>,
    pub points: Vec<PointDump>,
    pub stats: StatsDump,
}

#[derive(Debug, Serialize)]
pub struct AxisDump {
    pub metric: String,
    pub scale: String,
    /// Domain actually mapped, after zoom. `None` when nothing was mapped.
    pub domain: Option<[f64; 2]>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDump {
    pub id: String,
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub anchor_x: f32,
    pub anchor_y: f32,
    pub leader: bool,
}

#[derive(Debug, Serialize)]
pub struct PointDump {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub labelled: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsDump {
    pub points: usize,
    pub anchored: usize,
    pub culled: usize,
    pub suppressed: usize,
    pub labelled: usize,
}

impl LayoutDump {
    pub fn from_layout(layout: &LabelLayout, chart: &ChartSpec) -> Self {
        let x_axis = AxisDump {
            metric: chart.x.key.clone(),
            scale: chart.x.scale.name().to_string(),
            domain: layout.mapper.map(|m| {
                let (low, high) = m.x_scale().domain();
                [low, high]
            }),
        };
        let y_axis = AxisDump {
            metric: chart.y.key.clone(),
            scale: chart.y.scale.name().to_string(),
            domain: layout.mapper.map(|m| {
                let (low, high) = m.y_scale().domain();
                [low, high]
            }),
        };

        let labels = layout
            .labels
            .iter()
            .map(|label| LabelDump {
                id: label.id.clone(),
                text: label.text.clone(),
                x: label.x,
                y: label.y,
                width: label.width,
                height: label.height,
                anchor_x: label.anchor_x,
                anchor_y: label.anchor_y,
                leader: label.leader,
            })
            .collect();

        let points = layout
            .points
            .iter()
            .map(|point| PointDump {
                id: point.id.clone(),
                x: point.x,
                y: point.y,
                radius: point.radius,
                labelled: point.labelled,
            })
            .collect();

        LayoutDump {
            generation: layout.generation,
            plot: layout.plot,
            x_axis,
            y_axis,
            labels,
            points,
            stats: StatsDump {
                points: layout.stats.points,
                anchored: layout.stats.anchored,
                culled: layout.stats.culled,
                suppressed: layout.stats.suppressed,
                labelled: layout.labels.len(),
            },
        }
    }
}

/// Write the dump as pretty JSON to `path`, or stdout when `None`.
pub fn write_layout_dump(
    path: Option<&Path>,
    layout: &LabelLayout,
    chart: &ChartSpec,
) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout, chart);
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &dump)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, &dump)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{LayoutStats, PlacedLabel};
    use crate::model::MetricSpec;

    #[test]
    fn dump_serializes_label_descriptors() {
        let chart = ChartSpec::new(
            MetricSpec::new("pe", "pe"),
            MetricSpec::new("growth", "growth"),
            MetricSpec::new("cap", "cap"),
        );
        let mut layout = LabelLayout::empty(7, PlotRect::new(0.0, 0.0, 100.0, 80.0));
        layout.labels.push(PlacedLabel {
            id: "ACME-17".into(),
            text: "ACME".into(),
            x: 40.0,
            y: 20.0,
            width: 30.0,
            height: 16.0,
            anchor_x: 40.0,
            anchor_y: 36.0,
            leader: false,
        });
        layout.stats = LayoutStats {
            points: 2,
            anchored: 2,
            culled: 1,
            suppressed: 0,
        };

        let value = serde_json::to_value(LayoutDump::from_layout(&layout, &chart)).unwrap();
        assert_eq!(value["generation"], 7);
        assert_eq!(value["labels"][0]["id"], "ACME-17");
        assert_eq!(value["labels"][0]["anchorY"], 36.0);
        assert_eq!(value["stats"]["labelled"], 1);
        assert_eq!(value["xAxis"]["scale"], "linear");
        assert!(value["xAxis"]["domain"].is_null());
    }
}
