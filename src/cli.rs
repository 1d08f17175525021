use crate::config::load_config_with_preset;
use crate::declutter;
use crate::layout_dump::write_layout_dump;
use crate::model::{DataFile, load_data_file, parse_data_file};
#[cfg(feature = "png")]
use crate::render::write_output_png;
use crate::render::{render_svg, write_output_svg};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "declutter",
    version,
    about = "Place non-overlapping labels on a scatter/bubble chart"
)]
pub struct Args {
    /// Input data file (JSON: { chart, records }) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for SVG and JSON if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config file (JSON5: preset, tolerances, themeVariables, render)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Zoom factor applied to both axes about their centre
    #[arg(long = "zoom", default_value_t = 1.0)]
    pub zoom: f64,

    /// Tolerance preset, replacing the config file's preset. The file's
    /// `tolerances` overrides still apply on top.
    #[arg(long = "preset")]
    pub preset: Option<String>,

    /// More logging (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Json,
    #[cfg(feature = "png")]
    Png,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config_with_preset(args.config.as_deref(), args.preset.as_deref())?;
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }

    let data = read_input(args.input.as_deref())?;
    let layout = declutter(&data, &config, args.zoom);
    tracing::info!(
        labels = layout.labels.len(),
        points = layout.stats.points,
        culled = layout.stats.culled,
        suppressed = layout.stats.suppressed,
        "layout complete"
    );

    match args.output_format {
        OutputFormat::Svg => {
            let svg = render_svg(&layout, &data.chart, &config.theme, &config.render);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Json => {
            write_layout_dump(args.output.as_deref(), &layout, &data.chart)?;
        }
        #[cfg(feature = "png")]
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let svg = render_svg(&layout, &data.chart, &config.theme, &config.render);
            write_output_png(&svg, &output, &config.render, &config.theme)?;
        }
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<DataFile> {
    match path {
        Some(path) if path != Path::new("-") => Ok(load_data_file(path)?),
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read data from stdin")?;
            Ok(parse_data_file(&buf)?)
        }
    }
}

#[cfg(feature = "png")]
fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::{ChartSpec, MetricSpec};
    use serde_json::json;

    #[test]
    fn parses_short_flags() {
        let args = Args::try_parse_from([
            "declutter", "-i", "data.json", "-e", "json", "-w", "640", "-H", "480", "--zoom", "2",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.input.as_deref(), Some(Path::new("data.json")));
        assert_eq!(args.output_format, OutputFormat::Json);
        assert_eq!(args.width, Some(640.0));
        assert_eq!(args.height, Some(480.0));
        assert_eq!(args.zoom, 2.0);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn declutter_runs_the_full_pipeline() {
        let data = DataFile {
            chart: ChartSpec::new(
                MetricSpec::new("x", "x"),
                MetricSpec::new("y", "y"),
                MetricSpec::new("z", "z"),
            ),
            records: vec![
                json!({"id": "a", "ticker": "AAA", "x": 1.0, "y": 2.0, "z": 3.0}),
                json!({"id": "b", "ticker": "BBB", "x": 5.0, "y": 1.0, "z": 9.0}),
                json!({"id": "c", "ticker": "CCC", "x": null, "y": 1.0, "z": 9.0}),
            ],
        };
        let mut config = Config::default();
        config.theme.fast_text_metrics = true;
        let layout = declutter(&data, &config, 1.0);
        assert_eq!(layout.stats.points, 2);
        assert_eq!(layout.labels.len(), 2);
    }
}
