//! Loss curve rendering with plotters' SVG backend.

use std::path::{Path, PathBuf};

use anyhow::Context;
use plotters::prelude::*;

use crate::report::sink::LossPlotSink;
use crate::training::history::LossHistory;

const PLOT_TITLE: &str = "Change of Loss Over Iterations";
const PLOT_SIZE: (u32, u32) = (960, 600);

fn plot_error(e: impl std::fmt::Display) -> anyhow::Error {
    anyhow::anyhow!("loss plot rendering failed: {e}")
}

/// `(epoch, loss)` points, skipping non-finite losses.
fn points(series: &[f64]) -> Vec<(f64, f64)> {
    series
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, &v)| (i as f64, v))
        .collect()
}

/// Y range covering every finite loss, padded so a flat series stays visible.
fn y_range(history: &LossHistory) -> (f64, f64) {
    let (lo, hi) = history
        .critic
        .iter()
        .chain(history.generator.iter())
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return (-1.0, 1.0);
    }
    let pad = ((hi - lo) * 0.05).max(1e-3);
    (lo - pad, hi + pad)
}

/// Render the critic and generator loss curves as an SVG document.
pub fn render_loss_svg(history: &LossHistory) -> anyhow::Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, PLOT_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(plot_error)?;

        let x_max = history.len().max(2) as f64 - 1.0;
        let (y_min, y_max) = y_range(history);

        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(PLOT_TITLE, ("sans-serif", 24))
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(0f64..x_max, y_min..y_max)
            .map_err(plot_error)?;

        chart
            .configure_mesh()
            .x_desc("Iteration")
            .y_desc("Loss")
            .draw()
            .map_err(plot_error)?;

        chart
            .draw_series(LineSeries::new(points(&history.critic), &BLUE))
            .map_err(plot_error)?
            .label("Discriminator Loss")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

        chart
            .draw_series(LineSeries::new(points(&history.generator), &RED))
            .map_err(plot_error)?
            .label("Generator Loss")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(plot_error)?;

        root.present().map_err(plot_error)?;
    }
    Ok(svg)
}

/// Writes `losses.svg` and `losses.json` into a directory.
#[derive(Debug, Clone)]
pub struct SvgLossPlot {
    svg_path: PathBuf,
    json_path: PathBuf,
}

impl SvgLossPlot {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            svg_path: dir.join("losses.svg"),
            json_path: dir.join("losses.json"),
        }
    }

    pub fn svg_path(&self) -> &Path {
        &self.svg_path
    }

    pub fn json_path(&self) -> &Path {
        &self.json_path
    }
}

impl LossPlotSink for SvgLossPlot {
    fn plot(&mut self, history: &LossHistory) -> anyhow::Result<()> {
        history.write_json(&self.json_path)?;

        let svg = render_loss_svg(history)?;
        std::fs::write(&self.svg_path, svg)
            .with_context(|| format!("failed to write loss plot {}", self.svg_path.display()))?;

        tracing::info!(
            epochs = history.len(),
            svg = %self.svg_path.display(),
            json = %self.json_path.display(),
            "Saved loss history"
        );
        Ok(())
    }
}
