/*!
 * thermstats_grab: Graphing
 * -------------------------
 * Copyright (C) 2025 Laurence Oberman <loberman@redhat.com>
 * License: GPL v3+
 *
 * Two stacked panels per log file: CPU usage/temperature on top, GPU
 * temperature/load below. Missing values are drawn as gaps.
 */

use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::error::RenderError;
use crate::parse::ParsedSeries;
use crate::record::LOG_SUFFIX;

const ORANGE: RGBColor = RGBColor(255, 165, 0);
const IMAGE_SIZE: (u32, u32) = (1000, 600);

/// Sink for parsed series. Returns the path written.
pub trait Render {
    fn render(&self, series: &ParsedSeries, name: &str) -> Result<PathBuf, RenderError>;
}

/// `<graph_dir>/<name without .log>.<ext>`
pub fn output_path(graph_dir: &Path, name: &str, ext: &str) -> PathBuf {
    let stem = name.strip_suffix(LOG_SUFFIX).unwrap_or(name);
    graph_dir.join(format!("{stem}.{ext}"))
}

pub struct PngRenderer {
    graph_dir: PathBuf,
}

impl PngRenderer {
    pub fn new(graph_dir: impl Into<PathBuf>) -> Self {
        Self {
            graph_dir: graph_dir.into(),
        }
    }
}

impl Render for PngRenderer {
    fn render(&self, series: &ParsedSeries, name: &str) -> Result<PathBuf, RenderError> {
        let path = output_path(&self.graph_dir, name, "png");
        {
            let root = BitMapBackend::new(&path, IMAGE_SIZE).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;
            let panels = root.split_evenly((2, 1));

            draw_panel(
                &panels[0],
                &format!("CPU Usage and Temperature - {name}"),
                &series.timestamp,
                [
                    (series.cpu_usage.as_slice(), "CPU Usage (%)", BLUE),
                    (series.cpu_temp.as_slice(), "CPU Temperature (°C)", RED),
                ],
            )?;
            draw_panel(
                &panels[1],
                &format!("GPU Usage and Temperature - {name}"),
                &series.timestamp,
                [
                    (series.gpu_temp.as_slice(), "GPU Temperature (°C)", GREEN),
                    (series.gpu_load.as_slice(), "GPU Load (%)", ORANGE),
                ],
            )?;

            root.present().map_err(draw_err)?;
        }
        Ok(path)
    }
}

fn draw_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Drawing(e.to_string())
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    caption: &str,
    timestamps: &[String],
    lines: [(&[Option<f64>], &str, RGBColor); 2],
) -> Result<(), RenderError> {
    let x_max = timestamps.len().saturating_sub(1).max(1);
    let (y_min, y_max) = y_range(lines.iter().map(|(values, _, _)| *values));

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 20))
        .margin(12)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(0..x_max, y_min..y_max)
        .map_err(draw_err)?;

    // rows come from one day, so the clock time is enough on the axis
    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&|idx| {
            timestamps
                .get(*idx)
                .and_then(|ts| ts.rsplit(' ').next())
                .unwrap_or_default()
                .to_string()
        })
        .x_desc("Time (HH:MM:SS)")
        .y_desc("Percentage / Temperature (°C)")
        .draw()
        .map_err(draw_err)?;

    for (values, label, color) in lines {
        // empty series carries the legend entry even when every value is missing
        chart
            .draw_series(LineSeries::new(std::iter::empty::<(usize, f64)>(), &color))
            .map_err(draw_err)?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));

        for run in runs(values) {
            if run.len() == 1 {
                chart
                    .draw_series(std::iter::once(Circle::new(run[0], 2, color.filled())))
                    .map_err(draw_err)?;
            } else {
                chart
                    .draw_series(LineSeries::new(run, &color))
                    .map_err(draw_err)?;
            }
        }
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(draw_err)?;
    Ok(())
}

/// Value axis: at least 0..100, widened by 5% to fit readings outside it
/// (some hwmon drivers report below zero).
fn y_range<'a>(columns: impl Iterator<Item = &'a [Option<f64>]>) -> (f64, f64) {
    let (lo, hi) = columns
        .flat_map(|values| values.iter().flatten().copied())
        .fold((0.0_f64, 100.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    (lo * 1.05, hi * 1.05)
}

/// Split a column into contiguous runs of present values, indexed by row.
fn runs(values: &[Option<f64>]) -> Vec<Vec<(usize, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (i, v) in values.iter().enumerate() {
        match v {
            Some(v) => current.push((i, *v)),
            None if !current.is_empty() => out.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_name_strips_log_suffix() {
        let dir = Path::new("graphs");
        assert_eq!(output_path(dir, "2024-01-01.log", "png"), PathBuf::from("graphs/2024-01-01.png"));
        assert_eq!(output_path(dir, "notes", "png"), PathBuf::from("graphs/notes.png"));
        assert_eq!(output_path(dir, "a.log.log", "csv"), PathBuf::from("graphs/a.log.csv"));
    }

    #[test]
    fn gaps_split_runs() {
        let v = [Some(1.0), Some(2.0), None, None, Some(3.0), None, Some(4.0), Some(5.0)];
        assert_eq!(
            runs(&v),
            vec![
                vec![(0, 1.0), (1, 2.0)],
                vec![(4, 3.0)],
                vec![(6, 4.0), (7, 5.0)],
            ]
        );
    }

    #[test]
    fn value_axis_covers_negative_readings() {
        let cpu = [Some(-8.0), None, Some(40.0)];
        let gpu = [Some(120.0)];
        let (lo, hi) = y_range([&cpu[..], &gpu[..]].into_iter());
        assert!(lo <= -8.0 && lo < 0.0);
        assert!(hi >= 120.0);

        let (lo, hi) = y_range([&[None, Some(30.0)][..]].into_iter());
        assert_eq!(lo, 0.0);
        assert!((hi - 105.0).abs() < 1e-9);
    }

    #[test]
    fn all_missing_has_no_runs() {
        assert!(runs(&[None, None, None]).is_empty());
        assert!(runs(&[]).is_empty());
    }
}
