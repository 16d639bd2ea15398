/*!
 * thermstats_grab: CSV Export
 * ---------------------------
 * Copyright (C) 2025 Laurence Oberman <loberman@redhat.com>
 * License: GPL v3+
 */

use std::path::Path;

use crate::error::RenderError;
use crate::parse::ParsedSeries;

const HEADER: [&str; 5] = ["timestamp", "cpu_usage", "cpu_temp", "gpu_temp", "gpu_load"];

#[derive(serde::Serialize)]
struct CsvRow<'a> {
    timestamp: &'a str,
    cpu_usage: Option<f64>,
    cpu_temp: Option<f64>,
    gpu_temp: Option<f64>,
    gpu_load: Option<f64>,
}

/// Write the parsed table with a header row, even when there are no rows;
/// missing values are empty cells.
pub fn write_csv(series: &ParsedSeries, path: &Path) -> Result<(), RenderError> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    wtr.write_record(HEADER)?;
    for i in 0..series.len() {
        wtr.serialize(CsvRow {
            timestamp: &series.timestamp[i],
            cpu_usage: series.cpu_usage[i],
            cpu_temp: series.cpu_temp[i],
            gpu_temp: series.gpu_temp[i],
            gpu_load: series.gpu_load[i],
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_values_are_empty_cells() {
        let series = ParsedSeries {
            timestamp: vec!["2024-01-01 10:00:00".into(), "2024-01-01 10:00:20".into()],
            cpu_usage: vec![Some(42.0), Some(7.0)],
            cpu_temp: vec![Some(55.5), None],
            gpu_temp: vec![Some(60.0), None],
            gpu_load: vec![Some(30.0), None],
        };
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&series, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "timestamp,cpu_usage,cpu_temp,gpu_temp,gpu_load");
        assert_eq!(lines[1], "2024-01-01 10:00:00,42.0,55.5,60.0,30.0");
        assert_eq!(lines[2], "2024-01-01 10:00:20,7.0,,,");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn empty_series_still_has_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_csv(&ParsedSeries::default(), &path).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "timestamp,cpu_usage,cpu_temp,gpu_temp,gpu_load\n"
        );
    }
}
