/*!
 * thermstats_grab: Analysis and Playback
 * --------------------------------------
 * Copyright (C) 2025 Laurence Oberman <loberman@redhat.com>
 * License: GPL v3+
 *
 * Analysis walks the log directory and writes one chart (and optionally one
 * CSV table) per `.log` file into the graph directory. Files are handled
 * one at a time and a failure on one file is reported and skipped.
 *
 * Playback prints one parsed log file as a table.
 */

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::*;

use crate::error::AnalyzeError;
use crate::export::write_csv;
use crate::parse::parse_log_file;
use crate::record::LOG_SUFFIX;
use crate::render::{output_path, Render};

#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    pub log_dir: PathBuf,
    pub graph_dir: PathBuf,
    /// Also write `<name>.csv` next to each chart
    pub csv: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub rendered: usize,
    pub failed: usize,
}

/// Parse and graph every `.log` file in the log directory, in directory
/// listing order.
pub fn analyze<R: Render>(config: &AnalyzeConfig, renderer: &R) -> Result<BatchSummary, AnalyzeError> {
    fs::create_dir_all(&config.graph_dir).map_err(|source| AnalyzeError::GraphDir {
        path: config.graph_dir.clone(),
        source,
    })?;
    let entries = fs::read_dir(&config.log_dir).map_err(|source| AnalyzeError::LogDir {
        path: config.log_dir.clone(),
        source,
    })?;

    info!(
        "Analyzing logs in {}\nOutput dir: {}",
        config.log_dir.display(),
        config.graph_dir.display()
    );

    let mut summary = BatchSummary::default();
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Unreadable directory entry in {}: {e}", config.log_dir.display());
                summary.failed += 1;
                continue;
            }
        };
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if !path.is_file() || !name.ends_with(LOG_SUFFIX) {
            continue;
        }

        info!("Processing log file: {name}");
        match process_file(config, renderer, &path, &name) {
            Ok(out) => {
                summary.rendered += 1;
                info!("Saved graph for {name} to {}", out.display());
            }
            Err(e) => {
                summary.failed += 1;
                error!("Skipping {name}: {e}");
            }
        }
    }

    info!(
        "Analysis done: {} graphs written, {} files failed",
        summary.rendered, summary.failed
    );
    Ok(summary)
}

fn process_file<R: Render>(
    config: &AnalyzeConfig,
    renderer: &R,
    path: &Path,
    name: &str,
) -> Result<PathBuf, AnalyzeError> {
    let series = parse_log_file(path)?;
    let out = renderer.render(&series, name)?;
    if config.csv {
        write_csv(&series, &output_path(&config.graph_dir, name, "csv"))?;
    }
    Ok(out)
}

fn cell(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.1}")).unwrap_or_else(|| "-".to_string())
}

/// Print a parsed log file, one row per sample.
pub fn playback<W: Write>(path: &Path, out: &mut W) -> Result<(), AnalyzeError> {
    let series = parse_log_file(path)?;
    if series.is_empty() {
        writeln!(out, "No samples found.")?;
        return Ok(());
    }

    writeln!(
        out,
        "{:<20} {:>8} {:>8} {:>8} {:>8}",
        "Timestamp", "CPU%", "CPU°C", "GPU°C", "GPU%"
    )?;
    for i in 0..series.len() {
        writeln!(
            out,
            "{:<20} {:>8} {:>8} {:>8} {:>8}",
            series.timestamp[i],
            cell(series.cpu_usage[i]),
            cell(series.cpu_temp[i]),
            cell(series.gpu_temp[i]),
            cell(series.gpu_load[i])
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::parse::ParsedSeries;
    use std::cell::RefCell;
    use tempfile::tempdir;

    const GOOD: &str = "Timestamp: 2024-01-01 10:00:00\n\
                        CPU Usage: 42%\n\
                        CPU Temperature: 55.5°C\n\
                        GPU 0 - RTX: \n\
                        \tTemperature: 60.0°C\n\
                        \tLoad: 30.0%\n\
                        ----------------------------------------\n\
                        Timestamp: 2024-01-01 10:00:21\n\
                        CPU Usage: 40%\n\
                        CPU Temperature: N/A°C\n\
                        ----------------------------------------\n";

    #[derive(Default)]
    struct RecordingRenderer {
        dir: PathBuf,
        fail_on: Option<&'static str>,
        seen: RefCell<Vec<(String, ParsedSeries)>>,
    }

    impl Render for RecordingRenderer {
        fn render(&self, series: &ParsedSeries, name: &str) -> Result<PathBuf, RenderError> {
            if self.fail_on == Some(name) {
                return Err(RenderError::Drawing("backend gone".into()));
            }
            self.seen.borrow_mut().push((name.to_string(), series.clone()));
            Ok(output_path(&self.dir, name, "png"))
        }
    }

    fn setup() -> (tempfile::TempDir, AnalyzeConfig) {
        let root = tempdir().unwrap();
        let config = AnalyzeConfig {
            log_dir: root.path().join("logs"),
            graph_dir: root.path().join("graphs"),
            csv: false,
        };
        fs::create_dir(&config.log_dir).unwrap();
        (root, config)
    }

    #[test]
    fn good_and_empty_logs_both_render() {
        let (_root, config) = setup();
        fs::write(config.log_dir.join("2024-01-01.log"), GOOD).unwrap();
        fs::write(config.log_dir.join("2024-01-02.log"), "").unwrap();
        fs::write(config.log_dir.join("notes.txt"), GOOD).unwrap();
        fs::create_dir(config.log_dir.join("old.log")).unwrap();

        let renderer = RecordingRenderer {
            dir: config.graph_dir.clone(),
            ..Default::default()
        };
        let summary = analyze(&config, &renderer).unwrap();
        assert_eq!(summary, BatchSummary { rendered: 2, failed: 0 });
        assert!(config.graph_dir.is_dir());

        let seen = renderer.seen.borrow();
        let good = &seen.iter().find(|(n, _)| n == "2024-01-01.log").unwrap().1;
        assert_eq!(good.len(), 2);
        assert_eq!(good.gpu_temp, vec![Some(60.0), None]);
        assert_eq!(good.cpu_temp, vec![Some(55.5), None]);
        let empty = &seen.iter().find(|(n, _)| n == "2024-01-02.log").unwrap().1;
        assert!(empty.is_empty());
    }

    #[test]
    fn unreadable_file_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let (_root, config) = setup();
        fs::write(config.log_dir.join("2024-01-01.log"), GOOD).unwrap();
        let locked = config.log_dir.join("2024-01-03.log");
        fs::write(&locked, GOOD).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::File::open(&locked).is_ok() {
            // running as root, permissions are not enforced
            return;
        }

        let renderer = RecordingRenderer {
            dir: config.graph_dir.clone(),
            ..Default::default()
        };
        let summary = analyze(&config, &renderer).unwrap();
        assert_eq!(summary, BatchSummary { rendered: 1, failed: 1 });
    }

    #[test]
    fn damaged_bytes_still_render() {
        let (_root, config) = setup();
        let mut bytes = GOOD.as_bytes().to_vec();
        bytes.extend_from_slice(b"Timestamp: 2024-01-01 10:00:42\nCPU Usage: 9\xff%\n");
        fs::write(config.log_dir.join("2024-01-01.log"), bytes).unwrap();

        let renderer = RecordingRenderer {
            dir: config.graph_dir.clone(),
            ..Default::default()
        };
        let summary = analyze(&config, &renderer).unwrap();
        assert_eq!(summary, BatchSummary { rendered: 1, failed: 0 });
        let seen = renderer.seen.borrow();
        assert_eq!(seen[0].1.len(), 3);
        assert_eq!(seen[0].1.cpu_usage, vec![Some(42.0), Some(40.0), None]);
    }

    #[test]
    fn render_failure_is_skipped() {
        let (_root, config) = setup();
        fs::write(config.log_dir.join("2024-01-01.log"), GOOD).unwrap();
        fs::write(config.log_dir.join("2024-01-02.log"), GOOD).unwrap();

        let renderer = RecordingRenderer {
            dir: config.graph_dir.clone(),
            fail_on: Some("2024-01-02.log"),
            ..Default::default()
        };
        let summary = analyze(&config, &renderer).unwrap();
        assert_eq!(summary, BatchSummary { rendered: 1, failed: 1 });
    }

    #[test]
    fn csv_written_next_to_chart() {
        let (_root, mut config) = setup();
        config.csv = true;
        fs::write(config.log_dir.join("2024-01-01.log"), GOOD).unwrap();
        let renderer = RecordingRenderer {
            dir: config.graph_dir.clone(),
            ..Default::default()
        };
        analyze(&config, &renderer).unwrap();
        let csv = fs::read_to_string(config.graph_dir.join("2024-01-01.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn missing_log_dir_is_error() {
        let root = tempdir().unwrap();
        let config = AnalyzeConfig {
            log_dir: root.path().join("nope"),
            graph_dir: root.path().join("graphs"),
            csv: false,
        };
        let renderer = RecordingRenderer::default();
        assert!(matches!(analyze(&config, &renderer), Err(AnalyzeError::LogDir { .. })));
    }

    #[test]
    fn playback_table() {
        let (_root, config) = setup();
        let path = config.log_dir.join("2024-01-01.log");
        fs::write(&path, GOOD).unwrap();

        let mut out = Vec::new();
        playback(&path, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Timestamp"));
        assert!(lines[1].starts_with("2024-01-01 10:00:00"));
        assert!(lines[1].contains("42.0") && lines[1].contains("60.0"));
        assert!(lines[2].ends_with('-'));
    }

    #[test]
    fn playback_empty_file() {
        let (_root, config) = setup();
        let path = config.log_dir.join("2024-01-02.log");
        fs::write(&path, "").unwrap();
        let mut out = Vec::new();
        playback(&path, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No samples found.\n");
    }
}
