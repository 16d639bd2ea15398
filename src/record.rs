/*!
 * thermstats_grab: Log Record Format
 * ----------------------------------
 * Copyright (C) 2025 Laurence Oberman <loberman@redhat.com>
 * License: GPL v3+
 *
 * One sample is written as a fixed multi-line text block:
 *
 *   Timestamp: 2024-01-01 10:00:00
 *   CPU Usage: 42%
 *   CPU Temperature: 55.5°C
 *   GPU 0 - RTX:
 *   \tTemperature: 60.0°C
 *   \tLoad: 30.0%
 *   ----------------------------------------
 *
 * The GPU block repeats once per device (zero or more times).
 */

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};

/// Timestamp layout used inside a record.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Daily log file name layout.
pub const LOG_DATE_FORMAT: &str = "%Y-%m-%d";
pub const LOG_SUFFIX: &str = ".log";
/// Record terminator line (40 dashes).
pub const SEPARATOR: &str = "----------------------------------------";

/// One GPU device reading.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuReading {
    pub id: u32,
    pub name: String,
    /// Degrees Celsius
    pub temperature: f64,
    /// Percent 0-100
    pub load: f64,
}

/// One sampling event.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: NaiveDateTime,
    /// Percent 0-100, averaged over the sampling window
    pub cpu_usage: f64,
    /// None when the sensor is unavailable
    pub cpu_temperature: Option<f64>,
    pub gpus: Vec<GpuReading>,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Timestamp: {}", self.timestamp.format(TIMESTAMP_FORMAT))?;
        writeln!(f, "CPU Usage: {:.0}%", self.cpu_usage.clamp(0.0, 100.0))?;
        match self.cpu_temperature {
            Some(t) => writeln!(f, "CPU Temperature: {:.1}°C", t)?,
            None => writeln!(f, "CPU Temperature: N/A°C")?,
        }
        for gpu in &self.gpus {
            // trailing space after the colon is part of the format
            writeln!(f, "GPU {} - {}: ", gpu.id, gpu.name)?;
            writeln!(f, "\tTemperature: {:.1}°C", gpu.temperature)?;
            writeln!(f, "\tLoad: {:.1}%", gpu.load)?;
        }
        writeln!(f, "{}", SEPARATOR)
    }
}

/// `<log_dir>/YYYY-MM-DD.log` for the given calendar day.
pub fn log_path_for(log_dir: &Path, day: NaiveDate) -> PathBuf {
    log_dir.join(format!("{}{}", day.format(LOG_DATE_FORMAT), LOG_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
    }

    #[test]
    fn cpu_only_record_layout() {
        let rec = LogRecord {
            timestamp: ts("2024-01-01 10:00:00"),
            cpu_usage: 42.0,
            cpu_temperature: Some(55.5),
            gpus: vec![],
        };
        assert_eq!(
            rec.to_string(),
            "Timestamp: 2024-01-01 10:00:00\n\
             CPU Usage: 42%\n\
             CPU Temperature: 55.5°C\n\
             ----------------------------------------\n"
        );
    }

    #[test]
    fn missing_cpu_temperature_is_na() {
        let rec = LogRecord {
            timestamp: ts("2024-01-01 10:00:20"),
            cpu_usage: 3.4,
            cpu_temperature: None,
            gpus: vec![],
        };
        let text = rec.to_string();
        assert!(text.contains("CPU Usage: 3%\n"));
        assert!(text.contains("CPU Temperature: N/A°C\n"));
    }

    #[test]
    fn gpu_blocks_repeat_per_device() {
        let rec = LogRecord {
            timestamp: ts("2024-01-01 10:00:00"),
            cpu_usage: 10.0,
            cpu_temperature: Some(40.0),
            gpus: vec![
                GpuReading { id: 0, name: "RTX".into(), temperature: 60.0, load: 30.0 },
                GpuReading { id: 1, name: "Tesla T4".into(), temperature: 48.3, load: 0.0 },
            ],
        };
        let text = rec.to_string();
        assert!(text.contains("GPU 0 - RTX: \n\tTemperature: 60.0°C\n\tLoad: 30.0%\n"));
        assert!(text.contains("GPU 1 - Tesla T4: \n\tTemperature: 48.3°C\n\tLoad: 0.0%\n"));
        assert!(text.ends_with(&format!("{}\n", SEPARATOR)));
        assert_eq!(SEPARATOR.len(), 40);
    }

    #[test]
    fn daily_file_name() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            log_path_for(Path::new("logs"), day),
            PathBuf::from("logs/2024-03-09.log")
        );
    }
}
