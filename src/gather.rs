/*!
 * thermstats_grab: Gather Mode
 * ----------------------------
 * Copyright (C) 2025 Laurence Oberman <loberman@redhat.com>
 * License: GPL v3+
 *
 * Samples CPU usage/temperature and GPU temperature/load at a fixed interval
 * and appends one text record per sample to `<log_dir>/YYYY-MM-DD.log`.
 * Sensor failures degrade to absent values; the loop only ends when the
 * shutdown future resolves.
 */

use std::fs::{self, OpenOptions};
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tracing::*;

use crate::error::{GatherError, SensorError};
use crate::record::{log_path_for, LogRecord};
use crate::sensors::Sensors;

pub const DEFAULT_INTERVAL_SECS: u64 = 20;
/// Window over which CPU usage is averaged
pub const USAGE_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct GatherConfig {
    pub log_dir: PathBuf,
    /// Pause between the end of one sample and the start of the next
    pub interval: Duration,
    pub usage_window: Duration,
}

pub struct Sampler<S: Sensors> {
    config: GatherConfig,
    sensors: S,
}

impl<S: Sensors> Sampler<S> {
    pub fn new(config: GatherConfig, sensors: S) -> Self {
        Self { config, sensors }
    }

    /// Take one reading of every sensor. Returns `None` only when CPU usage
    /// itself could not be read, since a record without it is meaningless.
    pub async fn sample(&mut self, timestamp: NaiveDateTime) -> Option<LogRecord> {
        let cpu_temperature = match self.sensors.cpu_temperature() {
            Ok(t) => t,
            Err(e) => {
                warn!("Error getting CPU temperature: {e}");
                None
            }
        };

        let cpu_usage = match self.sensors.cpu_usage(self.config.usage_window).await {
            Ok(u) => u,
            Err(e) => {
                warn!("Error getting CPU usage, skipping sample: {e}");
                return None;
            }
        };

        let gpus = match self.sensors.gpus().await {
            Ok(g) => g,
            Err(SensorError::Unavailable(reason)) => {
                debug!("No GPU info: {reason}");
                Vec::new()
            }
            Err(e) => {
                warn!("Error getting GPU info: {e}");
                Vec::new()
            }
        };

        Some(LogRecord {
            timestamp,
            cpu_usage,
            cpu_temperature,
            gpus,
        })
    }

    /// Append the record as one write to the log file for its calendar day.
    pub fn append(&self, record: &LogRecord) -> Result<PathBuf, GatherError> {
        let path = log_path_for(&self.config.log_dir, record.timestamp.date());
        let entry = record.to_string();
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut f| f.write_all(entry.as_bytes()))
            .map_err(|source| GatherError::Append {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    /// Sample until `shutdown` resolves. A sample in progress is always
    /// finished and written before shutdown is observed.
    /// Returns the number of records written.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<u64, GatherError>
    where
        F: Future<Output = ()>,
    {
        fs::create_dir_all(&self.config.log_dir).map_err(|source| GatherError::LogDir {
            path: self.config.log_dir.clone(),
            source,
        })?;

        let host = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknownhost".to_string());
        info!(
            "thermstats_grab gathering on {host}: writing to {}, interval {} seconds",
            self.config.log_dir.display(),
            self.config.interval.as_secs_f64()
        );

        tokio::pin!(shutdown);
        let mut written = 0u64;
        loop {
            let now = Local::now().naive_local();
            if let Some(record) = self.sample(now).await {
                match self.append(&record) {
                    Ok(path) => {
                        written += 1;
                        debug!(
                            "Wrote sample {} ({} GPUs) to {}",
                            written,
                            record.gpus.len(),
                            path.display()
                        );
                    }
                    Err(e) => error!("{e}"),
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                _ = &mut shutdown => break,
            }
        }

        info!("Gathering stopped after {written} samples");
        Ok(written)
    }
}
