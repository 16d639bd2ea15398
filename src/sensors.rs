/*!
 * thermstats_grab: Host Sensors
 * -----------------------------
 * Copyright (C) 2025 Laurence Oberman <loberman@redhat.com>
 * License: GPL v3+
 *
 * CPU usage comes from sysinfo, CPU temperature from the coretemp hwmon
 * device under /sys/class/hwmon, GPU readings from nvidia-smi.
 */

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use sysinfo::System;
use tokio::process::Command;
use tracing::*;

use crate::error::SensorError;
use crate::record::GpuReading;

const HWMON_ROOT: &str = "/sys/class/hwmon";
/// hwmon driver names that report CPU package/core temperatures
const CPU_HWMON_NAMES: &[&str] = &["coretemp", "k10temp"];
const NVIDIA_SMI: &str = "nvidia-smi";

/// Source of raw readings for the sampler.
#[async_trait]
pub trait Sensors: Send + Sync {
    /// Average usage over `window`, percent.
    async fn cpu_usage(&mut self, window: Duration) -> Result<f64, SensorError>;

    /// `Ok(None)` when the host has no usable temperature sensor.
    fn cpu_temperature(&self) -> Result<Option<f64>, SensorError>;

    async fn gpus(&self) -> Result<Vec<GpuReading>, SensorError>;
}

pub struct HostSensors {
    sys: System,
    hwmon_root: PathBuf,
    nvidia_smi: String,
}

impl HostSensors {
    pub fn new() -> Self {
        Self {
            sys: System::new(),
            hwmon_root: PathBuf::from(HWMON_ROOT),
            nvidia_smi: NVIDIA_SMI.to_string(),
        }
    }
}

impl Default for HostSensors {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sensors for HostSensors {
    async fn cpu_usage(&mut self, window: Duration) -> Result<f64, SensorError> {
        self.sys.refresh_cpu_usage();
        tokio::time::sleep(window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL)).await;
        self.sys.refresh_cpu_usage();
        Ok(self.sys.global_cpu_usage() as f64)
    }

    fn cpu_temperature(&self) -> Result<Option<f64>, SensorError> {
        read_cpu_temperature(&self.hwmon_root)
    }

    async fn gpus(&self) -> Result<Vec<GpuReading>, SensorError> {
        let output = Command::new(&self.nvidia_smi)
            .arg("--query-gpu=index,name,temperature.gpu,utilization.gpu")
            .arg("--format=csv,noheader,nounits")
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => SensorError::Unavailable(format!("{} not found", self.nvidia_smi)),
                _ => SensorError::Io(e),
            })?;

        if !output.status.success() {
            return Err(SensorError::QueryFailed(format!(
                "{} exited with {}: {}",
                self.nvidia_smi,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| SensorError::QueryFailed(format!("non UTF-8 output: {e}")))?;
        Ok(parse_nvidia_smi(&stdout))
    }
}

/// Scan hwmon devices for a CPU temperature driver and return its first
/// `tempN_input` in degrees Celsius.
fn read_cpu_temperature(hwmon_root: &Path) -> Result<Option<f64>, SensorError> {
    let entries = match fs::read_dir(hwmon_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut devices: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    devices.sort();

    for dev in devices {
        let name = match fs::read_to_string(dev.join("name")) {
            Ok(n) => n,
            Err(_) => continue,
        };
        if !CPU_HWMON_NAMES.contains(&name.trim()) {
            continue;
        }
        if let Some(input) = first_temp_input(&dev)? {
            let raw = fs::read_to_string(&input)?;
            let millideg: i64 = raw.trim().parse().map_err(|_| {
                SensorError::QueryFailed(format!("bad value {:?} in {}", raw.trim(), input.display()))
            })?;
            return Ok(Some(millideg as f64 / 1000.0));
        }
    }
    Ok(None)
}

/// Lowest-numbered `tempN_input` in a hwmon directory (temp1 is the package sensor).
fn first_temp_input(dev: &Path) -> Result<Option<PathBuf>, SensorError> {
    let mut best: Option<(u32, PathBuf)> = None;
    for entry in fs::read_dir(dev)?.flatten() {
        let fname = entry.file_name();
        let idx = match fname
            .to_str()
            .and_then(|s| s.strip_prefix("temp"))
            .and_then(|s| s.strip_suffix("_input"))
            .and_then(|s| s.parse::<u32>().ok())
        {
            Some(i) => i,
            None => continue,
        };
        if best.as_ref().is_none_or(|(b, _)| idx < *b) {
            best = Some((idx, entry.path()));
        }
    }
    Ok(best.map(|(_, p)| p))
}

/// Parse `index, name, temperature.gpu, utilization.gpu` rows.
/// Rows with unsupported fields (`[N/A]`) are skipped.
pub fn parse_nvidia_smi(output: &str) -> Vec<GpuReading> {
    let mut gpus = Vec::new();
    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        // Split index off the front and the two numbers off the back so
        // device names containing commas survive.
        let Some((index, rest)) = line.split_once(',') else {
            warn!("Skipping nvidia-smi row: {line:?}");
            continue;
        };
        let mut tail = rest.rsplitn(3, ',');
        let (Some(load), Some(temp), Some(name)) = (tail.next(), tail.next(), tail.next()) else {
            warn!("Skipping nvidia-smi row: {line:?}");
            continue;
        };
        match (
            index.trim().parse::<u32>(),
            temp.trim().parse::<f64>(),
            load.trim().parse::<f64>(),
        ) {
            (Ok(id), Ok(temperature), Ok(load)) => gpus.push(GpuReading {
                id,
                name: name.trim().to_string(),
                temperature,
                load,
            }),
            _ => warn!("Skipping nvidia-smi row: {line:?}"),
        }
    }
    gpus
}
