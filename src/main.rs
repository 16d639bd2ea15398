/*!
 * thermstats_grab: CPU/GPU Thermal and Load Telemetry Capture & Graphing Tool
 * --------------------------------------------------------------------------------
 * Copyright (C) 2025 Laurence Oberman <loberman@redhat.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <http://www.gnu.org/licenses/>.
 *
 * --------------------------------------------------------------------------------
 * DESCRIPTION:
 *
 * `thermstats_grab` samples CPU usage, CPU temperature and per-GPU
 * temperature/load at a fixed interval and appends human-readable records
 * to one log file per day. Analysis mode parses those logs back into
 * time-series and draws a CPU/GPU chart per day.
 *
 * FEATURES:
 *  - Gather mode writes `<log-dir>/YYYY-MM-DD.log`, one text block per sample.
 *  - Missing sensors (no coretemp, no nvidia-smi) are recorded as N/A or
 *    omitted, never stop the capture.
 *  - Analysis mode writes `<graph-dir>/<day>.png` (and `.csv` with --csv),
 *    skipping any log file it cannot read.
 *  - Playback mode prints one day's samples as a table.
 *
 * USAGE:
 *    thermstats_grab -g [-i <interval_seconds>]     # Gather mode (Ctrl-C to stop)
 *    thermstats_grab -a [--csv]                     # Analysis mode (graphs)
 *    thermstats_grab -p <logfile>                   # Playback a day's samples
 *
 * AUTHOR:
 *    Laurence Oberman <loberman@redhat.com>
 */

mod analyze;
mod cli;
mod error;
mod export;
mod gather;
mod logger;
mod parse;
mod record;
mod render;
mod sensors;

use anyhow::Context;
use clap::Parser;
use tracing::*;

use crate::analyze::{analyze, playback};
use crate::cli::{Cli, Mode};
use crate::gather::Sampler;
use crate::render::PngRenderer;
use crate::sensors::HostSensors;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose).context("Failed to set up logging")?;

    match cli.mode() {
        Mode::Gather(config) => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to start runtime")?;
            runtime.block_on(async {
                let mut sampler = Sampler::new(config, HostSensors::new());
                sampler.run(shutdown_signal()).await
            })?;
        }
        Mode::Analyze(config) => {
            let renderer = PngRenderer::new(config.graph_dir.clone());
            let summary = analyze(&config, &renderer)?;
            if summary.failed > 0 {
                warn!("{} log file(s) could not be graphed", summary.failed);
            }
        }
        Mode::Playback(file) => {
            let mut out = std::io::stdout().lock();
            playback(&file, &mut out).with_context(|| format!("Failed to play back {}", file.display()))?;
        }
    }
    Ok(())
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Interrupt received, stopping"),
        Err(e) => {
            error!("Unable to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await
        }
    }
}
