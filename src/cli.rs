/*!
 * thermstats_grab: Command Line
 * -----------------------------
 * Copyright (C) 2025 Laurence Oberman <loberman@redhat.com>
 * License: GPL v3+
 */

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Parser};

use crate::analyze::AnalyzeConfig;
use crate::gather::{GatherConfig, DEFAULT_INTERVAL_SECS, USAGE_WINDOW};

#[derive(Parser, Debug)]
#[command(name = "thermstats_grab", version, about)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["gather", "analyze", "playback"])
))]
pub struct Cli {
    /// Gather mode: sample CPU/GPU sensors and append to today's log
    #[arg(short = 'g', long)]
    pub gather: bool,

    /// Analyze mode: graph every .log file in the log directory
    #[arg(short = 'a', long)]
    pub analyze: bool,

    /// Playback mode: print one log file as a table
    #[arg(short = 'p', long, value_name = "LOGFILE")]
    pub playback: Option<PathBuf>,

    /// Directory holding the daily YYYY-MM-DD.log files
    #[arg(long, env = "THERMSTATS_LOG_DIR", default_value = "./logs")]
    pub log_dir: PathBuf,

    /// Directory receiving the graphs
    #[arg(long, env = "THERMSTATS_GRAPH_DIR", default_value = "./graphs")]
    pub graph_dir: PathBuf,

    /// Seconds to wait between samples
    #[arg(
        short = 'i',
        long,
        value_name = "SECS",
        default_value_t = DEFAULT_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval: u64,

    /// Also export each parsed log as CSV (analyze mode)
    #[arg(long)]
    pub csv: bool,

    /// Debug level logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug)]
pub enum Mode {
    Gather(GatherConfig),
    Analyze(AnalyzeConfig),
    Playback(PathBuf),
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if let Some(file) = &self.playback {
            return Mode::Playback(file.clone());
        }
        if self.analyze {
            return Mode::Analyze(AnalyzeConfig {
                log_dir: self.log_dir.clone(),
                graph_dir: self.graph_dir.clone(),
                csv: self.csv,
            });
        }
        Mode::Gather(GatherConfig {
            log_dir: self.log_dir.clone(),
            interval: Duration::from_secs(self.interval),
            usage_window: USAGE_WINDOW,
        })
    }
}
