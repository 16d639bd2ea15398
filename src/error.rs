/*!
 * thermstats_grab: Error Types
 * ----------------------------
 * Copyright (C) 2025 Laurence Oberman <loberman@redhat.com>
 * License: GPL v3+
 */

use std::path::PathBuf;

/// Host sensor failures. Never fatal: the sampler degrades to an absent value.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("sensor unavailable: {0}")]
    Unavailable(String),

    #[error("sensor query failed: {0}")]
    QueryFailed(String),

    #[error("sensor read error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum GatherError {
    #[error("cannot prepare log directory {path}: {source}")]
    LogDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot append to {path}: {source}")]
    Append {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("cannot read log file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("drawing failed: {0}")]
    Drawing(String),

    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("cannot list log directory {path}: {source}")]
    LogDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot create graph directory {path}: {source}")]
    GraphDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}
