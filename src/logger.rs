/*!
 * thermstats_grab: Diagnostics Logging
 * ------------------------------------
 * Copyright (C) 2025 Laurence Oberman <loberman@redhat.com>
 * License: GPL v3+
 */

use tracing::metadata::LevelFilter;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer};

/// Install the stdout logger. `RUST_LOG` wins over `verbose`.
pub fn init(verbose: bool) -> Result<(), SetGlobalDefaultError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new(LevelFilter::DEBUG.to_string())
        } else {
            EnvFilter::new(LevelFilter::INFO.to_string())
        }
    });

    let console_layer = fmt::Layer::new()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_filter(env_filter);

    let subscriber = tracing_subscriber::registry().with(console_layer);
    tracing::subscriber::set_global_default(subscriber)
}
