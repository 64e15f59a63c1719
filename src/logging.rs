use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logs to stdout and, when configured, appends the same records to `log_file`.
pub fn init(log_file: Option<&Path>) -> Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .context("Failed to initialise logging")?;
    Ok(())
}
