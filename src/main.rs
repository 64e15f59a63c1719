use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use crate::config::Config;
use crate::modbus::{ModbusClient, RegisterReader};
use crate::monitor::cold_start::{ColdStart, ColdStartGuard};
use crate::monitor::{Monitor, MonitorState};
use crate::notify::EmailNotifier;
use crate::system::HostSystem;

mod config;
mod diagnostics;
mod logging;
mod modbus;
mod monitor;
mod notify;
mod system;
#[cfg(test)]
mod testing;

/// Shuts the host down before a Modbus-attached UPS runs out of battery.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Run full test: read battery from Modbus and send email
    #[arg(long)]
    test: bool,

    /// Send a test email only
    #[arg(long)]
    testmail: bool,

    /// Read battery from Modbus only (no email)
    #[arg(long)]
    testmodbus: bool,
}

#[tokio::main(flavor = "current_thread")]
pub async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    logging::init(config.log_file.as_deref())?;
    let settings = config.validate().context("Invalid configuration")?;
    for warning in config.warnings() {
        warn!("{warning}");
    }
    info!("=== Modbus Shutdown Monitor Started ===");

    let notifier = Arc::new(
        EmailNotifier::new(config.email.clone()).context("Failed to set up email transport")?,
    );

    if args.testmail && !args.test {
        return diagnostics::run_mail(notifier.as_ref()).await;
    }

    let client = ModbusClient::new(settings.endpoint, settings.unit)
        .await
        .context("Failed to connect to Modbus device")?;
    let mut reader = RegisterReader::new(client);

    if args.test {
        return diagnostics::run_full(&settings, &mut reader, notifier.as_ref()).await;
    }
    if args.testmodbus {
        return diagnostics::run_modbus(&settings, &mut reader).await;
    }

    if ColdStartGuard::new(&settings, &HostSystem).run(&mut reader).await == ColdStart::Recovered {
        info!("Cold start recovery successful. Skipping shutdown loop.");
        return Ok(());
    }

    let mut monitor = Monitor::new(
        settings,
        reader,
        notifier,
        Arc::new(HostSystem),
        HostSystem::hostname(),
    );
    monitor
        .run(&mut MonitorState::default())
        .await
        .context("Shutdown failed")
}
