//! One-shot checks behind `--test`, `--testmail` and `--testmodbus`.

use anyhow::{Context, Result};
use tracing::info;

use crate::config::MonitorConfig;
use crate::modbus::{RegisterReader, RegisterTransport};
use crate::notify::Notifier;

/// Reads the battery once and mails the reading.
pub async fn run_full<T: RegisterTransport>(
    config: &MonitorConfig,
    reader: &mut RegisterReader<T>,
    notifier: &dyn Notifier,
) -> Result<()> {
    info!("Running in test mode...");
    let level = read_battery(config, reader).await?;
    notifier
        .send(&format!(
            "Test mode: Battery level read as {level}%. Email is being sent as a test."
        ))
        .await
        .context("Test failed: could not send email")?;
    info!("!!! TEST SUCCESS: Battery read and email sent successfully !!!");
    Ok(())
}

pub async fn run_mail(notifier: &dyn Notifier) -> Result<()> {
    info!("Running in Email test mode...");
    notifier
        .send("Test mode: Email is being sent as a test.")
        .await
        .context("Test failed: could not send email")?;
    info!("!!! TEST SUCCESS !!!");
    Ok(())
}

pub async fn run_modbus<T: RegisterTransport>(
    config: &MonitorConfig,
    reader: &mut RegisterReader<T>,
) -> Result<()> {
    info!("Running in Modbus test mode...");
    read_battery(config, reader).await?;
    info!("!!! TEST SUCCESS: Battery read !!!");
    Ok(())
}

async fn read_battery<T: RegisterTransport>(
    config: &MonitorConfig,
    reader: &mut RegisterReader<T>,
) -> Result<u16> {
    let level = reader
        .read(config.battery_register, config.register_type)
        .await
        .context("Test failed: could not read battery level")?;
    info!("Battery level: {level}%");
    Ok(level)
}
