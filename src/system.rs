use std::process::Command;

use sysinfo::System;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    #[error("unsupported OS: {0}")]
    Unsupported(&'static str),
    #[error("shutdown command failed: {0}")]
    Shutdown(#[from] std::io::Error),
    #[error("system uptime unavailable")]
    UptimeUnavailable,
}

pub trait PowerControl: Send + Sync {
    /// Schedules an operating system shutdown. Called at most once per process.
    fn initiate_shutdown(&self) -> Result<(), SystemError>;
}

pub trait BootClock: Send + Sync {
    fn seconds_since_boot(&self) -> Result<f64, SystemError>;
}

/// The machine this process runs on.
pub struct HostSystem;

impl HostSystem {
    pub fn hostname() -> String {
        System::host_name().unwrap_or_else(|| {
            warn!("could not determine host name");
            "unknown host".to_owned()
        })
    }
}

#[cfg(target_os = "linux")]
fn shutdown_command() -> Result<Command, SystemError> {
    let mut cmd = Command::new("shutdown");
    cmd.args(["-h", "+1"]);
    Ok(cmd)
}

#[cfg(target_os = "windows")]
fn shutdown_command() -> Result<Command, SystemError> {
    let mut cmd = Command::new("shutdown");
    cmd.args(["/s", "/t", "30"]);
    Ok(cmd)
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
fn shutdown_command() -> Result<Command, SystemError> {
    Err(SystemError::Unsupported(std::env::consts::OS))
}

impl PowerControl for HostSystem {
    fn initiate_shutdown(&self) -> Result<(), SystemError> {
        shutdown_command()?.spawn()?;
        Ok(())
    }
}

impl BootClock for HostSystem {
    fn seconds_since_boot(&self) -> Result<f64, SystemError> {
        match System::uptime() {
            0 => Err(SystemError::UptimeUnavailable),
            secs => Ok(secs as f64),
        }
    }
}
