use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::{GridConfig, MonitorConfig};
use crate::modbus::{RegisterReader, RegisterTransport};
use crate::notify::Notifier;
use crate::system::{PowerControl, SystemError};

pub mod alert;
pub mod cold_start;
pub mod grid;

use alert::AlertHysteresis;

/// Decision state carried across polls. Only touched after a successful read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorState {
    pub last_battery_level: Option<u16>,
    pub grid_connected: bool,
    pub alert: AlertHysteresis,
}

impl Default for MonitorState {
    fn default() -> Self {
        // Assume the grid is up so the first disconnect is reported as a transition.
        Self {
            last_battery_level: None,
            grid_connected: true,
            alert: AlertHysteresis::default(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Poll {
    Continue,
    ShutdownInitiated,
}

pub struct Monitor<T> {
    config: MonitorConfig,
    reader: RegisterReader<T>,
    notifier: Arc<dyn Notifier>,
    power: Arc<dyn PowerControl>,
    hostname: String,
}

impl<T: RegisterTransport> Monitor<T> {
    pub fn new(
        config: MonitorConfig,
        reader: RegisterReader<T>,
        notifier: Arc<dyn Notifier>,
        power: Arc<dyn PowerControl>,
        hostname: String,
    ) -> Self {
        Self {
            config,
            reader,
            notifier,
            power,
            hostname,
        }
    }

    /// Polls until a shutdown has been initiated.
    pub async fn run(&mut self, state: &mut MonitorState) -> Result<(), SystemError> {
        loop {
            if self.poll_once(state).await? == Poll::ShutdownInitiated {
                return Ok(());
            }
            sleep(self.config.poll_interval).await;
        }
    }

    pub async fn poll_once(&mut self, state: &mut MonitorState) -> Result<Poll, SystemError> {
        if let Some(grid) = self.config.grid {
            self.check_grid(grid, state).await;
        }

        debug!("Checking battery level...");
        let level = match self
            .reader
            .read(self.config.battery_register, self.config.register_type)
            .await
        {
            Ok(level) => level,
            Err(e) => {
                error!("Error reading battery level: {e}");
                return Ok(Poll::Continue);
            }
        };
        info!("Battery level: {level}%");
        state.last_battery_level = Some(level);

        if let Some(event) = state.alert.observe(level, self.config.alert_threshold) {
            info!(?event, "battery alert");
            self.notify(&event.message(&self.hostname)).await;
        }

        if self.should_shut_down(level, state) {
            error!("Battery level critical: {level}%");
            self.notify(&format!(
                "Battery level is {level}%. System {} shutdown is starting.",
                self.hostname
            ))
            .await;
            info!("Battery level critical. Shutting down system.");
            self.power.initiate_shutdown()?;
            return Ok(Poll::ShutdownInitiated);
        }
        Ok(Poll::Continue)
    }

    /// With grid monitoring on, a low battery only matters while the grid is down.
    fn should_shut_down(&self, level: u16, state: &MonitorState) -> bool {
        level <= self.config.threshold && (self.config.grid.is_none() || !state.grid_connected)
    }

    async fn check_grid(&mut self, grid: GridConfig, state: &mut MonitorState) {
        debug!("Checking grid status...");
        let raw = match self
            .reader
            .read(grid.register, self.config.register_type)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Error reading grid status: {e}");
                return;
            }
        };
        let connected = grid::evaluate(raw, grid.not_connected_value);
        debug!(connected, raw, "grid status");
        if let Some(event) = grid::transition(&mut state.grid_connected, connected) {
            info!(?event, "grid status changed");
            self.notify(&event.message(&self.hostname)).await;
        }
    }

    async fn notify(&self, message: &str) {
        if let Err(e) = self.notifier.send(message).await {
            warn!("Failed to send notification: {e}");
        }
    }
}
