//! Cold-start recovery.
//!
//! After a shutdown on critical battery the host may come back up while the battery is still
//! below the shutdown threshold. Right after boot the guard watches the level for a bounded
//! time instead of shutting down again straight away.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use crate::config::MonitorConfig;
use crate::modbus::{RegisterReader, RegisterTransport};
use crate::system::BootClock;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ColdStart {
    /// Not a cold start with a critical battery; monitor normally.
    Inactive,
    /// The battery climbed back above the threshold; skip monitoring for this run.
    Recovered,
    /// Still draining, timed out, or inconclusive; continue into normal shutdown logic.
    NotRecovered,
}

pub struct ColdStartGuard<'a> {
    config: &'a MonitorConfig,
    clock: &'a dyn BootClock,
}

struct Session {
    started: Instant,
    last_level: u16,
}

impl<'a> ColdStartGuard<'a> {
    pub fn new(config: &'a MonitorConfig, clock: &'a dyn BootClock) -> Self {
        Self { config, clock }
    }

    pub async fn run<T: RegisterTransport>(&self, reader: &mut RegisterReader<T>) -> ColdStart {
        if !self.config.grid_monitoring_enabled() {
            return ColdStart::Inactive;
        }
        let level = match self.read_battery(reader).await {
            Some(level) => level,
            None => return ColdStart::NotRecovered,
        };
        if level > self.config.threshold {
            return ColdStart::Inactive;
        }
        info!("Battery level critical: {level}%");

        let uptime = match self.clock.seconds_since_boot() {
            Ok(secs) => secs,
            Err(e) => {
                error!("Error getting OS uptime: {e}");
                return ColdStart::NotRecovered;
            }
        };
        if uptime >= self.config.cold_start.boot_age().as_secs_f64() {
            return ColdStart::Inactive;
        }

        info!(uptime, "System recently started. Monitoring battery for recovery...");
        self.watch(
            reader,
            Session {
                started: Instant::now(),
                last_level: level,
            },
        )
        .await
    }

    async fn watch<T: RegisterTransport>(
        &self,
        reader: &mut RegisterReader<T>,
        mut session: Session,
    ) -> ColdStart {
        let max_wait: Duration = self.config.cold_start.max_wait();
        loop {
            let level = match self.read_battery(reader).await {
                Some(level) => level,
                None => return ColdStart::NotRecovered,
            };

            if level > session.last_level {
                info!("Battery level increased. Shutdown postponed: {level}%");
            }
            if level < session.last_level {
                warn!("Battery level decreased. Proceeding to shutdown: {level}%");
                return ColdStart::NotRecovered;
            }
            if level > self.config.threshold {
                info!("Battery level back to safe: {level}%");
                return ColdStart::Recovered;
            }
            if session.started.elapsed() > max_wait {
                warn!("Cold start wait time exceeded. Proceeding to shutdown.");
                return ColdStart::NotRecovered;
            }

            session.last_level = level;
            sleep(self.config.poll_interval).await;
        }
    }

    async fn read_battery<T: RegisterTransport>(
        &self,
        reader: &mut RegisterReader<T>,
    ) -> Option<u16> {
        reader
            .read(self.config.battery_register, self.config.register_type)
            .await
            .map_err(|e| error!("Error reading battery level: {e}"))
            .ok()
    }
}
