//! Scripted collaborators for unit tests.

use std::collections::{HashMap, VecDeque};
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{ColdStartConfig, GridConfig, MonitorConfig};
use crate::modbus::{ReadError, RegisterTransport, RegisterType};
use crate::notify::{Notifier, NotifyError};
use crate::system::{BootClock, PowerControl, SystemError};

pub const BATTERY: u16 = 100;
pub const GRID: u16 = 200;
pub const GRID_DOWN: u16 = 3;

/// threshold 20, alert 40, 30 s interval, default cold-start limits.
pub fn monitor_config(grid: bool) -> MonitorConfig {
    MonitorConfig {
        endpoint: "127.0.0.1:502".parse().unwrap(),
        unit: 1,
        battery_register: BATTERY,
        register_type: RegisterType::Input,
        threshold: 20,
        alert_threshold: 40,
        poll_interval: Duration::from_secs(30),
        grid: grid.then_some(GridConfig {
            register: GRID,
            not_connected_value: GRID_DOWN,
        }),
        cold_start: ColdStartConfig::default(),
    }
}

#[derive(Default)]
struct Recorded {
    reads: Vec<(u16, RegisterType)>,
    connects: usize,
    closes: usize,
}

/// Shared view of what a [`ScriptedTransport`] was asked to do.
#[derive(Clone, Default)]
pub struct TransportLog(Arc<Mutex<Recorded>>);

impl TransportLog {
    pub fn reads(&self, addr: u16) -> usize {
        let rec = self.0.lock().unwrap();
        rec.reads.iter().filter(|(a, _)| *a == addr).count()
    }

    pub fn kinds(&self) -> Vec<RegisterType> {
        self.0.lock().unwrap().reads.iter().map(|(_, k)| *k).collect()
    }

    pub fn connects(&self) -> usize {
        self.0.lock().unwrap().connects
    }

    pub fn closes(&self) -> usize {
        self.0.lock().unwrap().closes
    }
}

/// Replays a per-register queue of responses; an exhausted queue reads as a reset connection.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: HashMap<u16, VecDeque<Result<Vec<u16>, ErrorKind>>>,
    refuse_connects: bool,
    log: TransportLog,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(
        mut self,
        addr: u16,
        responses: impl IntoIterator<Item = Result<Vec<u16>, ErrorKind>>,
    ) -> Self {
        self.scripts.entry(addr).or_default().extend(responses);
        self
    }

    pub fn refuse_connects(mut self) -> Self {
        self.refuse_connects = true;
        self
    }

    pub fn log(&self) -> TransportLog {
        self.log.clone()
    }

    fn next(&mut self, addr: u16, kind: RegisterType) -> Result<Vec<u16>, ReadError> {
        self.log.0.lock().unwrap().reads.push((addr, kind));
        self.scripts
            .get_mut(&addr)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Err(ErrorKind::ConnectionReset))
            .map_err(|kind| ReadError::Transport(kind.into()))
    }
}

#[async_trait]
impl RegisterTransport for ScriptedTransport {
    async fn read_input_registers(&mut self, addr: u16, _count: u16) -> Result<Vec<u16>, ReadError> {
        self.next(addr, RegisterType::Input)
    }

    async fn read_holding_registers(
        &mut self,
        addr: u16,
        _count: u16,
    ) -> Result<Vec<u16>, ReadError> {
        self.next(addr, RegisterType::Holding)
    }

    async fn connect(&mut self) -> Result<(), ReadError> {
        self.log.0.lock().unwrap().connects += 1;
        if self.refuse_connects {
            return Err(ReadError::Transport(ErrorKind::ConnectionRefused.into()));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ReadError> {
        self.log.0.lock().unwrap().closes += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// Records messages but reports every send as failed.
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        self.messages.lock().unwrap().push(message.to_owned());
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::AllFailed(1));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPower {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingPower {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

impl PowerControl for RecordingPower {
    fn initiate_shutdown(&self) -> Result<(), SystemError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(SystemError::Shutdown(ErrorKind::NotFound.into()));
        }
        Ok(())
    }
}

pub struct FixedBootClock(Option<f64>);

impl FixedBootClock {
    pub fn secs(secs: f64) -> Self {
        Self(Some(secs))
    }

    pub fn unavailable() -> Self {
        Self(None)
    }
}

impl BootClock for FixedBootClock {
    fn seconds_since_boot(&self) -> Result<f64, SystemError> {
        self.0.ok_or(SystemError::UptimeUnavailable)
    }
}
