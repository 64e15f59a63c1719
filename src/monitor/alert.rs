#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AlertEvent {
    Armed(u16),
    Cleared(u16),
}

impl AlertEvent {
    pub fn message(&self, hostname: &str) -> String {
        match self {
            AlertEvent::Armed(level) => {
                format!("Battery level alert: Battery level is {level}% on {hostname}.")
            }
            AlertEvent::Cleared(level) => {
                format!("Battery level alert cleared: Battery level is {level}% on {hostname}.")
            }
        }
    }
}

/// Arm/clear latch for the low-battery alert. A threshold of 0 disables it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AlertHysteresis {
    armed: bool,
}

impl AlertHysteresis {
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn observe(&mut self, level: u16, threshold: u16) -> Option<AlertEvent> {
        if threshold == 0 {
            return None;
        }
        match (level <= threshold, self.armed) {
            (true, false) => {
                self.armed = true;
                Some(AlertEvent::Armed(level))
            }
            (false, true) => {
                self.armed = false;
                Some(AlertEvent::Cleared(level))
            }
            _ => None,
        }
    }
}
