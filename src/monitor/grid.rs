#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GridEvent {
    Connected,
    Disconnected,
}

impl GridEvent {
    pub fn message(&self, hostname: &str) -> String {
        match self {
            GridEvent::Connected => format!("Grid status changed to connected on {hostname}."),
            GridEvent::Disconnected => {
                format!("Grid status changed to not connected on {hostname}.")
            }
        }
    }
}

/// Grid is connected unless the register holds the "not connected" sentinel.
pub fn evaluate(raw: u16, not_connected: u16) -> bool {
    raw != not_connected
}

/// Stores `connected` into `last` and reports the change, if any.
pub fn transition(last: &mut bool, connected: bool) -> Option<GridEvent> {
    if *last == connected {
        return None;
    }
    *last = connected;
    Some(if connected {
        GridEvent::Connected
    } else {
        GridEvent::Disconnected
    })
}
