/// Device status tracking
///
/// Single owner of the "is the physical device streaming" flag. The hub's
/// dispatch loop holds the only instance; handlers go through `set_connected`,
/// which reports whether anything actually changed so a status event is
/// published at most once per transition.
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub connected: bool,
    pub last_changed_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct DeviceStatusTracker {
    status: DeviceStatus,
}

impl Default for DeviceStatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceStatusTracker {
    /// Starts disconnected
    pub fn new() -> Self {
        Self {
            status: DeviceStatus {
                connected: false,
                last_changed_at: Utc::now(),
            },
        }
    }

    pub fn get(&self) -> DeviceStatus {
        self.status
    }

    pub fn is_connected(&self) -> bool {
        self.status.connected
    }

    /// Update the flag; returns the new status only when it changed
    pub fn set_connected(&mut self, connected: bool) -> Option<DeviceStatus> {
        if self.status.connected == connected {
            return None;
        }
        self.status = DeviceStatus {
            connected,
            last_changed_at: Utc::now(),
        };
        Some(self.status)
    }
}
