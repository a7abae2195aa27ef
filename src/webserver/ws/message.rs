/// WebSocket message schema
///
/// Every application message is a JSON object tagged by `type`:
/// - `connection`   server -> client, sent once right after connect
/// - `deviceStatus` either direction; bridges send `status`, the hub fans out `connected`
/// - `vitalSigns`   either direction; `data` is a `VitalsSample`
/// - `serialData`   bridge -> hub; `data` is one raw sensor line
///
/// Liveness probes are transport-level ping/pong frames and never appear here.
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::device_status::DeviceStatus;
use crate::vitals::VitalsSample;

pub const TYPE_CONNECTION: &str = "connection";
pub const TYPE_DEVICE_STATUS: &str = "deviceStatus";
pub const TYPE_VITAL_SIGNS: &str = "vitalSigns";
pub const TYPE_SERIAL_DATA: &str = "serialData";

pub const STATUS_CONNECTED: &str = "connected";
pub const STATUS_DISCONNECTED: &str = "disconnected";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WireMessage {
    Connection { status: String, message: String },
    DeviceStatus(DeviceStatusMessage),
    VitalSigns { data: VitalsSample },
    SerialData { data: String },
}

/// Both device-status forms share one body; at least one of `status` or
/// `connected` must be present on inbound messages
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceStatusMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,

    /// Free-form on input (ISO string or epoch millis); RFC 3339 on output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<serde_json::Value>,
}

impl DeviceStatusMessage {
    /// Resolve either form to a flag; `None` if neither is usable
    pub fn is_connected(&self) -> Option<bool> {
        if let Some(connected) = self.connected {
            return Some(connected);
        }
        match self.status.as_deref() {
            Some(STATUS_CONNECTED) => Some(true),
            Some(STATUS_DISCONNECTED) => Some(false),
            _ => None,
        }
    }
}

impl WireMessage {
    /// Connection confirmation sent to a newly registered peer
    pub fn connection(message: &str) -> Self {
        WireMessage::Connection {
            status: STATUS_CONNECTED.to_string(),
            message: message.to_string(),
        }
    }

    /// Hub-originated status fan-out: `{type, connected, timestamp}`
    pub fn hub_device_status(status: DeviceStatus) -> Self {
        WireMessage::DeviceStatus(DeviceStatusMessage {
            status: None,
            connected: Some(status.connected),
            timestamp: Some(serde_json::Value::String(status.last_changed_at.to_rfc3339())),
        })
    }

    /// Bridge-originated report / keepalive: `{type, status, timestamp}`
    pub fn device_report(connected: bool) -> Self {
        let status = if connected {
            STATUS_CONNECTED
        } else {
            STATUS_DISCONNECTED
        };
        WireMessage::DeviceStatus(DeviceStatusMessage {
            status: Some(status.to_string()),
            connected: None,
            timestamp: Some(serde_json::Value::String(Utc::now().to_rfc3339())),
        })
    }

    pub fn vital_signs(sample: VitalsSample) -> Self {
        WireMessage::VitalSigns { data: sample }
    }

    pub fn serial_data(line: &str) -> Self {
        WireMessage::SerialData {
            data: line.to_string(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            WireMessage::Connection { .. } => TYPE_CONNECTION,
            WireMessage::DeviceStatus(_) => TYPE_DEVICE_STATUS,
            WireMessage::VitalSigns { .. } => TYPE_VITAL_SIGNS,
            WireMessage::SerialData { .. } => TYPE_SERIAL_DATA,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_connection_shape() {
        let json: Value =
            serde_json::from_str(&WireMessage::connection("welcome").to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            json!({"type": "connection", "status": "connected", "message": "welcome"})
        );
    }

    #[test]
    fn test_hub_status_shape() {
        let status = DeviceStatus {
            connected: true,
            last_changed_at: Utc::now(),
        };
        let json: Value =
            serde_json::from_str(&WireMessage::hub_device_status(status).to_json().unwrap())
                .unwrap();
        assert_eq!(json["type"], "deviceStatus");
        assert_eq!(json["connected"], true);
        assert!(json.get("status").is_none());
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_bridge_report_shape() {
        let json: Value =
            serde_json::from_str(&WireMessage::device_report(false).to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "deviceStatus");
        assert_eq!(json["status"], "disconnected");
        assert!(json.get("connected").is_none());
    }

    #[test]
    fn test_status_forms_resolve() {
        let msg: WireMessage =
            serde_json::from_str(r#"{"type":"deviceStatus","status":"connected","timestamp":1700000000000}"#)
                .unwrap();
        match msg {
            WireMessage::DeviceStatus(body) => assert_eq!(body.is_connected(), Some(true)),
            other => panic!("unexpected {:?}", other),
        }

        let body = DeviceStatusMessage {
            connected: Some(false),
            ..Default::default()
        };
        assert_eq!(body.is_connected(), Some(false));

        let body = DeviceStatusMessage {
            status: Some("sleeping".to_string()),
            ..Default::default()
        };
        assert_eq!(body.is_connected(), None);
    }

    #[test]
    fn test_serial_data_round_trip_type() {
        let msg = WireMessage::serial_data("Oxygen % = 98%, BPM = 70, Avg BPM = 70");
        assert_eq!(msg.type_name(), "serialData");
        let json: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(json["data"], "Oxygen % = 98%, BPM = 70, Avg BPM = 70");
    }
}
