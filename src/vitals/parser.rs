/// Sensor frame parser
///
/// The oximeter prints one line per reading cycle:
///
/// ```text
/// Oxygen % = 98.5%, BPM = 72.0, Avg BPM = 70.0
/// ```
///
/// or a "No finger" notice when nothing is on the sensor. Token order is fixed,
/// whitespace around tokens is not. The pattern must cover the whole line, so
/// torn or merged frames never parse. Anything else is rejected; rejection is a
/// normal outcome, never an error that could stop the ingestion loop.
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use super::types::SensorReading;
use crate::errors::{RelayError, RelayResult};

/// Substring the firmware prints when no finger is on the sensor
pub const NO_SIGNAL_SENTINEL: &str = "no finger";

static FRAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*Oxygen\s*%\s*=\s*([0-9][0-9.]*)\s*%\s*,\s*BPM\s*=\s*([0-9][0-9.]*)\s*,\s*Avg\s+BPM\s*=\s*([0-9][0-9.]*)\s*$",
    )
    .expect("frame pattern is a valid regex")
});

#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// Finger/contact not detected
    NoSignal,
    /// Line does not carry all three groups in order
    PatternMismatch,
    /// A group matched but is not a number (e.g. "98..5")
    MalformedNumber(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NoSignal => write!(f, "no signal"),
            RejectReason::PatternMismatch => write!(f, "pattern mismatch"),
            RejectReason::MalformedNumber(raw) => write!(f, "malformed number '{}'", raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Parsed(SensorReading),
    Rejected(RejectReason),
}

impl FrameOutcome {
    pub fn reading(&self) -> Option<SensorReading> {
        match self {
            FrameOutcome::Parsed(reading) => Some(*reading),
            FrameOutcome::Rejected(_) => None,
        }
    }

    /// The rejection as a `RejectedFrame` error
    pub fn into_result(self) -> RelayResult<SensorReading> {
        match self {
            FrameOutcome::Parsed(reading) => Ok(reading),
            FrameOutcome::Rejected(reason) => Err(RelayError::RejectedFrame {
                reason: reason.to_string(),
            }),
        }
    }
}

/// Parse one raw line
pub fn parse_frame(line: &str) -> FrameOutcome {
    if line.to_ascii_lowercase().contains(NO_SIGNAL_SENTINEL) {
        return FrameOutcome::Rejected(RejectReason::NoSignal);
    }

    let Some(caps) = FRAME_PATTERN.captures(line) else {
        return FrameOutcome::Rejected(RejectReason::PatternMismatch);
    };

    let mut values = [0.0f64; 3];
    for (slot, value) in values.iter_mut().enumerate() {
        let raw = &caps[slot + 1];
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => *value = v,
            _ => return FrameOutcome::Rejected(RejectReason::MalformedNumber(raw.to_string())),
        }
    }

    FrameOutcome::Parsed(SensorReading::new(values[0], values[1], values[2]))
}
