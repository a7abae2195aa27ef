/// Sensor frame ingestion: raw serial line -> validated `VitalsSample`
///
/// - `parser`: FrameParser (line -> `SensorReading` or rejection)
/// - `normalizer`: VitalsNormalizer (reading -> sample with estimated blood pressure)
/// - `types`: data model shared by the hub, the bridge and the store
pub mod normalizer;
pub mod parser;
pub mod types;

pub use normalizer::{estimate_blood_pressure, normalize, normalize_at};
pub use parser::{parse_frame, FrameOutcome, RejectReason};
pub use types::{BloodPressure, RawFrame, SensorReading, VitalsSample};

use crate::arguments::is_debug_vitals_enabled;
use crate::logger::{self, LogTag};

/// Run one line through the parser and normalizer
///
/// Rejections are logged at debug level and yield `None`.
pub fn process_line(line: &str) -> Option<VitalsSample> {
    match parse_frame(line).into_result() {
        Ok(reading) => Some(normalize(&reading)),
        Err(e) => {
            if is_debug_vitals_enabled() {
                logger::debug(LogTag::Vitals, &format!("{}: {:?}", e, line.trim_end()));
            }
            None
        }
    }
}

/// Same as `process_line` for a timestamped frame
pub fn process_frame(frame: &RawFrame) -> Option<VitalsSample> {
    process_line(&frame.text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_line() {
        assert!(process_line("No finger detected").is_none());
        assert!(process_line("garbage").is_none());

        let sample = process_frame(&RawFrame::new("Oxygen % = 99%, BPM = 60, Avg BPM = 60"))
            .expect("valid frame");
        assert_eq!(sample.blood_pressure().systolic, 100.0);
        assert_eq!(sample.blood_pressure().diastolic, 70.0);
    }
}
