/// Vitals normalizer
///
/// Turns a parsed `SensorReading` into a complete `VitalsSample`. Blood pressure
/// is an estimate from the average heart rate, not a measurement:
///
/// ```text
/// systolic  = clamp(100 + 0.7 * (avgBpm - 60), 90, 140)
/// diastolic = clamp(70  + 0.4 * (avgBpm - 60), 60, 90)
/// ```
///
/// The coefficients and bounds are part of the output contract and must not change.
use chrono::{DateTime, Utc};

use super::types::{BloodPressure, SensorReading, VitalsSample};

pub const SYSTOLIC_BASE: f64 = 100.0;
pub const SYSTOLIC_SLOPE: f64 = 0.7;
pub const SYSTOLIC_MIN: f64 = 90.0;
pub const SYSTOLIC_MAX: f64 = 140.0;

pub const DIASTOLIC_BASE: f64 = 70.0;
pub const DIASTOLIC_SLOPE: f64 = 0.4;
pub const DIASTOLIC_MIN: f64 = 60.0;
pub const DIASTOLIC_MAX: f64 = 90.0;

/// Heart rate the formula is centered on
pub const REFERENCE_BPM: f64 = 60.0;

pub fn estimate_blood_pressure(avg_bpm: f64) -> BloodPressure {
    let delta = avg_bpm - REFERENCE_BPM;
    BloodPressure {
        systolic: (SYSTOLIC_BASE + SYSTOLIC_SLOPE * delta).clamp(SYSTOLIC_MIN, SYSTOLIC_MAX),
        diastolic: (DIASTOLIC_BASE + DIASTOLIC_SLOPE * delta).clamp(DIASTOLIC_MIN, DIASTOLIC_MAX),
    }
}

/// Normalize with the current time as the sample timestamp
pub fn normalize(reading: &SensorReading) -> VitalsSample {
    normalize_at(reading, Utc::now())
}

pub fn normalize_at(reading: &SensorReading, timestamp: DateTime<Utc>) -> VitalsSample {
    VitalsSample::new(
        reading.oxygen_percent(),
        estimate_blood_pressure(reading.avg_bpm()),
        reading.bpm(),
        reading.avg_bpm(),
        timestamp,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vitals::parser::parse_frame;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_midpoint() {
        let bp = estimate_blood_pressure(60.0);
        assert_eq!(bp.systolic, 100.0);
        assert_eq!(bp.diastolic, 70.0);
    }

    #[test]
    fn test_clamps_low() {
        let bp = estimate_blood_pressure(0.0);
        assert_eq!(bp.systolic, 90.0);
        assert_eq!(bp.diastolic, 60.0);
    }

    #[test]
    fn test_clamps_high() {
        let bp = estimate_blood_pressure(200.0);
        assert_eq!(bp.systolic, 140.0);
        assert_eq!(bp.diastolic, 90.0);
    }

    #[test]
    fn test_reference_line_end_to_end() {
        let reading = parse_frame("Oxygen % = 98.5%, BPM = 72.0, Avg BPM = 70.0")
            .reading()
            .unwrap();
        let sample = normalize(&reading);

        assert_eq!(sample.oxygen(), 98.5);
        assert_eq!(sample.heart_rate(), 72.0);
        assert_eq!(sample.avg_heart_rate(), 70.0);
        assert!((sample.blood_pressure().systolic - 107.0).abs() < EPS);
        assert!((sample.blood_pressure().diastolic - 74.0).abs() < EPS);
    }

    #[test]
    fn test_deterministic_apart_from_timestamp() {
        let line = "Oxygen % = 96.0%, BPM = 88.0, Avg BPM = 84.5";
        let ts = Utc::now();
        let a = normalize_at(&parse_frame(line).reading().unwrap(), ts);
        let b = normalize_at(&parse_frame(line).reading().unwrap(), ts);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_bounds_hold_across_range() {
        for avg in (0..=250).map(f64::from) {
            let bp = estimate_blood_pressure(avg);
            assert!(bp.systolic >= SYSTOLIC_MIN && bp.systolic <= SYSTOLIC_MAX);
            assert!(bp.diastolic >= DIASTOLIC_MIN && bp.diastolic <= DIASTOLIC_MAX);
        }
    }
}
