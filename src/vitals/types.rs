/// Vitals data model
///
/// `SensorReading` can only come out of the frame parser, and `VitalsSample`
/// only out of the normalizer or a validated deserialization, so neither ever
/// carries a NaN or negative field.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{RelayError, RelayResult};

/// One raw serial line and its arrival time
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl RawFrame {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}

/// Numbers extracted from a fully matched sensor frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    oxygen_percent: f64,
    bpm: f64,
    avg_bpm: f64,
}

impl SensorReading {
    pub(crate) fn new(oxygen_percent: f64, bpm: f64, avg_bpm: f64) -> Self {
        Self {
            oxygen_percent,
            bpm,
            avg_bpm,
        }
    }

    pub fn oxygen_percent(&self) -> f64 {
        self.oxygen_percent
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn avg_bpm(&self) -> f64 {
        self.avg_bpm
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BloodPressure {
    pub systolic: f64,
    pub diastolic: f64,
}

/// Normalized record sent to peers and persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalsSample {
    oxygen: f64,
    blood_pressure: BloodPressure,
    heart_rate: f64,
    avg_heart_rate: f64,
    timestamp: DateTime<Utc>,
}

impl VitalsSample {
    pub(crate) fn new(
        oxygen: f64,
        blood_pressure: BloodPressure,
        heart_rate: f64,
        avg_heart_rate: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            oxygen,
            blood_pressure,
            heart_rate,
            avg_heart_rate,
            timestamp,
        }
    }

    pub fn oxygen(&self) -> f64 {
        self.oxygen
    }

    pub fn blood_pressure(&self) -> BloodPressure {
        self.blood_pressure
    }

    pub fn heart_rate(&self) -> f64 {
        self.heart_rate
    }

    pub fn avg_heart_rate(&self) -> f64 {
        self.avg_heart_rate
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Check a sample that arrived from outside (HTTP body, relayed message)
    pub fn validate(&self) -> RelayResult<()> {
        let fields = [
            ("oxygen", self.oxygen),
            ("heartRate", self.heart_rate),
            ("avgHeartRate", self.avg_heart_rate),
            ("bloodPressure.systolic", self.blood_pressure.systolic),
            ("bloodPressure.diastolic", self.blood_pressure.diastolic),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(RelayError::InvalidSample(format!("{} is not a finite number", name)));
            }
            if value < 0.0 {
                return Err(RelayError::InvalidSample(format!("{} is negative ({})", name, value)));
            }
        }
        Ok(())
    }

    /// Parse and validate a sample from JSON
    pub fn from_json_value(value: serde_json::Value) -> RelayResult<Self> {
        let sample: VitalsSample = serde_json::from_value(value)?;
        sample.validate()?;
        Ok(sample)
    }
}
