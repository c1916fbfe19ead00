use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{config::deserialize_instant, error::SensorError};

pub const MIN_VALID_TEMP_F: f32 = -40.0;
pub const MAX_VALID_TEMP_F: f32 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SensorStatus {
    Ok,
    Error,
}

/// One sample as exchanged with the collector process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(deserialize_with = "deserialize_instant")]
    pub timestamp: DateTime<Utc>,
    pub temperature_f: Option<f32>,
    pub humidity_percent: Option<f32>,
    pub status: SensorStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SensorReading {
    pub fn ok(timestamp: DateTime<Utc>, temperature_f: f32, humidity_percent: f32) -> Self {
        Self {
            timestamp,
            temperature_f: Some(temperature_f),
            humidity_percent: Some(humidity_percent),
            status: SensorStatus::Ok,
            error_message: None,
        }
    }

    /// Converts a raw Celsius sample, rounding both values to two decimals.
    pub fn from_celsius(
        timestamp: DateTime<Utc>,
        temperature_c: f32,
        humidity_percent: f32,
    ) -> Self {
        Self::ok(
            timestamp,
            round_hundredths(temperature_c * 9.0 / 5.0 + 32.0),
            round_hundredths(humidity_percent),
        )
    }

    pub fn error(timestamp: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            temperature_f: None,
            humidity_percent: None,
            status: SensorStatus::Error,
            error_message: Some(message.into()),
        }
    }

    /// Temperature the controller may act on, or why it must not act.
    pub fn trusted_temperature(&self) -> Result<f32, SensorError> {
        if self.status == SensorStatus::Error {
            return Err(SensorError::Reported(
                self.error_message
                    .clone()
                    .unwrap_or_else(|| "unspecified sensor failure".to_string()),
            ));
        }

        let temp = self.temperature_f.ok_or(SensorError::MissingTemperature)?;
        if !temp.is_finite() || !(MIN_VALID_TEMP_F..=MAX_VALID_TEMP_F).contains(&temp) {
            return Err(SensorError::OutOfRange(temp));
        }
        Ok(temp)
    }
}

fn round_hundredths(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Source of one reading per cycle. Failures are encoded in the reading.
pub trait SensorSource {
    fn read(&mut self) -> SensorReading;
}

impl<T: SensorSource + ?Sized> SensorSource for Box<T> {
    fn read(&mut self) -> SensorReading {
        (**self).read()
    }
}

/// Returns the same reading every time.
#[derive(Debug, Clone)]
pub struct FixedSensor {
    reading: SensorReading,
}

impl FixedSensor {
    pub fn new(reading: SensorReading) -> Self {
        Self { reading }
    }
}

impl SensorSource for FixedSensor {
    fn read(&mut self) -> SensorReading {
        self.reading.clone()
    }
}

/// Plays back a recorded sequence, then reports exhaustion as a sensor error.
#[derive(Debug, Clone, Default)]
pub struct ReplaySensor {
    readings: VecDeque<SensorReading>,
}

impl ReplaySensor {
    pub fn new(readings: impl IntoIterator<Item = SensorReading>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
        }
    }

    pub fn from_json(raw: &[u8]) -> serde_json::Result<Self> {
        let readings: Vec<SensorReading> = serde_json::from_slice(raw)?;
        Ok(Self::new(readings))
    }

    pub fn remaining(&self) -> usize {
        self.readings.len()
    }
}

impl SensorSource for ReplaySensor {
    fn read(&mut self) -> SensorReading {
        self.readings
            .pop_front()
            .unwrap_or_else(|| SensorReading::error(Utc::now(), "replay exhausted"))
    }
}
