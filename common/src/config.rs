use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    error::{ConfigError, TimezoneError},
    types::ThermostatMode,
};

pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Operator settings persisted between cycles.
///
/// Missing fields take their documented defaults so a partial file still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    pub current_mode: ThermostatMode,
    pub manual_target_f: f32,
    pub hysteresis: f32,
    pub timezone: String,
    #[serde(deserialize_with = "deserialize_check_time")]
    pub last_check_time: Option<DateTime<Utc>>,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            current_mode: ThermostatMode::Heat,
            manual_target_f: 72.0,
            hysteresis: 1.5,
            timezone: DEFAULT_TIMEZONE.to_string(),
            last_check_time: None,
        }
    }
}

impl ControlSettings {
    pub fn from_json(raw: &[u8]) -> Result<Self, ConfigError> {
        let settings: Self =
            serde_json::from_slice(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.hysteresis.is_finite() || self.hysteresis <= 0.0 {
            return Err(ConfigError::InvalidHysteresis(self.hysteresis));
        }
        if !self.manual_target_f.is_finite() {
            return Err(ConfigError::Parse(format!(
                "manual_target_f must be finite, got {}",
                self.manual_target_f
            )));
        }
        Ok(())
    }
}

/// Timing for the outer loop and the sensor read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    pub cycle_interval: Duration,
    pub sensor_timeout: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            cycle_interval: Duration::from_secs(30),
            sensor_timeout: Duration::from_secs(10),
        }
    }
}

pub fn resolve_timezone(name: &str) -> Result<Tz, TimezoneError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| TimezoneError::Unknown(name.to_string()))
}

pub fn local_time(now: DateTime<Utc>, timezone: &str) -> Result<DateTime<Tz>, TimezoneError> {
    Ok(now.with_timezone(&resolve_timezone(timezone)?))
}

// Older settings files and the Python collector write naive ISO-8601 stamps;
// those are read as UTC.
pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(stamp.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|naive| naive.and_utc())
}

pub(crate) fn deserialize_instant<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_instant(&raw).map_err(serde::de::Error::custom)
}

fn deserialize_check_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| parse_instant(&raw).map_err(serde::de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_document_takes_defaults() {
        let settings = ControlSettings::from_json(b"{}").unwrap();
        assert_eq!(settings, ControlSettings::default());
        assert_eq!(settings.current_mode, ThermostatMode::Heat);
        assert_eq!(settings.manual_target_f, 72.0);
        assert_eq!(settings.hysteresis, 1.5);
        assert_eq!(settings.timezone, "UTC");
    }

    #[test]
    fn partial_document_keeps_present_fields() {
        let settings =
            ControlSettings::from_json(br#"{"hysteresis": 2.0, "timezone": "America/Chicago"}"#)
                .unwrap();

        assert_eq!(settings.hysteresis, 2.0);
        assert_eq!(settings.timezone, "America/Chicago");
        assert_eq!(settings.manual_target_f, 72.0);
    }

    #[test]
    fn rejects_non_positive_hysteresis() {
        for raw in [&br#"{"hysteresis": 0.0}"#[..], br#"{"hysteresis": -1.5}"#] {
            assert!(matches!(
                ControlSettings::from_json(raw),
                Err(ConfigError::InvalidHysteresis(_))
            ));
        }
    }

    #[test]
    fn malformed_document_is_parse_error() {
        assert!(matches!(
            ControlSettings::from_json(b"{ not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ControlSettings::from_json(br#"{"current_mode": "TURBO"}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn accepts_naive_and_rfc3339_check_times() {
        let naive =
            ControlSettings::from_json(br#"{"last_check_time": "2025-11-02T06:30:15.123456"}"#)
                .unwrap();
        let stamp = naive.last_check_time.unwrap();
        assert_eq!(stamp.hour(), 6);
        assert_eq!(stamp.second(), 15);

        let rfc = ControlSettings::from_json(
            br#"{"last_check_time": "2025-11-02T06:30:15-05:00"}"#,
        )
        .unwrap();
        assert_eq!(
            rfc.last_check_time,
            Some(Utc.with_ymd_and_hms(2025, 11, 2, 11, 30, 15).unwrap())
        );
    }

    #[test]
    fn check_time_round_trips_through_json() {
        let settings = ControlSettings {
            last_check_time: Some(Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap()),
            ..ControlSettings::default()
        };

        let raw = serde_json::to_vec(&settings).unwrap();
        assert_eq!(ControlSettings::from_json(&raw).unwrap(), settings);
    }

    #[test]
    fn localizes_known_timezone() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 14, 0, 0).unwrap();
        let local = local_time(now, "America/Los_Angeles").unwrap();
        assert_eq!(local.hour(), 6);
    }

    #[test]
    fn unknown_timezone_is_reported() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 14, 0, 0).unwrap();
        assert_eq!(
            local_time(now, "Mars/Olympus_Mons"),
            Err(TimezoneError::Unknown("Mars/Olympus_Mons".to_string()))
        );
    }
}
