use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    error::ScheduleError,
    types::{ActiveSetpoint, ThermostatMode},
};

const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleEntry {
    #[serde(
        rename = "time",
        serialize_with = "serialize_time",
        deserialize_with = "deserialize_time"
    )]
    pub time_of_day: NaiveTime,
    #[serde(rename = "target_f")]
    pub target_temp_f: f32,
    pub mode: ThermostatMode,
}

impl ScheduleEntry {
    pub fn new(
        time: &str,
        target_temp_f: f32,
        mode: ThermostatMode,
    ) -> Result<Self, ScheduleError> {
        Ok(Self {
            time_of_day: parse_time(time)?,
            target_temp_f,
            mode,
        })
    }

    fn setpoint(&self) -> ActiveSetpoint {
        ActiveSetpoint {
            target_temp_f: self.target_temp_f,
            mode: self.mode,
        }
    }
}

/// Daily program, sorted by time of day with unique times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    entries: Vec<ScheduleEntry>,
}

impl Schedule {
    pub fn new(mut entries: Vec<ScheduleEntry>) -> Result<Self, ScheduleError> {
        if let Some(entry) = entries.iter().find(|entry| !entry.target_temp_f.is_finite()) {
            return Err(ScheduleError::InvalidTarget {
                time: entry.time_of_day,
                target_f: entry.target_temp_f,
            });
        }

        entries.sort_by_key(|entry| entry.time_of_day);

        if let Some(pair) = entries
            .windows(2)
            .find(|pair| pair[0].time_of_day == pair[1].time_of_day)
        {
            return Err(ScheduleError::DuplicateTime(pair[0].time_of_day));
        }

        Ok(Self { entries })
    }

    pub fn from_json(raw: &[u8]) -> Result<Self, ScheduleError> {
        let entries: Vec<ScheduleEntry> =
            serde_json::from_slice(raw).map_err(|err| ScheduleError::Parse(err.to_string()))?;
        Self::new(entries)
    }

    /// Wake 72 HEAT, away 65 OFF, evening 70 COOL, night 68 COOL.
    pub fn residential_default() -> Self {
        let entry = |hour: u32, target_temp_f: f32, mode: ThermostatMode| ScheduleEntry {
            time_of_day: NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN),
            target_temp_f,
            mode,
        };

        Self {
            entries: vec![
                entry(6, 72.0, ThermostatMode::Heat),
                entry(8, 65.0, ThermostatMode::Off),
                entry(17, 70.0, ThermostatMode::Cool),
                entry(22, 68.0, ThermostatMode::Cool),
            ],
        }
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Setting in force at `now`: the most recent entry at or before `now`,
    /// or the last entry of the day when `now` precedes the first one.
    pub fn resolve_setpoint(&self, now: NaiveTime, default_target_f: f32) -> ActiveSetpoint {
        let Some(last) = self.entries.last() else {
            return ActiveSetpoint {
                target_temp_f: default_target_f,
                mode: ThermostatMode::Off,
            };
        };

        let mut active = last;
        for entry in &self.entries {
            if entry.time_of_day > now {
                break;
            }
            active = entry;
        }

        active.setpoint()
    }

    /// First entry strictly after `now`, wrapping to tomorrow's first entry.
    pub fn next_change(&self, now: NaiveTime) -> Option<&ScheduleEntry> {
        self.entries
            .iter()
            .find(|entry| entry.time_of_day > now)
            .or_else(|| self.entries.first())
    }
}

fn parse_time(raw: &str) -> Result<NaiveTime, ScheduleError> {
    NaiveTime::parse_from_str(raw.trim(), TIME_FORMAT)
        .map_err(|_| ScheduleError::InvalidTime(raw.to_string()))
}

fn serialize_time<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.format(TIME_FORMAT).to_string())
}

fn deserialize_time<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_time(&raw).map_err(serde::de::Error::custom)
}
