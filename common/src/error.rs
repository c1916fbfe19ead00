use chrono::NaiveTime;
use thiserror::Error;

/// Settings could not be loaded; callers substitute defaults and keep going.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("settings file not found: {0}")]
    NotFound(String),
    #[error("could not read settings: {0}")]
    Unreadable(String),
    #[error("could not parse settings: {0}")]
    Parse(String),
    #[error("invalid hysteresis {0}: must be a finite value greater than zero")]
    InvalidHysteresis(f32),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("settings write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimezoneError {
    #[error("unknown timezone '{0}'")]
    Unknown(String),
}

/// Untrusted or absent temperature data. The cycle aborts without acting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorError {
    #[error("sensor reported error: {0}")]
    Reported(String),
    #[error("sensor reading carries no temperature")]
    MissingTemperature,
    #[error("sensor temperature {0} is outside the plausible range")]
    OutOfRange(f32),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    #[error("could not parse schedule: {0}")]
    Parse(String),
    #[error("invalid schedule time '{0}', expected HH:MM")]
    InvalidTime(String),
    #[error("schedule entry at {time} has invalid target {target_f}")]
    InvalidTarget { time: NaiveTime, target_f: f32 },
    #[error("schedule has more than one entry at {0}")]
    DuplicateTime(NaiveTime),
}
