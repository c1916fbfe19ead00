pub mod config;
pub mod control;
pub mod cycle;
pub mod error;
pub mod schedule;
pub mod sensor;
pub mod types;

pub use config::{ControlSettings, LoopConfig};
pub use control::decide_action;
pub use cycle::{ClimateLoop, CycleOutcome, CycleReport, MemoryStore, SettingsStore};
pub use error::{ConfigError, ScheduleError, SensorError, StoreError, TimezoneError};
pub use schedule::{Schedule, ScheduleEntry};
pub use sensor::{FixedSensor, ReplaySensor, SensorReading, SensorSource, SensorStatus};
pub use types::{ActiveSetpoint, ControlAction, ThermostatMode};
