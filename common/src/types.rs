use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThermostatMode {
    #[default]
    Heat,
    Cool,
    Fan,
    Off,
}

impl ThermostatMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heat => "HEAT",
            Self::Cool => "COOL",
            Self::Fan => "FAN",
            Self::Off => "OFF",
        }
    }
}

impl fmt::Display for ThermostatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Symbolic decision handed to the actuator once per cycle.
///
/// `NoChange` means "do nothing this cycle"; it is never an off command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlAction {
    NoChange,
    HeatOn,
    HeatOff,
    CoolOn,
    CoolOff,
    FanOn,
    SystemOff,
}

impl ControlAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoChange => "NO_CHANGE",
            Self::HeatOn => "HEAT_ON",
            Self::HeatOff => "HEAT_OFF",
            Self::CoolOn => "COOL_ON",
            Self::CoolOff => "COOL_OFF",
            Self::FanOn => "FAN_ON",
            Self::SystemOff => "SYSTEM_OFF",
        }
    }
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduler output for a given instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveSetpoint {
    pub target_temp_f: f32,
    pub mode: ThermostatMode,
}
