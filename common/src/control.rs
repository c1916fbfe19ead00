//! Deadband (hysteresis) decision for a single cycle.
//!
//! The controller keeps no memory between cycles. Each call re-derives the
//! action from the current temperature, and the gap between the ON edge
//! (`target ∓ hysteresis`) and the OFF edge (`target`) is what keeps the
//! equipment from chattering around the setpoint.

use crate::types::{ActiveSetpoint, ControlAction, ThermostatMode};

pub fn decide_action(
    mode: ThermostatMode,
    target_temp_f: f32,
    hysteresis_f: f32,
    current_temp_f: f32,
) -> ControlAction {
    match mode {
        ThermostatMode::Heat => {
            if current_temp_f < heat_on_threshold(target_temp_f, hysteresis_f) {
                ControlAction::HeatOn
            } else if current_temp_f >= target_temp_f {
                ControlAction::HeatOff
            } else {
                ControlAction::NoChange
            }
        }
        ThermostatMode::Cool => {
            if current_temp_f > cool_on_threshold(target_temp_f, hysteresis_f) {
                ControlAction::CoolOn
            } else if current_temp_f <= target_temp_f {
                ControlAction::CoolOff
            } else {
                ControlAction::NoChange
            }
        }
        ThermostatMode::Fan => ControlAction::FanOn,
        ThermostatMode::Off => ControlAction::SystemOff,
    }
}

pub fn decide_for_setpoint(
    setpoint: ActiveSetpoint,
    hysteresis_f: f32,
    current_temp_f: f32,
) -> ControlAction {
    decide_action(
        setpoint.mode,
        setpoint.target_temp_f,
        hysteresis_f,
        current_temp_f,
    )
}

pub fn heat_on_threshold(target_temp_f: f32, hysteresis_f: f32) -> f32 {
    target_temp_f - hysteresis_f
}

pub fn cool_on_threshold(target_temp_f: f32, hysteresis_f: f32) -> f32 {
    target_temp_f + hysteresis_f
}
