use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, error, info, warn};

use crate::{
    config::{local_time, ControlSettings},
    control::{cool_on_threshold, decide_for_setpoint, heat_on_threshold},
    error::{ConfigError, SensorError, StoreError},
    schedule::Schedule,
    sensor::SensorSource,
    types::{ActiveSetpoint, ControlAction, ThermostatMode},
};

pub trait SettingsStore {
    fn load(&self) -> Result<ControlSettings, ConfigError>;
    fn save(&mut self, settings: &ControlSettings) -> Result<(), StoreError>;
}

/// In-process store, useful for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    settings: Option<ControlSettings>,
    saves: usize,
}

impl MemoryStore {
    pub fn new(settings: ControlSettings) -> Self {
        Self {
            settings: Some(settings),
            saves: 0,
        }
    }

    pub fn settings(&self) -> Option<&ControlSettings> {
        self.settings.as_ref()
    }

    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<ControlSettings, ConfigError> {
        let settings = self
            .settings
            .clone()
            .ok_or_else(|| ConfigError::NotFound("memory".to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn save(&mut self, settings: &ControlSettings) -> Result<(), StoreError> {
        self.settings = Some(settings.clone());
        self.saves += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub local_time: DateTime<Tz>,
    pub timezone: String,
    pub setpoint: ActiveSetpoint,
    pub temperature_f: f32,
    pub humidity_percent: Option<f32>,
    pub action: ControlAction,
    pub persisted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Decided(CycleReport),
    /// Sensor data could not be trusted; nothing was actuated or persisted.
    Aborted(SensorError),
}

impl CycleOutcome {
    pub fn action(&self) -> Option<ControlAction> {
        match self {
            Self::Decided(report) => Some(report.action),
            Self::Aborted(_) => None,
        }
    }
}

/// One settings → schedule → sensor → decision → persist pass per call.
pub struct ClimateLoop<S, R> {
    store: S,
    sensor: R,
    schedule: Schedule,
}

impl<S: SettingsStore, R: SensorSource> ClimateLoop<S, R> {
    pub fn new(store: S, sensor: R, schedule: Schedule) -> Self {
        Self {
            store,
            sensor,
            schedule,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn run_cycle(&mut self, now: DateTime<Utc>) -> CycleOutcome {
        let (mut settings, persist) = self.load_settings();

        let local = match local_time(now, &settings.timezone) {
            Ok(local) => local,
            Err(err) => {
                warn!("{err}; using UTC for schedule resolution");
                now.with_timezone(&Tz::UTC)
            }
        };

        info!(
            "cycle started at {} ({})",
            local.format("%Y-%m-%d %H:%M:%S %Z"),
            settings.timezone
        );

        let local_clock = local.time();
        let setpoint = self
            .schedule
            .resolve_setpoint(local_clock, settings.manual_target_f);
        info!(
            "schedule target {:.1}°F, mode {}",
            setpoint.target_temp_f, setpoint.mode
        );
        if let Some(next) = self.schedule.next_change(local_clock) {
            debug!(
                "next schedule change at {} -> {} {:.1}°F",
                next.time_of_day.format("%H:%M"),
                next.mode,
                next.target_temp_f
            );
        }

        let reading = self.sensor.read();
        let temperature_f = match reading.trusted_temperature() {
            Ok(temp) => temp,
            Err(err) => {
                error!("aborting cycle, no valid sensor data: {err}");
                return CycleOutcome::Aborted(err);
            }
        };

        match reading.humidity_percent {
            Some(humidity) => info!("reading {temperature_f:.1}°F, {humidity:.1}% RH"),
            None => info!("reading {temperature_f:.1}°F, humidity unavailable"),
        }

        match setpoint.mode {
            ThermostatMode::Heat => debug!(
                "heat on below {:.1}°F",
                heat_on_threshold(setpoint.target_temp_f, settings.hysteresis)
            ),
            ThermostatMode::Cool => debug!(
                "cool on above {:.1}°F",
                cool_on_threshold(setpoint.target_temp_f, settings.hysteresis)
            ),
            ThermostatMode::Fan | ThermostatMode::Off => {}
        }

        let action = decide_for_setpoint(setpoint, settings.hysteresis, temperature_f);
        info!("decision: {action}");

        let persisted = if persist {
            settings.last_check_time = Some(now);
            match self.store.save(&settings) {
                Ok(()) => true,
                Err(err) => {
                    warn!("failed to persist settings: {err}");
                    false
                }
            }
        } else {
            false
        };

        CycleOutcome::Decided(CycleReport {
            local_time: local,
            timezone: settings.timezone,
            setpoint,
            temperature_f,
            humidity_percent: reading.humidity_percent,
            action,
            persisted,
        })
    }

    // Defaults substituted for a missing file are written back so the file
    // appears; defaults substituted for a broken file are not, so it survives.
    fn load_settings(&self) -> (ControlSettings, bool) {
        match self.store.load() {
            Ok(settings) => (settings, true),
            Err(err @ ConfigError::NotFound(_)) => {
                warn!("{err}; using defaults");
                (ControlSettings::default(), true)
            }
            Err(err) => {
                error!("{err}; using defaults without saving");
                (ControlSettings::default(), false)
            }
        }
    }
}
