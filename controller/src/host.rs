use std::{
    future::Future,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use chrono::Utc;
use climate_common::{
    ClimateLoop, ControlAction, CycleOutcome, LoopConfig, ReplaySensor, Schedule, SensorSource,
    SettingsStore,
};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::{collector::CommandSensor, store::JsonFileStore};

const DEFAULT_SENSOR_COMMAND: &str = "climate-sensor";

#[derive(Debug, Clone)]
struct ControllerOptions {
    data_dir: PathBuf,
    timing: LoopConfig,
    sensor_command: String,
    replay_path: Option<PathBuf>,
}

impl ControllerOptions {
    fn from_env() -> Self {
        let defaults = LoopConfig::default();

        Self {
            data_dir: std::env::var("CLIMATE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./.climate")),
            timing: LoopConfig {
                cycle_interval: env_secs("CLIMATE_CYCLE_INTERVAL_SECS")
                    .unwrap_or(defaults.cycle_interval),
                sensor_timeout: env_secs("CLIMATE_SENSOR_TIMEOUT_SECS")
                    .unwrap_or(defaults.sensor_timeout),
            },
            sensor_command: std::env::var("CLIMATE_SENSOR_CMD")
                .unwrap_or_else(|_| DEFAULT_SENSOR_COMMAND.to_string()),
            replay_path: std::env::var("CLIMATE_SENSOR_REPLAY").ok().map(PathBuf::from),
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let options = ControllerOptions::from_env();
    let schedule = load_schedule(&options.data_dir.join("schedule.json")).await?;
    let store = JsonFileStore::new(options.data_dir.join("settings.json"));
    let sensor = build_sensor(&options).await?;

    info!(
        "climate controller started: {} schedule entries, settings at {}, cycle every {}s",
        schedule.entries().len(),
        store.path().display(),
        options.timing.cycle_interval.as_secs()
    );

    let climate = ClimateLoop::new(store, sensor, schedule);
    drive_cycles(
        climate,
        options.timing.cycle_interval,
        tokio::signal::ctrl_c(),
    )
    .await
}

/// Runs cycles on a fixed interval until `shutdown` completes.
///
/// A shutdown that lands mid-cycle lets that cycle finish, then wins over any
/// pending tick.
async fn drive_cycles<S, R, F>(
    mut climate: ClimateLoop<S, R>,
    cycle_interval: Duration,
    shutdown: F,
) -> anyhow::Result<()>
where
    S: SettingsStore + Send + 'static,
    R: SensorSource + Send + 'static,
    F: Future,
{
    let mut interval = tokio::time::interval(cycle_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Created once for the whole run so a signal during a cycle is not lost.
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("shutdown requested");
                break;
            }
            _ = interval.tick() => {}
        }

        // The sensor read blocks, so the whole cycle runs off the async workers.
        let (returned, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = climate.run_cycle(Utc::now());
            (climate, outcome)
        })
        .await
        .context("control cycle panicked")?;
        climate = returned;

        execute_action(&outcome);
    }

    Ok(())
}

async fn load_schedule(path: &Path) -> anyhow::Result<Schedule> {
    match tokio::fs::read(path).await {
        Ok(raw) => Schedule::from_json(&raw)
            .with_context(|| format!("invalid schedule in {}", path.display())),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(
                "no schedule at {}, using built-in residential schedule",
                path.display()
            );
            Ok(Schedule::residential_default())
        }
        Err(err) => {
            Err(err).with_context(|| format!("failed to read schedule {}", path.display()))
        }
    }
}

async fn build_sensor(options: &ControllerOptions) -> anyhow::Result<Box<dyn SensorSource + Send>> {
    if let Some(path) = &options.replay_path {
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read sensor replay {}", path.display()))?;
        let replay = ReplaySensor::from_json(&raw)
            .with_context(|| format!("invalid sensor replay {}", path.display()))?;
        info!(
            "replaying {} recorded sensor readings from {}",
            replay.remaining(),
            path.display()
        );
        return Ok(Box::new(replay));
    }

    let sensor = CommandSensor::new(
        &options.sensor_command,
        options.timing.sensor_timeout,
        tokio::runtime::Handle::current(),
    )?;
    Ok(Box::new(sensor))
}

// Relay/GPIO drivers hook in here. Returns the command sent, if any.
fn execute_action(outcome: &CycleOutcome) -> Option<ControlAction> {
    let report = match outcome {
        CycleOutcome::Decided(report) => report,
        CycleOutcome::Aborted(err) => {
            warn!("no action this cycle: {err}");
            return None;
        }
    };

    if check_time_missed(outcome) {
        warn!("last check time was not recorded this cycle");
    }

    if report.action == ControlAction::NoChange {
        debug!("holding current equipment state");
        return None;
    }

    info!("actuator command: {}", report.action);
    Some(report.action)
}

fn check_time_missed(outcome: &CycleOutcome) -> bool {
    matches!(outcome, CycleOutcome::Decided(report) if !report.persisted)
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use chrono::TimeZone;
    use climate_common::{
        ActiveSetpoint, CycleReport, MemoryStore, SensorError, SensorReading, ThermostatMode,
    };
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn missing_schedule_uses_residential_default() {
        let path = std::env::temp_dir()
            .join(format!("climate-host-{}", std::process::id()))
            .join("schedule.json");

        let schedule = load_schedule(&path).await.unwrap();

        assert_eq!(schedule, Schedule::residential_default());
    }

    #[tokio::test]
    async fn duplicate_schedule_times_fail_startup() {
        let dir = std::env::temp_dir().join(format!("climate-host-dup-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("schedule.json");
        std::fs::write(
            &path,
            br#"[
                {"time": "06:00", "target_f": 72.0, "mode": "HEAT"},
                {"time": "06:00", "target_f": 65.0, "mode": "OFF"}
            ]"#,
        )
        .unwrap();

        let err = load_schedule(&path).await.unwrap_err();

        assert!(format!("{err:#}").contains("more than one entry at 06:00"));
        let _ = std::fs::remove_dir_all(dir);
    }

    fn decided(action: ControlAction, persisted: bool) -> CycleOutcome {
        CycleOutcome::Decided(CycleReport {
            local_time: Utc
                .with_ymd_and_hms(2026, 1, 5, 6, 30, 0)
                .unwrap()
                .with_timezone(&chrono_tz::Tz::UTC),
            timezone: "UTC".to_string(),
            setpoint: ActiveSetpoint {
                target_temp_f: 72.0,
                mode: ThermostatMode::Heat,
            },
            temperature_f: 71.0,
            humidity_percent: Some(40.0),
            action,
            persisted,
        })
    }

    #[test]
    fn unsaved_cycle_is_flagged_even_when_holding() {
        let holding = decided(ControlAction::NoChange, false);

        assert!(check_time_missed(&holding));
        assert_eq!(execute_action(&holding), None);
        assert!(!check_time_missed(&decided(ControlAction::NoChange, true)));
        // Aborted cycles skip the save on purpose.
        assert!(!check_time_missed(&CycleOutcome::Aborted(
            SensorError::MissingTemperature
        )));
    }

    #[test]
    fn only_real_commands_reach_the_actuator() {
        assert_eq!(execute_action(&decided(ControlAction::NoChange, true)), None);
        assert_eq!(
            execute_action(&decided(ControlAction::HeatOn, true)),
            Some(ControlAction::HeatOn)
        );
        assert_eq!(
            execute_action(&CycleOutcome::Aborted(SensorError::MissingTemperature)),
            None
        );
    }

    /// Blocks like the collector process does and counts how often it ran.
    struct SlowSensor {
        reads: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl SensorSource for SlowSensor {
        fn read(&mut self) -> SensorReading {
            self.reads.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            SensorReading::ok(Utc::now(), 70.0, 40.0)
        }
    }

    #[tokio::test]
    async fn shutdown_during_cycle_stops_after_that_cycle() {
        let reads = Arc::new(AtomicUsize::new(0));
        let climate = ClimateLoop::new(
            MemoryStore::default(),
            SlowSensor {
                reads: reads.clone(),
                delay: Duration::from_millis(200),
            },
            Schedule::residential_default(),
        );

        // Fires while the first cycle is still reading the sensor.
        let shutdown = tokio::time::sleep(Duration::from_millis(50));

        tokio::time::timeout(
            Duration::from_secs(5),
            drive_cycles(climate, Duration::from_millis(10), shutdown),
        )
        .await
        .expect("loop ignored shutdown")
        .unwrap();

        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn env_secs_ignores_zero_and_garbage() {
        std::env::set_var("CLIMATE_TEST_SECS_ZERO", "0");
        std::env::set_var("CLIMATE_TEST_SECS_BAD", "soon");
        std::env::set_var("CLIMATE_TEST_SECS_OK", "45");

        assert_eq!(env_secs("CLIMATE_TEST_SECS_ZERO"), None);
        assert_eq!(env_secs("CLIMATE_TEST_SECS_BAD"), None);
        assert_eq!(env_secs("CLIMATE_TEST_SECS_OK"), Some(Duration::from_secs(45)));
        assert_eq!(env_secs("CLIMATE_TEST_SECS_UNSET"), None);
    }
}
