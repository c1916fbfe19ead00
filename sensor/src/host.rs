use std::io::Write;

use anyhow::Context;
use chrono::{DateTime, Utc};
use climate_common::SensorReading;
use tracing::{info, warn};

const SAMPLE_PERIOD_SECS: i64 = 30;

/// Takes one reading and prints it to stdout as a single JSON document.
/// Logs go to stderr so stdout stays machine readable.
pub fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let now = Utc::now();
    let reading = match std::env::var("CLIMATE_SENSOR_FAULT") {
        Ok(fault) if !fault.is_empty() => {
            warn!("simulated sensor fault: {fault}");
            SensorReading::error(now, fault)
        }
        _ => simulated_reading(now),
    };

    let payload = serde_json::to_string(&reading).context("failed to encode sensor reading")?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{payload}").context("failed to write sensor reading")?;
    stdout.flush().context("failed to flush sensor reading")?;

    info!("sensor reading published: {:?}", reading.status);
    Ok(())
}

// Hardware integration point:
// replace this simulated sample with the HDC302x driver behind the I2C multiplexer.
fn simulated_reading(now: DateTime<Utc>) -> SensorReading {
    let tick = now.timestamp().div_euclid(SAMPLE_PERIOD_SECS);
    let temperature_c = 20.0 + (tick.rem_euclid(8) as f32 * 0.1);
    let humidity = 42.0 + (tick.rem_euclid(6) as f32 * 0.5);

    SensorReading::from_celsius(now, temperature_c, humidity)
}
