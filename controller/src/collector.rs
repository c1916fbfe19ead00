use std::{process::Stdio, time::Duration};

use anyhow::{bail, Context};
use chrono::Utc;
use climate_common::{SensorReading, SensorSource};
use tokio::{process::Command, runtime::Handle};
use tracing::debug;

/// Runs the collector program once per read and parses the JSON document it
/// prints. Must be driven from a blocking context (not from inside an async task).
pub struct CommandSensor {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    runtime: Handle,
}

impl CommandSensor {
    pub fn new(command_line: &str, timeout: Duration, runtime: Handle) -> anyhow::Result<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let Some(program) = parts.next() else {
            bail!("sensor command is empty");
        };

        Ok(Self {
            program,
            args: parts.collect(),
            timeout,
            runtime,
        })
    }

    async fn collect(&self) -> anyhow::Result<SensorReading> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "collector '{}' timed out after {}ms",
                    self.program,
                    self.timeout.as_millis()
                )
            })?
            .with_context(|| format!("failed to run collector '{}'", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "collector '{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            );
        }

        debug!("collector output: {} bytes", output.stdout.len());
        serde_json::from_slice(&output.stdout).context("collector returned invalid JSON")
    }
}

impl SensorSource for CommandSensor {
    fn read(&mut self) -> SensorReading {
        match self.runtime.block_on(self.collect()) {
            Ok(reading) => reading,
            Err(err) => SensorReading::error(Utc::now(), format!("{err:#}")),
        }
    }
}
