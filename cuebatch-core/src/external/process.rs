//! Process-backed command invoker built on `tokio::process`.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::{CommandInvoker, CommandOutcome, CommandSpec};
use crate::config::CoreConfig;
use crate::error::CoreError;

/// Spawns each command as a child process and waits for it to exit.
///
/// stdin and stdout are always discarded. stderr is captured and logged when
/// `log_stderr` is set, otherwise it is discarded as well.
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker {
    log_stderr: bool,
    launch_delay: Duration,
}

impl ProcessInvoker {
    pub fn new(log_stderr: bool) -> Self {
        Self {
            log_stderr,
            launch_delay: Duration::ZERO,
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(config.log_stderr).with_launch_delay(Duration::from_millis(config.launch_delay_ms))
    }

    /// Waits `delay` before every spawn.
    pub fn with_launch_delay(mut self, delay: Duration) -> Self {
        self.launch_delay = delay;
        self
    }
}

#[async_trait]
impl CommandInvoker for ProcessInvoker {
    async fn invoke(&self, command: &CommandSpec) -> CommandOutcome {
        if !self.launch_delay.is_zero() {
            tokio::time::sleep(self.launch_delay).await;
        }

        debug!("Executing command: {}", command);

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(if self.log_stderr {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                let error = CoreError::CommandStart {
                    program: command.program.clone(),
                    source,
                };
                warn!("{}", error);
                return CommandOutcome::spawn_failed(&error);
            }
        };

        let mut stderr_lines = Vec::new();
        if let Some(stderr) = child.stderr.take() {
            let mut lines = BufReader::new(stderr).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => stderr_lines.push(line),
                    Ok(None) => break,
                    Err(e) => {
                        debug!("Stopped reading stderr of '{}': {}", command.program, e);
                        break;
                    }
                }
            }
        }

        let status = match child.wait().await {
            Ok(status) => status,
            Err(e) => {
                warn!("Failed to wait for '{}': {}", command.program, e);
                return CommandOutcome::failed(None, e.to_string());
            }
        };

        let diagnostics = stderr_lines.join("\n");
        if status.success() {
            for line in &stderr_lines {
                debug!("[{}] {}", command.program, line);
            }
            CommandOutcome {
                success: true,
                exit_code: status.code(),
                diagnostics,
            }
        } else {
            warn!(
                "Command '{}' exited with status {}",
                command,
                status
                    .code()
                    .map_or_else(|| "signal".to_string(), |code| code.to_string())
            );
            for line in &stderr_lines {
                warn!("[{}] {}", command.program, line);
            }
            CommandOutcome::failed(status.code(), diagnostics)
        }
    }
}
