// ============================================================================
// cuebatch-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Running Out-of-Process Commands
//
// This module encapsulates every interaction with external command-line tools
// such as ffmpeg. Callers describe a command as a program plus argument list
// and receive a structured outcome (success flag, exit code, diagnostics).
// A failing command never becomes an error here: the batch treats completion
// uniformly and callers that care inspect the outcome.
//
// KEY COMPONENTS:
// - CommandSpec: Program name and argument list
// - CommandOutcome: Structured result of one invocation
// - CommandInvoker: Trait seam so tests can replace process spawning
// - ProcessInvoker: tokio::process implementation
// - testing::RecordingInvoker: Scriptable test double

pub mod process;
pub mod testing;

use std::fmt;

use async_trait::async_trait;

use crate::error::{CoreError, CoreResult};

pub use process::ProcessInvoker;

// ============================================================================
// COMMAND DESCRIPTION
// ============================================================================

/// A program name plus its argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Parses a whitespace-separated command line. No quoting is supported;
    /// paths containing spaces must be passed through [`CommandSpec::arg`].
    ///
    /// # Errors
    ///
    /// Returns `CoreError::EmptyCommand` for a blank line.
    pub fn parse(line: &str) -> CoreResult<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(CoreError::EmptyCommand)?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

// ============================================================================
// OUTCOME
// ============================================================================

/// Result of one external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// True when the process ran and exited with status zero
    pub success: bool,
    /// Exit code, `None` if the process never started or was killed by a signal
    pub exit_code: Option<i32>,
    /// Captured stderr, or the spawn error message
    pub diagnostics: String,
}

impl CommandOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            diagnostics: String::new(),
        }
    }

    pub fn failed(exit_code: Option<i32>, diagnostics: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code,
            diagnostics: diagnostics.into(),
        }
    }

    /// Outcome for a process that could not be started.
    pub fn spawn_failed(error: &CoreError) -> Self {
        Self::failed(None, error.to_string())
    }
}

// ============================================================================
// INVOKER TRAIT
// ============================================================================

/// Runs command descriptions out of process.
///
/// Implementations resolve once the command has finished (or failed to
/// start) and never return an error.
#[async_trait]
pub trait CommandInvoker: Send + Sync {
    async fn invoke(&self, command: &CommandSpec) -> CommandOutcome;
}
