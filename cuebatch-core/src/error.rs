// ============================================================================
// cuebatch-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Custom Error Types for cuebatch-core
//
// This module defines the error taxonomy used throughout the core library.
// Only enumeration failures are fatal to a whole batch; every other variant is
// scoped to a single job and is reported without stopping the remaining jobs.
//
// KEY COMPONENTS:
// - CoreError: Enum of all failure kinds surfaced by the library
// - CoreResult: Convenience alias used by every fallible operation

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the cuebatch core library.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The candidate listing could not be produced. Aborts the whole batch
    /// before any job is submitted.
    #[error("Failed to enumerate candidates in '{}': {source}", dir.display())]
    Enumeration {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid job filter pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A subtitle record could not be parsed. Aborts processing for the
    /// affected job's timeline only.
    #[error("Malformed cue at line {line}: {reason}")]
    MalformedCue { line: usize, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to start command '{program}': {source}")]
    CommandStart {
        program: String,
        #[source]
        source: io::Error,
    },

    /// An external command ran but exited unsuccessfully. Scoped to one job.
    #[error("Command '{command}' failed ({}): {diagnostics}", exit_label(.exit_code))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        diagnostics: String,
    },

    #[error("Command description is empty")]
    EmptyCommand,

    #[error("Subtitle conversion failed during {step}: {diagnostics}")]
    Conversion { step: String, diagnostics: String },

    #[error("Job '{job}' was aborted: {reason}")]
    JobAborted { job: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

fn exit_label(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code".to_string(),
    }
}

/// Result type for cuebatch-core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;
