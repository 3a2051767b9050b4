//! Implementation of the 'run' subcommand.
//!
//! Runs the command template once per matching file under the concurrency
//! cap and reports progress as jobs complete.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use cuebatch_core::batch::{BatchRunner, BatchSummary, CommandTemplateHandler};
use cuebatch_core::external::ProcessInvoker;

use crate::cli::{GlobalArgs, RunArgs};

use super::{build_config, progress_sink};

pub async fn run_batch(args: &RunArgs, global: &GlobalArgs) -> Result<BatchSummary> {
    let config = build_config(global, &args.extension);
    config.validate().context("Invalid batch configuration")?;

    let handler = CommandTemplateHandler::new(&args.template)
        .with_context(|| format!("Invalid command template '{}'", args.template))?;
    let invoker = Arc::new(ProcessInvoker::from_config(&config));

    info!(
        "Running '{}' on {} (max {} concurrent)",
        args.template,
        config.input_dir.display(),
        config.max_concurrent
    );

    BatchRunner::new(config, invoker, progress_sink(global))
        .run(handler)
        .await
        .context("Batch aborted")
}
