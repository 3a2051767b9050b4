//! Implementation of the 'retime' subcommand.
//!
//! Every matching ASS track is converted to SRT, retimed with the cue
//! pipeline and converted back, with its header pointing at the video.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use cuebatch_core::batch::{BatchRunner, BatchSummary, SubtitleRetimeHandler};
use cuebatch_core::external::ProcessInvoker;
use cuebatch_core::subtitle::RetimeOptions;

use crate::cli::{GlobalArgs, RetimeArgs};

use super::{build_config, progress_sink};

pub async fn run_retime(args: &RetimeArgs, global: &GlobalArgs) -> Result<BatchSummary> {
    let mut config = build_config(global, &args.extension);
    config.launch_delay_ms = args.launch_delay;
    config.validate().context("Invalid retime configuration")?;

    let handler = SubtitleRetimeHandler::from_config(&config)
        .with_options(RetimeOptions {
            write_ass: !args.no_ass,
        })
        .with_video(args.video_dir.clone(), args.video_ext.clone());
    let invoker = Arc::new(ProcessInvoker::from_config(&config));

    info!(
        "Retiming subtitles in {} (offset {} ms, gap threshold {} ms)",
        config.input_dir.display(),
        config.resync_offset_ms,
        config.gap_threshold_ms
    );

    BatchRunner::new(config, invoker, progress_sink(global))
        .run(handler)
        .await
        .context("Retime batch aborted")
}
