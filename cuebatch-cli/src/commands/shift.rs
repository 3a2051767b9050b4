//! Implementation of the 'shift' subcommand: runs the cue timing pipeline
//! over one SRT file without any external tool.

use std::fs;

use anyhow::{Context, Result, bail};
use log::info;

use cuebatch_core::timeline::{TimelinePipeline, parse_srt, write_srt};

use crate::cli::{GlobalArgs, ShiftArgs};

/// Returns the corrected document and its cue count.
pub fn shift_document(source: &str, global: &GlobalArgs) -> Result<(String, usize)> {
    if global.threshold <= 0 {
        bail!("--threshold must be positive, got {}", global.threshold);
    }
    let pipeline = TimelinePipeline::standard(global.offset, global.threshold);
    let cues = pipeline.apply(parse_srt(source)?);
    Ok((write_srt(&cues), cues.len()))
}

pub fn run_shift(args: &ShiftArgs, global: &GlobalArgs) -> Result<()> {
    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read '{}'", args.input.display()))?;
    let (output, count) = shift_document(&source, global)
        .with_context(|| format!("Failed to retime '{}'", args.input.display()))?;

    match &args.output {
        Some(path) => {
            fs::write(path, output)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            info!("Wrote {} cue(s) to {}", count, path.display());
        }
        None => print!("{output}"),
    }
    Ok(())
}
