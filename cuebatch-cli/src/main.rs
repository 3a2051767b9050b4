// cuebatch-cli/src/main.rs
//
// Entry point for the cuebatch binary.
//
// Responsibilities:
// - Parsing arguments with clap
// - Initialising logging
// - Dispatching to the selected subcommand
// - Printing the batch summary
// - Exiting with status 1 on fatal errors

use std::process;

use clap::Parser;
use console::style;
use log::debug;

use cuebatch_cli::cli::{Cli, Commands};
use cuebatch_cli::{logging, run_batch, run_retime, run_shift, terminal};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.global.verbose);
    debug!("Parsed arguments: {:?}", cli);

    let outcome = match &cli.command {
        Commands::Run(args) => run_batch(args, &cli.global).await.map(Some),
        Commands::Retime(args) => run_retime(args, &cli.global).await.map(Some),
        Commands::Shift(args) => run_shift(args, &cli.global).map(|()| None),
    };

    match outcome {
        Ok(Some(summary)) => {
            if let Err(e) = terminal::print_summary(&summary, cli.global.json) {
                eprintln!("{} {:#}", style("Error:").red().bold(), e);
                process::exit(1);
            }
        }
        Ok(None) => {}
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            process::exit(1);
        }
    }
}
