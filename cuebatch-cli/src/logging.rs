// ============================================================================
// cuebatch-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: env_logger Initialisation for the CLI
//
// The core library only logs through the `log` facade. This module installs
// env_logger as the backend with a compact colored line format.
//
// USAGE:
// - Default level is info, --verbose raises it to debug
// - RUST_LOG, when set, overrides both (e.g. RUST_LOG=cuebatch_core=trace)

use console::style;
use env_logger::Env;
use log::{Level, LevelFilter};
use std::io::Write;

/// Level used when RUST_LOG is not set.
pub fn default_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Installs the global logger. Safe to call more than once; later calls are
/// ignored.
pub fn init(verbose: bool) {
    let env = Env::default().default_filter_or(default_level(verbose).as_str());
    let _ = env_logger::Builder::from_env(env)
        .format(|buf, record| {
            let level = match record.level() {
                Level::Error => style("ERROR").red().bold(),
                Level::Warn => style("WARN ").yellow(),
                Level::Info => style("INFO ").green(),
                Level::Debug => style("DEBUG").blue(),
                Level::Trace => style("TRACE").magenta(),
            };
            writeln!(
                buf,
                "{} {} {}",
                style(chrono::Local::now().format("%H:%M:%S")).dim(),
                level,
                record.args()
            )
        })
        .try_init();
}
