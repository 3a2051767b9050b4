// cuebatch-cli/src/lib.rs
//
// Library portion of the cuebatch CLI application.
// Contains argument definitions, command logic and terminal rendering.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod terminal;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands, GlobalArgs};
pub use commands::retime::run_retime;
pub use commands::run::run_batch;
pub use commands::shift::run_shift;
