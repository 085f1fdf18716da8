//! Library half of the `demsynth` binary: job files, flag handling and
//! command dispatch.

pub mod cli;
pub mod config;
mod error;
pub mod logging;

pub use cli::{resolve_config, run, Cli, Command};
pub use config::{load_config, load_config_from_str, DemsConfig, GapFillConfig, JobConfig};
pub use error::RunnerError;
pub use logging::init_logging;
