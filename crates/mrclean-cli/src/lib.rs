//! Mr. Clean CLI library.
//!
//! Configuration loading, logging setup and argument parsing for the
//! `mrclean` binary. The sweep itself lives in `mrclean-engine`.

pub mod check;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;

pub use cli::Cli;
pub use config::Config;
pub use error::{CliError, Result};
