//! eventwire CLI library
//!
//! Flag parsing, configuration and process wiring for the `wsclient` binary.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use config::AppConfig;
pub use error::{CliError, Result};
