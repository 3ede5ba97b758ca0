//! ledgermail CLI library.
//!
//! Configuration loading, component wiring, the ingest poll cycle, and the
//! `run`, `poll`, `reconcile` and `rules` commands behind the `ledgermail`
//! binary.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;

pub use cli::{Cli, Command};
pub use config::{AppConfig, Env};
pub use error::{CliError, Result};
pub use ingest::IngestCycle;
