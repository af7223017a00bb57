//! Aurora nowcast runner.
//!
//! Wires configuration, the archive client and the nowcast pipeline into a
//! single run that writes the status document.

pub mod cli;
pub mod config;
pub mod run;
pub mod telemetry;

pub use cli::{Args, LogFormat};
pub use run::run_once;
