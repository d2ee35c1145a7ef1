//! Shared pieces of the `warehouse-cli` binary: the map/request JSON schema,
//! env-driven configuration, and the CLI-facing error type. Split out of
//! `main.rs` so the JSON round-trip in [`map_doc`] stays unit-testable
//! without going through `clap`.

pub mod config;
pub mod error;
pub mod map_doc;

pub use config::Config;
pub use error::CliError;
