//! Command-line interface for event-fanout.
//!
//! Provides the `run` command (one batch through the pipeline) and the
//! `init-schema` command (prepare the PostgreSQL table).

mod commands;

pub use commands::{parse_cli, resolve_config, run, run_with_cli, Cli, Commands, RunArgs};
