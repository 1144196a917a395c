//! Subcommand implementations.

pub mod list;
