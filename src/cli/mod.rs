//! CLI module for voxroute - command-line interface and subcommands.
//!
//! Routes a single utterance, calls one handler directly, or lists the
//! domain store. With no subcommand it routes utterances read from stdin.

pub mod commands;

pub use commands::Cli;
