//! CLI module for reviewr - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
