//! CLI module - command-line interface
//!
//! Contains the subcommands and their handlers.

pub mod commands;

pub use commands::{handle_command, Command, CommandResult, OutputOptions};
