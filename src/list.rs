//! Functionality related to the `ngscloud list` subcommand.

pub mod command;
