//! Functionality related to the subcommands that create, check, script and
//! run the process of a tool.

pub mod command;
pub mod files;
pub mod submit;
