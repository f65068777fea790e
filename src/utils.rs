//! Utilities that are used across the `ngscloud` drivers and subcommands.

pub mod codes;
pub mod layout;
pub mod options;
pub mod parameters;
pub mod remote;
pub mod script;
pub mod settings;
pub mod validation;
