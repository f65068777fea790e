//! Functionality related to the `ngscloud list` command itself.

use clap::Args;
use prettytable::{row, Table};

use crate::tools::get_all_drivers;
use crate::utils::settings::Settings;

//========================//
// Command-line arguments //
//========================//

/// Command line arguments for `ngscloud list`.
#[derive(Args, Debug)]
pub struct ListArgs {}

//==============//
// Main command //
//==============//

/// Builds the table of every supported tool.
pub fn tool_table(settings: &Settings) -> Table {
    let mut table = Table::new();

    table.add_row(row!["Name", "Command", "Code", "Environments", "Config file"]);
    for driver in get_all_drivers() {
        table.add_row(row![
            driver.name(),
            driver.command_name(),
            driver.code(),
            driver.environments().join(", "),
            driver.config_file(settings).display(),
        ]);
    }

    table
}

/// Main method for the `ngscloud list` subcommand.
pub fn list(_: ListArgs, settings: &Settings) -> anyhow::Result<()> {
    tool_table(settings).printstd();
    Ok(())
}
