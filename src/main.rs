use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use git_testament::{git_testament, render_testament};
use ngscloud::list::command::{list, ListArgs};
use ngscloud::process::command::{
    check, create, run, script, CheckArgs, CreateArgs, RunArgs, ScriptArgs,
};
use ngscloud::utils::settings::Settings;

git_testament!(TESTAMENT);

#[derive(Parser)]
#[command(name = "ngscloud", about, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    subcommand: Subcommands,

    /// Only errors are printed to the stderr stream.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// All available information, including debug information, is printed to
    /// stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// The application settings file.
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Subcommands {
    /// Lists the supported tools.
    List(ListArgs),

    /// Creates the config file of a tool with documented defaults.
    Create(CreateArgs),

    /// Checks the config file of a tool.
    Check(CheckArgs),

    /// Builds the process scripts of a tool without submitting them.
    Script(ScriptArgs),

    /// Submits the process of a tool to the cluster.
    Run(RunArgs),
}

fn main() -> anyhow::Result<()> {
    let version = render_testament!(TESTAMENT);
    let matches = Cli::command().version(version).get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());

    let mut level = tracing::Level::INFO;
    if cli.quiet {
        level = tracing::Level::ERROR;
    } else if cli.verbose {
        level = tracing::Level::DEBUG;
    }

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let settings = Settings::load(cli.settings.as_deref())?;

    match cli.subcommand {
        Subcommands::List(args) => list(args, &settings),
        Subcommands::Create(args) => create(args, &settings),
        Subcommands::Check(args) => check(args, &settings),
        Subcommands::Script(args) => script(args, &settings),
        Subcommands::Run(args) => run(args, &settings),
    }
}
