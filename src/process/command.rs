//! Functionality related to the `ngscloud create`, `check`, `script` and
//! `run` subcommands.

use anyhow::bail;
use clap::builder::PossibleValuesParser;
use clap::Args;
use tracing::info;

use crate::process::files::{check_config, read_valid_config, render_processes, write_config};
use crate::process::submit::run_processes;
use crate::tools::{get_all_command_names, get_driver, Driver, PlanContext, Seed};
use crate::utils::codes::{AssemblyType, ReadType};
use crate::utils::remote::OpenSshSession;
use crate::utils::settings::Settings;

//========================//
// Command-line arguments //
//========================//

fn tool_parser() -> PossibleValuesParser {
    PossibleValuesParser::new(get_all_command_names())
}

fn driver_of(tool: &str) -> anyhow::Result<Box<dyn Driver>> {
    match get_driver(tool) {
        Some(driver) => Ok(driver),
        None => bail!("Unsupported tool: {}", tool),
    }
}

/// Values written into a new config file in place of the placeholders.
#[derive(Args, Debug, Default)]
pub struct SeedArgs {
    /// Experiment identification.
    #[arg(long, value_name = "ID")]
    experiment_id: Option<String>,

    /// Read dataset identification.
    #[arg(long, value_name = "ID")]
    read_dataset_id: Option<String>,

    /// Read type of the libraries (SE or PE).
    #[arg(long, value_name = "TYPE")]
    read_type: Option<ReadType>,

    /// First read file of a library. Repeat it for every library.
    #[arg(long = "read-file-1", value_name = "FILE")]
    read_files_1: Vec<String>,

    /// Second read file of a library, in the same order as --read-file-1.
    #[arg(long = "read-file-2", value_name = "FILE")]
    read_files_2: Vec<String>,

    /// Reference dataset identification.
    #[arg(long, value_name = "ID")]
    reference_dataset_id: Option<String>,

    /// Reference file name.
    #[arg(long, value_name = "FILE")]
    reference_file: Option<String>,

    /// Annotation (GTF/GFF) file name.
    #[arg(long, value_name = "FILE")]
    annotation_file: Option<String>,

    /// Mask (GTF/GFF) file name.
    #[arg(long, value_name = "FILE")]
    mask_file: Option<String>,

    /// Assembly dataset identification.
    #[arg(long, value_name = "ID")]
    assembly_dataset_id: Option<String>,

    /// Assembly type (CONTIGS, SCAFFOLDS or NONE).
    #[arg(long, value_name = "TYPE")]
    assembly_type: Option<AssemblyType>,

    /// Alignment dataset identification. Repeat it for every dataset.
    #[arg(long = "alignment-dataset-id", value_name = "ID")]
    alignment_dataset_ids: Vec<String>,

    /// Quantitation dataset identification.
    #[arg(long, value_name = "ID")]
    quantitation_dataset_id: Option<String>,
}

impl From<SeedArgs> for Seed {
    fn from(args: SeedArgs) -> Self {
        Seed {
            experiment_id: args.experiment_id,
            read_dataset_id: args.read_dataset_id,
            read_type: args.read_type,
            read_files_1: args.read_files_1,
            read_files_2: args.read_files_2,
            reference_dataset_id: args.reference_dataset_id,
            reference_file: args.reference_file,
            annotation_file: args.annotation_file,
            mask_file: args.mask_file,
            assembly_dataset_id: args.assembly_dataset_id,
            assembly_type: args.assembly_type,
            alignment_dataset_ids: args.alignment_dataset_ids,
            quantitation_dataset_id: args.quantitation_dataset_id,
        }
    }
}

/// Command line arguments for `ngscloud create`.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// The tool whose config file is created.
    #[arg(value_parser = tool_parser())]
    tool: String,

    #[command(flatten)]
    seed: SeedArgs,
}

/// Command line arguments for `ngscloud check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// The tool whose config file is checked.
    #[arg(value_parser = tool_parser())]
    tool: String,

    /// Prints the report as JSON.
    #[arg(long)]
    json: bool,
}

/// Command line arguments for `ngscloud script`.
#[derive(Args, Debug)]
pub struct ScriptArgs {
    /// The tool whose process scripts are built.
    #[arg(value_parser = tool_parser())]
    tool: String,

    /// The cluster the scripts are built for. Defaults to the
    /// `default_cluster_name` setting.
    #[arg(short, long, value_name = "NAME")]
    cluster_name: Option<String>,

    /// Uses this run directory instead of a new timestamped one.
    #[arg(long, value_name = "DIR")]
    run_dir: Option<String>,
}

/// Command line arguments for `ngscloud run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// The tool to run.
    #[arg(value_parser = tool_parser())]
    tool: String,

    /// The cluster to run on. Defaults to the `default_cluster_name` setting.
    #[arg(short, long, value_name = "NAME")]
    cluster_name: Option<String>,

    /// Returns as soon as the processes are submitted.
    #[arg(long)]
    no_wait: bool,
}

//===============//
// Main commands //
//===============//

/// Main method for the `ngscloud create` subcommand.
pub fn create(args: CreateArgs, settings: &Settings) -> anyhow::Result<()> {
    let driver = driver_of(&args.tool)?;
    let path = write_config(driver.as_ref(), settings, &Seed::from(args.seed))?;
    println!("{}", path.display());
    Ok(())
}

/// Main method for the `ngscloud check` subcommand.
pub fn check(args: CheckArgs, settings: &Settings) -> anyhow::Result<()> {
    let driver = driver_of(&args.tool)?;
    info!("Checking the {} config file ...", driver.name());
    let report = check_config(driver.as_ref(), settings)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }

    if !report.is_valid() {
        bail!(
            "{} problem(s) found in {}",
            report.issues.len(),
            driver.config_file(settings).display()
        );
    }

    Ok(())
}

/// Main method for the `ngscloud script` subcommand.
pub fn script(args: ScriptArgs, settings: &Settings) -> anyhow::Result<()> {
    let driver = driver_of(&args.tool)?;
    let cluster_name = settings.cluster_name(args.cluster_name.as_deref())?;
    let options = read_valid_config(driver.as_ref(), settings)?;

    let context = PlanContext {
        run_dir: args.run_dir,
        ..PlanContext::new(settings)
    };
    for process in render_processes(driver.as_ref(), &options, &context, &cluster_name)? {
        println!("{}", process.local_script.display());
        println!("{}", process.local_starter.display());
    }

    Ok(())
}

/// Main method for the `ngscloud run` subcommand.
pub fn run(args: RunArgs, settings: &Settings) -> anyhow::Result<()> {
    let driver = driver_of(&args.tool)?;
    let cluster_name = settings.cluster_name(args.cluster_name.as_deref())?;
    let mut session = OpenSshSession::new(&settings.ssh)?;

    info!("Running {} on the cluster {} ...", driver.name(), cluster_name);
    run_processes(
        &mut session,
        driver.as_ref(),
        settings,
        &cluster_name,
        !args.no_wait,
    )?;
    Ok(())
}
