//! Local artefacts of a process: the config file, and the rendered scripts
//! and starters waiting to be uploaded.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use tracing::{debug, info};

use crate::tools::{Driver, PlanContext, Seed};
use crate::utils::options::OptionDict;
use crate::utils::script::{render_starter, ScriptContext};
use crate::utils::settings::Settings;
use crate::utils::validation::ValidationReport;

/// A process script and its starter, rendered locally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedProcess {
    /// The run directory on the cluster.
    pub run_dir: String,

    /// The rendered script.
    pub local_script: PathBuf,

    /// The rendered starter.
    pub local_starter: PathBuf,

    /// Where the script is uploaded.
    pub remote_script: String,

    /// Where the starter is uploaded.
    pub remote_starter: String,
}

fn create_dir(dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating directory: {}", dir.display()))
}

/// Writes the default config file of `driver`, replacing any existing one.
pub fn write_config(driver: &dyn Driver, settings: &Settings, seed: &Seed) -> anyhow::Result<PathBuf> {
    let path = driver.config_file(settings);
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }

    if path.exists() {
        debug!("Replacing the existing config file {}.", path.display());
    }

    fs::write(&path, driver.default_config(seed, &settings.cluster))
        .with_context(|| format!("writing config file: {}", path.display()))?;
    info!("The {} config file was created: {}", driver.name(), path.display());
    Ok(path)
}

fn read_config_text(driver: &dyn Driver, settings: &Settings) -> anyhow::Result<String> {
    let path = driver.config_file(settings);
    if !path.exists() {
        bail!(
            "the {} config file {} does not exist; create it with `ngscloud create {}`",
            driver.name(),
            path.display(),
            driver.command_name()
        );
    }

    fs::read_to_string(&path).with_context(|| format!("reading config file: {}", path.display()))
}

/// Checks the config file of `driver`. Syntax errors are reported like any
/// other problem.
pub fn check_config(driver: &dyn Driver, settings: &Settings) -> anyhow::Result<ValidationReport> {
    let text = read_config_text(driver, settings)?;
    let report = match text.parse::<OptionDict>() {
        Ok(options) => driver.check(&options),
        Err(err) => {
            ValidationReport::failed(driver.name(), format!("the syntax is WRONG ({}).", err))
        }
    };
    Ok(report)
}

/// Reads the config file of `driver`, failing unless it is valid.
pub fn read_valid_config(driver: &dyn Driver, settings: &Settings) -> anyhow::Result<OptionDict> {
    let text = read_config_text(driver, settings)?;
    let options: OptionDict = match text.parse() {
        Ok(options) => options,
        Err(err) => bail!(
            "{}",
            ValidationReport::failed(driver.name(), format!("the syntax is WRONG ({}).", err))
        ),
    };

    driver.check(&options).into_result()?;
    Ok(options)
}

/// The local file name of the `n`th (zero-based) artefact of a run: the
/// first one keeps the plain name, the next ones are suffixed with `-2`,
/// `-3` and so on.
fn numbered_name(name: &str, n: usize) -> String {
    if n == 0 {
        return name.to_string();
    }

    match name.strip_suffix(".sh") {
        Some(stem) => format!("{}-{}.sh", stem, n + 1),
        None => format!("{}-{}", name, n + 1),
    }
}

/// Plans the processes of a valid config and renders their scripts and
/// starters into the local temp directory.
pub fn render_processes(
    driver: &dyn Driver,
    options: &OptionDict,
    context: &PlanContext<'_>,
    cluster_name: &str,
) -> anyhow::Result<Vec<RenderedProcess>> {
    let settings = context.settings;
    let temp_dir = &settings.local.temp_dir;
    create_dir(temp_dir)?;

    let script_context = ScriptContext {
        cluster_name,
        settings,
    };
    let script_name = driver.script_name();
    let starter_name = driver.starter_name();

    let scripts = driver.plan(options, context)?;
    let mut processes = Vec::with_capacity(scripts.len());

    for (n, script) in scripts.iter().enumerate() {
        let run_dir = script.run_dir().to_string();
        let local_script = temp_dir.join(numbered_name(&script_name, n));
        let local_starter = temp_dir.join(numbered_name(&starter_name, n));

        fs::write(&local_script, script.render(&script_context))
            .with_context(|| format!("writing process script: {}", local_script.display()))?;
        fs::write(
            &local_starter,
            render_starter(&run_dir, &script_name, &settings.cluster.log_file),
        )
        .with_context(|| format!("writing process starter: {}", local_starter.display()))?;

        info!(
            "The {} process script for {} was built: {}",
            driver.name(),
            run_dir,
            local_script.display()
        );

        processes.push(RenderedProcess {
            remote_script: format!("{}/{}", run_dir, script_name),
            remote_starter: format!("{}/{}", run_dir, starter_name),
            run_dir,
            local_script,
            local_starter,
        });
    }

    Ok(processes)
}
