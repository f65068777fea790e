//! Submitting rendered processes to the cluster and waiting for them.

use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::process::files::{read_valid_config, render_processes, RenderedProcess};
use crate::tools::{Driver, PlanContext};
use crate::utils::layout::{status_ok, status_wrong, ClusterLayout};
use crate::utils::remote::RemoteSession;
use crate::utils::settings::{PollingSettings, Settings};

//================//
// Process status //
//================//

/// The state of a submitted process, read from its status markers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Neither marker exists yet.
    Running,

    /// The script ended OK.
    Ok,

    /// The script ended WRONG.
    Wrong,
}

impl FromStr for ProcessStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "RUNNING" => Ok(ProcessStatus::Running),
            "OK" => Ok(ProcessStatus::Ok),
            "WRONG" => Ok(ProcessStatus::Wrong),
            other => Err(format!("Unknown process status: {}", other)),
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStatus::Running => write!(f, "RUNNING"),
            ProcessStatus::Ok => write!(f, "OK"),
            ProcessStatus::Wrong => write!(f, "WRONG"),
        }
    }
}

/// The shell snippet printing the status of the process in `run_dir`.
pub fn status_command(run_dir: &str) -> String {
    format!(
        "if [ -f {} ]; then echo OK; elif [ -f {} ]; then echo WRONG; else echo RUNNING; fi",
        status_ok(run_dir),
        status_wrong(run_dir)
    )
}

/// Reads the status of the process in `run_dir`.
pub fn query_status(session: &mut dyn RemoteSession, run_dir: &str) -> anyhow::Result<ProcessStatus> {
    let output = session.execute_checked(&status_command(run_dir))?;
    output
        .stdout
        .parse::<ProcessStatus>()
        .map_err(|err: String| anyhow!(err))
        .with_context(|| format!("reading the status of {}", run_dir))
}

//============//
// Submission //
//============//

/// Checks the cluster answers and every conda environment the driver needs
/// is installed.
pub fn check_requirements(
    session: &mut dyn RemoteSession,
    driver: &dyn Driver,
    layout: &ClusterLayout,
) -> anyhow::Result<()> {
    info!("Checking the cluster is reachable ...");
    session
        .execute_checked("true")
        .context("the cluster is not reachable")?;

    for environment in driver.environments() {
        let env_dir = layout.conda_env_dir(environment);
        info!("Checking the conda environment {} ...", environment);
        let output = session.execute(&format!("test -d {}", env_dir))?;
        if !output.success() {
            bail!(
                "{} is not installed in the cluster: the conda environment {} was not found",
                driver.name(),
                env_dir
            );
        }
    }

    info!("The requirements are OK.");
    Ok(())
}

/// Uploads a rendered process and launches its starter detached.
pub fn submit(session: &mut dyn RemoteSession, process: &RenderedProcess) -> anyhow::Result<()> {
    info!("Creating the run directory {} ...", process.run_dir);
    session.execute_checked(&format!("mkdir --parents {}", process.run_dir))?;

    for (local, remote) in [
        (&process.local_script, &process.remote_script),
        (&process.local_starter, &process.remote_starter),
    ] {
        info!("Uploading {} ...", remote);
        session
            .upload(local, remote)
            .with_context(|| format!("uploading {}", local.display()))?;
        session.execute_checked(&format!("chmod u+x {}", remote))?;
    }

    info!("Submitting the process in {} ...", process.run_dir);
    session.execute_checked(&format!("nohup {} &>/dev/null &", process.remote_starter))?;
    info!("The process was submitted.");
    Ok(())
}

//=========//
// Waiting //
//=========//

/// Polls the status markers of every run directory until none is running.
pub fn wait(
    session: &mut dyn RemoteSession,
    run_dirs: &[String],
    polling: &PollingSettings,
) -> anyhow::Result<Vec<ProcessStatus>> {
    let started = Instant::now();
    let mut statuses = vec![ProcessStatus::Running; run_dirs.len()];

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{prefix:.cyan.bold} {spinner:.green} [{elapsed_precise}] {msg}"),
    );
    pb.set_prefix("Waiting");

    loop {
        for (status, run_dir) in statuses.iter_mut().zip(run_dirs) {
            if *status != ProcessStatus::Running {
                continue;
            }

            *status = query_status(session, run_dir)?;
            if *status != ProcessStatus::Running {
                pb.println(format!("{} ended {}", run_dir, status));
            }
        }

        let running = statuses
            .iter()
            .filter(|status| **status == ProcessStatus::Running)
            .count();
        if running == 0 {
            break;
        }

        pb.set_message(format!("{} of {} processes running", running, run_dirs.len()));
        pb.tick();

        if let Some(timeout) = polling.timeout_secs {
            if started.elapsed() >= Duration::from_secs(timeout) {
                pb.abandon_with_message("Timed out");
                bail!(
                    "timed out after {} s waiting for {} process(es) to end",
                    timeout,
                    running
                );
            }
        }

        thread::sleep(Duration::from_secs(polling.interval_secs));
    }

    pb.set_style(
        ProgressStyle::default_spinner().template("{prefix:.green.bold} {msg:.white.bold} [{elapsed_precise}]"),
    );
    pb.set_prefix("✓");
    pb.finish_with_message("Finished");
    Ok(statuses)
}

//==========//
// Run flow //
//==========//

/// Checks the config file of `driver`, submits every process it plans and,
/// when `wait_for_end` is set, waits until all of them end.
pub fn run_processes(
    session: &mut dyn RemoteSession,
    driver: &dyn Driver,
    settings: &Settings,
    cluster_name: &str,
    wait_for_end: bool,
) -> anyhow::Result<Vec<ProcessStatus>> {
    info!("Checking the {} config file ...", driver.name());
    let options = read_valid_config(driver, settings)?;
    info!("The {} config file is OK.", driver.name());

    check_requirements(session, driver, &settings.cluster)?;

    let context = PlanContext::new(settings);
    let processes = render_processes(driver, &options, &context, cluster_name)?;
    for process in &processes {
        submit(session, process)?;
    }

    let run_dirs: Vec<String> = processes.iter().map(|p| p.run_dir.clone()).collect();
    if !wait_for_end {
        info!(
            "{} process(es) submitted; the log of each one is written to {{run_dir}}/{}.",
            processes.len(),
            settings.cluster.log_file
        );
        return Ok(vec![ProcessStatus::Running; processes.len()]);
    }

    let statuses = wait(session, &run_dirs, &settings.polling)?;
    let failed: Vec<&str> = run_dirs
        .iter()
        .zip(&statuses)
        .filter(|(_, status)| **status == ProcessStatus::Wrong)
        .map(|(run_dir, _)| run_dir.as_str())
        .collect();

    if !failed.is_empty() {
        for run_dir in &failed {
            error!("See the log {}/{}.", run_dir, settings.cluster.log_file);
        }
        bail!("the {} process ended WRONG in {}", driver.name(), failed.join(", "));
    }

    info!("The {} process ended OK.", driver.name());
    Ok(statuses)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::tools::get_driver;
    use crate::utils::remote::CommandOutput;

    #[derive(Default)]
    struct FakeSession {
        commands: Vec<String>,
        uploads: Vec<(PathBuf, String)>,
        statuses: VecDeque<&'static str>,
        missing: Vec<String>,
    }

    fn exited(status: i32, stdout: &str) -> CommandOutput {
        CommandOutput {
            status: Some(status),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    impl RemoteSession for FakeSession {
        fn execute(&mut self, command: &str) -> anyhow::Result<CommandOutput> {
            self.commands.push(command.to_string());
            if let Some(dir) = command.strip_prefix("test -d ") {
                let status = if self.missing.iter().any(|m| m == dir) { 1 } else { 0 };
                return Ok(exited(status, ""));
            }
            if command.starts_with("if [ -f") {
                let status = self.statuses.pop_front().unwrap_or("OK");
                return Ok(exited(0, &format!("{}\n", status)));
            }
            Ok(exited(0, ""))
        }

        fn upload(&mut self, local_path: &Path, remote_path: &str) -> anyhow::Result<()> {
            self.uploads.push((local_path.to_path_buf(), remote_path.to_string()));
            Ok(())
        }
    }

    fn polling() -> PollingSettings {
        PollingSettings {
            interval_secs: 0,
            timeout_secs: None,
        }
    }

    fn process(run_dir: &str) -> RenderedProcess {
        RenderedProcess {
            run_dir: run_dir.to_string(),
            local_script: PathBuf::from("/tmp/quast-process.sh"),
            local_starter: PathBuf::from("/tmp/quast-process-starter.sh"),
            remote_script: format!("{}/quast-process.sh", run_dir),
            remote_starter: format!("{}/quast-process-starter.sh", run_dir),
        }
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("OK\n".parse::<ProcessStatus>().unwrap(), ProcessStatus::Ok);
        assert_eq!("WRONG".parse::<ProcessStatus>().unwrap(), ProcessStatus::Wrong);
        assert!("DONE".parse::<ProcessStatus>().is_err());
        assert_eq!(ProcessStatus::Running.to_string(), "RUNNING");
    }

    #[test]
    fn test_status_command() {
        assert_eq!(
            status_command("/r/run"),
            "if [ -f /r/run/status/script.ok ]; then echo OK; elif [ -f /r/run/status/script.wrong ]; then echo WRONG; else echo RUNNING; fi"
        );
    }

    #[test]
    fn test_submit_sequence() {
        let mut session = FakeSession::default();
        submit(&mut session, &process("/r/run")).unwrap();

        assert_eq!(
            session.commands,
            vec![
                "mkdir --parents /r/run",
                "chmod u+x /r/run/quast-process.sh",
                "chmod u+x /r/run/quast-process-starter.sh",
                "nohup /r/run/quast-process-starter.sh &>/dev/null &",
            ]
        );
        assert_eq!(session.uploads[0].1, "/r/run/quast-process.sh");
        assert_eq!(session.uploads[1].1, "/r/run/quast-process-starter.sh");
    }

    #[test]
    fn test_missing_environment() {
        let layout = ClusterLayout::default();
        let driver = get_driver("bowtie2").unwrap();
        let mut session = FakeSession {
            missing: vec![layout.conda_env_dir("samtools")],
            ..FakeSession::default()
        };

        let err = check_requirements(&mut session, driver.as_ref(), &layout).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Bowtie2 is not installed in the cluster: the conda environment /ngscloud2/apps/Miniconda3/envs/samtools was not found"
        );
    }

    #[test]
    fn test_wait_until_every_process_ends() {
        let mut session = FakeSession {
            statuses: VecDeque::from(vec!["RUNNING", "RUNNING", "OK", "WRONG"]),
            ..FakeSession::default()
        };
        let run_dirs = vec![String::from("/r/a"), String::from("/r/b")];

        let statuses = wait(&mut session, &run_dirs, &polling()).unwrap();
        assert_eq!(statuses, vec![ProcessStatus::Ok, ProcessStatus::Wrong]);
        assert_eq!(session.commands.len(), 4);
    }

    #[test]
    fn test_wait_times_out() {
        let mut session = FakeSession {
            statuses: VecDeque::from(vec!["RUNNING"; 10]),
            ..FakeSession::default()
        };
        let run_dirs = vec![String::from("/r/a")];
        let polling = PollingSettings {
            interval_secs: 0,
            timeout_secs: Some(0),
        };

        let err = wait(&mut session, &run_dirs, &polling).unwrap_err();
        assert!(err.to_string().starts_with("timed out after 0 s"));
    }
}
