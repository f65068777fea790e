use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use ngscloud::process::files::{check_config, read_valid_config, render_processes, write_config};
use ngscloud::process::submit::{run_processes, ProcessStatus};
use ngscloud::tools::{get_all_drivers, get_driver, PlanContext, Seed};
use ngscloud::utils::remote::{CommandOutput, RemoteSession};
use ngscloud::utils::settings::{PollingSettings, Settings};

#[derive(Default)]
struct FakeSession {
    commands: Vec<String>,
    uploads: Vec<(PathBuf, String)>,
    statuses: VecDeque<&'static str>,
}

impl RemoteSession for FakeSession {
    fn execute(&mut self, command: &str) -> anyhow::Result<CommandOutput> {
        self.commands.push(command.to_string());
        let stdout = if command.starts_with("if [ -f") {
            format!("{}\n", self.statuses.pop_front().unwrap_or("OK"))
        } else {
            String::new()
        };

        Ok(CommandOutput {
            status: Some(0),
            stdout,
            stderr: String::new(),
        })
    }

    fn upload(&mut self, local_path: &Path, remote_path: &str) -> anyhow::Result<()> {
        assert!(local_path.exists(), "{} was not rendered", local_path.display());
        self.uploads.push((local_path.to_path_buf(), remote_path.to_string()));
        Ok(())
    }
}

fn settings(dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.local.config_dir = dir.join("config");
    settings.local.temp_dir = dir.join("temp");
    settings.polling = PollingSettings {
        interval_secs: 0,
        timeout_secs: Some(60),
    };
    settings
}

#[test]
fn every_default_config_checks_and_scripts() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());

    for driver in get_all_drivers() {
        write_config(driver.as_ref(), &settings, &Seed::default()).unwrap();

        let report = check_config(driver.as_ref(), &settings).unwrap();
        assert!(report.is_valid(), "{}", report);

        let options = read_valid_config(driver.as_ref(), &settings).unwrap();
        let context = PlanContext::new(&settings);
        let processes = render_processes(driver.as_ref(), &options, &context, "c1").unwrap();
        assert_eq!(processes.len(), 1, "{}", driver.name());

        let script = fs::read_to_string(&processes[0].local_script).unwrap();
        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains(&format!("/{}-", driver.code())));
        assert!(script.trim_end().ends_with("end"));
    }
}

#[test]
fn seeded_trimmomatic_config() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let driver = get_driver("trimmomatic").unwrap();
    let seed = Seed {
        experiment_id: Some(String::from("exp002")),
        read_files_1: vec![String::from("s1_1.fq"), String::from("s2_1.fq")],
        read_files_2: vec![String::from("s1_2.fq"), String::from("s2_2.fq")],
        ..Seed::default()
    };
    let path = write_config(driver.as_ref(), &settings, &seed).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("[library-2]"));
    assert!(text.contains("s2_2.fq"));
    assert!(check_config(driver.as_ref(), &settings).unwrap().is_valid());
}

#[test]
fn edited_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let driver = get_driver("quast").unwrap();
    let path = write_config(driver.as_ref(), &settings, &Seed::default()).unwrap();

    let text = fs::read_to_string(&path)
        .unwrap()
        .replace("threads = 4", "threads = four");
    fs::write(&path, text).unwrap();

    let report = check_config(driver.as_ref(), &settings).unwrap();
    assert!(!report.is_valid());
    assert_eq!(
        report.to_string(),
        "*** ERROR: the key \"threads\" has to be an integer number greater than or equal to 1.\n\nThe QUAST config file is not valid. Please, correct this file or recreate it."
    );
}

#[test]
fn run_submits_and_waits() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let driver = get_driver("cuffquant").unwrap();
    write_config(driver.as_ref(), &settings, &Seed::default()).unwrap();

    let mut session = FakeSession {
        statuses: VecDeque::from(vec!["RUNNING", "OK"]),
        ..FakeSession::default()
    };
    let statuses = run_processes(&mut session, driver.as_ref(), &settings, "c1", true).unwrap();

    assert_eq!(statuses, vec![ProcessStatus::Ok]);
    assert_eq!(session.commands[0], "true");
    assert_eq!(
        session.commands[1],
        "test -d /ngscloud2/apps/Miniconda3/envs/cufflinks"
    );
    assert!(session.commands[2].starts_with("mkdir --parents /ngscloud2/results/exp001/cuffquant-"));
    assert!(session.commands[5].starts_with("nohup "));
    assert_eq!(session.uploads.len(), 2);
    assert!(session.uploads[0].1.ends_with("/cuffquant-process.sh"));
}

#[test]
fn run_fails_when_a_process_ends_wrong() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let driver = get_driver("quast").unwrap();
    write_config(driver.as_ref(), &settings, &Seed::default()).unwrap();

    let mut session = FakeSession {
        statuses: VecDeque::from(vec!["WRONG"]),
        ..FakeSession::default()
    };
    let err = run_processes(&mut session, driver.as_ref(), &settings, "c1", true).unwrap_err();
    assert!(err.to_string().starts_with("the QUAST process ended WRONG in "));
}

#[test]
fn run_without_waiting() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let driver = get_driver("bowtie2").unwrap();
    write_config(driver.as_ref(), &settings, &Seed::default()).unwrap();

    let mut session = FakeSession::default();
    let statuses = run_processes(&mut session, driver.as_ref(), &settings, "c1", false).unwrap();

    assert_eq!(statuses, vec![ProcessStatus::Running]);
    assert!(!session.commands.iter().any(|c| c.starts_with("if [ -f")));
}
