//! Paths on the cluster.
//!
//! Remote paths are always POSIX paths, so they are handled as plain strings
//! rather than [`std::path::PathBuf`]s.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// The directory layout of a cluster node.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClusterLayout {
    /// Where applications (including Miniconda) are installed.
    pub app_dir: String,

    /// Where read datasets live: `{read_dir}/{experiment}/{dataset}`.
    pub read_dir: String,

    /// Where reference datasets live: `{reference_dir}/{dataset}`.
    pub reference_dir: String,

    /// Where result datasets live: `{result_dir}/{experiment}/{dataset}`.
    pub result_dir: String,

    /// The name of the Miniconda installation under `app_dir`.
    pub miniconda_dir: String,

    /// The log file written into every run directory.
    pub log_file: String,
}

impl Default for ClusterLayout {
    fn default() -> Self {
        ClusterLayout {
            app_dir: String::from("/ngscloud2/apps"),
            read_dir: String::from("/ngscloud2/reads"),
            reference_dir: String::from("/ngscloud2/references"),
            result_dir: String::from("/ngscloud2/results"),
            miniconda_dir: String::from("Miniconda3"),
            log_file: String::from("log.txt"),
        }
    }
}

impl ClusterLayout {
    /// The directory of a reference dataset.
    pub fn reference_dataset_dir(&self, reference_dataset_id: &str) -> String {
        format!("{}/{}", self.reference_dir, reference_dataset_id)
    }

    /// A file within a reference dataset.
    pub fn reference_file(&self, reference_dataset_id: &str, file: &str) -> String {
        format!("{}/{}", self.reference_dataset_dir(reference_dataset_id), file)
    }

    /// The directory of a read dataset.
    pub fn read_dataset_dir(&self, experiment_id: &str, read_dataset_id: &str) -> String {
        format!("{}/{}/{}", self.read_dir, experiment_id, read_dataset_id)
    }

    /// The directory of a result dataset.
    pub fn result_dataset_dir(&self, experiment_id: &str, result_dataset_id: &str) -> String {
        format!("{}/{}/{}", self.result_dir, experiment_id, result_dataset_id)
    }

    /// The run directory of a new process: `{code}-{YYMMDD-HHMMSS}` inside the
    /// experiment's result directory.
    pub fn run_dir<Tz: TimeZone>(
        &self,
        experiment_id: &str,
        code: &str,
        started: &DateTime<Tz>,
    ) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        self.result_dataset_dir(
            experiment_id,
            &format!("{}-{}", code, started.format("%y%m%d-%H%M%S")),
        )
    }

    /// The `bin` directory of the Miniconda installation.
    pub fn miniconda_bin_dir(&self) -> String {
        format!("{}/{}/bin", self.app_dir, self.miniconda_dir)
    }

    /// The directory of an installed conda environment.
    pub fn conda_env_dir(&self, environment: &str) -> String {
        format!("{}/{}/envs/{}", self.app_dir, self.miniconda_dir, environment)
    }
}

/// The last component of a remote path.
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}

/// A remote path without its last extension, if any.
pub fn strip_extension(file: &str) -> &str {
    match file.rfind('.') {
        Some(i) if i > 0 && !file[i..].contains('/') => &file[..i],
        _ => file,
    }
}

//=============//
// Status dirs //
//=============//

/// The status directory of a run.
pub fn status_dir(run_dir: &str) -> String {
    format!("{}/status", run_dir)
}

/// The marker touched when the process script ends OK.
pub fn status_ok(run_dir: &str) -> String {
    format!("{}/script.ok", status_dir(run_dir))
}

/// The marker touched when the process script ends WRONG.
pub fn status_wrong(run_dir: &str) -> String {
    format!("{}/script.wrong", status_dir(run_dir))
}
