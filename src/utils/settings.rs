//! Application settings.
//!
//! Settings are read from a JSON file. Every field has a default, so a
//! settings file only needs to hold what differs from the defaults (in
//! practice, the SSH connection details and the contact address).

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::utils::layout::ClusterLayout;

/// Environment variable that points at a settings file.
pub const SETTINGS_ENV_VAR: &str = "NGSCLOUD_SETTINGS";

/// The user's home directory, or the current directory when unknown.
pub fn home_dir() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

//=================//
// Local settings  //
//=================//

/// Where local artefacts are written.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LocalSettings {
    /// Directory holding the `{code}-config.txt` files.
    pub config_dir: PathBuf,

    /// Directory holding the rendered process scripts and starters.
    pub temp_dir: PathBuf,
}

impl Default for LocalSettings {
    fn default() -> Self {
        let base = home_dir().join("ngscloud");
        LocalSettings {
            config_dir: base.join("config"),
            temp_dir: base.join("temp"),
        }
    }
}

//==============//
// SSH settings //
//==============//

/// How to reach the cluster's master node.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SshSettings {
    /// Host name or address of the node.
    pub host: Option<String>,

    /// Remote user.
    pub user: String,

    /// SSH port.
    pub port: u16,

    /// Private key used to authenticate.
    pub identity_file: Option<PathBuf>,

    /// Extra `-o key=value` options.
    pub options: Vec<String>,

    /// The `ssh` program.
    pub ssh_program: String,

    /// The `scp` program.
    pub scp_program: String,
}

impl Default for SshSettings {
    fn default() -> Self {
        SshSettings {
            host: None,
            user: String::from("ubuntu"),
            port: 22,
            identity_file: None,
            options: vec![String::from("StrictHostKeyChecking=accept-new")],
            ssh_program: String::from("ssh"),
            scp_program: String::from("scp"),
        }
    }
}

//==================//
// Polling settings //
//==================//

/// How `ngscloud run` waits for submitted processes.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollingSettings {
    /// Seconds between two checks of the status markers.
    pub interval_secs: u64,

    /// Give up waiting after this many seconds.
    pub timeout_secs: Option<u64>,
}

impl Default for PollingSettings {
    fn default() -> Self {
        PollingSettings {
            interval_secs: 30,
            timeout_secs: None,
        }
    }
}

//==========//
// Settings //
//==========//

/// Every setting of the application.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Name used in notification subjects.
    pub project_name: String,

    /// Address notified when a process ends (also used as sender).
    pub contact_email: String,

    /// Cluster name used when none is given on the command line.
    pub default_cluster_name: Option<String>,

    /// Local directories.
    pub local: LocalSettings,

    /// Cluster directories.
    pub cluster: ClusterLayout,

    /// SSH connection.
    pub ssh: SshSettings,

    /// Waiting for submitted processes.
    pub polling: PollingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            project_name: String::from("NGScloud2"),
            contact_email: String::from("user@example.com"),
            default_cluster_name: None,
            local: LocalSettings::default(),
            cluster: ClusterLayout::default(),
            ssh: SshSettings::default(),
            polling: PollingSettings::default(),
        }
    }
}

impl Settings {
    /// Reads settings from a JSON file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading settings file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parsing settings file: {}", path.display()))
    }

    /// Loads the settings from, in order of preference: `explicit`, the file
    /// named by `NGSCLOUD_SETTINGS`, `~/.ngscloud/settings.json` (when it
    /// exists). Falls back to the defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            debug!("Loading settings from {}.", path.display());
            return Self::from_file(path);
        }

        if let Some(path) = env::var_os(SETTINGS_ENV_VAR) {
            let path = PathBuf::from(path);
            debug!("Loading settings from {} ({}).", path.display(), SETTINGS_ENV_VAR);
            return Self::from_file(&path);
        }

        let path = home_dir().join(".ngscloud").join("settings.json");
        if path.exists() {
            debug!("Loading settings from {}.", path.display());
            return Self::from_file(&path);
        }

        debug!("No settings file found, using the defaults.");
        Ok(Settings::default())
    }

    /// Resolves the cluster name to use.
    pub fn cluster_name(&self, given: Option<&str>) -> anyhow::Result<String> {
        match given.or(self.default_cluster_name.as_deref()) {
            Some(name) => Ok(name.to_string()),
            None => anyhow::bail!(
                "no cluster name was given and no default_cluster_name is set in the settings"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_partial_settings_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "contact_email": "someone@example.org",
                "cluster": {{ "result_dir": "/data/results" }},
                "ssh": {{ "host": "node1", "port": 2222 }}
            }}"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.contact_email, "someone@example.org");
        assert_eq!(settings.project_name, "NGScloud2");
        assert_eq!(settings.cluster.result_dir, "/data/results");
        assert_eq!(settings.cluster.read_dir, "/ngscloud2/reads");
        assert_eq!(settings.ssh.host.as_deref(), Some("node1"));
        assert_eq!(settings.ssh.port, 2222);
        assert_eq!(settings.ssh.user, "ubuntu");
        assert_eq!(settings.polling.interval_secs, 30);
    }

    #[test]
    fn test_invalid_settings_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = Settings::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("parsing settings file"));
    }

    #[test]
    fn test_cluster_name_resolution() {
        let mut settings = Settings::default();
        assert!(settings.cluster_name(None).is_err());
        assert_eq!(settings.cluster_name(Some("c1")).unwrap(), "c1");

        settings.default_cluster_name = Some(String::from("main"));
        assert_eq!(settings.cluster_name(None).unwrap(), "main");
    }
}
