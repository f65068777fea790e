//! Remote command execution and file transfer.
//!
//! The cluster is reached through the system `ssh` and `scp` programs, run in
//! batch mode so that a missing key fails instead of prompting.

use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context};
use tracing::debug;

use crate::utils::settings::SshSettings;

/// The result of a command run on the cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status, if the command exited normally.
    pub status: Option<i32>,

    /// Captured standard output.
    pub stdout: String,

    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with status zero.
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// A connection to a cluster node.
pub trait RemoteSession {
    /// Runs a shell command on the node.
    fn execute(&mut self, command: &str) -> anyhow::Result<CommandOutput>;

    /// Copies a local file to `remote_path` on the node.
    fn upload(&mut self, local_path: &Path, remote_path: &str) -> anyhow::Result<()>;

    /// Runs a command and fails unless it exits successfully.
    fn execute_checked(&mut self, command: &str) -> anyhow::Result<CommandOutput> {
        let output = self.execute(command)?;
        if !output.success() {
            bail!(
                "remote command `{}` failed (status: {}): {}",
                command,
                output
                    .status
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| String::from("killed")),
                output.stderr.trim()
            );
        }
        Ok(output)
    }
}

/// Renders a command for the log.
pub fn command_to_string(command: &Command) -> String {
    let mut rendered = command.get_program().to_string_lossy().into_owned();
    for arg in command.get_args() {
        rendered.push(' ');
        rendered.push_str(&arg.to_string_lossy());
    }
    rendered
}

//=================//
// OpenSSH session //
//=================//

/// A session backed by the OpenSSH command line programs.
#[derive(Clone, Debug)]
pub struct OpenSshSession {
    settings: SshSettings,
    destination: String,
}

impl OpenSshSession {
    /// Creates a session for the configured host.
    pub fn new(settings: &SshSettings) -> anyhow::Result<Self> {
        let host = match &settings.host {
            Some(host) => host,
            None => bail!("no SSH host is configured; set ssh.host in the settings file"),
        };

        Ok(OpenSshSession {
            destination: format!("{}@{}", settings.user, host),
            settings: settings.clone(),
        })
    }

    fn common_options(&self, command: &mut Command) {
        command.arg("-o").arg("BatchMode=yes");
        if let Some(identity_file) = &self.settings.identity_file {
            command.arg("-i").arg(identity_file);
        }
        for option in &self.settings.options {
            command.arg("-o").arg(option);
        }
    }

    /// Builds the `ssh` invocation for `remote_command`.
    pub fn ssh_command(&self, remote_command: &str) -> Command {
        let mut command = Command::new(&self.settings.ssh_program);
        self.common_options(&mut command);
        command
            .arg("-p")
            .arg(self.settings.port.to_string())
            .arg(&self.destination)
            .arg(remote_command);
        command
    }

    /// Builds the `scp` invocation copying `local_path` to `remote_path`.
    pub fn scp_command(&self, local_path: &Path, remote_path: &str) -> Command {
        let mut command = Command::new(&self.settings.scp_program);
        self.common_options(&mut command);
        command
            .arg("-P")
            .arg(self.settings.port.to_string())
            .arg(local_path)
            .arg(format!("{}:{}", self.destination, remote_path));
        command
    }
}

impl RemoteSession for OpenSshSession {
    fn execute(&mut self, remote_command: &str) -> anyhow::Result<CommandOutput> {
        let mut command = self.ssh_command(remote_command);
        debug!("Running: {}", command_to_string(&command));

        let output = command
            .output()
            .with_context(|| format!("running {}", self.settings.ssh_program))?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn upload(&mut self, local_path: &Path, remote_path: &str) -> anyhow::Result<()> {
        let mut command = self.scp_command(local_path, remote_path);
        debug!("Running: {}", command_to_string(&command));

        let output = command
            .output()
            .with_context(|| format!("running {}", self.settings.scp_program))?;

        if !output.status.success() {
            bail!(
                "copying {} to {} failed: {}",
                local_path.display(),
                remote_path,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn settings() -> SshSettings {
        SshSettings {
            host: Some(String::from("node1")),
            port: 2222,
            identity_file: Some(PathBuf::from("/keys/id")),
            options: vec![],
            ..SshSettings::default()
        }
    }

    #[test]
    fn test_session_requires_host() {
        assert!(OpenSshSession::new(&SshSettings::default()).is_err());
    }

    #[test]
    fn test_ssh_command() {
        let session = OpenSshSession::new(&settings()).unwrap();
        let command = session.ssh_command("mkdir --parents /r/run");
        assert_eq!(
            command_to_string(&command),
            "ssh -o BatchMode=yes -i /keys/id -p 2222 ubuntu@node1 mkdir --parents /r/run"
        );
    }

    #[test]
    fn test_scp_command() {
        let session = OpenSshSession::new(&settings()).unwrap();
        let command = session.scp_command(Path::new("/tmp/quast-process.sh"), "/r/run/quast-process.sh");
        assert_eq!(
            command_to_string(&command),
            "scp -o BatchMode=yes -i /keys/id -P 2222 /tmp/quast-process.sh ubuntu@node1:/r/run/quast-process.sh"
        );
    }

    #[test]
    fn test_command_output_success() {
        let output = CommandOutput {
            status: Some(1),
            ..CommandOutput::default()
        };
        assert!(!output.success());
    }
}
