use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;

use crate::machine::{Machine, SshSettings};

/// Checks whether a machine accepts SSH connections right now.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync + 'static {
    async fn is_ready(&self, machine: &Machine) -> bool;
}

/// Probes by running `ssh ... exit 0` against the machine's current SSH
/// settings.
#[derive(Debug, Clone)]
pub struct SshProbe {
    program: String,
    connect_timeout: Duration,
    timeout: Duration,
}

impl Default for SshProbe {
    fn default() -> Self {
        Self {
            program: "ssh".into(),
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(15),
        }
    }
}

impl SshProbe {
    pub fn new(connect_timeout: Duration, timeout: Duration) -> Self {
        Self {
            connect_timeout,
            timeout,
            ..Self::default()
        }
    }

    fn args(&self, ssh: &SshSettings) -> Option<Vec<String>> {
        let host = ssh.host.as_deref()?;
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
            "-p".to_string(),
            ssh.port.to_string(),
        ];
        if let Some(key) = &ssh.private_key {
            args.push("-i".to_string());
            args.push(key.display().to_string());
        }
        args.push(format!("{}@{host}", ssh.username));
        args.extend(["exit".to_string(), "0".to_string()]);
        Some(args)
    }
}

#[async_trait]
impl ConnectivityProbe for SshProbe {
    async fn is_ready(&self, machine: &Machine) -> bool {
        let ssh = machine.ssh();
        let Some(args) = self.args(&ssh) else {
            tracing::debug!(machine = %machine.name, "no ssh host yet");
            return false;
        };

        let child = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();
        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(program = %self.program, error = %e, "failed to spawn ssh");
                return false;
            }
        };

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(machine = %machine.name, user = %ssh.username, %status, "ssh probe");
                status.success()
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "waiting for ssh failed");
                false
            }
            Err(_) => {
                tracing::debug!(machine = %machine.name, timeout = ?self.timeout, "ssh probe timed out");
                false
            }
        }
    }
}
