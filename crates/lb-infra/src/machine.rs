use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::Result;
use crate::config::ProviderConfig;
use crate::types::InstanceId;

/// Lifecycle of a machine's provider-side instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    NotCreated,
    /// An instance id is recorded but provisioning has not finished.
    Provisioning,
    Created,
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotCreated => "not_created",
            Self::Provisioning => "provisioning",
            Self::Created => "created",
        })
    }
}

/// Durable record of which instance belongs to which machine.
#[async_trait]
pub trait MachineStore: Send + Sync + 'static {
    async fn state(&self, machine: &str) -> Result<MachineState>;

    async fn instance_id(&self, machine: &str) -> Result<Option<InstanceId>>;

    /// Record a freshly created instance (state becomes `Provisioning`).
    async fn record_instance(&self, machine: &str, instance: &InstanceId) -> Result<()>;

    async fn mark_created(&self, machine: &str, instance: &InstanceId) -> Result<()>;

    /// Forget the instance (state returns to `NotCreated`).
    async fn clear(&self, machine: &str) -> Result<()>;
}

/// How to reach the machine over SSH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshSettings {
    pub username: String,
    pub host: Option<String>,
    pub port: u16,
    pub private_key: Option<PathBuf>,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            username: "vagrant".into(),
            host: None,
            port: 22,
            private_key: None,
        }
    }
}

/// One machine being brought up.
#[derive(Debug)]
pub struct Machine {
    pub name: String,
    pub hostname: Option<String>,
    pub provider_config: ProviderConfig,
    ssh: Mutex<SshSettings>,
}

impl Machine {
    pub fn new(name: impl Into<String>, provider_config: ProviderConfig, ssh: SshSettings) -> Self {
        Self {
            name: name.into(),
            hostname: None,
            provider_config,
            ssh: Mutex::new(ssh),
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Label given to the instance: the hostname, else the machine name.
    pub fn label(&self) -> &str {
        self.hostname.as_deref().unwrap_or(&self.name)
    }

    pub fn ssh(&self) -> SshSettings {
        self.lock_ssh().clone()
    }

    pub fn ssh_username(&self) -> String {
        self.lock_ssh().username.clone()
    }

    pub fn set_ssh_host(&self, host: impl Into<String>) {
        self.lock_ssh().host = Some(host.into());
    }

    /// Switch the SSH username until the returned guard is dropped.
    pub fn override_ssh_username(&self, username: impl Into<String>) -> UsernameOverride<'_> {
        let previous = std::mem::replace(&mut self.lock_ssh().username, username.into());
        UsernameOverride {
            machine: self,
            previous: Some(previous),
        }
    }

    fn lock_ssh(&self) -> MutexGuard<'_, SshSettings> {
        self.ssh.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Restores the previous SSH username on drop.
#[must_use = "the override ends when the guard is dropped"]
pub struct UsernameOverride<'a> {
    machine: &'a Machine,
    previous: Option<String>,
}

impl Drop for UsernameOverride<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.machine.lock_ssh().username = previous;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> Machine {
        Machine::new("default", ProviderConfig::default(), SshSettings::default())
    }

    #[test]
    fn label_prefers_hostname() {
        assert_eq!(machine().label(), "default");
        assert_eq!(machine().with_hostname("web-1").label(), "web-1");
    }

    #[test]
    fn username_override_is_scoped() {
        let m = machine();
        {
            let _guard = m.override_ssh_username("root");
            assert_eq!(m.ssh_username(), "root");
        }
        assert_eq!(m.ssh_username(), "vagrant");
    }

    #[test]
    fn username_restored_after_panic() {
        let m = machine();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = m.override_ssh_username("root");
            panic!("probe blew up");
        }));
        assert!(result.is_err());
        assert_eq!(m.ssh_username(), "vagrant");
    }
}
