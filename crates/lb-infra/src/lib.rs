//! Provisioning core: turns a provider configuration into a booted,
//! SSH-reachable instance, tearing it down again if any step fails.
//!
//! The workflow talks to the outside world only through ports:
//! [`ComputeProvider`] for the cloud API, [`MachineStore`] for the durable
//! machine record, [`ConnectivityProbe`] for SSH readiness, [`Ui`] for
//! progress messages and [`Teardown`] for the compensating destroy action.

pub mod action;
pub mod config;
pub mod jobs;
pub mod linode;
pub mod machine;
pub mod poll;
pub mod probe;
pub mod provision;
pub mod readiness;
pub mod recovery;
pub mod resolver;
pub mod teardown;
pub mod types;
pub mod ui;

use std::time::Duration;

use async_trait::async_trait;

pub use action::{ActionEnv, CreateAction};
pub use config::ProviderConfig;
pub use machine::{Machine, MachineState, MachineStore, SshSettings};
pub use linode::LinodeProvider;
pub use probe::{ConnectivityProbe, SshProbe};
pub use provision::Provisioner;
pub use readiness::ReadinessGate;
pub use recovery::RecoveryCoordinator;
pub use resolver::ResourceKind;
pub use teardown::{ProviderTeardown, Teardown};
pub use ui::{TracingUi, Ui};

use types::{
    CatalogEntry, ConfigId, CreateInstance, CreatedInstance, DiskId, DiskRequest, InstanceId,
    JobId, JobRef, NetworkInterface,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("provider error: {0}")]
    Provider(#[from] linode_api::Error),

    #[error("no {kind} matches {label:?}")]
    ResourceNotFound { kind: ResourceKind, label: String },

    #[error("timed out after {waited:?} waiting for {job}")]
    ProvisioningTimeout { job: JobRef, waited: Duration },

    #[error("instance {0} reported no public address")]
    NetworkInfoUnavailable(InstanceId),

    #[error("ssh did not become ready after {attempts} attempts")]
    ReadinessTimeout { attempts: u32 },

    #[error("invalid configuration: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("provisioning was interrupted")]
    Cancelled,

    #[error("machine store error: {0}")]
    Store(String),

    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("missing env var: {0}")]
    MissingEnv(String),
}

impl Error {
    /// Configuration problems caught before any resource exists.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::MissingEnv(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Cloud compute API consumed by the provisioning workflow.
///
/// One instance is used by one workflow at a time; implementations need not
/// coordinate concurrent calls from separate workflows.
#[async_trait]
pub trait ComputeProvider: Send + Sync + 'static {
    async fn distributions(&self) -> Result<Vec<CatalogEntry>>;

    async fn datacenters(&self) -> Result<Vec<CatalogEntry>>;

    async fn plans(&self) -> Result<Vec<CatalogEntry>>;

    /// Submit an instance-create request. The instance exists once this returns.
    async fn create_instance(&self, req: &CreateInstance) -> Result<CreatedInstance>;

    /// Jobs still pending for `job`; empty once it has finished.
    async fn pending_jobs(&self, job: &JobRef) -> Result<Vec<JobId>>;

    async fn create_disk_from_distribution(
        &self,
        instance: &InstanceId,
        distribution_id: u64,
        disk: &DiskRequest,
    ) -> Result<DiskId>;

    async fn create_disk_from_image(
        &self,
        instance: &InstanceId,
        image_id: u64,
        disk: &DiskRequest,
    ) -> Result<DiskId>;

    /// Create a boot configuration binding `disks` to the instance.
    async fn create_boot_config(
        &self,
        instance: &InstanceId,
        label: &str,
        disks: &[DiskId],
    ) -> Result<ConfigId>;

    /// Allocate a private address; returns it when the provider reports one.
    async fn add_private_address(&self, instance: &InstanceId) -> Result<Option<String>>;

    /// Relabel the instance, returning the job tracking the change.
    async fn update_instance(&self, instance: &InstanceId, label: &str) -> Result<Option<JobId>>;

    /// Fresh view of the instance's network interfaces.
    async fn refresh_instance(&self, instance: &InstanceId) -> Result<Vec<NetworkInterface>>;

    /// Delete the instance together with its disks and configs.
    async fn delete_instance(&self, instance: &InstanceId) -> Result<()>;
}
