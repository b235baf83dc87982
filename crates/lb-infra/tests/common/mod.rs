#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lb_infra::types::{
    CatalogEntry, ConfigId, CreateInstance, CreatedInstance, DiskId, DiskRequest, InstanceId,
    JobId, JobRef, NetworkInterface,
};
use lb_infra::{
    ActionEnv, ComputeProvider, ConnectivityProbe, CreateAction, Error, Machine, MachineState,
    MachineStore, ProviderConfig, Provisioner, ReadinessGate, RecoveryCoordinator, Result,
    SshSettings, Teardown, Ui,
};

pub const INSTANCE: &str = "12345";
pub const CREATE_JOB: &str = "99";
pub const UPDATE_JOB: &str = "100";
pub const PUBLIC_IP: &str = "203.0.113.10";
pub const PRIVATE_IP: &str = "192.168.140.7";

/// Provider call as observed by [`FakeProvider`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Distributions,
    Datacenters,
    Plans,
    Create(CreateInstance),
    PendingJobs(JobRef),
    DiskFromDistribution {
        instance: InstanceId,
        distribution_id: u64,
        disk: DiskRequest,
    },
    DiskFromImage {
        instance: InstanceId,
        image_id: u64,
        disk: DiskRequest,
    },
    BootConfig {
        instance: InstanceId,
        label: String,
        disks: Vec<DiskId>,
    },
    AddPrivate(InstanceId),
    Update {
        instance: InstanceId,
        label: String,
    },
    Refresh(InstanceId),
    Delete(InstanceId),
}

/// Step a [`FakeProvider`] can be told to fail at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Create,
    Disk,
    BootConfig,
    Update,
    Refresh,
}

pub struct FakeProvider {
    calls: Mutex<Vec<Call>>,
    /// Remaining non-empty `pending_jobs` answers, keyed by job id ("*" = all jobs).
    pending: Mutex<HashMap<String, u32>>,
    fail_at: Option<Step>,
    interfaces: Vec<NetworkInterface>,
    create_job: Option<JobId>,
    update_job: Option<JobId>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            pending: Mutex::new(HashMap::new()),
            fail_at: None,
            interfaces: vec![
                NetworkInterface {
                    is_public: false,
                    address: PRIVATE_IP.into(),
                },
                NetworkInterface {
                    is_public: true,
                    address: PUBLIC_IP.into(),
                },
            ],
            create_job: Some(JobId(CREATE_JOB.into())),
            update_job: Some(JobId(UPDATE_JOB.into())),
        }
    }

    pub fn fail_at(mut self, step: Step) -> Self {
        self.fail_at = Some(step);
        self
    }

    /// Report `rounds` pending jobs before `job` (or "*") finishes.
    pub fn pending(self, job: &str, rounds: u32) -> Self {
        self.pending
            .lock()
            .unwrap()
            .insert(job.to_string(), rounds);
        self
    }

    pub fn interfaces(mut self, interfaces: Vec<NetworkInterface>) -> Self {
        self.interfaces = interfaces;
        self
    }

    pub fn without_job_ids(mut self) -> Self {
        self.create_job = None;
        self.update_job = None;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn pending_calls(&self) -> Vec<JobRef> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::PendingJobs(job) => Some(job),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, step: Step, action: &'static str) -> Result<()> {
        if self.fail_at == Some(step) {
            return Err(Error::Provider(linode_api::Error::Api {
                action,
                errors: vec![linode_api::ApiErrorEntry {
                    code: 8,
                    message: format!("injected failure at {step:?}"),
                }],
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl ComputeProvider for FakeProvider {
    async fn distributions(&self) -> Result<Vec<CatalogEntry>> {
        self.record(Call::Distributions);
        Ok(vec![
            CatalogEntry::new(112, "Debian 10"),
            CatalogEntry::new(140, "Ubuntu 20.04"),
        ])
    }

    async fn datacenters(&self) -> Result<Vec<CatalogEntry>> {
        self.record(Call::Datacenters);
        Ok(vec![
            CatalogEntry::new(2, "dallas"),
            CatalogEntry::new(6, "newark"),
        ])
    }

    async fn plans(&self) -> Result<Vec<CatalogEntry>> {
        self.record(Call::Plans);
        Ok(vec![
            CatalogEntry::new(1, "Linode 2048"),
            CatalogEntry::new(3, "Linode 1024"),
        ])
    }

    async fn create_instance(&self, req: &CreateInstance) -> Result<CreatedInstance> {
        self.record(Call::Create(req.clone()));
        self.check(Step::Create, "linode.create")?;
        Ok(CreatedInstance {
            instance_id: InstanceId(INSTANCE.into()),
            job_id: self.create_job.clone(),
        })
    }

    async fn pending_jobs(&self, job: &JobRef) -> Result<Vec<JobId>> {
        self.record(Call::PendingJobs(job.clone()));
        let key = job
            .job_id
            .as_ref()
            .map_or_else(|| "*".to_string(), |j| j.0.clone());
        let mut pending = self.pending.lock().unwrap();
        match pending.get_mut(&key) {
            Some(left) if *left > 0 => {
                *left -= 1;
                Ok(vec![JobId(key)])
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn create_disk_from_distribution(
        &self,
        instance: &InstanceId,
        distribution_id: u64,
        disk: &DiskRequest,
    ) -> Result<DiskId> {
        self.record(Call::DiskFromDistribution {
            instance: instance.clone(),
            distribution_id,
            disk: disk.clone(),
        });
        self.check(Step::Disk, "linode.disk.createfromdistribution")?;
        Ok(DiskId("555".into()))
    }

    async fn create_disk_from_image(
        &self,
        instance: &InstanceId,
        image_id: u64,
        disk: &DiskRequest,
    ) -> Result<DiskId> {
        self.record(Call::DiskFromImage {
            instance: instance.clone(),
            image_id,
            disk: disk.clone(),
        });
        self.check(Step::Disk, "linode.disk.createfromimage")?;
        Ok(DiskId("556".into()))
    }

    async fn create_boot_config(
        &self,
        instance: &InstanceId,
        label: &str,
        disks: &[DiskId],
    ) -> Result<ConfigId> {
        self.record(Call::BootConfig {
            instance: instance.clone(),
            label: label.to_string(),
            disks: disks.to_vec(),
        });
        self.check(Step::BootConfig, "linode.config.create")?;
        Ok(ConfigId("777".into()))
    }

    async fn add_private_address(&self, instance: &InstanceId) -> Result<Option<String>> {
        self.record(Call::AddPrivate(instance.clone()));
        Ok(Some(PRIVATE_IP.into()))
    }

    async fn update_instance(&self, instance: &InstanceId, label: &str) -> Result<Option<JobId>> {
        self.record(Call::Update {
            instance: instance.clone(),
            label: label.to_string(),
        });
        self.check(Step::Update, "linode.update")?;
        Ok(self.update_job.clone())
    }

    async fn refresh_instance(&self, instance: &InstanceId) -> Result<Vec<NetworkInterface>> {
        self.record(Call::Refresh(instance.clone()));
        self.check(Step::Refresh, "linode.ip.list")?;
        Ok(self.interfaces.clone())
    }

    async fn delete_instance(&self, instance: &InstanceId) -> Result<()> {
        self.record(Call::Delete(instance.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, (MachineState, Option<InstanceId>)>>,
    fail_record: bool,
}

impl MemoryStore {
    /// A store whose `record_instance` always fails.
    pub fn failing_record() -> Self {
        Self {
            fail_record: true,
            ..Self::default()
        }
    }

    pub fn get(&self, machine: &str) -> (MachineState, Option<InstanceId>) {
        self.records
            .lock()
            .unwrap()
            .get(machine)
            .cloned()
            .unwrap_or((MachineState::NotCreated, None))
    }

    pub fn set(&self, machine: &str, state: MachineState, instance: Option<&str>) {
        self.records.lock().unwrap().insert(
            machine.to_string(),
            (state, instance.map(|i| InstanceId(i.into()))),
        );
    }
}

#[async_trait]
impl MachineStore for MemoryStore {
    async fn state(&self, machine: &str) -> Result<MachineState> {
        Ok(self.get(machine).0)
    }

    async fn instance_id(&self, machine: &str) -> Result<Option<InstanceId>> {
        Ok(self.get(machine).1)
    }

    async fn record_instance(&self, machine: &str, instance: &InstanceId) -> Result<()> {
        if self.fail_record {
            return Err(Error::Store("connection reset".into()));
        }
        self.set(machine, MachineState::Provisioning, Some(&instance.0));
        Ok(())
    }

    async fn mark_created(&self, machine: &str, instance: &InstanceId) -> Result<()> {
        self.set(machine, MachineState::Created, Some(&instance.0));
        Ok(())
    }

    async fn clear(&self, machine: &str) -> Result<()> {
        self.records.lock().unwrap().remove(machine);
        Ok(())
    }
}

/// Fails `failures` times, then reports ready. Records the SSH username
/// seen on every probe.
pub struct FakeProbe {
    failures: u32,
    usernames: Mutex<Vec<String>>,
}

impl FakeProbe {
    pub fn ready_after(failures: u32) -> Self {
        Self {
            failures,
            usernames: Mutex::new(Vec::new()),
        }
    }

    pub fn never_ready() -> Self {
        Self::ready_after(u32::MAX)
    }

    pub fn usernames(&self) -> Vec<String> {
        self.usernames.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConnectivityProbe for FakeProbe {
    async fn is_ready(&self, machine: &Machine) -> bool {
        let mut seen = self.usernames.lock().unwrap();
        seen.push(machine.ssh_username());
        seen.len() as u64 > u64::from(self.failures)
    }
}

/// Records every environment it was invoked with.
#[derive(Default)]
pub struct RecordingTeardown {
    envs: Mutex<Vec<ActionEnv>>,
}

impl RecordingTeardown {
    pub fn envs(&self) -> Vec<ActionEnv> {
        self.envs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Teardown for RecordingTeardown {
    async fn destroy(&self, _machine: &Machine, env: &ActionEnv) -> Result<()> {
        self.envs.lock().unwrap().push(env.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingUi {
    messages: Mutex<Vec<String>>,
}

impl RecordingUi {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Ui for RecordingUi {
    fn info(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Plan "Linode 1024", datacenter "newark", distribution "Ubuntu 20.04".
pub fn labelled_config() -> ProviderConfig {
    ProviderConfig {
        distribution: Some("Ubuntu 20.04".into()),
        datacenter: Some("newark".into()),
        plan: Some("Linode 1024".into()),
        root_ssh_keys: vec!["ssh-ed25519 AAAA test@example".into()],
        job_poll_interval: Duration::from_secs(1),
        ..Default::default()
    }
}

pub fn machine(config: ProviderConfig) -> Machine {
    Machine::new("default", config, SshSettings::default())
}

/// Every collaborator of a `CreateAction`, kept around for inspection.
pub struct Harness {
    pub provider: Arc<FakeProvider>,
    pub store: Arc<MemoryStore>,
    pub probe: Arc<FakeProbe>,
    pub teardown: Arc<RecordingTeardown>,
    pub ui: Arc<RecordingUi>,
}

impl Harness {
    pub fn new(provider: FakeProvider, probe: FakeProbe) -> Self {
        Self::with_store(provider, probe, MemoryStore::default())
    }

    pub fn with_store(provider: FakeProvider, probe: FakeProbe, store: MemoryStore) -> Self {
        Self {
            provider: Arc::new(provider),
            store: Arc::new(store),
            probe: Arc::new(probe),
            teardown: Arc::new(RecordingTeardown::default()),
            ui: Arc::new(RecordingUi::default()),
        }
    }

    pub fn action(&self) -> CreateAction {
        CreateAction::new(
            self.store.clone(),
            Provisioner::new(self.provider.clone(), self.store.clone(), self.ui.clone()),
            ReadinessGate::new(self.probe.clone(), self.ui.clone()),
            RecoveryCoordinator::new(self.teardown.clone()),
        )
    }

    pub fn creates(&self) -> usize {
        self.provider
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Create(_)))
            .count()
    }
}
