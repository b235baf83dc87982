use std::fmt;

/// Opaque provider-side instance identifier (a Linode ID).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceId(pub String);

/// Provider-side identifier of an asynchronous job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiskId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigId(pub String);

macro_rules! display_inner {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })*
    };
}

display_inner!(InstanceId, JobId, DiskId, ConfigId);

/// One entry of a provider catalog (distribution, datacenter or plan).
///
/// `label` is the field configuration labels are matched against: the
/// distribution/plan label, or the datacenter abbreviation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: u64,
    pub label: String,
}

impl CatalogEntry {
    pub fn new(id: u64, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}

/// Parameters of the instance-create call, all ids already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateInstance {
    pub plan_id: u64,
    pub datacenter_id: u64,
    pub payment_term: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedInstance {
    pub instance_id: InstanceId,
    pub job_id: Option<JobId>,
}

/// A pending asynchronous operation on an instance.
///
/// Without a job id the reference covers every pending job of the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRef {
    pub instance_id: InstanceId,
    pub job_id: Option<JobId>,
}

impl JobRef {
    pub fn new(instance_id: InstanceId, job_id: Option<JobId>) -> Self {
        Self {
            instance_id,
            job_id,
        }
    }
}

impl fmt::Display for JobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.job_id {
            Some(job) => write!(f, "job {job} on instance {}", self.instance_id),
            None => write!(f, "pending jobs on instance {}", self.instance_id),
        }
    }
}

/// Where a root disk image comes from. Exactly one source is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskSource {
    FromDistribution(u64),
    FromImage(u64),
}

/// Everything the provider needs to create the root disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskRequest {
    pub label: String,
    pub size_mb: u32,
    pub fs_type: String,
    pub root_ssh_keys: Vec<String>,
}

/// One network interface as reported by an instance refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterface {
    pub is_public: bool,
    pub address: String,
}

/// Addresses of a booted instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAddresses {
    pub public: String,
    pub private: Option<String>,
}

impl NetworkAddresses {
    /// Pick the public address and, when private networking was requested,
    /// the first non-public address. `None` if no public interface exists.
    pub fn from_interfaces(interfaces: &[NetworkInterface], want_private: bool) -> Option<Self> {
        let public = interfaces.iter().find(|n| n.is_public)?.address.clone();
        let private = if want_private {
            interfaces
                .iter()
                .find(|n| !n.is_public)
                .map(|n| n.address.clone())
        } else {
            None
        };
        Some(Self { public, private })
    }
}

/// Result of a successful provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceHandle {
    pub instance_id: InstanceId,
    pub disk_id: DiskId,
    pub config_id: ConfigId,
    pub addresses: NetworkAddresses,
}
