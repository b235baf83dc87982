use serde::{Deserialize, Serialize};

// ── Envelope ─────────────────────────────────────────────────────────

/// Every response is wrapped in the same envelope. `DATA` is an empty object
/// when `ERRORARRAY` is non-empty, so it is decoded only after the error check.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "ERRORARRAY", default)]
    pub errors: Vec<ApiErrorEntry>,
    #[serde(rename = "ACTION", default)]
    pub action: String,
    #[serde(rename = "DATA", default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorEntry {
    #[serde(rename = "ERRORCODE")]
    pub code: i64,
    #[serde(rename = "ERRORMESSAGE")]
    pub message: String,
}

// ── Catalogs ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Distribution {
    #[serde(rename = "DISTRIBUTIONID")]
    pub id: u64,
    #[serde(rename = "LABEL")]
    pub label: String,
    #[serde(rename = "IS64BIT", default)]
    pub is_64bit: u8,
    #[serde(rename = "MINIMAGESIZE", default)]
    pub min_image_size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Datacenter {
    #[serde(rename = "DATACENTERID")]
    pub id: u64,
    #[serde(rename = "LOCATION")]
    pub location: String,
    #[serde(rename = "ABBR")]
    pub abbr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinodePlan {
    #[serde(rename = "PLANID")]
    pub id: u64,
    #[serde(rename = "LABEL")]
    pub label: String,
    #[serde(rename = "RAM", default)]
    pub ram_mb: u64,
    #[serde(rename = "DISK", default)]
    pub disk_gb: u64,
    #[serde(rename = "PRICE", default)]
    pub price: f64,
}

// ── Linodes ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CreateLinodeRequest {
    pub datacenter_id: u64,
    pub plan_id: u64,
    pub payment_term: u32,
}

/// Returned by `linode.create`, `linode.update` and `linode.delete`.
///
/// Only some API revisions report a job for the change; when `job_id` is
/// `None` the caller should wait on every pending job for the Linode.
#[derive(Debug, Clone, Deserialize)]
pub struct LinodeRef {
    #[serde(rename = "LinodeID", alias = "LINODEID")]
    pub linode_id: u64,
    #[serde(rename = "JobID", alias = "JOBID", default)]
    pub job_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    #[serde(rename = "JOBID")]
    pub id: u64,
    #[serde(rename = "LINODEID")]
    pub linode_id: u64,
    #[serde(rename = "ACTION", default)]
    pub action: String,
    #[serde(rename = "LABEL", default)]
    pub label: String,
    #[serde(rename = "HOST_FINISH_DT", default)]
    pub host_finish_dt: Option<String>,
}

// ── Disks and configs ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CreateDiskRequest {
    pub linode_id: u64,
    pub label: String,
    pub size_mb: u32,
    pub root_ssh_keys: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedDisk {
    #[serde(rename = "DiskID", alias = "DISKID")]
    pub disk_id: u64,
    #[serde(rename = "JobID", alias = "JOBID", default)]
    pub job_id: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct CreateConfigRequest {
    pub linode_id: u64,
    pub kernel_id: u64,
    pub label: String,
    pub disk_ids: Vec<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedConfig {
    #[serde(rename = "ConfigID", alias = "CONFIGID")]
    pub config_id: u64,
}

// ── IP addresses ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AddedIp {
    #[serde(rename = "IPAddressID", alias = "IPADDRESSID")]
    pub id: u64,
    #[serde(rename = "IPADDRESS", alias = "IPAddress", default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IpAddress {
    #[serde(rename = "IPADDRESSID")]
    pub id: u64,
    #[serde(rename = "LINODEID")]
    pub linode_id: u64,
    #[serde(rename = "ISPUBLIC")]
    pub public: u8,
    #[serde(rename = "IPADDRESS")]
    pub address: String,
    #[serde(rename = "RDNS_NAME", default)]
    pub rdns_name: Option<String>,
}

impl IpAddress {
    pub fn is_public(&self) -> bool {
        self.public == 1
    }
}
