//! Typed Rust client for the Linode API (`api_action` surface).
//!
//! Covers the subset needed for provisioning a Linode end to end:
//! catalogs (distributions, datacenters, plans), linode create/update/delete,
//! job listing, disks, boot configs and IP addresses.

mod types;

pub use types::*;

use serde::de::DeserializeOwned;

const BASE_URL: &str = "https://api.linode.com/";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("linode api request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("linode api {action} returned {status}: {body}")]
    Http {
        action: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("linode api {action} failed: {}", summarize(.errors))]
    Api {
        action: &'static str,
        errors: Vec<ApiErrorEntry>,
    },

    #[error("linode api {action} returned malformed data: {source}")]
    Decode {
        action: &'static str,
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

fn summarize(errors: &[ApiErrorEntry]) -> String {
    errors
        .iter()
        .map(|e| format!("{} (code {})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Client for the Linode API.
#[derive(Clone)]
pub struct LinodeClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl LinodeClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Issue one `api_action` call and decode its `DATA` payload.
    async fn call<T: DeserializeOwned>(
        &self,
        action: &'static str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let mut form: Vec<(&str, String)> = Vec::with_capacity(params.len() + 2);
        form.push(("api_key", self.api_key.clone()));
        form.push(("api_action", action.to_string()));
        form.extend(params.iter().cloned());

        tracing::debug!(action, "linode api call");

        let resp = self.http.post(&self.base_url).form(&form).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                action,
                status,
                body,
            });
        }

        let envelope: Envelope = resp.json().await?;
        decode(action, envelope)
    }

    // ── Catalogs ─────────────────────────────────────────────────────

    pub async fn avail_distributions(&self) -> Result<Vec<Distribution>> {
        self.call("avail.distributions", &[]).await
    }

    pub async fn avail_datacenters(&self) -> Result<Vec<Datacenter>> {
        self.call("avail.datacenters", &[]).await
    }

    pub async fn avail_linodeplans(&self) -> Result<Vec<LinodePlan>> {
        self.call("avail.linodeplans", &[]).await
    }

    // ── Linodes ──────────────────────────────────────────────────────

    pub async fn linode_create(&self, req: &CreateLinodeRequest) -> Result<LinodeRef> {
        self.call(
            "linode.create",
            &[
                ("DatacenterID", req.datacenter_id.to_string()),
                ("PlanID", req.plan_id.to_string()),
                ("PaymentTerm", req.payment_term.to_string()),
            ],
        )
        .await
    }

    pub async fn linode_update_label(&self, linode_id: u64, label: &str) -> Result<LinodeRef> {
        self.call(
            "linode.update",
            &[
                ("LinodeID", linode_id.to_string()),
                ("Label", label.to_string()),
            ],
        )
        .await
    }

    /// Delete a Linode. `skip_checks` also removes its disks and configs.
    pub async fn linode_delete(&self, linode_id: u64, skip_checks: bool) -> Result<LinodeRef> {
        self.call(
            "linode.delete",
            &[
                ("LinodeID", linode_id.to_string()),
                ("skipChecks", bool_param(skip_checks)),
            ],
        )
        .await
    }

    /// List jobs still pending for a Linode, optionally narrowed to one job.
    pub async fn linode_job_list(&self, linode_id: u64, job_id: Option<u64>) -> Result<Vec<Job>> {
        let mut params = vec![
            ("LinodeID", linode_id.to_string()),
            ("pendingOnly", bool_param(true)),
        ];
        if let Some(id) = job_id {
            params.push(("JobID", id.to_string()));
        }
        self.call("linode.job.list", &params).await
    }

    // ── Disks ────────────────────────────────────────────────────────

    pub async fn linode_disk_createfromdistribution(
        &self,
        distribution_id: u64,
        fs_type: &str,
        req: &CreateDiskRequest,
    ) -> Result<CreatedDisk> {
        let mut params = vec![
            ("LinodeID", req.linode_id.to_string()),
            ("DistributionID", distribution_id.to_string()),
            ("Label", req.label.clone()),
            ("Type", fs_type.to_string()),
            ("Size", req.size_mb.to_string()),
        ];
        push_ssh_keys(&mut params, &req.root_ssh_keys);
        self.call("linode.disk.createfromdistribution", &params).await
    }

    pub async fn linode_disk_createfromimage(
        &self,
        image_id: u64,
        req: &CreateDiskRequest,
    ) -> Result<CreatedDisk> {
        let params = image_disk_params(image_id, req);
        self.call("linode.disk.createfromimage", &params).await
    }

    // ── Configs ──────────────────────────────────────────────────────

    pub async fn linode_config_create(&self, req: &CreateConfigRequest) -> Result<CreatedConfig> {
        let disk_list = req
            .disk_ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");

        self.call(
            "linode.config.create",
            &[
                ("LinodeID", req.linode_id.to_string()),
                ("KernelID", req.kernel_id.to_string()),
                ("Label", req.label.clone()),
                ("DiskList", disk_list),
            ],
        )
        .await
    }

    // ── IP addresses ─────────────────────────────────────────────────

    pub async fn linode_ip_addprivate(&self, linode_id: u64) -> Result<AddedIp> {
        self.call("linode.ip.addprivate", &[("LinodeID", linode_id.to_string())])
            .await
    }

    pub async fn linode_ip_list(&self, linode_id: u64) -> Result<Vec<IpAddress>> {
        self.call("linode.ip.list", &[("LinodeID", linode_id.to_string())])
            .await
    }
}

fn bool_param(value: bool) -> String {
    let flag = if value { "1" } else { "0" };
    flag.to_string()
}

fn image_disk_params(image_id: u64, req: &CreateDiskRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("LinodeID", req.linode_id.to_string()),
        ("ImageID", image_id.to_string()),
        ("Label", req.label.clone()),
        ("Size", req.size_mb.to_string()),
    ];
    push_ssh_keys(&mut params, &req.root_ssh_keys);
    params
}

fn push_ssh_keys(params: &mut Vec<(&str, String)>, keys: &[String]) {
    if !keys.is_empty() {
        params.push(("rootSSHKey", keys.join("\n")));
    }
}

/// Turn a decoded envelope into its payload, surfacing `ERRORARRAY` first.
fn decode<T: DeserializeOwned>(action: &'static str, envelope: Envelope) -> Result<T> {
    if !envelope.errors.is_empty() {
        return Err(Error::Api {
            action,
            errors: envelope.errors,
        });
    }
    serde_json::from_value(envelope.data).map_err(|source| Error::Decode { action, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(raw: &str) -> Envelope {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn decodes_distribution_catalog() {
        let env = envelope(
            r#"{"ERRORARRAY":[],"ACTION":"avail.distributions","DATA":[
                {"DISTRIBUTIONID":140,"LABEL":"Ubuntu 20.04","IS64BIT":1,"MINIMAGESIZE":2048},
                {"DISTRIBUTIONID":112,"LABEL":"Debian 10","IS64BIT":1,"MINIMAGESIZE":1024}
            ]}"#,
        );

        let dists: Vec<Distribution> = decode("avail.distributions", env).unwrap();
        assert_eq!(dists.len(), 2);
        assert_eq!(dists[0].id, 140);
        assert_eq!(dists[0].label, "Ubuntu 20.04");
    }

    #[test]
    fn image_disk_uses_capitalised_size() {
        let req = CreateDiskRequest {
            linode_id: 12345,
            label: "42 Disk Image - 12345".into(),
            size_mb: 2048,
            root_ssh_keys: vec!["ssh-ed25519 AAAA".into()],
        };

        let params = image_disk_params(42, &req);
        assert!(params.contains(&("Size", "2048".to_string())));
        assert!(params.iter().all(|(key, _)| *key != "size"));
        assert!(params.contains(&("rootSSHKey", "ssh-ed25519 AAAA".to_string())));
    }

    #[test]
    fn error_array_wins_over_empty_data() {
        let env = envelope(
            r#"{"ERRORARRAY":[{"ERRORCODE":4,"ERRORMESSAGE":"Authentication failed"}],
                "ACTION":"linode.create","DATA":{}}"#,
        );

        let err = decode::<LinodeRef>("linode.create", env).unwrap_err();
        match &err {
            Error::Api { action, errors } => {
                assert_eq!(*action, "linode.create");
                assert_eq!(errors[0].code, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("Authentication failed (code 4)"));
    }

    #[test]
    fn linode_ref_job_id_is_optional() {
        let env = envelope(r#"{"ERRORARRAY":[],"ACTION":"linode.create","DATA":{"LinodeID":12345}}"#);
        let created: LinodeRef = decode("linode.create", env).unwrap();
        assert_eq!(created.linode_id, 12345);
        assert_eq!(created.job_id, None);

        let env = envelope(
            r#"{"ERRORARRAY":[],"ACTION":"linode.update","DATA":{"LinodeID":12345,"JobID":99}}"#,
        );
        let updated: LinodeRef = decode("linode.update", env).unwrap();
        assert_eq!(updated.job_id, Some(99));
    }

    #[test]
    fn ip_list_flags_public_interfaces() {
        let env = envelope(
            r#"{"ERRORARRAY":[],"ACTION":"linode.ip.list","DATA":[
                {"IPADDRESSID":1,"LINODEID":12345,"ISPUBLIC":1,"IPADDRESS":"203.0.113.10","RDNS_NAME":"li1.members.linode.com"},
                {"IPADDRESSID":2,"LINODEID":12345,"ISPUBLIC":0,"IPADDRESS":"192.168.140.7"}
            ]}"#,
        );

        let ips: Vec<IpAddress> = decode("linode.ip.list", env).unwrap();
        assert!(ips[0].is_public());
        assert!(!ips[1].is_public());
        assert_eq!(ips[1].rdns_name, None);
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        let env = envelope(r#"{"ERRORARRAY":[],"ACTION":"linode.create","DATA":{"Nope":1}}"#);
        let err = decode::<LinodeRef>("linode.create", env).unwrap_err();
        assert!(matches!(err, Error::Decode { action: "linode.create", .. }));
    }
}
