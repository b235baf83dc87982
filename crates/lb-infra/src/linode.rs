use async_trait::async_trait;
use tracing::info;

use crate::types::{
    CatalogEntry, ConfigId, CreateInstance, CreatedInstance, DiskId, DiskRequest, InstanceId,
    JobId, JobRef, NetworkInterface,
};
use crate::{ComputeProvider, Error, Result};

/// "Latest 64-bit" kernel.
const DEFAULT_KERNEL_ID: u64 = 138;

/// Linode provider.
///
/// Delegates to `linode_api::LinodeClient` for all HTTP calls.
pub struct LinodeProvider {
    client: linode_api::LinodeClient,
    kernel_id: u64,
}

impl LinodeProvider {
    pub fn new(client: linode_api::LinodeClient, kernel_id: u64) -> Self {
        Self { client, kernel_id }
    }

    /// Create from env vars: `LINODE_API_KEY` (required), `LINODE_API_URL`,
    /// `LINODE_KERNEL_ID`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = std::env::var("LINODE_API_KEY")
            .map_err(|_| Error::MissingEnv("LINODE_API_KEY".into()))?;
        let client = match std::env::var("LINODE_API_URL") {
            Ok(url) => linode_api::LinodeClient::with_base_url(api_key, url),
            Err(_) => linode_api::LinodeClient::new(api_key),
        };
        let kernel_id = match std::env::var("LINODE_KERNEL_ID") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| Error::InvalidId(format!("LINODE_KERNEL_ID={raw}")))?,
            Err(_) => DEFAULT_KERNEL_ID,
        };

        Ok(Self::new(client, kernel_id))
    }

    fn linode_id(id: &InstanceId) -> Result<u64> {
        id.0.parse()
            .map_err(|_| Error::InvalidId(format!("linode id {}", id.0)))
    }

    fn job_id(id: &JobId) -> Result<u64> {
        id.0.parse()
            .map_err(|_| Error::InvalidId(format!("job id {}", id.0)))
    }

    fn disk_request(linode_id: u64, disk: &DiskRequest) -> linode_api::CreateDiskRequest {
        linode_api::CreateDiskRequest {
            linode_id,
            label: disk.label.clone(),
            size_mb: disk.size_mb,
            root_ssh_keys: disk.root_ssh_keys.clone(),
        }
    }
}

fn job(id: Option<u64>) -> Option<JobId> {
    id.map(|j| JobId(j.to_string()))
}

#[async_trait]
impl ComputeProvider for LinodeProvider {
    async fn distributions(&self) -> Result<Vec<CatalogEntry>> {
        let dists = self.client.avail_distributions().await?;
        Ok(dists
            .into_iter()
            .map(|d| CatalogEntry::new(d.id, d.label))
            .collect())
    }

    async fn datacenters(&self) -> Result<Vec<CatalogEntry>> {
        let dcs = self.client.avail_datacenters().await?;
        Ok(dcs
            .into_iter()
            .map(|d| CatalogEntry::new(d.id, d.abbr))
            .collect())
    }

    async fn plans(&self) -> Result<Vec<CatalogEntry>> {
        let plans = self.client.avail_linodeplans().await?;
        Ok(plans
            .into_iter()
            .map(|p| CatalogEntry::new(p.id, p.label))
            .collect())
    }

    async fn create_instance(&self, req: &CreateInstance) -> Result<CreatedInstance> {
        let created = self
            .client
            .linode_create(&linode_api::CreateLinodeRequest {
                datacenter_id: req.datacenter_id,
                plan_id: req.plan_id,
                payment_term: req.payment_term,
            })
            .await?;

        info!(linode_id = created.linode_id, job_id = ?created.job_id, "linode: created");

        Ok(CreatedInstance {
            instance_id: InstanceId(created.linode_id.to_string()),
            job_id: job(created.job_id),
        })
    }

    async fn pending_jobs(&self, job_ref: &JobRef) -> Result<Vec<JobId>> {
        let linode_id = Self::linode_id(&job_ref.instance_id)?;
        let job_id = job_ref.job_id.as_ref().map(Self::job_id).transpose()?;
        let jobs = self.client.linode_job_list(linode_id, job_id).await?;
        Ok(jobs.into_iter().map(|j| JobId(j.id.to_string())).collect())
    }

    async fn create_disk_from_distribution(
        &self,
        instance: &InstanceId,
        distribution_id: u64,
        disk: &DiskRequest,
    ) -> Result<DiskId> {
        let req = Self::disk_request(Self::linode_id(instance)?, disk);
        let created = self
            .client
            .linode_disk_createfromdistribution(distribution_id, &disk.fs_type, &req)
            .await?;
        Ok(DiskId(created.disk_id.to_string()))
    }

    async fn create_disk_from_image(
        &self,
        instance: &InstanceId,
        image_id: u64,
        disk: &DiskRequest,
    ) -> Result<DiskId> {
        let req = Self::disk_request(Self::linode_id(instance)?, disk);
        let created = self.client.linode_disk_createfromimage(image_id, &req).await?;
        Ok(DiskId(created.disk_id.to_string()))
    }

    async fn create_boot_config(
        &self,
        instance: &InstanceId,
        label: &str,
        disks: &[DiskId],
    ) -> Result<ConfigId> {
        let disk_ids = disks
            .iter()
            .map(|d| {
                d.0.parse()
                    .map_err(|_| Error::InvalidId(format!("disk id {}", d.0)))
            })
            .collect::<Result<Vec<u64>>>()?;

        let created = self
            .client
            .linode_config_create(&linode_api::CreateConfigRequest {
                linode_id: Self::linode_id(instance)?,
                kernel_id: self.kernel_id,
                label: label.to_string(),
                disk_ids,
            })
            .await?;
        Ok(ConfigId(created.config_id.to_string()))
    }

    async fn add_private_address(&self, instance: &InstanceId) -> Result<Option<String>> {
        let added = self
            .client
            .linode_ip_addprivate(Self::linode_id(instance)?)
            .await?;
        Ok(added.address)
    }

    async fn update_instance(&self, instance: &InstanceId, label: &str) -> Result<Option<JobId>> {
        let updated = self
            .client
            .linode_update_label(Self::linode_id(instance)?, label)
            .await?;
        Ok(job(updated.job_id))
    }

    async fn refresh_instance(&self, instance: &InstanceId) -> Result<Vec<NetworkInterface>> {
        let ips = self.client.linode_ip_list(Self::linode_id(instance)?).await?;
        Ok(ips
            .into_iter()
            .map(|ip| NetworkInterface {
                is_public: ip.is_public(),
                address: ip.address,
            })
            .collect())
    }

    async fn delete_instance(&self, instance: &InstanceId) -> Result<()> {
        self.client
            .linode_delete(Self::linode_id(instance)?, true)
            .await?;
        info!(linode_id = %instance, "linode: deleted");
        Ok(())
    }
}
