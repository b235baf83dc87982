//! The create sequence: instance, root disk, boot config, private address,
//! label, then network discovery.
//!
//! Steps run strictly in order and nothing is undone between them; rolling
//! back a half-built instance is the job of [`crate::RecoveryCoordinator`].

use std::sync::Arc;

use crate::action::ActionEnv;
use crate::jobs::await_job;
use crate::machine::{Machine, MachineStore};
use crate::resolver::resolve_all;
use crate::types::{
    CreateInstance, DiskRequest, DiskSource, InstanceHandle, InstanceId, JobRef, NetworkAddresses,
};
use crate::ui::Ui;
use crate::{ComputeProvider, Error, Result};

const BOOT_CONFIG_LABEL: &str = "Config";

pub struct Provisioner {
    provider: Arc<dyn ComputeProvider>,
    store: Arc<dyn MachineStore>,
    ui: Arc<dyn Ui>,
}

impl Provisioner {
    pub fn new(
        provider: Arc<dyn ComputeProvider>,
        store: Arc<dyn MachineStore>,
        ui: Arc<dyn Ui>,
    ) -> Self {
        Self {
            provider,
            store,
            ui,
        }
    }

    /// Run the create sequence. `created` is set as soon as the provider
    /// returns an instance, so a caller can clean it up even if a later
    /// step (including recording it) fails.
    pub async fn provision(
        &self,
        machine: &Machine,
        env: &ActionEnv,
        created: &mut Option<InstanceId>,
    ) -> Result<InstanceHandle> {
        let config = &machine.provider_config;
        let ids = resolve_all(self.provider.as_ref(), config).await?;

        self.ui.info("Creating a new Linode...");
        let new_instance = self
            .provider
            .create_instance(&CreateInstance {
                plan_id: ids.plan_id,
                datacenter_id: ids.datacenter_id,
                payment_term: config.payment_term(),
            })
            .await?;
        let instance = new_instance.instance_id;
        *created = Some(instance.clone());
        self.store.record_instance(&machine.name, &instance).await?;
        tracing::info!(machine = %machine.name, instance_id = %instance, "instance created");
        self.ui.info(&format!("Assigned Linode ID: {instance}"));

        let create_job = JobRef::new(instance.clone(), new_instance.job_id);
        await_job(
            self.provider.as_ref(),
            &create_job,
            config.job_poll_settings(),
            &env.interrupt,
        )
        .await?;

        let disk = DiskRequest {
            label: disk_label(ids.disk_source, &instance),
            size_mb: config.disk_size_mb,
            fs_type: config.disk_type.clone(),
            root_ssh_keys: config.root_ssh_keys.clone(),
        };
        let disk_id = match ids.disk_source {
            DiskSource::FromDistribution(id) => {
                self.provider
                    .create_disk_from_distribution(&instance, id, &disk)
                    .await?
            }
            DiskSource::FromImage(id) => {
                self.provider.create_disk_from_image(&instance, id, &disk).await?
            }
        };
        tracing::debug!(instance_id = %instance, disk_id = %disk_id, label = %disk.label, "disk created");

        let config_id = self
            .provider
            .create_boot_config(&instance, BOOT_CONFIG_LABEL, std::slice::from_ref(&disk_id))
            .await?;
        tracing::debug!(instance_id = %instance, config_id = %config_id, "boot config created");

        if config.private_networking {
            let private = self.provider.add_private_address(&instance).await?;
            tracing::debug!(instance_id = %instance, address = ?private, "private address allocated");
        }

        let update_job = JobRef::new(
            instance.clone(),
            self.provider
                .update_instance(&instance, machine.label())
                .await?,
        );
        self.ui.info(&format!("Booting Linode {instance}..."));
        await_job(
            self.provider.as_ref(),
            &update_job,
            config.job_poll_settings(),
            &env.interrupt,
        )
        .await?;

        self.store.mark_created(&machine.name, &instance).await?;

        let interfaces = self.provider.refresh_instance(&instance).await?;
        let addresses = NetworkAddresses::from_interfaces(&interfaces, config.private_networking)
            .ok_or_else(|| Error::NetworkInfoUnavailable(instance.clone()))?;
        machine.set_ssh_host(addresses.public.clone());

        self.ui.info(&format!("Public IP address: {}", addresses.public));
        if let Some(private) = &addresses.private {
            self.ui.info(&format!("Private IP address: {private}"));
        }

        Ok(InstanceHandle {
            instance_id: instance,
            disk_id,
            config_id,
            addresses,
        })
    }
}

/// Deterministic per-instance disk label naming its source.
fn disk_label(source: DiskSource, instance: &InstanceId) -> String {
    match source {
        DiskSource::FromDistribution(id) => format!("Disk Distribution {id} Linode {instance}"),
        DiskSource::FromImage(id) => format!("Disk Image {id} Linode {instance}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disk_label_names_source_and_instance() {
        let instance = InstanceId("12345".into());
        assert_eq!(
            disk_label(DiskSource::FromDistribution(140), &instance),
            "Disk Distribution 140 Linode 12345"
        );
        assert_eq!(
            disk_label(DiskSource::FromImage(7), &instance),
            "Disk Image 7 Linode 12345"
        );
    }
}
