use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::machine::{Machine, MachineState, MachineStore};
use crate::provision::Provisioner;
use crate::readiness::ReadinessGate;
use crate::recovery::RecoveryCoordinator;
use crate::types::{InstanceHandle, InstanceId};
use crate::{Error, Result};

/// Per-invocation flags shared by the actions of one run.
#[derive(Debug, Clone)]
pub struct ActionEnv {
    /// Fired when the user interrupts the run.
    pub interrupt: CancellationToken,
    pub config_validate: bool,
    pub force_confirm_destroy: bool,
    /// Instance a destroy must target even if the store never recorded it.
    pub instance: Option<InstanceId>,
}

impl Default for ActionEnv {
    fn default() -> Self {
        Self {
            interrupt: CancellationToken::new(),
            config_validate: true,
            force_confirm_destroy: false,
            instance: None,
        }
    }
}

impl ActionEnv {
    pub fn new(interrupt: CancellationToken) -> Self {
        Self {
            interrupt,
            ..Self::default()
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_cancelled()
    }

    /// Environment for a compensating destroy of `instance`: not
    /// interrupted, no configuration validation, destruction pre-confirmed.
    /// The token is fresh so cancelling the caller does not reach the
    /// teardown.
    pub fn for_teardown(&self, instance: InstanceId) -> Self {
        Self {
            interrupt: CancellationToken::new(),
            config_validate: false,
            force_confirm_destroy: true,
            instance: Some(instance),
        }
    }
}

/// `up` for one machine: validate, provision, wait for SSH, and roll back
/// on failure.
pub struct CreateAction {
    store: Arc<dyn MachineStore>,
    provisioner: Provisioner,
    readiness: ReadinessGate,
    recovery: RecoveryCoordinator,
}

impl CreateAction {
    pub fn new(
        store: Arc<dyn MachineStore>,
        provisioner: Provisioner,
        readiness: ReadinessGate,
        recovery: RecoveryCoordinator,
    ) -> Self {
        Self {
            store,
            provisioner,
            readiness,
            recovery,
        }
    }

    pub async fn call(&self, machine: &Machine, env: &ActionEnv) -> Result<InstanceHandle> {
        let mut created = None;
        match self.run(machine, env, &mut created).await {
            Ok(handle) => Ok(handle),
            Err(e) => {
                self.recovery
                    .recover(&e, machine, env, created.as_ref())
                    .await;
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        machine: &Machine,
        env: &ActionEnv,
        created: &mut Option<InstanceId>,
    ) -> Result<InstanceHandle> {
        if env.config_validate {
            machine.provider_config.validate()?;
        }

        let state = self.store.state(&machine.name).await?;
        if state != MachineState::NotCreated {
            let recorded = self.store.instance_id(&machine.name).await?;
            let instance = recorded.map_or_else(|| "unknown".to_string(), |id| id.0);
            return Err(Error::Validation(vec![format!(
                "machine {} is already {state} (instance {instance})",
                machine.name
            )]));
        }

        let handle = self.provisioner.provision(machine, env, created).await?;
        self.readiness.await_ready(machine, env).await?;
        Ok(handle)
    }
}
