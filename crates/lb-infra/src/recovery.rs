use std::sync::Arc;

use crate::action::ActionEnv;
use crate::machine::Machine;
use crate::teardown::Teardown;
use crate::types::InstanceId;
use crate::Error;

/// Decides whether a failed `up` needs a compensating destroy and runs it.
pub struct RecoveryCoordinator {
    teardown: Arc<dyn Teardown>,
}

impl RecoveryCoordinator {
    pub fn new(teardown: Arc<dyn Teardown>) -> Self {
        Self { teardown }
    }

    /// Tear down the instance `created` by the failed run, if any. Never
    /// fails: problems during teardown are logged and the original error
    /// stays the one reported.
    ///
    /// Only an instance created by this run is destroyed; whatever the store
    /// held beforehand is left alone.
    pub async fn recover(
        &self,
        error: &Error,
        machine: &Machine,
        env: &ActionEnv,
        created: Option<&InstanceId>,
    ) {
        if error.is_validation() {
            return;
        }
        let Some(instance) = created else {
            return;
        };

        tracing::warn!(machine = %machine.name, instance_id = %instance, cause = %error, "provisioning failed, destroying instance");
        let destroy_env = env.for_teardown(instance.clone());
        if let Err(e) = self.teardown.destroy(machine, &destroy_env).await {
            tracing::error!(machine = %machine.name, instance_id = %instance, error = %e, "teardown after failed provisioning failed");
        }
    }
}
