use std::sync::Arc;

use async_trait::async_trait;

use crate::action::ActionEnv;
use crate::machine::{Machine, MachineStore};
use crate::{ComputeProvider, Error, Result};

/// The destroy workflow, invoked as a named action.
#[async_trait]
pub trait Teardown: Send + Sync + 'static {
    async fn destroy(&self, machine: &Machine, env: &ActionEnv) -> Result<()>;
}

/// Deletes the machine's instance and forgets it. The instance named by
/// the environment wins over the one in the store.
pub struct ProviderTeardown {
    provider: Arc<dyn ComputeProvider>,
    store: Arc<dyn MachineStore>,
}

impl ProviderTeardown {
    pub fn new(provider: Arc<dyn ComputeProvider>, store: Arc<dyn MachineStore>) -> Self {
        Self { provider, store }
    }
}

#[async_trait]
impl Teardown for ProviderTeardown {
    async fn destroy(&self, machine: &Machine, env: &ActionEnv) -> Result<()> {
        if !env.force_confirm_destroy {
            return Err(Error::Validation(vec![format!(
                "refusing to destroy {} without confirmation",
                machine.name
            )]));
        }

        let instance = match &env.instance {
            Some(instance) => Some(instance.clone()),
            None => self.store.instance_id(&machine.name).await?,
        };
        let Some(instance) = instance else {
            tracing::info!(machine = %machine.name, "no instance recorded, nothing to destroy");
            return Ok(());
        };

        self.provider.delete_instance(&instance).await?;
        self.store.clear(&machine.name).await?;
        tracing::info!(machine = %machine.name, instance_id = %instance, "instance destroyed");
        Ok(())
    }
}
