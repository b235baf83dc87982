use std::sync::Arc;

use crate::action::ActionEnv;
use crate::machine::Machine;
use crate::poll::{PollError, poll_until};
use crate::probe::ConnectivityProbe;
use crate::ui::Ui;
use crate::{Error, Result};

/// Account probed while `setup` is enabled.
pub const ADMIN_USER: &str = "root";

/// Waits for a booted machine to accept SSH.
pub struct ReadinessGate {
    probe: Arc<dyn ConnectivityProbe>,
    ui: Arc<dyn Ui>,
}

impl ReadinessGate {
    pub fn new(probe: Arc<dyn ConnectivityProbe>, ui: Arc<dyn Ui>) -> Self {
        Self { probe, ui }
    }

    /// Probe until SSH answers or the attempt budget runs out.
    ///
    /// With `setup` enabled the probe runs as [`ADMIN_USER`]; the previous
    /// username is back in place however this returns. An interrupted run
    /// skips the probe for an attempt but still spends it.
    pub async fn await_ready(&self, machine: &Machine, env: &ActionEnv) -> Result<()> {
        let config = &machine.provider_config;
        let _admin = config
            .setup
            .then(|| machine.override_ssh_username(ADMIN_USER));

        self.ui.info("Waiting for SSH to become available...");

        let outcome = poll_until(config.readiness_settings(), None, |attempt| async move {
            if env.is_interrupted() {
                tracing::debug!(attempt, "interrupted, skipping ssh probe");
                return Ok::<_, Error>(false);
            }
            let ready = self.probe.is_ready(machine).await;
            if !ready {
                tracing::debug!(machine = %machine.name, attempt, "ssh not ready");
            }
            Ok(ready)
        })
        .await;

        match outcome {
            Ok(attempts) => {
                tracing::info!(machine = %machine.name, attempts, "ssh is ready");
                self.ui.info("Machine is booted and ready for use!");
                Ok(())
            }
            Err(PollError::Exhausted { attempts, .. }) => Err(Error::ReadinessTimeout { attempts }),
            Err(PollError::Cancelled) => Err(Error::Cancelled),
            Err(PollError::Check(e)) => Err(e),
        }
    }
}
