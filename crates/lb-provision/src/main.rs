mod config;
mod error;
mod store;

use std::sync::Arc;

use lb_infra::probe::SshProbe;
use lb_infra::{
    ActionEnv, CreateAction, LinodeProvider, Machine, ProviderConfig, ProviderTeardown,
    Provisioner, ReadinessGate, RecoveryCoordinator, TracingUi,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::store::PgMachineStore;

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "provisioning failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let provider_config = ProviderConfig::from_env()?;

    let db = lb_db::create_pool(&config.database_url).await?;
    lb_db::run_migrations(&db).await?;

    let provider = Arc::new(LinodeProvider::from_env()?);
    let store = Arc::new(PgMachineStore::new(db));
    let ui = Arc::new(TracingUi);

    let action = CreateAction::new(
        store.clone(),
        Provisioner::new(provider.clone(), store.clone(), ui.clone()),
        ReadinessGate::new(Arc::new(SshProbe::default()), ui),
        RecoveryCoordinator::new(Arc::new(ProviderTeardown::new(provider, store))),
    );

    let mut machine = Machine::new(config.machine_name, provider_config, config.ssh);
    if let Some(hostname) = config.hostname {
        machine = machine.with_hostname(hostname);
    }

    let interrupt = CancellationToken::new();
    spawn_interrupt_handler(interrupt.clone());

    let handle = action.call(&machine, &ActionEnv::new(interrupt)).await?;
    tracing::info!(
        machine = %machine.name,
        instance_id = %handle.instance_id,
        disk_id = %handle.disk_id,
        config_id = %handle.config_id,
        public = %handle.addresses.public,
        private = ?handle.addresses.private,
        "machine is up"
    );
    Ok(())
}

/// Cancel `token` on the first Ctrl-C.
fn spawn_interrupt_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current step");
            token.cancel();
        }
    });
}
