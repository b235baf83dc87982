use async_trait::async_trait;
use lb_db::models::{MachineRecord, MachineRecordState};
use lb_infra::types::InstanceId;
use lb_infra::{Error, MachineState, MachineStore, Result};
use sqlx::PgPool;

/// [`MachineStore`] backed by the `machines` table.
#[derive(Clone)]
pub struct PgMachineStore {
    pool: PgPool,
}

impl PgMachineStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_err(e: sqlx::Error) -> Error {
    Error::Store(e.to_string())
}

fn to_state(state: MachineRecordState) -> MachineState {
    match state {
        MachineRecordState::NotCreated => MachineState::NotCreated,
        MachineRecordState::Provisioning => MachineState::Provisioning,
        MachineRecordState::Created => MachineState::Created,
    }
}

#[async_trait]
impl MachineStore for PgMachineStore {
    async fn state(&self, machine: &str) -> Result<MachineState> {
        let record = MachineRecord::get_by_name(&self.pool, machine)
            .await
            .map_err(store_err)?;
        Ok(record.map_or(MachineState::NotCreated, |r| to_state(r.state)))
    }

    async fn instance_id(&self, machine: &str) -> Result<Option<InstanceId>> {
        let record = MachineRecord::get_by_name(&self.pool, machine)
            .await
            .map_err(store_err)?;
        Ok(record.and_then(|r| r.instance_id).map(InstanceId))
    }

    async fn record_instance(&self, machine: &str, instance: &InstanceId) -> Result<()> {
        MachineRecord::upsert_instance(
            &self.pool,
            machine,
            &instance.0,
            MachineRecordState::Provisioning,
        )
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn mark_created(&self, machine: &str, instance: &InstanceId) -> Result<()> {
        MachineRecord::upsert_instance(&self.pool, machine, &instance.0, MachineRecordState::Created)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn clear(&self, machine: &str) -> Result<()> {
        MachineRecord::clear(&self.pool, machine)
            .await
            .map_err(store_err)
    }
}
