use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

// ── Machine ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "machine_state", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MachineRecordState {
    NotCreated,
    Provisioning,
    Created,
}

/// A named machine and the provider instance backing it, if any.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MachineRecord {
    pub id: Uuid,
    pub name: String,
    pub instance_id: Option<String>,
    pub state: MachineRecordState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MachineRecord {
    pub async fn get_by_name(pool: &PgPool, name: &str) -> sqlx::Result<Option<Self>> {
        sqlx::query_as("SELECT * FROM machines WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Attach `instance_id` to the machine in `state`, creating the row on first use.
    pub async fn upsert_instance(
        pool: &PgPool,
        name: &str,
        instance_id: &str,
        state: MachineRecordState,
    ) -> sqlx::Result<Self> {
        sqlx::query_as(
            r#"INSERT INTO machines (name, instance_id, state)
               VALUES ($1, $2, $3)
               ON CONFLICT (name)
               DO UPDATE SET instance_id = EXCLUDED.instance_id,
                             state = EXCLUDED.state,
                             updated_at = now()
               RETURNING *"#,
        )
        .bind(name)
        .bind(instance_id)
        .bind(state)
        .fetch_one(pool)
        .await
    }

    /// Drop the instance reference and return the machine to `not_created`.
    pub async fn clear(pool: &PgPool, name: &str) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE machines SET instance_id = NULL, state = 'not_created', updated_at = now() WHERE name = $1",
        )
        .bind(name)
        .execute(pool)
        .await?;
        Ok(())
    }
}
