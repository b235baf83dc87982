#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("missing env var: {0}")]
    MissingEnv(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Infra(#[from] lb_infra::Error),
}
