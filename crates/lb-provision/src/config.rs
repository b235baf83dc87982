use std::path::PathBuf;

use lb_infra::SshSettings;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub machine_name: String,
    pub hostname: Option<String>,
    pub ssh: SshSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_vars(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = SshSettings::default();
        let port = match lookup("SSH_PORT") {
            Some(raw) => raw.parse().map_err(|_| AppError::InvalidEnv {
                key: "SSH_PORT",
                value: raw,
            })?,
            None => defaults.port,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").ok_or(AppError::MissingEnv("DATABASE_URL"))?,
            machine_name: lookup("MACHINE_NAME").unwrap_or_else(|| "default".into()),
            hostname: lookup("MACHINE_HOSTNAME"),
            ssh: SshSettings {
                username: lookup("SSH_USERNAME").unwrap_or(defaults.username),
                host: None,
                port,
                private_key: lookup("SSH_PRIVATE_KEY").map(PathBuf::from),
            },
        })
    }
}
