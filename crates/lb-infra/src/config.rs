use std::str::FromStr;
use std::time::Duration;

use crate::poll::{Budget, PollSettings};
use crate::{Error, Result};

const DEFAULT_DISK_SIZE_MB: u32 = 1024;
const DEFAULT_DISK_TYPE: &str = "ext4";
const DEFAULT_JOB_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(900);
const DEFAULT_READY_TRIES: u32 = 120;
const DEFAULT_READY_SLEEP: Duration = Duration::from_secs(10);

/// Payment terms (months) the provider accepts.
const PAYMENT_TERMS: [u32; 3] = [1, 12, 24];

/// Provider section of a machine's configuration.
///
/// Distribution, datacenter and plan can each be given either as a
/// human-readable label or as an explicit provider id. When both are set
/// the label wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub distribution: Option<String>,
    pub distribution_id: Option<u64>,
    pub image_id: Option<u64>,
    pub datacenter: Option<String>,
    pub datacenter_id: Option<u64>,
    pub plan: Option<String>,
    pub plan_id: Option<u64>,
    pub payment_term: Option<u32>,
    pub private_networking: bool,
    /// Probe SSH as the administrative account while waiting for boot.
    pub setup: bool,
    pub disk_size_mb: u32,
    pub disk_type: String,
    pub root_ssh_keys: Vec<String>,
    pub job_poll_interval: Duration,
    pub job_timeout: Duration,
    pub ready_tries: u32,
    pub ready_sleep: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            distribution: None,
            distribution_id: None,
            image_id: None,
            datacenter: None,
            datacenter_id: None,
            plan: None,
            plan_id: None,
            payment_term: None,
            private_networking: false,
            setup: true,
            disk_size_mb: DEFAULT_DISK_SIZE_MB,
            disk_type: DEFAULT_DISK_TYPE.into(),
            root_ssh_keys: Vec::new(),
            job_poll_interval: DEFAULT_JOB_POLL_INTERVAL,
            job_timeout: DEFAULT_JOB_TIMEOUT,
            ready_tries: DEFAULT_READY_TRIES,
            ready_sleep: DEFAULT_READY_SLEEP,
        }
    }
}

impl ProviderConfig {
    /// Load from `LINODE_*` env vars (a `.env` file is honoured).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Every unparsable value is
    /// reported at once as a validation error.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut problems = Vec::new();
        let defaults = Self::default();

        let mut parse = |key: &str| -> Option<u64> { parsed(key, get(key), &mut problems) };
        let distribution_id = parse("LINODE_DISTRIBUTION_ID");
        let image_id = parse("LINODE_IMAGE_ID");
        let datacenter_id = parse("LINODE_DATACENTER_ID");
        let plan_id = parse("LINODE_PLAN_ID");
        let job_poll_secs = parse("LINODE_JOB_POLL_INTERVAL_SECS");
        let job_timeout_secs = parse("LINODE_JOB_TIMEOUT_SECS");
        let ready_sleep_secs = parse("LINODE_READY_SLEEP_SECS");

        let payment_term = parsed("LINODE_PAYMENT_TERM", get("LINODE_PAYMENT_TERM"), &mut problems);
        let disk_size_mb = parsed("LINODE_DISK_SIZE_MB", get("LINODE_DISK_SIZE_MB"), &mut problems);
        let ready_tries = parsed("LINODE_READY_TRIES", get("LINODE_READY_TRIES"), &mut problems);
        let private_networking = flag("LINODE_PRIVATE_NETWORKING", get("LINODE_PRIVATE_NETWORKING"), &mut problems);
        let setup = flag("LINODE_SETUP", get("LINODE_SETUP"), &mut problems);

        if !problems.is_empty() {
            return Err(Error::Validation(problems));
        }

        let root_ssh_keys = get("LINODE_ROOT_SSH_KEY")
            .map(|keys| {
                keys.lines()
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            distribution: get("LINODE_DISTRIBUTION"),
            distribution_id,
            image_id,
            datacenter: get("LINODE_DATACENTER"),
            datacenter_id,
            plan: get("LINODE_PLAN"),
            plan_id,
            payment_term,
            private_networking: private_networking.unwrap_or(defaults.private_networking),
            setup: setup.unwrap_or(defaults.setup),
            disk_size_mb: disk_size_mb.unwrap_or(defaults.disk_size_mb),
            disk_type: get("LINODE_DISK_TYPE").unwrap_or(defaults.disk_type),
            root_ssh_keys,
            job_poll_interval: job_poll_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.job_poll_interval),
            job_timeout: job_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.job_timeout),
            ready_tries: ready_tries.unwrap_or(defaults.ready_tries),
            ready_sleep: ready_sleep_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.ready_sleep),
        })
    }

    /// Check the configuration before any provider call is made.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.datacenter.is_none() && self.datacenter_id.is_none() {
            problems.push("datacenter or datacenter_id is required".to_string());
        }
        if self.plan.is_none() && self.plan_id.is_none() {
            problems.push("plan or plan_id is required".to_string());
        }

        let has_distribution = self.distribution.is_some() || self.distribution_id.is_some();
        match (has_distribution, self.image_id.is_some()) {
            (true, true) => {
                problems.push("distribution and image_id are mutually exclusive".to_string())
            }
            (false, false) => problems
                .push("one of distribution, distribution_id or image_id is required".to_string()),
            _ => {}
        }

        if let Some(term) = self.payment_term
            && !PAYMENT_TERMS.contains(&term)
        {
            problems.push(format!("payment_term must be one of {PAYMENT_TERMS:?}, got {term}"));
        }
        if self.disk_size_mb == 0 {
            problems.push("disk_size_mb must be greater than zero".to_string());
        }
        if self.ready_tries == 0 {
            problems.push("ready_tries must be greater than zero".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(problems))
        }
    }

    pub fn payment_term(&self) -> u32 {
        self.payment_term.unwrap_or(1)
    }

    pub fn job_poll_settings(&self) -> PollSettings {
        PollSettings::new(self.job_poll_interval, Budget::Deadline(self.job_timeout))
    }

    pub fn readiness_settings(&self) -> PollSettings {
        PollSettings::new(self.ready_sleep, Budget::Attempts(self.ready_tries))
    }
}

fn parsed<T: FromStr>(key: &str, raw: Option<String>, problems: &mut Vec<String>) -> Option<T> {
    let raw = raw?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            problems.push(format!("{key}: cannot parse {raw:?}"));
            None
        }
    }
}

fn flag(key: &str, raw: Option<String>, problems: &mut Vec<String>) -> Option<bool> {
    let raw = raw?;
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            problems.push(format!("{key}: expected a boolean, got {raw:?}"));
            None
        }
    }
}
