use std::fmt;
use std::future::Future;

use crate::config::ProviderConfig;
use crate::types::{CatalogEntry, DiskSource};
use crate::{ComputeProvider, Error, Result};

/// Catalog a configuration label is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Distribution,
    Datacenter,
    Plan,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Distribution => "distribution",
            Self::Datacenter => "datacenter",
            Self::Plan => "plan",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve one configuration selector to a provider id.
///
/// A configured label is matched exactly (case-sensitive) against the
/// catalog and the first hit wins. Without a label the explicit id is
/// returned as-is and the catalog is never fetched.
pub async fn resolve<F, Fut>(
    kind: ResourceKind,
    label: Option<&str>,
    explicit: Option<u64>,
    catalog: F,
) -> Result<Option<u64>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<CatalogEntry>>>,
{
    let Some(label) = label else {
        return Ok(explicit);
    };

    let entries = catalog().await?;
    match entries.iter().find(|e| e.label == label) {
        Some(entry) => {
            tracing::debug!(%kind, label, id = entry.id, "resolved label");
            Ok(Some(entry.id))
        }
        None => Err(Error::ResourceNotFound {
            kind,
            label: label.to_string(),
        }),
    }
}

/// Identifiers needed by the create and disk steps, computed once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedIds {
    pub disk_source: DiskSource,
    pub datacenter_id: u64,
    pub plan_id: u64,
}

/// Resolve distribution (or image), datacenter and plan for `config`.
pub async fn resolve_all(
    provider: &dyn ComputeProvider,
    config: &ProviderConfig,
) -> Result<ResolvedIds> {
    let distribution_id = resolve(
        ResourceKind::Distribution,
        config.distribution.as_deref(),
        config.distribution_id,
        || provider.distributions(),
    )
    .await?;
    let datacenter_id = resolve(
        ResourceKind::Datacenter,
        config.datacenter.as_deref(),
        config.datacenter_id,
        || provider.datacenters(),
    )
    .await?;
    let plan_id = resolve(
        ResourceKind::Plan,
        config.plan.as_deref(),
        config.plan_id,
        || provider.plans(),
    )
    .await?;

    let disk_source = match (distribution_id, config.image_id) {
        (Some(id), None) => DiskSource::FromDistribution(id),
        (None, Some(id)) => DiskSource::FromImage(id),
        (Some(_), Some(_)) => return Err(missing("distribution and image_id are mutually exclusive")),
        (None, None) => return Err(missing("no distribution or image configured")),
    };

    Ok(ResolvedIds {
        disk_source,
        datacenter_id: datacenter_id.ok_or_else(|| missing("no datacenter configured"))?,
        plan_id: plan_id.ok_or_else(|| missing("no plan configured"))?,
    })
}

fn missing(problem: &str) -> Error {
    Error::Validation(vec![problem.to_string()])
}
