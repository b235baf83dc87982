use tokio_util::sync::CancellationToken;

use crate::poll::{PollError, PollSettings, poll_until};
use crate::types::JobRef;
use crate::{ComputeProvider, Error, Result};

/// Wait until the provider reports no pending work for `job`.
///
/// Checks once per `settings.interval` until the pending list comes back
/// empty. Exceeding the budget is a [`Error::ProvisioningTimeout`].
pub async fn await_job(
    provider: &dyn ComputeProvider,
    job: &JobRef,
    settings: PollSettings,
    cancel: &CancellationToken,
) -> Result<()> {
    tracing::debug!(%job, "waiting for job");

    let outcome = poll_until(settings, Some(cancel), |attempt| async move {
        let pending = provider.pending_jobs(job).await?;
        if !pending.is_empty() {
            tracing::trace!(%job, attempt, pending = pending.len(), "job still pending");
        }
        Ok::<_, Error>(pending.is_empty())
    })
    .await;

    match outcome {
        Ok(attempts) => {
            tracing::debug!(%job, attempts, "job finished");
            Ok(())
        }
        Err(PollError::Exhausted { elapsed, .. }) => Err(Error::ProvisioningTimeout {
            job: job.clone(),
            waited: elapsed,
        }),
        Err(PollError::Cancelled) => Err(Error::Cancelled),
        Err(PollError::Check(e)) => Err(e),
    }
}
