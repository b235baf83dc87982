//! Poll-until combinator shared by the job poller and the readiness gate.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How long a poll may keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    /// At most this many checks.
    Attempts(u32),
    /// Keep checking until this much time has elapsed.
    Deadline(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Sleep between a failed check and the next one.
    pub interval: Duration,
    pub budget: Budget,
}

impl PollSettings {
    pub fn new(interval: Duration, budget: Budget) -> Self {
        Self { interval, budget }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PollError<E> {
    /// The budget ran out before the check reported done.
    Exhausted { attempts: u32, elapsed: Duration },
    Cancelled,
    /// The check itself failed; polling stops immediately.
    Check(E),
}

/// Run `check` until it yields `Ok(true)`, sleeping `settings.interval`
/// between attempts. `check` receives the 1-based attempt number.
///
/// Returns the number of attempts used. When `cancel` fires, the current
/// sleep is abandoned and [`PollError::Cancelled`] returned.
pub async fn poll_until<F, Fut, E>(
    settings: PollSettings,
    cancel: Option<&CancellationToken>,
    mut check: F,
) -> Result<u32, PollError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let start = Instant::now();
    let mut attempt = 0u32;

    loop {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(PollError::Cancelled);
        }

        attempt += 1;
        if check(attempt).await.map_err(PollError::Check)? {
            tracing::debug!(attempt, "poll condition met");
            return Ok(attempt);
        }

        let exhausted = match settings.budget {
            Budget::Attempts(max) => attempt >= max,
            Budget::Deadline(limit) => start.elapsed() >= limit,
        };
        if exhausted {
            return Err(PollError::Exhausted {
                attempts: attempt,
                elapsed: start.elapsed(),
            });
        }

        tracing::trace!(attempt, interval = ?settings.interval, "poll condition not met");

        tokio::select! {
            _ = tokio::time::sleep(settings.interval) => {}
            _ = async {
                match cancel {
                    Some(token) => token.cancelled().await,
                    None => std::future::pending::<()>().await,
                }
            } => return Err(PollError::Cancelled),
        }
    }
}
