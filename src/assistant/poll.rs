//! Bounded polling of run status.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::error::AssistantError;

use super::{AssistantApi, Run, RunStatus};

/// Default spacing between two status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default upper bound on the time spent waiting for one run (5 minutes).
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(5 * 60);

/// How often, and for how long, run status is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between consecutive checks.
    pub interval: Duration,
    /// Deadline measured from the first check.
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

/// Poll a run until it is `completed`.
///
/// The first check happens immediately; later checks are spaced by
/// `policy.interval`. Returns [`AssistantError::RunTimedOut`] when another
/// sleep would overrun `policy.max_wait`, and [`AssistantError::RunEnded`] as
/// soon as the run reaches a dead-end status.
pub async fn wait_for_completion(
    api: &dyn AssistantApi,
    thread_id: &str,
    run_id: &str,
    policy: PollPolicy,
) -> Result<Run, AssistantError> {
    let started = Instant::now();
    let mut polls: u32 = 0;

    loop {
        let run = api.get_run(thread_id, run_id).await?;
        polls += 1;
        debug!(
            name: "assistant.run.polled",
            run_id = %run_id,
            status = %run.status,
            polls,
            "Run status polled"
        );

        if run.status == RunStatus::Completed {
            return Ok(run);
        }
        if run.status.is_dead_end() {
            return Err(AssistantError::RunEnded {
                run_id: run_id.to_string(),
                detail: run.last_error.map(|e| format!("{}: {}", e.code, e.message)),
                status: run.status,
            });
        }

        let waited = started.elapsed();
        if waited + policy.interval > policy.max_wait {
            return Err(AssistantError::RunTimedOut {
                run_id: run_id.to_string(),
                polls,
                waited,
            });
        }

        tokio::time::sleep(policy.interval).await;
    }
}
