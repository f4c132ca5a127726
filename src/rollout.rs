// Sequential best-effort rollout. One target at a time, no rollback;
// a failed target is recorded and the next one is still attempted.

use std::time::Duration;
use tracing::instrument;

use crate::error::TargetError;
use crate::models::{PlannedShrink, RolloutOutcome, RolloutPlan, RolloutResult};
use crate::remote::{Credentials, RemoteExecutor};

/// Progress reported while the rollout runs, in plan order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolloutEvent<'a> {
    Started {
        index: usize,
        total: usize,
        step: &'a PlannedShrink,
    },
    Finished {
        index: usize,
        total: usize,
        result: &'a RolloutResult,
    },
}

#[instrument(skip_all, fields(resource = %plan.resource, targets = plan.steps.len()))]
pub async fn execute(
    executor: &dyn RemoteExecutor,
    plan: &RolloutPlan,
    credentials: &Credentials,
    timeout: Duration,
    mut on_event: impl FnMut(RolloutEvent<'_>),
) -> Vec<RolloutResult> {
    let total = plan.steps.len();
    let mut results = Vec::with_capacity(total);

    for (index, step) in plan.steps.iter().enumerate() {
        on_event(RolloutEvent::Started { index, total, step });

        let name = step.target.name();
        let outcome = match tokio::time::timeout(
            timeout,
            executor.resize(name, credentials, &plan.resource, step.target_size),
        )
        .await
        .unwrap_or(Err(TargetError::TimedOut(timeout)))
        {
            Ok(resulting_size) => {
                tracing::info!(host = %name, resulting_size, "volume shrunk");
                RolloutOutcome::Succeeded { resulting_size }
            }
            Err(error) => {
                tracing::warn!(host = %name, error = %error, operation = "resize", "shrink failed");
                RolloutOutcome::Failed { error }
            }
        };

        let result = RolloutResult {
            target: name.to_string(),
            requested_size: step.target_size,
            outcome,
        };
        on_event(RolloutEvent::Finished {
            index,
            total,
            result: &result,
        });
        results.push(result);
    }
    results
}
