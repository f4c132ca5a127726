// Constraint collection: one read-only query per target, failures kept per target

use futures_util::future::join_all;
use std::time::Duration;
use tracing::instrument;

use crate::error::{SessionError, TargetError, TargetFailure};
use crate::models::{AggregateConstraint, ResourceConstraint, ResourceId, Target};
use crate::remote::{Credentials, RemoteExecutor};
use crate::validator;

#[derive(Debug, Clone, Copy)]
pub struct CollectOptions {
    pub timeout: Duration,
    /// Queries are read-only, so they may run concurrently.
    pub parallel: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedTarget {
    pub target: Target,
    pub outcome: Result<ResourceConstraint, TargetError>,
}

/// Per-target outcomes in input order. Holds at least one success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    entries: Vec<CollectedTarget>,
}

impl Collection {
    pub fn entries(&self) -> &[CollectedTarget] {
        &self.entries
    }

    pub fn successes(&self) -> Vec<(Target, ResourceConstraint)> {
        self.entries
            .iter()
            .filter_map(|e| e.outcome.as_ref().ok().map(|c| (e.target.clone(), *c)))
            .collect()
    }

    pub fn failures(&self) -> Vec<TargetFailure> {
        self.entries
            .iter()
            .filter_map(|e| {
                e.outcome.as_ref().err().map(|error| TargetFailure {
                    target: e.target.name().to_string(),
                    error: error.clone(),
                })
            })
            .collect()
    }

    pub fn aggregate(&self) -> AggregateConstraint {
        validator::aggregate_floor(&self.successes())
            .unwrap_or_else(|| unreachable!("a collection always holds a success"))
    }
}

/// Queries every target. Fails with `NoValidTargets` only when no target answered.
#[instrument(skip_all, fields(resource = %resource, targets = targets.len()))]
pub async fn collect_constraints(
    executor: &dyn RemoteExecutor,
    targets: &[Target],
    resource: &ResourceId,
    credentials: &Credentials,
    options: CollectOptions,
) -> Result<Collection, SessionError> {
    let entries = if options.parallel {
        join_all(
            targets
                .iter()
                .map(|t| query_one(executor, t, resource, credentials, options.timeout)),
        )
        .await
    } else {
        let mut out = Vec::with_capacity(targets.len());
        for t in targets {
            out.push(query_one(executor, t, resource, credentials, options.timeout).await);
        }
        out
    };

    let collection = Collection { entries };
    if collection.entries.iter().all(|e| e.outcome.is_err()) {
        tracing::warn!(operation = "collect_constraints", "no target returned constraints");
        return Err(SessionError::NoValidTargets(collection.failures()));
    }
    Ok(collection)
}

async fn query_one(
    executor: &dyn RemoteExecutor,
    target: &Target,
    resource: &ResourceId,
    credentials: &Credentials,
    timeout: Duration,
) -> CollectedTarget {
    let result = tokio::time::timeout(
        timeout,
        executor.query(target.name(), credentials, resource),
    )
    .await
    .unwrap_or(Err(TargetError::TimedOut(timeout)));

    match result {
        Ok(constraint) => {
            tracing::debug!(
                host = %target,
                current_size = constraint.current_size(),
                minimum_size = constraint.minimum_size(),
                "constraints collected"
            );
            CollectedTarget {
                target: target.reachable(),
                outcome: Ok(constraint),
            }
        }
        Err(error) => {
            tracing::warn!(host = %target, error = %error, operation = "query", "constraint query failed");
            CollectedTarget {
                target: target.failed(&error),
                outcome: Err(error),
            }
        }
    }
}
