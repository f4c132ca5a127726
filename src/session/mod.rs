// Interactive loop: collect input, query, validate, confirm, execute, report, ask to restart.
// Every pass builds a fresh Session; nothing carries over between passes.

pub mod input;
mod report;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufRead;
use tracing::Instrument;

use crate::audit_repo::{self, AuditRepo};
use crate::collector::{self, CollectOptions};
use crate::config::OrchestratorConfig;
use crate::error::SessionError;
use crate::models::{ResourceId, RolloutResult, Target};
use crate::remote::{Credentials, RemoteExecutor};
use crate::rollout;
use crate::validator::{self, Feasibility};
use input::{
    is_affirmative, parse_password, parse_resource, parse_shrink_amount, parse_target_count,
    parse_target_name, parse_username, prompt, prompt_until,
};

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub request_timeout: Duration,
    pub min_granularity: u64,
    pub max_targets: usize,
    pub parallel_collection: bool,
}

impl From<&OrchestratorConfig> for SessionSettings {
    fn from(c: &OrchestratorConfig) -> Self {
        Self {
            request_timeout: c.request_timeout(),
            min_granularity: c.min_granularity_bytes,
            max_targets: c.max_targets,
            parallel_collection: c.parallel_collection,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionInput {
    pub targets: Vec<Target>,
    pub resource: ResourceId,
    pub credentials: Credentials,
}

/// One collect-validate-confirm-execute-report cycle.
#[derive(Debug)]
pub struct Session {
    /// Start time in ms since the epoch; also the audit session id.
    pub id: i64,
    pub input: SessionInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed(Vec<RolloutResult>),
    Aborted(SessionError),
}

impl SessionOutcome {
    /// True when the operator has something to look into. A deliberate cancel does not count.
    pub fn needs_attention(&self) -> bool {
        match self {
            SessionOutcome::Completed(results) => results.iter().any(|r| !r.is_success()),
            SessionOutcome::Aborted(SessionError::UserCancelled) => false,
            SessionOutcome::Aborted(_) => true,
        }
    }
}

pub struct Orchestrator {
    executor: Arc<dyn RemoteExecutor>,
    settings: SessionSettings,
    audit: Option<Arc<AuditRepo>>,
}

impl Orchestrator {
    pub fn new(
        executor: Arc<dyn RemoteExecutor>,
        settings: SessionSettings,
        audit: Option<Arc<AuditRepo>>,
    ) -> Self {
        Self {
            executor,
            settings,
            audit,
        }
    }

    /// Runs sessions until the operator declines a restart or input ends.
    /// Returns the outcome of the last session, if any got past input collection.
    pub async fn run_loop<R, W>(&self, reader: &mut R, writer: &mut W) -> anyhow::Result<Option<SessionOutcome>>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut last = None;
        loop {
            let Some(outcome) = self.run_session(reader, writer).await? else {
                break;
            };
            last = Some(outcome);
            writeln!(writer)?;
            let again = prompt(reader, writer, "Start over with new input? [y/N]").await?;
            if !again.as_deref().is_some_and(is_affirmative) {
                break;
            }
        }
        Ok(last)
    }

    /// One full cycle. `None` when input ended before the session could finish.
    pub async fn run_session<R, W>(&self, reader: &mut R, writer: &mut W) -> anyhow::Result<Option<SessionOutcome>>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let Some(input) = self.collect_input(reader, writer).await? else {
            return Ok(None);
        };
        let session = Session {
            id: audit_repo::now_ms()?,
            input,
        };
        let span = tracing::info_span!("session", id = session.id, resource = %session.input.resource);
        self.drive(&session, reader, writer).instrument(span).await
    }

    async fn collect_input<R, W>(&self, reader: &mut R, writer: &mut W) -> anyhow::Result<Option<SessionInput>>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let max = self.settings.max_targets;
        let Some(count) = prompt_until(reader, writer, &format!("Number of targets (1-{}):", max), |s| {
            parse_target_count(s, max)
        })
        .await?
        else {
            return Ok(None);
        };

        let mut targets: Vec<Target> = Vec::with_capacity(count);
        for i in 1..=count {
            let question = format!("Target {} of {}:", i, count);
            let Some(target) =
                prompt_until(reader, writer, &question, |s| parse_target_name(s, &targets)).await?
            else {
                return Ok(None);
            };
            targets.push(target);
        }

        let Some(resource) = prompt_until(
            reader,
            writer,
            "Volume to shrink (drive letter or mount path):",
            parse_resource,
        )
        .await?
        else {
            return Ok(None);
        };
        let Some(username) = prompt_until(reader, writer, "Username:", parse_username).await? else {
            return Ok(None);
        };
        let Some(password) = prompt_until(reader, writer, "Password:", parse_password).await? else {
            return Ok(None);
        };

        Ok(Some(SessionInput {
            targets,
            resource,
            credentials: Credentials::new(username, password),
        }))
    }

    async fn drive<R, W>(&self, session: &Session, reader: &mut R, writer: &mut W) -> anyhow::Result<Option<SessionOutcome>>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let input = &session.input;
        let options = CollectOptions {
            timeout: self.settings.request_timeout,
            parallel: self.settings.parallel_collection,
        };

        writeln!(writer, "Querying {} target(s)...", input.targets.len())?;
        let collection = match collector::collect_constraints(
            self.executor.as_ref(),
            &input.targets,
            &input.resource,
            &input.credentials,
            options,
        )
        .await
        {
            Ok(c) => c,
            Err(e) => {
                writeln!(writer, "No target returned usable sizes; nothing was changed:")?;
                if let SessionError::NoValidTargets(failures) = &e {
                    report::write_failures(writer, failures)?;
                }
                return Ok(Some(SessionOutcome::Aborted(e)));
            }
        };

        let successes = collection.successes();
        let aggregate = collection.aggregate();
        let max_shrink = validator::max_uniform_shrink(&successes, &aggregate);
        report::write_constraints(writer, &collection, &aggregate, max_shrink)?;
        writeln!(writer)?;

        let Some(request) = prompt_until(
            reader,
            writer,
            "Amount to shrink by (MB, or with B/KB/MB/GB/TB):",
            parse_shrink_amount,
        )
        .await?
        else {
            return Ok(None);
        };

        let validation = validator::validate(
            &input.resource,
            &successes,
            &aggregate,
            request,
            self.settings.min_granularity,
        );
        for advisory in &validation.advisories {
            writeln!(writer, "  note: {}", advisory)?;
        }
        let plan = match validation.feasibility {
            Feasibility::Feasible(plan) => plan,
            Feasibility::Infeasible(rejections) => {
                report::write_rejections(writer, &rejections)?;
                tracing::info!(rejected = rejections.len(), "validation failed");
                return Ok(Some(SessionOutcome::Aborted(SessionError::ValidationFailed(
                    rejections,
                ))));
            }
        };

        report::write_plan(writer, &plan)?;
        let question = format!("Shrink {} on {} target(s) by {}? [y/N]", plan.resource, plan.steps.len(), request);
        let confirmed = prompt(reader, writer, &question).await?;
        if !confirmed.as_deref().is_some_and(is_affirmative) {
            writeln!(writer, "Cancelled; nothing was changed.")?;
            return Ok(Some(SessionOutcome::Aborted(SessionError::UserCancelled)));
        }

        let results = rollout::execute(
            self.executor.as_ref(),
            &plan,
            &input.credentials,
            self.settings.request_timeout,
            |event| {
                if let Err(e) = report::write_event(writer, &event) {
                    tracing::warn!(error = %e, operation = "write_event", "progress output failed");
                }
            },
        )
        .await;

        // The disks have already changed: record before any output can fail.
        if let Some(audit) = &self.audit {
            let recorded = audit
                .record_rollout(session.id, audit_repo::now_ms().unwrap_or(session.id), &plan.resource, &results)
                .await;
            if let Err(e) = recorded {
                tracing::warn!(error = %e, operation = "record_rollout", "audit write failed");
            }
        }
        report::write_summary(writer, &results)?;
        Ok(Some(SessionOutcome::Completed(results)))
    }
}
