// Error kinds for input parsing, per-target remote calls and whole sessions

use std::time::Duration;
use thiserror::Error;

use crate::models::Rejection;

/// Malformed user entry. Recoverable: the prompt is repeated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct InputError {
    pub field: &'static str,
    pub reason: String,
}

impl InputError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Failure of a single remote call against one target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("target unreachable: {0}")]
    Unreachable(String),
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("resource {0} not found")]
    ResourceNotFound(String),
    #[error("no response within {}ms", .0.as_millis())]
    TimedOut(Duration),
    #[error("resize failed: {0}")]
    MutationFailed(String),
}

/// A [`TargetError`] tagged with the host it came from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{target}: {error}")]
pub struct TargetFailure {
    pub target: String,
    pub error: TargetError,
}

/// Session-level aborts. Only these stop a session before or instead of the rollout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no target returned usable constraints ({} failed)", .0.len())]
    NoValidTargets(Vec<TargetFailure>),
    #[error("validation failed for {} target(s)", .0.len())]
    ValidationFailed(Vec<Rejection>),
    #[error("cancelled by user")]
    UserCancelled,
}

/// Host-side storage failures, reported by the agent and the local executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("resource {0} not found")]
    NotFound(String),
    #[error("{0}")]
    ConstraintViolated(String),
    #[error("resize command failed: {0}")]
    CommandFailed(String),
    #[error("{0}")]
    Unsupported(String),
    #[error("{0}")]
    Internal(String),
}

