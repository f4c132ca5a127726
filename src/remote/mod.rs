// Remote execution channel: query and resize a named volume on one target

mod http;
mod local;

pub use http::HttpExecutor;
pub use local::LocalExecutor;

use crate::error::TargetError;
use crate::models::{ResourceConstraint, ResourceId};
use futures_util::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// Account used to authenticate against each target.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub trait RemoteExecutor: Send + Sync {
    /// Read-only: current and minimum size of `resource` on `target`.
    fn query<'a>(
        &'a self,
        target: &'a str,
        credentials: &'a Credentials,
        resource: &'a ResourceId,
    ) -> BoxFuture<'a, Result<ResourceConstraint, TargetError>>;

    /// Mutating: resize `resource` on `target` to `new_size` bytes. Returns the resulting size.
    fn resize<'a>(
        &'a self,
        target: &'a str,
        credentials: &'a Credentials,
        resource: &'a ResourceId,
        new_size: u64,
    ) -> BoxFuture<'a, Result<u64, TargetError>>;
}

/// Sends local aliases to the in-process executor and everything else to the agent.
pub struct RoutingExecutor {
    local: Arc<dyn RemoteExecutor>,
    remote: Arc<dyn RemoteExecutor>,
    local_aliases: Vec<String>,
}

impl RoutingExecutor {
    pub fn new(
        local: Arc<dyn RemoteExecutor>,
        remote: Arc<dyn RemoteExecutor>,
        local_aliases: Vec<String>,
    ) -> Self {
        Self {
            local,
            remote,
            local_aliases,
        }
    }

    fn route(&self, target: &str) -> &dyn RemoteExecutor {
        if self
            .local_aliases
            .iter()
            .any(|a| a.eq_ignore_ascii_case(target))
        {
            self.local.as_ref()
        } else {
            self.remote.as_ref()
        }
    }
}

impl RemoteExecutor for RoutingExecutor {
    fn query<'a>(
        &'a self,
        target: &'a str,
        credentials: &'a Credentials,
        resource: &'a ResourceId,
    ) -> BoxFuture<'a, Result<ResourceConstraint, TargetError>> {
        self.route(target).query(target, credentials, resource)
    }

    fn resize<'a>(
        &'a self,
        target: &'a str,
        credentials: &'a Credentials,
        resource: &'a ResourceId,
        new_size: u64,
    ) -> BoxFuture<'a, Result<u64, TargetError>> {
        self.route(target)
            .resize(target, credentials, resource, new_size)
    }
}
