// In-process executor for the machine the operator runs on

use super::{Credentials, RemoteExecutor};
use crate::error::{StorageError, TargetError};
use crate::models::{ResourceConstraint, ResourceId};
use crate::storage::StorageBackend;
use futures_util::future::BoxFuture;
use std::sync::Arc;

/// Calls the storage backend directly. Credentials are not checked: the
/// operator already holds the local session.
pub struct LocalExecutor {
    storage: Arc<dyn StorageBackend>,
}

impl LocalExecutor {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }
}

impl RemoteExecutor for LocalExecutor {
    fn query<'a>(
        &'a self,
        _target: &'a str,
        _credentials: &'a Credentials,
        resource: &'a ResourceId,
    ) -> BoxFuture<'a, Result<ResourceConstraint, TargetError>> {
        Box::pin(async move {
            self.storage.describe(resource).await.map_err(|e| match e {
                StorageError::NotFound(id) => TargetError::ResourceNotFound(id),
                other => TargetError::Unreachable(other.to_string()),
            })
        })
    }

    fn resize<'a>(
        &'a self,
        _target: &'a str,
        _credentials: &'a Credentials,
        resource: &'a ResourceId,
        new_size: u64,
    ) -> BoxFuture<'a, Result<u64, TargetError>> {
        Box::pin(async move {
            self.storage
                .resize(resource, new_size)
                .await
                .map_err(|e| match e {
                    StorageError::NotFound(id) => TargetError::ResourceNotFound(id),
                    other => TargetError::MutationFailed(other.to_string()),
                })
        })
    }
}
