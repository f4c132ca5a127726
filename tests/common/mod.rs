// Shared test helpers: scriptable executor and in-memory storage
#![allow(dead_code)]

use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use volshrink::error::{StorageError, TargetError};
use volshrink::models::{ResourceConstraint, ResourceId, Target};
use volshrink::remote::{Credentials, RemoteExecutor};
use volshrink::storage::{StorageBackend, check_resize};
use volshrink::units::MIB;

pub fn mb(n: u64) -> u64 {
    n * MIB
}

pub fn creds() -> Credentials {
    Credentials::new("admin", "secret")
}

pub fn drive_d() -> ResourceId {
    ResourceId::parse("D").unwrap()
}

pub fn targets(names: &[&str]) -> Vec<Target> {
    names.iter().map(|n| Target::new(*n)).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Query(String),
    Resize(String, u64),
}

#[derive(Clone)]
struct FakeHost {
    query: Result<ResourceConstraint, TargetError>,
    resize_error: Option<TargetError>,
    query_delay: Option<Duration>,
    resize_delay: Option<Duration>,
}

/// Executor with per-host canned answers. Unknown hosts are unreachable.
#[derive(Default)]
pub struct FakeExecutor {
    hosts: HashMap<String, FakeHost>,
    calls: Mutex<Vec<Call>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, name: &str, current: u64, minimum: u64) -> Self {
        self.hosts.insert(
            name.to_string(),
            FakeHost {
                query: Ok(ResourceConstraint::new(current, minimum).unwrap()),
                resize_error: None,
                query_delay: None,
                resize_delay: None,
            },
        );
        self
    }

    pub fn with_query_error(mut self, name: &str, error: TargetError) -> Self {
        self.hosts.insert(
            name.to_string(),
            FakeHost {
                query: Err(error),
                resize_error: None,
                query_delay: None,
                resize_delay: None,
            },
        );
        self
    }

    pub fn with_resize_error(mut self, name: &str, error: TargetError) -> Self {
        if let Some(h) = self.hosts.get_mut(name) {
            h.resize_error = Some(error);
        }
        self
    }

    pub fn with_query_delay(mut self, name: &str, delay: Duration) -> Self {
        if let Some(h) = self.hosts.get_mut(name) {
            h.query_delay = Some(delay);
        }
        self
    }

    pub fn with_resize_delay(mut self, name: &str, delay: Duration) -> Self {
        if let Some(h) = self.hosts.get_mut(name) {
            h.resize_delay = Some(delay);
        }
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn resize_calls(&self) -> Vec<(String, u64)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Resize(host, size) => Some((host, size)),
                Call::Query(_) => None,
            })
            .collect()
    }

    fn host(&self, name: &str) -> Result<FakeHost, TargetError> {
        self.hosts
            .get(name)
            .cloned()
            .ok_or_else(|| TargetError::Unreachable(format!("unknown host {}", name)))
    }
}

impl RemoteExecutor for FakeExecutor {
    fn query<'a>(
        &'a self,
        target: &'a str,
        _credentials: &'a Credentials,
        _resource: &'a ResourceId,
    ) -> BoxFuture<'a, Result<ResourceConstraint, TargetError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(Call::Query(target.to_string()));
            let host = self.host(target)?;
            if let Some(delay) = host.query_delay {
                tokio::time::sleep(delay).await;
            }
            host.query
        })
    }

    fn resize<'a>(
        &'a self,
        target: &'a str,
        _credentials: &'a Credentials,
        _resource: &'a ResourceId,
        new_size: u64,
    ) -> BoxFuture<'a, Result<u64, TargetError>> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Resize(target.to_string(), new_size));
            let host = self.host(target)?;
            if let Some(delay) = host.resize_delay {
                tokio::time::sleep(delay).await;
            }
            match host.resize_error {
                Some(e) => Err(e),
                None => Ok(new_size),
            }
        })
    }
}

/// Volumes kept in memory, resized by overwriting the current size.
#[derive(Default)]
pub struct MemoryStorage {
    volumes: Mutex<HashMap<String, ResourceConstraint>>,
    resize_error: Option<StorageError>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_volume(self, id: &str, current: u64, minimum: u64) -> Self {
        self.volumes.lock().unwrap().insert(
            ResourceId::parse(id).unwrap().as_str().to_string(),
            ResourceConstraint::new(current, minimum).unwrap(),
        );
        self
    }

    pub fn with_resize_error(mut self, error: StorageError) -> Self {
        self.resize_error = Some(error);
        self
    }

    pub fn current_size(&self, id: &str) -> Option<u64> {
        self.volumes
            .lock()
            .unwrap()
            .get(ResourceId::parse(id).unwrap().as_str())
            .map(|c| c.current_size())
    }
}

impl StorageBackend for MemoryStorage {
    fn describe<'a>(
        &'a self,
        resource: &'a ResourceId,
    ) -> BoxFuture<'a, Result<ResourceConstraint, StorageError>> {
        Box::pin(async move {
            self.volumes
                .lock()
                .unwrap()
                .get(resource.as_str())
                .copied()
                .ok_or_else(|| StorageError::NotFound(resource.to_string()))
        })
    }

    fn resize<'a>(
        &'a self,
        resource: &'a ResourceId,
        new_size: u64,
    ) -> BoxFuture<'a, Result<u64, StorageError>> {
        Box::pin(async move {
            let mut volumes = self.volumes.lock().unwrap();
            let current = volumes
                .get(resource.as_str())
                .copied()
                .ok_or_else(|| StorageError::NotFound(resource.to_string()))?;
            check_resize(&current, new_size)?;
            if let Some(e) = &self.resize_error {
                return Err(e.clone());
            }
            let updated = ResourceConstraint::new(new_size, current.minimum_size()).unwrap();
            volumes.insert(resource.as_str().to_string(), updated);
            Ok(new_size)
        })
    }
}
