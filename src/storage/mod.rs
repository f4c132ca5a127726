// Host-side volume sizes via sysinfo, and the resize call into the OS tooling

mod command;

pub use command::ResizeCommand;

use crate::error::StorageError;
use crate::models::{ResourceConstraint, ResourceId};
use futures_util::future::BoxFuture;
use std::sync::Arc;
use sysinfo::Disks;
use tracing::instrument;

/// Reads and resizes named volumes on the machine it runs on.
pub trait StorageBackend: Send + Sync {
    fn describe<'a>(
        &'a self,
        resource: &'a ResourceId,
    ) -> BoxFuture<'a, Result<ResourceConstraint, StorageError>>;

    /// Resizes to `new_size` bytes and returns the size observed afterwards.
    fn resize<'a>(
        &'a self,
        resource: &'a ResourceId,
        new_size: u64,
    ) -> BoxFuture<'a, Result<u64, StorageError>>;
}

/// One mounted volume as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeEntry {
    pub mount: String,
    pub device: String,
    pub total_space: u64,
    pub available_space: u64,
}

impl VolumeEntry {
    pub fn used_space(&self) -> u64 {
        self.total_space.saturating_sub(self.available_space)
    }

    /// Used space plus headroom, never above the total.
    pub fn constraint(&self, headroom: u64) -> ResourceConstraint {
        let minimum = self
            .used_space()
            .saturating_add(headroom)
            .min(self.total_space);
        ResourceConstraint::new(self.total_space, minimum)
            .unwrap_or_else(|| unreachable!("minimum is capped at total"))
    }
}

/// Drive letters match mount points starting with `X:`; other ids match the
/// mount point or the device name exactly.
pub fn find_volume<'a>(volumes: &'a [VolumeEntry], id: &ResourceId) -> Option<&'a VolumeEntry> {
    match id.drive_letter() {
        Some(letter) => {
            let prefix = format!("{}:", letter);
            volumes
                .iter()
                .find(|v| v.mount.to_ascii_uppercase().starts_with(&prefix))
        }
        None => volumes
            .iter()
            .find(|v| v.mount == id.as_str() || v.device == id.as_str()),
    }
}

/// Checks a requested size against live constraints.
pub fn check_resize(
    constraint: &ResourceConstraint,
    new_size: u64,
) -> Result<(), StorageError> {
    if new_size < constraint.minimum_size() {
        return Err(StorageError::ConstraintViolated(format!(
            "new size {} is below the minimum size {}",
            new_size,
            constraint.minimum_size()
        )));
    }
    if new_size >= constraint.current_size() {
        return Err(StorageError::ConstraintViolated(format!(
            "new size {} is not smaller than the current size {}",
            new_size,
            constraint.current_size()
        )));
    }
    Ok(())
}

/// Size reported after a resize; the requested size when the volume can no longer be read.
fn observed_size(
    after: Result<VolumeEntry, StorageError>,
    resource: &ResourceId,
    requested: u64,
) -> u64 {
    match after {
        Ok(volume) => volume.total_space,
        Err(e) => {
            tracing::warn!(
                resource = %resource,
                error = %e,
                operation = "resize",
                "volume unreadable after resize; reporting the requested size"
            );
            requested
        }
    }
}

pub struct SysinfoStorage {
    disks: Arc<std::sync::Mutex<Disks>>,
    minimum_headroom: u64,
    resize_command: ResizeCommand,
}

impl SysinfoStorage {
    pub fn new(minimum_headroom: u64, resize_command: ResizeCommand) -> Self {
        Self {
            disks: Arc::new(std::sync::Mutex::new(Disks::new_with_refreshed_list())),
            minimum_headroom,
            resize_command,
        }
    }

    #[instrument(skip(self), fields(backend = "sysinfo", operation = "list_volumes"))]
    pub async fn list_volumes(&self) -> Result<Vec<VolumeEntry>, StorageError> {
        let disks = self.disks.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = disks
                .lock()
                .map_err(|e| StorageError::Internal(format!("sysinfo disks lock poisoned: {}", e)))?;
            guard.refresh(true);
            Ok(guard
                .list()
                .iter()
                .map(|d| VolumeEntry {
                    mount: d.mount_point().to_string_lossy().into_owned(),
                    device: d.name().to_string_lossy().into_owned(),
                    total_space: d.total_space(),
                    available_space: d.available_space(),
                })
                .collect())
        })
        .await
        .map_err(|e| StorageError::Internal(format!("sysinfo task join: {}", e)))?
    }

    async fn lookup(&self, resource: &ResourceId) -> Result<VolumeEntry, StorageError> {
        let volumes = self.list_volumes().await?;
        find_volume(&volumes, resource)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(resource.to_string()))
    }
}

impl StorageBackend for SysinfoStorage {
    fn describe<'a>(
        &'a self,
        resource: &'a ResourceId,
    ) -> BoxFuture<'a, Result<ResourceConstraint, StorageError>> {
        Box::pin(async move {
            let volume = self.lookup(resource).await?;
            Ok(volume.constraint(self.minimum_headroom))
        })
    }

    fn resize<'a>(
        &'a self,
        resource: &'a ResourceId,
        new_size: u64,
    ) -> BoxFuture<'a, Result<u64, StorageError>> {
        Box::pin(async move {
            let volume = self.lookup(resource).await?;
            check_resize(&volume.constraint(self.minimum_headroom), new_size)?;
            self.resize_command
                .run(&volume.device, &volume.mount, new_size)
                .await?;
            tracing::info!(
                resource = %resource,
                device = %volume.device,
                new_size,
                "volume resized"
            );
            Ok(observed_size(self.lookup(resource).await, resource, new_size))
        })
    }
}
