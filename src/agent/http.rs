// Handlers: version, volume query, volume resize

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::AgentState;
use crate::error::StorageError;
use crate::models::{ErrorBody, ResizeRequest, ResourceId, VolumeInfo};
use crate::version::{NAME, VERSION};

pub(super) enum ApiError {
    Unauthorized,
    Storage(StorageError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "invalid credentials".to_string()),
            ApiError::Storage(e) => {
                let status = match e {
                    StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                    StorageError::ConstraintViolated(_) => StatusCode::CONFLICT,
                    StorageError::CommandFailed(_)
                    | StorageError::Unsupported(_)
                    | StorageError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::Storage(e)
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct VolumeQuery {
    resource: ResourceId,
}

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/volume?resource=<id>: live current and minimum size.
pub(super) async fn describe_volume(
    State(state): State<AgentState>,
    Query(query): Query<VolumeQuery>,
) -> Result<Json<VolumeInfo>, ApiError> {
    let constraint = state.storage.describe(&query.resource).await?;
    Ok(Json(VolumeInfo {
        resource: query.resource,
        current_size: constraint.current_size(),
        minimum_size: Some(constraint.minimum_size()),
    }))
}

/// POST /api/volume/resize: shrink to `newSize`; 409 when the live constraints forbid it.
pub(super) async fn resize_volume(
    State(state): State<AgentState>,
    Json(request): Json<ResizeRequest>,
) -> Result<Json<VolumeInfo>, ApiError> {
    let resulting = state
        .storage
        .resize(&request.resource, request.new_size)
        .await
        .inspect_err(|e| {
            tracing::warn!(resource = %request.resource, new_size = request.new_size, error = %e, "resize refused or failed")
        })?;
    Ok(Json(VolumeInfo {
        resource: request.resource,
        current_size: resulting,
        minimum_size: None,
    }))
}
