// Agent wire types (JSON, camelCase like the rest of the API)

use serde::{Deserialize, Serialize};

use crate::models::ResourceId;

/// Body of `GET /api/volume` and of a successful `POST /api/volume/resize`.
/// `minimum_size` is omitted in resize replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    pub resource: ResourceId,
    pub current_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeRequest {
    pub resource: ResourceId,
    pub new_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
