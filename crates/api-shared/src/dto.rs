//! Wire types for the HTTP API.

use imghost_core::ImageRecord;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Response to a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UploadRes {
    /// Identifier of the new image (32 lowercase hex characters)
    pub id: String,
}

/// One catalogued image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImageRes {
    pub id: String,
    pub name: String,
    pub path: String,
    pub original_name: String,
}

impl From<ImageRecord> for ImageRes {
    fn from(record: ImageRecord) -> Self {
        Self {
            id: record.id.to_string(),
            name: record.name,
            path: record.path.to_string_lossy().into_owned(),
            original_name: record.original_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MessageRes {
    pub message: String,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub detail: String,
}

/// Multipart form accepted by `POST /upload` (documentation only).
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// The image file; its part must carry a filename and an `image/*` content type
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadQuery {
    /// Name to store the image under instead of the filename stem
    pub custom_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GetImageQuery {
    /// Lookup selector: `id` (default) or `name`
    pub by: Option<String>,
}
