//! # API REST
//!
//! REST API for the image host.
//!
//! Handles:
//! - HTTP endpoints with axum (upload, retrieval, deletion, listing)
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (multipart parsing, file serving, CORS, status mapping)
//!
//! Catalog operations are blocking (SQLite and filesystem), so every handler runs them on the
//! blocking thread pool.

#![warn(rust_2018_idioms)]

use api_shared::{
    ErrorRes, GetImageQuery, HealthRes, HealthService, ImageRes, MessageRes, UploadForm,
    UploadQuery, UploadRes,
};
use axum::{
    body::Body,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, Query, Request, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use imghost_core::{CatalogError, CatalogResult, ErrorKind, ImageCatalog};
use std::path::PathBuf;
use tower::ServiceExt;
use tower_http::{cors::CorsLayer, services::ServeFile, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Multipart field carrying the uploaded image
pub const UPLOAD_FIELD: &str = "file";

/// Application state shared across REST API handlers
#[derive(Clone)]
pub struct AppState {
    catalog: ImageCatalog,
}

impl AppState {
    pub fn new(catalog: ImageCatalog) -> Self {
        Self { catalog }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, upload_image, get_image, delete_image, list_images, stored_file),
    components(schemas(HealthRes, UploadRes, UploadForm, ImageRes, MessageRes, ErrorRes))
)]
pub struct ApiDoc;

/// Builds the REST application.
///
/// `max_upload_bytes` caps the request body of every route, uploads included.
pub fn router(catalog: ImageCatalog, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload_image))
        .route("/get_image/:identifier", get(get_image))
        .route("/delete/:image_id", delete(delete_image))
        .route("/images", get(list_images))
        .route("/images/:file", get(stored_file))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState::new(catalog))
}

/// Error returned by every handler, rendered as `{"detail": ...}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        let status = match err.kind() {
            ErrorKind::InvalidMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorKind::InvalidParameter | ErrorKind::DuplicateName => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::StorageFailure => {
                tracing::error!("Catalog storage failure: {:?}", err);
                return Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal error");
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorRes {
                detail: self.detail,
            }),
        )
            .into_response()
    }
}

/// Runs a catalog operation on the blocking pool.
async fn blocking<T, F>(op: F) -> Result<T, ApiError>
where
    F: FnOnce() -> CatalogResult<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| CatalogError::Task(e.to_string()))?;
    Ok(result?)
}

async fn serve_file(path: PathBuf, request: Request) -> Response {
    match ServeFile::new(path).oneshot(request).await {
        Ok(res) => res.map(Body::new),
        Err(never) => match never {},
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/upload",
    params(UploadQuery),
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image stored", body = UploadRes),
        (status = 400, description = "Missing file field, invalid or duplicate name", body = ErrorRes),
        (status = 413, description = "Upload exceeds the configured size limit"),
        (status = 415, description = "Content type is not image/*", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Upload an image
///
/// Stores the `file` part of a multipart form. The image is named after the filename stem
/// unless `custom_name` is given; the stored file keeps the original extension.
///
/// # Errors
/// - `400` if the form has no `file` field, the name is invalid, or the name is taken
/// - `415` if the part's content type is not `image/*`
/// - `500` if the file or its record cannot be written
#[axum::debug_handler]
async fn upload_image(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Json<UploadRes>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        upload = Some((filename, content_type, bytes));
        break;
    }

    let Some((filename, content_type, bytes)) = upload else {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("multipart field '{UPLOAD_FIELD}' is required"),
        ));
    };

    tracing::debug!(
        "upload '{}' ({}, {} bytes)",
        filename,
        content_type,
        bytes.len()
    );

    let catalog = state.catalog.clone();
    let id = blocking(move || {
        catalog.store(
            bytes.as_ref(),
            &content_type,
            &filename,
            query.custom_name.as_deref(),
        )
    })
    .await?;

    Ok(Json(UploadRes { id: id.to_string() }))
}

#[utoipa::path(
    get,
    path = "/get_image/{identifier}",
    params(
        ("identifier" = String, Path, description = "Image id or name, depending on `by`"),
        GetImageQuery
    ),
    responses(
        (status = 200, description = "The image bytes"),
        (status = 400, description = "Invalid `by` selector", body = ErrorRes),
        (status = 404, description = "No such image, or its file is missing", body = ErrorRes)
    )
)]
/// Fetch an image by id (default) or by name
#[axum::debug_handler]
async fn get_image(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    Query(query): Query<GetImageQuery>,
    request: Request,
) -> Result<Response, ApiError> {
    let by = query.by.unwrap_or_else(|| "id".into());
    let catalog = state.catalog.clone();
    let path = blocking(move || catalog.resolve_by(&identifier, &by)).await?;
    Ok(serve_file(path, request).await)
}

#[utoipa::path(
    delete,
    path = "/delete/{image_id}",
    params(("image_id" = String, Path, description = "Image id")),
    responses(
        (status = 200, description = "Image deleted", body = MessageRes),
        (status = 404, description = "No such image", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Delete an image and its file
#[axum::debug_handler]
async fn delete_image(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> Result<Json<MessageRes>, ApiError> {
    let catalog = state.catalog.clone();
    blocking(move || catalog.delete(&image_id)).await?;
    Ok(Json(MessageRes {
        message: "Image deleted successfully".into(),
    }))
}

#[utoipa::path(
    get,
    path = "/images",
    responses(
        (status = 200, description = "Every catalogued image, oldest first", body = [ImageRes]),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn list_images(State(state): State<AppState>) -> Result<Json<Vec<ImageRes>>, ApiError> {
    let catalog = state.catalog.clone();
    let records = blocking(move || catalog.list_all()).await?;
    Ok(Json(records.into_iter().map(ImageRes::from).collect()))
}

#[utoipa::path(
    get,
    path = "/images/{file}",
    params(("file" = String, Path, description = "Stored filename, e.g. `cat.png`")),
    responses(
        (status = 200, description = "The stored file"),
        (status = 400, description = "Not a plain filename", body = ErrorRes),
        (status = 404, description = "No such file", body = ErrorRes)
    )
)]
/// Serve a stored file directly by its on-disk filename
#[axum::debug_handler]
async fn stored_file(
    State(state): State<AppState>,
    Path(file): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let catalog = state.catalog.clone();
    let path = blocking(move || catalog.stored_file(&file)).await?;
    Ok(serve_file(path, request).await)
}
