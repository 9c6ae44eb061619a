use super::{ApiError, AppState};
use crate::ai::mime::resolve_image_mime;
use crate::image::validate_image;
use crate::models::{AnalysisResponse, UploadedImage, UsageRecord};
use crate::usage::record_in_background;
use crate::Error;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Multipart field carrying the upload.
const IMAGE_FIELD: &str = "image";

/// Pull the `image` field out of the form. Other fields are ignored.
async fn read_image_field(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadedImage, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        debug!("Request is not a multipart form: {}", rejection);
        ApiError::MissingInput
    })?;

    while let Some(field) = multipart.next_field().await.map_err(ApiError::Multipart)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let declared = field.content_type().map(|c| c.to_string());
        let bytes = field.bytes().await.map_err(ApiError::Multipart)?.to_vec();
        if bytes.is_empty() {
            return Err(ApiError::MissingInput);
        }
        let mime_type = resolve_image_mime(declared.as_deref(), &bytes);
        return Ok(UploadedImage { bytes, mime_type });
    }

    Err(ApiError::MissingInput)
}

/// Analyze an uploaded image with the first candidate model that succeeds.
///
/// # Returns
/// - 200 OK with `analysis`, `model_used` and, for text-only fallbacks, `note`
/// - 400 Bad Request for a missing or undecodable image, or when every
///   candidate rejected the request format
/// - 401 Unauthorized when the API credential is rejected
/// - 500 Internal Server Error when every candidate failed
/// - 503 Service Unavailable on an upstream outage
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let image = read_image_field(multipart).await?;

    let summary = validate_image(&image.bytes).await.map_err(|e| match e {
        Error::Image(err) => {
            info!("Rejected undecodable upload ({} bytes): {}", image.bytes.len(), err);
            ApiError::InvalidImage(err.to_string())
        }
        other => ApiError::Internal(other.to_string()),
    })?;
    info!(
        "Received {} image (decoded as {:?}) {}x{} ({} bytes)",
        image.mime_type,
        summary.format,
        summary.width,
        summary.height,
        image.bytes.len()
    );

    let analysis = state.dispatcher.analyze(&image).await?;

    if let Some(store) = &state.usage {
        record_in_background(store.clone(), UsageRecord::from_analysis(&analysis));
    }

    Ok(Json(analysis.into()))
}

/// Check connectivity to the usage store.
pub async fn test_db(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let store = state
        .usage
        .as_ref()
        .ok_or_else(|| ApiError::Internal("Usage store is not configured".to_string()))?;

    let message = store.ping().await.map_err(|e| {
        warn!("Usage store ping failed: {}", e);
        ApiError::StoreUnreachable(e.to_string())
    })?;

    Ok(Json(json!({ "message": message })))
}
