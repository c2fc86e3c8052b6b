use crate::error::{AppError, AppResult};
use crate::schemas::{AppState, ErrorResponse};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::response::Json;
use chrono::{DateTime, Utc};
use common::Envelope;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Multipart field carrying the file
pub const IMAGE_FIELD: &str = "image";

/// Largest accepted request body for `/upload` (10MB)
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Stored upload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Generated name the file was stored under
    pub filename: String,
    /// Size in bytes
    pub size: usize,
    /// Public URL of the stored file
    pub url: String,
}

/// Multipart form accepted by the upload endpoint
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    image: Vec<u8>,
}

/// Name a stored upload: `<field>-<timestamp>-<suffix><.ext>`.
///
/// The timestamp is the RFC 3339 UTC instant with `:` and `.` turned into
/// `-` so the name is safe on every filesystem. Only an alphanumeric
/// extension of the original name is kept.
pub fn stored_filename(field: &str, original: Option<&str>, at: DateTime<Utc>) -> String {
    let timestamp = at.format("%Y-%m-%dT%H-%M-%S-%3fZ");
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();

    let extension = original
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    format!("{}-{}-{}{}", field, timestamp, suffix, extension)
}

/// Upload an image
#[utoipa::path(
    post,
    path = "/api/v1/upload",
    tag = "upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File stored", body = Envelope<UploadResponse>),
        (status = 400, description = "No image field in the form", body = ErrorResponse),
        (status = 500, description = "File could not be written", body = ErrorResponse)
    )
)]
#[instrument(skip(state, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<Envelope<UploadResponse>>> {
    let mut multipart = multipart?;

    let mut upload: Option<(Option<String>, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(IMAGE_FIELD) {
            let original = field.file_name().map(str::to_string);
            let data = field.bytes().await?;
            upload = Some((original, data.to_vec()));
            break;
        }
        debug!("Skipping multipart field {:?}", field.name());
    }

    let (original, data) = upload.ok_or_else(|| {
        warn!("Upload without an '{}' field", IMAGE_FIELD);
        AppError::Validation(format!("No file uploaded in field '{}'", IMAGE_FIELD))
    })?;

    let upload_dir = PathBuf::from(&state.settings.upload_dir);
    tokio::fs::create_dir_all(&upload_dir).await?;

    let filename = stored_filename(IMAGE_FIELD, original.as_deref(), Utc::now());
    tokio::fs::write(upload_dir.join(&filename), &data).await?;

    let url = state.settings.public_url(&format!("uploads/{}", filename));
    info!(
        "Stored upload {} ({} bytes) from {:?}",
        filename,
        data.len(),
        original
    );

    Ok(Json(Envelope::one(
        UploadResponse {
            filename,
            size: data.len(),
            url,
        },
        "File uploaded successfully",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stored_filename_layout() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 20, 30, 15).unwrap();
        let name = stored_filename("image", Some("Paella.JPG"), at);

        assert!(name.starts_with("image-2025-03-01T20-30-15-000Z-"));
        assert!(name.ends_with(".jpg"));
        assert!(!name.contains(':'));
        let suffix = name
            .trim_end_matches(".jpg")
            .rsplit('-')
            .next()
            .unwrap();
        assert_eq!(suffix.len(), 8);
    }

    #[test]
    fn test_stored_filename_drops_suspicious_extensions() {
        let at = Utc::now();
        assert!(!stored_filename("image", Some("x.p/hp"), at).contains('/'));
        assert!(!stored_filename("image", Some("noext"), at).contains('.'));
        assert!(!stored_filename("image", None, at).contains('.'));
    }

    #[test]
    fn test_two_uploads_get_distinct_names() {
        let at = Utc::now();
        assert_ne!(
            stored_filename("image", Some("a.png"), at),
            stored_filename("image", Some("a.png"), at)
        );
    }
}
