//! HTTP handlers for image upload and retrieval.
//!
//! Both paths share the imaging helpers: uploads are resized before they are
//! stored, and serving resizes again at request time regardless of the stored
//! resolution.

use crate::{
    AppState,
    errors::AppError,
    imaging,
    models::metadata::{ImageMetadata, sidecar_name},
    services::captioner::clean_and_parse_json,
};
use axum::{
    body::{Body, Bytes},
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{error, info};

const MAX_WIDTH: u32 = 800;
const MAX_HEIGHT: u32 = 600;

const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// `POST /upload` — accept a single multipart file field named `image`.
///
/// Validation failures return 400; AI failures return 500. The image blob is
/// written before the caption request, so an AI-stage failure leaves the image
/// stored without its metadata sidecar — the gallery tolerates that.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut part: Option<(String, Option<String>, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("malformed multipart body: {err}")))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|err| AppError::bad_request(format!("malformed multipart body: {err}")))?;
        part = Some((file_name, content_type, data));
        break;
    }

    let Some((file_name, content_type, data)) = part else {
        return Err(AppError::bad_request("No file part"));
    };
    if file_name.is_empty() {
        return Err(AppError::bad_request("No selected file"));
    }
    if !allowed_extension(&file_name) {
        return Err(AppError::bad_request("Invalid file type"));
    }
    let filename = sanitize_filename(&file_name);
    if filename.is_empty() {
        return Err(AppError::bad_request("No selected file"));
    }

    // Resize before uploading; re-encode in the sniffed input format.
    let (img, format) = imaging::decode(&data)?;
    let resized = imaging::fit_within(img, MAX_WIDTH, MAX_HEIGHT);
    let encoded = Bytes::from(imaging::encode(&resized, format)?);

    state
        .store
        .put(&filename, content_type, encoded.clone())
        .await?;
    info!(name = %filename, bytes = encoded.len(), "stored uploaded image");

    // Ask the model for a description/caption pair, passing the resized image.
    let reply = match state
        .captioner
        .describe_image(&encoded, format.to_mime_type())
        .await
    {
        Ok(text) => text,
        Err(err) => {
            error!("caption request failed: {err}");
            return Err(AppError::internal("AI did not return a response"));
        }
    };

    let Some(parsed) = clean_and_parse_json(&reply) else {
        return Err(AppError::internal("Failed to parse AI response"));
    };

    let metadata = ImageMetadata::from_ai_reply(&parsed);
    state
        .store
        .put(
            &sidecar_name(&filename),
            Some("application/json".to_string()),
            Bytes::from(serde_json::to_vec(&metadata)?),
        )
        .await?;

    Ok((StatusCode::FOUND, [(header::LOCATION, "/")]).into_response())
}

/// `GET /image/{filename}` — fetch a blob, resize it to fit 800x600, and
/// return the re-encoded bytes with the stored content type.
///
/// The resize is re-applied on every request; nothing is cached.
pub async fn get_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let (blob, data) = state.store.get(&filename).await?;

    let (img, format) = imaging::decode(&data)?;
    let resized = imaging::fit_within(img, MAX_WIDTH, MAX_HEIGHT);
    let out = imaging::encode(&resized, format)?;

    let content_type = blob
        .content_type
        .unwrap_or_else(|| format.to_mime_type().to_string());

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(out))
        .map_err(|err| AppError::internal(err.to_string()))?;
    Ok(response)
}

/// Whether the filename carries one of the accepted image extensions.
fn allowed_extension(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Reduce an uploaded filename to a safe flat name: final path component only,
/// characters outside `[A-Za-z0-9._-]` replaced with `_`, leading dots
/// stripped. May produce an empty string for degenerate inputs.
fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_allow_list_is_case_insensitive() {
        assert!(allowed_extension("photo.png"));
        assert!(allowed_extension("photo.JPG"));
        assert!(allowed_extension("photo.JpEg"));
        assert!(allowed_extension("anim.gif"));
        assert!(!allowed_extension("doc.pdf"));
        assert!(!allowed_extension("archive.png.zip"));
        assert!(!allowed_extension("noextension"));
        assert!(!allowed_extension("trailingdot."));
    }

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd.png"), "passwd.png");
        assert_eq!(sanitize_filename("C:\\temp\\shot.jpg"), "shot.jpg");
        assert_eq!(sanitize_filename("plain.gif"), "plain.gif");
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize_filename("caf\u{e9}.jpg"), "caf_.jpg");
    }

    #[test]
    fn sanitize_strips_leading_dots() {
        assert_eq!(sanitize_filename(".hidden.png"), "hidden.png");
        assert_eq!(sanitize_filename(".."), "");
    }
}
