use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::{HttpRequest, HttpResponse, ResponseError, web};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::{StreamExt, TryStreamExt};
use serde::Deserialize;
use shared::ErrorResponse;

pub const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;
// base64 inflates by 4/3, plus room for the JSON envelope.
const MAX_JSON_BYTES: usize = MAX_IMAGE_BYTES / 3 * 4 + 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No image provided")]
    Missing,
    #[error("No file selected")]
    EmptyFilename,
    #[error("Invalid base64 image: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Image too large")]
    TooLarge,
    #[error("Failed to read request body: {0}")]
    Payload(String),
}

impl ResponseError for UploadError {
    fn status_code(&self) -> StatusCode {
        match self {
            UploadError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            UploadError::EmptyFilename => "Please select an image file",
            UploadError::TooLarge => "Images are limited to 50 MiB",
            _ => "Please provide an image file or base64 encoded image",
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            success: false,
            error: self.to_string(),
            message: message.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct ImagePayload {
    image: Option<String>,
}

/// Reads the uploaded image: the `image` field of a multipart form, or a
/// JSON body `{"image": "<base64 or data URL>"}`.
pub async fn read_image(req: &HttpRequest, payload: web::Payload) -> Result<Vec<u8>, UploadError> {
    let is_multipart = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().starts_with("multipart/form-data"));

    if is_multipart {
        read_multipart(Multipart::new(req.headers(), payload)).await
    } else {
        read_json(payload).await
    }
}

async fn read_multipart(mut payload: Multipart) -> Result<Vec<u8>, UploadError> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| UploadError::Payload(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_owned);
        if file_name.as_deref() == Some("") {
            return Err(UploadError::EmptyFilename);
        }

        let mut image_data = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| UploadError::Payload(e.to_string()))?;
            if image_data.len() + data.len() > MAX_IMAGE_BYTES {
                return Err(UploadError::TooLarge);
            }
            image_data.extend_from_slice(&data);
        }
        return Ok(image_data);
    }
    Err(UploadError::Missing)
}

async fn read_json(mut payload: web::Payload) -> Result<Vec<u8>, UploadError> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| UploadError::Payload(e.to_string()))?;
        if body.len() + chunk.len() > MAX_JSON_BYTES {
            return Err(UploadError::TooLarge);
        }
        body.extend_from_slice(&chunk);
    }
    if body.is_empty() {
        return Err(UploadError::Missing);
    }

    let request: ImagePayload = serde_json::from_slice(&body)?;
    let image = request.image.ok_or(UploadError::Missing)?;
    decode_base64_image(&image)
}

/// Decodes a base64 image, dropping a `data:<mime>;base64,` prefix if present.
pub fn decode_base64_image(encoded: &str) -> Result<Vec<u8>, UploadError> {
    let data = match encoded.split_once(',') {
        Some((_, data)) => data,
        None => encoded,
    };
    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(UploadError::Missing);
    }
    Ok(STANDARD.decode(compact)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_base64_is_decoded() {
        assert_eq!(decode_base64_image("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn data_url_prefix_is_dropped() {
        assert_eq!(
            decode_base64_image("data:image/png;base64,aGVs\nbG8=").unwrap(),
            b"hello"
        );
    }

    #[test]
    fn invalid_base64_is_rejected() {
        assert!(matches!(
            decode_base64_image("data:image/png;base64,@@@"),
            Err(UploadError::Base64(_))
        ));
        assert!(matches!(
            decode_base64_image("data:image/png;base64,"),
            Err(UploadError::Missing)
        ));
    }

    #[test]
    fn upload_errors_are_client_errors() {
        assert_eq!(UploadError::Missing.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(UploadError::TooLarge.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
