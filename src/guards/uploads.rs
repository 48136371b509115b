use std::collections::HashMap;

use axum::{
    body::Body,
    extract::{FromRequest, Multipart, Request, multipart::MultipartError},
    http::{StatusCode, header},
    response::IntoResponse,
};

use super::{GuardResult, reject};
use crate::error::AppError;

/// Largest accepted image upload.
pub const MAX_IMAGE_BYTES: usize = 1024 * 1024;

const IMAGE_FIELD: &str = "image";

/// UploadedImage
///
/// The single image file of a multipart submission, held in memory until the
/// handler hands it to object storage.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    /// File extension derived from the MIME subtype (`image/png` -> `png`).
    pub fn extension(&self) -> &str {
        match self.content_type.split_once('/').map(|(_, sub)| sub) {
            Some("jpeg") | Some("jpg") => "jpg",
            Some("svg+xml") => "svg",
            Some(sub) if !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphanumeric()) => sub,
            _ => "bin",
        }
    }
}

/// UploadedForm
///
/// Text fields and optional image collected from a `multipart/form-data` body.
#[derive(Debug, Clone, Default)]
pub struct UploadedForm {
    pub fields: HashMap<String, String>,
    pub image: Option<UploadedImage>,
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Upload is too large".into())
    } else {
        AppError::bad_request(err.body_text())
    }
}

/// Reads a multipart body into an `UploadedForm` extension. Other content
/// types pass through untouched.
pub(super) async fn multer_uploads(request: Request) -> GuardResult {
    if !is_multipart(&request) {
        return Ok(request);
    }

    // The multipart reader only needs the headers and the body stream.
    let (parts, body) = request.into_parts();
    let mut probe = Request::new(body);
    *probe.headers_mut() = parts.headers.clone();

    let mut multipart = Multipart::from_request(probe, &())
        .await
        .map_err(IntoResponse::into_response)?;

    let mut form = UploadedForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| reject(multipart_error(err)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if field.file_name().is_none() {
            let value = field
                .text()
                .await
                .map_err(|err| reject(multipart_error(err)))?;
            form.fields.insert(name, value);
            continue;
        }

        if name != IMAGE_FIELD {
            return Err(reject(AppError::bad_request(format!(
                "Unexpected file field '{name}'"
            ))));
        }
        if form.image.is_some() {
            return Err(reject(AppError::bad_request("Only one image can be uploaded")));
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(reject(AppError::bad_request("Only image uploads are allowed")));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|err| reject(multipart_error(err)))?;
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(reject(AppError::PayloadTooLarge(
                "Image must be at most 1 MiB".into(),
            )));
        }

        form.image = Some(UploadedImage {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    tracing::debug!(
        fields = form.fields.len(),
        has_image = form.image.is_some(),
        "multipart form collected"
    );

    let mut request = Request::from_parts(parts, Body::empty());
    request.extensions_mut().insert(form);
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(content_type: &str) -> UploadedImage {
        UploadedImage {
            file_name: None,
            content_type: content_type.into(),
            bytes: Vec::new(),
        }
    }

    #[test]
    fn extension_follows_mime_subtype() {
        assert_eq!(image("image/png").extension(), "png");
        assert_eq!(image("image/jpeg").extension(), "jpg");
        assert_eq!(image("image/svg+xml").extension(), "svg");
        assert_eq!(image("image/../x").extension(), "bin");
    }
}
