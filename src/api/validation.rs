use std::path::Path;

use crate::services::request::ValidationError;

/// Checks one uploaded part and returns the MIME type to forward upstream.
///
/// The extension comes from the filename, or from the MIME type when the
/// filename has none (camera uploads often arrive as `blob`).
pub(crate) fn validate_image_part(
    filename: &str,
    content_type: Option<&str>,
    allowed_extensions: &[String],
) -> Result<String, ValidationError> {
    let mime = content_type.map(|value| value.trim().to_ascii_lowercase()).unwrap_or_default();

    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .or_else(|| extension_for_mime(&mime).map(str::to_string))
        .ok_or_else(|| {
            ValidationError::InvalidImage(format!("File '{filename}' must have an image extension"))
        })?;

    if !allowed_extensions.iter().any(|allowed| allowed == &extension) {
        return Err(ValidationError::InvalidImage(format!(
            "File extension '{extension}' is not allowed"
        )));
    }

    if mime.is_empty() || mime == "application/octet-stream" {
        return Ok(canonical_mime(&extension).to_string());
    }

    if mime_allowed_for_extension(&mime, &extension) {
        Ok(canonical_mime(&extension).to_string())
    } else {
        Err(ValidationError::InvalidImage(format!(
            "MIME type '{mime}' does not match extension '.{extension}'"
        )))
    }
}

fn mime_allowed_for_extension(mime: &str, extension: &str) -> bool {
    match extension {
        "jpg" | "jpeg" => matches!(mime, "image/jpeg" | "image/jpg"),
        "png" => mime == "image/png",
        "webp" => mime == "image/webp",
        "gif" => mime == "image/gif",
        _ => false,
    }
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

fn canonical_mime(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "image/jpeg",
    }
}
