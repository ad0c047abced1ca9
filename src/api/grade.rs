use axum::body::Bytes;
use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::errors::ApiError;
use crate::api::guards::AccessGranted;
use crate::api::validation::validate_image_part;
use crate::core::config::StorageSettings;
use crate::core::metrics;
use crate::core::state::AppState;
use crate::schemas::GradeResponse;
use crate::services::grading::BackendId;
use crate::services::pipeline::GradeReport;
use crate::services::request::{EssayImage, GradeForm, ValidationError};

/// `POST /api/grade`. The access guard runs before the body is read.
pub(crate) async fn grade_essay(
    _access: AccessGranted,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<GradeResponse>, ApiError> {
    let multipart = multipart.map_err(|rejection| {
        metrics::record_grade_request("invalid");
        ApiError::BadRequest(rejection.body_text())
    })?;

    let max_images = state.pipeline().config().max_images;
    let form = read_form(multipart, state.settings().storage(), max_images)
        .await
        .inspect_err(|_| metrics::record_grade_request("invalid"))?;

    let report = state.pipeline().run(form).await?;

    Ok(Json(grade_response(&report)))
}

pub(crate) fn grade_response(report: &GradeReport) -> GradeResponse {
    GradeResponse {
        success: true,
        essay_type: report.essay_type.as_str(),
        ocr_text: report.ocr_text.clone(),
        gemini_result: report.outcomes.gemini.response_text(BackendId::Gemini),
        deepseek_result: report.outcomes.deepseek.response_text(BackendId::DeepSeek),
        duration: (report.duration.as_secs_f64() * 1000.0).round() / 1000.0,
    }
}

async fn read_form(
    mut multipart: Multipart,
    storage: &StorageSettings,
    max_images: usize,
) -> Result<GradeForm, ApiError> {
    let mut form = GradeForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "topic" => form.topic = Some(field.text().await.map_err(multipart_error)?),
            "type" => form.essay_type = Some(field.text().await.map_err(multipart_error)?),
            "file" | "files" => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("page{}", form.images.len() + 1));
                let content_type = field.content_type().map(str::to_string);
                let bytes = read_part(&mut field, &filename, storage).await?;

                // An empty file input still submits a zero-length part.
                if bytes.is_empty() {
                    tracing::debug!(filename = %filename, "Skipping empty file part");
                    continue;
                }

                if form.images.len() >= max_images {
                    return Err(ValidationError::TooManyImages { max: max_images }.into());
                }

                let content_type = validate_image_part(
                    &filename,
                    content_type.as_deref(),
                    &storage.allowed_image_extensions,
                )?;
                form.images.push(EssayImage { filename, content_type, bytes });
            }
            other => return Err(ValidationError::UnexpectedField(other.to_string()).into()),
        }
    }

    Ok(form)
}

async fn read_part(
    field: &mut Field<'_>,
    filename: &str,
    storage: &StorageSettings,
) -> Result<Bytes, ApiError> {
    let max_bytes = storage.max_upload_bytes();
    let mut bytes = Vec::new();

    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        let next_size = bytes.len() as u64 + chunk.len() as u64;
        if next_size > max_bytes {
            return Err(ValidationError::ImageTooLarge {
                filename: filename.to_string(),
                limit_mb: storage.max_upload_size_mb,
            }
            .into());
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(bytes))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("Request body is too large".to_string())
    } else {
        ValidationError::Malformed(err.body_text()).into()
    }
}
