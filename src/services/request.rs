use axum::body::Bytes;
use thiserror::Error;

use crate::services::rubric::{EssayType, EssayTypeMatch};

#[derive(Debug, Clone)]
pub(crate) struct EssayImage {
    pub(crate) filename: String,
    pub(crate) content_type: String,
    pub(crate) bytes: Bytes,
}

/// Raw fields collected from the multipart body, before any shape checks.
#[derive(Debug, Default)]
pub(crate) struct GradeForm {
    pub(crate) topic: Option<String>,
    pub(crate) essay_type: Option<String>,
    pub(crate) images: Vec<EssayImage>,
}

/// One validated submission. Immutable once built.
#[derive(Debug, Clone)]
pub(crate) struct GradingRequest {
    essay_type: EssayType,
    topic: String,
    images: Vec<EssayImage>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ValidationError {
    #[error("Missing file or topic: topic must not be empty")]
    EmptyTopic,
    #[error("Missing file or topic: at least one image is required")]
    NoImages,
    #[error("Too many images: at most {max} are allowed")]
    TooManyImages { max: usize },
    #[error("Unexpected form field '{0}'")]
    UnexpectedField(String),
    #[error("{0}")]
    InvalidImage(String),
    #[error("Image '{filename}' exceeds the {limit_mb}MB limit")]
    ImageTooLarge { filename: String, limit_mb: u64 },
    #[error("Invalid multipart body: {0}")]
    Malformed(String),
}

impl GradingRequest {
    pub(crate) fn from_form(form: GradeForm, max_images: usize) -> Result<Self, ValidationError> {
        let topic = form.topic.map(|topic| topic.trim().to_string()).unwrap_or_default();
        if topic.is_empty() {
            return Err(ValidationError::EmptyTopic);
        }

        if form.images.is_empty() {
            return Err(ValidationError::NoImages);
        }
        if form.images.len() > max_images {
            return Err(ValidationError::TooManyImages { max: max_images });
        }

        let matched = EssayType::classify(form.essay_type.as_deref());
        if matched == EssayTypeMatch::Fallback {
            tracing::warn!(
                submitted = form.essay_type.as_deref().unwrap_or("<missing>"),
                fallback = %EssayType::FALLBACK,
                "Unrecognized essay type; using fallback rubric"
            );
        }
        let essay_type = matched.essay_type();

        Ok(Self { essay_type, topic, images: form.images })
    }

    pub(crate) fn essay_type(&self) -> EssayType {
        self.essay_type
    }

    pub(crate) fn topic(&self) -> &str {
        &self.topic
    }

    pub(crate) fn images(&self) -> &[EssayImage] {
        &self.images
    }
}
