use anyhow::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};

use crate::services::gemini::GeminiClient;
use crate::services::request::EssayImage;

pub(crate) const OCR_INSTRUCTION: &str = "Role: OCR Tool. Task: Transcribe the handwritten English \
essay in the following image(s) exactly as it appears. Do not correct grammar or spelling. Do not \
explain or add commentary. The images are consecutive photos of one essay: merge them, in the \
order given, into a single continuous transcript without repeating lines that appear on two \
photos. Output only the transcript text.";

/// Merged handwritten text of every image in one request. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Transcript(String);

impl Transcript {
    pub(crate) fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub(crate) fn into_string(self) -> String {
        self.0
    }
}

#[async_trait]
pub(crate) trait OcrExtractor: Send + Sync {
    /// Exactly one upstream call per invocation, however many images.
    async fn extract_text(&self, images: &[EssayImage]) -> Result<Transcript>;
}

#[derive(Debug, Clone)]
pub(crate) struct GeminiVisionOcr {
    client: GeminiClient,
    model: String,
}

impl GeminiVisionOcr {
    pub(crate) fn new(client: GeminiClient, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl OcrExtractor for GeminiVisionOcr {
    async fn extract_text(&self, images: &[EssayImage]) -> Result<Transcript> {
        let parts = build_ocr_parts(images);
        let text = self.client.generate(&self.model, parts, Some(0.0)).await?;

        match text {
            Some(text) => Ok(Transcript::new(text)),
            None => {
                tracing::warn!(
                    images = images.len(),
                    "OCR returned no text; continuing with empty transcript"
                );
                Ok(Transcript::default())
            }
        }
    }
}

/// Instruction first, then every image inline in submission order.
pub(crate) fn build_ocr_parts(images: &[EssayImage]) -> Vec<Value> {
    let mut parts = Vec::with_capacity(images.len() + 1);
    parts.push(json!({ "text": OCR_INSTRUCTION }));
    for image in images {
        parts.push(json!({
            "inline_data": {
                "mime_type": image.content_type,
                "data": STANDARD.encode(&image.bytes),
            }
        }));
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    fn image(content_type: &str, bytes: &'static [u8]) -> EssayImage {
        EssayImage {
            filename: "page.jpg".to_string(),
            content_type: content_type.to_string(),
            bytes: Bytes::from_static(bytes),
        }
    }

    #[test]
    fn parts_keep_instruction_first_and_image_order() {
        let images = vec![image("image/jpeg", b"first"), image("image/png", b"second")];
        let parts = build_ocr_parts(&images);

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["text"], OCR_INSTRUCTION);
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(parts[1]["inline_data"]["data"], STANDARD.encode(b"first"));
        assert_eq!(parts[2]["inline_data"]["mime_type"], "image/png");
        assert_eq!(parts[2]["inline_data"]["data"], STANDARD.encode(b"second"));
    }

    #[test]
    fn instruction_forbids_correction_and_asks_to_merge() {
        assert!(OCR_INSTRUCTION.contains("Do not correct grammar"));
        assert!(OCR_INSTRUCTION.contains("Do not explain"));
        assert!(OCR_INSTRUCTION.contains("merge"));
    }

    #[test]
    fn blank_transcript_counts_as_empty() {
        assert!(Transcript::default().is_empty());
        assert!(Transcript::new(" \n").is_empty());
        assert!(!Transcript::new("Dear Peter").is_empty());
    }
}
