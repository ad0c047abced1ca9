use std::collections::HashMap;

use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

/// Body of a successful `POST /api/grade`. Each backend keeps its own field.
#[derive(Debug, Serialize)]
pub(crate) struct GradeResponse {
    pub(crate) success: bool,
    pub(crate) essay_type: &'static str,
    pub(crate) ocr_text: String,
    pub(crate) gemini_result: String,
    pub(crate) deepseek_result: String,
    /// Wall-clock seconds from receipt to response.
    pub(crate) duration: f64,
}
