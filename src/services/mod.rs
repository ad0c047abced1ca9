pub(crate) mod deepseek;
pub(crate) mod gemini;
pub(crate) mod grading;
pub(crate) mod ocr;
pub(crate) mod pipeline;
pub(crate) mod prompt;
pub(crate) mod recorder;
pub(crate) mod request;
pub(crate) mod rubric;
pub(crate) mod storage;
