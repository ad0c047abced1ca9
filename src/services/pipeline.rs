use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::core::config::Settings;
use crate::core::metrics;
use crate::core::time::format_offset;
use crate::services::deepseek::DeepSeekClient;
use crate::services::gemini::GeminiClient;
use crate::services::grading::{
    grade_both, DeepSeekGradingBackend, GeminiGradingBackend, GradingBackend, GradingOutcomes,
};
use crate::services::ocr::{GeminiVisionOcr, OcrExtractor, Transcript};
use crate::services::prompt::build_prompt;
use crate::services::recorder::{SubmissionRecord, SubmissionRecorder};
use crate::services::request::{GradeForm, GradingRequest, ValidationError};
use crate::services::rubric::{select_rubric, EssayType};
use crate::services::storage::{object_key, ImageStore};
use crate::tasks::background::BackgroundTasks;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Received,
    Validated,
    ImagesIngested,
    Transcribed,
    PromptBuilt,
    Graded,
    Responded,
}

impl Stage {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::ImagesIngested => "images_ingested",
            Stage::Transcribed => "transcribed",
            Stage::PromptBuilt => "prompt_built",
            Stage::Graded => "graded",
            Stage::Responded => "responded",
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Object storage is not configured")]
    StorageUnavailable,
    #[error("Failed to store image '{filename}': {reason:#}")]
    Storage { filename: String, reason: anyhow::Error },
    #[error("OCR failed: {0:#}")]
    Ocr(anyhow::Error),
}

impl PipelineError {
    /// The last stage the request reached before failing.
    pub(crate) fn stage(&self) -> Stage {
        match self {
            PipelineError::Validation(_) => Stage::Received,
            PipelineError::StorageUnavailable | PipelineError::Storage { .. } => Stage::Validated,
            PipelineError::Ocr(_) => Stage::ImagesIngested,
        }
    }

    fn metric_label(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "invalid",
            PipelineError::StorageUnavailable | PipelineError::Storage { .. } => "storage_failed",
            PipelineError::Ocr(_) => "ocr_failed",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PipelineConfig {
    pub(crate) max_images: usize,
    pub(crate) key_prefix: String,
    pub(crate) ocr_timeout: Duration,
    pub(crate) grading_timeout: Duration,
}

impl PipelineConfig {
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self {
            max_images: settings.storage().max_images_per_request as usize,
            key_prefix: settings.storage().key_prefix.clone(),
            ocr_timeout: Duration::from_secs(settings.grading().ocr_timeout_seconds),
            grading_timeout: Duration::from_secs(settings.grading().grading_timeout_seconds),
        }
    }
}

/// What the caller gets back. Both outcomes stay separate.
#[derive(Debug, Clone)]
pub(crate) struct GradeReport {
    pub(crate) essay_type: EssayType,
    pub(crate) ocr_text: String,
    pub(crate) outcomes: GradingOutcomes,
    pub(crate) duration: Duration,
}

/// Runs one request through
/// `Received → Validated → ImagesIngested → Transcribed → PromptBuilt → Graded → Responded`.
/// Validation, storage and OCR failures end the request. Grading failures are
/// kept per backend and returned inline. The audit record is handed to the
/// background spawner once the report exists and is never awaited.
pub(crate) struct GradingPipeline {
    ocr: Arc<dyn OcrExtractor>,
    vision: Arc<dyn GradingBackend>,
    reasoning: Arc<dyn GradingBackend>,
    store: Option<Arc<dyn ImageStore>>,
    recorder: Arc<dyn SubmissionRecorder>,
    background: BackgroundTasks,
    config: PipelineConfig,
}

impl GradingPipeline {
    pub(crate) fn new(
        ocr: Arc<dyn OcrExtractor>,
        vision: Arc<dyn GradingBackend>,
        reasoning: Arc<dyn GradingBackend>,
        store: Option<Arc<dyn ImageStore>>,
        recorder: Arc<dyn SubmissionRecorder>,
        background: BackgroundTasks,
        config: PipelineConfig,
    ) -> Self {
        Self { ocr, vision, reasoning, store, recorder, background, config }
    }

    /// Wires the Gemini and DeepSeek HTTP backends from settings.
    pub(crate) fn from_settings(
        settings: &Settings,
        store: Option<Arc<dyn ImageStore>>,
        recorder: Arc<dyn SubmissionRecorder>,
        background: BackgroundTasks,
    ) -> anyhow::Result<Self> {
        let config = PipelineConfig::from_settings(settings);

        let ocr_client = GeminiClient::from_settings(settings, config.ocr_timeout)?;
        let grading_client = GeminiClient::from_settings(settings, config.grading_timeout)?;
        let deepseek_client = DeepSeekClient::from_settings(settings, config.grading_timeout)?;

        let gemini = settings.gemini();
        Ok(Self::new(
            Arc::new(GeminiVisionOcr::new(ocr_client, gemini.ocr_model.clone())),
            Arc::new(GeminiGradingBackend::new(
                grading_client,
                gemini.grading_model.clone(),
                gemini.temperature,
            )),
            Arc::new(DeepSeekGradingBackend::new(deepseek_client)),
            store,
            recorder,
            background,
            config,
        ))
    }

    pub(crate) fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub(crate) fn storage_configured(&self) -> bool {
        self.store.is_some()
    }

    pub(crate) async fn run(&self, form: GradeForm) -> Result<GradeReport, PipelineError> {
        let started = Instant::now();
        let received_at = OffsetDateTime::now_utc();
        let request_id = Uuid::new_v4();

        let result = self.run_stages(form, started, received_at, request_id).await;
        match &result {
            Ok(report) => {
                metrics::record_grade_request("graded");
                tracing::info!(
                    %request_id,
                    received_at = %format_offset(received_at),
                    essay_type = %report.essay_type,
                    gemini_ok = report.outcomes.gemini.is_report(),
                    deepseek_ok = report.outcomes.deepseek.is_report(),
                    duration_seconds = report.duration.as_secs_f64(),
                    "Essay graded"
                );
            }
            Err(err) => {
                metrics::record_grade_request(err.metric_label());
                tracing::warn!(
                    %request_id,
                    stage = err.stage().as_str(),
                    error = %err,
                    "Essay grading request failed"
                );
            }
        }
        result
    }

    async fn run_stages(
        &self,
        form: GradeForm,
        started: Instant,
        received_at: OffsetDateTime,
        request_id: Uuid,
    ) -> Result<GradeReport, PipelineError> {
        advance(request_id, Stage::Received);
        let request = GradingRequest::from_form(form, self.config.max_images)?;
        advance(request_id, Stage::Validated);

        let image_keys = self.ingest_images(&request, received_at, request_id).await?;
        advance(request_id, Stage::ImagesIngested);

        let transcript = self.transcribe(&request).await?;
        advance(request_id, Stage::Transcribed);

        let rubric = select_rubric(request.essay_type());
        let prompt = build_prompt(rubric, request.topic(), transcript.as_str());
        advance(request_id, Stage::PromptBuilt);

        let outcomes = grade_both(
            &prompt,
            self.vision.as_ref(),
            self.reasoning.as_ref(),
            self.config.grading_timeout,
        )
        .await;
        advance(request_id, Stage::Graded);

        let report = GradeReport {
            essay_type: rubric.essay_type,
            ocr_text: transcript.into_string(),
            outcomes,
            duration: started.elapsed(),
        };
        advance(request_id, Stage::Responded);

        self.schedule_record(SubmissionRecord {
            id: request_id,
            recorded_at: OffsetDateTime::now_utc(),
            topic: request.topic().to_string(),
            essay_type: report.essay_type,
            image_keys,
            ocr_text: report.ocr_text.clone(),
            outcomes: report.outcomes.clone(),
            duration_ms: i64::try_from(report.duration.as_millis()).unwrap_or(i64::MAX),
        });

        Ok(report)
    }

    /// Stores every image concurrently. Any failed write fails the request.
    async fn ingest_images(
        &self,
        request: &GradingRequest,
        received_at: OffsetDateTime,
        request_id: Uuid,
    ) -> Result<Vec<String>, PipelineError> {
        let store = self.store.as_ref().ok_or(PipelineError::StorageUnavailable)?;

        let uploads = request.images().iter().enumerate().map(|(index, image)| {
            let key = object_key(
                &self.config.key_prefix,
                received_at,
                request_id,
                index,
                &image.filename,
            );
            async move {
                store.put(&key, &image.content_type, image.bytes.clone()).await.map_err(|err| {
                    PipelineError::Storage { filename: image.filename.clone(), reason: err }
                })
            }
        });

        let stored = try_join_all(uploads).await?;
        for object in &stored {
            tracing::debug!(
                key = %object.key,
                size = object.size,
                sha256 = %object.sha256,
                "Stored essay image"
            );
        }

        Ok(stored.into_iter().map(|object| object.key).collect())
    }

    async fn transcribe(&self, request: &GradingRequest) -> Result<Transcript, PipelineError> {
        let started = Instant::now();
        let result =
            tokio::time::timeout(self.config.ocr_timeout, self.ocr.extract_text(request.images()))
                .await;

        let transcript = match result {
            Ok(Ok(transcript)) => transcript,
            Ok(Err(err)) => {
                metrics::record_ocr(started.elapsed(), "failed");
                return Err(PipelineError::Ocr(err));
            }
            Err(_) => {
                metrics::record_ocr(started.elapsed(), "timeout");
                return Err(PipelineError::Ocr(anyhow::anyhow!(
                    "timed out after {}s",
                    self.config.ocr_timeout.as_secs()
                )));
            }
        };

        metrics::record_ocr(started.elapsed(), if transcript.is_empty() { "empty" } else { "ok" });
        Ok(transcript)
    }

    fn schedule_record(&self, entry: SubmissionRecord) {
        let recorder = self.recorder.clone();
        self.background.spawn("submission_record", async move {
            let id = entry.id;
            match recorder.record(entry).await {
                Ok(()) => {
                    metrics::record_submission("stored");
                    tracing::debug!(%id, "Submission recorded");
                    Ok(())
                }
                Err(err) => {
                    metrics::record_submission("failed");
                    Err(err.context(format!("Failed to record submission {id}")))
                }
            }
        });
    }
}

fn advance(request_id: Uuid, stage: Stage) {
    tracing::debug!(%request_id, stage = stage.as_str(), "Grading stage reached");
}
