//! Trigger handling: event filter, source resolution, stage sequencing.
//!
//! One [`Pipeline`] invocation corresponds to one storage event. The
//! handler is synchronous end-to-end from its own point of view: the
//! extractor fully completes before the synthesizer starts, and errors
//! from either stage propagate unchanged to the caller (the hosting
//! environment's failure channel, or the CLI shim).

use crate::config::PipelineConfig;
use crate::error::Pdf2AudioError;
use crate::event::{ObjectFinalizeEvent, StorageObjectRef};
use crate::gcp::auth;
use crate::gcp::storage::{GcsClient, ObjectStore};
use crate::gcp::tts::{SpeechSynthesizer, TextToSpeechClient};
use crate::gcp::vision::{DocumentOcr, VisionOcr};
use crate::pipeline::{extract, synthesize};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info};

/// What one invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The event did not describe a PDF; nothing was called.
    Skipped,
    /// The narration was uploaded.
    Completed {
        /// Name of the uploaded audio object (in the source bucket).
        audio_object: String,
        /// Number of OCR pages that went into the narration.
        pages: usize,
    },
}

/// The assembled pipeline: three collaborator seams plus configuration.
pub struct Pipeline {
    storage: Arc<dyn ObjectStore>,
    ocr: Arc<dyn DocumentOcr>,
    tts: Arc<dyn SpeechSynthesizer>,
    config: PipelineConfig,
}

impl Pipeline {
    /// Build the pipeline against the real Google backends, sharing one
    /// HTTP client and one token source across all three.
    pub fn new(config: PipelineConfig) -> Result<Self, Pdf2AudioError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Pdf2AudioError::Internal(format!("failed to build HTTP client: {e}")))?;
        let tokens = auth::from_env(client.clone());

        Ok(Self {
            storage: Arc::new(GcsClient::new(client.clone(), Arc::clone(&tokens))),
            ocr: Arc::new(VisionOcr::new(client.clone(), Arc::clone(&tokens))),
            tts: Arc::new(TextToSpeechClient::new(client, tokens)),
            config,
        })
    }

    /// Build the pipeline from caller-supplied collaborators. This is how
    /// tests run the full orchestration against in-memory fakes.
    pub fn with_services(
        storage: Arc<dyn ObjectStore>,
        ocr: Arc<dyn DocumentOcr>,
        tts: Arc<dyn SpeechSynthesizer>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            storage,
            ocr,
            tts,
            config,
        }
    }

    /// Handle one object-finalize event.
    ///
    /// Non-PDF names return [`TriggerOutcome::Skipped`] without touching
    /// any backend. Otherwise the source object is resolved (with bounded
    /// backoff for create-event/visibility lag), OCR'd, and narrated.
    pub async fn handle_event(
        &self,
        event: &ObjectFinalizeEvent,
    ) -> Result<TriggerOutcome, Pdf2AudioError> {
        info!("Triggered for gs://{}/{}", event.bucket, event.name);

        if !event.is_pdf() {
            info!("Skipping '{}': not a PDF", event.name);
            return Ok(TriggerOutcome::Skipped);
        }

        let source = event.object_ref();
        self.resolve_source(&source).await?;

        let pages =
            extract::extract_pages(&self.storage, &self.ocr, &self.config, &source).await?;

        let audio_object = synthesize::synthesize_to_bucket(
            &self.storage,
            &self.tts,
            &self.config,
            &source.bucket,
            &source.object,
            &pages,
        )
        .await?;

        info!(
            "Finished: gs://{}/{} → gs://{}/{} ({} pages)",
            source.bucket,
            source.object,
            source.bucket,
            audio_object,
            pages.len()
        );
        Ok(TriggerOutcome::Completed {
            audio_object,
            pages: pages.len(),
        })
    }

    /// Wait for the triggering object to become visible.
    ///
    /// The create event can arrive before the object shows up in reads,
    /// so a miss is retried with doubling backoff up to
    /// `resolve_max_attempts`. Exhaustion is the explicit
    /// [`Pdf2AudioError::ObjectUnavailable`] rather than an indefinite
    /// wait: a genuinely missing object (deleted between event and
    /// invocation) must fail fast, not hang until the host kills the
    /// function.
    async fn resolve_source(&self, source: &StorageObjectRef) -> Result<(), Pdf2AudioError> {
        let mut delay = self.config.resolve_backoff;
        let attempts = self.config.resolve_max_attempts.max(1);

        for attempt in 1..=attempts {
            if self
                .storage
                .object_exists(&source.bucket, &source.object)
                .await?
            {
                debug!("Resolved {} on attempt {}", source.gs_uri(), attempt);
                return Ok(());
            }
            if attempt < attempts {
                debug!(
                    "{} not visible yet (attempt {}/{}), retrying in {:?}",
                    source.gs_uri(),
                    attempt,
                    attempts,
                    delay
                );
                sleep(delay).await;
                delay *= 2;
            }
        }

        Err(Pdf2AudioError::ObjectUnavailable {
            bucket: source.bucket.clone(),
            object: source.object.clone(),
            attempts,
        })
    }
}

/// One-shot convenience: build a [`Pipeline`] against the real backends
/// and handle a single event. This is the function a cloud-function shim
/// (or the CLI binary) calls.
pub async fn run(
    event: &ObjectFinalizeEvent,
    config: PipelineConfig,
) -> Result<TriggerOutcome, Pdf2AudioError> {
    Pipeline::new(config)?.handle_event(event).await
}
