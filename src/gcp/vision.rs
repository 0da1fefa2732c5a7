//! Cloud Vision collaborator: asynchronous document OCR.
//!
//! The pipeline submits one `files:asyncBatchAnnotate` job per PDF and
//! polls the returned long-running operation. Vision writes its results
//! to Cloud Storage itself (as JSON shards under the job's destination
//! prefix), so the [`DocumentOcr`] seam only covers submit and poll — the
//! shards come back through [`crate::gcp::storage::ObjectStore`].
//!
//! Wire types are hand-written serde structs for exactly the fields this
//! pipeline reads; everything else in the (large) Vision response is
//! ignored on deserialize.

use crate::config::PipelineConfig;
use crate::error::Pdf2AudioError;
use crate::event::{ocr_output_prefix, StorageObjectRef};
use crate::gcp::auth::TokenProvider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1";

/// Only supported document mime type for this pipeline.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Vision feature that returns dense per-page text.
const DOCUMENT_TEXT_DETECTION: &str = "DOCUMENT_TEXT_DETECTION";

/// One OCR job, built once per invocation and consumed by `submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrJobSpec {
    /// The source PDF.
    pub source: StorageObjectRef,
    /// `gs://` prefix Vision writes output shards under.
    pub destination_uri: String,
    /// Pages per output shard.
    pub batch_size: u32,
}

impl OcrJobSpec {
    /// Build the job for a resolved source object: input
    /// `gs://{bucket}/{object}` as `application/pdf`, output shards under
    /// `gs://{bucket}/{stem}.` in the same bucket.
    pub fn for_source(source: &StorageObjectRef, config: &PipelineConfig) -> Self {
        let destination_uri = format!(
            "gs://{}/{}",
            source.bucket,
            ocr_output_prefix(&source.object)
        );
        Self {
            source: source.clone(),
            destination_uri,
            batch_size: config.ocr_batch_size,
        }
    }

    /// The object-name prefix (within the source bucket) the shards land
    /// under, for listing them back.
    pub fn output_object_prefix(&self) -> String {
        ocr_output_prefix(&self.source.object)
    }
}

/// State of a submitted OCR operation, as seen by one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrPollState {
    /// Not done yet; poll again.
    Running,
    /// Finished; output shards are in place.
    Done,
}

/// The OCR operations the pipeline consumes.
#[async_trait]
pub trait DocumentOcr: Send + Sync {
    /// Submit the job; returns the operation name to poll.
    async fn submit(&self, job: &OcrJobSpec) -> Result<String, Pdf2AudioError>;

    /// One poll of the operation. An operation that completed with an
    /// error reports `Err(OcrFailed)`, not `Done`.
    async fn poll(&self, operation: &str) -> Result<OcrPollState, Pdf2AudioError>;
}

// ── Request wire types ───────────────────────────────────────────────────

#[derive(Serialize)]
struct AsyncBatchAnnotateRequest<'a> {
    requests: [AnnotateFileRequest<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateFileRequest<'a> {
    input_config: InputConfig<'a>,
    features: [Feature; 1],
    output_config: OutputConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InputConfig<'a> {
    gcs_source: GcsUri<'a>,
    mime_type: &'a str,
}

#[derive(Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputConfig<'a> {
    gcs_destination: GcsUri<'a>,
    batch_size: u32,
}

#[derive(Serialize)]
struct GcsUri<'a> {
    uri: &'a str,
}

fn request_body<'a>(job: &'a OcrJobSpec, source_uri: &'a str) -> AsyncBatchAnnotateRequest<'a> {
    AsyncBatchAnnotateRequest {
        requests: [AnnotateFileRequest {
            input_config: InputConfig {
                gcs_source: GcsUri { uri: source_uri },
                mime_type: PDF_MIME_TYPE,
            },
            features: [Feature {
                kind: DOCUMENT_TEXT_DETECTION,
            }],
            output_config: OutputConfig {
                gcs_destination: GcsUri {
                    uri: &job.destination_uri,
                },
                batch_size: job.batch_size,
            },
        }],
    }
}

// ── Response wire types ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct OperationRef {
    name: String,
}

#[derive(Deserialize)]
struct Operation {
    #[serde(default)]
    done: bool,
    error: Option<OperationStatus>,
}

#[derive(Deserialize)]
struct OperationStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// One output shard, as Vision writes it to the destination prefix.
///
/// Public because the extractor parses downloaded shards with it.
#[derive(Debug, Deserialize)]
pub struct AnnotateFileResponse {
    #[serde(default)]
    pub responses: Vec<PageResponse>,
}

/// Per-page entry inside a shard, in physical page order.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub full_text_annotation: Option<FullTextAnnotation>,
    pub context: Option<PageContext>,
}

#[derive(Debug, Deserialize)]
pub struct FullTextAnnotation {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    pub page_number: Option<u32>,
}

// ── Google implementation ────────────────────────────────────────────────

/// Vision REST client.
pub struct VisionOcr {
    client: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    endpoint: String,
}

impl VisionOcr {
    pub fn new(client: reqwest::Client, tokens: Arc<dyn TokenProvider>) -> Self {
        Self::with_endpoint(client, tokens, VISION_ENDPOINT)
    }

    /// Test hook: point at a non-default API base.
    pub fn with_endpoint(
        client: reqwest::Client,
        tokens: Arc<dyn TokenProvider>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client,
            tokens,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl DocumentOcr for VisionOcr {
    async fn submit(&self, job: &OcrJobSpec) -> Result<String, Pdf2AudioError> {
        let source_uri = job.source.gs_uri();
        let body = request_body(job, &source_uri);
        let submit_err = |detail: String| Pdf2AudioError::OcrSubmit {
            bucket: job.source.bucket.clone(),
            object: job.source.object.clone(),
            detail,
        };

        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .post(format!("{}/files:asyncBatchAnnotate", self.endpoint))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| submit_err(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(submit_err(format!("HTTP {status}: {text}")));
        }

        let operation: OperationRef = response
            .json()
            .await
            .map_err(|e| submit_err(format!("malformed operation reference: {e}")))?;

        debug!(
            "Submitted OCR job for {} as operation '{}'",
            source_uri, operation.name
        );
        Ok(operation.name)
    }

    async fn poll(&self, operation: &str) -> Result<OcrPollState, Pdf2AudioError> {
        let failed = |detail: String| Pdf2AudioError::OcrFailed {
            operation: operation.to_string(),
            detail,
        };

        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .get(format!("{}/{}", self.endpoint, operation))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let op: Operation = response
            .json()
            .await
            .map_err(|e| failed(format!("malformed operation: {e}")))?;

        if let Some(status) = op.error {
            return Err(failed(format!(
                "code {}: {}",
                status.code, status.message
            )));
        }
        Ok(if op.done {
            OcrPollState::Done
        } else {
            OcrPollState::Running
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job() -> OcrJobSpec {
        let source = StorageObjectRef {
            bucket: "b1".into(),
            object: "doc1.pdf".into(),
        };
        OcrJobSpec::for_source(&source, &PipelineConfig::default())
    }

    #[test]
    fn job_spec_derives_destination_prefix() {
        let job = job();
        assert_eq!(job.destination_uri, "gs://b1/doc1.");
        assert_eq!(job.output_object_prefix(), "doc1.");
        assert_eq!(job.batch_size, 100);
    }

    #[test]
    fn request_body_matches_rest_shape() {
        let job = job();
        let uri = job.source.gs_uri();
        let body = serde_json::to_value(request_body(&job, &uri)).unwrap();
        assert_eq!(
            body,
            json!({
                "requests": [{
                    "inputConfig": {
                        "gcsSource": { "uri": "gs://b1/doc1.pdf" },
                        "mimeType": "application/pdf"
                    },
                    "features": [{ "type": "DOCUMENT_TEXT_DETECTION" }],
                    "outputConfig": {
                        "gcsDestination": { "uri": "gs://b1/doc1." },
                        "batchSize": 100
                    }
                }]
            })
        );
    }

    #[test]
    fn shard_parses_pages_in_order() {
        let shard = json!({
            "inputConfig": { "gcsSource": { "uri": "gs://b1/doc1.pdf" } },
            "responses": [
                {
                    "fullTextAnnotation": { "text": "Hello world." },
                    "context": { "uri": "gs://b1/doc1.pdf", "pageNumber": 1 }
                },
                {
                    "fullTextAnnotation": { "text": "Page two text." },
                    "context": { "uri": "gs://b1/doc1.pdf", "pageNumber": 2 }
                }
            ]
        });
        let parsed: AnnotateFileResponse = serde_json::from_value(shard).unwrap();
        assert_eq!(parsed.responses.len(), 2);
        assert_eq!(
            parsed.responses[0]
                .full_text_annotation
                .as_ref()
                .unwrap()
                .text,
            "Hello world."
        );
        assert_eq!(parsed.responses[1].context.as_ref().unwrap().page_number, Some(2));
    }

    #[test]
    fn shard_page_without_annotation_is_allowed() {
        // A blank page can come back with no fullTextAnnotation at all.
        let parsed: AnnotateFileResponse =
            serde_json::from_value(json!({ "responses": [{}] })).unwrap();
        assert!(parsed.responses[0].full_text_annotation.is_none());
    }

    #[test]
    fn operation_error_state_deserializes() {
        let op: Operation = serde_json::from_value(json!({
            "name": "operations/abc",
            "done": true,
            "error": { "code": 13, "message": "internal" }
        }))
        .unwrap();
        assert!(op.done);
        assert_eq!(op.error.as_ref().unwrap().code, 13);
    }
}
