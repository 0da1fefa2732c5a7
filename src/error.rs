//! Error types for the pdf2audio library.
//!
//! There is deliberately a single fatal error enum and no page-level
//! partial-failure type: the pipeline either uploads a complete MP3 or it
//! fails the whole invocation. No stage catches or translates a
//! collaborator's failure — everything bubbles up with `?` to the trigger
//! boundary, where the hosting environment (or the CLI shim) reports it.
//!
//! Two inputs are *not* errors and never appear here: a non-PDF object
//! name (silent skip, see [`crate::pipeline::TriggerOutcome`]) and an
//! object that is momentarily invisible after its create event (retried;
//! only exhaustion becomes [`Pdf2AudioError::ObjectUnavailable`]).

use thiserror::Error;

/// All fatal errors returned by the pdf2audio library.
#[derive(Debug, Error)]
pub enum Pdf2AudioError {
    // ── Input / resolution errors ─────────────────────────────────────────
    /// The triggering object never became visible in the bucket.
    #[error(
        "Object 'gs://{bucket}/{object}' was not visible after {attempts} attempts.\n\
         The create event may reference a deleted object, or storage is unusually slow."
    )]
    ObjectUnavailable {
        bucket: String,
        object: String,
        attempts: u32,
    },

    // ── Auth errors ───────────────────────────────────────────────────────
    /// Could not obtain a bearer token for the Google APIs.
    #[error(
        "Failed to obtain an access token: {detail}\n\
         Outside Google Cloud, set GOOGLE_OAUTH_ACCESS_TOKEN (e.g. from \
         `gcloud auth print-access-token`)."
    )]
    Auth { detail: String },

    // ── Storage errors ────────────────────────────────────────────────────
    /// A Cloud Storage call failed (probe, list, download, or upload).
    #[error("Storage {op} failed for 'gs://{bucket}/{object}': {detail}")]
    Storage {
        op: &'static str,
        bucket: String,
        object: String,
        detail: String,
    },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// Submitting the asynchronous OCR job failed.
    #[error("OCR job submission failed for 'gs://{bucket}/{object}': {detail}")]
    OcrSubmit {
        bucket: String,
        object: String,
        detail: String,
    },

    /// The OCR operation finished in an error state.
    #[error("OCR operation '{operation}' failed: {detail}")]
    OcrFailed { operation: String, detail: String },

    /// The OCR operation did not complete within the configured bound.
    #[error(
        "OCR operation '{operation}' did not complete within {secs}s.\n\
         Large documents may need a higher ocr_timeout."
    )]
    OcrTimeout { operation: String, secs: u64 },

    /// The operation completed but no output shard exists under the prefix.
    #[error("OCR completed but no output shards were found under 'gs://{bucket}/{prefix}'")]
    MissingOcrOutput { bucket: String, prefix: String },

    /// An output shard existed but could not be parsed as an OCR response.
    #[error("OCR output shard 'gs://{bucket}/{object}' is malformed: {detail}")]
    MalformedOcrOutput {
        bucket: String,
        object: String,
        detail: String,
    },

    // ── Synthesis errors ──────────────────────────────────────────────────
    /// The text-to-speech call failed (includes over-length input text,
    /// which the backend rejects and this crate does not pre-chunk).
    #[error("Speech synthesis failed: {detail}")]
    Synthesis { detail: String },

    /// Could not stage the synthesized audio to a local scratch file.
    #[error("Failed to stage audio to scratch file: {source}")]
    Scratch {
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_unavailable_display() {
        let e = Pdf2AudioError::ObjectUnavailable {
            bucket: "b1".into(),
            object: "doc1.pdf".into(),
            attempts: 5,
        };
        let msg = e.to_string();
        assert!(msg.contains("gs://b1/doc1.pdf"), "got: {msg}");
        assert!(msg.contains("5 attempts"), "got: {msg}");
    }

    #[test]
    fn ocr_timeout_display() {
        let e = Pdf2AudioError::OcrTimeout {
            operation: "operations/abc".into(),
            secs: 540,
        };
        assert!(e.to_string().contains("540s"));
        assert!(e.to_string().contains("operations/abc"));
    }

    #[test]
    fn storage_display_names_operation() {
        let e = Pdf2AudioError::Storage {
            op: "upload",
            bucket: "b1".into(),
            object: "doc1.mp3".into(),
            detail: "HTTP 503".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("upload"));
        assert!(msg.contains("gs://b1/doc1.mp3"));
    }

    #[test]
    fn missing_shards_display() {
        let e = Pdf2AudioError::MissingOcrOutput {
            bucket: "b1".into(),
            prefix: "doc1.output-".into(),
        };
        assert!(e.to_string().contains("gs://b1/doc1.output-"));
    }
}
