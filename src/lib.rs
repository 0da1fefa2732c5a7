//! # pdf2audio
//!
//! Narrate PDF documents stored in Google Cloud Storage as MP3.
//!
//! ## What it does
//!
//! When a PDF lands in a bucket, this pipeline runs Cloud Vision document
//! OCR over it, joins the per-page text into one document string, speaks
//! it through Cloud Text-to-Speech, and writes the audio back next to the
//! source as `{name-without-.pdf}.mp3`. There is no algorithmic core —
//! OCR, synthesis, and durable storage are all managed services — so this
//! crate is the orchestration contract between them: sequencing, the
//! resolution retry, the OCR await bound, and the shard merge.
//!
//! ## Pipeline Overview
//!
//! ```text
//! object-finalize event
//!  │
//!  ├─ 1. Trigger     skip non-PDFs; resolve the object (bounded backoff)
//!  ├─ 2. Extract     async Vision OCR job → await ≤ 540 s → merge shards
//!  ├─ 3. Synthesize  join pages with " " → TTS (en-US, MP3)
//!  └─ 4. Upload      stage to a unique scratch file, write {stem}.mp3
//! ```
//!
//! Each invocation is stateless and strictly sequential; the hosting
//! environment may run invocations concurrently for distinct uploads.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2audio::{run, ObjectFinalizeEvent, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credentials come from the metadata server inside Google Cloud,
//!     // or GOOGLE_OAUTH_ACCESS_TOKEN locally.
//!     let event = ObjectFinalizeEvent::new("my-bucket", "report.pdf");
//!     let outcome = run(&event, PipelineConfig::default()).await?;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2audio` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding the library in a cloud-function shim:
//! ```toml
//! pdf2audio = { version = "0.3", default-features = false }
//! ```
//!
//! ## Failure model
//!
//! All-or-nothing per invocation: any backend failure (OCR submit/await,
//! synthesis, storage I/O) aborts the run with a [`Pdf2AudioError`] and
//! no audio object is written. Non-PDF uploads are a silent
//! [`TriggerOutcome::Skipped`], not an error.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod event;
pub mod gcp;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AudioEncoding, PipelineConfig, PipelineConfigBuilder};
pub use error::Pdf2AudioError;
pub use event::{audio_object_name, ObjectFinalizeEvent, StorageObjectRef};
pub use gcp::storage::ObjectStore;
pub use gcp::tts::SpeechSynthesizer;
pub use gcp::vision::{DocumentOcr, OcrJobSpec, OcrPollState};
pub use pipeline::trigger::run;
pub use pipeline::{Pipeline, TriggerOutcome};
