//! Pipeline stages for PDF-to-audio conversion.
//!
//! Each submodule implements exactly one stage. The stages are strictly
//! sequential within an invocation — extraction must fully complete
//! before synthesis starts — and hold no state across invocations beyond
//! the objects written to the bucket.
//!
//! ## Data Flow
//!
//! ```text
//! event ──▶ trigger ──▶ extract ──▶ synthesize
//! (GCS)     (filter,    (Vision OCR,  (TTS, scratch
//!            resolve)    shard merge)  stage, upload)
//! ```
//!
//! 1. [`trigger`]    — filter non-PDF events, resolve the source object
//!    with bounded backoff, sequence the two stages
//! 2. [`extract`]    — submit the OCR job, await it under a timeout, and
//!    merge the output shards into per-page text
//! 3. [`synthesize`] — join the pages, synthesize speech, stage the audio
//!    to a unique scratch file, upload the MP3 next to the source

pub mod extract;
pub mod synthesize;
pub mod trigger;

pub use trigger::{Pipeline, TriggerOutcome};
