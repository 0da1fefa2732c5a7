//! Google Cloud collaborator clients.
//!
//! The pipeline consumes exactly three managed services, each behind a
//! trait seam so tests can substitute in-memory fakes:
//!
//! | Seam | Google implementation | Endpoint |
//! |------|----------------------|----------|
//! | [`storage::ObjectStore`] | [`storage::GcsClient`] | `storage.googleapis.com` (JSON API) |
//! | [`vision::DocumentOcr`]  | [`vision::VisionOcr`]  | `vision.googleapis.com/v1` |
//! | [`tts::SpeechSynthesizer`] | [`tts::TextToSpeechClient`] | `texttospeech.googleapis.com/v1` |
//!
//! All three share one `reqwest::Client` and one [`auth::TokenProvider`].
//! None of them retries: a transient backend failure fails the
//! invocation, and the hosting environment redelivers the event.

pub mod auth;
pub mod storage;
pub mod tts;
pub mod vision;
