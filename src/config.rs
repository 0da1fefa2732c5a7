//! Configuration for the PDF-to-audio pipeline.
//!
//! Every knob lives in one [`PipelineConfig`] built via its builder, so a
//! whole invocation's behaviour can be logged, shared, and diffed in one
//! place. Defaults: `en-US` narration, MP3 output, 100-page OCR shards,
//! and a 540-second OCR bound (inside a cloud function's 9-minute cap).

use crate::error::Pdf2AudioError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Audio container/codec requested from the speech backend.
///
/// The wire value is the Text-to-Speech `AudioEncoding` enum name; the
/// extension only matters for scratch-file naming (the uploaded object is
/// always named `{stem}.mp3`, see [`crate::event::audio_object_name`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AudioEncoding {
    /// MPEG audio layer III (default).
    #[default]
    Mp3,
    /// Ogg-wrapped Opus.
    OggOpus,
    /// Uncompressed 16-bit PCM in a WAV container.
    Linear16,
}

impl AudioEncoding {
    /// Name used in the `audioConfig.audioEncoding` request field.
    pub fn api_name(self) -> &'static str {
        match self {
            AudioEncoding::Mp3 => "MP3",
            AudioEncoding::OggOpus => "OGG_OPUS",
            AudioEncoding::Linear16 => "LINEAR16",
        }
    }

    /// File extension for the local scratch file.
    pub fn extension(self) -> &'static str {
        match self {
            AudioEncoding::Mp3 => "mp3",
            AudioEncoding::OggOpus => "ogg",
            AudioEncoding::Linear16 => "wav",
        }
    }

    /// Content type set on the uploaded object.
    pub fn content_type(self) -> &'static str {
        match self {
            AudioEncoding::Mp3 => "audio/mpeg",
            AudioEncoding::OggOpus => "audio/ogg",
            AudioEncoding::Linear16 => "audio/wav",
        }
    }
}

/// Configuration for one pipeline invocation.
///
/// Built via [`PipelineConfig::builder()`] or [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2audio::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .language_code("en-GB")
///     .ocr_timeout_secs(900)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// BCP-47 voice locale passed to speech synthesis. Default: `en-US`.
    ///
    /// Only the locale is selected — no voice name, gender, or speaking
    /// rate — so the backend picks its default voice for the locale.
    pub language_code: String,

    /// Requested audio encoding. Default: [`AudioEncoding::Mp3`].
    pub audio_encoding: AudioEncoding,

    /// Pages per OCR output shard. Default: 100.
    ///
    /// Documents longer than one batch produce multiple shards; the
    /// extractor lists and merges all of them in page order.
    pub ocr_batch_size: u32,

    /// Upper bound on the OCR operation await. Default: 540 s.
    ///
    /// Chosen to fit inside a cloud function's 9-minute invocation limit.
    /// Exceeding it fails the invocation; synthesis is never attempted.
    pub ocr_timeout: Duration,

    /// Interval between OCR operation polls. Default: 5 s.
    pub ocr_poll_interval: Duration,

    /// Existence-probe attempts before giving up on the triggering object.
    /// Default: 5.
    ///
    /// The create event can outrun object visibility, so the first probe
    /// legitimately misses. The retry is bounded: a genuinely missing
    /// object (deleted between event and invocation) must fail fast
    /// instead of hanging until the host kills the function.
    pub resolve_max_attempts: u32,

    /// Initial delay between existence probes, doubled after each miss.
    /// Default: 1 s (so 5 attempts wait 1+2+4+8 s in total).
    pub resolve_backoff: Duration,

    /// Directory for the scratch audio file. Default: the system temp dir.
    ///
    /// The file itself is uniquely named per invocation and removed on
    /// every exit path, so concurrent invocations in one container never
    /// collide.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            language_code: "en-US".to_string(),
            audio_encoding: AudioEncoding::Mp3,
            ocr_batch_size: 100,
            ocr_timeout: Duration::from_secs(540),
            ocr_poll_interval: Duration::from_secs(5),
            resolve_max_attempts: 5,
            resolve_backoff: Duration::from_secs(1),
            scratch_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn language_code(mut self, code: impl Into<String>) -> Self {
        self.config.language_code = code.into();
        self
    }

    pub fn audio_encoding(mut self, encoding: AudioEncoding) -> Self {
        self.config.audio_encoding = encoding;
        self
    }

    pub fn ocr_batch_size(mut self, pages: u32) -> Self {
        self.config.ocr_batch_size = pages;
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout = Duration::from_secs(secs);
        self
    }

    pub fn ocr_poll_interval_secs(mut self, secs: u64) -> Self {
        self.config.ocr_poll_interval = Duration::from_secs(secs.max(1));
        self
    }

    pub fn resolve_max_attempts(mut self, n: u32) -> Self {
        self.config.resolve_max_attempts = n.max(1);
        self
    }

    pub fn resolve_backoff_ms(mut self, ms: u64) -> Self {
        self.config.resolve_backoff = Duration::from_millis(ms);
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, Pdf2AudioError> {
        let c = &self.config;
        if c.language_code.is_empty() {
            return Err(Pdf2AudioError::InvalidConfig(
                "language_code must not be empty".into(),
            ));
        }
        if c.ocr_batch_size == 0 {
            return Err(Pdf2AudioError::InvalidConfig(
                "ocr_batch_size must be ≥ 1".into(),
            ));
        }
        if c.ocr_timeout < c.ocr_poll_interval {
            return Err(Pdf2AudioError::InvalidConfig(format!(
                "ocr_timeout ({:?}) must be at least ocr_poll_interval ({:?})",
                c.ocr_timeout, c.ocr_poll_interval
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = PipelineConfig::default();
        assert_eq!(c.language_code, "en-US");
        assert_eq!(c.audio_encoding, AudioEncoding::Mp3);
        assert_eq!(c.ocr_batch_size, 100);
        assert_eq!(c.ocr_timeout, Duration::from_secs(540));
        assert_eq!(c.resolve_backoff, Duration::from_secs(1));
    }

    #[test]
    fn builder_rejects_empty_locale() {
        let err = PipelineConfig::builder().language_code("").build();
        assert!(matches!(err, Err(Pdf2AudioError::InvalidConfig(_))));
    }

    #[test]
    fn builder_rejects_zero_batch() {
        let err = PipelineConfig::builder().ocr_batch_size(0).build();
        assert!(matches!(err, Err(Pdf2AudioError::InvalidConfig(_))));
    }

    #[test]
    fn builder_rejects_timeout_below_poll_interval() {
        let err = PipelineConfig::builder()
            .ocr_timeout_secs(2)
            .ocr_poll_interval_secs(5)
            .build();
        assert!(matches!(err, Err(Pdf2AudioError::InvalidConfig(_))));
    }

    #[test]
    fn encoding_wire_names() {
        assert_eq!(AudioEncoding::Mp3.api_name(), "MP3");
        assert_eq!(AudioEncoding::OggOpus.api_name(), "OGG_OPUS");
        assert_eq!(AudioEncoding::Mp3.content_type(), "audio/mpeg");
        assert_eq!(AudioEncoding::Linear16.extension(), "wav");
    }
}
