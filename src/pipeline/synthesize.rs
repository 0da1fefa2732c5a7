//! Speech synthesis and upload of the narration artifact.
//!
//! The page texts are joined with a single space into one document
//! string — paragraph and line structure is deliberately lost, since the
//! output targets narration rather than formatting fidelity. The
//! synthesized bytes are staged to a uniquely named scratch file before
//! upload: a fixed scratch path would corrupt output when a container
//! runs two events at once, so each invocation gets its own
//! `NamedTempFile`, removed on every exit path including failures.

use crate::config::PipelineConfig;
use crate::error::Pdf2AudioError;
use crate::event::audio_object_name;
use crate::gcp::storage::ObjectStore;
use crate::gcp::tts::SpeechSynthesizer;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use tracing::{debug, info};

/// Synthesize the page texts and upload the audio next to the source PDF.
///
/// Returns the uploaded object name. A synthesis failure returns before
/// any scratch write or upload happens, so a failed invocation never
/// leaves a partial audio object behind.
pub async fn synthesize_to_bucket(
    storage: &Arc<dyn ObjectStore>,
    tts: &Arc<dyn SpeechSynthesizer>,
    config: &PipelineConfig,
    bucket: &str,
    source_name: &str,
    pages: &[String],
) -> Result<String, Pdf2AudioError> {
    let audio_object = audio_object_name(source_name);
    let text = joined_document_text(pages);
    debug!(
        "Synthesizing {} pages ({} chars) for gs://{}/{}",
        pages.len(),
        text.len(),
        bucket,
        audio_object
    );

    let audio = tts
        .synthesize(&text, &config.language_code, config.audio_encoding)
        .await?;

    let staged = stage_to_scratch(config, &audio)?;
    info!(
        "Staged {} bytes of audio, uploading to gs://{}/{}",
        staged.len(),
        bucket,
        audio_object
    );

    storage
        .upload(
            bucket,
            &audio_object,
            config.audio_encoding.content_type(),
            staged,
        )
        .await?;
    Ok(audio_object)
}

/// Write the audio to an invocation-unique scratch file and read it back.
///
/// The staged copy is what gets uploaded, so a scratch-volume failure
/// surfaces here, before any object is touched. The temp file is deleted
/// when the handle drops.
fn stage_to_scratch(config: &PipelineConfig, audio: &[u8]) -> Result<Vec<u8>, Pdf2AudioError> {
    let dir = config
        .scratch_dir
        .clone()
        .unwrap_or_else(std::env::temp_dir);

    let mut scratch = tempfile::Builder::new()
        .prefix("pdf2audio-")
        .suffix(&format!(".{}", config.audio_encoding.extension()))
        .tempfile_in(dir)
        .map_err(|source| Pdf2AudioError::Scratch { source })?;

    scratch
        .write_all(audio)
        .and_then(|()| scratch.flush())
        .map_err(|source| Pdf2AudioError::Scratch { source })?;
    debug!("Audio staged at {}", scratch.path().display());

    let mut staged = Vec::with_capacity(audio.len());
    scratch
        .as_file_mut()
        .seek(SeekFrom::Start(0))
        .and_then(|_| scratch.as_file_mut().read_to_end(&mut staged))
        .map_err(|source| Pdf2AudioError::Scratch { source })?;
    Ok(staged)
}

/// Single-space join of the page texts, exactly as synthesized.
pub fn joined_document_text(pages: &[String]) -> String {
    pages.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_is_single_space_no_padding() {
        let pages = vec!["Hello world.".to_string(), "Page two text.".to_string()];
        assert_eq!(joined_document_text(&pages), "Hello world. Page two text.");
    }

    #[test]
    fn join_of_single_page_is_identity() {
        let pages = vec!["Only page.".to_string()];
        assert_eq!(joined_document_text(&pages), "Only page.");
    }

    #[test]
    fn join_of_empty_sequence_is_empty() {
        assert_eq!(joined_document_text(&[]), "");
    }

    #[test]
    fn scratch_round_trips_bytes_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::builder()
            .scratch_dir(dir.path())
            .build()
            .unwrap();

        let staged = stage_to_scratch(&config, b"mp3bytes").unwrap();
        assert_eq!(staged, b"mp3bytes");

        // The scratch file must be gone once staging returns.
        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(leftovers.is_empty(), "scratch file leaked: {leftovers:?}");
    }

    #[test]
    fn scratch_failure_on_unwritable_dir() {
        let config = PipelineConfig::builder()
            .scratch_dir("/definitely/not/a/real/dir")
            .build()
            .unwrap();
        let err = stage_to_scratch(&config, b"x").unwrap_err();
        assert!(matches!(err, Pdf2AudioError::Scratch { .. }));
    }
}
