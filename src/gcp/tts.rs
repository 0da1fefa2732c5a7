//! Cloud Text-to-Speech collaborator.
//!
//! One synchronous call: document text in, binary audio out. The REST API
//! returns the audio as base64 `audioContent`; decoding happens here so
//! the rest of the pipeline only ever sees bytes.

use crate::config::AudioEncoding;
use crate::error::Pdf2AudioError;
use crate::gcp::auth::TokenProvider;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const TTS_ENDPOINT: &str = "https://texttospeech.googleapis.com/v1";

/// The synthesis operation the pipeline consumes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with the backend's default voice for
    /// `language_code`, returning the raw audio bytes.
    async fn synthesize(
        &self,
        text: &str,
        language_code: &str,
        encoding: AudioEncoding,
    ) -> Result<Vec<u8>, Pdf2AudioError>;
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelectionParams<'a>,
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

/// Only the locale is selected; no voice name, gender, or rate — the
/// backend picks its default voice for the locale.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelectionParams<'a> {
    language_code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

fn request_body<'a>(
    text: &'a str,
    language_code: &'a str,
    encoding: AudioEncoding,
) -> SynthesizeRequest<'a> {
    SynthesizeRequest {
        input: SynthesisInput { text },
        voice: VoiceSelectionParams { language_code },
        audio_config: AudioConfig {
            audio_encoding: encoding.api_name(),
        },
    }
}

// ── Google implementation ────────────────────────────────────────────────

/// Text-to-Speech REST client.
pub struct TextToSpeechClient {
    client: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    endpoint: String,
}

impl TextToSpeechClient {
    pub fn new(client: reqwest::Client, tokens: Arc<dyn TokenProvider>) -> Self {
        Self::with_endpoint(client, tokens, TTS_ENDPOINT)
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
impl SpeechSynthesizer for TextToSpeechClient {
    async fn synthesize(
        &self,
        text: &str,
        language_code: &str,
        encoding: AudioEncoding,
    ) -> Result<Vec<u8>, Pdf2AudioError> {
        let body = request_body(text, language_code, encoding);
        let synth_err = |detail: String| Pdf2AudioError::Synthesis { detail };

        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .post(format!("{}/text:synthesize", self.endpoint))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| synth_err(e.to_string()))?;

        if !response.status().is_success() {
            // The body carries the useful part for over-length text
            // ("input size limit exceeded") and bad locales.
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(synth_err(format!("HTTP {status}: {text}")));
        }

        let parsed: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| synth_err(format!("malformed response: {e}")))?;

        let audio = base64::engine::general_purpose::STANDARD
            .decode(&parsed.audio_content)
            .map_err(|e| synth_err(format!("audioContent is not valid base64: {e}")))?;

        debug!(
            "Synthesized {} chars of text into {} bytes of {}",
            text.len(),
            audio.len(),
            encoding.api_name()
        );
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_matches_rest_shape() {
        let body = serde_json::to_value(request_body(
            "Hello world.",
            "en-US",
            AudioEncoding::Mp3,
        ))
        .unwrap();
        assert_eq!(
            body,
            json!({
                "input": { "text": "Hello world." },
                "voice": { "languageCode": "en-US" },
                "audioConfig": { "audioEncoding": "MP3" }
            })
        );
    }

    #[test]
    fn audio_content_decodes_from_base64() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"mp3bytes");
        let parsed: SynthesizeResponse =
            serde_json::from_value(json!({ "audioContent": encoded })).unwrap();
        let audio = base64::engine::general_purpose::STANDARD
            .decode(parsed.audio_content)
            .unwrap();
        assert_eq!(audio, b"mp3bytes");
    }
}
