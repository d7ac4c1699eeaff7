//! Speech-to-text against the OpenAI transcription API.

use crate::config::OpenAiConfig;
use crate::engine::Transcriber;
use crate::error::VoiceError;
use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;

/// Response body of `POST /audio/transcriptions`.
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

/// Transcribes one turn of WAV-framed audio via a multipart upload.
#[derive(Debug, Clone)]
pub struct OpenAiTranscriber {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiTranscriber {
    pub fn new(client: reqwest::Client, config: &OpenAiConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            model: config.stt_model.clone(),
        }
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String, VoiceError> {
        let file = multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        let form = multipart::Form::new()
            .text("model", self.model.clone())
            .part("file", file);

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.api_base))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VoiceError::Stt(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Stt(format!(
                "transcription API returned {}: {}",
                status, body
            )));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        Ok(parsed.text.trim().to_string())
    }
}
