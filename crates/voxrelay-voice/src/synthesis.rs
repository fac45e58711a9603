//! ElevenLabs text-to-speech client.

use crate::config::SynthesisConfig;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::json;
use voxrelay_core::{AudioChunkStream, SpeechSynthesizer, SynthesisError};

/// Speech-synthesis client for the ElevenLabs REST API.
///
/// The response body is exposed as a chunk stream; the orchestrator drains
/// it into one contiguous MPEG buffer. Each call gets its own stream, so
/// concurrent sessions never interleave chunks.
pub struct ElevenLabsClient {
    http: reqwest::Client,
    config: SynthesisConfig,
}

impl ElevenLabsClient {
    pub fn new(config: SynthesisConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}",
            self.config.base_url, self.config.voice_id
        )
    }
}

fn request_body(text: &str, model_id: &str) -> serde_json::Value {
    json!({
        "text": text,
        "model_id": model_id,
    })
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str) -> Result<AudioChunkStream, SynthesisError> {
        let response = self
            .http
            .post(self.endpoint())
            .header("xi-api-key", &self.config.api_key)
            .header("accept", "audio/mpeg")
            .json(&request_body(text, &self.config.model_id))
            .send()
            .await
            .map_err(|e| SynthesisError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "synthesis service error");
            return Err(SynthesisError::Status(status.as_u16()));
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| match chunk {
                Ok(bytes) => Ok(bytes.to_vec()),
                Err(e) => Err(SynthesisError::Stream(e.to_string())),
            });
        Ok(Box::pin(stream))
    }
}
