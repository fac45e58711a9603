//! Google Gemini `generateContent` client.

use crate::config::GenerationConfig;
use async_trait::async_trait;
use serde_json::{json, Value};
use voxrelay_core::{ConversationTurn, GenerationError, Role, TextGenerator};

/// Text-generation client for the Gemini REST API.
///
/// Stateless with respect to sessions: the full turn history arrives with
/// every call, so one client instance serves all connections concurrently.
pub struct GeminiClient {
    http: reqwest::Client,
    config: GenerationConfig,
}

impl GeminiClient {
    pub fn new(config: GenerationConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }
}

/// Maps a turn history onto the Gemini `contents` request shape, preserving
/// order.
fn request_body(history: &[ConversationTurn]) -> Value {
    let contents: Vec<Value> = history
        .iter()
        .map(|turn| {
            json!({
                "role": match turn.role {
                    Role::User => "user",
                    Role::Model => "model",
                },
                "parts": [{ "text": turn.text }],
            })
        })
        .collect();
    json!({ "contents": contents })
}

/// Pulls the reply text out of a `generateContent` response: all `text`
/// parts of the first candidate, concatenated.
fn extract_reply(response: &Value) -> Result<String, GenerationError> {
    let parts = response
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| {
            GenerationError::Malformed("response has no candidates[0].content.parts".to_string())
        })?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.trim().is_empty() {
        return Err(GenerationError::EmptyReply);
    }
    Ok(text)
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, history: &[ConversationTurn]) -> Result<String, GenerationError> {
        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request_body(history))
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "generation service error");
            return Err(GenerationError::Status(status.as_u16()));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        extract_reply(&payload)
    }
}
