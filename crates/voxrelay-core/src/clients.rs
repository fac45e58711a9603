//! Seams to the two external services.
//!
//! Concrete clients live in `voxrelay-voice`; the orchestrator and the
//! server hold them as `Arc<dyn _>` handles constructed once at startup.
//! Both services are stateless with respect to sessions and safe for
//! concurrent use across connections.

use crate::error::{GenerationError, SynthesisError};
use crate::session::ConversationTurn;
use async_trait::async_trait;
use futures_util::stream::Stream;
use std::pin::Pin;

/// A finite, non-restartable stream of audio byte chunks. Chunks must be
/// concatenated in arrival order to form the complete payload.
pub type AudioChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, SynthesisError>> + Send>>;

/// Produces a conversational reply from an ordered turn history.
///
/// The history already ends with the user's newest utterance; the
/// implementation must preserve its order when building the upstream
/// request.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, history: &[ConversationTurn]) -> Result<String, GenerationError>;
}

/// Renders a text string to speech. The voice/model selection is fixed
/// configuration held by the implementation, not a per-call concern.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<AudioChunkStream, SynthesisError>;
}
