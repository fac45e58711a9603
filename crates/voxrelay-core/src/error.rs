use std::time::Duration;
use thiserror::Error;

/// Failures from the text-generation stage of a cycle.
///
/// All variants are terminal for the cycle: the orchestrator converts them
/// into the fixed fallback reply and never surfaces them to the client.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Request(String),

    #[error("generation service returned status {0}")]
    Status(u16),

    #[error("generation service returned a malformed response: {0}")]
    Malformed(String),

    #[error("generation service returned an empty reply")]
    EmptyReply,

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
}

/// Failures from the speech-synthesis stage of a cycle.
///
/// Non-terminal: the orchestrator downgrades the cycle to a text-only reply.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("synthesis request failed: {0}")]
    Request(String),

    #[error("synthesis service returned status {0}")]
    Status(u16),

    #[error("synthesis stream interrupted: {0}")]
    Stream(String),

    #[error("synthesis produced no audio")]
    Empty,

    #[error("synthesis timed out after {0:?}")]
    Timeout(Duration),
}
