//! Conversation orchestration for the voxrelay platform.
//!
//! Turns one inbound user utterance into one outbound (text, audio) pair
//! while preserving conversational context. Each connected client owns a
//! [`ConversationSession`] holding the ordered turn history; the
//! [`PipelineOrchestrator`] runs the two-stage cycle against it: a text
//! generation call, then a speech synthesis call whose chunk stream is
//! drained into a single audio buffer.
//!
//! The two upstream services are reached through the [`TextGenerator`] and
//! [`SpeechSynthesizer`] traits so the transport clients (and test fakes)
//! live outside this crate. Failure handling is asymmetric: a generation
//! failure ends the cycle with a fixed fallback reply, a synthesis failure
//! only downgrades the reply to text-only.

pub mod clients;
pub mod error;
pub mod pipeline;
pub mod session;

pub use clients::{AudioChunkStream, SpeechSynthesizer, TextGenerator};
pub use error::{GenerationError, SynthesisError};
pub use pipeline::{
    PipelineOrchestrator, PipelineRequest, PipelineResult, PipelineTimeouts, FALLBACK_REPLY,
};
pub use session::{ConversationSession, ConversationTurn, Priming, Role};
