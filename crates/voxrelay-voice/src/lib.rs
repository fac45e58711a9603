//! External-service clients for the voxrelay platform.
//!
//! Concrete implementations of the `voxrelay-core` collaborator traits:
//! a Google Gemini `generateContent` client for text generation and an
//! ElevenLabs text-to-speech client for audio synthesis. Both are
//! constructed once at startup from credential-holding configs and shared
//! across all connections; neither keeps per-session state.

pub mod config;
pub mod generation;
pub mod synthesis;

pub use config::{GenerationConfig, SynthesisConfig};
pub use generation::GeminiClient;
pub use synthesis::ElevenLabsClient;
