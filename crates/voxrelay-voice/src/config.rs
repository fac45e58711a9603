use serde::Deserialize;
use std::fmt;

fn default_generation_model() -> String {
    "gemini-1.5-flash-latest".to_string()
}

fn default_generation_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_generation_timeout_secs() -> u64 {
    30
}

/// Configuration for the text-generation client.
#[derive(Clone, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub api_key: String,

    /// Generation model identifier.
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Service endpoint; overridable for tests.
    #[serde(default = "default_generation_base_url")]
    pub base_url: String,

    /// Per-call timeout in seconds.
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_generation_model(),
            base_url: default_generation_base_url(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_voice_id() -> String {
    // ElevenLabs' stock "Rachel" voice.
    "21m00Tcm4TlvDq8ikWAM".to_string()
}

fn default_synthesis_model() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_synthesis_base_url() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_synthesis_timeout_secs() -> u64 {
    60
}

/// Configuration for the speech-synthesis client.
#[derive(Clone, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default)]
    pub api_key: String,

    /// Voice to synthesize with.
    #[serde(default = "default_voice_id")]
    pub voice_id: String,

    /// Synthesis model identifier.
    #[serde(default = "default_synthesis_model")]
    pub model_id: String,

    /// Service endpoint; overridable for tests.
    #[serde(default = "default_synthesis_base_url")]
    pub base_url: String,

    /// Per-call timeout in seconds, covering the full stream drain.
    #[serde(default = "default_synthesis_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            voice_id: default_voice_id(),
            model_id: default_synthesis_model(),
            base_url: default_synthesis_base_url(),
            timeout_secs: default_synthesis_timeout_secs(),
        }
    }
}

impl fmt::Debug for SynthesisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisConfig")
            .field("api_key", &"[REDACTED]")
            .field("voice_id", &self.voice_id)
            .field("model_id", &self.model_id)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
