//! The per-utterance orchestration cycle.
//!
//! One cycle moves through `Idle → GeneratingText → SynthesizingAudio →
//! Delivering → Done`, with `Failed` terminal from `GeneratingText` only.
//! Synthesis failure never fails a cycle; it downgrades the result to
//! text-only.

use crate::clients::{AudioChunkStream, SpeechSynthesizer, TextGenerator};
use crate::error::{GenerationError, SynthesisError};
use crate::session::ConversationSession;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Reply sent when the generation stage fails. The client sees this instead
/// of a raw error; it is never recorded as a model turn.
pub const FALLBACK_REPLY: &str =
    "I'm sorry, but I'm having a little trouble thinking right now. Could you try that again?";

/// Input to one orchestration cycle.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub utterance: String,
}

/// Outcome of one cycle. `audio` is present only when synthesis succeeded;
/// its absence is a valid text-only reply, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    pub text: String,
    pub audio: Option<Vec<u8>>,
}

/// Upper bounds on the two external calls. Expiry is treated identically to
/// a client-reported failure for that stage.
#[derive(Debug, Clone, Copy)]
pub struct PipelineTimeouts {
    pub generation: Duration,
    pub synthesis: Duration,
}

impl Default for PipelineTimeouts {
    fn default() -> Self {
        Self {
            generation: Duration::from_secs(30),
            synthesis: Duration::from_secs(60),
        }
    }
}

/// States of one orchestration cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleState {
    Idle,
    GeneratingText,
    SynthesizingAudio,
    Delivering,
    Done,
    Failed,
}

impl CycleState {
    fn as_str(self) -> &'static str {
        match self {
            CycleState::Idle => "idle",
            CycleState::GeneratingText => "generating_text",
            CycleState::SynthesizingAudio => "synthesizing_audio",
            CycleState::Delivering => "delivering",
            CycleState::Done => "done",
            CycleState::Failed => "failed",
        }
    }
}

/// Executes utterance-to-reply cycles against a session.
///
/// Holds process-wide service handles; one orchestrator instance serves all
/// connections. Callers must not run two cycles concurrently for the same
/// session — the gateway guarantees this by driving each connection from a
/// single receive loop.
pub struct PipelineOrchestrator {
    generator: Arc<dyn TextGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    timeouts: PipelineTimeouts,
}

impl PipelineOrchestrator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        timeouts: PipelineTimeouts,
    ) -> Self {
        Self {
            generator,
            synthesizer,
            timeouts,
        }
    }

    /// Runs one cycle. Returns `None` when the utterance is empty after
    /// trimming (rejected before any external call, no reply owed);
    /// otherwise always returns a result to deliver — the fallback reply on
    /// generation failure.
    pub async fn run_cycle(
        &self,
        session: &mut ConversationSession,
        request: PipelineRequest,
    ) -> Option<PipelineResult> {
        let utterance = request.utterance.trim();
        if utterance.is_empty() {
            tracing::debug!("rejecting empty utterance before any external call");
            return None;
        }

        let mut state = CycleState::Idle;
        state = self.transition(state, CycleState::GeneratingText);

        // The utterance counts as "said" regardless of the cycle outcome.
        session.record_user_turn(utterance);
        let history = session.history_snapshot();

        let reply = match timeout(self.timeouts.generation, self.generator.generate(&history))
            .await
            .unwrap_or(Err(GenerationError::Timeout(self.timeouts.generation)))
        {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                self.transition(state, CycleState::Failed);
                tracing::warn!(error = %GenerationError::EmptyReply, "generation failed, sending fallback reply");
                return Some(PipelineResult {
                    text: FALLBACK_REPLY.to_string(),
                    audio: None,
                });
            }
            Err(e) => {
                self.transition(state, CycleState::Failed);
                tracing::warn!(error = %e, "generation failed, sending fallback reply");
                return Some(PipelineResult {
                    text: FALLBACK_REPLY.to_string(),
                    audio: None,
                });
            }
        };

        // The text reply is the authoritative conversational artifact:
        // record it before attempting synthesis.
        session.record_model_turn(reply.clone());
        state = self.transition(state, CycleState::SynthesizingAudio);

        let audio = match timeout(self.timeouts.synthesis, self.synthesize_full(&reply))
            .await
            .unwrap_or(Err(SynthesisError::Timeout(self.timeouts.synthesis)))
        {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(error = %e, "synthesis failed, downgrading to text-only reply");
                None
            }
        };

        state = self.transition(state, CycleState::Delivering);
        self.transition(state, CycleState::Done);

        Some(PipelineResult { text: reply, audio })
    }

    /// Drains the synthesizer's chunk stream into one contiguous buffer,
    /// preserving arrival order. Stream interruption and empty output are
    /// both synthesis failures.
    async fn synthesize_full(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let mut stream: AudioChunkStream = self.synthesizer.synthesize(text).await?;
        let mut audio = Vec::new();
        while let Some(chunk) = stream.next().await {
            audio.extend_from_slice(&chunk?);
        }
        if audio.is_empty() {
            return Err(SynthesisError::Empty);
        }
        Ok(audio)
    }

    fn transition(&self, from: CycleState, to: CycleState) -> CycleState {
        tracing::debug!(from = from.as_str(), to = to.as_str(), "cycle transition");
        to
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Priming, Role};
    use async_trait::async_trait;
    use futures_util::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedGenerator {
        replies: Mutex<Vec<Result<String, GenerationError>>>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn ok(text: &str) -> Self {
            Self::new(vec![Ok(text.to_string())])
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            _history: &[crate::session::ConversationTurn],
        ) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.replies.lock().unwrap().remove(0)
        }
    }

    struct ScriptedSynthesizer {
        chunks: Option<Vec<Vec<u8>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSynthesizer {
        fn chunks(chunks: Vec<Vec<u8>>) -> Self {
            Self {
                chunks: Some(chunks),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                chunks: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for ScriptedSynthesizer {
        async fn synthesize(&self, _text: &str) -> Result<AudioChunkStream, SynthesisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.chunks {
                Some(chunks) => {
                    let items: Vec<Result<Vec<u8>, SynthesisError>> =
                        chunks.iter().cloned().map(Ok).collect();
                    Ok(Box::pin(stream::iter(items)))
                }
                None => Err(SynthesisError::Status(500)),
            }
        }
    }

    fn orchestrator(
        generator: ScriptedGenerator,
        synthesizer: ScriptedSynthesizer,
    ) -> (PipelineOrchestrator, Arc<ScriptedGenerator>, Arc<ScriptedSynthesizer>) {
        let generator = Arc::new(generator);
        let synthesizer = Arc::new(synthesizer);
        let orchestrator = PipelineOrchestrator::new(
            generator.clone(),
            synthesizer.clone(),
            PipelineTimeouts::default(),
        );
        (orchestrator, generator, synthesizer)
    }

    fn request(text: &str) -> PipelineRequest {
        PipelineRequest {
            utterance: text.to_string(),
        }
    }

    #[tokio::test]
    async fn successful_cycle_returns_text_and_audio() {
        let (orchestrator, _, _) = orchestrator(
            ScriptedGenerator::ok("Hi there!"),
            ScriptedSynthesizer::chunks(vec![vec![0x01], vec![0x02]]),
        );
        let mut session = ConversationSession::new(&Priming::default());

        let result = orchestrator
            .run_cycle(&mut session, request("Hello"))
            .await
            .expect("non-empty utterance must produce a reply");

        assert_eq!(result.text, "Hi there!");
        assert_eq!(result.audio, Some(vec![0x01, 0x02]));

        let history = session.history_snapshot();
        assert_eq!(history.len(), 4);
        assert_eq!(history[2].role, Role::User);
        assert_eq!(history[2].text, "Hello");
        assert_eq!(history[3].role, Role::Model);
        assert_eq!(history[3].text, "Hi there!");
    }

    #[tokio::test]
    async fn generation_failure_sends_fallback_and_skips_synthesis() {
        let (orchestrator, _, synthesizer) = orchestrator(
            ScriptedGenerator::new(vec![Err(GenerationError::Status(429))]),
            ScriptedSynthesizer::chunks(vec![vec![0xff]]),
        );
        let mut session = ConversationSession::new(&Priming::default());

        let result = orchestrator
            .run_cycle(&mut session, request("Hello"))
            .await
            .expect("failed generation still owes a reply");

        assert_eq!(result.text, FALLBACK_REPLY);
        assert_eq!(result.audio, None);
        assert_eq!(synthesizer.calls.load(Ordering::SeqCst), 0);

        // User turn stays; no model turn is recorded.
        let history = session.history_snapshot();
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].role, Role::User);
    }

    #[tokio::test]
    async fn empty_generation_reply_is_a_failure() {
        let (orchestrator, _, synthesizer) = orchestrator(
            ScriptedGenerator::ok("   "),
            ScriptedSynthesizer::chunks(vec![vec![1]]),
        );
        let mut session = ConversationSession::new(&Priming::default());

        let result = orchestrator
            .run_cycle(&mut session, request("Hello"))
            .await
            .unwrap();

        assert_eq!(result.text, FALLBACK_REPLY);
        assert_eq!(synthesizer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.len(), 3);
    }

    #[tokio::test]
    async fn synthesis_failure_downgrades_to_text_only() {
        let (orchestrator, _, _) = orchestrator(
            ScriptedGenerator::ok("Hi there!"),
            ScriptedSynthesizer::failing(),
        );
        let mut session = ConversationSession::new(&Priming::default());

        let result = orchestrator
            .run_cycle(&mut session, request("Hello"))
            .await
            .unwrap();

        assert_eq!(result.text, "Hi there!");
        assert_eq!(result.audio, None);

        // The model turn stands even though audio failed.
        assert_eq!(session.len(), 4);
    }

    #[tokio::test]
    async fn empty_synthesis_output_downgrades_to_text_only() {
        let (orchestrator, _, _) = orchestrator(
            ScriptedGenerator::ok("Hi there!"),
            ScriptedSynthesizer::chunks(vec![]),
        );
        let mut session = ConversationSession::new(&Priming::default());

        let result = orchestrator
            .run_cycle(&mut session, request("Hello"))
            .await
            .unwrap();
        assert_eq!(result.audio, None);
    }

    #[tokio::test]
    async fn audio_chunks_are_concatenated_in_arrival_order() {
        let (orchestrator, _, _) = orchestrator(
            ScriptedGenerator::ok("ok"),
            ScriptedSynthesizer::chunks(vec![vec![1, 2], vec![3], vec![4, 5, 6]]),
        );
        let mut session = ConversationSession::new(&Priming::default());

        let result = orchestrator
            .run_cycle(&mut session, request("Hello"))
            .await
            .unwrap();
        assert_eq!(result.audio, Some(vec![1, 2, 3, 4, 5, 6]));
    }

    #[tokio::test]
    async fn whitespace_utterance_is_rejected_without_external_calls() {
        let (orchestrator, generator, synthesizer) = orchestrator(
            ScriptedGenerator::ok("never used"),
            ScriptedSynthesizer::chunks(vec![vec![1]]),
        );
        let mut session = ConversationSession::new(&Priming::default());

        let result = orchestrator.run_cycle(&mut session, request("   \t\n")).await;

        assert!(result.is_none());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(synthesizer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.len(), 2);
    }

    #[tokio::test]
    async fn utterance_is_trimmed_before_recording() {
        let (orchestrator, _, _) = orchestrator(
            ScriptedGenerator::ok("ok"),
            ScriptedSynthesizer::chunks(vec![vec![1]]),
        );
        let mut session = ConversationSession::new(&Priming::default());

        orchestrator
            .run_cycle(&mut session, request("  Hello  "))
            .await
            .unwrap();
        assert_eq!(session.history_snapshot()[2].text, "Hello");
    }

    #[tokio::test]
    async fn generation_timeout_is_treated_as_failure() {
        let mut generator = ScriptedGenerator::ok("too late");
        generator.delay = Duration::from_millis(200);
        let generator = Arc::new(generator);
        let synthesizer = Arc::new(ScriptedSynthesizer::chunks(vec![vec![1]]));
        let orchestrator = PipelineOrchestrator::new(
            generator,
            synthesizer.clone(),
            PipelineTimeouts {
                generation: Duration::from_millis(20),
                synthesis: Duration::from_secs(1),
            },
        );
        let mut session = ConversationSession::new(&Priming::default());

        let result = orchestrator
            .run_cycle(&mut session, request("Hello"))
            .await
            .unwrap();

        assert_eq!(result.text, FALLBACK_REPLY);
        assert_eq!(result.audio, None);
        assert_eq!(synthesizer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.len(), 3);
    }

    #[tokio::test]
    async fn generator_sees_history_ending_with_new_utterance() {
        struct CapturingGenerator {
            seen: Mutex<Vec<crate::session::ConversationTurn>>,
        }

        #[async_trait]
        impl TextGenerator for CapturingGenerator {
            async fn generate(
                &self,
                history: &[crate::session::ConversationTurn],
            ) -> Result<String, GenerationError> {
                *self.seen.lock().unwrap() = history.to_vec();
                Ok("reply".to_string())
            }
        }

        let generator = Arc::new(CapturingGenerator {
            seen: Mutex::new(Vec::new()),
        });
        let orchestrator = PipelineOrchestrator::new(
            generator.clone(),
            Arc::new(ScriptedSynthesizer::chunks(vec![vec![1]])),
            PipelineTimeouts::default(),
        );
        let mut session = ConversationSession::new(&Priming::default());

        orchestrator
            .run_cycle(&mut session, request("Hello"))
            .await
            .unwrap();

        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2].role, Role::User);
        assert_eq!(seen[2].text, "Hello");
    }
}
