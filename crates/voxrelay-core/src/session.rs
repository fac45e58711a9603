//! Per-connection conversation state.

use serde::{Deserialize, Serialize};

/// Who produced a conversation turn. Serialized lowercase to match the
/// generation service's wire roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One role-tagged message in the conversation history. Immutable once
/// created; chronological order within a session is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

fn default_prompt() -> String {
    "You are a friendly and helpful chatbot named Sparky.".to_string()
}

fn default_acknowledgement() -> String {
    "Great! I'm Sparky, ready to chat and help out.".to_string()
}

/// The fixed two-turn seed establishing the assistant persona before real
/// conversation begins: a persona instruction attributed to the user, and
/// the model's acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct Priming {
    #[serde(default = "default_prompt")]
    pub prompt: String,

    #[serde(default = "default_acknowledgement")]
    pub acknowledgement: String,
}

impl Default for Priming {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            acknowledgement: default_acknowledgement(),
        }
    }
}

/// Ordered conversation history for one client connection.
///
/// Created when the connection opens, destroyed when it closes; never shared
/// across connections. The history grows only through the two `record_*`
/// operations, so after N successful cycles it holds `2 + 2N` turns (the
/// priming pair plus one user/model pair per cycle). A failed cycle
/// contributes the user turn only.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    history: Vec<ConversationTurn>,
}

impl ConversationSession {
    /// Opens a session seeded with the priming pair.
    pub fn new(priming: &Priming) -> Self {
        Self {
            history: vec![
                ConversationTurn {
                    role: Role::User,
                    text: priming.prompt.clone(),
                },
                ConversationTurn {
                    role: Role::Model,
                    text: priming.acknowledgement.clone(),
                },
            ],
        }
    }

    /// Appends the user's utterance. Called before generation is attempted,
    /// so the utterance counts as "said" even if the cycle later fails.
    pub fn record_user_turn(&mut self, text: impl Into<String>) {
        self.history.push(ConversationTurn {
            role: Role::User,
            text: text.into(),
        });
    }

    /// Appends the model's reply. Called only after a generation success;
    /// the text reply is canonical history even when synthesis fails later.
    pub fn record_model_turn(&mut self, text: impl Into<String>) {
        self.history.push(ConversationTurn {
            role: Role::Model,
            text: text.into(),
        });
    }

    /// Ordered copy of all turns recorded so far, oldest first.
    pub fn history_snapshot(&self) -> Vec<ConversationTurn> {
        self.history.clone()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
