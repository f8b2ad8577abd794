//! Per-call conversation state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// The transcript of one phone call, oldest turn first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub call_sid: String,
    pub turns: Vec<Turn>,
    pub created_at: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new(call_sid: impl Into<String>) -> Self {
        Self {
            call_sid: call_sid.into(),
            turns: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn push(&mut self, role: Role, text: impl Into<String>) {
        self.turns.push(Turn {
            role,
            text: text.into(),
        });
    }

    /// Keep only the most recent `max` turns.
    pub fn trim_to(&mut self, max: usize) {
        if self.turns.len() > max {
            self.turns.drain(..self.turns.len() - max);
        }
    }

    /// Transcript rendered as role-labeled lines for prompting.
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(|turn| {
                let label = match turn.role {
                    Role::User => "Caller",
                    Role::Assistant => "Agent",
                };
                format!("{label}: {}", turn.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
