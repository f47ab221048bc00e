//! Append-only conversation log.

use crate::core::schemas::VisualExplanationOutput;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TurnContent {
    Text { text: String },
    /// Placeholder shown while a secondary flow runs; replaced exactly once.
    Pending { text: String },
    Explanation { explanation: VisualExplanationOutput },
}

impl TurnContent {
    pub fn text(text: impl Into<String>) -> Self {
        TurnContent::Text { text: text.into() }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, TurnContent::Pending { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub id: Uuid,
    pub role: Role,
    pub content: TurnContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(role: Role, content: TurnContent) -> Self {
        ConversationTurn {
            id: Uuid::new_v4(),
            role,
            content,
            audio_url: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_audio(mut self, audio_url: Option<String>) -> Self {
        self.audio_url = audio_url;
        self
    }
}

#[derive(Debug, Default)]
pub struct ConversationLog {
    turns: Vec<ConversationTurn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: ConversationTurn) -> &ConversationTurn {
        self.turns.push(turn);
        &self.turns[self.turns.len() - 1]
    }

    pub fn snapshot(&self) -> Vec<ConversationTurn> {
        self.turns.clone()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Replaces the content of a pending placeholder.
    ///
    /// Returns `None` if the turn does not exist or is not pending; settled
    /// turns never change.
    pub fn resolve_pending(&mut self, id: Uuid, content: TurnContent) -> Option<&ConversationTurn> {
        let turn = self
            .turns
            .iter_mut()
            .find(|turn| turn.id == id && turn.content.is_pending())?;
        turn.content = content;
        Some(turn)
    }
}
