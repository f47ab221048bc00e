//! In-memory chat sessions.

use crate::core::conversation::{ConversationLog, ConversationTurn};
use crate::core::error::SessionError;
use crate::core::router::{BagLocation, EmergencyOrder, EmergencyStatus, Panel, RecommendedPart};
use di::{inject, injectable};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    Default,
    Destructive,
}

/// A transient notification for the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toast {
    pub variant: ToastVariant,
    pub title: String,
    pub description: String,
}

impl Toast {
    pub fn notice(title: &str, description: impl Into<String>) -> Self {
        Toast {
            variant: ToastVariant::Default,
            title: title.to_owned(),
            description: description.into(),
        }
    }

    pub fn destructive(title: &str, description: impl Into<String>) -> Self {
        Toast {
            variant: ToastVariant::Destructive,
            title: title.to_owned(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum FindBagState {
    #[default]
    Closed,
    AwaitingId,
    #[serde(rename_all = "camelCase")]
    Searching {
        bag_id: String,
    },
    Located {
        location: BagLocation,
    },
}

/// One user's conversation and the UI state that hangs off it.
#[derive(Debug)]
pub struct ChatSession {
    pub id: Uuid,
    pub log: ConversationLog,
    pub selected_equipment_id: Option<String>,
    pub panel: Option<Panel>,
    pub find_bag: FindBagState,
    pub pending_order: Option<RecommendedPart>,
    pub emergency_order: Option<EmergencyOrder>,
}

impl ChatSession {
    pub fn new() -> Self {
        ChatSession {
            id: Uuid::new_v4(),
            log: ConversationLog::new(),
            selected_equipment_id: None,
            panel: None,
            find_bag: FindBagState::default(),
            pending_order: None,
            emergency_order: None,
        }
    }

    /// Moves emergency order `order_id` en route. Returns false if it was
    /// replaced or has already moved.
    pub fn advance_emergency(&mut self, order_id: &str) -> bool {
        match &mut self.emergency_order {
            Some(order) if order.id == order_id && order.status == EmergencyStatus::Dispatching => {
                order.status = EmergencyStatus::EnRoute;
                true
            }
            _ => false,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            turns: self.log.snapshot(),
            selected_equipment_id: self.selected_equipment_id.clone(),
            panel: self.panel.clone(),
            find_bag: self.find_bag.clone(),
            pending_order: self.pending_order.clone(),
            emergency_order: self.emergency_order.clone(),
        }
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub turns: Vec<ConversationTurn>,
    pub selected_equipment_id: Option<String>,
    pub panel: Option<Panel>,
    pub find_bag: FindBagState,
    pub pending_order: Option<RecommendedPart>,
    pub emergency_order: Option<EmergencyOrder>,
}

/// An emergency dispatch as just confirmed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyConfirmation {
    pub order: EmergencyOrder,
    pub toast: Toast,
}

/// Result of one conversational turn.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    /// Turns appended (or resolved) during this turn, in log order.
    pub turns: Vec<ConversationTurn>,
    pub panel: Option<Panel>,
    pub toasts: Vec<Toast>,
    pub selected_equipment_id: Option<String>,
}

/// Live sessions keyed by id, each behind its own lock.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<ChatSession>>>>,
}

#[injectable]
impl SessionRegistry {
    #[inject]
    pub fn create() -> SessionRegistry {
        SessionRegistry::default()
    }
}

impl SessionRegistry {
    pub async fn insert(&self, session: ChatSession) -> Uuid {
        let id = session.id;
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        id
    }

    /// The session's shared handle, for work that must release the lock while waiting.
    pub async fn handle(&self, id: Uuid) -> Result<Arc<Mutex<ChatSession>>, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound)
    }

    /// Locks a session for a mutating operation, failing fast if a turn is in flight.
    pub async fn acquire(&self, id: Uuid) -> Result<OwnedMutexGuard<ChatSession>, SessionError> {
        self.handle(id)
            .await?
            .try_lock_owned()
            .map_err(|_| SessionError::Busy)
    }

    /// Waits for any in-flight turn and returns the session state.
    pub async fn snapshot(&self, id: Uuid) -> Result<SessionSnapshot, SessionError> {
        let session = self.handle(id).await?;
        let guard = session.lock().await;
        Ok(guard.snapshot())
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), SessionError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(SessionError::NotFound)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
