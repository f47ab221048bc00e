//! Error taxonomy for flows, equipment resolution and chat sessions.

use thiserror::Error;

/// Failure of a single generative-AI flow.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Upstream output (or action input) did not match the declared schema.
    #[error("schema validation failed for {flow}: {}", errors.join("; "))]
    SchemaValidation {
        flow: &'static str,
        errors: Vec<String>,
    },

    /// Network or model failure reported by the upstream provider.
    #[error("upstream call failed: {message}")]
    Upstream {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A speech or image request completed without a media part.
    #[error("no media returned")]
    NoMediaReturned,

    /// A prompt template failed to render.
    #[error("prompt template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl FlowError {
    pub fn upstream(message: impl Into<String>) -> Self {
        FlowError::Upstream {
            message: message.into(),
            source: None,
        }
    }

    pub fn schema(flow: &'static str, error: impl Into<String>) -> Self {
        FlowError::SchemaValidation {
            flow,
            errors: vec![error.into()],
        }
    }
}

/// A routed equipment reference that does not exist in the store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("equipment `{0}` not found in the store")]
    EquipmentNotResolved(String),
}

/// Equipment store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record `{id}`: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Session-level failures surfaced by the chat API.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found")]
    NotFound,

    #[error("a turn is already in progress for this session")]
    Busy,

    #[error("message is empty")]
    EmptyMessage,

    #[error("bag id is empty")]
    EmptyBagId,

    #[error("no order is awaiting confirmation")]
    NoPendingOrder,

    #[error("no bag search is awaiting an id")]
    NoBagSearch,

    #[error("unknown equipment `{0}`")]
    UnknownEquipment(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
