//! DI "Interfaces"

use crate::core::conversation::ConversationTurn;
use crate::core::envelope::Envelope;
use crate::core::error::{FlowError, SessionError};
use crate::core::model::{GenerateRequest, GenerateResponse};
use crate::core::router::BagLocation;
use crate::core::schemas::{
    ConversationalResponseInput, ConversationalResponseOutput, DiagnosticsInput,
    DiagnosticsOutput, InsightsInput, InsightsOutput, TextToSpeechInput, TextToSpeechOutput,
    VisualExplanationInput, VisualExplanationOutput,
};
use crate::core::session::{EmergencyConfirmation, SessionSnapshot, TurnOutcome};
use async_trait::async_trait;
use uuid::Uuid;

/// The upstream generative-AI provider.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Performs a single completion. Implementations must not retry.
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, FlowError>;
}

/// Server actions: one per flow, each returning an envelope and never an error.
#[async_trait]
pub trait ActionService: Send + Sync {
    async fn get_conversational_response(
        &self,
        input: ConversationalResponseInput,
    ) -> Envelope<ConversationalResponseOutput>;

    async fn get_diagnostics(&self, input: DiagnosticsInput) -> Envelope<DiagnosticsOutput>;

    async fn get_insights(&self, input: InsightsInput) -> Envelope<InsightsOutput>;

    async fn text_to_speech(&self, input: TextToSpeechInput) -> Envelope<TextToSpeechOutput>;

    async fn explain(&self, input: VisualExplanationInput) -> Envelope<VisualExplanationOutput>;
}

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Starts a session with the greeting turn and the first equipment selected.
    async fn create_session(&self) -> Result<SessionSnapshot, SessionError>;

    async fn session(&self, session_id: Uuid) -> Result<SessionSnapshot, SessionError>;

    /// Destroys the session and its conversation.
    async fn end_session(&self, session_id: Uuid) -> Result<(), SessionError>;

    /// Runs one conversational turn.
    ///
    /// Returns `Err(SessionError::Busy)` if another turn of the same session is
    /// still in flight.
    async fn send_message(&self, session_id: Uuid, text: String)
    -> Result<TurnOutcome, SessionError>;

    async fn select_equipment(
        &self,
        session_id: Uuid,
        equipment_id: String,
    ) -> Result<SessionSnapshot, SessionError>;

    /// Reveals the (simulated) location of a smart bag after a fixed delay.
    ///
    /// Only valid while the find-bag dialog awaits an id. The session stays
    /// free for chat during the delay.
    async fn submit_bag_id(
        &self,
        session_id: Uuid,
        bag_id: String,
    ) -> Result<BagLocation, SessionError>;

    /// Confirms the pending recommended-part order.
    async fn confirm_order(&self, session_id: Uuid) -> Result<ConversationTurn, SessionError>;

    /// Dispatches an emergency drone. The order is dispatching at first and
    /// moves en route after the configured delay.
    async fn confirm_emergency(
        &self,
        session_id: Uuid,
    ) -> Result<EmergencyConfirmation, SessionError>;
}
