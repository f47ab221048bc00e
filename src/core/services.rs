//! Implementations for the services the app needs.
//!

use crate::config::AppConfig;
use crate::core::conversation::ConversationTurn;
use crate::core::envelope::Envelope;
use crate::core::error::{FlowError, SessionError};
use crate::core::flows::conversation::conversational_response;
use crate::core::flows::diagnostics::real_time_diagnostics;
use crate::core::flows::explanation::visual_explanation;
use crate::core::flows::insights::predictive_insights;
use crate::core::flows::speech::text_to_speech;
use crate::core::orchestrator::Orchestrator;
use crate::core::router::BagLocation;
use crate::core::schemas::{
    ConversationalResponseInput, ConversationalResponseOutput, DiagnosticsInput,
    DiagnosticsOutput, InsightsInput, InsightsOutput, TextToSpeechInput, TextToSpeechOutput,
    VisualExplanationInput, VisualExplanationOutput,
};
use crate::core::session::{
    ChatSession, EmergencyConfirmation, SessionRegistry, SessionSnapshot, TurnOutcome,
};
use crate::core::traits::{ActionService, ChatService, GenerativeModel};
use crate::infrastructure::traits::EquipmentRepository;
use async_trait::async_trait;
use di::{Ref, injectable};
use log::{error, info};
use uuid::Uuid;

const CONVERSATION_FAILED: &str = "Failed to get a response.";
const DIAGNOSTICS_FAILED: &str = "Failed to get real-time diagnostics.";
const INSIGHTS_FAILED: &str = "Failed to get predictive insights.";
const SPEECH_FAILED: &str = "Failed to generate audio.";
const EXPLANATION_FAILED: &str = "Failed to generate a visual explanation.";

/// Logs the cause and hides it behind the action's fixed message.
fn envelope<T>(result: Result<T, FlowError>, message: &str) -> Envelope<T> {
    match result {
        Ok(data) => Envelope::Success(data),
        Err(e) => {
            error!("{message} {e}");
            Envelope::Failure(message.to_owned())
        }
    }
}

#[injectable(ActionService)]
pub struct GenAiActionService {
    model: Ref<dyn GenerativeModel>,
    config: Ref<AppConfig>,
}

impl GenAiActionService {
    pub fn new(model: Ref<dyn GenerativeModel>, config: Ref<AppConfig>) -> Self {
        GenAiActionService { model, config }
    }
}

#[async_trait]
impl ActionService for GenAiActionService {
    async fn get_conversational_response(
        &self,
        input: ConversationalResponseInput,
    ) -> Envelope<ConversationalResponseOutput> {
        envelope(
            conversational_response(&*self.model, &self.config, &input).await,
            CONVERSATION_FAILED,
        )
    }

    async fn get_diagnostics(&self, input: DiagnosticsInput) -> Envelope<DiagnosticsOutput> {
        envelope(
            real_time_diagnostics(&*self.model, &self.config, &input).await,
            DIAGNOSTICS_FAILED,
        )
    }

    async fn get_insights(&self, input: InsightsInput) -> Envelope<InsightsOutput> {
        envelope(
            predictive_insights(&*self.model, &self.config, &input).await,
            INSIGHTS_FAILED,
        )
    }

    async fn text_to_speech(&self, input: TextToSpeechInput) -> Envelope<TextToSpeechOutput> {
        envelope(
            text_to_speech(&*self.model, &self.config, &input).await,
            SPEECH_FAILED,
        )
    }

    async fn explain(&self, input: VisualExplanationInput) -> Envelope<VisualExplanationOutput> {
        envelope(
            visual_explanation(&*self.model, &self.config, &input).await,
            EXPLANATION_FAILED,
        )
    }
}

#[injectable(ChatService)]
pub struct MyChatService {
    registry: Ref<SessionRegistry>,
    actions: Ref<dyn ActionService>,
    equipment: Ref<dyn EquipmentRepository>,
    config: Ref<AppConfig>,
}

impl MyChatService {
    fn orchestrator(&self) -> Orchestrator<'_> {
        Orchestrator::new(&*self.actions, &*self.equipment, &self.config)
    }
}

#[async_trait]
impl ChatService for MyChatService {
    async fn create_session(&self) -> Result<SessionSnapshot, SessionError> {
        let mut session = ChatSession::new();
        self.orchestrator().open(&mut session).await?;

        let snapshot = session.snapshot();
        self.registry.insert(session).await;
        info!("session {} started", snapshot.id);
        Ok(snapshot)
    }

    async fn session(&self, session_id: Uuid) -> Result<SessionSnapshot, SessionError> {
        self.registry.snapshot(session_id).await
    }

    async fn end_session(&self, session_id: Uuid) -> Result<(), SessionError> {
        // a turn still in flight keeps its own handle and finishes unobserved
        self.registry.remove(session_id).await?;
        info!("session {session_id} ended");
        Ok(())
    }

    async fn send_message(
        &self,
        session_id: Uuid,
        text: String,
    ) -> Result<TurnOutcome, SessionError> {
        let mut session = self.registry.acquire(session_id).await?;
        self.orchestrator()
            .handle_user_message(&mut session, &text)
            .await
    }

    async fn select_equipment(
        &self,
        session_id: Uuid,
        equipment_id: String,
    ) -> Result<SessionSnapshot, SessionError> {
        let mut session = self.registry.acquire(session_id).await?;
        self.orchestrator()
            .select_equipment(&mut session, &equipment_id)
            .await?;
        Ok(session.snapshot())
    }

    async fn submit_bag_id(
        &self,
        session_id: Uuid,
        bag_id: String,
    ) -> Result<BagLocation, SessionError> {
        let handle = self.registry.handle(session_id).await?;
        let bag_id = {
            let mut session = handle.try_lock().map_err(|_| SessionError::Busy)?;
            self.orchestrator().begin_bag_search(&mut session, &bag_id)?
        };

        tokio::time::sleep(self.config.find_bag_delay).await;

        let mut session = handle.lock().await;
        Ok(self.orchestrator().finish_bag_search(&mut session, &bag_id))
    }

    async fn confirm_order(&self, session_id: Uuid) -> Result<ConversationTurn, SessionError> {
        let mut session = self.registry.acquire(session_id).await?;
        self.orchestrator().confirm_order(&mut session)
    }

    async fn confirm_emergency(
        &self,
        session_id: Uuid,
    ) -> Result<EmergencyConfirmation, SessionError> {
        let handle = self.registry.handle(session_id).await?;
        // an emergency waits for an in-flight turn instead of being rejected
        let confirmation = {
            let mut session = handle.lock().await;
            self.orchestrator().confirm_emergency(&mut session)
        };

        let delay = self.config.emergency_en_route_delay;
        let order_id = confirmation.order.id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if handle.lock().await.advance_emergency(&order_id) {
                info!("emergency order {order_id} en route");
            }
        });

        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::conversation::TurnContent;
    use crate::core::router::EmergencyStatus;
    use crate::core::session::FindBagState;
    use crate::test_support::{FakeEquipmentRepository, ScriptedModel};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn service(model: ScriptedModel) -> GenAiActionService {
        GenAiActionService::new(Arc::new(model), Arc::new(AppConfig::default()))
    }

    fn chat(model: ScriptedModel, config: AppConfig) -> MyChatService {
        let config = Arc::new(config);
        MyChatService {
            registry: Arc::new(SessionRegistry::default()),
            actions: Arc::new(GenAiActionService::new(Arc::new(model), config.clone())),
            equipment: Arc::new(FakeEquipmentRepository::default()),
            config,
        }
    }

    #[tokio::test]
    async fn test_success_is_wrapped() {
        let actions = service(ScriptedModel::new().then_json(json!({ "insights": "Looks fine." })));
        let result = actions
            .get_insights(InsightsInput {
                equipment_id: "cnc-001".into(),
            })
            .await;
        assert_eq!(result.into_result().unwrap().insights, "Looks fine.");
    }

    #[tokio::test]
    async fn test_failures_use_fixed_messages() {
        let actions = service(ScriptedModel::new().then_fail("quota exceeded"));
        let result = actions
            .get_diagnostics(DiagnosticsInput {
                sensor_data: [("Temperature".to_owned(), 50.0)].into(),
                equipment_type: "Machining".into(),
            })
            .await;
        assert_eq!(result.into_result().unwrap_err(), DIAGNOSTICS_FAILED);

        let actions = service(ScriptedModel::new().then_json(json!({ "wrong": true })));
        let result = actions
            .get_insights(InsightsInput {
                equipment_id: "cnc-001".into(),
            })
            .await;
        assert_eq!(result.into_result().unwrap_err(), INSIGHTS_FAILED);
    }

    #[tokio::test]
    async fn test_missing_audio_is_a_failure_envelope() {
        let actions = service(ScriptedModel::new().then_text("no audio here"));
        let result = actions
            .text_to_speech(TextToSpeechInput {
                text: "Hello".into(),
                language_code: None,
            })
            .await;
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_bag_search_leaves_session_free_for_chat() {
        let chat = Arc::new(chat(
            ScriptedModel::new()
                .then_json(json!({ "response": "Sure.", "action": "find-bag" }))
                .then_json(json!({ "response": "Hello!", "action": "none" })),
            AppConfig {
                speak_responses: false,
                find_bag_delay: Duration::from_millis(200),
                ..AppConfig::default()
            },
        ));
        let id = chat.create_session().await.unwrap().id;
        chat.send_message(id, "find my bag".into()).await.unwrap();

        let search = {
            let chat = chat.clone();
            tokio::spawn(async move { chat.submit_bag_id(id, "BAG-007".into()).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let outcome = chat.send_message(id, "hi".into()).await.unwrap();
        assert_eq!(outcome.turns[1].content, TurnContent::text("Hello!"));

        let location = search.await.unwrap().unwrap();
        assert_eq!(location.bag_id, "BAG-007");
        assert!(matches!(
            chat.session(id).await.unwrap().find_bag,
            FindBagState::Located { .. }
        ));
    }

    #[tokio::test]
    async fn test_bag_id_without_dialog_is_rejected() {
        let chat = chat(ScriptedModel::new(), AppConfig::default());
        let id = chat.create_session().await.unwrap().id;

        let result = chat.submit_bag_id(id, "BAG-007".into()).await;
        assert!(matches!(result, Err(SessionError::NoBagSearch)));
    }

    #[tokio::test]
    async fn test_emergency_order_moves_en_route_after_delay() {
        let chat = chat(
            ScriptedModel::new(),
            AppConfig {
                emergency_en_route_delay: Duration::from_millis(50),
                ..AppConfig::default()
            },
        );
        let id = chat.create_session().await.unwrap().id;

        let confirmation = chat.confirm_emergency(id).await.unwrap();
        assert_eq!(confirmation.order.status, EmergencyStatus::Dispatching);
        let pending = chat.session(id).await.unwrap().emergency_order.unwrap();
        assert_eq!(pending.status, EmergencyStatus::Dispatching);

        tokio::time::sleep(Duration::from_millis(200)).await;

        let order = chat.session(id).await.unwrap().emergency_order.unwrap();
        assert_eq!(order.id, confirmation.order.id);
        assert_eq!(order.status, EmergencyStatus::EnRoute);
    }
}
