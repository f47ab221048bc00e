//! Turn handling for a chat session.
//!
//! A turn appends the user message, asks the conversational flow for a reply,
//! speaks it, and then performs the single side effect routed from the reply's
//! intent. Flow failures never abort a turn: they degrade to an inline apology
//! and a toast.

use crate::config::AppConfig;
use crate::core::conversation::{ConversationTurn, Role, TurnContent};
use crate::core::equipment::Equipment;
use crate::core::envelope::Envelope;
use crate::core::error::SessionError;
use crate::core::router::{
    self, ActionIntent, BagLocation, DroneDispatch, EXPLANATION_PENDING, EmergencyOrder,
    FIND_BAG_PROMPT, Panel, RecommendedPart,
};
use crate::core::schemas::{
    ConversationalResponseInput, DiagnosticsInput, InsightsInput, TextToSpeechInput,
    VisualExplanationInput,
};
use crate::core::session::{ChatSession, EmergencyConfirmation, FindBagState, Toast, TurnOutcome};
use crate::core::speech_input::{SpeechEvent, SpeechInputProvider};
use crate::core::traits::ActionService;
use crate::infrastructure::traits::EquipmentRepository;
use log::{debug, error, info, warn};

pub const GREETING: &str = "Hello! I'm your factory AI assistant. You can ask me things like \
'What is the status of CNC-001?' or 'Show me the maintenance log for the main conveyor belt.'";

pub struct Orchestrator<'a> {
    actions: &'a dyn ActionService,
    equipment: &'a dyn EquipmentRepository,
    config: &'a AppConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        actions: &'a dyn ActionService,
        equipment: &'a dyn EquipmentRepository,
        config: &'a AppConfig,
    ) -> Self {
        Orchestrator {
            actions,
            equipment,
            config,
        }
    }

    /// Greets and preselects the first piece of equipment in the store.
    pub async fn open(&self, session: &mut ChatSession) -> Result<(), SessionError> {
        session.log.append(ConversationTurn::new(
            Role::Assistant,
            TurnContent::text(GREETING),
        ));

        let fleet = self.equipment.list_equipment().await?;
        if let Some(first) = fleet.first() {
            session.selected_equipment_id = Some(first.id.clone());
            session.panel = Some(Panel::status(first));
        }
        Ok(())
    }

    pub async fn handle_user_message(
        &self,
        session: &mut ChatSession,
        text: &str,
    ) -> Result<TurnOutcome, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let mut outcome = TurnOutcome::default();
        let user_turn = ConversationTurn::new(Role::User, TurnContent::text(text));
        outcome.turns.push(session.log.append(user_turn).clone());

        let reply = self
            .actions
            .get_conversational_response(ConversationalResponseInput {
                user_input: text.to_owned(),
                selected_equipment_id: session.selected_equipment_id.clone(),
            })
            .await;

        let output = match reply {
            Envelope::Success(output) => output,
            Envelope::Failure(message) => {
                let apology = format!("Sorry, I encountered an error: {message}");
                let turn = ConversationTurn::new(Role::Assistant, TurnContent::text(apology));
                outcome.turns.push(session.log.append(turn).clone());
                outcome.toasts.push(Toast::destructive("Error", message));
                outcome.selected_equipment_id = session.selected_equipment_id.clone();
                return Ok(outcome);
            }
        };

        let language = output.language_code.as_deref();
        if !output.response.trim().is_empty() {
            self.say(session, &mut outcome, &output.response, language)
                .await;
        }

        let intent = ActionIntent::from_output(&output);
        debug!("session {} routed to {intent:?}", session.id);

        let equipment = if intent.needs_equipment() {
            let fleet = match self.equipment.list_equipment().await {
                Ok(fleet) => fleet,
                Err(e) => {
                    error!("equipment store unavailable for {intent:?}: {e}");
                    outcome.toasts.push(Toast::destructive(
                        "Equipment Error",
                        "Failed to load equipment data.",
                    ));
                    outcome.selected_equipment_id = session.selected_equipment_id.clone();
                    return Ok(outcome);
                }
            };
            let resolved = router::resolve_or_previous(
                intent.target(),
                &fleet,
                session.selected_equipment_id.as_deref(),
            )
            .cloned();
            if resolved.is_none() {
                warn!("no equipment to act on for {intent:?}");
            }
            resolved
        } else {
            None
        };
        if let Some(equipment) = &equipment {
            session.selected_equipment_id = Some(equipment.id.clone());
        }

        let panel = match (intent, equipment) {
            (ActionIntent::None, _) => None,
            (ActionIntent::Status(_), Some(equipment)) => Some(Panel::status(&equipment)),
            (ActionIntent::Report(_), Some(equipment)) => Some(Panel::maintenance_log(&equipment)),
            (ActionIntent::Diagnostics(_), Some(equipment)) => {
                self.diagnose(&equipment, &mut outcome).await
            }
            (ActionIntent::Insights(_), Some(equipment)) => {
                self.insights(&equipment, &mut outcome).await
            }
            (ActionIntent::Order, _) => {
                let part = RecommendedPart::default();
                session.pending_order = Some(part.clone());
                Some(Panel::OrderPrompt { part })
            }
            (ActionIntent::Drone, _) => Some(Panel::DroneDispatch {
                dispatch: DroneDispatch::default(),
            }),
            (ActionIntent::FindBag, _) => {
                session.find_bag = FindBagState::AwaitingId;
                // the prompt is fixed English text
                self.say(session, &mut outcome, FIND_BAG_PROMPT, None).await;
                Some(Panel::FindBagDialog)
            }
            (ActionIntent::Explanation { topic }, _) => {
                self.explain(session, &mut outcome, topic).await;
                None
            }
            (_, None) => None,
        };

        if panel.is_some() {
            session.panel = panel.clone();
        }
        outcome.panel = panel;
        outcome.selected_equipment_id = session.selected_equipment_id.clone();
        Ok(outcome)
    }

    /// Appends an assistant text turn, spoken when configured.
    async fn say(
        &self,
        session: &mut ChatSession,
        outcome: &mut TurnOutcome,
        text: &str,
        language_code: Option<&str>,
    ) {
        let audio = if self.config.speak_responses {
            self.speak(text, language_code, outcome).await
        } else {
            None
        };

        let turn = ConversationTurn::new(Role::Assistant, TurnContent::text(text)).with_audio(audio);
        outcome.turns.push(session.log.append(turn).clone());
    }

    async fn speak(
        &self,
        text: &str,
        language_code: Option<&str>,
        outcome: &mut TurnOutcome,
    ) -> Option<String> {
        let speech = self
            .actions
            .text_to_speech(TextToSpeechInput {
                text: text.to_owned(),
                language_code: language_code.map(str::to_owned),
            })
            .await;

        match speech {
            Envelope::Success(output) => Some(output.audio),
            Envelope::Failure(message) => {
                error!("TTS Error: {message}");
                outcome.toasts.push(Toast::destructive(
                    "Audio Error",
                    "Failed to generate audio for the response.",
                ));
                None
            }
        }
    }

    async fn diagnose(&self, equipment: &Equipment, outcome: &mut TurnOutcome) -> Option<Panel> {
        let result = self
            .actions
            .get_diagnostics(DiagnosticsInput {
                sensor_data: equipment.sensor_values(),
                equipment_type: equipment.kind.clone(),
            })
            .await;

        match result {
            Envelope::Success(report) => Some(Panel::Diagnostics {
                equipment_id: equipment.id.clone(),
                report,
            }),
            Envelope::Failure(message) => {
                outcome
                    .toasts
                    .push(Toast::destructive("Diagnostics Error", message));
                None
            }
        }
    }

    async fn insights(&self, equipment: &Equipment, outcome: &mut TurnOutcome) -> Option<Panel> {
        let result = self
            .actions
            .get_insights(InsightsInput {
                equipment_id: equipment.id.clone(),
            })
            .await;

        match result {
            Envelope::Success(output) => Some(Panel::Insights {
                equipment_id: equipment.id.clone(),
                insights: output.insights,
            }),
            Envelope::Failure(message) => {
                outcome
                    .toasts
                    .push(Toast::destructive("Insights Error", message));
                None
            }
        }
    }

    /// Shows a placeholder, then replaces it in place with the explanation.
    async fn explain(&self, session: &mut ChatSession, outcome: &mut TurnOutcome, topic: String) {
        let placeholder = ConversationTurn::new(
            Role::Assistant,
            TurnContent::Pending {
                text: EXPLANATION_PENDING.to_owned(),
            },
        );
        let placeholder_id = session.log.append(placeholder).id;

        let content = match self.actions.explain(VisualExplanationInput { topic }).await {
            Envelope::Success(explanation) => TurnContent::Explanation { explanation },
            Envelope::Failure(message) => TurnContent::text(format!(
                "Sorry, I failed to create an explanation. {message}"
            )),
        };

        if let Some(turn) = session.log.resolve_pending(placeholder_id, content) {
            outcome.turns.push(turn.clone());
        }
    }

    pub async fn select_equipment(
        &self,
        session: &mut ChatSession,
        equipment_id: &str,
    ) -> Result<(), SessionError> {
        let equipment = self
            .equipment
            .find_equipment(equipment_id)
            .await?
            .ok_or_else(|| SessionError::UnknownEquipment(equipment_id.to_owned()))?;

        session.selected_equipment_id = Some(equipment.id.clone());
        session.panel = Some(Panel::status(&equipment));
        Ok(())
    }

    /// Claims the open bag dialog for `bag_id`. The search delay is waited
    /// out by the caller, without holding the session.
    pub fn begin_bag_search(
        &self,
        session: &mut ChatSession,
        bag_id: &str,
    ) -> Result<String, SessionError> {
        let bag_id = bag_id.trim();
        if bag_id.is_empty() {
            return Err(SessionError::EmptyBagId);
        }
        if session.find_bag != FindBagState::AwaitingId {
            return Err(SessionError::NoBagSearch);
        }

        session.find_bag = FindBagState::Searching {
            bag_id: bag_id.to_owned(),
        };
        Ok(bag_id.to_owned())
    }

    /// Reveals the bag's location. A dialog reopened during the search keeps
    /// its new state.
    pub fn finish_bag_search(&self, session: &mut ChatSession, bag_id: &str) -> BagLocation {
        let location = BagLocation::located(bag_id);
        if matches!(&session.find_bag, FindBagState::Searching { bag_id: searching } if searching == bag_id)
        {
            session.find_bag = FindBagState::Located {
                location: location.clone(),
            };
        }
        location
    }

    /// Creates an emergency drone order, replacing any earlier one.
    pub fn confirm_emergency(&self, session: &mut ChatSession) -> EmergencyConfirmation {
        let order = EmergencyOrder::dispatch();
        info!("session {} dispatched emergency order {}", session.id, order.id);
        session.emergency_order = Some(order.clone());

        let toast = Toast::notice(
            "Emergency Confirmed",
            format!("Drone dispatch order {} has been created.", order.id),
        );
        EmergencyConfirmation { order, toast }
    }

    pub fn confirm_order(&self, session: &mut ChatSession) -> Result<ConversationTurn, SessionError> {
        let part = session
            .pending_order
            .take()
            .ok_or(SessionError::NoPendingOrder)?;

        if matches!(session.panel, Some(Panel::OrderPrompt { .. })) {
            session.panel = None;
        }

        let confirmation = format!(
            "Order confirmed: {} x {} (part {}). The part has been requested from the warehouse.",
            part.quantity, part.name, part.part_number
        );
        let turn = ConversationTurn::new(Role::Assistant, TurnContent::text(confirmation));
        Ok(session.log.append(turn).clone())
    }

    /// Feeds recognized speech through the normal message path until the
    /// provider ends.
    pub async fn listen(
        &self,
        session: &mut ChatSession,
        input: &mut dyn SpeechInputProvider,
    ) -> Result<TurnOutcome, SessionError> {
        let mut combined = TurnOutcome::default();

        if let Err(e) = input.start().await {
            combined
                .toasts
                .push(Toast::destructive("Not supported", e.to_string()));
            return Ok(combined);
        }

        while let Some(event) = input.next_event().await {
            match event {
                SpeechEvent::Transcript(transcript) => {
                    match self.handle_user_message(session, &transcript).await {
                        Ok(outcome) => {
                            combined.turns.extend(outcome.turns);
                            combined.toasts.extend(outcome.toasts);
                            if outcome.panel.is_some() {
                                combined.panel = outcome.panel;
                            }
                        }
                        Err(SessionError::EmptyMessage) => {}
                        Err(e) => {
                            input.stop().await;
                            return Err(e);
                        }
                    }
                }
                SpeechEvent::Error(message) => {
                    error!("Speech recognition error: {message}");
                    combined
                        .toasts
                        .push(Toast::destructive("Speech Recognition Error", message));
                }
                SpeechEvent::Ended => break,
            }
        }

        input.stop().await;
        combined.selected_equipment_id = session.selected_equipment_id.clone();
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{GenerateResponse, Part};
    use crate::core::schemas::ActionKind;
    use crate::core::services::GenAiActionService;
    use crate::core::router::EmergencyStatus;
    use crate::core::session::ToastVariant;
    use crate::core::speech_input::ChannelSpeechInput;
    use crate::test_support::{FakeEquipmentRepository, ScriptedModel};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    struct Harness {
        actions: GenAiActionService,
        equipment: FakeEquipmentRepository,
        config: AppConfig,
        model: Arc<ScriptedModel>,
    }

    impl Harness {
        fn new(model: ScriptedModel, config: AppConfig) -> Self {
            let model = Arc::new(model);
            Harness {
                actions: GenAiActionService::new(model.clone(), Arc::new(config.clone())),
                equipment: FakeEquipmentRepository::default(),
                config,
                model,
            }
        }

        fn quiet(model: ScriptedModel) -> Self {
            Self::new(
                model,
                AppConfig {
                    speak_responses: false,
                    find_bag_delay: Duration::from_millis(1),
                    ..AppConfig::default()
                },
            )
        }

        fn orchestrator(&self) -> Orchestrator<'_> {
            Orchestrator::new(&self.actions, &self.equipment, &self.config)
        }
    }

    fn reply(response: &str, action: ActionKind, extra: Value) -> Value {
        let mut value = json!({ "response": response, "languageCode": "en-US", "action": action.as_str() });
        if let (Some(object), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            object.extend(extra.clone());
        }
        value
    }

    async fn opened(harness: &Harness) -> ChatSession {
        let mut session = ChatSession::new();
        harness.orchestrator().open(&mut session).await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_open_greets_and_selects_first_equipment() {
        let harness = Harness::quiet(ScriptedModel::new());
        let session = opened(&harness).await;

        let turns = session.log.snapshot();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, TurnContent::text(GREETING));
        assert_eq!(session.selected_equipment_id.as_deref(), Some("cnc-001"));
    }

    #[tokio::test]
    async fn test_status_question_shows_snapshot_for_cnc_001() {
        let harness = Harness::quiet(ScriptedModel::new().then_json(reply(
            "CNC-001 is operational.",
            ActionKind::Status,
            json!({ "targetEquipment": { "id": "cnc-001", "name": "CNC Mill 3-Axis" } }),
        )));
        let mut session = opened(&harness).await;
        session.selected_equipment_id = Some("pump-003".into());

        let outcome = harness
            .orchestrator()
            .handle_user_message(&mut session, "What is the status of CNC-001?")
            .await
            .unwrap();

        match outcome.panel {
            Some(Panel::Status { equipment_id, .. }) => assert_eq!(equipment_id, "cnc-001"),
            other => panic!("unexpected panel {other:?}"),
        }
        assert!(session.pending_order.is_none());
        assert_eq!(outcome.selected_equipment_id.as_deref(), Some("cnc-001"));
        assert_eq!(outcome.turns.len(), 2);
        assert!(outcome.toasts.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_target_falls_back_to_selection() {
        let harness = Harness::quiet(ScriptedModel::new().then_json(reply(
            "Here is the log.",
            ActionKind::Report,
            json!({ "targetEquipment": { "id": "press-999", "name": "Hydraulic Press" } }),
        )));
        let mut session = opened(&harness).await;
        session.selected_equipment_id = Some("conv-002".into());

        let outcome = harness
            .orchestrator()
            .handle_user_message(&mut session, "show me the log for the press")
            .await
            .unwrap();

        match outcome.panel {
            Some(Panel::MaintenanceLog { equipment_id, .. }) => assert_eq!(equipment_id, "conv-002"),
            other => panic!("unexpected panel {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_conversation_failure_degrades_to_apology_and_toast() {
        let harness = Harness::quiet(ScriptedModel::new().then_fail("network down"));
        let mut session = opened(&harness).await;

        let outcome = harness
            .orchestrator()
            .handle_user_message(&mut session, "hello")
            .await
            .unwrap();

        assert_eq!(outcome.turns.len(), 2);
        assert_eq!(
            outcome.turns[1].content,
            TurnContent::text("Sorry, I encountered an error: Failed to get a response.")
        );
        assert_eq!(outcome.toasts[0].title, "Error");
        assert_eq!(session.log.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected_without_upstream_call() {
        let harness = Harness::quiet(ScriptedModel::new());
        let mut session = opened(&harness).await;

        let result = harness
            .orchestrator()
            .handle_user_message(&mut session, "   ")
            .await;
        assert!(matches!(result, Err(SessionError::EmptyMessage)));
        assert!(harness.model.requests().is_empty());
        assert_eq!(session.log.len(), 1);
    }

    #[tokio::test]
    async fn test_reply_is_spoken_and_tts_failure_only_adds_toast() {
        let audio = GenerateResponse {
            parts: vec![Part::Media {
                mime_type: "audio/L16;codec=pcm;rate=24000".into(),
                data: vec![0; 8],
            }],
        };
        let harness = Harness::new(
            ScriptedModel::new()
                .then_json(reply("All good.", ActionKind::None, json!({})))
                .then(audio)
                .then_json(reply("Still good.", ActionKind::None, json!({})))
                .then_text("no audio"),
            AppConfig::default(),
        );
        let mut session = opened(&harness).await;

        let spoken = harness
            .orchestrator()
            .handle_user_message(&mut session, "how are things?")
            .await
            .unwrap();
        let audio_url = spoken.turns[1].audio_url.as_deref().unwrap();
        assert!(audio_url.starts_with("data:audio/wav;base64,"));

        let silent = harness
            .orchestrator()
            .handle_user_message(&mut session, "and now?")
            .await
            .unwrap();
        assert_eq!(silent.turns[1].content, TurnContent::text("Still good."));
        assert!(silent.turns[1].audio_url.is_none());
        assert_eq!(silent.toasts.len(), 1);
        assert_eq!(silent.toasts[0].title, "Audio Error");
    }

    #[tokio::test]
    async fn test_explanation_placeholder_is_resolved_in_place() {
        let harness = Harness::quiet(
            ScriptedModel::new()
                .then_json(reply(
                    "Let me explain.",
                    ActionKind::Explanation,
                    json!({ "actionTopic": "centrifugal pump" }),
                ))
                .then_text("A centrifugal pump converts rotational energy..."),
        );
        let mut session = opened(&harness).await;

        let outcome = harness
            .orchestrator()
            .handle_user_message(&mut session, "explain how a pump works")
            .await
            .unwrap();

        let turns = session.log.snapshot();
        assert_eq!(turns.len(), 4);
        match &turns[3].content {
            TurnContent::Explanation { explanation } => {
                assert!(explanation.description.starts_with("A centrifugal pump"));
                assert_eq!(explanation.image_url, "");
            }
            other => panic!("placeholder not resolved: {other:?}"),
        }
        assert_eq!(outcome.turns.last().map(|t| t.id), Some(turns[3].id));
    }

    #[tokio::test]
    async fn test_failed_explanation_replaces_placeholder_with_apology() {
        let harness = Harness::quiet(
            ScriptedModel::new()
                .then_json(reply(
                    "Let me explain.",
                    ActionKind::Explanation,
                    json!({ "actionTopic": "gearbox" }),
                ))
                .then_fail("model overloaded"),
        );
        let mut session = opened(&harness).await;
        harness
            .orchestrator()
            .handle_user_message(&mut session, "explain the gearbox")
            .await
            .unwrap();

        let last = session.log.snapshot().pop().unwrap();
        match last.content {
            TurnContent::Text { text } => {
                assert!(text.starts_with("Sorry, I failed to create an explanation."))
            }
            other => panic!("unexpected content {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_find_bag_flow() {
        let harness = Harness::quiet(ScriptedModel::new().then_json(reply(
            "Sure.",
            ActionKind::FindBag,
            json!({}),
        )));
        let mut session = opened(&harness).await;
        let orchestrator = harness.orchestrator();

        let outcome = orchestrator
            .handle_user_message(&mut session, "where is my bag?")
            .await
            .unwrap();
        assert_eq!(outcome.panel, Some(Panel::FindBagDialog));
        assert_eq!(outcome.turns[2].content, TurnContent::text(FIND_BAG_PROMPT));
        assert_eq!(session.find_bag, FindBagState::AwaitingId);

        assert!(matches!(
            orchestrator.begin_bag_search(&mut session, "  "),
            Err(SessionError::EmptyBagId)
        ));

        let bag_id = orchestrator
            .begin_bag_search(&mut session, " BAG-007 ")
            .unwrap();
        assert_eq!(bag_id, "BAG-007");
        assert!(matches!(session.find_bag, FindBagState::Searching { .. }));
        assert!(matches!(
            orchestrator.begin_bag_search(&mut session, "BAG-008"),
            Err(SessionError::NoBagSearch)
        ));

        let location = orchestrator.finish_bag_search(&mut session, &bag_id);
        assert_eq!(location.sector, "Sector 7");
        assert!(matches!(session.find_bag, FindBagState::Located { .. }));
    }

    #[tokio::test]
    async fn test_bag_id_needs_an_open_dialog() {
        let harness = Harness::quiet(ScriptedModel::new());
        let mut session = opened(&harness).await;

        assert!(matches!(
            harness.orchestrator().begin_bag_search(&mut session, "BAG-007"),
            Err(SessionError::NoBagSearch)
        ));
        assert_eq!(session.find_bag, FindBagState::Closed);
    }

    #[tokio::test]
    async fn test_find_bag_prompt_uses_default_voice() {
        let audio = GenerateResponse {
            parts: vec![Part::Media {
                mime_type: "audio/L16;codec=pcm;rate=24000".into(),
                data: vec![0; 8],
            }],
        };
        let mut spanish = reply("Claro.", ActionKind::FindBag, json!({}));
        spanish["languageCode"] = json!("es-MX");
        let harness = Harness::new(
            ScriptedModel::new()
                .then_json(spanish)
                .then(audio.clone())
                .then(audio),
            AppConfig::default(),
        );
        let mut session = opened(&harness).await;

        harness
            .orchestrator()
            .handle_user_message(&mut session, "¿dónde está mi bolsa?")
            .await
            .unwrap();

        let requests = harness.model.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].voice.as_deref(), Some("Chitra"));
        assert_eq!(requests[2].voice.as_deref(), Some("Puck"));
    }

    #[tokio::test]
    async fn test_store_failure_keeps_the_reply_and_adds_toast() {
        let harness = Harness::quiet(ScriptedModel::new().then_json(reply(
            "Here is the log.",
            ActionKind::Report,
            json!({ "targetEquipment": { "id": "conv-002", "name": "Main Conveyor Belt" } }),
        )));
        let mut session = opened(&harness).await;
        harness.equipment.unavailable.store(true, Ordering::SeqCst);

        let outcome = harness
            .orchestrator()
            .handle_user_message(&mut session, "show the conveyor log")
            .await
            .unwrap();

        assert_eq!(outcome.turns.len(), 2);
        assert_eq!(outcome.turns[1].content, TurnContent::text("Here is the log."));
        assert!(outcome.panel.is_none());
        assert_eq!(outcome.toasts.len(), 1);
        assert_eq!(outcome.toasts[0].title, "Equipment Error");
        assert_eq!(outcome.selected_equipment_id.as_deref(), Some("cnc-001"));
        assert_eq!(session.log.len(), 3);
    }

    #[tokio::test]
    async fn test_emergency_confirmation_creates_dispatching_order() {
        let harness = Harness::quiet(ScriptedModel::new());
        let mut session = opened(&harness).await;

        let first = harness.orchestrator().confirm_emergency(&mut session);
        assert!(first.order.id.starts_with("ED-"));
        assert_eq!(first.order.status, EmergencyStatus::Dispatching);
        assert_eq!(first.toast.title, "Emergency Confirmed");
        assert_eq!(first.toast.variant, ToastVariant::Default);
        assert_eq!(
            first.toast.description,
            format!("Drone dispatch order {} has been created.", first.order.id)
        );
        assert_eq!(session.emergency_order, Some(first.order));
    }

    #[tokio::test]
    async fn test_order_prompt_and_confirmation() {
        let harness = Harness::quiet(ScriptedModel::new().then_json(reply(
            "I recommend ordering a replacement bearing.",
            ActionKind::Order,
            json!({}),
        )));
        let mut session = opened(&harness).await;
        let orchestrator = harness.orchestrator();

        assert!(matches!(
            orchestrator.confirm_order(&mut session),
            Err(SessionError::NoPendingOrder)
        ));

        let outcome = orchestrator
            .handle_user_message(&mut session, "order the part")
            .await
            .unwrap();
        assert!(matches!(outcome.panel, Some(Panel::OrderPrompt { .. })));

        let turn = orchestrator.confirm_order(&mut session).unwrap();
        assert!(matches!(turn.content, TurnContent::Text { ref text } if text.starts_with("Order confirmed")));
        assert!(session.pending_order.is_none());
        assert!(session.panel.is_none());
    }

    #[tokio::test]
    async fn test_drone_dispatch_is_static() {
        let harness = Harness::quiet(ScriptedModel::new().then_json(reply(
            "Dispatching.",
            ActionKind::Drone,
            json!({}),
        )));
        let mut session = opened(&harness).await;
        let outcome = harness
            .orchestrator()
            .handle_user_message(&mut session, "send a drone")
            .await
            .unwrap();
        assert_eq!(
            outcome.panel,
            Some(Panel::DroneDispatch {
                dispatch: DroneDispatch::default()
            })
        );
    }

    #[tokio::test]
    async fn test_diagnostics_uses_resolved_sensor_values() {
        let harness = Harness::quiet(
            ScriptedModel::new()
                .then_json(reply(
                    "Running diagnostics.",
                    ActionKind::Diagnostics,
                    json!({ "targetEquipment": { "id": "pump-003", "name": "Coolant Pump" } }),
                ))
                .then_json(json!({
                    "diagnosis": "Low pressure detected. Possible leak.",
                    "isCritical": true
                })),
        );
        let mut session = opened(&harness).await;
        let outcome = harness
            .orchestrator()
            .handle_user_message(&mut session, "diagnose the coolant pump")
            .await
            .unwrap();

        match outcome.panel {
            Some(Panel::Diagnostics { equipment_id, report }) => {
                assert_eq!(equipment_id, "pump-003");
                assert!(report.is_critical);
            }
            other => panic!("unexpected panel {other:?}"),
        }
        let prompt = format!("{:?}", harness.model.requests()[1].contents);
        assert!(prompt.contains("Pressure"));
    }

    #[tokio::test]
    async fn test_insights_failure_is_a_toast() {
        let harness = Harness::quiet(
            ScriptedModel::new()
                .then_json(reply("Checking.", ActionKind::Insights, json!({})))
                .then_fail("boom"),
        );
        let mut session = opened(&harness).await;
        let outcome = harness
            .orchestrator()
            .handle_user_message(&mut session, "any predictions?")
            .await
            .unwrap();

        assert!(outcome.panel.is_none());
        assert_eq!(outcome.toasts[0].title, "Insights Error");
        assert_eq!(outcome.toasts[0].description, "Failed to get predictive insights.");
    }

    #[tokio::test]
    async fn test_listen_routes_transcripts_and_reports_errors() {
        let harness = Harness::quiet(ScriptedModel::new().then_json(reply(
            "Hello there.",
            ActionKind::None,
            json!({}),
        )));
        let mut session = opened(&harness).await;

        let (sender, mut input) = ChannelSpeechInput::new(4);
        sender.send(SpeechEvent::Error("no-speech".into())).await.unwrap();
        sender.send(SpeechEvent::Transcript("hello".into())).await.unwrap();
        sender.send(SpeechEvent::Ended).await.unwrap();

        let outcome = harness
            .orchestrator()
            .listen(&mut session, &mut input)
            .await
            .unwrap();

        assert_eq!(outcome.toasts[0].title, "Speech Recognition Error");
        assert_eq!(outcome.turns.len(), 2);
        assert_eq!(outcome.turns[0].content, TurnContent::text("hello"));
    }

    #[tokio::test]
    async fn test_listen_without_recognizer() {
        let harness = Harness::quiet(ScriptedModel::new());
        let mut session = opened(&harness).await;
        let mut input = ChannelSpeechInput::unsupported();

        let outcome = harness
            .orchestrator()
            .listen(&mut session, &mut input)
            .await
            .unwrap();
        assert_eq!(outcome.toasts[0].title, "Not supported");
    }

    #[tokio::test]
    async fn test_select_unknown_equipment() {
        let harness = Harness::quiet(ScriptedModel::new());
        let mut session = opened(&harness).await;
        let orchestrator = harness.orchestrator();

        assert!(matches!(
            orchestrator.select_equipment(&mut session, "nope").await,
            Err(SessionError::UnknownEquipment(_))
        ));
        orchestrator
            .select_equipment(&mut session, "conv-002")
            .await
            .unwrap();
        assert_eq!(session.selected_equipment_id.as_deref(), Some("conv-002"));
    }
}
