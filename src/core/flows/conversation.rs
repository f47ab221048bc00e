//! Conversational routing: persona reply, language tag, and intent.

use crate::config::AppConfig;
use crate::core::error::FlowError;
use crate::core::flows::generate_structured;
use crate::core::model::GenerateRequest;
use crate::core::prompts::{self, CONVERSATION_PROMPT, CONVERSATION_SYSTEM};
use crate::core::schemas::{
    ActionKind, ConversationalResponseInput, ConversationalResponseOutput, json_schema,
};
use crate::core::traits::GenerativeModel;
use log::debug;
use minijinja::context;

pub const FLOW: &str = "conversationalResponseFlow";

pub async fn conversational_response(
    model: &dyn GenerativeModel,
    config: &AppConfig,
    input: &ConversationalResponseInput,
) -> Result<ConversationalResponseOutput, FlowError> {
    let actions: Vec<&str> = ActionKind::ALL.iter().map(ActionKind::as_str).collect();
    let system = prompts::render(CONVERSATION_SYSTEM, context! { actions => actions })?;
    let prompt = prompts::render(
        CONVERSATION_PROMPT,
        context! {
            user_input => &input.user_input,
            selected_equipment_id => &input.selected_equipment_id,
        },
    )?;

    let request = GenerateRequest::new(&config.text_model, prompt)
        .with_system(system)
        .with_output_schema(json_schema::<ConversationalResponseOutput>());

    let output: ConversationalResponseOutput = generate_structured(model, request, FLOW).await?;
    debug!(
        "conversational response: action={:?} language={:?}",
        output.action, output.language_code
    );
    Ok(output)
}
