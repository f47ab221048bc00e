//! Visual explanation: technical text, plus a diagram in diagram mode.

use crate::config::{AppConfig, ExplanationMode};
use crate::core::error::FlowError;
use crate::core::model::{GenerateRequest, Modality};
use crate::core::prompts::{self, DIAGRAM_PROMPT, EXPLANATION_PROMPT};
use crate::core::schemas::{VisualExplanationInput, VisualExplanationOutput};
use crate::core::traits::GenerativeModel;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures_util::future::try_join;
use minijinja::context;

pub const FLOW: &str = "visualExplanationFlow";

async fn describe(
    model: &dyn GenerativeModel,
    config: &AppConfig,
    topic: &str,
) -> Result<String, FlowError> {
    let prompt = prompts::render(EXPLANATION_PROMPT, context! { topic => topic })?;
    let response = model
        .generate(GenerateRequest::new(&config.text_model, prompt))
        .await?;

    response
        .text()
        .ok_or_else(|| FlowError::schema(FLOW, "description is empty"))
}

async fn diagram(
    model: &dyn GenerativeModel,
    config: &AppConfig,
    topic: &str,
) -> Result<String, FlowError> {
    let prompt = prompts::render(DIAGRAM_PROMPT, context! { topic => topic })?;
    let request = GenerateRequest::new(&config.image_model, prompt)
        .with_modalities(&[Modality::Text, Modality::Image]);

    let response = model.generate(request).await?;
    let (mime_type, data) = response
        .media("image/")
        .ok_or(FlowError::NoMediaReturned)?;

    Ok(format!("data:{mime_type};base64,{}", STANDARD.encode(data)))
}

pub async fn visual_explanation(
    model: &dyn GenerativeModel,
    config: &AppConfig,
    input: &VisualExplanationInput,
) -> Result<VisualExplanationOutput, FlowError> {
    let topic = input.topic.trim();
    if topic.is_empty() {
        return Err(FlowError::schema(FLOW, "topic is empty"));
    }

    let (description, image_url) = match config.explanation_mode {
        ExplanationMode::TextOnly => (describe(model, config, topic).await?, String::new()),
        ExplanationMode::TextAndDiagram => {
            try_join(
                describe(model, config, topic),
                diagram(model, config, topic),
            )
            .await?
        }
    };

    Ok(VisualExplanationOutput {
        description,
        image_url,
    })
}
