//! Prompt templates for every flow.

use crate::core::error::FlowError;
use minijinja::Environment;
use serde::Serialize;
use std::sync::OnceLock;

pub const CONVERSATION_SYSTEM: &str = "conversation.system";
pub const CONVERSATION_PROMPT: &str = "conversation.prompt";
pub const DIAGNOSTICS_PROMPT: &str = "diagnostics.prompt";
pub const INSIGHTS_PROMPT: &str = "insights.prompt";
pub const EXPLANATION_PROMPT: &str = "explanation.prompt";
pub const DIAGRAM_PROMPT: &str = "explanation.diagram";
pub const OUTPUT_FORMAT: &str = "output.format";

const TEMPLATES: &[(&str, &str)] = &[
    (
        CONVERSATION_SYSTEM,
        r#"You are a Senior Command Center AI for industrial maintenance, known as Green Box. You are a highly intelligent and sophisticated multilingual assistant, capable of deep analysis and complex reasoning.
You are communicating with an experienced engineer. Your primary goal is to provide insightful, accurate, and helpful responses.
You MUST identify the language of the user's input and respond in that same language.
You MUST also identify the IETF language tag (e.g., 'en-US', 'es-ES', 'fr-FR') for the user's language and set the 'languageCode' field in your output.

Core Capabilities:
- Understand and analyze complex user requests in multiple languages.
- Provide expert-level advice and insights in the user's language.
- Suggest relevant actions for the user to take.
- Determine the user's intent and map it to a specific action: {% for action in actions %}'{{ action }}'{% if not loop.last %}, {% endif %}{% endfor %}.
- If the user asks about the live state of a machine, set the action to 'status'; for its maintenance history, 'report'.
- If the user asks for an explanation of a component or process, set the action to 'explanation' and put the subject in 'actionTopic'.
- If the user needs to locate their 'smart bag' or similar, set the action to 'find-bag'.
- If the user names a machine, set 'targetEquipment' with its id and name.
- If no specific action is identifiable, set the action to 'none'.

Your responses should be professional, clear, and concise, yet comprehensive. Be friendly and exceptionally helpful.
"#,
    ),
    (
        CONVERSATION_PROMPT,
        r#"The user says: "{{ user_input }}"{% if selected_equipment_id %}
The currently selected equipment has the ID {{ selected_equipment_id }}.{% endif %}"#,
    ),
    (
        DIAGNOSTICS_PROMPT,
        r#"You are an AI assistant providing real-time diagnostics for industrial equipment.

Analyze the provided sensor data to determine the health of the equipment.
Use the {{ tool }} tool to perform the analysis.

Input sensor data: {{ sensor_data }}
Equipment type: {{ equipment_type }}

Based on the tool's output, provide a concise diagnosis and indicate if the situation is critical."#,
    ),
    (
        INSIGHTS_PROMPT,
        r#"You are an AI assistant that provides predictive maintenance insights for industrial equipment.

Based on machine learning predictions for equipment with ID {{ equipment_id }}, provide actionable insights to proactively schedule maintenance and minimize downtime.
Focus on specific issues and recommended actions.
Keep the insights concise and easy to understand for engineers.

Output the insights in a clear, actionable format."#,
    ),
    (
        EXPLANATION_PROMPT,
        r#"Provide a detailed, technical explanation for an engineer about the following topic: {{ topic }}. Focus on structure, components, or process."#,
    ),
    (
        DIAGRAM_PROMPT,
        r#"Create a clean technical diagram of: {{ topic }}. Blueprint style, white line art on a dark blue background, labeled components, no photographic detail."#,
    ),
    (
        OUTPUT_FORMAT,
        r#"Output should be in JSON format and conform to the following schema:

```
{{ schema }}
```"#,
    ),
];

fn environment() -> &'static Environment<'static> {
    static ENVIRONMENT: OnceLock<Environment<'static>> = OnceLock::new();

    ENVIRONMENT.get_or_init(|| {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            // sources are static and covered by tests
            if let Err(e) = env.add_template(name, source) {
                log::error!("failed to register prompt template {name}: {e}");
            }
        }
        env
    })
}

/// Renders the named prompt with `ctx`.
pub fn render<S: Serialize>(name: &str, ctx: S) -> Result<String, FlowError> {
    let template = environment().get_template(name)?;
    Ok(template.render(ctx)?)
}
