//! Input and output records of every flow.
//!
//! Field doc comments become the `description` keywords of the generated JSON
//! Schema and are sent upstream as generation hints, so they are written for
//! the model as much as for the reader.

use crate::core::error::FlowError;
use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Closed set of intents the conversational flow may classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Diagnostics,
    Insights,
    Report,
    Order,
    Drone,
    Status,
    FindBag,
    Explanation,
    None,
}

impl ActionKind {
    pub const ALL: [ActionKind; 9] = [
        ActionKind::Diagnostics,
        ActionKind::Insights,
        ActionKind::Report,
        ActionKind::Order,
        ActionKind::Drone,
        ActionKind::Status,
        ActionKind::FindBag,
        ActionKind::Explanation,
        ActionKind::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Diagnostics => "diagnostics",
            ActionKind::Insights => "insights",
            ActionKind::Report => "report",
            ActionKind::Order => "order",
            ActionKind::Drone => "drone",
            ActionKind::Status => "status",
            ActionKind::FindBag => "find-bag",
            ActionKind::Explanation => "explanation",
            ActionKind::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversationalResponseInput {
    /// The user's query.
    pub user_input: String,
    /// The ID of the currently selected equipment.
    pub selected_equipment_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SensorSnapshot {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub history: Option<Vec<HistorySnapshot>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HistorySnapshot {
    pub time: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MaintenanceSnapshot {
    pub id: String,
    pub date: String,
    pub description: String,
    pub status: String,
}

/// Equipment as named by the model. Only `id` and `name` are trustworthy; the
/// caller resolves the full record against the equipment store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentSnapshot {
    /// Equipment identifier, e.g. 'cnc-001'.
    pub id: String,
    /// Human readable equipment name, e.g. 'Main Conveyor Belt'.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub sensors: Option<Vec<SensorSnapshot>>,
    pub maintenance_log: Option<Vec<MaintenanceSnapshot>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversationalResponseOutput {
    /// The conversational response to the user in their language.
    pub response: String,
    /// The IETF language tag for the user's language (e.g., 'en-US', 'es-ES', 'fr-FR').
    pub language_code: Option<String>,
    /// The suggested action to take.
    pub action: Option<ActionKind>,
    /// The topic for the action, e.g., what to explain.
    pub action_topic: Option<String>,
    /// The equipment the user is asking about.
    pub target_equipment: Option<EquipmentSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsInput {
    /// A record of sensor readings where keys are sensor names and values are the sensor reading values.
    pub sensor_data: BTreeMap<String, f64>,
    /// The type of equipment the sensors are attached to.
    pub equipment_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsOutput {
    /// A detailed diagnosis of the equipment health based on the sensor data.
    pub diagnosis: String,
    /// Whether the situation requires immediate attention.
    pub is_critical: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsightsInput {
    /// The ID of the equipment to analyze.
    pub equipment_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InsightsOutput {
    /// Actionable insights based on machine learning predictions.
    pub insights: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextToSpeechInput {
    /// The text to convert to speech.
    pub text: String,
    /// The IETF language tag for the text (e.g., 'en-US', 'es-ES').
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TextToSpeechOutput {
    /// The base64 encoded audio file in WAV format, as a data URI.
    pub audio: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VisualExplanationInput {
    /// The topic to explain visually.
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisualExplanationOutput {
    /// The detailed text explanation.
    pub description: String,
    /// The data URI of the generated image, empty in text-only mode.
    pub image_url: String,
}

/// JSON Schema of `T` as a plain JSON value.
pub fn json_schema<T: JsonSchema>() -> serde_json::Value {
    schema_for!(T).to_value()
}

/// Validates `value` against the schema of `T`, then deserializes it.
///
/// Every violation is reported; nothing is coerced.
pub fn validate_value<T>(flow: &'static str, value: serde_json::Value) -> Result<T, FlowError>
where
    T: JsonSchema + DeserializeOwned,
{
    let schema = json_schema::<T>();
    let validator = jsonschema::validator_for(&schema)
        .map_err(|e| FlowError::schema(flow, format!("invalid schema: {e}")))?;

    let errors: Vec<String> = validator
        .iter_errors(&value)
        .map(|e| format!("{e} at `{}`", e.instance_path))
        .collect();

    if !errors.is_empty() {
        return Err(FlowError::SchemaValidation { flow, errors });
    }

    serde_json::from_value(value).map_err(|e| FlowError::schema(flow, e.to_string()))
}

/// Parses structured model text into `T`.
pub fn parse_output<T>(flow: &'static str, text: &str) -> Result<T, FlowError>
where
    T: JsonSchema + DeserializeOwned,
{
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| FlowError::schema(flow, format!("output is not JSON: {e}")))?;
    validate_value(flow, value)
}

/// Removes a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // drop the info string ("json") on the opening line
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}
