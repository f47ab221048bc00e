//! Real-time diagnostics from sensor data.
//!
//! The rule evaluator [`analyze_sensor_data`] is exposed to the model as the
//! `analyzeSensorData` tool; the model composes the final diagnosis from the
//! tool's verdict.

use crate::config::AppConfig;
use crate::core::error::FlowError;
use crate::core::model::{Content, GenerateRequest, Part, Role, ToolDeclaration};
use crate::core::prompts::{self, DIAGNOSTICS_PROMPT};
use crate::core::schemas::{
    DiagnosticsInput, DiagnosticsOutput, json_schema, parse_output, validate_value,
};
use crate::core::traits::GenerativeModel;
use log::{debug, warn};
use minijinja::context;
use serde_json::json;
use std::fmt::Write;

pub const FLOW: &str = "realTimeDiagnosticsFlow";
pub const TOOL_NAME: &str = "analyzeSensorData";

/// Readings strictly above this on a temperature sensor are critical.
pub const MAX_TEMPERATURE: f64 = 100.0;
/// Readings strictly below this on a pressure sensor are critical.
pub const MIN_PRESSURE: f64 = 10.0;

const MAX_TOOL_ROUNDS: usize = 4;

/// Deterministic health rules over current sensor values.
pub fn analyze_sensor_data(input: &DiagnosticsInput) -> DiagnosticsOutput {
    let mut diagnosis = format!("Analyzing sensor data for {}:\n", input.equipment_type);
    let mut is_critical = false;

    for (sensor, value) in &input.sensor_data {
        let _ = writeln!(diagnosis, "{sensor}: {value}");
        let name = sensor.to_lowercase();
        if name.contains("temperature") && *value > MAX_TEMPERATURE {
            diagnosis.push_str("High temperature detected. Possible overheating.\n");
            is_critical = true;
        }
        if name.contains("pressure") && *value < MIN_PRESSURE {
            diagnosis.push_str("Low pressure detected. Possible leak.\n");
            is_critical = true;
        }
    }

    if !is_critical {
        diagnosis.push_str("No critical issues detected based on current sensor data.\n");
    }

    DiagnosticsOutput {
        diagnosis,
        is_critical,
    }
}

pub fn analyze_sensor_data_tool() -> ToolDeclaration {
    ToolDeclaration {
        name: TOOL_NAME.to_owned(),
        description: "Analyzes sensor data to provide a diagnosis of equipment health.".to_owned(),
        parameters: json_schema::<DiagnosticsInput>(),
    }
}

pub async fn real_time_diagnostics(
    model: &dyn GenerativeModel,
    config: &AppConfig,
    input: &DiagnosticsInput,
) -> Result<DiagnosticsOutput, FlowError> {
    let sensor_data = serde_json::to_string(&input.sensor_data)
        .map_err(|e| FlowError::schema(FLOW, e.to_string()))?;
    let prompt = prompts::render(
        DIAGNOSTICS_PROMPT,
        context! {
            tool => TOOL_NAME,
            sensor_data => sensor_data,
            equipment_type => &input.equipment_type,
        },
    )?;

    let mut request = GenerateRequest::new(&config.text_model, prompt)
        .with_tool(analyze_sensor_data_tool())
        .with_output_schema(json_schema::<DiagnosticsOutput>());

    for round in 0..MAX_TOOL_ROUNDS {
        let response = model.generate(request.clone()).await?;
        let calls = response.function_calls();

        if calls.is_empty() {
            let text = response
                .text()
                .ok_or_else(|| FlowError::schema(FLOW, "model returned no structured output"))?;
            return parse_output(FLOW, &text);
        }

        let mut replies = Vec::with_capacity(calls.len());
        for (name, args) in calls {
            if name != TOOL_NAME {
                warn!("model called unknown tool `{name}`");
                return Err(FlowError::upstream(format!("model called unknown tool `{name}`")));
            }
            let args: DiagnosticsInput = validate_value(TOOL_NAME, args.clone())?;
            let verdict = analyze_sensor_data(&args);
            debug!("tool round {round}: critical={}", verdict.is_critical);
            replies.push(Part::FunctionResponse {
                name: TOOL_NAME.to_owned(),
                response: json!({
                    "diagnosis": verdict.diagnosis,
                    "isCritical": verdict.is_critical,
                }),
            });
        }

        request.contents.push(Content {
            role: Role::Model,
            parts: response.parts.clone(),
        });
        request.contents.push(Content {
            role: Role::User,
            parts: replies,
        });
    }

    Err(FlowError::upstream(format!(
        "diagnostics did not settle after {MAX_TOOL_ROUNDS} tool rounds"
    )))
}
