//! Gemini `generateContent` client.

use crate::config::AppConfig;
use crate::core::error::FlowError;
use crate::core::model::{GenerateRequest, GenerateResponse, Modality, Part, Role};
use crate::core::prompts::{self, OUTPUT_FORMAT};
use crate::core::traits::GenerativeModel;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use di::{Ref, inject, injectable};
use log::{debug, error, warn};
use minijinja::context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[injectable(GenerativeModel)]
impl GeminiClient {
    #[inject]
    pub fn create(config: Ref<AppConfig>) -> GeminiClient {
        GeminiClient::new(&config)
    }
}

impl GeminiClient {
    pub fn new(config: &AppConfig) -> GeminiClient {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|e| {
                error!("cannot configure HTTP client, using defaults: {e}");
                reqwest::Client::new()
            });

        GeminiClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, FlowError> {
        if self.api_key.is_empty() {
            return Err(FlowError::upstream("GEMINI_API_KEY is not configured"));
        }

        let body = WireRequest::from_request(&request)?;
        let url = self.endpoint(&request.model);
        debug!("POST {url}");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| FlowError::Upstream {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| FlowError::Upstream {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorResponse>(&text) {
                Ok(api) => format!(
                    "Gemini API error ({}): {}",
                    api.error.status.unwrap_or_else(|| status.to_string()),
                    api.error.message
                ),
                Err(_) => format!("API returned {status}: {text}"),
            };
            warn!("{message}");
            return Err(FlowError::upstream(message));
        }

        let wire: WireResponse = serde_json::from_str(&text).map_err(|e| FlowError::Upstream {
            message: format!("failed to parse API response: {e}"),
            source: Some(Box::new(e)),
        })?;
        wire.into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    safety_settings: Vec<WireSafetySetting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<WireFunctionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<WireBlob>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBlob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool {
    function_declarations: Vec<WireFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireFunctionDeclaration {
    name: String,
    description: String,
    parameters_json_schema: Value,
}

#[derive(Debug, Serialize)]
struct WireSafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_json_schema: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    response_modalities: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

fn wire_part(part: &Part) -> WirePart {
    match part {
        Part::Text(text) => WirePart {
            text: Some(text.clone()),
            ..WirePart::default()
        },
        Part::FunctionCall { name, args } => WirePart {
            function_call: Some(WireFunctionCall {
                name: name.clone(),
                args: args.clone(),
            }),
            ..WirePart::default()
        },
        Part::FunctionResponse { name, response } => WirePart {
            function_response: Some(WireFunctionResponse {
                name: name.clone(),
                response: response.clone(),
            }),
            ..WirePart::default()
        },
        Part::Media { mime_type, data } => WirePart {
            inline_data: Some(WireBlob {
                mime_type: mime_type.clone(),
                data: STANDARD.encode(data),
            }),
            ..WirePart::default()
        },
    }
}

fn modality_name(modality: Modality) -> &'static str {
    match modality {
        Modality::Text => "TEXT",
        Modality::Audio => "AUDIO",
        Modality::Image => "IMAGE",
    }
}

impl WireRequest {
    /// Maps a provider-neutral request onto the Gemini wire format.
    ///
    /// Gemini rejects JSON mode combined with function calling, so a request
    /// with tools carries its output schema as a system instruction instead.
    pub(crate) fn from_request(request: &GenerateRequest) -> Result<WireRequest, FlowError> {
        let mut system = request.system.clone();
        let mut config = GenerationConfig::default();

        if let Some(schema) = &request.output_schema {
            if request.tools.is_empty() {
                config.response_mime_type = Some("application/json");
                config.response_json_schema = Some(schema.clone());
            } else {
                let schema = serde_json::to_string_pretty(schema)
                    .map_err(|e| FlowError::upstream(e.to_string()))?;
                let format = prompts::render(OUTPUT_FORMAT, context! { schema => schema })?;
                system = Some(match system {
                    Some(system) => format!("{system}\n\n{format}"),
                    None => format,
                });
            }
        }

        config.response_modalities = request
            .modalities
            .iter()
            .copied()
            .map(modality_name)
            .collect();
        config.speech_config = request.voice.as_ref().map(|voice| SpeechConfig {
            voice_config: VoiceConfig {
                prebuilt_voice_config: PrebuiltVoiceConfig {
                    voice_name: voice.clone(),
                },
            },
        });

        let has_config = config.response_mime_type.is_some()
            || !config.response_modalities.is_empty()
            || config.speech_config.is_some();

        Ok(WireRequest {
            system_instruction: system.map(|text| WireContent {
                role: None,
                parts: vec![WirePart {
                    text: Some(text),
                    ..WirePart::default()
                }],
            }),
            contents: request
                .contents
                .iter()
                .map(|content| WireContent {
                    role: Some(
                        match content.role {
                            Role::User => "user",
                            Role::Model => "model",
                        }
                        .to_owned(),
                    ),
                    parts: content.parts.iter().map(wire_part).collect(),
                })
                .collect(),
            tools: if request.tools.is_empty() {
                Vec::new()
            } else {
                vec![WireTool {
                    function_declarations: request
                        .tools
                        .iter()
                        .map(|tool| WireFunctionDeclaration {
                            name: tool.name.clone(),
                            description: tool.description.clone(),
                            parameters_json_schema: tool.parameters.clone(),
                        })
                        .collect(),
                }]
            },
            safety_settings: request
                .safety
                .iter()
                .map(|setting| WireSafetySetting {
                    category: setting.category,
                    threshold: setting.threshold,
                })
                .collect(),
            generation_config: has_config.then_some(config),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    content: Option<WireContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    status: Option<String>,
}

impl WireResponse {
    /// Parts of the first candidate.
    pub(crate) fn into_response(self) -> Result<GenerateResponse, FlowError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(FlowError::upstream(format!("prompt blocked: {reason}")));
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| FlowError::upstream("no candidates returned"))?;
        if let Some(reason) = &candidate.finish_reason {
            debug!("finish reason {reason}");
        }

        let mut parts = Vec::new();
        for part in candidate.content.unwrap_or_default().parts {
            if let Some(text) = part.text {
                parts.push(Part::Text(text));
            }
            if let Some(call) = part.function_call {
                parts.push(Part::FunctionCall {
                    name: call.name,
                    args: call.args,
                });
            }
            if let Some(blob) = part.inline_data {
                let data = STANDARD.decode(&blob.data).map_err(|e| FlowError::Upstream {
                    message: format!("invalid inline data: {e}"),
                    source: Some(Box::new(e)),
                })?;
                parts.push(Part::Media {
                    mime_type: blob.mime_type,
                    data,
                });
            }
        }

        Ok(GenerateResponse { parts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Content, ToolDeclaration};
    use serde_json::json;

    fn wire(request: &GenerateRequest) -> Value {
        serde_json::to_value(WireRequest::from_request(request).unwrap()).unwrap()
    }

    #[test]
    fn test_json_mode_without_tools() {
        let request = GenerateRequest::new("gemini-2.5-flash", "hi")
            .with_system("be brief")
            .with_output_schema(json!({ "type": "object" }));
        let body = wire(&request);

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            body["generationConfig"]["responseJsonSchema"],
            json!({ "type": "object" })
        );
        assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(body["safetySettings"][0]["threshold"], "BLOCK_NONE");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_tools_move_schema_into_system_instruction() {
        let request = GenerateRequest::new("m", "diagnose")
            .with_tool(ToolDeclaration {
                name: "analyzeSensorData".into(),
                description: "rules".into(),
                parameters: json!({ "type": "object" }),
            })
            .with_output_schema(json!({ "required": ["diagnosis"] }));
        let body = wire(&request);

        assert!(body.get("generationConfig").is_none());
        let system = body["systemInstruction"]["parts"][0]["text"].as_str().unwrap();
        assert!(system.contains("conform to the following schema"));
        assert!(system.contains("diagnosis"));
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "analyzeSensorData"
        );
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["parametersJsonSchema"]["type"],
            "object"
        );
    }

    #[test]
    fn test_speech_request_shape() {
        let request = GenerateRequest::new("tts", "Hello")
            .with_modalities(&[Modality::Audio])
            .with_voice("Puck");
        let body = wire(&request);

        assert_eq!(body["generationConfig"]["responseModalities"], json!(["AUDIO"]));
        assert_eq!(
            body["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Puck"
        );
    }

    #[test]
    fn test_tool_round_trip_parts() {
        let mut request = GenerateRequest::new("m", "go");
        request.contents.push(Content {
            role: Role::Model,
            parts: vec![Part::FunctionCall {
                name: "analyzeSensorData".into(),
                args: json!({ "equipmentType": "Pump" }),
            }],
        });
        request.contents.push(Content {
            role: Role::User,
            parts: vec![Part::FunctionResponse {
                name: "analyzeSensorData".into(),
                response: json!({ "isCritical": false }),
            }],
        });
        let body = wire(&request);

        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(
            body["contents"][1]["parts"][0]["functionCall"]["args"]["equipmentType"],
            "Pump"
        );
        assert_eq!(
            body["contents"][2]["parts"][0]["functionResponse"]["response"]["isCritical"],
            false
        );
    }

    #[test]
    fn test_parse_mixed_parts() {
        let wire: WireResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "Here" },
                        { "functionCall": { "name": "analyzeSensorData", "args": { "a": 1 } } },
                        { "inlineData": { "mimeType": "audio/L16;rate=24000", "data": "AAEC" } }
                    ]
                },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        let response = wire.into_response().unwrap();
        assert_eq!(response.text().as_deref(), Some("Here"));
        assert_eq!(response.function_calls()[0].0, "analyzeSensorData");
        assert_eq!(response.media("audio/").unwrap().1, &[0, 1, 2]);
    }

    #[test]
    fn test_blocked_prompt_is_upstream_error() {
        let wire: WireResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        assert!(matches!(
            wire.into_response(),
            Err(FlowError::Upstream { message, .. }) if message.contains("SAFETY")
        ));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = GeminiClient::new(&AppConfig {
            base_url: "http://localhost:9999/".into(),
            ..AppConfig::default()
        });
        assert_eq!(
            client.endpoint("gemini-2.5-flash"),
            "http://localhost:9999/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
