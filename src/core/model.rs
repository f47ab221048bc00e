//! Provider-neutral request and response shapes for the generative model.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    FunctionCall { name: String, args: Value },
    FunctionResponse { name: String, response: Value },
    Media { mime_type: String, data: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Content {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Text,
    Audio,
    Image,
}

/// A function the model may call instead of answering directly.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetySetting {
    pub category: &'static str,
    pub threshold: &'static str,
}

/// The four harm categories, each at the most permissive threshold.
pub fn permissive_safety_settings() -> Vec<SafetySetting> {
    [
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    ]
    .into_iter()
    .map(|category| SafetySetting {
        category,
        threshold: "BLOCK_NONE",
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub system: Option<String>,
    pub contents: Vec<Content>,
    /// JSON Schema the final text answer must conform to.
    pub output_schema: Option<Value>,
    pub tools: Vec<ToolDeclaration>,
    pub modalities: Vec<Modality>,
    pub voice: Option<String>,
    pub safety: Vec<SafetySetting>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        GenerateRequest {
            model: model.into(),
            system: None,
            contents: vec![Content::user_text(prompt)],
            output_schema: None,
            tools: Vec::new(),
            modalities: Vec::new(),
            voice: None,
            safety: permissive_safety_settings(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn with_tool(mut self, tool: ToolDeclaration) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_modalities(mut self, modalities: &[Modality]) -> Self {
        self.modalities = modalities.to_vec();
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerateResponse {
    pub parts: Vec<Part>,
}

impl GenerateResponse {
    /// Concatenated text parts, `None` when there are none or they are blank.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();

        (!text.trim().is_empty()).then_some(text)
    }

    pub fn function_calls(&self) -> Vec<(&str, &Value)> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::FunctionCall { name, args } => Some((name.as_str(), args)),
                _ => None,
            })
            .collect()
    }

    /// First media part whose mime type starts with `prefix`.
    pub fn media(&self, prefix: &str) -> Option<(&str, &[u8])> {
        self.parts.iter().find_map(|part| match part {
            Part::Media { mime_type, data } if mime_type.starts_with(prefix) => {
                Some((mime_type.as_str(), data.as_slice()))
            }
            _ => None,
        })
    }
}
