//! One module per generative-AI flow.
//!
//! A flow renders its prompt, issues one (or, for diagrams, two) upstream
//! requests and returns a schema-validated output. Flows never retry and never
//! substitute defaults for missing output.

pub mod conversation;
pub mod diagnostics;
pub mod explanation;
pub mod insights;
pub mod speech;

use crate::core::error::FlowError;
use crate::core::model::GenerateRequest;
use crate::core::schemas::parse_output;
use crate::core::traits::GenerativeModel;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

/// Sends `request` and parses the text answer as `T`.
pub(crate) async fn generate_structured<T>(
    model: &dyn GenerativeModel,
    request: GenerateRequest,
    flow: &'static str,
) -> Result<T, FlowError>
where
    T: JsonSchema + DeserializeOwned,
{
    let response = model.generate(request).await?;
    let text = response
        .text()
        .ok_or_else(|| FlowError::schema(flow, "model returned no structured output"))?;
    parse_output(flow, &text)
}
