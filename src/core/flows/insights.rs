//! Predictive maintenance insights. Pure prompt pass-through.

use crate::config::AppConfig;
use crate::core::error::FlowError;
use crate::core::flows::generate_structured;
use crate::core::model::GenerateRequest;
use crate::core::prompts::{self, INSIGHTS_PROMPT};
use crate::core::schemas::{InsightsInput, InsightsOutput, json_schema};
use crate::core::traits::GenerativeModel;
use minijinja::context;

pub const FLOW: &str = "predictiveMaintenanceInsightsFlow";

pub async fn predictive_insights(
    model: &dyn GenerativeModel,
    config: &AppConfig,
    input: &InsightsInput,
) -> Result<InsightsOutput, FlowError> {
    let prompt = prompts::render(
        INSIGHTS_PROMPT,
        context! { equipment_id => &input.equipment_id },
    )?;
    let request = GenerateRequest::new(&config.text_model, prompt)
        .with_output_schema(json_schema::<InsightsOutput>());

    generate_structured(model, request, FLOW).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedModel;
    use serde_json::json;

    #[tokio::test]
    async fn test_prompt_names_equipment() {
        let model = ScriptedModel::new()
            .then_json(json!({ "insights": "Schedule a bearing inspection within 2 weeks." }));
        let output = predictive_insights(
            &model,
            &AppConfig::default(),
            &InsightsInput {
                equipment_id: "conv-002".into(),
            },
        )
        .await
        .unwrap();

        assert!(output.insights.contains("bearing"));
        let request = model.requests().remove(0);
        assert!(format!("{:?}", request.contents).contains("conv-002"));
    }

    #[tokio::test]
    async fn test_empty_insights_pass_through() {
        let model = ScriptedModel::new().then_json(json!({ "insights": "" }));
        let output = predictive_insights(
            &model,
            &AppConfig::default(),
            &InsightsInput {
                equipment_id: "pump-003".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(output.insights, "");
    }
}
