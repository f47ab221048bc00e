//! Server actions: one endpoint per flow, answering with the envelope

use crate::core::envelope::Envelope;
use crate::core::error::FlowError;
use crate::core::flows::{conversation, diagnostics, explanation, insights, speech};
use crate::core::schemas::{
    ConversationalResponseInput, ConversationalResponseOutput, DiagnosticsInput,
    DiagnosticsOutput, InsightsInput, InsightsOutput, TextToSpeechInput, TextToSpeechOutput,
    VisualExplanationInput, VisualExplanationOutput, validate_value,
};
use crate::core::traits::ActionService;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use di_axum::Inject;
use log::warn;
use serde_json::Value;

type Reply<T> = (StatusCode, Json<Envelope<T>>);

pub fn router() -> Router {
    Router::new()
        .route("/conversational-response", post(conversational_response))
        .route("/diagnostics", post(get_diagnostics))
        .route("/insights", post(get_insights))
        .route("/text-to-speech", post(text_to_speech))
        .route("/explain", post(explain))
}

fn ok<T>(envelope: Envelope<T>) -> Reply<T> {
    (StatusCode::OK, Json(envelope))
}

/// Input that does not match its schema never reaches the flow.
fn rejected<T>(e: FlowError) -> Reply<T> {
    warn!("{e}");
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(Envelope::Failure(e.to_string())),
    )
}

/// A body that is not JSON at all still gets an envelope.
fn unreadable<T>(rejection: JsonRejection) -> Reply<T> {
    warn!("unreadable action body: {rejection}");
    (
        rejection.status(),
        Json(Envelope::Failure(rejection.body_text())),
    )
}

async fn conversational_response(
    Inject(actions): Inject<dyn ActionService>,
    body: Result<Json<Value>, JsonRejection>,
) -> Reply<ConversationalResponseOutput> {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return unreadable(rejection),
    };
    match validate_value::<ConversationalResponseInput>(conversation::FLOW, body) {
        Ok(input) => ok(actions.get_conversational_response(input).await),
        Err(e) => rejected(e),
    }
}

async fn get_diagnostics(
    Inject(actions): Inject<dyn ActionService>,
    body: Result<Json<Value>, JsonRejection>,
) -> Reply<DiagnosticsOutput> {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return unreadable(rejection),
    };
    match validate_value::<DiagnosticsInput>(diagnostics::FLOW, body) {
        Ok(input) => ok(actions.get_diagnostics(input).await),
        Err(e) => rejected(e),
    }
}

async fn get_insights(
    Inject(actions): Inject<dyn ActionService>,
    body: Result<Json<Value>, JsonRejection>,
) -> Reply<InsightsOutput> {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return unreadable(rejection),
    };
    match validate_value::<InsightsInput>(insights::FLOW, body) {
        Ok(input) => ok(actions.get_insights(input).await),
        Err(e) => rejected(e),
    }
}

async fn text_to_speech(
    Inject(actions): Inject<dyn ActionService>,
    body: Result<Json<Value>, JsonRejection>,
) -> Reply<TextToSpeechOutput> {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return unreadable(rejection),
    };
    match validate_value::<TextToSpeechInput>(speech::FLOW, body) {
        Ok(input) => ok(actions.text_to_speech(input).await),
        Err(e) => rejected(e),
    }
}

async fn explain(
    Inject(actions): Inject<dyn ActionService>,
    body: Result<Json<Value>, JsonRejection>,
) -> Reply<VisualExplanationOutput> {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return unreadable(rejection),
    };
    match validate_value::<VisualExplanationInput>(explanation::FLOW, body) {
        Ok(input) => ok(actions.explain(input).await),
        Err(e) => rejected(e),
    }
}
