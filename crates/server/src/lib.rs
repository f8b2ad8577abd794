//! HTTP surface: health, voice webhooks, and the payment webhook.
//!
//! Voice endpoints must answer with valid TwiML no matter what happens
//! inside; the telephony platform treats anything else as a dropped call.
//! The payment webhook verifies its signature over the raw body, answers
//! 202 immediately, and hands fulfillment to a spawned task.

pub mod scheduler;
pub mod wiring;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Form, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use emberline_channels::validate_signature;
use emberline_pipeline::{PaidOrder, ReportFulfillment};
use emberline_voice::VoiceAgent;
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use wiring::{build_services, run, Services};

pub struct AppState {
    voice: Arc<VoiceAgent>,
    fulfillment: Arc<ReportFulfillment>,
    webhook_secret: String,
}

impl AppState {
    pub fn new(
        voice: Arc<VoiceAgent>,
        fulfillment: Arc<ReportFulfillment>,
        webhook_secret: String,
    ) -> Self {
        Self {
            voice,
            fulfillment,
            webhook_secret,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/voice/incoming_call", post(voice_incoming))
        .route("/voice/respond", post(voice_respond))
        .route("/webhooks/lemonsqueezy", post(payment_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    axum::Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
struct IncomingCallForm {
    #[serde(rename = "CallSid")]
    call_sid: String,
}

#[derive(Deserialize)]
struct RespondForm {
    #[serde(rename = "CallSid")]
    call_sid: String,
    #[serde(rename = "SpeechResult")]
    speech_result: Option<String>,
    #[serde(rename = "Digits")]
    digits: Option<String>,
}

async fn voice_incoming(
    State(state): State<Arc<AppState>>,
    Form(form): Form<IncomingCallForm>,
) -> Response {
    let directive = state.voice.handle_incoming(&form.call_sid).await;
    twiml_response(directive.to_twiml())
}

async fn voice_respond(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RespondForm>,
) -> Response {
    let utterance = form.speech_result.or(form.digits);
    let directive = state
        .voice
        .handle_respond(&form.call_sid, utterance.as_deref())
        .await;
    twiml_response(directive.to_twiml())
}

fn twiml_response(twiml: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        twiml,
    )
        .into_response()
}

#[derive(Deserialize)]
struct PaymentEvent {
    meta: PaymentMeta,
    data: OrderData,
}

#[derive(Deserialize)]
struct PaymentMeta {
    event_name: String,
}

#[derive(Deserialize)]
struct OrderData {
    id: String,
    attributes: OrderAttributes,
}

#[derive(Deserialize)]
struct OrderAttributes {
    #[serde(default)]
    status: String,
    #[serde(default)]
    user_email: Option<String>,
    #[serde(default)]
    first_order_item: Option<FirstOrderItem>,
}

#[derive(Deserialize)]
struct FirstOrderItem {
    product_name: String,
}

async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers
        .get("X-Signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !validate_signature(&state.webhook_secret, &body, signature) {
        warn!("payment webhook rejected: bad signature");
        return StatusCode::UNAUTHORIZED;
    }

    let event: PaymentEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(err) => {
            warn!(error = %err, "payment webhook rejected: unparseable body");
            return StatusCode::BAD_REQUEST;
        }
    };

    let is_paid = match event.meta.event_name.as_str() {
        "order_created" => event.data.attributes.status == "paid",
        "order_paid" => true,
        _ => false,
    };
    if !is_paid {
        info!(event = %event.meta.event_name, "payment webhook acknowledged, no action");
        return StatusCode::ACCEPTED;
    }

    let Some(customer_email) = event.data.attributes.user_email else {
        warn!(order_id = %event.data.id, "paid order carries no customer email");
        return StatusCode::ACCEPTED;
    };
    let product_name = event
        .data
        .attributes
        .first_order_item
        .map(|item| item.product_name)
        .unwrap_or_else(|| "Business Report".to_string());

    let order = PaidOrder {
        order_id: event.data.id,
        customer_email,
        product_name,
    };

    // Fulfillment takes minutes; the webhook must not.
    let fulfillment = state.fulfillment.clone();
    tokio::spawn(async move {
        fulfillment.fulfill(order).await;
    });

    StatusCode::ACCEPTED
}
