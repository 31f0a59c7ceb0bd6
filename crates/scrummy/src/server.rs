//! HTTP server for GitHub webhooks.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::router::Dispatcher;
use crate::webhooks::{verify_signature, DELIVERY_HEADER, EVENT_HEADER, SIGNATURE_HEADER};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Routes verified deliveries to the reconcilers.
    pub dispatcher: Dispatcher,
    /// Shared secret for `X-Hub-Signature`.
    pub webhook_secret: Arc<str>,
}

impl AppState {
    #[must_use]
    pub fn new(dispatcher: Dispatcher, webhook_secret: &str) -> Self {
        Self {
            dispatcher,
            webhook_secret: Arc::from(webhook_secret),
        }
    }
}

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(github_webhook_handler))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

fn header<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Handle an incoming GitHub webhook.
///
/// This handler:
/// 1. Verifies the `X-Hub-Signature` against the raw body
/// 2. Parses the JSON payload
/// 3. Hands the event to the dispatcher on its own task and answers 200
///
/// Reconciliation failures are logged, never reported to GitHub.
pub async fn github_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    let delivery_id = header(&headers, DELIVERY_HEADER)
        .unwrap_or("unknown")
        .to_string();
    let event_type = header(&headers, EVENT_HEADER)
        .unwrap_or("unknown")
        .to_string();

    info!(
        delivery_id = %delivery_id,
        event_type = %event_type,
        "Received GitHub webhook"
    );

    let Some(signature) = header(&headers, SIGNATURE_HEADER) else {
        warn!(delivery_id = %delivery_id, "Missing X-Hub-Signature header");
        return Err(StatusCode::FORBIDDEN);
    };

    if !verify_signature(&body, signature, &state.webhook_secret) {
        warn!(delivery_id = %delivery_id, "Invalid webhook signature");
        return Err(StatusCode::FORBIDDEN);
    }
    debug!("Webhook signature verified");

    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        error!("Failed to parse webhook payload: {e}");
        StatusCode::BAD_REQUEST
    })?;

    let dispatcher = state.dispatcher.clone();
    let delivery = delivery_id.clone();
    let event = event_type.clone();
    tokio::spawn(async move {
        dispatcher.handle(&delivery, &event, payload).await;
    });

    Ok(Json(json!({
        "status": "accepted",
        "delivery_id": delivery_id,
        "event_type": event_type
    })))
}
