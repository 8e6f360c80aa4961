//! HTTP API v1.
//!
//! Endpoints:
//!
//! - `POST /api/v1/chat`: send the conversation so far, get one assistant reply

use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Json;
use axum::routing::post;
use tracing::Instrument;
use uuid::Uuid;

use codecoach_core::message::{ChatRequest, ChatResponse};

use crate::SharedState;
use crate::error::ApiError;

/// Build the `/api/v1` router.
pub fn v1_router() -> Router<SharedState> {
    Router::new().route("/chat", post(chat_handler))
}

async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;

    let span = tracing::info_span!("chat", request_id = %Uuid::new_v4());
    let response = state.agent.respond(request).instrument(span).await?;

    Ok(Json(response))
}
