use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use log::{info, warn};

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::{AppError, ErrorCode};
use crate::types::{HealthResponse, NotifyResponse};
use crate::validate;

pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: Dispatcher,
}

pub async fn notify(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, AppError> {
    let body = body.map_err(|rejection| {
        warn!("Could not read lead submission body: {}", rejection.body_text());
        AppError::with_details(ErrorCode::MalformedBody, rejection.body_text())
    })?;
    let lead = validate::parse_lead(&body, state.config.require_message).inspect_err(|e| {
        warn!("Rejected lead submission: {}", e);
    })?;

    info!("Lead received for location {:?}", lead.location);
    let message_id = state.dispatcher.dispatch(&lead).await?;

    Ok((StatusCode::OK, Json(NotifyResponse::sent(message_id))))
}

pub async fn method_not_allowed(method: Method) -> AppError {
    AppError::with_details(ErrorCode::InvalidMethod, format!("{method} is not allowed"))
}

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        channels: state.config.channels.names(),
    })
}
