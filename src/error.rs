use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::types::NotifyResponse;

/// Stable error codes returned in the `error` field of a failed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidMethod,
    MalformedBody,
    MissingFields,
    ServerConfig,
    ProviderSend,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidMethod => "INVALID_METHOD",
            Self::MalformedBody => "MALFORMED_BODY",
            Self::MissingFields => "MISSING_FIELDS",
            Self::ServerConfig => "SERVER_CONFIG_ERROR",
            Self::ProviderSend => "PROVIDER_SEND_ERROR",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            Self::InvalidMethod => StatusCode::METHOD_NOT_ALLOWED,
            Self::MalformedBody | Self::MissingFields => StatusCode::BAD_REQUEST,
            Self::ServerConfig | Self::ProviderSend => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    pub code: ErrorCode,
    pub details: Option<String>,
}

impl AppError {
    pub fn with_details(code: ErrorCode, details: impl Into<String>) -> Self {
        Self {
            code,
            details: Some(details.into()),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{}: {}", self.code.as_str(), details),
            None => f.write_str(self.code.as_str()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.code.status(),
            Json(NotifyResponse::failed(self.code.as_str(), self.details)),
        )
            .into_response()
    }
}
