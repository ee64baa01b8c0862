use std::fmt;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

/// Hardware acquisition steps, in the order the handler performs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireStep {
    OpenChip,
    FindLedLine,
    RequestLedLine,
    FindButtonLine,
    RequestButtonLine,
}

impl fmt::Display for AcquireStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AcquireStep::OpenChip => "open GPIO chip",
            AcquireStep::FindLedLine => "get LED line",
            AcquireStep::RequestLedLine => "request LED line as output",
            AcquireStep::FindButtonLine => "get button line",
            AcquireStep::RequestButtonLine => "request button line as input",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Failed to {step}: {reason}")]
    Acquire { step: AcquireStep, reason: String },
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("GPIO error: {0}")]
    Gpio(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl AppError {
    pub fn acquire(step: AcquireStep) -> impl FnOnce(AppError) -> AppError {
        move |e| AppError::Acquire {
            step,
            reason: e.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidState(_) | AppError::InvalidValue(_) => StatusCode::BAD_REQUEST,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Acquire { .. } | AppError::Config(_) | AppError::Gpio(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
