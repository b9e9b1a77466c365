use std::fmt::Display;

use anyhow;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug)]
pub enum AppError {
    InvalidArgument(String),
    NotFound(String),
    Forbidden(String),
    Conflict(String),
    InsufficientFunds,
    UpstreamUnavailable(String),
    Internal(anyhow::Error),
}

pub type Result<T = (), E = AppError> = anyhow::Result<T, E>;

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::InvalidArgument(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "INVALID_ARGUMENT",
                    message,
                },
            ),
            AppError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message,
                },
            ),
            AppError::Forbidden(message) => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "FORBIDDEN",
                    message,
                },
            ),
            AppError::Conflict(message) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    message,
                },
            ),
            AppError::InsufficientFunds => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "INSUFFICIENT_FUNDS",
                    message: "Insufficient points".to_string(),
                },
            ),
            AppError::UpstreamUnavailable(message) => (
                StatusCode::BAD_GATEWAY,
                ErrorBody {
                    code: "UPSTREAM_UNAVAILABLE",
                    message,
                },
            ),
            AppError::Internal(err) => {
                tracing::error!("internal error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "Internal server error".to_string(),
                    },
                )
            }
        }
    }

    /// Maps a duplicate-key insert to `Conflict`, anything else to `Internal`.
    pub fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(message.to_string())
            }
            _ => AppError::Internal(err.into()),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        return (status, Json(body)).into_response();
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}
