//! # Failure Normalization
//!
//! Every failure surfacing from route handling is converted to the single
//! envelope shape `{"detail": "<message>"}` at one boundary: the
//! [`IntoResponse`] impl on [`ApiError`]. Deliberate rejections keep their
//! status code; anything else is forced to 500. No retry or recovery happens
//! here — the response terminates the request.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use lamina_core::PartitionError;

/// The envelope returned for every failure, regardless of cause.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorEnvelope {
    /// Human-readable failure message.
    pub detail: String,
}

/// Gateway-level failure, matched once at the normalization boundary.
#[derive(Error, Debug)]
pub enum ApiError {
    /// A deliberate rejection carrying an intended HTTP status and message.
    #[error("{message}")]
    Structured { status: StatusCode, message: String },

    /// Any other failure: backend surprises, programming errors, anything
    /// not constructed for HTTP signaling. Always reported as 500.
    #[error("{message}")]
    Unexpected { message: String },
}

impl ApiError {
    /// Construct a structured failure with an explicit status.
    pub fn structured(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Structured {
            status,
            message: message.into(),
        }
    }

    /// Construct an unexpected failure (500).
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }

    /// Construct a 422 Unprocessable Entity rejection.
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::structured(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    /// Construct a 503 Service Unavailable rejection.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::structured(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// The HTTP status this failure is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Structured { status, .. } => *status,
            Self::Unexpected { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Structured { status, message } => {
                tracing::error!(status = status.as_u16(), "{message}");
                (status, message)
            }
            Self::Unexpected { message } => {
                tracing::error!("unexpected failure: {message}");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        (status, Json(ErrorEnvelope { detail: message })).into_response()
    }
}

/// Map the backend contract's failures into the gateway taxonomy.
impl From<PartitionError> for ApiError {
    fn from(err: PartitionError) -> Self {
        match err {
            PartitionError::Rejected { status, message } => Self::Structured {
                status: StatusCode::from_u16(status)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                message,
            },
            PartitionError::Backend(message) => Self::Unexpected { message },
        }
    }
}
