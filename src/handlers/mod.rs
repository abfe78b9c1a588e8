pub mod alerts;
pub mod health;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::middleware::timing::RequestId;

// ─── Shared response envelope ────────────────────────────────────

/// Every successful API response is wrapped so clients can correlate
/// it with server logs via `meta.request_id`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(request_id: &RequestId, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            meta: ResponseMeta {
                request_id: request_id.as_str().to_owned(),
            },
        })
    }
}

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotConfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotConfigured(_) => "CONFIG_ERROR",
        }
    }

    /// Attach the request id so the failure envelope can carry it.
    pub fn for_request(self, request_id: &RequestId) -> ApiError {
        ApiError {
            request_id: request_id.clone(),
            error: self,
        }
    }
}

/// An `AppError` bound to the request it failed, rendered as
/// `{ success: false, error, meta: { request_id, code } }`.
#[derive(Debug)]
pub struct ApiError {
    request_id: RequestId,
    error: AppError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status();

        let body = serde_json::json!({
            "success": false,
            "error":   self.error.to_string(),
            "meta":    {
                "request_id": self.request_id.as_str(),
                "code":       self.error.code(),
            },
        });

        (status, Json(body)).into_response()
    }
}
