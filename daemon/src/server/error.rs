//! Error-to-response mapping for the inbound surface

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::errors::SlipwayError;

/// Wrapper turning orchestrator errors into HTTP responses
#[derive(Debug)]
pub struct ApiError(pub SlipwayError);

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    status: u16,
    message: String,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            SlipwayError::ConfigError(_) | SlipwayError::ValidationError(_) => {
                StatusCode::BAD_REQUEST
            }
            SlipwayError::ConflictError => StatusCode::CONFLICT,
            SlipwayError::NotFound(_) => StatusCode::NOT_FOUND,
            SlipwayError::UpstreamError(_) | SlipwayError::HttpError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorBody {
            error: ErrorDetail {
                status: status.as_u16(),
                message: self.0.to_string(),
            },
        });
        (status, body).into_response()
    }
}

impl From<SlipwayError> for ApiError {
    fn from(err: SlipwayError) -> Self {
        Self(err)
    }
}
