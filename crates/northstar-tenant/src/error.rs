//! Rejections produced while reading the district and school of a request.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Why a request carries no usable tenant.
///
/// A request without a district is unauthenticated. A request whose district
/// or school id cannot be parsed is malformed and never falls back to
/// another source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TenantError {
    /// Neither the district header nor the district query parameter is set.
    #[error("District context required")]
    MissingDistrict,

    /// The district id is not a UUID.
    #[error("Invalid district id: {0}")]
    InvalidDistrictId(String),

    /// The school id is not a UUID.
    #[error("Invalid school id: {0}")]
    InvalidSchoolId(String),

    /// A tenant header holds bytes that are not visible ASCII.
    #[error("Unreadable tenant header {0}")]
    UnreadableHeader(String),
}

impl TenantError {
    /// HTTP status returned to the caller.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingDistrict => StatusCode::UNAUTHORIZED,
            Self::InvalidDistrictId(_) | Self::InvalidSchoolId(_) | Self::UnreadableHeader(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    /// Machine-readable code for the JSON body.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingDistrict => "unauthenticated",
            Self::InvalidDistrictId(_) | Self::InvalidSchoolId(_) | Self::UnreadableHeader(_) => {
                "invalid_tenant"
            }
        }
    }
}

/// JSON body of a tenant rejection.
///
/// ```json
/// { "error": "unauthenticated", "message": "District context required" }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

impl From<&TenantError> for ErrorResponse {
    fn from(err: &TenantError) -> Self {
        Self {
            error: err.error_code(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for TenantError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::from(&self);
        let json = serde_json::to_string(&body)
            .unwrap_or_else(|_| format!(r#"{{"error":"{}"}}"#, body.error));

        (
            self.status_code(),
            [(http::header::CONTENT_TYPE, "application/json")],
            json,
        )
            .into_response()
    }
}
