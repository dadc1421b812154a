use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::{PortalError, StorageError};
use crate::planning::PropertyError;

/// An error rendered as `{"error": message}` with a matching status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<PortalError> for ApiError {
    fn from(err: PortalError) -> Self {
        let status = match &err {
            e if e.is_not_found() => StatusCode::NOT_FOUND,
            PortalError::MissingField(_) | PortalError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PortalError::Storage(StorageError::InvalidId(_) | StorageError::UnsafePath(_)) => {
                StatusCode::BAD_REQUEST
            }
            PortalError::Property(PropertyError::AddressNotFound(_)) => StatusCode::NOT_FOUND,
            PortalError::Property(PropertyError::Disabled) => StatusCode::SERVICE_UNAVAILABLE,
            PortalError::Property(_) => StatusCode::BAD_GATEWAY,
            _ => {
                log::error!("Request failed: {}", err);
                return Self::internal();
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<PropertyError> for ApiError {
    fn from(err: PropertyError) -> Self {
        PortalError::from(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (PortalError::not_found("Job", "x"), StatusCode::NOT_FOUND),
            (
                PortalError::Storage(StorageError::JobNotFound("x".to_string())),
                StatusCode::NOT_FOUND,
            ),
            (PortalError::MissingField("jobId"), StatusCode::BAD_REQUEST),
            (
                PortalError::Storage(StorageError::InvalidId("../x".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (
                PortalError::Property(PropertyError::Disabled),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                PortalError::Property(PropertyError::Malformed("x".to_string())),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_internal_errors_hide_detail() {
        let err = PortalError::Storage(StorageError::Serialize(
            serde_json::from_str::<u8>("x").unwrap_err(),
        ));
        let api = ApiError::from(err);
        assert_eq!(api.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.message(), "Internal server error");
    }
}
