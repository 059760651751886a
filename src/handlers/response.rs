use axum::{http::StatusCode, response::Json};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::models::{RepositoryError, ServiceError};

/// Uniform response envelope: `code` 1 with `data` on success, 0 with `msg` on failure
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: u8,
    pub msg: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 1,
            msg: None,
            data: Some(data),
        }
    }
}

pub type ErrorResponse = (StatusCode, Json<Value>);

pub type HandlerResult<T> = Result<Json<ApiResponse<T>>, ErrorResponse>;

pub fn success<T>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

/// Failure envelope with the given status
pub fn failure(status: StatusCode, message: impl Into<String>) -> ErrorResponse {
    (
        status,
        Json(json!({
            "code": 0,
            "msg": message.into(),
            "data": null,
        })),
    )
}

/// Map a service error onto a status code and failure envelope.
/// Infrastructure errors are logged and replaced by a generic message.
pub fn service_error_to_response(err: ServiceError) -> ErrorResponse {
    match err {
        ServiceError::Validation { .. } => {
            warn!(error = %err, "Request rejected");
            failure(StatusCode::BAD_REQUEST, err.to_string())
        }
        ServiceError::Conflict { .. } => {
            warn!(error = %err, "Request conflicts with current state");
            failure(StatusCode::CONFLICT, err.to_string())
        }
        ServiceError::NotFound { .. } => failure(StatusCode::NOT_FOUND, err.to_string()),
        ServiceError::Unauthorized { .. } => failure(StatusCode::UNAUTHORIZED, err.to_string()),
        ServiceError::Repository { source } => {
            error!(error = %source, "Repository failure");
            let message = match source {
                RepositoryError::ConnectionFailed | RepositoryError::TableNotFound { .. } => {
                    "Storage unavailable"
                }
                RepositoryError::Timeout => "Storage timeout",
                _ => "Internal server error",
            };
            failure(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope() {
        let body = serde_json::to_value(ApiResponse::success(vec![1, 2])).unwrap();
        assert_eq!(body, json!({"code": 1, "msg": null, "data": [1, 2]}));
    }

    #[test]
    fn test_error_mapping() {
        let cases = vec![
            (ServiceError::validation("bad"), StatusCode::BAD_REQUEST),
            (ServiceError::conflict("busy"), StatusCode::CONFLICT),
            (ServiceError::not_found("Dish", 1), StatusCode::NOT_FOUND),
            (ServiceError::unauthorized("NOTLOGIN"), StatusCode::UNAUTHORIZED),
        ];
        for (err, expected) in cases {
            let (status, Json(body)) = service_error_to_response(err);
            assert_eq!(status, expected);
            assert_eq!(body["code"], 0);
            assert!(body["data"].is_null());
        }
    }

    #[test]
    fn test_infrastructure_errors_are_not_leaked() {
        let err = ServiceError::from(RepositoryError::AwsSdk {
            message: "arn:aws:dynamodb:secret-table".to_string(),
        });
        let (status, Json(body)) = service_error_to_response(err);

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["msg"], "Internal server error");
    }
}
