use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tracing::{error, warn};

use crate::domain::ApiError;

/// Validation → 400, upstream → its own status, transport → 502.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body): (StatusCode, Value) = match &self {
            ApiError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": e.message(), "field": e.field() }),
            ),
            ApiError::Upstream(e) => {
                let status =
                    StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);
                let body = match e.details() {
                    Some(details) => json!({ "error": e.message(), "details": details }),
                    None => json!({ "error": e.message() }),
                };
                (status, body)
            }
            ApiError::Transport(e) => (StatusCode::BAD_GATEWAY, json!({ "error": e.message() })),
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TransportError, UpstreamError, ValidationError};
    use axum::body::to_bytes;
    use rstest::rstest;

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[rstest]
    #[case::validation(
        ValidationError::new("title", "Task title is required").into(),
        StatusCode::BAD_REQUEST,
        json!({"error": "Task title is required", "field": "title"})
    )]
    #[case::upstream(
        UpstreamError::new("Task not found", 404, Some("id=t9".into())).into(),
        StatusCode::NOT_FOUND,
        json!({"error": "Task not found", "details": "id=t9"})
    )]
    #[case::transport(
        TransportError::new("Request failed after 3 attempts: HTTP 503: down").into(),
        StatusCode::BAD_GATEWAY,
        json!({"error": "Request failed after 3 attempts: HTTP 503: down"})
    )]
    #[tokio::test]
    async fn maps_error_to_status_and_body(
        #[case] err: ApiError,
        #[case] status: StatusCode,
        #[case] body: Value,
    ) {
        assert_eq!(render(err).await, (status, body));
    }
}
