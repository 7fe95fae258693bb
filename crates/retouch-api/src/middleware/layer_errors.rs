use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use retouch_core::AppError;

use crate::error::HttpAppError;

/// Limits enforced by tower layers that answer without reaching a handler.
#[derive(Clone, Copy, Debug)]
pub struct LayerLimits {
    pub max_upload_bytes: usize,
    pub body_limit: usize,
    pub request_timeout_secs: u64,
}

/// Re-renders body-limit and timeout rejections as the JSON error envelope.
///
/// `RequestBodyLimitLayer` answers 413 in plain text and `TimeoutLayer`
/// answers an empty 408. Responses that already carry JSON came from a
/// handler and pass through untouched.
pub async fn layer_error_middleware(
    State(limits): State<LayerLimits>,
    request: Request,
    next: Next,
) -> Response {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    let response = next.run(request).await;
    if is_json(&response) {
        return response;
    }

    match response.status() {
        StatusCode::PAYLOAD_TOO_LARGE => HttpAppError(AppError::PayloadTooLarge {
            size: declared.unwrap_or(limits.body_limit + 1),
            max: limits.max_upload_bytes,
        })
        .into_response(),
        StatusCode::REQUEST_TIMEOUT => HttpAppError(AppError::RequestTimeout {
            secs: limits.request_timeout_secs,
        })
        .into_response(),
        _ => response,
    }
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use axum_test::TestServer;
    use serde_json::Value;

    fn server() -> TestServer {
        let limits = LayerLimits {
            max_upload_bytes: 1024,
            body_limit: 2048,
            request_timeout_secs: 30,
        };
        let app = Router::new()
            .route("/timeout", get(|| async { StatusCode::REQUEST_TIMEOUT }))
            .route(
                "/too-large",
                get(|| async { (StatusCode::PAYLOAD_TOO_LARGE, "length limit exceeded") }),
            )
            .route(
                "/handler-413",
                get(|| async {
                    HttpAppError(AppError::PayloadTooLarge { size: 5000, max: 1024 })
                }),
            )
            .route("/ok", get(|| async { "fine" }))
            .layer(axum::middleware::from_fn_with_state(
                limits,
                layer_error_middleware,
            ));
        TestServer::new(app).unwrap()
    }

    #[tokio::test]
    async fn test_empty_timeout_becomes_json() {
        let response = server().get("/timeout").expect_failure().await;
        response.assert_status(StatusCode::REQUEST_TIMEOUT);
        let body: Value = response.json();
        assert_eq!(body["code"], "REQUEST_TIMEOUT");
        assert_eq!(body["recoverable"], true);
    }

    #[tokio::test]
    async fn test_plain_text_413_becomes_json() {
        let response = server().get("/too-large").expect_failure().await;
        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
        let body: Value = response.json();
        assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_handler_errors_pass_through() {
        let response = server().get("/handler-413").expect_failure().await;
        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("5000"));

        let response = server().get("/ok").await;
        assert_eq!(response.text(), "fine");
    }
}
