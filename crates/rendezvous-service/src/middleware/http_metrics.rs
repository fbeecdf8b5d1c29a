//! Request metrics for every HTTP response.
//!
//! Runs as the outermost layer so framework rejections (404, 405, 413 from
//! the body limit, 408 from the timeout) are counted next to handler
//! responses.

use crate::observability::metrics::record_http_request;
use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Record method, normalized path, status and duration of each request.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed());

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::post,
        Router,
    };
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use tower::ServiceExt;

    fn test_app() -> Router {
        Router::new()
            .route("/join/:room_id", post(|| async { "OK" }))
            .layer(middleware::from_fn(http_metrics_middleware))
    }

    #[tokio::test]
    async fn test_middleware_passes_response_through() {
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/join/abc")
            .body(Body::empty())
            .expect("request builder should succeed");

        let response = test_app().oneshot(request).await.expect("request should succeed");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_counts_unmatched_routes() {
        let request = HttpRequest::builder()
            .method("GET")
            .uri("/nope")
            .body(Body::empty())
            .expect("request builder should succeed");

        let response = test_app().oneshot(request).await.expect("request should succeed");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_middleware_records_status_code_label() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime should build");

        metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                let request = HttpRequest::builder()
                    .method("POST")
                    .uri("/join/abc")
                    .body(Body::empty())
                    .expect("request builder should succeed");
                test_app().oneshot(request).await.expect("request should succeed");
            });
        });

        let recorded = snapshotter.snapshot().into_vec().into_iter().any(|(key, _, _, value)| {
            key.key().name() == "rv_http_requests_total"
                && key.key().labels().any(|l| l.key() == "status_code" && l.value() == "200")
                && matches!(value, DebugValue::Counter(1))
        });
        assert!(recorded, "request counter should carry status_code=200");
    }
}
