use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::error;

use crate::observability::Metrics;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus scrape endpoint; plain text, outside the API envelope
pub async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Response {
    let body = match metrics.encode() {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    async fn scrape(metrics: Arc<Metrics>) -> (StatusCode, String, String) {
        let response = Router::new()
            .route("/metrics", get(metrics_handler))
            .with_state(metrics)
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let content_type = response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .to_string();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_scrape_exposes_recorded_series() {
        let metrics = Arc::new(Metrics::new().unwrap());
        metrics.record_http_request("GET", "/dish/list", 200, 0.004);
        metrics.record_cache_lookup("dish", "miss");
        metrics.record_order_submission(false);

        let (status, content_type, body) = scrape(metrics).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, PROMETHEUS_CONTENT_TYPE);
        assert!(body.contains("endpoint=\"/dish/list\""));
        assert!(body.contains("outcome=\"miss\""));
        assert!(body.contains("orders_submitted_total"));
    }

    #[tokio::test]
    async fn test_scrape_with_no_traffic_is_ok() {
        let (status, _, body) = scrape(Arc::new(Metrics::new().unwrap())).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.contains("cart_operations_total{"));
    }
}
