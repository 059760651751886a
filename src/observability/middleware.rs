use axum::{
    extract::{MatchedPath, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::TraceContextExt;
use std::{sync::Arc, time::Instant};
use tracing::{error, info, instrument, warn, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::Metrics;

/// Per-request span, access log and HTTP metrics
pub async fn observability_middleware(
    metrics: Arc<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let client_ip = client_ip(request.headers());

    // Route template keeps label cardinality bounded (`/dish/:id`, not `/dish/42`)
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let span = tracing::info_span!(
        target: "reggie_rs::http",
        "http_request",
        otel.name = %format!("{} {}", method, route),
        otel.kind = "server",
        http.method = %method,
        http.route = %route,
        http.url = %request.uri(),
        http.user_agent = header_value(request.headers(), "user-agent").unwrap_or("unknown"),
        client.address = %client_ip,
        http.response.status_code = tracing::field::Empty,
    );

    metrics.increment_in_flight(&method, &route);
    let response = next.run(request).instrument(span.clone()).await;
    metrics.decrement_in_flight(&method, &route);

    let elapsed = start_time.elapsed();
    let status = response.status();
    metrics.record_http_request(&method, &route, status.as_u16(), elapsed.as_secs_f64());

    span.record("http.response.status_code", status.as_u16());
    let otel_context = span.context();
    let otel_span = otel_context.span();
    if status.is_server_error() {
        otel_span.set_status(opentelemetry::trace::Status::error("HTTP server error"));
    } else {
        otel_span.set_status(opentelemetry::trace::Status::Ok);
    }

    let code = status.as_u16();
    let duration_ms = elapsed.as_millis() as u64;
    span.in_scope(|| {
        if status.is_server_error() {
            error!(
                method = %method,
                path = %route,
                status_code = code,
                duration_ms,
                client_ip = %client_ip,
                "Request failed"
            );
        } else if status.is_client_error() {
            warn!(
                method = %method,
                path = %route,
                status_code = code,
                duration_ms,
                client_ip = %client_ip,
                "Request rejected"
            );
        } else {
            info!(method = %method, path = %route, status_code = code, duration_ms, "Request completed");
        }
    });

    response
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// First hop of X-Forwarded-For, then X-Real-IP
fn client_ip(headers: &HeaderMap) -> String {
    header_value(headers, "x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .or_else(|| header_value(headers, "x-real-ip"))
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

/// Wraps service operations in a span and records their outcome
#[derive(Clone)]
pub struct OperationTracer {
    metrics: Arc<Metrics>,
}

impl OperationTracer {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    #[instrument(name = "catalog_operation", skip_all, fields(operation = %operation))]
    pub async fn trace_catalog_operation<F, T, E>(&self, operation: &str, future: F) -> Result<T, E>
    where
        F: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let start_time = Instant::now();
        let result = future.await;
        self.metrics
            .record_catalog_operation(operation, result.is_ok());
        log_outcome("Catalog operation", start_time, &result);
        result
    }

    #[instrument(name = "cart_operation", skip_all, fields(operation = %operation, user_id = user_id))]
    pub async fn trace_cart_operation<F, T, E>(
        &self,
        operation: &str,
        user_id: i64,
        future: F,
    ) -> Result<T, E>
    where
        F: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let start_time = Instant::now();
        let result = future.await;
        self.metrics.record_cart_operation(operation, result.is_ok());
        log_outcome("Cart operation", start_time, &result);
        result
    }

    #[instrument(name = "order_submission", skip_all, fields(user_id = user_id))]
    pub async fn trace_order_submission<F, T, E>(&self, user_id: i64, future: F) -> Result<T, E>
    where
        F: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let start_time = Instant::now();
        let result = future.await;
        self.metrics.record_order_submission(result.is_ok());
        log_outcome("Order submission", start_time, &result);
        result
    }
}

fn log_outcome<T, E: std::fmt::Display>(kind: &str, start_time: Instant, result: &Result<T, E>) {
    let duration_ms = start_time.elapsed().as_millis();
    match result {
        Ok(_) => info!(duration_ms = duration_ms, "{} completed", kind),
        Err(error) => warn!(error = %error, duration_ms = duration_ms, "{} failed", kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn ok_handler() -> &'static str {
        "ok"
    }

    async fn failing_handler() -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn observed(metrics: Arc<Metrics>, router: Router) -> Router {
        router.layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics.clone(), req, next)
        }))
    }

    async fn send(app: Router, uri: &str) -> StatusCode {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header("user-agent", "reggie-test/1.0")
            .body(Body::empty())
            .unwrap();
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_labels_use_route_template() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let app = observed(metrics.clone(), Router::new().route("/dish/:id", get(ok_handler)));

        assert_eq!(send(app, "/dish/42").await, StatusCode::OK);

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("endpoint=\"/dish/:id\""));
        assert!(!encoded.contains("/dish/42"));
        assert_eq!(
            metrics
                .http_requests_in_flight
                .with_label_values(&["GET", "/dish/:id"])
                .get(),
            0.0
        );
    }

    #[tokio::test]
    async fn test_server_errors_are_counted_by_status() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let app = observed(metrics.clone(), Router::new().route("/boom", get(failing_handler)));

        assert_eq!(send(app, "/boom").await, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            metrics
                .http_requests_total
                .with_label_values(&["GET", "/boom", "500"])
                .get(),
            1.0
        );
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "192.168.1.9".parse().unwrap());
        assert_eq!(client_ip(&headers), "192.168.1.9");

        headers.insert("x-forwarded-for", "10.0.0.1, 10.0.0.2".parse().unwrap());
        assert_eq!(client_ip(&headers), "10.0.0.1");

        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }

    #[tokio::test]
    async fn test_operation_tracer_records_outcomes() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let tracer = OperationTracer::new(metrics.clone());

        let ok = tracer
            .trace_catalog_operation("delete_category", async { Ok::<_, String>(()) })
            .await;
        assert!(ok.is_ok());

        let failed = tracer
            .trace_catalog_operation("delete_category", async { Err::<(), _>("conflict") })
            .await;
        assert!(failed.is_err());

        tracer
            .trace_cart_operation("add", 7, async { Ok::<_, String>(1u32) })
            .await
            .unwrap();
        tracer
            .trace_order_submission(7, async { Ok::<_, String>(()) })
            .await
            .unwrap();

        let counter = |status: &str| {
            metrics
                .catalog_operations_total
                .with_label_values(&["delete_category", status])
                .get()
        };
        assert_eq!(counter("success"), 1.0);
        assert_eq!(counter("error"), 1.0);

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("cart_operations_total"));
        assert!(encoded.contains("orders_submitted_total"));
    }
}
