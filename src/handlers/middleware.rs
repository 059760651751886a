use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};

use super::response::{failure, ErrorResponse};

/// Request validation middleware: JSON bodies only, bounded by `max_request_size`
pub async fn request_validation_middleware(
    State(max_request_size): State<usize>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ErrorResponse> {
    validate_content_type(&request)?;
    validate_request_size(&request, max_request_size)?;

    Ok(next.run(request).await)
}

fn content_length(request: &Request<Body>) -> Option<u64> {
    request
        .headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Write requests that carry a body must be JSON. Bodyless writes such as
/// `POST /dish/status/0?ids=1` pass through.
fn validate_content_type(request: &Request<Body>) -> Result<(), ErrorResponse> {
    let method = request.method();
    if method != Method::POST && method != Method::PUT && method != Method::PATCH {
        return Ok(());
    }

    let has_body = content_length(request).map_or_else(
        || request.headers().contains_key(header::TRANSFER_ENCODING),
        |length| length > 0,
    );
    if !has_body {
        return Ok(());
    }

    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    match content_type {
        Some(value) if value.starts_with("application/json") => Ok(()),
        Some(value) => {
            warn!("Invalid content type: {}", value);
            Err(failure(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Content-Type must be application/json",
            ))
        }
        None => {
            warn!("Missing content type header");
            Err(failure(
                StatusCode::BAD_REQUEST,
                "Content-Type header is required for requests with body",
            ))
        }
    }
}

fn validate_request_size(request: &Request<Body>, max_request_size: usize) -> Result<(), ErrorResponse> {
    match content_length(request) {
        Some(length) if length > max_request_size as u64 => {
            error!("Request too large: {} bytes", length);
            Err(failure(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!(
                    "Request size {} bytes exceeds maximum of {} bytes",
                    length, max_request_size
                ),
            ))
        }
        _ => Ok(()),
    }
}

/// Security headers middleware
pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    response
}
