use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{Json, Response},
};
use serde::{de::DeserializeOwned, Deserialize};
use std::sync::Arc;
use tracing::debug;

use super::response::{failure, ErrorResponse};
use crate::models::{CurrentUser, ServiceError, ServiceResult};
use crate::services::SessionStore;

/// JSON body whose rejections use the failure envelope
pub struct Payload<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ErrorResponse;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Payload(value)),
            Err(rejection) => Err(failure(rejection.status(), rejection.body_text())),
        }
    }
}

/// Query string whose rejections use the failure envelope
pub struct Params<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for Params<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ErrorResponse;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Params(value)),
            Err(rejection) => Err(failure(StatusCode::BAD_REQUEST, rejection.body_text())),
        }
    }
}

/// `?ids=1,2,3`
#[derive(Debug, Deserialize)]
pub struct IdsQuery {
    #[serde(default)]
    pub ids: String,
}

impl IdsQuery {
    pub fn parse(&self) -> ServiceResult<Vec<i64>> {
        parse_ids(&self.ids)
    }
}

/// Parse a comma separated id list; blanks are skipped, anything else must be an integer
pub fn parse_ids(raw: &str) -> ServiceResult<Vec<i64>> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map_err(|_| ServiceError::validation(format!("Invalid id: {}", part)))
        })
        .collect::<ServiceResult<Vec<i64>>>()?;

    if ids.is_empty() {
        return Err(ServiceError::validation("At least one id is required"));
    }
    Ok(ids)
}

/// Opaque id of the caller's server-side session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = ErrorResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionId>()
            .cloned()
            .ok_or_else(|| failure(StatusCode::INTERNAL_SERVER_ERROR, "Session unavailable"))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ErrorResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<CurrentUser>()
            .copied()
            .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "NOTLOGIN"))?;

        debug!(user_id = user.user_id, "Resolved current user");
        Ok(user)
    }
}

#[derive(Clone)]
pub struct SessionLayerState {
    pub sessions: Arc<SessionStore>,
    pub cookie_name: Arc<str>,
}

/// Resolve the session cookie into `SessionId` and, once logged in, `CurrentUser`.
/// Requests without a live session get a fresh one and a `Set-Cookie` header.
pub async fn session_middleware(
    State(layer): State<SessionLayerState>,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = read_cookie(request.headers(), &layer.cookie_name)
        .filter(|id| layer.sessions.touch(id));
    let (session_id, fresh) = match existing {
        Some(id) => (id, false),
        None => (layer.sessions.create(), true),
    };

    if let Some(user) = layer.sessions.current_user(&session_id) {
        request.extensions_mut().insert(user);
    }
    request
        .extensions_mut()
        .insert(SessionId(session_id.clone()));

    let mut response = next.run(request).await;

    if fresh {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            layer.cookie_name, session_id
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware, routing::get, Router};
    use std::time::Duration;
    use tower::ServiceExt;

    #[test]
    fn test_parse_ids() {
        assert_eq!(parse_ids("1, 2,,3").unwrap(), vec![1, 2, 3]);
        assert!(matches!(parse_ids(""), Err(ServiceError::Validation { .. })));
        assert!(matches!(
            parse_ids("1,abc"),
            Err(ServiceError::Validation { .. })
        ));
    }

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; REGGIE_SESSION=abc123"),
        );
        assert_eq!(
            read_cookie(&headers, "REGGIE_SESSION"),
            Some("abc123".to_string())
        );
        assert_eq!(read_cookie(&headers, "OTHER"), None);
    }

    async fn whoami(user: CurrentUser) -> String {
        user.user_id.to_string()
    }

    fn app(sessions: Arc<SessionStore>) -> Router {
        let layer = SessionLayerState {
            sessions,
            cookie_name: Arc::from("REGGIE_SESSION"),
        };
        Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn_with_state(layer, session_middleware))
    }

    #[tokio::test]
    async fn test_anonymous_request_gets_cookie_and_401() {
        let sessions = Arc::new(SessionStore::new(
            Duration::from_secs(300),
            Duration::from_secs(1800),
        ));
        let response = app(sessions.clone())
            .oneshot(Request::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let cookie = response.headers().get(header::SET_COOKIE).unwrap();
        assert!(cookie.to_str().unwrap().starts_with("REGGIE_SESSION="));
        assert!(cookie.to_str().unwrap().contains("HttpOnly"));
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_logged_in_session_resolves_user() {
        let sessions = Arc::new(SessionStore::new(
            Duration::from_secs(300),
            Duration::from_secs(1800),
        ));
        let id = sessions.create();
        sessions.bind_user(&id, 77);

        let response = app(sessions)
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header(header::COOKIE, format!("REGGIE_SESSION={}", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"77");
    }
}
