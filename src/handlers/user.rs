use axum::extract::State;
use tracing::instrument;

use super::extract::{Payload, SessionId};
use super::response::{service_error_to_response, success, HandlerResult};
use crate::app::AppState;
use crate::models::{LoginRequest, SendCodeRequest, User};

#[instrument(name = "send_code", skip_all)]
pub async fn send_code(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    Payload(request): Payload<SendCodeRequest>,
) -> HandlerResult<String> {
    state
        .auth
        .send_code(&session_id, request)
        .await
        .map(|()| success("Verification code sent".to_string()))
        .map_err(service_error_to_response)
}

#[instrument(name = "login", skip_all)]
pub async fn login(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    Payload(request): Payload<LoginRequest>,
) -> HandlerResult<User> {
    state
        .auth
        .login(&session_id, request)
        .await
        .map(success)
        .map_err(service_error_to_response)
}

#[instrument(name = "logout", skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
) -> HandlerResult<String> {
    state.auth.logout(&session_id);
    Ok(success("Logged out".to_string()))
}
