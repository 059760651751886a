use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::SessionStore;
use crate::models::{
    validate_phone, LoginRequest, SendCodeRequest, ServiceError, ServiceResult, User,
};
use crate::repositories::UserRepository;

/// Delivers verification codes to customers
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_code(&self, phone: &str, code: &str) -> ServiceResult<()>;
}

/// Writes codes to the log instead of sending them; for local and test deployments
#[derive(Debug, Default, Clone)]
pub struct LoggingSmsSender;

#[async_trait]
impl SmsSender for LoggingSmsSender {
    async fn send_code(&self, phone: &str, code: &str) -> ServiceResult<()> {
        info!(phone = %phone, code = %code, "Verification code issued");
        Ok(())
    }
}

/// Six random digits
pub fn generate_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    code.to_string()
}

/// Phone-and-code login for customers
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<SessionStore>,
    sms: Arc<dyn SmsSender>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<SessionStore>,
        sms: Arc<dyn SmsSender>,
    ) -> Self {
        Self {
            users,
            sessions,
            sms,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    #[instrument(skip(self, session_id, request))]
    pub async fn send_code(&self, session_id: &str, request: SendCodeRequest) -> ServiceResult<()> {
        let phone = request.phone.trim();
        validate_phone(phone)?;

        let code = generate_code();
        self.sessions.bind_code(session_id, phone, &code);
        self.sms.send_code(phone, &code).await
    }

    /// Verify the code bound to this session, registering the phone on first login
    #[instrument(skip(self, session_id, request))]
    pub async fn login(&self, session_id: &str, request: LoginRequest) -> ServiceResult<User> {
        let phone = request.phone.trim();
        validate_phone(phone)?;

        if !self
            .sessions
            .take_code(session_id, phone, request.code.trim())
        {
            warn!("Login rejected: verification code mismatch");
            return Err(ServiceError::unauthorized("Invalid or expired verification code"));
        }

        let user = match self.users.find_by_phone(phone).await? {
            Some(user) => user,
            None => {
                let user = self.users.create(User::register(phone)).await?;
                info!(user_id = user.id, "New customer registered");
                user
            }
        };

        if !user.is_enabled() {
            warn!(user_id = user.id, "Login rejected: account disabled");
            return Err(ServiceError::unauthorized("Account is disabled"));
        }

        self.sessions.bind_user(session_id, user.id);
        info!(user_id = user.id, "Customer logged in");
        Ok(user)
    }

    pub fn logout(&self, session_id: &str) {
        if self.sessions.remove(session_id) {
            info!("Customer logged out");
        }
    }
}
