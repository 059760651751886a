use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::CurrentUser;

const PURGE_EVERY: u64 = 256;
/// Wrong guesses allowed before a pending code is discarded
pub const MAX_CODE_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
struct PendingCode {
    phone: String,
    code: String,
    expires_at: Instant,
    failed_attempts: u32,
}

#[derive(Debug, Clone)]
struct SessionState {
    user_id: Option<i64>,
    pending_code: Option<PendingCode>,
    last_seen: Instant,
}

impl SessionState {
    fn new() -> Self {
        Self {
            user_id: None,
            pending_code: None,
            last_seen: Instant::now(),
        }
    }
}

/// Server-side session table keyed by the opaque id carried in the session cookie.
/// Sessions expire after `session_ttl` without activity.
pub struct SessionStore {
    sessions: DashMap<String, SessionState>,
    code_ttl: Duration,
    session_ttl: Duration,
    created: AtomicU64,
}

impl SessionStore {
    pub fn new(code_ttl: Duration, session_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            code_ttl,
            session_ttl,
            created: AtomicU64::new(0),
        }
    }

    /// Open a new anonymous session and return its id
    pub fn create(&self) -> String {
        if self.created.fetch_add(1, Ordering::Relaxed) % PURGE_EVERY == PURGE_EVERY - 1 {
            self.purge_expired();
        }
        let id = Uuid::new_v4().simple().to_string();
        self.sessions.insert(id.clone(), SessionState::new());
        id
    }

    /// Refresh a session; false when it is unknown or has expired
    pub fn touch(&self, id: &str) -> bool {
        let now = Instant::now();
        let alive = match self.sessions.get_mut(id) {
            Some(mut state) if now.duration_since(state.last_seen) < self.session_ttl => {
                state.last_seen = now;
                true
            }
            Some(_) => false,
            None => return false,
        };
        if !alive {
            self.sessions.remove(id);
        }
        alive
    }

    pub fn current_user(&self, id: &str) -> Option<CurrentUser> {
        self.sessions
            .get(id)
            .and_then(|state| state.user_id)
            .map(|user_id| CurrentUser { user_id })
    }

    /// Remember the code sent to `phone`, replacing any earlier one
    pub fn bind_code(&self, id: &str, phone: &str, code: &str) {
        let pending = PendingCode {
            phone: phone.to_string(),
            code: code.to_string(),
            expires_at: Instant::now() + self.code_ttl,
            failed_attempts: 0,
        };
        self.sessions
            .entry(id.to_string())
            .or_insert_with(SessionState::new)
            .pending_code = Some(pending);
    }

    /// Consume the pending code if it matches `phone` and `code` and is still fresh.
    /// An expired code is dropped either way, and so is one that has been
    /// guessed wrong `MAX_CODE_ATTEMPTS` times.
    pub fn take_code(&self, id: &str, phone: &str, code: &str) -> bool {
        let Some(mut state) = self.sessions.get_mut(id) else {
            return false;
        };
        let Some(pending) = state.pending_code.as_mut() else {
            return false;
        };

        if pending.expires_at <= Instant::now() {
            debug!("Verification code expired");
            state.pending_code = None;
            return false;
        }
        if pending.phone != phone || pending.code != code {
            pending.failed_attempts += 1;
            if pending.failed_attempts >= MAX_CODE_ATTEMPTS {
                warn!(attempts = pending.failed_attempts, "Verification code discarded after repeated failures");
                state.pending_code = None;
            }
            return false;
        }
        state.pending_code = None;
        true
    }

    pub fn bind_user(&self, id: &str, user_id: i64) {
        let mut state = self
            .sessions
            .entry(id.to_string())
            .or_insert_with(SessionState::new);
        state.user_id = Some(user_id);
        state.last_seen = Instant::now();
    }

    pub fn remove(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        let now = Instant::now();
        self.sessions
            .retain(|_, state| now.duration_since(state.last_seen) < self.session_ttl);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
