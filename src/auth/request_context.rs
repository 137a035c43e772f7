use std::sync::Mutex;

/// Pending change to the session cookie, applied by the HTTP layer after
/// the GraphQL document finishes executing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieChange {
    Set(String),
    Clear,
}

struct SessionState {
    user_id: Option<i64>,
    token: Option<String>,
    cookie: Option<CookieChange>,
}

/// Per-request identity. Built once per HTTP request from the session cookie
/// and handed to every resolver; login and logout mutate it in place so later
/// resolvers in the same document see the new identity.
pub struct SessionContext {
    state: Mutex<SessionState>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self {
            state: Mutex::new(SessionState {
                user_id: None,
                token: None,
                cookie: None,
            }),
        }
    }

    pub fn authenticated(user_id: i64, token: String) -> Self {
        Self {
            state: Mutex::new(SessionState {
                user_id: Some(user_id),
                token: Some(token),
                cookie: None,
            }),
        }
    }

    /// The signed-in user, if any.
    pub fn viewer(&self) -> Option<i64> {
        self.state.lock().unwrap().user_id
    }

    /// The signed-in user, or `NotLoggedIn` for gated operations.
    pub fn require_viewer(&self) -> Result<i64, NotLoggedIn> {
        self.viewer().ok_or(NotLoggedIn)
    }

    pub fn token(&self) -> Option<String> {
        self.state.lock().unwrap().token.clone()
    }

    /// Adopt a fresh session and queue its cookie.
    pub fn sign_in(&self, user_id: i64, token: String) {
        let mut state = self.state.lock().unwrap();
        state.user_id = Some(user_id);
        state.token = Some(token.clone());
        state.cookie = Some(CookieChange::Set(token));
    }

    /// Drop the current identity and queue cookie removal.
    pub fn sign_out(&self) {
        let mut state = self.state.lock().unwrap();
        state.user_id = None;
        state.token = None;
        state.cookie = Some(CookieChange::Clear);
    }

    /// Take the queued cookie change, if any. Called once per request.
    pub fn take_cookie_change(&self) -> Option<CookieChange> {
        self.state.lock().unwrap().cookie.take()
    }
}

/// Marker error for gated operations hit without a session.
#[derive(Debug)]
pub struct NotLoggedIn;
