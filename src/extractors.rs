use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::auth::session;
use crate::error::AppError;
use crate::state::AppState;

/// A live session resolved from the request's cookie.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub user_id: i64,
    pub token: String,
}

/// Optional-auth extractor. Anonymous requests and stale cookies flow
/// through as `None`; only a storage fault rejects the request.
pub struct Viewer(pub Option<ActiveSession>);

impl FromRequestParts<AppState> for Viewer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_session_token(parts, &state.config.auth.cookie_name) else {
            return Ok(Viewer(None));
        };

        match session::session_user(&state.db, token)? {
            Some(user_id) => {
                let token = token.to_string();
                Ok(Viewer(Some(ActiveSession { user_id, token })))
            }
            None => Ok(Viewer(None)),
        }
    }
}

fn extract_session_token<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name {
                Some(val)
            } else {
                None
            }
        })
}
