use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use axum::extract::State;
use axum::http::header::{self, HeaderName};
use axum::response::{AppendHeaders, Html, IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::auth::{CookieChange, SessionContext};
use crate::config::AuthConfig;
use crate::extractors::Viewer;
use crate::state::AppState;

/// GraphQL endpoint handler. Builds the per-request session context from
/// the cookie, runs the document, then applies whatever cookie change the
/// document queued (login sets one, logout clears it).
async fn graphql_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(req): Json<async_graphql::Request>,
) -> impl IntoResponse {
    let session = Arc::new(match viewer.0 {
        Some(active) => SessionContext::authenticated(active.user_id, active.token),
        None => SessionContext::anonymous(),
    });

    let request = req
        .data(state.db.clone())
        .data(state.config.clone())
        .data(session.clone());
    let response = state.schema.execute(request).await;

    let mut cookies: Vec<(HeaderName, String)> = Vec::new();
    match session.take_cookie_change() {
        Some(CookieChange::Set(token)) => cookies.push((
            header::SET_COOKIE,
            session_cookie(&state.config.auth, &token),
        )),
        Some(CookieChange::Clear) => {
            cookies.push((header::SET_COOKIE, clear_session_cookie(&state.config.auth)))
        }
        None => {}
    }

    (AppendHeaders(cookies), Json(response))
}

/// GraphQL Playground UI (development tool)
async fn graphql_playground() -> impl IntoResponse {
    Html(playground_source(GraphQLPlaygroundConfig::new("/graphql")))
}

// -- Cookie helpers --
// Domain and Secure are only attached when a cookie domain is configured,
// which is the production setup; local development stays host-only over
// plain http.

fn session_cookie(auth: &AuthConfig, token: &str) -> String {
    let max_age_secs = auth.session_hours * 3600;
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        auth.cookie_name, token, max_age_secs
    );
    if let Some(domain) = &auth.cookie_domain {
        cookie.push_str(&format!("; Domain={domain}; Secure"));
    }
    cookie
}

fn clear_session_cookie(auth: &AuthConfig) -> String {
    let mut cookie = format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
        auth.cookie_name
    );
    if let Some(domain) = &auth.cookie_domain {
        cookie.push_str(&format!("; Domain={domain}; Secure"));
    }
    cookie
}

/// GraphQL router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/graphql", post(graphql_handler))
        .route("/graphql/playground", get(graphql_playground))
}
