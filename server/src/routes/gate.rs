//! Edge redirect filter.
//!
//! SYSTEM CONTEXT
//! ==============
//! Runs before any page is served and sees only what travels with the
//! request: the token cookie or an `Authorization: Bearer` header. It cannot
//! see the client's in-memory session or its local storage.
//!
//! Rules, first match wins:
//! 1. protected prefix and no token: redirect to login with `from=<path>`;
//! 2. the login path with a token: redirect home;
//! 3. anything else passes through unmodified.
//!
//! LIMITATIONS
//! ===========
//! The token is never verified here (no signature, no expiry). A forged or
//! stale cookie passes the filter and has to fail at the backend; the client
//! route guard stays the authoritative in-app check.

#[cfg(test)]
#[path = "gate_test.rs"]
mod gate_test;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::config::GateConfig;
use crate::state::AppState;

/// Paths the filter never inspects: backend proxies, static bundles, health checks.
const EXCLUDED_PREFIXES: &[&str] = &["/api/", "/_next/static/", "/_next/image", "/pkg/"];
const EXCLUDED_EXACT: &[&str] = &["/api", "/favicon.ico", "/healthz"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    Continue,
    Redirect(String),
}

pub(crate) fn is_excluded(path: &str) -> bool {
    EXCLUDED_EXACT.contains(&path) || EXCLUDED_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Bearer token from the configured cookie, falling back to the
/// `Authorization` header. Empty values count as absent.
pub(crate) fn request_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(cookie_name) {
        let value = cookie.value().trim();
        if !value.is_empty() {
            return Some(value.to_owned());
        }
    }

    let header = headers.get(AUTHORIZATION)?.to_str().ok()?.trim_start();
    let token = match header.strip_prefix("Bearer") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim(),
        _ => header.trim(),
    };
    (!token.is_empty()).then(|| token.to_owned())
}

/// Login location with the original path as `from`. Path separators stay
/// readable; everything else that could break the query is escaped.
pub(crate) fn login_redirect(login_path: &str, path: &str) -> String {
    let from = urlencoding::encode(path).replace("%2F", "/");
    format!("{login_path}?from={from}")
}

/// Apply the rule table to one request.
pub fn evaluate(config: &GateConfig, path: &str, token: Option<&str>) -> FilterOutcome {
    if is_excluded(path) {
        return FilterOutcome::Continue;
    }

    let protected = config.protected_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()));
    if protected && token.is_none() {
        return FilterOutcome::Redirect(login_redirect(&config.login_path, path));
    }
    if path == config.login_path && token.is_some() {
        return FilterOutcome::Redirect(config.home_path.clone());
    }
    FilterOutcome::Continue
}

/// Axum middleware wrapping every page route.
pub async fn edge_redirect(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let token = request_token(request.headers(), &state.gate.token_cookie);

    match evaluate(&state.gate, &path, token.as_deref()) {
        FilterOutcome::Continue => next.run(request).await,
        FilterOutcome::Redirect(location) => {
            tracing::debug!(%path, %location, has_token = token.is_some(), "edge filter redirect");
            Redirect::temporary(&location).into_response()
        }
    }
}
