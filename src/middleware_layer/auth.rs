use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_cookies::cookie::time::Duration;
use tower_cookies::{Cookie, Cookies};

use crate::{
    error::{AppError, LOGIN_PATH, SessionEnded, see_other},
    models::session::SessionId,
    services::auth as auth_service,
    services::router::Area,
    state::AppState,
};

/// Name of the cookie carrying the browser session id.
pub const SESSION_COOKIE: &str = "session_id";

/// Extracts the session id from the request cookies.
///
/// # Arguments
///
/// * `cookies` - The request cookies.
///
/// # Returns
///
/// An `Option` containing the session ID if found.
pub fn extract_session_id(cookies: &Cookies) -> Option<SessionId> {
    cookies
        .get(SESSION_COOKIE)
        .and_then(|cookie| SessionId::parse(cookie.value()))
}

/// Drops the session cookie from the browser.
pub fn remove_session_cookie(cookies: &Cookies) {
    let mut session_cookie = Cookie::new(SESSION_COOKIE, "");
    session_cookie.set_max_age(Duration::seconds(0));
    session_cookie.set_path("/");
    cookies.remove(session_cookie);
}

/// A middleware that requires a stored access token.
///
/// Without one the browser is sent to the login page and nothing is fetched
/// upstream. Otherwise the `SessionId` is attached to the request extensions.
/// When the handler ends the session, the cookie is removed on the way out.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `cookies` - The request cookies.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
///
/// # Returns
///
/// The handler's `Response`, or a redirect to `/login`.
pub async fn require_session(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    tracing::debug!("🔐 Checking session...");

    let Some(session) = extract_session_id(&cookies) else {
        tracing::debug!("❌ No session_id cookie found");
        return AppError::Unauthenticated.into_response();
    };

    match state.api.store().load(session).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            tracing::debug!("❌ No access token stored for session {}", session);
            return AppError::Unauthenticated.into_response();
        }
        Err(e) => {
            tracing::error!("❌ Token store unavailable: {}", e);
            return e.into_response();
        }
    }

    tracing::debug!("✅ Session {} has an access token", session);
    request.extensions_mut().insert(session);

    let response = next.run(request).await;
    if response.extensions().get::<SessionEnded>().is_some() {
        tracing::debug!("🍪 Session {} ended, removing cookie", session);
        remove_session_cookie(&cookies);
    }

    response
}

/// A middleware admitting only owners. Runs after `require_session`.
///
/// The current user is fetched per request and attached to the extensions;
/// other roles are sent to their own dashboard.
pub async fn require_owner(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(session) = request.extensions().get::<SessionId>().copied() else {
        return AppError::Unauthenticated.into_response();
    };

    let user = match auth_service::current_user(&state.api, session).await {
        Ok(user) => user,
        Err(e) if e.is_session_loss() => return e.into_response(),
        Err(e) => {
            tracing::error!("Failed to get user info: {}", e);
            return see_other(LOGIN_PATH);
        }
    };

    if let Err(destination) = Area::OwnerDashboard.enter(user.role) {
        tracing::warn!("❌ {} is not an owner", user.username);
        return see_other(destination.path());
    }

    request.extensions_mut().insert(user);
    next.run(request).await
}
