use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tower_cookies::cookie::time::Duration;
use tower_cookies::{Cookie, Cookies};

use crate::{
    error::{AppError, LOGIN_PATH, Result, json_error, see_other},
    middleware_layer::auth::{SESSION_COOKIE, extract_session_id, remove_session_cookie},
    models::session::SessionId,
    models::user::{AuthenticatedUser, LoginRequest, RegisterRequest},
    services::auth as auth_service,
    services::router::{self, LOGIN_FAILED_MESSAGE, LoginFlow},
    state::AppState,
    validation::auth::validate_fullname,
};

/// Creates the session cookie.
fn create_session_cookie(state: &AppState, session: SessionId) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, session.to_string());

    cookie.set_http_only(true);
    if state.config.production {
        cookie.set_secure(true);
    }

    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    let max_age = i64::try_from(state.config.session_ttl_secs()).unwrap_or(i64::MAX);
    cookie.set_max_age(Duration::seconds(max_age));
    cookie.set_path("/");

    cookie
}

/// Sends `/` to the login page.
pub async fn index() -> Response {
    see_other(LOGIN_PATH)
}

/// Handles the login form.
///
/// A fresh session id is issued on every successful login; only then are the
/// tokens of a previous session carried by the same browser dropped.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Response {
    let username = payload.username.trim();
    tracing::info!("🔐 Login attempt for: {}", username);

    if username.is_empty() || payload.password.is_empty() {
        return json_error(StatusCode::UNAUTHORIZED, LOGIN_FAILED_MESSAGE);
    }

    let session = SessionId::generate();
    tracing::debug!("🔑 Generated session_id: {}", session);

    match router::run_login(&state.api, session, username, &payload.password).await {
        LoginFlow::RedirectedTo(destination) => {
            if let Some(previous) = extract_session_id(&cookies) {
                if let Err(e) = state.api.store().clear(previous).await {
                    tracing::warn!("Failed to clear previous session {}: {}", previous, e);
                }
                state.views.forget(previous);
            }
            cookies.add(create_session_cookie(&state, session));
            tracing::info!("✅ Session cookie added, redirecting to {}", destination.path());
            see_other(destination.path())
        }
        LoginFlow::LoginError(message) => json_error(StatusCode::UNAUTHORIZED, &message),
        other => {
            tracing::error!("Login flow stopped in a non-terminal state: {:?}", other);
            AppError::Internal("Login did not complete".to_string()).into_response()
        }
    }
}

/// Handles the registration form. New accounts are employees and must log in
/// afterwards. Only the full name is checked here; username and password rules
/// belong to the API, whose `detail` is shown verbatim.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Response {
    let username = payload.username.trim();
    let fullname = payload.fullname.trim();
    tracing::info!("📝 Register attempt for: {}", username);

    if let Err(AppError::Validation(message)) = validate_fullname(fullname) {
        return json_error(StatusCode::BAD_REQUEST, &message);
    }

    match auth_service::register(&state.api, username, &payload.password, fullname).await {
        Ok(()) => see_other(LOGIN_PATH),
        Err(AppError::Api { message, .. }) => json_error(StatusCode::BAD_REQUEST, &message),
        Err(e) => {
            tracing::error!("Registration failed: {}", e);
            json_error(StatusCode::BAD_REQUEST, auth_service::REGISTER_FAILED_MESSAGE)
        }
    }
}

/// Handles logout. Works with or without a live session.
#[axum::debug_handler]
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> Response {
    if let Some(session) = extract_session_id(&cookies) {
        if let Err(e) = auth_service::logout(&state.api, session).await {
            tracing::error!("Failed to clear session {}: {}", session, e);
        }
        state.views.forget(session);
    }

    remove_session_cookie(&cookies);
    see_other(LOGIN_PATH)
}

/// Answers the current user.
pub async fn me(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Result<Json<AuthenticatedUser>> {
    let user = auth_service::current_user(&state.api, session).await?;
    Ok(Json(user))
}

/// Answers unknown paths.
pub async fn not_found() -> Response {
    let body = sonic_rs::to_string(&sonic_rs::json!({
        "error": "Страница не найдена",
        "login": LOGIN_PATH
    }))
    .unwrap_or_else(|_| r#"{"error":"Not found"}"#.to_string());

    (
        StatusCode::NOT_FOUND,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}
