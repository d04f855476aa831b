use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::session::{RefreshBody, Session, SessionId, TokenGrant};
use crate::models::user::{AuthenticatedUser, Registration, Role};
use crate::services::api_client::{ApiRequest, SessionClient};

/// Upstream path that exchanges credentials for a token pair.
pub const TOKEN_PATH: &str = "/api/auth/token/";
/// Upstream path answering the current user.
pub const USER_PATH: &str = "/api/auth/user/";
/// Upstream path creating an account.
pub const REGISTER_PATH: &str = "/api/auth/register/";
/// Upstream path blacklisting a refresh token.
pub const LOGOUT_PATH: &str = "/api/auth/logout/";

/// Inline message of a registration the API refused without explanation.
pub const REGISTER_FAILED_MESSAGE: &str = "Ошибка регистрации";

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

/// Exchanges credentials for a token pair and stores it under `session`.
///
/// # Arguments
///
/// * `client` - The session client.
/// * `session` - The browser session the tokens belong to.
/// * `username` - The user's username.
/// * `password` - The user's password.
///
/// # Returns
///
/// A `Result<()>`; rejected credentials yield `AppError::Authentication`.
pub async fn login(
    client: &SessionClient,
    session: SessionId,
    username: &str,
    password: &str,
) -> Result<()> {
    tracing::debug!("🔐 Logging in user: {}", username);

    let request = ApiRequest::post_json(TOKEN_PATH, &Credentials { username, password })?;
    let response = client.send_anonymous(&request).await?;

    if response.status.is_client_error() {
        return Err(AppError::Authentication(response.detail()));
    }

    let grant: TokenGrant = response.json()?;
    client.store().save(session, &Session::from(grant)).await?;

    tracing::info!("✅ Tokens stored for session {}", session);
    Ok(())
}

/// Fetches the user behind the session's access token.
pub async fn current_user(client: &SessionClient, session: SessionId) -> Result<AuthenticatedUser> {
    client
        .get_json(session, &ApiRequest::get(USER_PATH))
        .await
}

/// Creates an account. New accounts always start as employees.
///
/// # Arguments
///
/// * `client` - The session client.
/// * `username` - The desired username.
/// * `password` - The desired password.
/// * `fullname` - The user's full name.
///
/// # Returns
///
/// A `Result<()>`; a rejected registration carries the API's `detail` message.
pub async fn register(
    client: &SessionClient,
    username: &str,
    password: &str,
    fullname: &str,
) -> Result<()> {
    tracing::debug!("📝 Registering user: {}", username);

    let request = ApiRequest::post_json(
        REGISTER_PATH,
        &Registration {
            username,
            password,
            fullname,
            role: Role::Employee,
        },
    )?;
    let response = client.send_anonymous(&request).await?;

    if !response.status.is_success() {
        return Err(AppError::Api {
            status: response.status.as_u16(),
            message: response
                .api_detail()
                .unwrap_or_else(|| REGISTER_FAILED_MESSAGE.to_string()),
        });
    }

    tracing::info!("✅ User registered: {}", username);
    Ok(())
}

/// Clears the session's tokens. The refresh token is blacklisted upstream on a
/// best-effort basis.
pub async fn logout(client: &SessionClient, session: SessionId) -> Result<()> {
    let tokens = client.store().load(session).await?;
    client.store().clear(session).await?;

    if let Some(refresh) = tokens.as_ref().and_then(|t| t.refresh_token.as_deref()) {
        let request = ApiRequest::post_json(LOGOUT_PATH, &RefreshBody { refresh })?;
        match client.send_anonymous(&request).await {
            Ok(response) if response.status.is_success() => {
                tracing::debug!("Refresh token blacklisted for session {}", session);
            }
            Ok(response) => {
                tracing::warn!("Upstream logout answered {}", response.status);
            }
            Err(e) => {
                tracing::warn!("Upstream logout failed: {}", e);
            }
        }
    }

    tracing::info!("👋 Session {} logged out", session);
    Ok(())
}
