use crate::error::LOGIN_PATH;
use crate::models::session::SessionId;
use crate::models::user::Role;
use crate::services::api_client::SessionClient;
use crate::services::auth;

/// Inline message shown when login fails for any reason.
pub const LOGIN_FAILED_MESSAGE: &str = "Неверный логин или пароль";

/// Where the browser is sent next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Login,
    Dashboard(Role),
}

impl Destination {
    pub fn path(self) -> &'static str {
        match self {
            Destination::Login => LOGIN_PATH,
            Destination::Dashboard(role) => dashboard_root(role),
        }
    }
}

/// The dashboard root each role lands on.
pub fn dashboard_root(role: Role) -> &'static str {
    match role {
        Role::Employee => "/employee",
        Role::Manager => "/manager",
        Role::Owner => "/ownerdashboard",
    }
}

/// A protected part of the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    EmployeeDashboard,
    ManagerDashboard,
    OwnerDashboard,
}

impl Area {
    pub fn admits(self, role: Role) -> bool {
        match self {
            Area::EmployeeDashboard => true,
            Area::ManagerDashboard => matches!(role, Role::Manager | Role::Owner),
            Area::OwnerDashboard => role == Role::Owner,
        }
    }

    /// `Ok` when `role` may enter, otherwise the role's own dashboard.
    pub fn enter(self, role: Role) -> Result<(), Destination> {
        if self.admits(role) {
            Ok(())
        } else {
            Err(Destination::Dashboard(role))
        }
    }
}

/// Progress of one login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginFlow {
    LoggingIn,
    FetchingRole,
    RedirectedTo(Destination),
    LoginError(String),
}

impl LoginFlow {
    pub fn start() -> Self {
        LoginFlow::LoggingIn
    }

    pub fn credentials_accepted(self) -> Self {
        match self {
            LoginFlow::LoggingIn => LoginFlow::FetchingRole,
            other => other,
        }
    }

    pub fn credentials_rejected(self) -> Self {
        match self {
            LoginFlow::LoggingIn => LoginFlow::LoginError(LOGIN_FAILED_MESSAGE.to_string()),
            other => other,
        }
    }

    pub fn role_resolved(self, role: Role) -> Self {
        match self {
            LoginFlow::FetchingRole => LoginFlow::RedirectedTo(Destination::Dashboard(role)),
            other => other,
        }
    }

    pub fn role_unavailable(self) -> Self {
        match self {
            LoginFlow::FetchingRole => LoginFlow::LoginError(LOGIN_FAILED_MESSAGE.to_string()),
            other => other,
        }
    }

    /// Leaving the error display re-enters the form.
    pub fn retry(self) -> Self {
        match self {
            LoginFlow::LoginError(_) => LoginFlow::LoggingIn,
            other => other,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LoginFlow::RedirectedTo(_) | LoginFlow::LoginError(_))
    }
}

/// Runs the login flow to a terminal state.
///
/// # Arguments
///
/// * `client` - The session client.
/// * `session` - The browser session receiving the tokens.
/// * `username` - The submitted username.
/// * `password` - The submitted password.
///
/// # Returns
///
/// `RedirectedTo` the role's dashboard, or `LoginError` with the inline message.
pub async fn run_login(
    client: &SessionClient,
    session: SessionId,
    username: &str,
    password: &str,
) -> LoginFlow {
    let flow = LoginFlow::start();

    let flow = match auth::login(client, session, username, password).await {
        Ok(()) => flow.credentials_accepted(),
        Err(e) => {
            tracing::warn!("Login failed for {}: {}", username, e);
            return flow.credentials_rejected();
        }
    };

    match auth::current_user(client, session).await {
        Ok(user) => {
            tracing::info!("✅ {} logged in as {}", user.username, user.role.as_str());
            flow.role_resolved(user.role)
        }
        Err(e) => {
            tracing::error!("Failed to get user info: {}", e);
            if let Err(clear_err) = client.store().clear(session).await {
                tracing::error!("Failed to clear tokens of session {}: {}", session, clear_err);
            }
            flow.role_unavailable()
        }
    }
}
