use axum::{
    Extension, Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    error::{LOGIN_PATH, see_other},
    models::session::SessionId,
    models::user::{AuthenticatedUser, Role},
    services::auth as auth_service,
    services::router::{Area, dashboard_root},
    state::AppState,
};

/// A navigation entry of a dashboard.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Section {
    pub id: &'static str,
    pub label: &'static str,
    pub path: &'static str,
}

/// What a dashboard root shows.
#[derive(Serialize, Debug)]
pub struct DashboardView {
    pub user: AuthenticatedUser,
    pub sections: Vec<Section>,
}

/// The owner's sidebar.
pub const OWNER_SECTIONS: [Section; 9] = [
    Section { id: "home", label: "Главная", path: "/ownerdashboard" },
    Section { id: "employees", label: "Сотрудники", path: "/ownerdashboard/employees" },
    Section { id: "staff", label: "Персонал", path: "/ownerdashboard/staff" },
    Section { id: "salary-rules", label: "Правила оплаты", path: "/ownerdashboard/salary-rules" },
    Section { id: "schedule", label: "График смен", path: "/ownerdashboard/schedule" },
    Section { id: "salaries", label: "Зарплата", path: "/ownerdashboard/salaries" },
    Section { id: "cash-shifts", label: "Кассовые смены", path: "/ownerdashboard/cash-shifts" },
    Section { id: "shift-sales", label: "Продажи смены", path: "/ownerdashboard/shift-sales" },
    Section { id: "statistics", label: "Статистика", path: "/ownerdashboard/statistics" },
];

/// Fetches the user and checks `area`, or answers the redirect to follow.
async fn enter(
    state: &AppState,
    session: SessionId,
    area: Area,
) -> Result<AuthenticatedUser, Response> {
    let user = match auth_service::current_user(&state.api, session).await {
        Ok(user) => user,
        Err(e) if e.is_session_loss() => return Err(e.into_response()),
        Err(e) => {
            tracing::error!("Failed to get user info: {}", e);
            return Err(see_other(LOGIN_PATH));
        }
    };

    if let Err(destination) = area.enter(user.role) {
        tracing::debug!(
            "{} redirected from {:?} to {}",
            user.username,
            area,
            destination.path()
        );
        return Err(see_other(destination.path()));
    }

    Ok(user)
}

/// The employee dashboard. Any authenticated role may open it.
pub async fn employee(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Response {
    match enter(&state, session, Area::EmployeeDashboard).await {
        Ok(user) => Json(DashboardView { user, sections: Vec::new() }).into_response(),
        Err(redirect) => redirect,
    }
}

/// The manager dashboard.
pub async fn manager(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Response {
    match enter(&state, session, Area::ManagerDashboard).await {
        Ok(user) => Json(DashboardView {
            user,
            sections: vec![Section {
                id: "home",
                label: "Главная",
                path: dashboard_root(Role::Manager),
            }],
        })
        .into_response(),
        Err(redirect) => redirect,
    }
}

/// The owner dashboard root. The user was resolved by `require_owner`.
pub async fn owner(Extension(user): Extension<AuthenticatedUser>) -> Json<DashboardView> {
    Json(DashboardView {
        user,
        sections: OWNER_SECTIONS.to_vec(),
    })
}
