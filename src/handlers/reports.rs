use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::{
    error::Result,
    models::session::SessionId,
    services::reports::{
        self as report_service, CashShiftQuery, MonthQuery, ScreenView, ShiftSalesQuery,
        StatisticsQuery,
    },
    state::AppState,
};

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Renders a screen. A superseded answer is a 409 the browser discards.
fn screen<T: Serialize>(view: ScreenView<T>) -> Response {
    let status = match view {
        ScreenView::Superseded => StatusCode::CONFLICT,
        _ => StatusCode::OK,
    };
    (status, Json(view)).into_response()
}

/// Lists POS staff.
pub async fn employees(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Result<Response> {
    let view = report_service::employees(&state.api, &state.views, session).await?;
    Ok(screen(view))
}

/// Lists staff known to the salary engine.
pub async fn staff(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Result<Response> {
    let view = report_service::staff(&state.api, &state.views, session).await?;
    Ok(screen(view))
}

/// Lists pay rules.
pub async fn salary_rules(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Result<Response> {
    let view = report_service::salary_rules(&state.api, &state.views, session).await?;
    Ok(screen(view))
}

/// Shows the shift schedule of a month.
pub async fn schedule(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<MonthQuery>,
) -> Result<Response> {
    let view = report_service::schedule(&state.api, &state.views, session, &query, today()).await?;
    Ok(screen(view))
}

/// Shows the salary table of a month.
pub async fn salaries(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<MonthQuery>,
) -> Result<Response> {
    let view = report_service::salaries(&state.api, &state.views, session, &query, today()).await?;
    Ok(screen(view))
}

/// Shows cash-register shifts.
pub async fn cash_shifts(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<CashShiftQuery>,
) -> Result<Response> {
    let view =
        report_service::cash_shifts(&state.api, &state.views, session, &query, today()).await?;
    Ok(screen(view))
}

/// Shows product sales of one shift.
pub async fn shift_sales(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<ShiftSalesQuery>,
) -> Result<Response> {
    let view =
        report_service::shift_sales(&state.api, &state.views, session, &query, today()).await?;
    Ok(screen(view))
}

/// Shows aggregated analytics.
pub async fn statistics(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<StatisticsQuery>,
) -> Result<Response> {
    let view =
        report_service::statistics(&state.api, &state.views, session, &query, today()).await?;
    Ok(screen(view))
}
