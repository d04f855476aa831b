use std::time::Duration;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use http::{HeaderValue, Method, header};
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

pub mod config;
pub mod error;
pub mod state;

pub mod models {
    pub mod report;
    pub mod session;
    pub mod user;
}

pub mod repositories {
    pub mod session;
}

pub mod services {
    pub mod api_client;
    pub mod auth;
    pub mod reports;
    pub mod router;
    pub mod views;
}

pub mod handlers {
    pub mod auth;
    pub mod dashboards;
    pub mod reports;
}

pub mod middleware_layer {
    pub mod auth;
}

pub mod validation {
    pub mod auth;
    pub mod reports;
}

use state::AppState;

/// Builds the front-end router over `state`.
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        )
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::COOKIE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86400));

    let public_routes = Router::new()
        .route("/", get(handlers::auth::index))
        .route("/login", post(handlers::auth::login))
        .route("/register", post(handlers::auth::register))
        .route("/logout", post(handlers::auth::logout))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/me", get(handlers::auth::me))
        .route("/employee", get(handlers::dashboards::employee))
        .route("/manager", get(handlers::dashboards::manager))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_session,
        ))
        .with_state(state.clone());

    let owner_routes = Router::new()
        .route("/ownerdashboard", get(handlers::dashboards::owner))
        .route(
            "/ownerdashboard/employees",
            get(handlers::reports::employees),
        )
        .route("/ownerdashboard/staff", get(handlers::reports::staff))
        .route(
            "/ownerdashboard/salary-rules",
            get(handlers::reports::salary_rules),
        )
        .route(
            "/ownerdashboard/schedule",
            get(handlers::reports::schedule),
        )
        .route(
            "/ownerdashboard/salaries",
            get(handlers::reports::salaries),
        )
        .route(
            "/ownerdashboard/cash-shifts",
            get(handlers::reports::cash_shifts),
        )
        .route(
            "/ownerdashboard/shift-sales",
            get(handlers::reports::shift_sales),
        )
        .route(
            "/ownerdashboard/statistics",
            get(handlers::reports::statistics),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_owner,
        ))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_session,
        ))
        .with_state(state.clone());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(owner_routes)
        .fallback(handlers::auth::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(CookieManagerLayer::new())
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::default())
                        .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                        .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
                ),
        )
        .layer(cors)
}
