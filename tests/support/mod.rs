#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde_json::{Value, json};

use restodesk::{
    build_app,
    config::Config,
    repositories::session::{MemoryTokenStore, TokenStore},
    services::api_client::SessionClient,
    state::AppState,
};

static TRACING: Lazy<()> = Lazy::new(|| {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "restodesk=debug".into()),
        )
        .with_test_writer()
        .try_init()
        .ok();
});

struct Account {
    password: String,
    fullname: String,
    role: Option<String>,
}

#[derive(Default)]
struct FakeState {
    accounts: HashMap<String, Account>,
    access: HashMap<String, String>,
    refresh: HashMap<String, String>,
    issued: u64,
    refresh_calls: usize,
    refresh_delay: Option<Duration>,
    rotate_refresh: bool,
    hits: HashMap<String, usize>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    queries: HashMap<String, HashMap<String, String>>,
    registrations: Vec<Value>,
    blacklisted: Vec<String>,
}

/// In-process stand-in for the restaurant API.
#[derive(Clone, Default)]
pub struct FakeApi {
    state: Arc<Mutex<FakeState>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, username: &str, password: &str, role: Option<&str>) {
        self.state.lock().accounts.insert(
            username.to_string(),
            Account {
                password: password.to_string(),
                fullname: format!("{} Test", username),
                role: role.map(str::to_string),
            },
        );
    }

    /// Mints a token pair for `username` without going through login.
    pub fn issue(&self, username: &str) -> (String, String) {
        let mut state = self.state.lock();
        state.issued += 1;
        let access = format!("A{}", state.issued);
        let refresh = format!("R{}", state.issued);
        state.access.insert(access.clone(), username.to_string());
        state.refresh.insert(refresh.clone(), username.to_string());
        (access, refresh)
    }

    /// Every access token of `username` stops being accepted.
    pub fn expire_access(&self, username: &str) {
        self.state.lock().access.retain(|_, owner| owner != username);
    }

    /// Every refresh token of `username` stops being accepted.
    pub fn revoke_refresh(&self, username: &str) {
        self.state.lock().refresh.retain(|_, owner| owner != username);
    }

    pub fn is_valid_access(&self, token: &str) -> bool {
        self.state.lock().access.contains_key(token)
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        self.state.lock().refresh_delay = Some(delay);
    }

    pub fn rotate_refresh_tokens(&self) {
        self.state.lock().rotate_refresh = true;
    }

    pub fn fail(&self, path: &str) {
        self.state.lock().failing.insert(path.to_string());
    }

    /// The next request to `path` answers only after `delay`.
    pub fn delay_next(&self, path: &str, delay: Duration) {
        self.state.lock().delays.insert(path.to_string(), delay);
    }

    pub fn refresh_calls(&self) -> usize {
        self.state.lock().refresh_calls
    }

    pub fn hits(&self, path: &str) -> usize {
        self.state.lock().hits.get(path).copied().unwrap_or(0)
    }

    pub fn last_query(&self, path: &str) -> Option<HashMap<String, String>> {
        self.state.lock().queries.get(path).cloned()
    }

    pub fn registrations(&self) -> Vec<Value> {
        self.state.lock().registrations.clone()
    }

    pub fn blacklisted(&self) -> Vec<String> {
        self.state.lock().blacklisted.clone()
    }

    fn record(&self, path: &str, query: HashMap<String, String>) {
        let mut state = self.state.lock();
        *state.hits.entry(path.to_string()).or_insert(0) += 1;
        state.queries.insert(path.to_string(), query);
    }

    fn bearer_owner(&self, headers: &HeaderMap) -> Option<String> {
        let token = headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?
            .to_string();
        self.state.lock().access.get(&token).cloned()
    }

    /// Serves the fake on an ephemeral port.
    pub async fn spawn(&self) -> String {
        let router = Router::new()
            .route("/api/auth/token/", post(obtain_token))
            .route("/api/auth/token/refresh/", post(refresh_token))
            .route("/api/auth/user/", get(current_user))
            .route("/api/auth/register/", post(register))
            .route("/api/auth/logout/", post(blacklist))
            .route("/api/employees/", get(employees))
            .route("/api/auth/employee/", get(staff))
            .route("/api/salary_rules/", get(salary_rules))
            .route("/api/shifts/", get(shifts))
            .route("/api/salary_records/", get(salary_records))
            .route("/api/cash_shifts/", get(cash_shifts))
            .route("/api/shift_sales/", get(shift_sales))
            .route("/api/statistics/", get(statistics))
            .route("/api/always-401/", get(always_unauthorized))
            .with_state(self.clone());

        serve(router).await
    }
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Given token not valid for any token type"})),
    )
        .into_response()
}

async fn obtain_token(State(api): State<FakeApi>, Json(body): Json<Value>) -> Response {
    let username = body["username"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default();

    let accepted = api
        .state
        .lock()
        .accounts
        .get(&username)
        .is_some_and(|account| account.password == password);
    if !accepted {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "No active account found with the given credentials"})),
        )
            .into_response();
    }

    let (access, refresh) = api.issue(&username);
    Json(json!({"access": access, "refresh": refresh})).into_response()
}

async fn refresh_token(State(api): State<FakeApi>, Json(body): Json<Value>) -> Response {
    let delay = {
        let mut state = api.state.lock();
        state.refresh_calls += 1;
        state.refresh_delay
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let refresh = body["refresh"].as_str().unwrap_or_default().to_string();
    let mut state = api.state.lock();
    let Some(owner) = state.refresh.get(&refresh).cloned() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Token is invalid or expired"})),
        )
            .into_response();
    };

    state.access.retain(|_, user| *user != owner);
    state.issued += 1;
    let access = format!("A{}", state.issued);
    state.access.insert(access.clone(), owner.clone());

    if state.rotate_refresh {
        state.refresh.remove(&refresh);
        let rotated = format!("R{}", state.issued);
        state.refresh.insert(rotated.clone(), owner);
        return Json(json!({"access": access, "refresh": rotated})).into_response();
    }

    Json(json!({"access": access})).into_response()
}

async fn current_user(State(api): State<FakeApi>, headers: HeaderMap) -> Response {
    api.record("/api/auth/user/", HashMap::new());
    let Some(username) = api.bearer_owner(&headers) else {
        return unauthorized();
    };

    let state = api.state.lock();
    let account = &state.accounts[&username];
    Json(json!({
        "id": 1,
        "username": username,
        "fullname": account.fullname,
        "role": account.role,
    }))
    .into_response()
}

async fn register(State(api): State<FakeApi>, Json(body): Json<Value>) -> Response {
    let username = body["username"].as_str().unwrap_or_default().to_string();
    let mut state = api.state.lock();
    if state.accounts.contains_key(&username) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "A user with that username already exists."})),
        )
            .into_response();
    }

    state.accounts.insert(
        username,
        Account {
            password: body["password"].as_str().unwrap_or_default().to_string(),
            fullname: body["fullname"].as_str().unwrap_or_default().to_string(),
            role: body["role"].as_str().map(str::to_string),
        },
    );
    state.registrations.push(body);
    (StatusCode::CREATED, Json(json!({"id": 2}))).into_response()
}

async fn blacklist(State(api): State<FakeApi>, Json(body): Json<Value>) -> Response {
    if let Some(refresh) = body["refresh"].as_str() {
        let mut state = api.state.lock();
        state.refresh.remove(refresh);
        state.blacklisted.push(refresh.to_string());
    }
    StatusCode::OK.into_response()
}

/// Answers a bearer-protected report with `body`, honoring injected delays and failures.
async fn listing(
    api: &FakeApi,
    path: &str,
    headers: &HeaderMap,
    query: HashMap<String, String>,
    body: Value,
) -> Response {
    api.record(path, query);
    let delay = api.state.lock().delays.remove(path);
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    if api.bearer_owner(headers).is_none() {
        return unauthorized();
    }
    if api.state.lock().failing.contains(path) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }

    Json(body).into_response()
}

async fn employees(State(api): State<FakeApi>, headers: HeaderMap) -> Response {
    let body = json!([
        {"poster_id": 1, "name": "Ivan", "role_name": "waiter", "phone": "+7000", "last_in": "2025-03-01"},
        {"poster_id": 2, "name": "Olga"}
    ]);
    listing(&api, "/api/employees/", &headers, HashMap::new(), body).await
}

async fn staff(State(api): State<FakeApi>, headers: HeaderMap) -> Response {
    let body = json!([
        {"id": 3, "name": "Иван Петров", "role": 2, "role_name": "Официант", "is_active": true},
        {"id": 5, "name": "Ольга", "role": null, "role_name": null, "is_active": false}
    ]);
    listing(&api, "/api/auth/employee/", &headers, HashMap::new(), body).await
}

async fn salary_rules(State(api): State<FakeApi>, headers: HeaderMap) -> Response {
    let body = json!([
        {
            "id": 1,
            "role": 2,
            "role_name": "Официант",
            "category_name": null,
            "percent": "5.00",
            "fixed_per_shift": "1000.00",
            "fixed_per_item": null,
            "product_name": null,
            "workshops": [1, 2]
        }
    ]);
    listing(&api, "/api/salary_rules/", &headers, HashMap::new(), body).await
}

async fn shifts(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let body = json!([
        {"date": "2025-03-01", "employees": [3, 5]},
        {"date": "2025-03-02", "employees": [3]}
    ]);
    listing(&api, "/api/shifts/", &headers, query, body).await
}

async fn salary_records(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let body = json!({
        "3": {
            "1": {
                "total_salary": "1250.50",
                "details": {
                    "fixed": "1000.00",
                    "percent": "250.50",
                    "bonus": "0.00",
                    "write_off": "0.00",
                    "comment": null,
                    "bonus_breakdown": []
                }
            },
            "2": {
                "total_salary": "900.00",
                "details": {
                    "fixed": "1000.00",
                    "percent": "0.00",
                    "bonus": "",
                    "write_off": "-100.00",
                    "comment": "late",
                    "bonus_breakdown": []
                }
            }
        }
    });
    listing(&api, "/api/salary_records/", &headers, query, body).await
}

async fn cash_shifts(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let body = json!([
        {
            "poster_shift_id": "77",
            "date_start": "2025-02-03 10:00",
            "date_end": "2025-02-03 23:00",
            "amount_start": 1000.0,
            "amount_end": 5400.5,
            "amount_debit": 0.0,
            "amount_sell_cash": 4400.5,
            "amount_sell_card": 9100.0,
            "amount_credit": 0.0,
            "amount_collection": 0.0,
            "user_id_start": "3",
            "user_id_end": "3",
            "comment": null
        },
        {
            "poster_shift_id": "76",
            "date_start": "2025-02-02 10:00",
            "date_end": "2025-02-02 23:00",
            "amount_start": 1000.0,
            "amount_end": 1500.0,
            "amount_debit": 0.0,
            "amount_sell_cash": 500.0,
            "amount_sell_card": null,
            "amount_credit": 120.0,
            "amount_collection": 800.0,
            "user_id_start": "3",
            "user_id_end": "4",
            "comment": "short"
        }
    ]);
    listing(&api, "/api/cash_shifts/", &headers, query, body).await
}

async fn shift_sales(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let body = json!([
        {
            "shift_id": 41,
            "regular": [
                {"product_id": 10, "product_name": "Латте", "count": "2", "product_sum": "12.00",
                 "payed_sum": "12.00", "profit": "7.50", "workshop": "1",
                 "delivery_service": null, "tips": "0"},
                {"product_id": 11, "product_name": "Хинкали", "count": "5", "product_sum": "20.00",
                 "payed_sum": "18.00", "profit": "9.00", "workshop": "2",
                 "delivery_service": null, "tips": "0"}
            ],
            "delivery": [
                {"product_id": 11, "product_name": "Хинкали", "count": "3", "product_sum": "12.00",
                 "payed_sum": "12.00", "profit": "n/a", "workshop": "2",
                 "delivery_service": "", "tips": "1.00"}
            ],
            "difference": "-2.00",
            "tips": "1.00",
            "tips_by_service": {"Wolt": "1.00"}
        },
        {
            "shift_id": 42,
            "regular": [
                {"product_id": 12, "product_name": "Кальян", "count": "1", "product_sum": "40.00",
                 "payed_sum": "40.00", "profit": "25.00", "workshop": "3",
                 "delivery_service": null, "tips": "0"}
            ],
            "delivery": [],
            "difference": "0.50",
            "tips": "2.00",
            "tips_by_service": {"Wolt": "2.00"}
        }
    ]);
    listing(&api, "/api/shift_sales/", &headers, query, body).await
}

async fn statistics(
    State(api): State<FakeApi>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    listing(&api, "/api/statistics/", &headers, query, json!([])).await
}

async fn always_unauthorized(State(api): State<FakeApi>) -> Response {
    api.record("/api/always-401/", HashMap::new());
    unauthorized()
}

/// The front-end under test, wired to a fresh fake API.
pub struct TestContext {
    pub api: FakeApi,
    pub store: MemoryTokenStore,
    pub state: AppState,
    pub base_url: String,
    pub browser: reqwest::Client,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_store(|store| Arc::new(store) as Arc<dyn TokenStore>).await
    }

    /// Like `new`, with the token store seen by the app wrapped by `wrap`.
    /// `store` still inspects the underlying memory.
    pub async fn with_store<F>(wrap: F) -> Self
    where
        F: FnOnce(MemoryTokenStore) -> Arc<dyn TokenStore>,
    {
        Lazy::force(&TRACING);

        let api = FakeApi::new();
        let api_url = api.spawn().await;

        let store = MemoryTokenStore::new(Duration::from_secs(3600));
        let state = AppState::with_store(&Config::for_api(api_url), wrap(store.clone())).unwrap();
        let base_url = serve(build_app(state.clone())).await;

        Self {
            api,
            store,
            state,
            base_url,
            browser: Self::browser(),
        }
    }

    /// A browser that keeps cookies and does not follow redirects.
    pub fn browser() -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap()
    }

    pub fn client(&self) -> &SessionClient {
        &self.state.api
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.browser
            .post(self.url("/login"))
            .json(&json!({"username": username, "password": password}))
            .send()
            .await
            .unwrap()
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.browser.get(self.url(path)).send().await.unwrap()
    }

    /// Logs in a fresh owner account.
    pub async fn login_owner(&self) {
        self.api.add_user("alice", "password123", Some("owner"));
        let response = self.login("alice", "password123").await;
        assert_eq!(location(&response), "/ownerdashboard");
    }
}

pub fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}
