use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use http::{Method, StatusCode, header};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use zeroize::Zeroizing;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::session::{RefreshBody, RefreshGrant, Session, SessionId};
use crate::repositories::session::TokenStore;

/// Upstream path that mints a new access token.
pub const REFRESH_PATH: &str = "/api/auth/token/refresh/";

/// Whether a request may still trigger a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// The first call. A 401 leads to one refresh and one retry.
    First,
    /// The re-issued call. A 401 is final.
    Retry,
}

/// An owned description of an upstream call, so it can be re-issued after a refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// A POST with a JSON body.
    pub fn post_json<T: Serialize>(path: impl Into<String>, payload: &T) -> Result<Self> {
        let body = sonic_rs::to_vec(payload)
            .map_err(|e| AppError::Internal(format!("Request serialization failed: {}", e)))?;
        let mut request = Self::new(Method::POST, path);
        request.body = Some(body);
        Ok(request)
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

/// A fully read upstream answer.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ApiResponse {
    /// Fails with `AppError::Api` unless the status is 2xx.
    pub fn error_for_status(self) -> Result<Self> {
        if self.status.is_success() {
            return Ok(self);
        }
        Err(AppError::Api {
            status: self.status.as_u16(),
            message: self.detail(),
        })
    }

    /// Decodes a successful JSON body.
    pub fn json<T: DeserializeOwned>(self) -> Result<T> {
        let response = self.error_for_status()?;
        sonic_rs::from_slice(&response.body).map_err(|e| AppError::Decode(e.to_string()))
    }

    /// The API's `detail` message, when the body carries one.
    pub fn api_detail(&self) -> Option<String> {
        #[derive(serde::Deserialize)]
        struct Detail {
            detail: String,
        }

        sonic_rs::from_slice::<Detail>(&self.body)
            .ok()
            .map(|d| d.detail)
    }

    /// The API's `detail` message, or the canonical reason phrase.
    pub fn detail(&self) -> String {
        self.api_detail().unwrap_or_else(|| {
            self.status
                .canonical_reason()
                .unwrap_or("Unexpected response")
                .to_string()
        })
    }
}

/// Why a refresh cycle ended the session.
#[derive(Debug, Clone)]
struct RefreshFailure(String);

type RefreshOutcome = std::result::Result<Session, RefreshFailure>;
type PendingRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Authenticated client for the restaurant API.
///
/// Every request carries the session's bearer token. A 401 on the first attempt
/// triggers one refresh, shared by all concurrent callers of the same session,
/// and one retry with the new token.
#[derive(Clone)]
pub struct SessionClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    store: Arc<dyn TokenStore>,
    inflight: Arc<Mutex<HashMap<SessionId, RefreshSlot>>>,
    settled_grace: Duration,
}

impl SessionClient {
    /// Creates a new `SessionClient`.
    pub fn new(config: &Config, store: Arc<dyn TokenStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: Arc::from(config.api_base_url.trim_end_matches('/')),
            store,
            inflight: Arc::new(Mutex::new(HashMap::new())),
            settled_grace: config.request_timeout.saturating_mul(2),
        })
    }

    /// The token store this client reads and rotates.
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Sends a request on behalf of `session`, refreshing at most once.
    pub async fn send(&self, session: SessionId, request: &ApiRequest) -> Result<ApiResponse> {
        self.send_attempt(session, request, Attempt::First).await
    }

    /// Sends a request whose attempt count is already known.
    pub async fn send_attempt(
        &self,
        session: SessionId,
        request: &ApiRequest,
        attempt: Attempt,
    ) -> Result<ApiResponse> {
        let mut attempt = attempt;
        let mut tokens = self.store.load(session).await?;

        loop {
            let response = dispatch(&self.http, &self.base_url, request, tokens.as_ref()).await?;
            if response.status != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            match attempt {
                Attempt::Retry => {
                    tracing::warn!(
                        "{} {} rejected again after refresh, giving up",
                        request.method,
                        request.path
                    );
                    return Err(AppError::Authentication(response.detail()));
                }
                Attempt::First => {
                    tracing::debug!(
                        "{} {} answered 401, refreshing session {}",
                        request.method,
                        request.path,
                        session
                    );
                    tokens = Some(self.refresh(session, tokens.as_ref()).await?);
                    attempt = Attempt::Retry;
                }
            }
        }
    }

    /// Sends a request without credentials (login, registration).
    pub async fn send_anonymous(&self, request: &ApiRequest) -> Result<ApiResponse> {
        dispatch(&self.http, &self.base_url, request, None).await
    }

    /// Sends and decodes a JSON answer.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        session: SessionId,
        request: &ApiRequest,
    ) -> Result<T> {
        self.send(session, request).await?.json()
    }

    /// Mints a new access token for `session`, joining a refresh already in flight.
    ///
    /// `stale` is the token pair that was just rejected. The slot of a session
    /// remembers which access token its refresh replaced, so a caller holding that
    /// same token joins it even after it has settled, instead of spending the
    /// refresh token a second time.
    async fn refresh(&self, session: SessionId, stale: Option<&Session>) -> Result<Session> {
        let stale_access = stale.map(|s| s.access_token.as_str()).unwrap_or_default();

        let pending = {
            let mut inflight = self.inflight.lock();
            let grace = self.settled_grace;
            inflight.retain(|_, slot| !slot.is_spent(grace));

            match inflight.get(&session) {
                Some(slot) if slot.joinable_by(stale_access) => {
                    tracing::debug!("Session {} joins a shared refresh", session);
                    slot.pending.clone()
                }
                _ => {
                    let pending = run_refresh(
                        self.http.clone(),
                        self.base_url.clone(),
                        self.store.clone(),
                        session,
                    )
                    .boxed()
                    .shared();
                    inflight.insert(
                        session,
                        RefreshSlot {
                            replaces: Zeroizing::new(stale_access.to_string()),
                            pending: pending.clone(),
                            started: Instant::now(),
                        },
                    );
                    pending
                }
            }
        };

        pending.await.map_err(|RefreshFailure(reason)| {
            tracing::warn!("Session {} expired: {}", session, reason);
            AppError::SessionExpired
        })
    }

    /// Number of sessions holding a refresh slot.
    pub fn refresh_slots(&self) -> usize {
        self.inflight.lock().len()
    }
}

/// The refresh of one session, kept after settling so late callers still join it.
struct RefreshSlot {
    /// The access token this refresh replaced.
    replaces: Zeroizing<String>,
    pending: PendingRefresh,
    started: Instant,
}

impl RefreshSlot {
    fn settled(&self) -> bool {
        self.pending.peek().is_some()
    }

    /// A running refresh is always joined; a settled one only by holders of the
    /// token it replaced.
    fn joinable_by(&self, stale_access: &str) -> bool {
        !self.settled() || self.replaces.as_str() == stale_access
    }

    fn is_spent(&self, grace: Duration) -> bool {
        self.settled() && self.started.elapsed() >= grace
    }
}

async fn dispatch(
    http: &reqwest::Client,
    base_url: &str,
    request: &ApiRequest,
    tokens: Option<&Session>,
) -> Result<ApiResponse> {
    let url = format!("{}{}", base_url, request.path);
    let mut builder = http.request(request.method.clone(), url);

    if !request.query.is_empty() {
        builder = builder.query(&request.query);
    }
    if let Some(tokens) = tokens {
        builder = builder.header(header::AUTHORIZATION, tokens.bearer());
    }
    if let Some(body) = &request.body {
        builder = builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.clone());
    }

    let response = builder.send().await?;
    let status = response.status();
    let body = response.bytes().await?;

    tracing::debug!("{} {} -> {}", request.method, request.path, status);
    Ok(ApiResponse { status, body })
}

/// One upstream refresh. On any failure the stored tokens are cleared.
async fn run_refresh(
    http: reqwest::Client,
    base_url: Arc<str>,
    store: Arc<dyn TokenStore>,
    session: SessionId,
) -> RefreshOutcome {
    let outcome = exchange_refresh_token(&http, &base_url, store.as_ref(), session).await;

    match outcome {
        Ok(tokens) => {
            tracing::info!("Access token refreshed for session {}", session);
            Ok(tokens)
        }
        Err(e) => {
            tracing::error!("Refresh token is invalid, logging out: {}", e);
            if let Err(clear_err) = store.clear(session).await {
                tracing::error!("Failed to clear tokens of session {}: {}", session, clear_err);
            }
            Err(RefreshFailure(e.to_string()))
        }
    }
}

async fn exchange_refresh_token(
    http: &reqwest::Client,
    base_url: &str,
    store: &dyn TokenStore,
    session: SessionId,
) -> Result<Session> {
    let current = store
        .load(session)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    let refresh_token = current
        .refresh_token
        .clone()
        .ok_or_else(|| AppError::Authentication("No refresh token stored".to_string()))?;

    let request = ApiRequest::post_json(
        REFRESH_PATH,
        &RefreshBody {
            refresh: &refresh_token,
        },
    )?;
    let grant: RefreshGrant = dispatch(http, base_url, &request, None).await?.json()?;

    let rotated = current.rotated(&grant);
    store.save(session, &rotated).await?;
    Ok(rotated)
}
