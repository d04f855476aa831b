use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::error::Result;
use crate::models::session::{Session, SessionId};

/// Fixed key under which the access token is kept.
pub const ACCESS_KEY: &str = "access";
/// Fixed key under which the refresh token is kept.
pub const REFRESH_KEY: &str = "refresh";

/// Storage key of `field` for `session`.
pub fn token_key(session: SessionId, field: &str) -> String {
    format!("session:{}:{}", session, field)
}

/// Key-value persistence of the token pair of each browser session.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Returns the stored tokens, if an access token is present.
    async fn load(&self, session: SessionId) -> Result<Option<Session>>;

    /// Replaces the stored tokens.
    async fn save(&self, session: SessionId, tokens: &Session) -> Result<()>;

    /// Removes both tokens.
    async fn clear(&self, session: SessionId) -> Result<()>;
}

/// Process-local token storage. Entries expire like their Redis counterparts.
#[derive(Clone)]
pub struct MemoryTokenStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    ttl: Duration,
}

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

impl MemoryTokenStore {
    /// Creates a store whose entries live for `ttl` after their last save.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self, session: SessionId) -> Result<Option<Session>> {
        let now = Instant::now();
        let entries = self.entries.lock();
        let live = |field: &str| {
            entries
                .get(&token_key(session, field))
                .filter(|entry| entry.is_live(now))
                .map(|entry| entry.value.clone())
        };

        Ok(live(ACCESS_KEY).map(|access| Session::new(access, live(REFRESH_KEY))))
    }

    async fn save(&self, session: SessionId, tokens: &Session) -> Result<()> {
        let now = Instant::now();
        let expires_at = now + self.ttl;
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| entry.is_live(now));

        entries.insert(
            token_key(session, ACCESS_KEY),
            Entry {
                value: tokens.access_token.clone(),
                expires_at,
            },
        );
        match &tokens.refresh_token {
            Some(refresh) => {
                entries.insert(
                    token_key(session, REFRESH_KEY),
                    Entry {
                        value: refresh.clone(),
                        expires_at,
                    },
                );
            }
            None => {
                entries.remove(&token_key(session, REFRESH_KEY));
            }
        }
        Ok(())
    }

    async fn clear(&self, session: SessionId) -> Result<()> {
        let mut entries = self.entries.lock();
        entries.remove(&token_key(session, ACCESS_KEY));
        entries.remove(&token_key(session, REFRESH_KEY));
        Ok(())
    }
}

/// Redis-backed token storage; keys expire with the session.
#[derive(Clone)]
pub struct RedisTokenStore {
    redis: ConnectionManager,
    ttl_secs: u64,
}

impl RedisTokenStore {
    pub fn new(redis: ConnectionManager, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn load(&self, session: SessionId) -> Result<Option<Session>> {
        let mut redis = self.redis.clone();
        let (access, refresh): (Option<String>, Option<String>) = redis
            .mget(&[token_key(session, ACCESS_KEY), token_key(session, REFRESH_KEY)])
            .await?;

        Ok(access.map(|access| Session::new(access, refresh)))
    }

    async fn save(&self, session: SessionId, tokens: &Session) -> Result<()> {
        let mut redis = self.redis.clone();
        let _: () = redis
            .set_ex(
                token_key(session, ACCESS_KEY),
                tokens.access_token.as_str(),
                self.ttl_secs,
            )
            .await?;

        match &tokens.refresh_token {
            Some(refresh) => {
                let _: () = redis
                    .set_ex(token_key(session, REFRESH_KEY), refresh.as_str(), self.ttl_secs)
                    .await?;
            }
            None => {
                let _: () = redis.del(token_key(session, REFRESH_KEY)).await?;
            }
        }

        tracing::debug!("Tokens saved to Redis for session {}", session);
        Ok(())
    }

    async fn clear(&self, session: SessionId) -> Result<()> {
        let mut redis = self.redis.clone();
        let _: () = redis
            .del(&[token_key(session, ACCESS_KEY), token_key(session, REFRESH_KEY)])
            .await?;

        tracing::debug!("Tokens removed from Redis for session {}", session);
        Ok(())
    }
}
