use std::sync::Arc;

use redis::aio::ConnectionManager;

use crate::config::Config;
use crate::error::Result;
use crate::repositories::session::{MemoryTokenStore, RedisTokenStore, TokenStore};
use crate::services::api_client::SessionClient;
use crate::services::views::ViewGenerations;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Config,
    /// The authenticated client of the restaurant API.
    pub api: SessionClient,
    /// The fetch generations of the report screens.
    pub views: ViewGenerations,
}

impl AppState {
    /// Creates a new `AppState`, connecting to Redis when configured.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let store: Arc<dyn TokenStore> = match &config.redis_url {
            Some(url) => {
                let redis_client = redis::Client::open(url.as_str())?;
                let redis = ConnectionManager::new(redis_client).await?;
                tracing::info!("✅ Redis token store initialized");
                Arc::new(RedisTokenStore::new(redis, config.session_ttl_secs()))
            }
            None => {
                tracing::info!("✅ In-memory token store initialized");
                Arc::new(MemoryTokenStore::new(config.session_ttl()))
            }
        };

        Self::with_store(config, store)
    }

    /// Creates an `AppState` over an existing token store.
    pub fn with_store(config: &Config, store: Arc<dyn TokenStore>) -> Result<Self> {
        let api = SessionClient::new(config, store)?;
        tracing::info!("✅ API client initialized for {}", config.api_base_url);

        Ok(AppState {
            config: config.clone(),
            api,
            views: ViewGenerations::new(config.session_ttl()),
        })
    }
}
