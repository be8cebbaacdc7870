//! Access token management for the WeChat Official Account API
//!
//! Handles token caching, automatic refresh, and concurrency safety.
//! Storage is pluggable through [`TokenStore`] so tokens can live in
//! process memory, redis, or anything else the hosting application uses;
//! [`MemoryStore`] is the default chosen at construction.

use std::sync::Mutex as StdMutex;
use std::time::{Duration, SystemTime};

use log::debug;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::client::ApiClient;
use crate::error::WechatError;
use crate::types::AccessToken;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 100;

/// A cached access token with its absolute expiry time.
///
/// `SystemTime` rather than `Instant` so external stores can persist it.
#[derive(Debug, Clone)]
pub struct StoredToken {
    pub access_token: String,
    pub expires_at: SystemTime,
}

impl StoredToken {
    fn is_fresh(&self, buffer: Duration) -> bool {
        match SystemTime::now().checked_add(buffer) {
            Some(deadline) => deadline < self.expires_at,
            None => false,
        }
    }
}

/// Pluggable storage backend for the access token cache.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<StoredToken>;
    fn save(&self, token: StoredToken);
    fn clear(&self);
}

/// In-process token store, the default backend.
#[derive(Default)]
pub struct MemoryStore {
    slot: StdMutex<Option<StoredToken>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryStore {
    fn slot(&self) -> std::sync::MutexGuard<'_, Option<StoredToken>> {
        self.slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl TokenStore for MemoryStore {
    fn load(&self) -> Option<StoredToken> {
        self.slot().clone()
    }

    fn save(&self, token: StoredToken) {
        *self.slot() = Some(token);
    }

    fn clear(&self) {
        *self.slot() = None;
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    expires_in: u64,
    #[serde(default)]
    errcode: i32,
    #[serde(default)]
    errmsg: String,
}

impl TokenResponse {
    fn is_success(&self) -> bool {
        self.errcode == 0
    }
}

/// Manages the access token lifecycle with automatic refresh.
pub struct TokenManager {
    client: ApiClient,
    store: std::sync::Arc<dyn TokenStore>,
    refresh_lock: Mutex<()>,
    refresh_buffer: Duration,
}

impl TokenManager {
    pub fn new(client: ApiClient, store: std::sync::Arc<dyn TokenStore>) -> Self {
        Self {
            client,
            store,
            refresh_lock: Mutex::new(()),
            refresh_buffer: Duration::from_secs(5 * 60),
        }
    }

    /// Return a valid access token, refreshing it when within the expiry
    /// buffer. Concurrent callers refresh at most once.
    pub async fn get_token(&self) -> Result<String, WechatError> {
        if let Some(cached) = self.store.load() {
            if cached.is_fresh(self.refresh_buffer) {
                return Ok(cached.access_token);
            }
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited for the lock.
        if let Some(cached) = self.store.load() {
            if cached.is_fresh(self.refresh_buffer) {
                return Ok(cached.access_token);
            }
        }

        let response = self.fetch_token_with_retry().await?;
        let token = AccessToken::new(response.access_token).map_err(WechatError::Token)?;

        debug!("access token refreshed, expires_in={}s", response.expires_in);

        self.store.save(StoredToken {
            access_token: token.as_str().to_string(),
            expires_at: SystemTime::now() + Duration::from_secs(response.expires_in),
        });

        Ok(token.as_str().to_string())
    }

    async fn fetch_token_with_retry(&self) -> Result<TokenResponse, WechatError> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match self.fetch_token().await {
                Ok(response) => {
                    if response.is_success() {
                        return Ok(response);
                    }
                    return Err(WechatError::Api {
                        code: response.errcode,
                        message: response.errmsg,
                    });
                }
                Err(WechatError::Http(e)) => {
                    last_error = Some(WechatError::Http(e));
                    if attempt < MAX_RETRIES - 1 {
                        tokio::time::sleep(Duration::from_millis(
                            RETRY_DELAY_MS * (attempt + 1) as u64,
                        ))
                        .await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| WechatError::Token("Unknown error".to_string())))
    }

    async fn fetch_token(&self) -> Result<TokenResponse, WechatError> {
        let path = "/cgi-bin/token";
        let query = [
            ("grant_type", "client_credential"),
            ("appid", self.client.appid()),
            ("secret", self.client.secret()),
        ];

        self.client.get(path, &query).await
    }

    /// Drop the cached token so the next call fetches a fresh one.
    pub async fn invalidate(&self) {
        self.store.clear();
    }
}
