use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Request as ReqwestRequest, Response as ReqwestResponse};
use tower::{Layer, Service};

use crate::api::ApiContext;
use crate::crypto::MessageCrypter;
use crate::error::WechatError;
use crate::token::{MemoryStore, TokenManager, TokenStore};
use crate::types::{AppId, AppSecret, VerifyToken};

use super::api_client::{
    ApiClient, DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS,
};
use super::OfficialAccount;

type MiddlewareFuture =
    Pin<Box<dyn Future<Output = Result<ReqwestResponse, reqwest::Error>> + Send>>;
type MiddlewareExecutor = Arc<dyn Fn(ReqwestRequest) -> MiddlewareFuture + Send + Sync>;

/// Builder for [`OfficialAccount`].
///
/// `appid`, `secret`, and `token` are required; everything else has a
/// production default: the real API host, 30s/10s timeouts, an in-memory
/// token store, and plaintext webhook mode (no EncodingAESKey).
#[must_use]
#[derive(Default)]
pub struct OfficialAccountBuilder<M = ()> {
    appid: Option<AppId>,
    secret: Option<AppSecret>,
    token: Option<VerifyToken>,
    encoding_aes_key: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    token_store: Option<Arc<dyn TokenStore>>,
    middleware: Option<M>,
}

impl<M> std::fmt::Debug for OfficialAccountBuilder<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfficialAccountBuilder")
            .field("appid", &self.appid)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("encrypted", &self.encoding_aes_key.is_some())
            .field("middleware", &self.middleware.as_ref().map(|_| ".."))
            .finish_non_exhaustive()
    }
}

impl<M> OfficialAccountBuilder<M> {
    pub fn appid(mut self, appid: AppId) -> Self {
        self.appid = Some(appid);
        self
    }

    pub fn secret(mut self, secret: AppSecret) -> Self {
        self.secret = Some(secret);
        self
    }

    /// Webhook verification token from the account admin console.
    pub fn token(mut self, token: VerifyToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Enable encrypted webhook mode with the 43-character EncodingAESKey.
    pub fn encoding_aes_key(mut self, key: impl Into<String>) -> Self {
        self.encoding_aes_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Access token storage backend. Defaults to [`MemoryStore`].
    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.token_store = Some(store);
        self
    }

    pub fn with_middleware<M2>(self, middleware: M2) -> OfficialAccountBuilder<M2>
    where
        M2: Layer<ApiClient> + Clone + Send + Sync + 'static,
    {
        OfficialAccountBuilder {
            appid: self.appid,
            secret: self.secret,
            token: self.token,
            encoding_aes_key: self.encoding_aes_key,
            base_url: self.base_url,
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            token_store: self.token_store,
            middleware: Some(middleware),
        }
    }

    pub fn build(self) -> Result<OfficialAccount, WechatError>
    where
        M: Layer<ApiClient> + Clone + Send + Sync + 'static,
        M::Service: Service<ReqwestRequest, Response = ReqwestResponse, Error = reqwest::Error>
            + Clone
            + Send
            + Sync
            + 'static,
        <M::Service as Service<ReqwestRequest>>::Future: Send + 'static,
    {
        let appid = self
            .appid
            .ok_or_else(|| WechatError::Config("appid is required".to_string()))?;
        let secret = self
            .secret
            .ok_or_else(|| WechatError::Config("secret is required".to_string()))?;
        let token = self
            .token
            .ok_or_else(|| WechatError::Config("token is required".to_string()))?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(WechatError::Config(format!(
                "base_url must start with http:// or https://, got: {base_url}"
            )));
        }

        let timeout = self
            .timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let connect_timeout = self
            .connect_timeout
            .unwrap_or(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS));

        let crypter = self
            .encoding_aes_key
            .map(|key| MessageCrypter::new(&key, appid.as_str()))
            .transpose()?;

        let mut client = ApiClient::builder()
            .appid(appid)
            .secret(secret)
            .base_url(base_url)
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        if let Some(middleware) = self.middleware {
            let service = middleware.layer(client.clone());
            let executor = make_middleware_executor(service);
            client = client.with_middleware_executor(executor);
        }

        let store = self
            .token_store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));

        let client_arc = Arc::new(client);
        let token_manager = Arc::new(TokenManager::new(ApiClient::clone(&client_arc), store));
        let context = Arc::new(ApiContext::new(client_arc, token_manager));

        Ok(OfficialAccount::from_parts(context, token, crypter))
    }
}

fn make_middleware_executor<S>(service: S) -> MiddlewareExecutor
where
    S: Service<ReqwestRequest, Response = ReqwestResponse, Error = reqwest::Error>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
{
    let service = Arc::new(service);

    Arc::new(move |request: ReqwestRequest| {
        let mut service = (*service).clone();
        Box::pin(async move { service.call(request).await })
    })
}
