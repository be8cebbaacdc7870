//! Outbound API modules
//!
//! - [`customer`] - Customer service messages
//! - [`template`] - Template message sending

use std::sync::Arc;

use crate::client::ApiClient;
use crate::token::TokenManager;

pub mod customer;
pub mod template;

pub use customer::{CustomerApi, CustomerMessage, MediaContent, TextContent};
pub use template::TemplateApi;

/// Context holding shared resources for API implementations.
#[derive(Clone)]
pub struct ApiContext {
    pub(crate) client: Arc<ApiClient>,
    pub(crate) token_manager: Arc<TokenManager>,
}

impl std::fmt::Debug for ApiContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiContext")
            .field("client", &"ApiClient { .. }")
            .field("token_manager", &"TokenManager { .. }")
            .finish()
    }
}

impl ApiContext {
    pub fn new(client: Arc<ApiClient>, token_manager: Arc<TokenManager>) -> Self {
        Self {
            client,
            token_manager,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn token_manager(&self) -> &TokenManager {
        &self.token_manager
    }
}

/// Trait for official account API implementations.
pub trait OaApi: Send + Sync {
    /// Get a reference to the shared context
    fn context(&self) -> &ApiContext;

    /// Name of this API for logging and error context.
    fn api_name(&self) -> &'static str {
        "unknown"
    }
}
