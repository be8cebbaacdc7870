//! The official account facade
//!
//! [`OfficialAccount`] composes the API client, token manager, webhook
//! crypto, and a single registered message handler behind the small
//! surface most integrations need: serve the webhook, send a customer
//! text, send a template message.

use std::sync::{Arc, PoisonError, RwLock};

use http::{Request, Response};
use log::{error, warn};

use crate::api::{ApiContext, CustomerApi, CustomerMessage, TemplateApi};
use crate::crypto::MessageCrypter;
use crate::error::WechatError;
use crate::message::{InboundMessage, Reply, TemplateMessage};
use crate::server::{MessageHandler, WebhookServer};
use crate::types::{AppId, AppSecret, VerifyToken};

/// Reply text sent by the default handler.
const NOT_IMPLEMENTED_REPLY: &str = "Server Error: Not Yet Implemented";

/// WeChat Official Account client.
///
/// Built with [`OfficialAccount::new`] or [`OfficialAccount::builder`].
/// The account always has an active message handler: until
/// [`set_message_handler`](Self::set_message_handler) is called, a
/// default handler logs each message and replies with a fixed
/// "not yet implemented" text.
///
/// # Example
///
/// ```rust,no_run
/// use wechat_oa_sdk::{OfficialAccount, Reply};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let account = OfficialAccount::new("appid", "appsecret", "token")?;
/// account.set_message_handler(|msg| Reply::text(format!("Req:{}", msg.text_content())));
/// # Ok(())
/// # }
/// ```
pub struct OfficialAccount {
    context: Arc<ApiContext>,
    token: VerifyToken,
    crypter: Option<MessageCrypter>,
    handler: RwLock<Arc<MessageHandler>>,
}

impl std::fmt::Debug for OfficialAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfficialAccount")
            .field("appid", &self.context.client().appid())
            .field("encrypted", &self.crypter.is_some())
            .finish_non_exhaustive()
    }
}

fn default_handler(msg: InboundMessage) -> Reply {
    warn!(
        "message handler not set, replying with placeholder (from={})",
        msg.from_user_name
    );
    Reply::text(NOT_IMPLEMENTED_REPLY)
}

impl OfficialAccount {
    pub fn builder() -> super::builder::OfficialAccountBuilder {
        super::builder::OfficialAccountBuilder::default()
    }

    /// Construct an account with default settings: production API host,
    /// in-memory token store, no message encryption.
    ///
    /// # Errors
    /// Fails only on invalid configuration or HTTP client construction.
    pub fn new(
        appid: impl Into<String>,
        appsecret: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, WechatError> {
        Self::builder()
            .appid(AppId::new(appid).map_err(WechatError::Config)?)
            .secret(AppSecret::new(appsecret).map_err(WechatError::Config)?)
            .token(VerifyToken::new(token).map_err(WechatError::Config)?)
            .build()
    }

    pub(crate) fn from_parts(
        context: Arc<ApiContext>,
        token: VerifyToken,
        crypter: Option<MessageCrypter>,
    ) -> Self {
        Self {
            context,
            token,
            crypter,
            handler: RwLock::new(Arc::new(default_handler)),
        }
    }

    pub fn appid(&self) -> &str {
        self.context.client().appid()
    }

    /// Current access token, fetched or refreshed on demand.
    pub async fn access_token(&self) -> Result<String, WechatError> {
        self.context.token_manager().get_token().await
    }

    /// Drop the cached access token.
    pub async fn invalidate_token(&self) {
        self.context.token_manager().invalidate().await;
    }

    /// Replace the message handler.
    ///
    /// Last write wins; the swap is atomic. A dispatch already in flight
    /// keeps the handler it started with, the next dispatch sees the new
    /// one.
    pub fn set_message_handler<F>(&self, handler: F)
    where
        F: Fn(InboundMessage) -> Reply + Send + Sync + 'static,
    {
        let mut slot = self
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Arc::new(handler);
    }

    fn current_handler(&self) -> Arc<MessageHandler> {
        self.handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Serve one inbound webhook request.
    ///
    /// Handles both the GET echo verification and POST message dispatch.
    /// Verification or parse failures are logged and answered with an
    /// empty body; this method never surfaces an error to the hosting
    /// HTTP server.
    pub fn serve_http(&self, req: &Request<String>) -> Response<String> {
        let server = WebhookServer::new(&self.token, self.crypter.as_ref(), self.current_handler());
        match server.handle(req) {
            Ok(response) => response,
            Err(err) => {
                error!("webhook request dropped: {err}");
                Response::new(String::new())
            }
        }
    }

    /// Send a plain-text customer service message, logging any failure.
    ///
    /// Fire-and-forget shorthand for
    /// [`Self::try_send_custom_text_message`]: the only failure channel
    /// is a single log line naming the recipient.
    pub async fn send_custom_text_message(&self, to_user: &str, text: &str) {
        if let Err(err) = self.try_send_custom_text_message(to_user, text).await {
            error!("send customer message to {to_user} failed: {err}");
        }
    }

    /// Send a plain-text customer service message.
    pub async fn try_send_custom_text_message(
        &self,
        to_user: &str,
        text: &str,
    ) -> Result<(), WechatError> {
        self.try_send_custom_message(to_user, CustomerMessage::text(text))
            .await
    }

    /// Send any customer service message type.
    pub async fn try_send_custom_message(
        &self,
        to_user: &str,
        message: CustomerMessage,
    ) -> Result<(), WechatError> {
        CustomerApi::new(self.context.clone())
            .send(to_user, message)
            .await
    }

    /// Send a template message, logging any failure.
    ///
    /// Fire-and-forget counterpart of
    /// [`Self::try_send_template_message`]; the only failure channel is
    /// a single log line naming the template.
    pub async fn send_template_message(&self, message: &TemplateMessage) {
        if let Err(err) = self.try_send_template_message(message).await {
            error!(
                "send template message (template_id={}) failed: {err}",
                message.template_id
            );
        }
    }

    /// Send a template message, returning the message id WeChat assigns.
    pub async fn try_send_template_message(
        &self,
        message: &TemplateMessage,
    ) -> Result<i64, WechatError> {
        TemplateApi::new(self.context.clone()).send(message).await
    }
}
