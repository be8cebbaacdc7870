//! Customer Service Message API
//!
//! Customer service messages are sent outside the passive-reply window
//! through a dedicated send endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! use wechat_oa_sdk::api::customer::{CustomerApi, CustomerMessage};
//!
//! let api = CustomerApi::new(context);
//! api.send("user_openid", CustomerMessage::text("Hello!")).await?;
//! ```

use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use super::{ApiContext, OaApi};
use crate::client::ApiClient;
use crate::error::WechatError;

/// Message types for customer service messages
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "msgtype", rename_all = "lowercase")]
pub enum CustomerMessage {
    /// Text message
    Text { text: TextContent },
    /// Image message
    Image { image: MediaContent },
    /// Voice message
    Voice { voice: MediaContent },
}

impl CustomerMessage {
    pub fn text(content: impl Into<String>) -> Self {
        CustomerMessage::Text {
            text: TextContent {
                content: content.into(),
            },
        }
    }

    pub fn image(media_id: impl Into<String>) -> Self {
        CustomerMessage::Image {
            image: MediaContent {
                media_id: media_id.into(),
            },
        }
    }

    pub fn voice(media_id: impl Into<String>) -> Self {
        CustomerMessage::Voice {
            voice: MediaContent {
                media_id: media_id.into(),
            },
        }
    }
}

/// Text message content
#[derive(Debug, Clone, Serialize)]
pub struct TextContent {
    pub content: String,
}

/// Media message content (image, voice)
#[derive(Debug, Clone, Serialize)]
pub struct MediaContent {
    pub media_id: String,
}

#[derive(Debug, Clone, Serialize)]
struct CustomerMessageRequest {
    touser: String,
    #[serde(flatten)]
    msgtype: CustomerMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct CustomerMessageResponse {
    #[serde(default)]
    errcode: i32,
    #[serde(default)]
    errmsg: String,
}

/// Customer Service Message API
pub struct CustomerApi {
    context: Arc<ApiContext>,
}

impl CustomerApi {
    pub fn new(context: Arc<ApiContext>) -> Self {
        Self { context }
    }

    /// Send a customer service message.
    ///
    /// POST /cgi-bin/message/custom/send?access_token=ACCESS_TOKEN
    ///
    /// # Arguments
    /// * `touser` - Recipient's OpenID
    /// * `message` - Message to send
    pub async fn send(&self, touser: &str, message: CustomerMessage) -> Result<(), WechatError> {
        let access_token = self.context().token_manager.get_token().await?;
        let path =
            ApiClient::append_access_token("/cgi-bin/message/custom/send", &access_token);

        let request = CustomerMessageRequest {
            touser: touser.to_string(),
            msgtype: message,
        };

        let response: CustomerMessageResponse = self.context().client.post(&path, &request).await?;

        WechatError::check_api(response.errcode, &response.errmsg)?;
        debug!("[{}] message delivered to {touser}", self.api_name());

        Ok(())
    }
}

impl OaApi for CustomerApi {
    fn api_name(&self) -> &'static str {
        "customer"
    }

    fn context(&self) -> &ApiContext {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_message_serialization() {
        let msg = CustomerMessage::text("Hello");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"msgtype\":\"text\""));
        assert!(json.contains("\"text\":{\"content\":\"Hello\"}"));
    }

    #[test]
    fn test_image_message_serialization() {
        let msg = CustomerMessage::image("media123");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"msgtype\":\"image\""));
        assert!(json.contains("\"image\":{\"media_id\":\"media123\"}"));
    }

    #[test]
    fn test_api_name_for_log_context() {
        let client = Arc::new(
            ApiClient::builder()
                .appid(crate::types::AppId::new("wx1234567890abcdef").unwrap())
                .secret(crate::types::AppSecret::new("secret1234567890ab").unwrap())
                .build()
                .unwrap(),
        );
        let manager = Arc::new(crate::token::TokenManager::new(
            ApiClient::clone(&client),
            Arc::new(crate::token::MemoryStore::new()),
        ));
        let api = CustomerApi::new(Arc::new(ApiContext::new(client, manager)));
        assert_eq!(api.api_name(), "customer");
    }

    #[test]
    fn test_request_wire_format() {
        let request = CustomerMessageRequest {
            touser: "oUser123".to_string(),
            msgtype: CustomerMessage::text("hi"),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["touser"], "oUser123");
        assert_eq!(json["msgtype"], "text");
        assert_eq!(json["text"]["content"], "hi");
    }
}
