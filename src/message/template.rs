use std::collections::HashMap;

use serde::Serialize;

/// Template message payload for the template send API.
///
/// Constructed by the caller and forwarded unchanged to WeChat.
///
/// # Example
///
/// ```rust
/// use wechat_oa_sdk::message::TemplateMessage;
///
/// let msg = TemplateMessage::new("oUser123", "TEMPLATE_ID")
///     .url("https://example.com/order/42")
///     .data("first", "Your order has shipped")
///     .data("remark", "Thanks!");
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct TemplateMessage {
    /// Recipient OpenID
    #[serde(rename = "touser")]
    pub to_user: String,
    /// Approved template ID
    pub template_id: String,
    /// Link opened when the user taps the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Named field substitutions
    pub data: HashMap<String, TemplateDataItem>,
    /// Caller-supplied dedup key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_msg_id: Option<String>,
}

/// A single template field substitution.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateDataItem {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl TemplateDataItem {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            color: None,
        }
    }

    pub fn colored(value: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            color: Some(color.into()),
        }
    }
}

impl TemplateMessage {
    pub fn new(to_user: impl Into<String>, template_id: impl Into<String>) -> Self {
        Self {
            to_user: to_user.into(),
            template_id: template_id.into(),
            url: None,
            data: HashMap::new(),
            client_msg_id: None,
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn data(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.data
            .insert(name.into(), TemplateDataItem::new(value));
        self
    }

    pub fn data_item(mut self, name: impl Into<String>, item: TemplateDataItem) -> Self {
        self.data.insert(name.into(), item);
        self
    }

    pub fn client_msg_id(mut self, id: impl Into<String>) -> Self {
        self.client_msg_id = Some(id.into());
        self
    }
}
