use serde::Deserialize;

use crate::error::WechatError;

/// Inbound message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MsgType {
    Text,
    Image,
    Voice,
    Video,
    #[serde(rename = "shortvideo")]
    ShortVideo,
    Location,
    Link,
    Event,
}

/// Inbound webhook payload: the union of every message and event shape
/// WeChat delivers to an official account.
///
/// WeChat sends a single flat XML document whose populated fields depend
/// on [`MsgType`]; absent fields deserialize to `None`. Handlers receive
/// this read-only.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename = "xml")]
pub struct InboundMessage {
    /// The official account (recipient of the inbound message)
    #[serde(rename = "ToUserName")]
    pub to_user_name: String,
    /// OpenID of the sending user
    #[serde(rename = "FromUserName")]
    pub from_user_name: String,
    #[serde(rename = "CreateTime")]
    pub create_time: i64,
    #[serde(rename = "MsgType")]
    pub msg_type: MsgType,
    #[serde(rename = "MsgId", default)]
    pub msg_id: Option<i64>,

    // text
    #[serde(rename = "Content", default)]
    pub content: Option<String>,

    // image / voice / video / shortvideo
    #[serde(rename = "PicUrl", default)]
    pub pic_url: Option<String>,
    #[serde(rename = "MediaId", default)]
    pub media_id: Option<String>,
    #[serde(rename = "Format", default)]
    pub format: Option<String>,
    #[serde(rename = "Recognition", default)]
    pub recognition: Option<String>,
    #[serde(rename = "ThumbMediaId", default)]
    pub thumb_media_id: Option<String>,

    // location
    #[serde(rename = "Location_X", default)]
    pub location_x: Option<f64>,
    #[serde(rename = "Location_Y", default)]
    pub location_y: Option<f64>,
    #[serde(rename = "Scale", default)]
    pub scale: Option<u32>,
    #[serde(rename = "Label", default)]
    pub label: Option<String>,

    // link
    #[serde(rename = "Title", default)]
    pub title: Option<String>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
    #[serde(rename = "Url", default)]
    pub url: Option<String>,

    // event (subscribe/unsubscribe/SCAN/LOCATION/CLICK/VIEW)
    #[serde(rename = "Event", default)]
    pub event: Option<String>,
    #[serde(rename = "EventKey", default)]
    pub event_key: Option<String>,
    #[serde(rename = "Ticket", default)]
    pub ticket: Option<String>,
}

impl InboundMessage {
    /// Parse an inbound message from its XML body.
    pub fn from_xml(xml: &str) -> Result<Self, WechatError> {
        serde_xml_rs::from_str(xml).map_err(|e| WechatError::Xml(e.to_string()))
    }

    /// Text content, empty for non-text messages.
    pub fn text_content(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}
