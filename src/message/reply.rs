use serde::Serialize;

use crate::error::WechatError;

/// Passive reply produced by a message handler.
///
/// Serialized to the XML body of the webhook response with the sender and
/// recipient of the inbound message swapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text { content: String },
    Image { media_id: String },
    Voice { media_id: String },
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Reply::Text {
            content: content.into(),
        }
    }

    pub fn image(media_id: impl Into<String>) -> Self {
        Reply::Image {
            media_id: media_id.into(),
        }
    }

    pub fn voice(media_id: impl Into<String>) -> Self {
        Reply::Voice {
            media_id: media_id.into(),
        }
    }

    /// Render the reply XML addressed from the account to the user.
    pub(crate) fn to_xml(
        &self,
        to_user_name: &str,
        from_user_name: &str,
        create_time: i64,
    ) -> Result<String, WechatError> {
        let rendered = match self {
            Reply::Text { content } => serde_xml_rs::to_string(&TextReplyXml {
                to_user_name,
                from_user_name,
                create_time,
                msg_type: "text",
                content,
            }),
            Reply::Image { media_id } => serde_xml_rs::to_string(&MediaReplyXml {
                to_user_name,
                from_user_name,
                create_time,
                msg_type: "image",
                image: Some(MediaRefXml { media_id }),
                voice: None,
            }),
            Reply::Voice { media_id } => serde_xml_rs::to_string(&MediaReplyXml {
                to_user_name,
                from_user_name,
                create_time,
                msg_type: "voice",
                image: None,
                voice: Some(MediaRefXml { media_id }),
            }),
        };

        rendered.map_err(|e| WechatError::Xml(e.to_string()))
    }
}

#[derive(Serialize)]
#[serde(rename = "xml")]
struct TextReplyXml<'a> {
    #[serde(rename = "ToUserName")]
    to_user_name: &'a str,
    #[serde(rename = "FromUserName")]
    from_user_name: &'a str,
    #[serde(rename = "CreateTime")]
    create_time: i64,
    #[serde(rename = "MsgType")]
    msg_type: &'a str,
    #[serde(rename = "Content")]
    content: &'a str,
}

#[derive(Serialize)]
struct MediaRefXml<'a> {
    #[serde(rename = "MediaId")]
    media_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename = "xml")]
struct MediaReplyXml<'a> {
    #[serde(rename = "ToUserName")]
    to_user_name: &'a str,
    #[serde(rename = "FromUserName")]
    from_user_name: &'a str,
    #[serde(rename = "CreateTime")]
    create_time: i64,
    #[serde(rename = "MsgType")]
    msg_type: &'a str,
    #[serde(rename = "Image", skip_serializing_if = "Option::is_none")]
    image: Option<MediaRefXml<'a>>,
    #[serde(rename = "Voice", skip_serializing_if = "Option::is_none")]
    voice: Option<MediaRefXml<'a>>,
}
