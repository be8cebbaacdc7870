//! WeChat Official Account message model
//!
//! - [`InboundMessage`] - inbound webhook message/event payload (XML)
//! - [`Reply`] - passive reply returned by a message handler
//! - [`TemplateMessage`] - template message payload for the send API

mod inbound;
mod reply;
mod template;

pub use inbound::{InboundMessage, MsgType};
pub use reply::Reply;
pub use template::{TemplateDataItem, TemplateMessage};
