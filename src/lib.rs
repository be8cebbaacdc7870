//! WeChat Official Account SDK for Rust
//!
//! Serve the official account webhook, reply to inbound messages, and
//! send customer-service and template messages, with access tokens
//! cached and refreshed automatically.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wechat_oa_sdk::{OfficialAccount, Reply};
//! use wechat_oa_sdk::message::TemplateMessage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let account = OfficialAccount::new("appid", "appsecret", "token")?;
//!
//!     // Reply to inbound messages
//!     account.set_message_handler(|msg| {
//!         Reply::text(format!("Req:{}", msg.text_content()))
//!     });
//!     // Mount `account.serve_http(&request)` under your HTTP server.
//!
//!     // Customer service message (failures are logged, not returned)
//!     account.send_custom_text_message("oUser123", "hello").await;
//!
//!     // Template message
//!     let msg = TemplateMessage::new("oUser123", "TEMPLATE_ID")
//!         .url("https://example.com")
//!         .data("first", "Hello")
//!         .data("remark", "world");
//!     let msgid = account.try_send_template_message(&msg).await?;
//!     println!("sent template message {msgid}");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`client`] - HTTP client and the [`OfficialAccount`] facade
//! - [`server`] - per-request webhook verification and dispatch
//! - [`message`] - inbound messages, replies, template payloads
//! - [`api`] - customer-service and template send APIs
//! - [`token`] - access token cache with pluggable storage
//! - [`crypto`] - webhook signatures and message encryption
//! - [`middleware`] - tower middleware for outbound calls
//! - [`error`] - error types
//!
//! ## Webhook serving
//!
//! [`OfficialAccount::serve_http`] consumes an [`http::Request`] and
//! produces an [`http::Response`], so it mounts under any HTTP server
//! that can hand over the request body as a string. Verification and
//! parse failures never error out of the facade; they are logged and
//! the request is answered with an empty body.

pub mod api;
pub mod client;
pub mod crypto;
pub mod error;
pub mod message;
pub mod middleware;
pub mod server;
pub mod token;
pub mod types;

pub use client::{OfficialAccount, OfficialAccountBuilder};
pub use error::WechatError;
pub use message::{InboundMessage, MsgType, Reply, TemplateDataItem, TemplateMessage};
pub use server::MessageHandler;
