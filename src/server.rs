//! Per-request webhook serving
//!
//! [`WebhookServer`] is built once per inbound HTTP request. It verifies
//! the request really came from WeChat, parses (and if needed decrypts)
//! the message body, invokes the registered handler, and renders the
//! reply. Each request is independent; nothing is retried or kept across
//! calls.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, Request, Response};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};

use crate::crypto::{self, MessageCrypter};
use crate::error::WechatError;
use crate::message::{InboundMessage, Reply};
use crate::types::VerifyToken;

/// Inbound message handler: consumes the parsed message, produces the
/// passive reply.
pub type MessageHandler = dyn Fn(InboundMessage) -> Reply + Send + Sync;

/// Request-scoped webhook context.
pub struct WebhookServer<'a> {
    token: &'a VerifyToken,
    crypter: Option<&'a MessageCrypter>,
    handler: Arc<MessageHandler>,
}

#[derive(Deserialize)]
#[serde(rename = "xml")]
struct EncryptedEnvelope {
    #[serde(rename = "Encrypt")]
    encrypt: String,
}

#[derive(Serialize)]
#[serde(rename = "xml")]
struct EncryptedReplyXml<'a> {
    #[serde(rename = "Encrypt")]
    encrypt: &'a str,
    #[serde(rename = "MsgSignature")]
    msg_signature: &'a str,
    #[serde(rename = "TimeStamp")]
    timestamp: &'a str,
    #[serde(rename = "Nonce")]
    nonce: &'a str,
}

impl<'a> WebhookServer<'a> {
    /// Build a server for one request. `handler` is the handler current
    /// at dispatch time; a later swap does not affect this request.
    pub fn new(
        token: &'a VerifyToken,
        crypter: Option<&'a MessageCrypter>,
        handler: Arc<MessageHandler>,
    ) -> Self {
        Self {
            token,
            crypter,
            handler,
        }
    }

    /// Verify, parse, dispatch to the handler, and render the reply.
    ///
    /// GET requests are WeChat's URL verification: the response echoes
    /// `echostr`. POST requests carry a message or event.
    ///
    /// # Errors
    /// Signature, parse, and crypto failures; the caller decides how to
    /// answer the request (the facade logs and sends an empty body).
    pub fn handle(&self, req: &Request<String>) -> Result<Response<String>, WechatError> {
        let params = parse_query(req.uri().query().unwrap_or(""));

        let signature = require_param(&params, "signature")?;
        let timestamp = require_param(&params, "timestamp")?;
        let nonce = require_param(&params, "nonce")?;

        crypto::verify(self.token.as_str(), timestamp, nonce, signature)?;

        if req.method() == Method::GET {
            let echostr = require_param(&params, "echostr")?;
            Ok(plain_response(echostr.to_string()))
        } else if req.method() == Method::POST {
            self.receive_and_reply(req.body(), &params, timestamp, nonce)
        } else {
            Err(WechatError::Signature(format!(
                "unsupported webhook method: {}",
                req.method()
            )))
        }
    }

    fn receive_and_reply(
        &self,
        body: &str,
        params: &HashMap<String, String>,
        timestamp: &str,
        nonce: &str,
    ) -> Result<Response<String>, WechatError> {
        if params.get("encrypt_type").map(String::as_str) != Some("aes") {
            return Ok(xml_response(self.dispatch(body)?));
        }

        let crypter = self.crypter.ok_or_else(|| {
            WechatError::Crypto("encrypted message but no EncodingAESKey configured".into())
        })?;
        let msg_signature = require_param(params, "msg_signature")?;
        let envelope: EncryptedEnvelope =
            serde_xml_rs::from_str(body).map_err(|e| WechatError::Xml(e.to_string()))?;
        crypto::verify_message(
            self.token.as_str(),
            timestamp,
            nonce,
            &envelope.encrypt,
            msg_signature,
        )?;

        let cleartext = crypter.decrypt(&envelope.encrypt)?;
        let reply_xml = self.dispatch(&cleartext)?;

        let encrypt = crypter.encrypt(&reply_xml)?;
        let reply_nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        let reply_timestamp = unix_now().to_string();
        let msg_signature = crypto::sign_message(
            self.token.as_str(),
            &reply_timestamp,
            &reply_nonce,
            &encrypt,
        );
        let reply_envelope = serde_xml_rs::to_string(&EncryptedReplyXml {
            encrypt: &encrypt,
            msg_signature: &msg_signature,
            timestamp: &reply_timestamp,
            nonce: &reply_nonce,
        })
        .map_err(|e| WechatError::Xml(e.to_string()))?;

        Ok(xml_response(reply_envelope))
    }

    /// Parse the cleartext body, invoke the handler, render the reply
    /// XML with sender and recipient swapped.
    fn dispatch(&self, xml: &str) -> Result<String, WechatError> {
        let msg = InboundMessage::from_xml(xml)?;
        let reply_to = msg.from_user_name.clone();
        let reply_from = msg.to_user_name.clone();
        let reply = (self.handler)(msg);
        reply.to_xml(&reply_to, &reply_from, unix_now())
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn require_param<'p>(
    params: &'p HashMap<String, String>,
    name: &str,
) -> Result<&'p str, WechatError> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| WechatError::Signature(format!("missing query parameter: {name}")))
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            Some((percent_decode(key), percent_decode(value)))
        })
        .collect()
}

fn percent_decode(input: &str) -> String {
    percent_encoding::percent_decode_str(input)
        .decode_utf8_lossy()
        .into_owned()
}

fn plain_response(body: String) -> Response<String> {
    let mut response = Response::new(body);
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

fn xml_response(body: String) -> Response<String> {
    let mut response = Response::new(body);
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/xml; charset=utf-8"),
    );
    response
}
