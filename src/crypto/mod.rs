//! Webhook signature verification and message encryption
//!
//! WeChat signs every webhook request with
//! `signature = SHA1(sort(token, timestamp, nonce))` and, when message
//! encryption is enabled, additionally signs the encrypted payload with
//! `msg_signature = SHA1(sort(token, timestamp, nonce, msg_encrypt))`.

use sha1::{Digest, Sha1};

use crate::error::WechatError;

mod aes;

pub use aes::MessageCrypter;

/// Compute the webhook URL signature.
pub fn sign(token: &str, timestamp: &str, nonce: &str) -> String {
    let mut parts = [token, timestamp, nonce];
    parts.sort_unstable();
    hex::encode(Sha1::digest(parts.join("").as_bytes()))
}

/// Compute the message-body signature used in encrypted mode.
pub fn sign_message(token: &str, timestamp: &str, nonce: &str, msg_encrypt: &str) -> String {
    let mut parts = [token, timestamp, nonce, msg_encrypt];
    parts.sort_unstable();
    hex::encode(Sha1::digest(parts.join("").as_bytes()))
}

/// Verify the webhook URL signature.
pub fn verify(
    token: &str,
    timestamp: &str,
    nonce: &str,
    signature: &str,
) -> Result<(), WechatError> {
    if sign(token, timestamp, nonce) == signature {
        Ok(())
    } else {
        Err(WechatError::Signature(format!(
            "url signature mismatch (timestamp={timestamp}, nonce={nonce})"
        )))
    }
}

/// Verify the message-body signature of an encrypted request.
pub fn verify_message(
    token: &str,
    timestamp: &str,
    nonce: &str,
    msg_encrypt: &str,
    msg_signature: &str,
) -> Result<(), WechatError> {
    if sign_message(token, timestamp, nonce, msg_encrypt) == msg_signature {
        Ok(())
    } else {
        Err(WechatError::Signature(format!(
            "msg_signature mismatch (timestamp={timestamp}, nonce={nonce})"
        )))
    }
}
