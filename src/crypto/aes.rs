//! AES-256-CBC codec for WeChat encrypted webhook messages
//!
//! Used when the account has an EncodingAESKey configured. The cleartext
//! frame is `random(16) | msg_len(4, big-endian) | msg | appid`, and the
//! IV is the first 16 bytes of the key, per the WeChat message
//! encryption document.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;

use crate::error::WechatError;

type Aes256CbcDecryptor = cbc::Decryptor<aes::Aes256>;
type Aes256CbcEncryptor = cbc::Encryptor<aes::Aes256>;

/// Codec for the `msg_encrypt` payload of encrypted webhook traffic.
#[derive(Clone)]
pub struct MessageCrypter {
    key: [u8; 32],
    appid: String,
}

impl std::fmt::Debug for MessageCrypter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageCrypter")
            .field("appid", &self.appid)
            .finish_non_exhaustive()
    }
}

impl MessageCrypter {
    /// Create a codec from the 43-character EncodingAESKey.
    ///
    /// The key is base64 without the trailing `=` padding; restoring the
    /// padding yields the 32-byte AES key.
    pub fn new(encoding_aes_key: &str, appid: impl Into<String>) -> Result<Self, WechatError> {
        let encoding_aes_key = encoding_aes_key.trim();
        if encoding_aes_key.len() != 43 {
            return Err(WechatError::Crypto(format!(
                "EncodingAESKey must be 43 characters, got {}",
                encoding_aes_key.len()
            )));
        }

        let decoded = BASE64
            .decode(format!("{encoding_aes_key}="))
            .map_err(|e| WechatError::Crypto(format!("Invalid EncodingAESKey: {e}")))?;
        let key: [u8; 32] = decoded
            .try_into()
            .map_err(|_| WechatError::Crypto("EncodingAESKey must decode to 32 bytes".into()))?;

        Ok(Self {
            key,
            appid: appid.into(),
        })
    }

    /// Decrypt a base64 `msg_encrypt` value into cleartext XML.
    pub fn decrypt(&self, msg_encrypt: &str) -> Result<String, WechatError> {
        let ciphertext = BASE64
            .decode(msg_encrypt)
            .map_err(|e| WechatError::Crypto(format!("Invalid msg_encrypt base64: {e}")))?;

        if ciphertext.len() < 32 || ciphertext.len() % 16 != 0 {
            return Err(WechatError::Crypto(format!(
                "Invalid ciphertext length: {} bytes",
                ciphertext.len()
            )));
        }

        let iv = &self.key[..16];
        let decryptor = Aes256CbcDecryptor::new(self.key.as_slice().into(), iv.into());

        let mut buffer = ciphertext;
        let cleartext = decryptor
            .decrypt_padded_mut::<Pkcs7>(&mut buffer)
            .map_err(|e| WechatError::Crypto(format!("AES decryption failed: {e:?}")))?;

        if cleartext.len() < 20 {
            return Err(WechatError::Crypto(format!(
                "Decrypted frame too short: {} bytes",
                cleartext.len()
            )));
        }

        // random(16) | msg_len(4) | msg | appid
        let msg_len = u32::from_be_bytes([
            cleartext[16],
            cleartext[17],
            cleartext[18],
            cleartext[19],
        ]) as usize;

        if cleartext.len() < 20 + msg_len {
            return Err(WechatError::Crypto(format!(
                "Declared message length {} exceeds frame of {} bytes",
                msg_len,
                cleartext.len() - 20
            )));
        }

        let msg = &cleartext[20..20 + msg_len];
        let appid = &cleartext[20 + msg_len..];

        if appid != self.appid.as_bytes() {
            return Err(WechatError::Crypto(format!(
                "AppID mismatch in decrypted message: expected '{}', got '{}'",
                self.appid,
                String::from_utf8_lossy(appid)
            )));
        }

        String::from_utf8(msg.to_vec())
            .map_err(|e| WechatError::Crypto(format!("Decrypted message is not UTF-8: {e}")))
    }

    /// Encrypt cleartext XML into a base64 `msg_encrypt` value.
    pub fn encrypt(&self, cleartext: &str) -> Result<String, WechatError> {
        let msg = cleartext.as_bytes();

        let mut frame = Vec::with_capacity(20 + msg.len() + self.appid.len());
        let mut random = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut random);
        frame.extend_from_slice(&random);
        frame.extend_from_slice(&(msg.len() as u32).to_be_bytes());
        frame.extend_from_slice(msg);
        frame.extend_from_slice(self.appid.as_bytes());

        let iv = &self.key[..16];
        let encryptor = Aes256CbcEncryptor::new(self.key.as_slice().into(), iv.into());

        let frame_len = frame.len();
        let mut buffer = frame;
        buffer.resize(frame_len + 16, 0);
        let ciphertext = encryptor
            .encrypt_padded_mut::<Pkcs7>(&mut buffer, frame_len)
            .map_err(|e| WechatError::Crypto(format!("AES encryption failed: {e:?}")))?;

        Ok(BASE64.encode(ciphertext))
    }
}
