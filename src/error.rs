use thiserror::Error;

/// WeChat SDK error types
#[derive(Debug, Error)]
pub enum WechatError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML message error: {0}")]
    Xml(String),

    #[error("WeChat API error (code={code}): {message}")]
    Api { code: i32, message: String },

    #[error("Access token error: {0}")]
    Token(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Signature verification failed: {0}")]
    Signature(String),

    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl WechatError {
    /// Turn a WeChat `errcode`/`errmsg` envelope into a `Result`.
    ///
    /// WeChat reports API-level failures inside a 200 response body;
    /// `errcode == 0` means success.
    pub fn check_api(errcode: i32, errmsg: &str) -> Result<(), WechatError> {
        if errcode == 0 {
            Ok(())
        } else {
            Err(WechatError::Api {
                code: errcode,
                message: errmsg.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_api_ok() {
        assert!(WechatError::check_api(0, "ok").is_ok());
    }

    #[test]
    fn test_check_api_error() {
        let err = WechatError::check_api(40001, "invalid credential").unwrap_err();
        match err {
            WechatError::Api { code, message } => {
                assert_eq!(code, 40001);
                assert_eq!(message, "invalid credential");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_display() {
        let err = WechatError::Signature("signature mismatch".to_string());
        assert_eq!(
            err.to_string(),
            "Signature verification failed: signature mismatch"
        );
    }
}
