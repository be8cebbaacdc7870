//! Template Message API
//!
//! Sends structured, pre-approved template messages with named field
//! substitutions. The payload is forwarded to WeChat unchanged.

use std::sync::Arc;

use log::debug;
use serde::Deserialize;

use super::{ApiContext, OaApi};
use crate::client::ApiClient;
use crate::error::WechatError;
use crate::message::TemplateMessage;

#[derive(Debug, Clone, Deserialize)]
struct TemplateSendResponse {
    #[serde(default)]
    errcode: i32,
    #[serde(default)]
    errmsg: String,
    #[serde(default)]
    msgid: i64,
}

/// Template Message API
pub struct TemplateApi {
    context: Arc<ApiContext>,
}

impl TemplateApi {
    pub fn new(context: Arc<ApiContext>) -> Self {
        Self { context }
    }

    /// Send a template message, returning the message id WeChat assigns.
    ///
    /// POST /cgi-bin/message/template/send?access_token=ACCESS_TOKEN
    pub async fn send(&self, message: &TemplateMessage) -> Result<i64, WechatError> {
        let access_token = self.context().token_manager.get_token().await?;
        let path =
            ApiClient::append_access_token("/cgi-bin/message/template/send", &access_token);

        let response: TemplateSendResponse = self.context().client.post(&path, message).await?;

        WechatError::check_api(response.errcode, &response.errmsg)?;
        debug!(
            "[{}] template {} delivered, msgid={}",
            self.api_name(),
            message.template_id,
            response.msgid
        );

        Ok(response.msgid)
    }
}

impl OaApi for TemplateApi {
    fn api_name(&self) -> &'static str {
        "template"
    }

    fn context(&self) -> &ApiContext {
        &self.context
    }
}
