//! Outbound send tests using WireMock
//!
//! These tests mock the WeChat API to verify request bodies and the
//! fire-and-forget contract of the send shortcuts without real network
//! calls.

use std::sync::{Arc, Mutex};

use futures::future::join_all;
use log::{Level, LevelFilter, Log, Metadata, Record};
use wechat_oa_sdk::message::{TemplateDataItem, TemplateMessage};
use wechat_oa_sdk::types::{AppId, AppSecret, VerifyToken};
use wechat_oa_sdk::{OfficialAccount, WechatError};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Collects `error!` records so tests can assert on the failure log
/// contract of the fire-and-forget send shortcuts.
struct RecordingLogger {
    records: Mutex<Vec<String>>,
}

impl Log for RecordingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Error
    }

    fn log(&self, record: &Record) {
        if record.level() == Level::Error {
            self.records.lock().unwrap().push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

static LOGGER: RecordingLogger = RecordingLogger {
    records: Mutex::new(Vec::new()),
};

/// Create an account pointing to the mock server
fn create_test_account(mock_server: &MockServer) -> OfficialAccount {
    OfficialAccount::builder()
        .appid(AppId::new("wx1234567890abcdef").unwrap())
        .secret(AppSecret::new("test_secret_12345").unwrap())
        .token(VerifyToken::new("token").unwrap())
        .base_url(mock_server.uri())
        .build()
        .unwrap()
}

async fn mount_token_endpoint(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "mock_token_123",
            "expires_in": 7200
        })))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_access_token_refresh() {
    let mock_server = MockServer::start().await;
    mount_token_endpoint(&mock_server).await;

    let account = create_test_account(&mock_server);

    assert_eq!(account.access_token().await.unwrap(), "mock_token_123");
}

#[tokio::test]
async fn test_send_custom_text_message_success() {
    let mock_server = MockServer::start().await;
    mount_token_endpoint(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/message/custom/send"))
        .and(query_param("access_token", "mock_token_123"))
        .and(body_partial_json(serde_json::json!({
            "touser": "toUser",
            "msgtype": "text",
            "text": { "content": "custom text" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 0,
            "errmsg": "ok"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let account = create_test_account(&mock_server);

    account
        .try_send_custom_text_message("toUser", "custom text")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_send_custom_text_message_swallows_api_error() {
    let mock_server = MockServer::start().await;
    mount_token_endpoint(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/message/custom/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 45015,
            "errmsg": "response out of time limit"
        })))
        .mount(&mock_server)
        .await;

    let account = create_test_account(&mock_server);

    // The shorthand logs the failure and returns normally.
    account.send_custom_text_message("toUser", "custom text").await;
}

#[tokio::test]
async fn test_send_failure_logs_exactly_once_naming_recipient() {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(LevelFilter::Error);

    let mock_server = MockServer::start().await;
    mount_token_endpoint(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/message/custom/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 45015,
            "errmsg": "response out of time limit"
        })))
        .mount(&mock_server)
        .await;

    let account = create_test_account(&mock_server);

    // Recipient unique to this test, so records from other tests in the
    // binary do not interfere.
    account
        .send_custom_text_message("oRecipient42x", "custom text")
        .await;

    let records = LOGGER.records.lock().unwrap();
    let matching: Vec<_> = records
        .iter()
        .filter(|r| r.contains("oRecipient42x"))
        .collect();
    assert_eq!(matching.len(), 1);
    assert!(matching[0].contains("failed"));
    assert!(matching[0].contains("45015"));
}

#[tokio::test]
async fn test_send_custom_text_message_swallows_network_error() {
    // An account pointed at a closed port: every send fails at the
    // transport layer, and the shorthand still returns normally.
    let account = OfficialAccount::builder()
        .appid(AppId::new("appid").unwrap())
        .secret(AppSecret::new("appsecret").unwrap())
        .token(VerifyToken::new("token").unwrap())
        .base_url("http://127.0.0.1:1")
        .build()
        .unwrap();

    account.send_custom_text_message("toUser", "custom text").await;
}

#[tokio::test]
async fn test_try_send_custom_text_message_surfaces_api_error() {
    let mock_server = MockServer::start().await;
    mount_token_endpoint(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/message/custom/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 40001,
            "errmsg": "invalid credential"
        })))
        .mount(&mock_server)
        .await;

    let account = create_test_account(&mock_server);

    let err = account
        .try_send_custom_text_message("toUser", "hi")
        .await
        .unwrap_err();

    match err {
        WechatError::Api { code, message } => {
            assert_eq!(code, 40001);
            assert_eq!(message, "invalid credential");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_send_template_message_forwards_payload_unchanged() {
    let mock_server = MockServer::start().await;
    mount_token_endpoint(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/message/template/send"))
        .and(query_param("access_token", "mock_token_123"))
        .and(body_partial_json(serde_json::json!({
            "touser": "toUser",
            "template_id": "uRUXCN_s4Dn27rxSINVL",
            "url": "https://example.com",
            "data": {
                "first": { "value": "Hello" },
                "result": { "value": "100", "color": "#173177" }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 0,
            "errmsg": "ok",
            "msgid": 200228332
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let account = create_test_account(&mock_server);

    let msg = TemplateMessage::new("toUser", "uRUXCN_s4Dn27rxSINVL")
        .url("https://example.com")
        .data("first", "Hello")
        .data_item("result", TemplateDataItem::colored("100", "#173177"));

    let msgid = account.try_send_template_message(&msg).await.unwrap();
    assert_eq!(msgid, 200228332);
}

#[tokio::test]
async fn test_send_template_message_swallows_failure() {
    let mock_server = MockServer::start().await;
    mount_token_endpoint(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/message/template/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 40037,
            "errmsg": "invalid template_id"
        })))
        .mount(&mock_server)
        .await;

    let account = create_test_account(&mock_server);

    let msg = TemplateMessage::new("toUser", "bad_template").data("first", "x");
    account.send_template_message(&msg).await;
}

#[tokio::test]
async fn test_token_reused_across_sends() {
    let mock_server = MockServer::start().await;

    // The token endpoint must be hit exactly once for two sends.
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "mock_token_123",
            "expires_in": 7200
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/message/custom/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 0,
            "errmsg": "ok"
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let account = create_test_account(&mock_server);

    account.try_send_custom_text_message("u1", "a").await.unwrap();
    account.try_send_custom_text_message("u2", "b").await.unwrap();
}

#[tokio::test]
async fn test_concurrent_sends_share_one_token_fetch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "mock_token_123",
            "expires_in": 7200
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/cgi-bin/message/custom/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 0,
            "errmsg": "ok"
        })))
        .expect(4)
        .mount(&mock_server)
        .await;

    let account = Arc::new(create_test_account(&mock_server));

    // All four sends race on an empty token cache; the refresh must be
    // single-flight.
    let sends = (0..4).map(|i| {
        let account = Arc::clone(&account);
        async move {
            account
                .try_send_custom_text_message(&format!("u{i}"), "a")
                .await
        }
    });

    for result in join_all(sends).await {
        result.unwrap();
    }
}
