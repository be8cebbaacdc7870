//! Webhook dispatch tests
//!
//! Exercise the full serve path through the public facade: echo
//! verification, handler dispatch, handler replacement, and the
//! empty-body failure contract.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use http::{Method, Request};
use wechat_oa_sdk::{crypto, OfficialAccount, Reply};

const TOKEN: &str = "token";

fn test_account() -> OfficialAccount {
    OfficialAccount::new("appid", "appsecret", TOKEN).unwrap()
}

fn signed_uri(extra: &str) -> String {
    let timestamp = "1409735669";
    let nonce = "xxxxxx";
    let signature = crypto::sign(TOKEN, timestamp, nonce);
    format!("/wechat?signature={signature}&timestamp={timestamp}&nonce={nonce}{extra}")
}

fn text_message_xml(from_user: &str, content: &str) -> String {
    format!(
        "<xml>\
         <ToUserName><![CDATA[gh_account]]></ToUserName>\
         <FromUserName><![CDATA[{from_user}]]></FromUserName>\
         <CreateTime>1348831860</CreateTime>\
         <MsgType><![CDATA[text]]></MsgType>\
         <Content><![CDATA[{content}]]></Content>\
         <MsgId>1234567890123456</MsgId>\
         </xml>"
    )
}

fn post_message(account: &OfficialAccount, xml: String) -> http::Response<String> {
    let req = Request::builder()
        .method(Method::POST)
        .uri(signed_uri(""))
        .body(xml)
        .unwrap();
    account.serve_http(&req)
}

#[test]
fn test_echo_verification_get() {
    let account = test_account();

    let req = Request::builder()
        .method(Method::GET)
        .uri(signed_uri("&echostr=4735687236"))
        .body(String::new())
        .unwrap();

    let response = account.serve_http(&req);
    assert_eq!(response.body(), "4735687236");
}

#[test]
fn test_default_handler_replies_not_implemented() {
    let account = test_account();

    let response = post_message(&account, text_message_xml("oUser123", "hello"));
    let body = response.body();

    assert!(body.contains("<MsgType>text</MsgType>"));
    assert!(body.contains("<Content>Server Error: Not Yet Implemented</Content>"));
    assert!(body.contains("<ToUserName>oUser123</ToUserName>"));
    assert!(body.contains("<FromUserName>gh_account</FromUserName>"));
}

#[test]
fn test_registered_handler_receives_parsed_message() {
    let account = test_account();
    account.set_message_handler(|msg| {
        assert_eq!(msg.from_user_name, "oUser123");
        assert_eq!(msg.msg_id, Some(1234567890123456));
        Reply::text(format!("Req:{}", msg.text_content()))
    });

    let response = post_message(&account, text_message_xml("oUser123", "this is a test"));
    assert!(response.body().contains("<Content>Req:this is a test</Content>"));
}

#[test]
fn test_handler_swap_takes_effect_on_next_dispatch() {
    let account = test_account();

    account.set_message_handler(|_| Reply::text("one"));
    let response = post_message(&account, text_message_xml("u", "x"));
    assert!(response.body().contains("<Content>one</Content>"));

    account.set_message_handler(|_| Reply::text("two"));
    let response = post_message(&account, text_message_xml("u", "x"));
    assert!(response.body().contains("<Content>two</Content>"));
}

#[test]
fn test_concurrent_dispatch_uses_exactly_one_handler() {
    let account = Arc::new(test_account());
    let mismatches = Arc::new(AtomicUsize::new(0));

    let mut workers = Vec::new();
    for round in 0..8 {
        let account = Arc::clone(&account);
        let mismatches = Arc::clone(&mismatches);
        workers.push(std::thread::spawn(move || {
            let tag = round % 2;
            account.set_message_handler(move |_| Reply::text(format!("handler-{tag}")));
            for _ in 0..32 {
                let req = Request::builder()
                    .method(Method::POST)
                    .uri(signed_uri(""))
                    .body(text_message_xml("u", "x"))
                    .unwrap();
                let body = account.serve_http(&req).into_body();
                // each reply comes wholly from one handler
                if !body.contains("<Content>handler-0</Content>")
                    && !body.contains("<Content>handler-1</Content>")
                {
                    mismatches.fetch_add(1, Ordering::SeqCst);
                }
            }
        }));
    }
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(mismatches.load(Ordering::SeqCst), 0);
}

#[test]
fn test_bad_signature_drops_request() {
    let account = test_account();
    account.set_message_handler(|_| Reply::text("should not run"));

    let req = Request::builder()
        .method(Method::POST)
        .uri("/wechat?signature=forged&timestamp=1&nonce=2")
        .body(text_message_xml("u", "x"))
        .unwrap();

    let response = account.serve_http(&req);
    assert!(response.body().is_empty());
}

#[test]
fn test_unparseable_body_drops_request() {
    let account = test_account();

    let req = Request::builder()
        .method(Method::POST)
        .uri(signed_uri(""))
        .body("{\"not\": \"xml\"}".to_string())
        .unwrap();

    let response = account.serve_http(&req);
    assert!(response.body().is_empty());
}

#[test]
fn test_event_message_dispatch() {
    let account = test_account();
    account.set_message_handler(|msg| match msg.event.as_deref() {
        Some("subscribe") => Reply::text("welcome"),
        _ => Reply::text("ignored"),
    });

    let xml = "<xml>\
               <ToUserName><![CDATA[gh_account]]></ToUserName>\
               <FromUserName><![CDATA[oUser123]]></FromUserName>\
               <CreateTime>123456789</CreateTime>\
               <MsgType><![CDATA[event]]></MsgType>\
               <Event><![CDATA[subscribe]]></Event>\
               </xml>";

    let response = post_message(&account, xml.to_string());
    assert!(response.body().contains("<Content>welcome</Content>"));
}

#[test]
fn test_image_reply_serialization() {
    let account = test_account();
    account.set_message_handler(|_| Reply::image("media_abc"));

    let response = post_message(&account, text_message_xml("u", "pic please"));
    let body = response.body();
    assert!(body.contains("<MsgType>image</MsgType>"));
    assert!(body.contains("<Image><MediaId>media_abc</MediaId></Image>"));
}
