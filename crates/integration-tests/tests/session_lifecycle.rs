//! Session restore, profile loading, login and logout.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vdiamond_integration_tests::{TestContext, api_path, config_for, profile_body};
use vdiamond_storefront::storage::keys;
use vdiamond_storefront::{
    KeyValueStore, MemoryNavigator, MemoryStore, SessionError, SessionStatus, Storefront,
};

#[tokio::test]
async fn test_concurrent_loads_issue_one_fetch() {
    let ctx = TestContext::with_token("/", "tok-1").await;
    Mock::given(method("GET"))
        .and(path(api_path("/user/me")))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(profile_body(1, "jane@example.com"))
                .set_delay(Duration::from_millis(150)),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    let session = ctx.storefront.session();
    assert_eq!(session.status(), SessionStatus::TokenPresentUnverified);

    let (a, b, c) = tokio::join!(
        session.load_user_data(),
        session.load_user_data(),
        session.load_user_data()
    );
    assert!(a.is_ok());
    assert!(b.is_ok());
    assert!(c.is_ok());
    assert_eq!(session.status(), SessionStatus::Authenticated);
    assert!(ctx.durable.contains(keys::USER));

    // `expect(1)` is verified when the server drops; check it explicitly too.
    ctx.server.verify().await;
}

#[tokio::test]
async fn test_concurrent_loads_share_failure() {
    let ctx = TestContext::with_token("/", "tok-1").await;
    Mock::given(method("GET"))
        .and(path(api_path("/user/me")))
        .respond_with(ResponseTemplate::new(503).set_delay(Duration::from_millis(100)))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let session = ctx.storefront.session();
    let (a, b) = tokio::join!(session.load_user_data(), session.load_user_data());
    assert!(matches!(a, Err(SessionError::ProfileFetch(_))));
    assert!(matches!(b, Err(SessionError::ProfileFetch(_))));

    // A transient failure keeps the credentials, and the token alone keeps
    // the shopper logged in.
    assert_eq!(session.status(), SessionStatus::TokenPresentUnverified);
    assert!(session.is_authenticated());
    assert!(ctx.durable.contains(keys::TOKEN));
}

#[tokio::test]
async fn test_rejected_token_clears_session_on_start() {
    let ctx = TestContext::with_token("/", "stale").await;
    Mock::given(method("GET"))
        .and(path(api_path("/user/me")))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.storefront.start().await;

    assert_eq!(ctx.storefront.session().status(), SessionStatus::Unauthenticated);
    assert!(!ctx.durable.contains(keys::TOKEN));
    assert!(!ctx.durable.contains(keys::USER));
}

#[tokio::test]
async fn test_restored_session_skips_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("/user/me")))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body(1, "a@b.co")))
        .expect(0)
        .mount(&server)
        .await;

    let durable = MemoryStore::with_entry(keys::TOKEN, "\"tok\"");
    durable
        .set(keys::USER, &profile_body(1, "jane@example.com").to_string())
        .unwrap();
    let ctx = TestContext::build(server, "/", MemoryStore::new(), durable);

    ctx.storefront.start().await;
    let session = ctx.storefront.session();
    assert!(session.is_authenticated());
    assert_eq!(session.user().unwrap().email, "jane@example.com");
}

#[tokio::test]
async fn test_malformed_profile_is_refetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("/user/me")))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body(4, "jane@example.com")))
        .expect(1)
        .mount(&server)
        .await;

    let durable = MemoryStore::with_entry(keys::TOKEN, "\"tok\"");
    durable.set(keys::USER, "{\"ID\":").unwrap();
    let ctx = TestContext::build(server, "/", MemoryStore::new(), durable);

    ctx.storefront.start().await;
    assert!(ctx.storefront.session().is_authenticated());
}

#[tokio::test]
async fn test_login_then_reload_keeps_session() {
    let ctx = TestContext::new("/login").await;
    Mock::given(method("POST"))
        .and(path(api_path("/auth/login")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-9",
            "user": profile_body(9, "jane@example.com")
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.storefront
        .session()
        .login("jane@example.com", &SecretString::from("correct horse"))
        .await
        .unwrap();

    let reloaded = ctx.reload();
    assert!(reloaded.session().is_authenticated());
    assert_eq!(reloaded.session().token().unwrap().expose(), "tok-9");
}

#[tokio::test]
async fn test_logout_clears_even_when_backend_fails() {
    let ctx = TestContext::with_token("/account", "tok-1").await;
    Mock::given(method("GET"))
        .and(path(api_path("/user/me")))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body(1, "jane@example.com")))
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path(api_path("/auth/logout")))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.storefront.start().await;
    assert!(ctx.storefront.session().is_authenticated());

    ctx.storefront.session().logout().await;

    let session = ctx.storefront.session();
    assert_eq!(session.status(), SessionStatus::Unauthenticated);
    assert!(session.user().is_none());
    assert!(!ctx.durable.contains(keys::TOKEN));
    assert!(!ctx.durable.contains(keys::USER));
    assert_eq!(ctx.navigator.last_navigation().as_deref(), Some("/"));
    assert!(ctx.reload().session().token().is_none());
}

#[tokio::test]
async fn test_logout_keeps_cart() {
    let ctx = TestContext::with_token("/account", "tok-1").await;
    Mock::given(method("POST"))
        .and(path(api_path("/auth/logout")))
        .respond_with(ResponseTemplate::new(204))
        .mount(&ctx.server)
        .await;

    ctx.storefront
        .cart()
        .add_item(vdiamond_integration_tests::ring("A", 1000), 1)
        .unwrap();
    ctx.storefront.session().logout().await;
    assert_eq!(ctx.storefront.cart().item_count(), 1);
}

#[tokio::test]
async fn test_token_survives_restart_but_cart_does_not() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("/auth/login")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-disk",
            "user": profile_body(2, "jane@example.com")
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(&server);
    config.data_dir = dir.path().join("state");

    let first = Storefront::open(config.clone(), Arc::new(MemoryNavigator::new("/login"))).unwrap();
    first
        .session()
        .login("jane@example.com", &SecretString::from("pw"))
        .await
        .unwrap();
    first
        .cart()
        .add_item(vdiamond_integration_tests::ring("A", 1000), 1)
        .unwrap();

    let second = Storefront::open(config, Arc::new(MemoryNavigator::default())).unwrap();
    assert!(second.session().is_authenticated());
    assert_eq!(second.session().token().unwrap().expose(), "tok-disk");
    assert!(second.cart().is_empty());
}
