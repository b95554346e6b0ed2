//! The gateway's 401 policy, end to end.

#![allow(clippy::unwrap_used)]

use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use vdiamond_integration_tests::{TestContext, api_path, profile_body};
use vdiamond_storefront::storage::keys;
use vdiamond_storefront::{GatewayError, SessionStatus};

#[tokio::test]
async fn test_recovery_failure_clears_and_redirects() {
    let ctx = TestContext::with_token("/account/orders", "tok-1").await;
    Mock::given(method("GET"))
        .and(path(api_path("/orders")))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("/user/me")))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let err = ctx
        .storefront
        .gateway()
        .get::<Value>("/orders")
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::SessionExpired));
    assert_eq!(ctx.storefront.session().status(), SessionStatus::Unauthenticated);
    assert!(!ctx.durable.contains(keys::TOKEN));
    assert!(!ctx.durable.contains(keys::USER));
    assert_eq!(
        ctx.navigator.last_navigation().as_deref(),
        Some("/login?session=expired")
    );
    ctx.server.verify().await;
}

#[tokio::test]
async fn test_successful_recovery_resubmits_exactly_once() {
    let ctx = TestContext::with_token("/account/orders", "tok-1").await;
    Mock::given(method("GET"))
        .and(path(api_path("/orders")))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("/orders")))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"orderId": "ord-1"}])))
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("/user/me")))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body(1, "jane@example.com")))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let orders: Value = ctx.storefront.gateway().get("/orders").await.unwrap();

    assert_eq!(orders, json!([{"orderId": "ord-1"}]));
    assert!(ctx.storefront.session().is_authenticated());
    assert!(ctx.durable.contains(keys::USER));
    assert!(ctx.navigator.history().is_empty());
    ctx.server.verify().await;
}

#[tokio::test]
async fn test_persistent_401_recovers_at_most_once() {
    let ctx = TestContext::with_token("/account/orders", "tok-1").await;
    Mock::given(method("GET"))
        .and(path(api_path("/orders")))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("/user/me")))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body(1, "jane@example.com")))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let err = ctx
        .storefront
        .gateway()
        .get::<Value>("/orders")
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::SessionExpired));
    assert!(ctx.storefront.session().token().is_none());
    assert_eq!(
        ctx.navigator.last_navigation().as_deref(),
        Some("/login?session=expired")
    );
    ctx.server.verify().await;
}

#[tokio::test]
async fn test_auth_flow_pages_neither_recover_nor_navigate() {
    for page in [
        "/login",
        "/signup",
        "/auth/callback?code=xyz",
        "/forgot-password",
        "/reset-password/abc123",
    ] {
        let ctx = TestContext::with_token(page, "tok-1").await;
        Mock::given(method("GET"))
            .and(path(api_path("/orders")))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&ctx.server)
            .await;
        Mock::given(method("GET"))
            .and(path(api_path("/user/me")))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile_body(1, "a@b.co")))
            .expect(0)
            .mount(&ctx.server)
            .await;

        let err = ctx
            .storefront
            .gateway()
            .get::<Value>("/orders")
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Unauthorized), "page {page}");
        assert!(ctx.navigator.history().is_empty(), "page {page}");
        assert!(ctx.storefront.session().token().is_some(), "page {page}");
        ctx.server.verify().await;
    }
}

#[tokio::test]
async fn test_anonymous_401_redirects_without_recovery() {
    let ctx = TestContext::new("/wishlist").await;
    Mock::given(method("GET"))
        .and(path(api_path("/wishlist")))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path(api_path("/user/me")))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body(1, "a@b.co")))
        .expect(0)
        .mount(&ctx.server)
        .await;

    let err = ctx
        .storefront
        .gateway()
        .get::<Value>("/wishlist")
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::SessionExpired));
    assert_eq!(
        ctx.navigator.last_navigation().as_deref(),
        Some("/login?session=expired")
    );
    ctx.server.verify().await;
}

#[tokio::test]
async fn test_server_errors_never_touch_credentials() {
    let ctx = TestContext::with_token("/account", "tok-1").await;
    Mock::given(method("GET"))
        .and(path(api_path("/orders")))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "db down"})))
        .mount(&ctx.server)
        .await;

    let err = ctx
        .storefront
        .gateway()
        .get::<Value>("/orders")
        .await
        .unwrap_err();

    assert!(err.is_transient());
    assert!(ctx.storefront.session().token().is_some());
    assert!(ctx.navigator.history().is_empty());
}
