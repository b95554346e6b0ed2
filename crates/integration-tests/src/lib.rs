//! End-to-end tests for the V Diamond storefront client.
//!
//! Each test drives a fully wired [`Storefront`] against a
//! [`wiremock::MockServer`] standing in for the backend. No database or
//! running server is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p vdiamond-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_lifecycle` - cart persistence and totals
//! - `session_lifecycle` - profile loading, login, logout
//! - `unauthorized_recovery` - the 401 policy
//! - `checkout_flow` - order submission
//! - `account_pages` - email confirmation, order history, profile settings

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use serde_json::{Value, json};
use url::Url;
use wiremock::MockServer;

use vdiamond_core::{CartLineItem, Price};
use vdiamond_storefront::storage::keys;
use vdiamond_storefront::{
    KeyValueStore, MemoryNavigator, MemoryStore, Storefront, StorefrontClientConfig,
};

/// Path prefix every mocked endpoint lives under.
pub const API_PREFIX: &str = "/api";

/// A storefront wired to a mock backend and in-memory stores.
pub struct TestContext {
    pub server: MockServer,
    pub short_lived: Arc<MemoryStore>,
    pub durable: Arc<MemoryStore>,
    pub navigator: Arc<MemoryNavigator>,
    pub storefront: Storefront,
}

impl TestContext {
    /// Start a backend and a storefront on `page` with no stored state.
    pub async fn new(page: &str) -> Self {
        let server = MockServer::start().await;
        Self::build(server, page, MemoryStore::new(), MemoryStore::new())
    }

    /// Start with `token` already in durable storage and no cached profile.
    pub async fn with_token(page: &str, token: &str) -> Self {
        let server = MockServer::start().await;
        let durable = MemoryStore::new();
        durable
            .set(keys::TOKEN, &Value::String(token.to_owned()).to_string())
            .expect("memory store write");
        Self::build(server, page, MemoryStore::new(), durable)
    }

    /// Wire a storefront over the given stores.
    pub fn build(server: MockServer, page: &str, short_lived: MemoryStore, durable: MemoryStore) -> Self {
        let config = config_for(&server);
        let short_lived = Arc::new(short_lived);
        let durable = Arc::new(durable);
        let navigator = Arc::new(MemoryNavigator::new(page));
        let storefront = Storefront::new(
            config,
            short_lived.clone(),
            durable.clone(),
            navigator.clone(),
        )
        .expect("storefront client");

        Self {
            server,
            short_lived,
            durable,
            navigator,
            storefront,
        }
    }

    /// Build a second storefront over the same stores, as after a page
    /// reload.
    pub fn reload(&self) -> Storefront {
        Storefront::new(
            config_for(&self.server),
            self.short_lived.clone(),
            self.durable.clone(),
            self.navigator.clone(),
        )
        .expect("storefront client")
    }
}

/// Client configuration pointing at `server` under [`API_PREFIX`].
pub fn config_for(server: &MockServer) -> StorefrontClientConfig {
    let url = Url::parse(&format!("{}{API_PREFIX}/", server.uri())).expect("mock server url");
    StorefrontClientConfig::new(url)
}

/// Full request path for an endpoint under the API prefix.
#[must_use]
pub fn api_path(endpoint: &str) -> String {
    format!("{API_PREFIX}{endpoint}")
}

/// A profile body as the backend returns it.
#[must_use]
pub fn profile_body(id: i64, email: &str) -> Value {
    json!({
        "ID": id,
        "CreatedAt": "2025-01-15T10:00:00Z",
        "UpdatedAt": "2025-01-15T10:00:00Z",
        "email": email,
        "name": "Jane Doe",
        "picture": null,
        "status": "active"
    })
}

/// A cart line with quantity 1.
#[must_use]
pub fn ring(id: &str, cents: u32) -> CartLineItem {
    CartLineItem::new(id, format!("Ring {id}"), Price::from_cents(cents), format!("/img/{id}.jpg"))
}
