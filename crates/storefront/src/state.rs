//! Client state shared across pages.

use std::sync::Arc;

use crate::account::AccountService;
use crate::api::{ApiClient, GatewayError};
use crate::cart::CartManager;
use crate::checkout::CheckoutOrchestrator;
use crate::config::StorefrontClientConfig;
use crate::error::Result;
use crate::gateway::RequestGateway;
use crate::navigation::Navigator;
use crate::session::SessionManager;
use crate::storage::{FileStore, KeyValueStore, MemoryStore};

/// The storefront components wired over one configuration and one pair of
/// stores.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontClientConfig,
    cart: CartManager,
    session: SessionManager,
    gateway: RequestGateway,
    checkout: CheckoutOrchestrator,
    account: AccountService,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("config", &self.inner.config)
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Wire the components over the given stores.
    ///
    /// `short_lived` holds the cart; `durable` holds the token and profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: StorefrontClientConfig,
        short_lived: Arc<dyn KeyValueStore>,
        durable: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> std::result::Result<Self, GatewayError> {
        let api = ApiClient::new(&config)?;
        let cart = CartManager::new(short_lived);
        let session = SessionManager::new(api.clone(), durable, Arc::clone(&navigator));
        let gateway = RequestGateway::new(api, session.clone(), navigator);
        let checkout = CheckoutOrchestrator::new(cart.clone(), gateway.clone());
        let account = AccountService::new(session.clone(), gateway.clone());

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                cart,
                session,
                gateway,
                checkout,
                account,
            }),
        })
    }

    /// Wire the components with an in-memory cart and a file-backed durable
    /// store under the configured data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn open(config: StorefrontClientConfig, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let durable = Arc::new(FileStore::new(config.durable_store_path()));
        tracing::debug!(path = %durable.path().display(), "opening durable store");
        Ok(Self::new(config, Arc::new(MemoryStore::new()), durable, navigator)?)
    }

    /// Verify any restored session.
    ///
    /// A failed verification is logged and recorded on the session; it never
    /// stops startup.
    pub async fn start(&self) {
        if let Err(e) = self.inner.session.initialize().await {
            tracing::warn!(error = %e, "could not verify restored session");
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn cart(&self) -> &CartManager {
        &self.inner.cart
    }

    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    #[must_use]
    pub fn gateway(&self) -> &RequestGateway {
        &self.inner.gateway
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutOrchestrator {
        &self.inner.checkout
    }

    #[must_use]
    pub fn account(&self) -> &AccountService {
        &self.inner.account
    }
}
