//! V Diamond storefront client.
//!
//! The client-side session and cart lifecycle: a cart that survives page
//! loads, a bearer-token session that is cached, attached to every request
//! and recovered once on expiry, and a checkout that only empties the cart
//! after the backend confirms the order. Signed-in shoppers also get order
//! history and profile settings.
//!
//! [`Storefront`] wires the components together; each can also be built on
//! its own for tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod account;
pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod gateway;
pub mod navigation;
pub mod session;
pub mod state;
pub mod storage;

pub use account::{AccountError, AccountService};
pub use api::{ApiClient, GatewayError, PendingRequest};
pub use cart::{CartError, CartManager};
pub use checkout::{CheckoutError, CheckoutOrchestrator, CheckoutOutcome, CheckoutSummary};
pub use config::{ConfigError, StorefrontClientConfig};
pub use error::{ClientError, Result};
pub use gateway::RequestGateway;
pub use navigation::{MemoryNavigator, Navigator};
pub use session::{SessionError, SessionManager, SessionStatus};
pub use state::Storefront;
pub use storage::{FileStore, KeyValueStore, MemoryStore, Repository, StorageError};
