//! Unified error handling with Sentry integration.
//!
//! Each component has its own error enum; [`ClientError`] wraps them for
//! callers that drive several components at once (the CLI, host apps).
//! Server-class failures are captured to Sentry before being returned.

use thiserror::Error;

use vdiamond_core::UserProfile;

use crate::account::AccountError;
use crate::api::GatewayError;
use crate::cart::CartError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::session::SessionError;
use crate::storage::StorageError;

/// Top-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Storage backend failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Backend call failed.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Authentication operation failed.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Cart operation was rejected.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Account page operation failed.
    #[error("Account error: {0}")]
    Account(#[from] AccountError),
}

impl ClientError {
    /// A message suitable for showing to the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Gateway(e) => e.user_message(),
            Self::Session(e) => e.user_message(),
            Self::Checkout(e) => e.user_message(),
            Self::Account(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Capture a backend failure to Sentry if it is server-class.
///
/// Transport failures and 5xx responses are reported; 4xx outcomes are the
/// shopper's business and only logged at debug level.
pub fn report_gateway_error(err: &GatewayError) {
    if err.is_transient() {
        let event_id = sentry::capture_error(err);
        tracing::error!(
            error = %err,
            sentry_event_id = %event_id,
            "Backend request failed"
        );
    } else {
        tracing::debug!(error = %err, "Backend request rejected");
    }
}

/// Set the Sentry user context from the cached profile.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user: &UserProfile) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user.id.to_string()),
            email: Some(user.email.clone()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for shopper actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "ring-001")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
