//! Signed-in account pages: order history and profile settings.
//!
//! Both calls go through the [`RequestGateway`], so an expired token gets the
//! same single recovery attempt as any other page-level request.

use serde::de::IgnoredAny;
use thiserror::Error;
use tracing::instrument;

use vdiamond_core::{Email, EmailError, UserProfile};

use crate::api::{GatewayError, OrderRecord, PROFILE_PATH, ProfileUpdate};
use crate::error::add_breadcrumb;
use crate::gateway::RequestGateway;
use crate::session::SessionManager;

const ORDER_HISTORY_PATH: &str = "/user/orders";
const PROFILE_UPDATE_PATH: &str = "/user/profile";

/// Errors returned by account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl AccountError {
    /// A message suitable for showing to the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Gateway(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Account operations for the signed-in shopper.
#[derive(Debug, Clone)]
pub struct AccountService {
    session: SessionManager,
    gateway: RequestGateway,
}

impl AccountService {
    #[must_use]
    pub const fn new(session: SessionManager, gateway: RequestGateway) -> Self {
        Self { session, gateway }
    }

    /// Past orders, newest first as the backend returns them.
    ///
    /// An empty body means no orders.
    ///
    /// # Errors
    ///
    /// See [`RequestGateway::send`].
    #[instrument(skip(self))]
    pub async fn order_history(&self) -> Result<Vec<OrderRecord>, GatewayError> {
        let orders: Option<Vec<OrderRecord>> = self.gateway.get(ORDER_HISTORY_PATH).await?;
        let orders = orders.unwrap_or_default();
        tracing::debug!(count = orders.len(), "order history loaded");
        Ok(orders)
    }

    /// Save profile settings and refresh the cached profile.
    ///
    /// Name and email are validated before any request is made. A refresh
    /// that fails after the update was accepted is logged and the stale
    /// profile kept; the update itself still succeeded.
    ///
    /// # Errors
    ///
    /// [`AccountError::Validation`] or [`AccountError::InvalidEmail`] for bad
    /// input, [`AccountError::Gateway`] if the update is rejected.
    #[instrument(skip_all)]
    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
    ) -> Result<Option<UserProfile>, AccountError> {
        if update.name.trim().is_empty() {
            return Err(AccountError::Validation("name is required".to_string()));
        }
        let email = Email::parse(&update.email)?;
        let update = ProfileUpdate {
            name: update.name.trim().to_string(),
            email: email.as_str().to_string(),
            phone: non_blank(update.phone.as_deref()),
            address: non_blank(update.address.as_deref()),
        };

        self.gateway
            .put::<_, IgnoredAny>(PROFILE_UPDATE_PATH, &update)
            .await?;
        add_breadcrumb("account", "Profile updated", None);

        let generation = self.session.generation();
        match self.gateway.get::<UserProfile>(PROFILE_PATH).await {
            Ok(profile) => {
                if self.session.adopt_profile(generation, profile.clone()) {
                    Ok(Some(profile))
                } else {
                    Ok(None)
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "profile saved but refresh failed");
                Ok(None)
            }
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
