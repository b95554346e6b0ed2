//! Subcommand implementations.

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;

use thiserror::Error;

use vdiamond_storefront::{
    AccountError, CartError, CheckoutError, ClientError, GatewayError, SessionError,
};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// The storefront client rejected the operation.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The password could not be read from stdin.
    #[error("could not read password: {0}")]
    Password(#[source] std::io::Error),
}

impl CliError {
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Client(e) => e.user_message(),
            Self::Password(_) => self.to_string(),
        }
    }
}

impl From<GatewayError> for CliError {
    fn from(e: GatewayError) -> Self {
        Self::Client(e.into())
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        Self::Client(e.into())
    }
}

impl From<CartError> for CliError {
    fn from(e: CartError) -> Self {
        Self::Client(e.into())
    }
}

impl From<CheckoutError> for CliError {
    fn from(e: CheckoutError) -> Self {
        Self::Client(e.into())
    }
}

impl From<AccountError> for CliError {
    fn from(e: AccountError) -> Self {
        Self::Client(e.into())
    }
}
