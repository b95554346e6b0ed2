//! V Diamond Core - Shared domain types.
//!
//! This crate provides the types shared by the storefront client components:
//! - `storefront` - Cart, session, request gateway and checkout
//! - `cli` - Command-line shell around the storefront client
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no storage
//! access, no HTTP clients. This keeps it lightweight and trivially testable.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, quantities, emails and
//!   credentials, plus the cart and user profile records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
