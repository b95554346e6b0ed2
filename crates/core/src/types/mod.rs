//! Core types for V Diamond.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod email;
pub mod id;
pub mod price;
pub mod quantity;
pub mod user;

pub use cart::{Cart, CartLineItem, InvalidCart, TotalOverflow};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use quantity::{Quantity, QuantityError};
pub use user::{BearerToken, UserProfile};
