//! Shopping cart contents.
//!
//! The cart is an ordered list of lines with unique product ids whose total
//! is always representable. All rules about quantities live here so that the
//! persistence layer in the storefront crate only ever stores carts that
//! satisfy them.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;
use super::quantity::Quantity;

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub id: ProductId,
    pub name: String,
    #[serde(rename = "price", alias = "unit_price")]
    pub unit_price: Price,
    pub quantity: Quantity,
    #[serde(rename = "image", alias = "image_ref", default)]
    pub image_ref: String,
}

impl CartLineItem {
    /// Create a line with quantity 1.
    #[must_use]
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        unit_price: Price,
        image_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            quantity: Quantity::ONE,
            image_ref: image_ref.into(),
        }
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity.get())
    }
}

/// Ordered collection of cart lines.
///
/// Serialized as a bare JSON array, matching what the browser storefront
/// keeps under the `cart` key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CartLineItem>", into = "Vec<CartLineItem>")]
pub struct Cart {
    items: Vec<CartLineItem>,
}

/// The change would push the cart total past the largest decimal amount.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cart total is too large to represent")]
pub struct TotalOverflow;

/// Reasons a stored line list is not a valid cart.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidCart {
    #[error("duplicate cart line for product {0}")]
    DuplicateLine(ProductId),

    #[error(transparent)]
    TotalOverflow(#[from] TotalOverflow),
}

impl TryFrom<Vec<CartLineItem>> for Cart {
    type Error = InvalidCart;

    fn try_from(items: Vec<CartLineItem>) -> Result<Self, Self::Error> {
        for (i, item) in items.iter().enumerate() {
            if items.iter().skip(i + 1).any(|other| other.id == item.id) {
                return Err(InvalidCart::DuplicateLine(item.id.clone()));
            }
        }
        checked_total(&items)?;
        Ok(Self { items })
    }
}

fn checked_total(items: &[CartLineItem]) -> Result<Price, TotalOverflow> {
    items.iter().try_fold(Price::ZERO, |acc, item| {
        item.unit_price
            .checked_times(item.quantity.get())
            .and_then(|line| acc.checked_add(line))
            .ok_or(TotalOverflow)
    })
}

impl From<Cart> for Vec<CartLineItem> {
    fn from(cart: Cart) -> Self {
        cart.items
    }
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Look up a line by product id.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all line quantities (the cart badge count).
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum()
    }

    /// Σ `unit_price × quantity`, recomputed on every call.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    fn commit(&mut self, next: Vec<CartLineItem>) -> Result<(), TotalOverflow> {
        checked_total(&next)?;
        self.items = next;
        Ok(())
    }

    /// Add `quantity` units of `item`.
    ///
    /// An existing line with the same id keeps its name, price and image and
    /// has its quantity increased; otherwise the item is appended with the
    /// given quantity.
    ///
    /// # Errors
    ///
    /// Returns [`TotalOverflow`] if the new total is not representable. The
    /// cart is unchanged.
    pub fn add(&mut self, item: CartLineItem, quantity: Quantity) -> Result<(), TotalOverflow> {
        let mut next = self.items.clone();
        if let Some(existing) = next.iter_mut().find(|line| line.id == item.id) {
            existing.quantity = existing.quantity.saturating_add(quantity);
        } else {
            next.push(CartLineItem { quantity, ..item });
        }
        self.commit(next)
    }

    /// Drop the line for `id`. Returns whether a line was removed.
    pub fn remove(&mut self, id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.id != id);
        self.items.len() != before
    }

    /// Overwrite the quantity of an existing line. Returns whether a line
    /// was found.
    ///
    /// # Errors
    ///
    /// Returns [`TotalOverflow`] if the new total is not representable. The
    /// cart is unchanged.
    pub fn set_quantity(
        &mut self,
        id: &ProductId,
        quantity: Quantity,
    ) -> Result<bool, TotalOverflow> {
        let Some(pos) = self.items.iter().position(|item| &item.id == id) else {
            return Ok(false);
        };
        let mut next = self.items.clone();
        next[pos].quantity = quantity;
        self.commit(next)?;
        Ok(true)
    }

    /// Take the units in `submitted` out of the cart.
    ///
    /// A line loses the submitted quantity and is dropped when nothing is
    /// left. Units added after `submitted` was taken stay in the cart.
    pub fn remove_submitted(&mut self, submitted: &[CartLineItem]) {
        self.items.retain_mut(|item| {
            match submitted.iter().find(|sent| sent.id == item.id) {
                Some(sent) => match item.quantity.checked_sub(sent.quantity) {
                    Some(rest) => {
                        item.quantity = rest;
                        true
                    }
                    None => false,
                },
                None => true,
            }
        });
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}
