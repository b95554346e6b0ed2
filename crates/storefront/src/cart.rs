//! Cart state manager.
//!
//! Owns the process-wide cart. Every mutation runs as one synchronous
//! read-modify-write under the cart lock and then writes the full snapshot to
//! the short-lived store, so two rapid adds of the same product can never
//! lose an update. Persistence failures are logged and do not undo the
//! in-memory change.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use vdiamond_core::{Cart, CartLineItem, Price, PriceError, ProductId, Quantity, TotalOverflow};

use crate::error::add_breadcrumb;
use crate::storage::{KeyValueStore, Repository, keys};

/// Errors returned by cart operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Quantities below one are rejected; use `remove_item` to delete a line.
    #[error("quantity must be at least 1 (got {0})")]
    InvalidQuantity(i64),

    #[error(transparent)]
    InvalidPrice(#[from] PriceError),

    /// The change would make the cart total unrepresentable.
    #[error(transparent)]
    TotalOverflow(#[from] TotalOverflow),
}

/// Handle to the shared cart.
///
/// Cheaply cloneable; all clones see the same cart.
#[derive(Clone, Debug)]
pub struct CartManager {
    inner: Arc<CartInner>,
}

#[derive(Debug)]
struct CartInner {
    cart: Mutex<Cart>,
    repo: Repository<Cart>,
}

impl CartManager {
    /// Load the cart from `store`, starting empty if nothing usable is there.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let repo: Repository<Cart> = Repository::new(store, keys::CART);
        let cart = repo.load_or_default();
        tracing::debug!(lines = cart.items().len(), "cart loaded");

        Self {
            inner: Arc::new(CartInner {
                cart: Mutex::new(cart),
                repo,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Cart> {
        self.inner.cart.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, cart: &Cart) {
        if let Err(e) = self.inner.repo.save(cart) {
            tracing::warn!(error = %e, "failed to persist cart");
        }
    }

    /// Add `quantity` units of `item`, merging with an existing line for the
    /// same product.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] if `quantity` is zero and
    /// [`CartError::TotalOverflow`] if the total would become unrepresentable;
    /// in both cases the cart is left untouched.
    pub fn add_item(&self, item: CartLineItem, quantity: u32) -> Result<(), CartError> {
        let quantity =
            Quantity::new(quantity).map_err(|_| CartError::InvalidQuantity(i64::from(quantity)))?;
        let product_id = item.id.clone();

        let mut cart = self.lock();
        cart.add(item, quantity)?;
        self.persist(&cart);
        drop(cart);

        add_breadcrumb(
            "cart",
            "Added item",
            Some(&[
                ("product_id", product_id.as_str()),
                ("quantity", &quantity.to_string()),
            ]),
        );
        Ok(())
    }

    /// Remove the line for `id`. Removing an absent product is a no-op.
    ///
    /// Returns whether a line was removed.
    pub fn remove_item(&self, id: &ProductId) -> bool {
        let mut cart = self.lock();
        let removed = cart.remove(id);
        if removed {
            self.persist(&cart);
        }
        drop(cart);

        if removed {
            add_breadcrumb("cart", "Removed item", Some(&[("product_id", id.as_str())]));
        }
        removed
    }

    /// Set the quantity of an existing line.
    ///
    /// Returns `Ok(false)` when no line has this id.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for `quantity < 1` and
    /// [`CartError::TotalOverflow`] if the total would become unrepresentable.
    /// The line keeps its current quantity; this never deletes it.
    pub fn update_quantity(&self, id: &ProductId, quantity: i64) -> Result<bool, CartError> {
        let quantity = Quantity::new(quantity).map_err(|_| CartError::InvalidQuantity(quantity))?;

        let mut cart = self.lock();
        let updated = cart.set_quantity(id, quantity)?;
        if updated {
            self.persist(&cart);
        }
        Ok(updated)
    }

    /// Empty the cart and delete the persisted record.
    pub fn clear(&self) {
        let mut cart = self.lock();
        cart.clear();
        if let Err(e) = self.inner.repo.clear() {
            tracing::warn!(error = %e, "failed to remove persisted cart");
        }
        drop(cart);

        add_breadcrumb("cart", "Cleared cart", None);
    }

    /// Take the units of a placed order out of the cart.
    ///
    /// Units added while the order was in flight stay in the cart. The
    /// persisted record is deleted once the cart is empty.
    pub fn remove_submitted(&self, submitted: &[CartLineItem]) {
        let mut cart = self.lock();
        cart.remove_submitted(submitted);
        if cart.is_empty() {
            if let Err(e) = self.inner.repo.clear() {
                tracing::warn!(error = %e, "failed to remove persisted cart");
            }
        } else {
            self.persist(&cart);
        }
        let remaining = cart.item_count();
        drop(cart);

        add_breadcrumb(
            "cart",
            "Removed ordered items",
            Some(&[("remaining", &remaining.to_string())]),
        );
    }

    /// Σ `unit_price × quantity` over the current lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lock().total()
    }

    /// Copy of the current lines, in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<CartLineItem> {
        self.lock().items().to_vec()
    }

    /// Copy of the whole cart.
    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.lock().clone()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lock().item_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
