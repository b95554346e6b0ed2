//! Cart commands.
//!
//! These never touch the network.

use rust_decimal::Decimal;

use vdiamond_core::{CartLineItem, Price, ProductId};
use vdiamond_storefront::{CartError, Storefront};

/// Add `quantity` units of a product.
///
/// # Errors
///
/// Returns an error for a negative price or a zero quantity.
pub fn add(
    storefront: &Storefront,
    id: String,
    name: String,
    price: Decimal,
    quantity: u32,
    image: String,
) -> Result<(), CartError> {
    let price = Price::new(price)?;
    storefront
        .cart()
        .add_item(CartLineItem::new(id, name, price, image), quantity)?;
    show(storefront);
    Ok(())
}

pub fn remove(storefront: &Storefront, id: String) {
    if !storefront.cart().remove_item(&ProductId::new(id)) {
        println!("That product is not in your cart.");
    }
    show(storefront);
}

/// # Errors
///
/// Returns an error for a quantity below one.
pub fn update(storefront: &Storefront, id: String, quantity: i64) -> Result<(), CartError> {
    if !storefront
        .cart()
        .update_quantity(&ProductId::new(id), quantity)?
    {
        println!("That product is not in your cart.");
    }
    show(storefront);
    Ok(())
}

pub fn show(storefront: &Storefront) {
    let cart = storefront.cart().snapshot();
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }

    for line in cart.items() {
        println!(
            "{:<20} {:<32} {:>4} x {:>12} = {:>12}",
            line.id,
            line.name,
            line.quantity,
            line.unit_price.to_string(),
            line.line_total().to_string(),
        );
    }
    println!("{} item(s), total {}", cart.item_count(), cart.total());
}

pub fn clear(storefront: &Storefront) {
    storefront.cart().clear();
    println!("Cart cleared.");
}
