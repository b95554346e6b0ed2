//! Checkout command.

use clap::Args;

use vdiamond_storefront::api::{PaymentDetails, ShippingDetails};
use vdiamond_storefront::{CheckoutError, Storefront};

/// Shipping and payment input for `vd-cli checkout`.
#[derive(Debug, Args)]
pub struct CheckoutArgs {
    #[arg(long)]
    full_name: String,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long = "address")]
    address_line1: String,
    #[arg(long = "address2")]
    address_line2: Option<String>,
    #[arg(long)]
    city: String,
    #[arg(long)]
    region: Option<String>,
    #[arg(long)]
    postal_code: String,
    #[arg(long)]
    country: String,
    /// Payment provider that issued the token
    #[arg(long, default_value = "stripe")]
    provider: String,
    /// Payment method token from the provider's SDK
    #[arg(long)]
    payment_token: String,
}

impl CheckoutArgs {
    fn split(self) -> (ShippingDetails, PaymentDetails) {
        let shipping = ShippingDetails {
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            address_line1: self.address_line1,
            address_line2: self.address_line2,
            city: self.city,
            region: self.region,
            postal_code: self.postal_code,
            country: self.country,
        };
        let payment = PaymentDetails {
            provider: self.provider,
            payment_method_token: self.payment_token,
        };
        (shipping, payment)
    }
}

/// Submit the cart.
///
/// # Errors
///
/// Returns an error if validation or submission fails; the cart is kept.
pub async fn run(storefront: &Storefront, args: CheckoutArgs) -> Result<(), CheckoutError> {
    storefront.start().await;

    let summary = storefront.checkout().summary();
    println!(
        "Placing order for {} item(s), total {}",
        summary.item_count, summary.total
    );

    let (shipping, payment) = args.split();
    let confirmation = storefront.checkout().submit(&shipping, &payment).await?;
    println!("Order placed: {}", confirmation.order_id);
    Ok(())
}
