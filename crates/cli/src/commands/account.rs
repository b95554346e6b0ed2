//! Account page commands.

use clap::Args;

use vdiamond_storefront::Storefront;
use vdiamond_storefront::api::ProfileUpdate;

use super::CliError;

/// Profile fields to save.
#[derive(Args)]
pub struct ProfileArgs {
    #[arg(short, long)]
    name: String,
    #[arg(short, long)]
    email: String,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: Option<String>,
}

/// # Errors
///
/// Returns an error if the order history cannot be loaded.
pub async fn orders(storefront: &Storefront) -> Result<(), CliError> {
    let orders = storefront.account().order_history().await?;
    if orders.is_empty() {
        println!("You haven't placed any orders yet.");
        return Ok(());
    }

    for order in &orders {
        println!(
            "#{}  {}  {:<10} {}",
            order.id,
            order.created_at.format("%Y-%m-%d"),
            order.status,
            order.total
        );
        for line in &order.items {
            println!(
                "    {:>3} × {:<30} {}",
                line.quantity, line.product_name, line.total
            );
        }
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the input is invalid or the backend rejects it.
pub async fn profile(storefront: &Storefront, args: ProfileArgs) -> Result<(), CliError> {
    let update = ProfileUpdate {
        name: args.name,
        email: args.email,
        phone: args.phone,
        address: args.address,
    };
    match storefront.account().update_profile(&update).await? {
        Some(user) => println!("Profile updated: {} <{}>", user.display_name(), user.email),
        None => println!("Profile updated."),
    }
    Ok(())
}
