//! Checkout orchestrator.
//!
//! Reads the cart, validates shipping and payment input locally, submits the
//! order through the gateway and takes the ordered units out of the cart only
//! once the backend has confirmed it. A failed submission leaves the cart
//! exactly as it was; items added while the order is in flight are kept.

use thiserror::Error;
use tracing::instrument;

use vdiamond_core::{CartLineItem, Email, Price};

use crate::api::{
    GatewayError, OrderConfirmation, OrderSubmission, PaymentDetails, PendingRequest,
    ShippingDetails,
};
use crate::cart::CartManager;
use crate::error::add_breadcrumb;
use crate::gateway::RequestGateway;

const ORDERS_PATH: &str = "/orders";

/// Errors returned by [`CheckoutOrchestrator::submit`].
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("your cart is empty")]
    EmptyCart,

    /// Shipping or payment input failed local validation.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl CheckoutError {
    /// A message suitable for showing to the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Gateway(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Read-only view of the cart for the checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSummary {
    pub lines: Vec<CartLineItem>,
    pub item_count: u64,
    pub total: Price,
}

/// Result shape for success/error callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Success(OrderConfirmation),
    Failure(String),
}

impl From<Result<OrderConfirmation, CheckoutError>> for CheckoutOutcome {
    fn from(result: Result<OrderConfirmation, CheckoutError>) -> Self {
        match result {
            Ok(confirmation) => Self::Success(confirmation),
            Err(e) => Self::Failure(e.user_message()),
        }
    }
}

/// Drives order submission for the shared cart.
#[derive(Debug, Clone)]
pub struct CheckoutOrchestrator {
    cart: CartManager,
    gateway: RequestGateway,
}

impl CheckoutOrchestrator {
    #[must_use]
    pub const fn new(cart: CartManager, gateway: RequestGateway) -> Self {
        Self { cart, gateway }
    }

    #[must_use]
    pub fn summary(&self) -> CheckoutSummary {
        let cart = self.cart.snapshot();
        CheckoutSummary {
            item_count: cart.item_count(),
            total: cart.total(),
            lines: cart.items().to_vec(),
        }
    }

    /// Submit the current cart as an order.
    ///
    /// The submitted units leave the cart only after the backend returns an
    /// order id.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::EmptyCart`] or [`CheckoutError::Validation`] before
    ///   any request is made.
    /// - [`CheckoutError::Gateway`] if the submission fails. The cart is left
    ///   untouched.
    #[instrument(skip_all)]
    pub async fn submit(
        &self,
        shipping: &ShippingDetails,
        payment: &PaymentDetails,
    ) -> Result<OrderConfirmation, CheckoutError> {
        let cart = self.cart.snapshot();
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        validate_shipping(shipping)?;
        validate_payment(payment)?;

        let total = cart.total();
        let request = PendingRequest::post(
            ORDERS_PATH,
            &OrderSubmission {
                cart: cart.items(),
                total,
                shipping,
                payment,
            },
        )?;

        tracing::info!(lines = cart.items().len(), total = %total, "submitting order");
        let confirmation: OrderConfirmation = self.gateway.send(request).await?;

        self.cart.remove_submitted(cart.items());
        add_breadcrumb(
            "checkout",
            "Order placed",
            Some(&[("order_id", confirmation.order_id.as_str())]),
        );
        tracing::info!(order_id = %confirmation.order_id, "order placed");
        Ok(confirmation)
    }

    /// [`Self::submit`], folded into a [`CheckoutOutcome`].
    pub async fn place_order(
        &self,
        shipping: &ShippingDetails,
        payment: &PaymentDetails,
    ) -> CheckoutOutcome {
        self.submit(shipping, payment).await.into()
    }
}

fn require(value: &str, field: &str) -> Result<(), CheckoutError> {
    if value.trim().is_empty() {
        return Err(CheckoutError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn validate_shipping(shipping: &ShippingDetails) -> Result<(), CheckoutError> {
    require(&shipping.full_name, "full name")?;
    require(&shipping.address_line1, "address")?;
    require(&shipping.city, "city")?;
    require(&shipping.postal_code, "postal code")?;
    require(&shipping.country, "country")?;

    if let Some(email) = shipping.email.as_deref().filter(|e| !e.trim().is_empty()) {
        Email::parse(email).map_err(|e| CheckoutError::Validation(e.to_string()))?;
    }
    Ok(())
}

fn validate_payment(payment: &PaymentDetails) -> Result<(), CheckoutError> {
    require(&payment.provider, "payment provider")?;
    require(&payment.payment_method_token, "payment method")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::ApiClient;
    use crate::config::StorefrontClientConfig;
    use crate::navigation::MemoryNavigator;
    use crate::session::SessionManager;
    use crate::storage::{MemoryStore, keys};

    fn shipping() -> ShippingDetails {
        ShippingDetails {
            full_name: "Jane Doe".to_string(),
            email: Some("jane@example.com".to_string()),
            address_line1: "1 Carat Way".to_string(),
            city: "Antwerp".to_string(),
            postal_code: "2018".to_string(),
            country: "BE".to_string(),
            ..ShippingDetails::default()
        }
    }

    fn payment() -> PaymentDetails {
        PaymentDetails {
            provider: "stripe".to_string(),
            payment_method_token: "pm_card_visa".to_string(),
        }
    }

    fn orchestrator(server: &MockServer) -> (Arc<MemoryStore>, CheckoutOrchestrator) {
        let config =
            StorefrontClientConfig::new(Url::parse(&format!("{}/api/", server.uri())).unwrap());
        let api = ApiClient::new(&config).unwrap();
        let navigator = Arc::new(MemoryNavigator::new("/checkout"));
        let session = SessionManager::new(
            api.clone(),
            Arc::new(MemoryStore::with_entry(keys::TOKEN, "\"tok\"")),
            navigator.clone(),
        );
        let gateway = RequestGateway::new(api, session, navigator);

        let store = Arc::new(MemoryStore::new());
        let cart = CartManager::new(store.clone());
        cart.add_item(
            CartLineItem::new("ring-1", "Solitaire", Price::from_cents(250_000), "/r1.jpg"),
            1,
        )
        .unwrap();
        (store, CheckoutOrchestrator::new(cart, gateway))
    }

    #[tokio::test]
    async fn test_success_clears_cart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/orders"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"orderId": "ord-42"})))
            .expect(1)
            .mount(&server)
            .await;

        let (store, checkout) = orchestrator(&server);
        let confirmation = checkout.submit(&shipping(), &payment()).await.unwrap();
        assert_eq!(confirmation.order_id.as_str(), "ord-42");
        assert_eq!(checkout.summary().item_count, 0);
        assert!(!store.contains(keys::CART));
    }

    #[tokio::test]
    async fn test_items_added_during_submission_survive() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/orders"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"orderId": "ord-43"}))
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (store, checkout) = orchestrator(&server);
        let cart = checkout.cart.clone();
        let shop_meanwhile = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cart.add_item(
                CartLineItem::new("ring-2", "Halo", Price::from_cents(90_000), "/r2.jpg"),
                1,
            )
            .unwrap();
            cart.add_item(
                CartLineItem::new("ring-1", "Solitaire", Price::from_cents(250_000), "/r1.jpg"),
                1,
            )
            .unwrap();
        };

        let (shipping, payment) = (shipping(), payment());
        let (placed, ()) = tokio::join!(checkout.submit(&shipping, &payment), shop_meanwhile);
        placed.unwrap();

        let summary = checkout.summary();
        let lines: Vec<_> = summary
            .lines
            .iter()
            .map(|line| (line.id.as_str(), line.quantity.get()))
            .collect();
        assert_eq!(lines, [("ring-1", 1), ("ring-2", 1)]);
        assert_eq!(summary.total, Price::from_cents(340_000));
        assert_eq!(CartManager::new(store).snapshot(), checkout.cart.snapshot());
    }

    #[tokio::test]
    async fn test_server_error_keeps_cart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/orders"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (store, checkout) = orchestrator(&server);
        let before = checkout.summary();
        let outcome = checkout.place_order(&shipping(), &payment()).await;

        assert!(matches!(outcome, CheckoutOutcome::Failure(_)));
        assert_eq!(checkout.summary(), before);
        assert!(store.contains(keys::CART));
    }

    #[tokio::test]
    async fn test_validation_happens_before_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"orderId": "x"})))
            .expect(0)
            .mount(&server)
            .await;

        let (_, checkout) = orchestrator(&server);

        let mut missing_city = shipping();
        missing_city.city = "  ".to_string();
        let err = checkout.submit(&missing_city, &payment()).await.unwrap_err();
        assert_eq!(err.to_string(), "city is required");

        let mut bad_email = shipping();
        bad_email.email = Some("jane@".to_string());
        assert!(matches!(
            checkout.submit(&bad_email, &payment()).await,
            Err(CheckoutError::Validation(_))
        ));

        let mut no_token = payment();
        no_token.payment_method_token = String::new();
        assert!(matches!(
            checkout.submit(&shipping(), &no_token).await,
            Err(CheckoutError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let server = MockServer::start().await;
        let (_, checkout) = orchestrator(&server);
        checkout.cart.clear();
        assert!(matches!(
            checkout.submit(&shipping(), &payment()).await,
            Err(CheckoutError::EmptyCart)
        ));
    }

    #[test]
    fn test_outcome_from_result() {
        let outcome = CheckoutOutcome::from(Err(CheckoutError::EmptyCart));
        assert_eq!(outcome, CheckoutOutcome::Failure("your cart is empty".to_string()));
    }
}
