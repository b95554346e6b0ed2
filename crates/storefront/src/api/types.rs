//! Backend request and response bodies.

use serde::{Deserialize, Serialize};

use chrono::{DateTime, Utc};

use vdiamond_core::{BearerToken, CartLineItem, OrderId, Price, UserProfile};

/// `POST /auth/login` body.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// `POST /auth/login` response.
///
/// Some backend revisions omit the user; the session then loads it lazily.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: BearerToken,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// `POST /auth/register` body.
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Plain `{"message": ...}` acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

/// Error body shapes the backend uses for non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Where the order ships.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub address_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
}

/// Payment method issued by the payment provider's SDK.
///
/// Only the provider's token is carried. Card numbers never pass through
/// this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub provider: String,
    pub payment_method_token: String,
}

/// `POST /orders` body.
#[derive(Debug, Serialize)]
pub struct OrderSubmission<'a> {
    pub cart: &'a [CartLineItem],
    pub total: Price,
    pub shipping: &'a ShippingDetails,
    pub payment: &'a PaymentDetails,
}

/// `POST /orders` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderConfirmation {
    #[serde(rename = "orderId", alias = "order_id")]
    pub order_id: OrderId,
}

/// `PUT /user/profile` body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// One product line of a past order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderLine {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: u32,
    pub price: Price,
    pub total: Price,
}

/// `GET /user/orders` element.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub status: String,
    pub total: Price,
    #[serde(default)]
    pub items: Vec<OrderLine>,
}
