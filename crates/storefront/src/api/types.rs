//! Wire types for the backend REST API.
//!
//! Field names follow the backend's camelCase JSON. Monetary amounts are
//! decimals; entity keys use the typed IDs from `juniper-core`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use juniper_core::{AddressId, CategoryId, DeliveryMethod, Email, OrderId, Price, ProductId, UserId};

use crate::cart::CartLine;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub description: String,
    pub price: Price,
    /// Units on hand at the time the product was fetched.
    pub stock: u32,
    /// Inline image payload (base64), as served by the catalog.
    pub base64_image: String,
}

/// Payload for creating or updating a product (admin).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub category: String,
    pub description: String,
    pub price: Price,
    pub stock: u32,
    pub base64_image: String,
}

/// A product category (admin sub-resource).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub is_active: bool,
}

/// A delivery address owned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAddress {
    pub id: AddressId,
    pub label: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub phone_area_code: String,
    pub phone_number: String,
    pub is_default: bool,
}

/// Payload for creating a new address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
    pub label: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub phone_area_code: String,
    pub phone_number: String,
    pub is_default: bool,
}

/// One product's entry within a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i32,
    #[serde(rename = "productDTO")]
    pub product: Product,
    pub quantity: u32,
    pub unit_price: Price,
    pub subtotal: Price,
}

/// A placed order, as returned by the order history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_guid: Uuid,
    pub total_amount: Price,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// Order submission payload sent to `POST /order/create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmission {
    pub user_id: UserId,
    pub delivery_method: DeliveryMethod,
    /// Present iff the delivery method requires an address.
    pub selected_address: Option<UserAddress>,
    pub payment_method_id: i32,
    pub cart_items: Vec<CartLine>,
    pub total: Price,
    #[serde(default)]
    pub notes: Option<String>,
}

/// An account, as listed by the admin user endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub surname: String,
    pub email: Email,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub date_of_birth: DateTime<Utc>,
    pub is_active: bool,
    #[serde(default)]
    pub addresses: Option<Vec<UserAddress>>,
}

/// Payload for the admin user update endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub name: String,
    pub surname: String,
    pub email: Email,
    pub is_active: bool,
}

/// Registration form posted to `POST /auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    pub name: String,
    pub surname: String,
    pub email: Email,
    pub password: String,
    pub date_of_birth: DateTime<Utc>,
}
