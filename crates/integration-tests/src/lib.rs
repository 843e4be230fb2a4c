//! Integration tests for Juniper Market.
//!
//! The storefront core is exercised end-to-end against stub backend
//! collaborators and real (temp-file or in-memory) storage areas; no
//! network or running backend is required.
//!
//! # Test Categories
//!
//! - `checkout_flow` - the full cart-to-order state machine
//! - `cart_persistence` - cart durability across restarts
//! - `session_flow` - credential storage and fail-closed decoding
//!
//! This crate's library target holds the shared fixtures: a fake
//! credential builder, sample wire objects, and [`StubBackend`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use uuid::Uuid;

use juniper_core::{AddressId, OrderId, Price, ProductId, UserId};
use juniper_storefront::api::types::{NewAddress, Order, OrderSubmission, Product, UserAddress};
use juniper_storefront::api::{ApiClient, ApiError, AuthService};
use juniper_storefront::checkout::CheckoutBackend;
use juniper_storefront::config::StorefrontConfig;
use juniper_storefront::fault::PromptHost;
use juniper_storefront::session::SessionManager;
use juniper_storefront::storage::{StorageArea, keys};

/// Install a test-scoped tracing subscriber, once per process.
///
/// Controlled by `RUST_LOG`; quiet by default.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build a credential whose claims segment decodes to the given subject,
/// role, and expiry offset (seconds from now; negative = expired).
#[must_use]
pub fn credential(subject: i32, role: &str, expires_in_secs: i64) -> String {
    let exp = Utc::now().timestamp() + expires_in_secs;
    let claims = format!(
        r#"{{"sub":"{subject}","given_name":"Jan","family_name":"Kowalski","email":"jan@example.com","role":"{role}","jti":"t1","exp":{exp},"iss":"juniper","aud":"storefront"}}"#
    );
    format!("hdr.{}.sig", URL_SAFE_NO_PAD.encode(claims))
}

/// Store a fresh user credential in the given area.
pub fn sign_in(area: &StorageArea, subject: i32) {
    area.set(keys::CREDENTIAL, &credential(subject, "User", 3600))
        .expect("storing a credential in a test area cannot fail");
}

/// Build a session manager over the given durable area.
///
/// The backing auth service points at the default (unreachable in tests)
/// base URL; tests that only exercise decoding never touch the wire.
#[must_use]
pub fn session_manager(area: &StorageArea) -> SessionManager {
    let api = ApiClient::new(
        &StorefrontConfig::default(),
        area.clone(),
        PromptHost::detached(),
    )
    .expect("building the HTTP client cannot fail");

    SessionManager::new(AuthService::new(api), area.clone())
}

/// A sample catalog product.
#[must_use]
pub fn sample_product(id: i32, price_minor: i64, stock: u32) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        category: "Pantry".to_string(),
        description: "A test product.".to_string(),
        price: Price::from_minor_units(price_minor),
        stock,
        base64_image: String::new(),
    }
}

/// A sample saved address.
#[must_use]
pub fn sample_address(id: i32, is_default: bool) -> UserAddress {
    UserAddress {
        id: AddressId::new(id),
        label: format!("Address {id}"),
        street: "1 Main St".to_string(),
        city: "Springfield".to_string(),
        postal_code: "12-345".to_string(),
        country: "Poland".to_string(),
        phone_area_code: "+48".to_string(),
        phone_number: "555123456".to_string(),
        is_default,
    }
}

/// A complete new-address form.
#[must_use]
pub fn complete_address_form() -> NewAddress {
    NewAddress {
        label: "Work".to_string(),
        street: "2 Office Rd".to_string(),
        city: "Springfield".to_string(),
        postal_code: "12-345".to_string(),
        country: "Poland".to_string(),
        phone_area_code: "+48".to_string(),
        phone_number: "555999888".to_string(),
        is_default: false,
    }
}

/// Checkout backend stub with scriptable catalog, addresses, and
/// submission behavior.
#[derive(Clone, Default)]
pub struct StubBackend {
    inner: Arc<StubBackendInner>,
}

#[derive(Default)]
struct StubBackendInner {
    products: Mutex<HashMap<i32, Product>>,
    addresses: Mutex<Vec<UserAddress>>,
    fail_submissions: Mutex<bool>,
    submissions: Mutex<Vec<OrderSubmission>>,
    next_address_id: AtomicI32,
}

impl StubBackend {
    #[must_use]
    pub fn new() -> Self {
        let stub = Self::default();
        stub.inner.next_address_id.store(100, Ordering::SeqCst);
        stub
    }

    /// Make a product (and its authoritative stock) available.
    pub fn put_product(&self, product: Product) {
        self.inner
            .products
            .lock()
            .expect("stub lock")
            .insert(product.id.as_i32(), product);
    }

    /// Replace the saved address list.
    pub fn put_addresses(&self, addresses: Vec<UserAddress>) {
        *self.inner.addresses.lock().expect("stub lock") = addresses;
    }

    /// Make every subsequent submission fail (or succeed again).
    pub fn fail_submissions(&self, fail: bool) {
        *self.inner.fail_submissions.lock().expect("stub lock") = fail;
    }

    /// Orders submitted so far.
    #[must_use]
    pub fn submissions(&self) -> Vec<OrderSubmission> {
        self.inner.submissions.lock().expect("stub lock").clone()
    }
}

impl CheckoutBackend for StubBackend {
    async fn live_product(&self, id: ProductId) -> Result<Product, ApiError> {
        self.inner
            .products
            .lock()
            .expect("stub lock")
            .get(&id.as_i32())
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Product not found: {id}")))
    }

    async fn addresses_for(&self, _user_id: UserId) -> Result<Vec<UserAddress>, ApiError> {
        Ok(self.inner.addresses.lock().expect("stub lock").clone())
    }

    async fn create_address(&self, address: &NewAddress) -> Result<UserAddress, ApiError> {
        let id = self.inner.next_address_id.fetch_add(1, Ordering::SeqCst);
        let created = UserAddress {
            id: AddressId::new(id),
            label: address.label.clone(),
            street: address.street.clone(),
            city: address.city.clone(),
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
            phone_area_code: address.phone_area_code.clone(),
            phone_number: address.phone_number.clone(),
            is_default: address.is_default,
        };

        self.inner
            .addresses
            .lock()
            .expect("stub lock")
            .push(created.clone());
        Ok(created)
    }

    async fn submit_order(&self, submission: &OrderSubmission) -> Result<Order, ApiError> {
        if *self.inner.fail_submissions.lock().expect("stub lock") {
            return Err(ApiError::Api {
                status: 502,
                title: "Bad Gateway".to_string(),
                detail: "order service unavailable".to_string(),
            });
        }

        self.inner
            .submissions
            .lock()
            .expect("stub lock")
            .push(submission.clone());

        let now = Utc::now();
        Ok(Order {
            id: OrderId::new(1),
            order_guid: Uuid::new_v4(),
            total_amount: submission.total,
            status: "Pending".to_string(),
            notes: submission.notes.clone(),
            created_at: now,
            updated_at: now,
            items: Vec::new(),
        })
    }
}
