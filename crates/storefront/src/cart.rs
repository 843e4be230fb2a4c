//! Shopping cart store.
//!
//! The cart is the one piece of mutable state observed from several UI
//! surfaces at once (header mini-cart, cart page, checkout). All
//! mutation goes through the serialized operations here; the derived
//! [`CartSnapshot`] is republished to every subscriber and written to
//! durable storage after each mutation.
//!
//! Each line records the stock on hand when it was added; that ceiling
//! bounds local quantity edits until checkout re-validates against the
//! backend. A line's quantity is never zero - reaching zero removes the
//! line.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use juniper_core::{Price, ProductId};

use crate::api::types::Product;
use crate::storage::{StorageArea, keys};

/// One product's entry in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    /// Unit price frozen at the moment the line was created.
    pub unit_price: Price,
    pub quantity: u32,
    /// Inline image payload carried for display.
    pub base64_image: String,
    /// Stock on hand when the line was created; bounds quantity edits.
    pub stock_at_add: u32,
}

impl CartLine {
    /// This line's contribution to the subtotal.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// Derived cart state, recomputed on every mutation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CartSnapshot {
    /// Lines in insertion order.
    pub lines: Vec<CartLine>,
    /// Sum of quantities.
    pub count: u32,
    /// Sum of `unit_price x quantity`.
    pub subtotal: Price,
}

impl CartSnapshot {
    fn from_lines(lines: Vec<CartLine>) -> Self {
        let count = lines.iter().map(|line| line.quantity).sum();
        let subtotal = lines.iter().map(CartLine::line_total).sum();
        Self {
            lines,
            count,
            subtotal,
        }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// The cart store.
///
/// Cheaply cloneable; clones share the same lines, subscribers, and
/// persistence.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    lines: Mutex<Vec<CartLine>>,
    snapshot: watch::Sender<CartSnapshot>,
    store: StorageArea,
}

impl CartStore {
    /// Create a store, restoring any persisted lines.
    ///
    /// A missing or malformed persisted cart is an empty cart, never an
    /// error.
    #[must_use]
    pub fn new(store: StorageArea) -> Self {
        let lines = store
            .get(keys::CART)
            .and_then(|raw| serde_json::from_str::<Vec<CartLine>>(&raw).ok())
            .unwrap_or_default();

        let (snapshot, _) = watch::channel(CartSnapshot::from_lines(lines.clone()));

        Self {
            inner: Arc::new(CartStoreInner {
                lines: Mutex::new(lines),
                snapshot,
                store,
            }),
        }
    }

    /// Add one unit of a product.
    ///
    /// An existing line is incremented only while below its recorded
    /// stock ceiling (silently a no-op at the ceiling); otherwise a new
    /// line is appended with quantity 1, recording the product's current
    /// stock as the ceiling.
    pub fn add_item(&self, product: &Product) {
        let mut lines = self.lock();

        if let Some(line) = lines.iter_mut().find(|line| line.product_id == product.id) {
            if line.quantity < line.stock_at_add {
                line.quantity += 1;
            }
        } else {
            lines.push(CartLine {
                product_id: product.id,
                name: product.name.clone(),
                unit_price: product.price,
                quantity: 1,
                base64_image: product.base64_image.clone(),
                stock_at_add: product.stock,
            });
        }

        self.commit(&lines);
    }

    /// Remove a line. No-op if absent.
    pub fn remove_item(&self, product_id: ProductId) {
        let mut lines = self.lock();
        lines.retain(|line| line.product_id != product_id);
        self.commit(&lines);
    }

    /// Set a line's quantity exactly.
    ///
    /// A quantity of zero or less removes the line; a quantity above the
    /// line's stock ceiling is rejected and the line is left unchanged.
    pub fn set_quantity(&self, product_id: ProductId, quantity: i32) {
        if quantity <= 0 {
            self.remove_item(product_id);
            return;
        }

        #[allow(clippy::cast_sign_loss)] // quantity > 0 checked above
        let quantity = quantity as u32;

        let mut lines = self.lock();
        let Some(line) = lines.iter_mut().find(|line| line.product_id == product_id) else {
            return;
        };

        if quantity > line.stock_at_add {
            return;
        }

        line.quantity = quantity;
        self.commit(&lines);
    }

    /// Empty the cart.
    pub fn clear(&self) {
        let mut lines = self.lock();
        lines.clear();
        self.commit(&lines);
    }

    /// Clamp a line down to the backend's authoritative stock figure.
    ///
    /// Used by checkout re-validation; the figure also becomes the new
    /// ceiling. Zero available removes the line.
    pub(crate) fn clamp_to_stock(&self, product_id: ProductId, available: u32) {
        if available == 0 {
            self.remove_item(product_id);
            return;
        }

        let mut lines = self.lock();
        let Some(line) = lines.iter_mut().find(|line| line.product_id == product_id) else {
            return;
        };

        line.quantity = line.quantity.min(available);
        line.stock_at_add = available;
        self.commit(&lines);
    }

    /// The current derived state.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Subscribe to derived-state updates.
    ///
    /// The receiver starts at the current snapshot and observes every
    /// subsequent committed mutation in emission order.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// Recompute, publish, and persist after a mutation.
    fn commit(&self, lines: &[CartLine]) {
        let snapshot = CartSnapshot::from_lines(lines.to_vec());

        match serde_json::to_string(lines) {
            Ok(raw) => {
                if let Err(e) = self.inner.store.set(keys::CART, &raw) {
                    tracing::warn!(error = %e, "failed to persist cart");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize cart"),
        }

        self.inner.snapshot.send_replace(snapshot);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CartLine>> {
        self.inner
            .lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
