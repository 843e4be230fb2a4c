//! Checkout flow: from a cart snapshot to a submitted order.
//!
//! A short-lived state machine:
//!
//! ```text
//! Idle -> AddressSelection -> PaymentSelection -> InventoryValidation
//!      -> Submitting -> Completed | Failed
//! ```
//!
//! The flow copies the cart lines when it begins, so cart edits made
//! elsewhere while checkout is open cannot silently change an in-flight
//! draft; inventory re-validation later reconciles the two against the
//! backend's authoritative stock. The draft survives a restart mid-flow
//! through the session-scoped storage area and is discarded on
//! successful submission.
//!
//! Backend collaborators are reached through [`CheckoutBackend`] so the
//! flow can be driven against stubs in tests; [`ApiBackend`] is the
//! production implementation over the REST services.

use std::future::Future;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use juniper_core::{AddressId, DeliveryMethod, PaymentMethod, Price, ProductId, UserId};

use crate::api::types::{NewAddress, Order, OrderSubmission, Product, UserAddress};
use crate::api::{AddressService, ApiError, CatalogService, OrderService};
use crate::cart::{CartLine, CartStore};
use crate::session::SessionManager;
use crate::storage::{StorageArea, keys};

/// Flat surcharge added to delivery orders. Not computed from address or
/// weight.
#[must_use]
pub fn shipping_surcharge() -> Price {
    Price::from_minor_units(599) // $5.99
}

/// Steps of the checkout flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStage {
    Idle,
    AddressSelection,
    PaymentSelection,
    InventoryValidation,
    Submitting,
    Completed,
    Failed,
}

/// One cart line adjusted during inventory re-validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAdjustment {
    pub product_id: ProductId,
    pub name: String,
    /// Quantity the shopper had asked for.
    pub requested: u32,
    /// Authoritative stock the line was clamped to.
    pub available: u32,
}

/// Errors surfaced by the checkout flow.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Not signed in; the caller should redirect to sign-in.
    #[error("sign-in required to begin checkout")]
    NotAuthenticated,

    /// The cart has no lines to check out.
    #[error("cannot check out an empty cart")]
    EmptyCart,

    /// The operation does not apply to the current step.
    #[error("checkout is at the {actual:?} step, expected {expected:?}")]
    WrongStage {
        expected: CheckoutStage,
        actual: CheckoutStage,
    },

    /// Delivery was chosen but no address is selected.
    #[error("a delivery address must be selected")]
    AddressRequired,

    /// No payment method has been chosen.
    #[error("a payment method must be chosen")]
    PaymentRequired,

    /// The referenced address is not in the loaded list.
    #[error("unknown address: {0}")]
    UnknownAddress(AddressId),

    /// A required address form field is empty after trimming.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Re-validation clamped one or more lines; the cart now matches
    /// the backend and checkout must be re-confirmed.
    #[error("stock adjusted for {} item(s)", .0.len())]
    StockAdjusted(Vec<StockAdjustment>),

    /// A backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// The in-progress order construction.
///
/// Lines are a copy, not a live view of the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutDraft {
    pub id: Uuid,
    pub lines: Vec<CartLine>,
    pub delivery_method: DeliveryMethod,
    pub selected_address: Option<UserAddress>,
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CheckoutDraft {
    fn from_lines(lines: Vec<CartLine>) -> Self {
        Self {
            id: Uuid::new_v4(),
            lines,
            delivery_method: DeliveryMethod::Delivery,
            selected_address: None,
            payment_method: None,
            notes: None,
        }
    }

    /// Sum of `unit_price x quantity` over the draft's lines.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Running total: subtotal plus the shipping surcharge iff the
    /// delivery method is Delivery.
    #[must_use]
    pub fn total(&self) -> Price {
        match self.delivery_method {
            DeliveryMethod::Delivery => self.subtotal() + shipping_surcharge(),
            DeliveryMethod::Pickup => self.subtotal(),
        }
    }
}

// =============================================================================
// Backend seam
// =============================================================================

/// Backend collaborators the flow depends on.
pub trait CheckoutBackend: Send + Sync {
    /// Authoritative product state, straight from the wire.
    fn live_product(&self, id: ProductId)
    -> impl Future<Output = Result<Product, ApiError>> + Send;

    /// The user's saved addresses.
    fn addresses_for(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<UserAddress>, ApiError>> + Send;

    /// Persist a new address.
    fn create_address(
        &self,
        address: &NewAddress,
    ) -> impl Future<Output = Result<UserAddress, ApiError>> + Send;

    /// Submit the assembled order.
    fn submit_order(
        &self,
        submission: &OrderSubmission,
    ) -> impl Future<Output = Result<Order, ApiError>> + Send;
}

/// Production backend over the REST services.
#[derive(Clone)]
pub struct ApiBackend {
    catalog: CatalogService,
    addresses: AddressService,
    orders: OrderService,
}

impl ApiBackend {
    /// Bundle the REST services into a checkout backend.
    #[must_use]
    pub const fn new(
        catalog: CatalogService,
        addresses: AddressService,
        orders: OrderService,
    ) -> Self {
        Self {
            catalog,
            addresses,
            orders,
        }
    }
}

impl CheckoutBackend for ApiBackend {
    async fn live_product(&self, id: ProductId) -> Result<Product, ApiError> {
        self.catalog.live_product(id).await
    }

    async fn addresses_for(&self, user_id: UserId) -> Result<Vec<UserAddress>, ApiError> {
        self.addresses.for_user(user_id).await
    }

    async fn create_address(&self, address: &NewAddress) -> Result<UserAddress, ApiError> {
        self.addresses.create(address).await
    }

    async fn submit_order(&self, submission: &OrderSubmission) -> Result<Order, ApiError> {
        self.orders.create(submission).await
    }
}

// =============================================================================
// CheckoutFlow
// =============================================================================

/// The checkout state machine.
///
/// One instance per checkout attempt; dropping it abandons the in-memory
/// state while the persisted draft allows resuming within the session.
pub struct CheckoutFlow<B> {
    backend: B,
    session: SessionManager,
    cart: CartStore,
    drafts: StorageArea,
    stage: CheckoutStage,
    draft: Option<CheckoutDraft>,
    user_id: Option<UserId>,
    addresses: Vec<UserAddress>,
}

impl<B: CheckoutBackend> CheckoutFlow<B> {
    /// Create an idle flow.
    ///
    /// `drafts` is the session-scoped storage area holding the
    /// in-flight draft.
    #[must_use]
    pub const fn new(
        backend: B,
        session: SessionManager,
        cart: CartStore,
        drafts: StorageArea,
    ) -> Self {
        Self {
            backend,
            session,
            cart,
            drafts,
            stage: CheckoutStage::Idle,
            draft: None,
            user_id: None,
            addresses: Vec::new(),
        }
    }

    /// The current step.
    #[must_use]
    pub const fn stage(&self) -> CheckoutStage {
        self.stage
    }

    /// The in-progress draft, if the flow has begun.
    #[must_use]
    pub const fn draft(&self) -> Option<&CheckoutDraft> {
        self.draft.as_ref()
    }

    /// The addresses loaded for selection.
    #[must_use]
    pub fn addresses(&self) -> &[UserAddress] {
        &self.addresses
    }

    /// Enter the flow: guard, snapshot the cart, load addresses.
    ///
    /// Resumes a persisted draft from the same session when one exists;
    /// otherwise the draft starts from a copy of the current cart lines.
    /// Auto-selects the address flagged default, else the first
    /// returned, else none (the shopper must create one).
    ///
    /// # Errors
    ///
    /// [`CheckoutError::NotAuthenticated`] when no current credential is
    /// present (redirect to sign-in), [`CheckoutError::EmptyCart`] for
    /// an empty cart, or an API error if the address load fails (the
    /// flow stays idle; beginning again retries).
    #[instrument(skip(self))]
    pub async fn begin(&mut self) -> Result<CheckoutStage, CheckoutError> {
        if self.stage != CheckoutStage::Idle {
            return Err(CheckoutError::WrongStage {
                expected: CheckoutStage::Idle,
                actual: self.stage,
            });
        }

        if !self.session.is_authenticated() {
            return Err(CheckoutError::NotAuthenticated);
        }
        let identity = self
            .session
            .current_identity()
            .ok_or(CheckoutError::NotAuthenticated)?;

        let snapshot = self.cart.snapshot();
        if snapshot.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut draft = self
            .restore_draft()
            .unwrap_or_else(|| CheckoutDraft::from_lines(snapshot.lines));

        let addresses = self.backend.addresses_for(identity.id).await?;

        if draft.selected_address.is_none() {
            draft.selected_address = addresses
                .iter()
                .find(|address| address.is_default)
                .or_else(|| addresses.first())
                .cloned();
        }

        self.user_id = Some(identity.id);
        self.addresses = addresses;
        self.draft = Some(draft);
        self.persist_draft();
        self.stage = CheckoutStage::AddressSelection;
        Ok(self.stage)
    }

    /// Toggle between delivery and pickup.
    ///
    /// Recomputes the running total (the draft's [`CheckoutDraft::total`])
    /// without changing the step.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::WrongStage`] outside address selection.
    pub fn set_delivery_method(&mut self, method: DeliveryMethod) -> Result<(), CheckoutError> {
        self.expect_stage(CheckoutStage::AddressSelection)?;
        if let Some(draft) = self.draft.as_mut() {
            draft.delivery_method = method;
        }
        self.persist_draft();
        Ok(())
    }

    /// Select one of the loaded addresses.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::UnknownAddress`] if the id is not in the
    /// loaded list, or [`CheckoutError::WrongStage`] outside address
    /// selection.
    pub fn select_address(&mut self, id: AddressId) -> Result<(), CheckoutError> {
        self.expect_stage(CheckoutStage::AddressSelection)?;

        let address = self
            .addresses
            .iter()
            .find(|address| address.id == id)
            .cloned()
            .ok_or(CheckoutError::UnknownAddress(id))?;

        if let Some(draft) = self.draft.as_mut() {
            draft.selected_address = Some(address);
        }
        self.persist_draft();
        Ok(())
    }

    /// Save a new address and auto-select it.
    ///
    /// Validates that every required field is non-empty after trimming
    /// before any network call. On a save failure the error is returned
    /// and nothing changes, so the form stays open for retry.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::MissingField`] for an incomplete form,
    /// an API error for a failed save, or
    /// [`CheckoutError::WrongStage`] outside address selection.
    #[instrument(skip(self, address), fields(label = %address.label))]
    pub async fn save_new_address(&mut self, address: &NewAddress) -> Result<(), CheckoutError> {
        self.expect_stage(CheckoutStage::AddressSelection)?;
        validate_address(address)?;

        let user_id = self.user_id.ok_or(CheckoutError::NotAuthenticated)?;

        let created = self.backend.create_address(address).await?;
        self.addresses = self.backend.addresses_for(user_id).await?;

        if let Some(draft) = self.draft.as_mut() {
            draft.selected_address = Some(created);
        }
        self.persist_draft();
        Ok(())
    }

    /// Record order notes on the draft.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::WrongStage`] when no draft is active.
    pub fn set_notes(&mut self, notes: Option<String>) -> Result<(), CheckoutError> {
        if self.draft.is_none() {
            return Err(CheckoutError::WrongStage {
                expected: CheckoutStage::AddressSelection,
                actual: self.stage,
            });
        }
        if let Some(draft) = self.draft.as_mut() {
            draft.notes = notes.filter(|n| !n.trim().is_empty());
        }
        self.persist_draft();
        Ok(())
    }

    /// Advance to payment selection.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::AddressRequired`] when delivery is
    /// chosen without a selected address, or
    /// [`CheckoutError::WrongStage`] outside address selection.
    pub fn proceed_to_payment(&mut self) -> Result<CheckoutStage, CheckoutError> {
        self.expect_stage(CheckoutStage::AddressSelection)?;

        let draft = self.active_draft()?;
        if draft.delivery_method.requires_address() && draft.selected_address.is_none() {
            return Err(CheckoutError::AddressRequired);
        }

        self.stage = CheckoutStage::PaymentSelection;
        Ok(self.stage)
    }

    /// Choose the payment method.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::WrongStage`] outside payment selection.
    pub fn choose_payment(&mut self, method: PaymentMethod) -> Result<(), CheckoutError> {
        self.expect_stage(CheckoutStage::PaymentSelection)?;
        if let Some(draft) = self.draft.as_mut() {
            draft.payment_method = Some(method);
        }
        self.persist_draft();
        Ok(())
    }

    /// Re-validate inventory and submit the order.
    ///
    /// Fetches authoritative stock for every line concurrently and waits
    /// for all fetches. Lines over stock are clamped in the cart store
    /// (and in the draft copy) and reported via
    /// [`CheckoutError::StockAdjusted`]; the flow returns to payment
    /// selection for re-confirmation. With nothing to adjust, the order
    /// is submitted exactly once: success completes the flow, clears the
    /// cart, and discards the draft; failure preserves the draft so a
    /// manual retry needs no re-entry. There is no automatic retry.
    ///
    /// Also callable from the failed step to retry.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::PaymentRequired`] without a chosen method,
    /// [`CheckoutError::StockAdjusted`] after clamping, or an API error
    /// from the stock fetches or the submission.
    #[instrument(skip(self))]
    pub async fn confirm(&mut self) -> Result<Order, CheckoutError> {
        match self.stage {
            CheckoutStage::PaymentSelection | CheckoutStage::Failed => {}
            actual => {
                return Err(CheckoutError::WrongStage {
                    expected: CheckoutStage::PaymentSelection,
                    actual,
                });
            }
        }

        let draft = self.active_draft()?;
        let payment = draft.payment_method.ok_or(CheckoutError::PaymentRequired)?;
        if draft.lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let user_id = self.user_id.ok_or(CheckoutError::NotAuthenticated)?;

        self.stage = CheckoutStage::InventoryValidation;

        let ids: Vec<ProductId> = self
            .draft
            .as_ref()
            .map(|draft| draft.lines.iter().map(|line| line.product_id).collect())
            .unwrap_or_default();

        let results = join_all(ids.iter().map(|id| self.backend.live_product(*id))).await;

        let mut products = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(product) => products.push(product),
                Err(e) => {
                    // The whole barrier fails as a unit; back to payment
                    // for a manual retry.
                    self.stage = CheckoutStage::PaymentSelection;
                    return Err(e.into());
                }
            }
        }

        let adjustments = self.reconcile_stock(&products);
        if !adjustments.is_empty() {
            self.persist_draft();
            self.stage = CheckoutStage::PaymentSelection;
            return Err(CheckoutError::StockAdjusted(adjustments));
        }

        self.stage = CheckoutStage::Submitting;

        let submission = {
            let draft = self.active_draft()?;
            OrderSubmission {
                user_id,
                delivery_method: draft.delivery_method,
                selected_address: if draft.delivery_method.requires_address() {
                    draft.selected_address.clone()
                } else {
                    None
                },
                payment_method_id: payment.id(),
                cart_items: draft.lines.clone(),
                total: draft.total(),
                notes: draft.notes.clone(),
            }
        };

        match self.backend.submit_order(&submission).await {
            Ok(order) => {
                self.stage = CheckoutStage::Completed;
                self.cart.clear();
                self.discard_draft();
                Ok(order)
            }
            Err(e) => {
                // Keep the draft (selections included) for manual retry.
                self.stage = CheckoutStage::Failed;
                self.persist_draft();
                Err(e.into())
            }
        }
    }

    /// Abandon the flow, discarding the persisted draft.
    pub fn abandon(&mut self) {
        self.discard_draft();
        self.stage = CheckoutStage::Idle;
        self.addresses.clear();
        self.user_id = None;
    }

    /// Clamp draft lines against authoritative stock, mirroring each
    /// adjustment into the cart store, and report what changed.
    fn reconcile_stock(&mut self, products: &[Product]) -> Vec<StockAdjustment> {
        let Some(draft) = self.draft.as_mut() else {
            return Vec::new();
        };

        let mut adjustments = Vec::new();
        for line in &mut draft.lines {
            let Some(product) = products.iter().find(|p| p.id == line.product_id) else {
                continue;
            };

            if line.quantity > product.stock {
                adjustments.push(StockAdjustment {
                    product_id: line.product_id,
                    name: line.name.clone(),
                    requested: line.quantity,
                    available: product.stock,
                });

                self.cart.clamp_to_stock(line.product_id, product.stock);
                line.quantity = product.stock;
                line.stock_at_add = product.stock;
            }
        }

        draft.lines.retain(|line| line.quantity > 0);
        adjustments
    }

    fn active_draft(&self) -> Result<&CheckoutDraft, CheckoutError> {
        self.draft.as_ref().ok_or(CheckoutError::WrongStage {
            expected: CheckoutStage::AddressSelection,
            actual: self.stage,
        })
    }

    fn expect_stage(&self, expected: CheckoutStage) -> Result<(), CheckoutError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(CheckoutError::WrongStage {
                expected,
                actual: self.stage,
            })
        }
    }

    fn restore_draft(&self) -> Option<CheckoutDraft> {
        self.drafts
            .get(keys::CHECKOUT_DRAFT)
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }

    fn persist_draft(&self) {
        let Some(draft) = self.draft.as_ref() else {
            return;
        };

        match serde_json::to_string(draft) {
            Ok(raw) => {
                if let Err(e) = self.drafts.set(keys::CHECKOUT_DRAFT, &raw) {
                    tracing::warn!(error = %e, "failed to persist checkout draft");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize checkout draft"),
        }
    }

    fn discard_draft(&mut self) {
        self.draft = None;
        if let Err(e) = self.drafts.remove(keys::CHECKOUT_DRAFT) {
            tracing::warn!(error = %e, "failed to discard checkout draft");
        }
    }
}

/// Check that every required address field is non-empty after trimming.
fn validate_address(address: &NewAddress) -> Result<(), CheckoutError> {
    let required: [(&'static str, &str); 7] = [
        ("label", &address.label),
        ("street", &address.street),
        ("city", &address.city),
        ("postal code", &address.postal_code),
        ("country", &address.country),
        ("phone area code", &address.phone_area_code),
        ("phone number", &address.phone_number),
    ];

    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(CheckoutError::MissingField(name));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use juniper_core::Price;

    use super::*;

    fn line(id: i32, price_minor: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            name: format!("Product {id}"),
            unit_price: Price::from_minor_units(price_minor),
            quantity,
            base64_image: String::new(),
            stock_at_add: quantity,
        }
    }

    #[test]
    fn test_total_adds_surcharge_only_for_delivery() {
        // Subtotal 100.00; Delivery totals 105.99, Pickup totals 100.00.
        let mut draft = CheckoutDraft::from_lines(vec![line(1, 10000, 1)]);

        draft.delivery_method = DeliveryMethod::Delivery;
        assert_eq!(draft.total(), Price::from_minor_units(10599));

        draft.delivery_method = DeliveryMethod::Pickup;
        assert_eq!(draft.total(), Price::from_minor_units(10000));
    }

    #[test]
    fn test_subtotal_sums_line_totals() {
        let draft = CheckoutDraft::from_lines(vec![line(1, 1050, 3), line(2, 399, 1)]);
        assert_eq!(draft.subtotal(), Price::from_minor_units(3 * 1050 + 399));
    }

    #[test]
    fn test_validate_address_requires_trimmed_fields() {
        let complete = NewAddress {
            label: "Home".to_string(),
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            postal_code: "12-345".to_string(),
            country: "Poland".to_string(),
            phone_area_code: "+48".to_string(),
            phone_number: "555123456".to_string(),
            is_default: false,
        };
        assert!(validate_address(&complete).is_ok());

        let mut blank_city = complete.clone();
        blank_city.city = "   ".to_string();
        assert!(matches!(
            validate_address(&blank_city),
            Err(CheckoutError::MissingField("city"))
        ));

        let mut empty_phone = complete;
        empty_phone.phone_number = String::new();
        assert!(matches!(
            validate_address(&empty_phone),
            Err(CheckoutError::MissingField("phone number"))
        ));
    }

    #[test]
    fn test_draft_roundtrips_through_json() {
        let mut draft = CheckoutDraft::from_lines(vec![line(1, 1000, 2)]);
        draft.payment_method = Some(PaymentMethod::Blik);
        draft.notes = Some("ring the bell".to_string());

        let raw = serde_json::to_string(&draft).unwrap();
        let restored: CheckoutDraft = serde_json::from_str(&raw).unwrap();

        assert_eq!(restored.id, draft.id);
        assert_eq!(restored.lines, draft.lines);
        assert_eq!(restored.payment_method, Some(PaymentMethod::Blik));
        assert_eq!(restored.notes.as_deref(), Some("ring the bell"));
    }
}
