//! Integration tests for the checkout state machine.
//!
//! The flow runs against [`StubBackend`] and in-memory storage; the cart
//! store and session manager are the real implementations.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use juniper_core::{AddressId, DeliveryMethod, PaymentMethod, Price, ProductId};
use juniper_integration_tests::{
    StubBackend, complete_address_form, sample_address, sample_product, session_manager, sign_in,
};
use juniper_storefront::cart::CartStore;
use juniper_storefront::checkout::{CheckoutError, CheckoutFlow, CheckoutStage};
use juniper_storefront::storage::{StorageArea, keys};

struct Fixture {
    backend: StubBackend,
    cart: CartStore,
    durable: StorageArea,
    session_store: StorageArea,
}

impl Fixture {
    /// Signed-in shopper with one default address and a product in stock.
    fn signed_in() -> Self {
        juniper_integration_tests::init_tracing();

        let durable = StorageArea::in_memory();
        sign_in(&durable, 7);

        let backend = StubBackend::new();
        backend.put_addresses(vec![sample_address(1, false), sample_address(2, true)]);
        backend.put_product(sample_product(1, 1000, 10));

        Self {
            backend,
            cart: CartStore::new(durable.clone()),
            durable,
            session_store: StorageArea::in_memory(),
        }
    }

    fn flow(&self) -> CheckoutFlow<StubBackend> {
        CheckoutFlow::new(
            self.backend.clone(),
            session_manager(&self.durable),
            self.cart.clone(),
            self.session_store.clone(),
        )
    }
}

#[tokio::test]
async fn test_happy_path_delivery_order() {
    let fixture = Fixture::signed_in();
    fixture.cart.add_item(&sample_product(1, 1000, 10));
    fixture.cart.set_quantity(ProductId::new(1), 3);

    let mut flow = fixture.flow();
    assert_eq!(flow.begin().await.unwrap(), CheckoutStage::AddressSelection);

    // The address flagged default was auto-selected.
    let selected = flow.draft().unwrap().selected_address.clone().unwrap();
    assert_eq!(selected.id, AddressId::new(2));

    assert_eq!(
        flow.proceed_to_payment().unwrap(),
        CheckoutStage::PaymentSelection
    );
    flow.choose_payment(PaymentMethod::CreditCard).unwrap();
    flow.set_notes(Some("leave at the door".to_string())).unwrap();

    let order = flow.confirm().await.unwrap();
    assert_eq!(flow.stage(), CheckoutStage::Completed);

    // Subtotal 30.00 + 5.99 delivery surcharge.
    assert_eq!(order.total_amount, Price::from_minor_units(3599));

    // Exactly one submission, carrying the selections.
    let submissions = fixture.backend.submissions();
    assert_eq!(submissions.len(), 1);
    let submission = &submissions[0];
    assert_eq!(submission.payment_method_id, 2);
    assert_eq!(submission.delivery_method, DeliveryMethod::Delivery);
    assert_eq!(
        submission.selected_address.as_ref().unwrap().id,
        AddressId::new(2)
    );
    assert_eq!(submission.notes.as_deref(), Some("leave at the door"));

    // Side effects: cart cleared, draft discarded.
    assert!(fixture.cart.snapshot().is_empty());
    assert!(fixture.session_store.get(keys::CHECKOUT_DRAFT).is_none());
}

#[tokio::test]
async fn test_pickup_order_skips_address_and_surcharge() {
    let fixture = Fixture::signed_in();
    fixture.cart.add_item(&sample_product(1, 10000, 10));

    let mut flow = fixture.flow();
    flow.begin().await.unwrap();
    flow.set_delivery_method(DeliveryMethod::Pickup).unwrap();

    // Pickup needs no address even if none were selected.
    flow.proceed_to_payment().unwrap();
    flow.choose_payment(PaymentMethod::CashOnPickup).unwrap();

    let order = flow.confirm().await.unwrap();
    assert_eq!(order.total_amount, Price::from_minor_units(10000));

    let submission = &fixture.backend.submissions()[0];
    assert!(submission.selected_address.is_none());
    assert_eq!(submission.payment_method_id, 6);
}

#[tokio::test]
async fn test_begin_requires_authentication() {
    let fixture = Fixture::signed_in();
    fixture.cart.add_item(&sample_product(1, 1000, 10));

    // Remove the credential: the flow must refuse and signal sign-in.
    let session = session_manager(&fixture.durable);
    session.logout();

    let mut flow = fixture.flow();
    assert!(matches!(
        flow.begin().await,
        Err(CheckoutError::NotAuthenticated)
    ));
    assert_eq!(flow.stage(), CheckoutStage::Idle);
}

#[tokio::test]
async fn test_begin_refuses_empty_cart() {
    let fixture = Fixture::signed_in();

    let mut flow = fixture.flow();
    assert!(matches!(flow.begin().await, Err(CheckoutError::EmptyCart)));
}

#[tokio::test]
async fn test_delivery_without_address_is_blocked() {
    let fixture = Fixture::signed_in();
    fixture.backend.put_addresses(Vec::new());
    fixture.cart.add_item(&sample_product(1, 1000, 10));

    let mut flow = fixture.flow();
    flow.begin().await.unwrap();

    // No addresses to auto-select; delivery cannot proceed.
    assert!(flow.draft().unwrap().selected_address.is_none());
    assert!(matches!(
        flow.proceed_to_payment(),
        Err(CheckoutError::AddressRequired)
    ));

    // Creating an address unblocks the step.
    flow.save_new_address(&complete_address_form()).await.unwrap();
    assert!(flow.draft().unwrap().selected_address.is_some());
    flow.proceed_to_payment().unwrap();
}

#[tokio::test]
async fn test_incomplete_address_form_is_rejected_before_any_call() {
    let fixture = Fixture::signed_in();
    fixture.backend.put_addresses(Vec::new());
    fixture.cart.add_item(&sample_product(1, 1000, 10));

    let mut flow = fixture.flow();
    flow.begin().await.unwrap();

    let mut form = complete_address_form();
    form.street = "  ".to_string();
    assert!(matches!(
        flow.save_new_address(&form).await,
        Err(CheckoutError::MissingField("street"))
    ));

    // Nothing was created; the form stays open for retry.
    assert!(flow.addresses().is_empty());
}

#[tokio::test]
async fn test_confirm_requires_payment_method() {
    let fixture = Fixture::signed_in();
    fixture.cart.add_item(&sample_product(1, 1000, 10));

    let mut flow = fixture.flow();
    flow.begin().await.unwrap();
    flow.proceed_to_payment().unwrap();

    assert!(matches!(
        flow.confirm().await,
        Err(CheckoutError::PaymentRequired)
    ));
    assert!(fixture.backend.submissions().is_empty());
}

#[tokio::test]
async fn test_inventory_validation_clamps_and_reports() {
    let fixture = Fixture::signed_in();

    // Shopper added 3 while the ceiling allowed it...
    fixture.cart.add_item(&sample_product(1, 1000, 10));
    fixture.cart.set_quantity(ProductId::new(1), 3);
    // ...but the backend now only has 1 on hand.
    fixture.backend.put_product(sample_product(1, 1000, 1));

    let mut flow = fixture.flow();
    flow.begin().await.unwrap();
    flow.proceed_to_payment().unwrap();
    flow.choose_payment(PaymentMethod::Blik).unwrap();

    let err = flow.confirm().await.unwrap_err();
    let CheckoutError::StockAdjusted(adjustments) = err else {
        panic!("expected StockAdjusted, got {err:?}");
    };

    // The report names the product; the order was NOT submitted.
    assert_eq!(adjustments.len(), 1);
    assert_eq!(adjustments[0].name, "Product 1");
    assert_eq!(adjustments[0].requested, 3);
    assert_eq!(adjustments[0].available, 1);
    assert!(fixture.backend.submissions().is_empty());

    // The flow is back at payment selection and the cart store was
    // clamped to server truth as a side effect.
    assert_eq!(flow.stage(), CheckoutStage::PaymentSelection);
    let line = &fixture.cart.snapshot().lines[0];
    assert_eq!(line.quantity, 1);
    assert_eq!(line.stock_at_add, 1);

    // Re-confirming now goes through with the adjusted quantity.
    let order = flow.confirm().await.unwrap();
    assert_eq!(order.total_amount, Price::from_minor_units(1000 + 599));
    assert_eq!(fixture.backend.submissions().len(), 1);
}

#[tokio::test]
async fn test_zero_stock_line_is_dropped_during_validation() {
    let fixture = Fixture::signed_in();
    fixture.cart.add_item(&sample_product(1, 1000, 10));
    fixture.cart.add_item(&sample_product(2, 500, 10));
    fixture.backend.put_product(sample_product(1, 1000, 0));
    fixture.backend.put_product(sample_product(2, 500, 10));

    let mut flow = fixture.flow();
    flow.begin().await.unwrap();
    flow.proceed_to_payment().unwrap();
    flow.choose_payment(PaymentMethod::Blik).unwrap();

    assert!(matches!(
        flow.confirm().await,
        Err(CheckoutError::StockAdjusted(_))
    ));

    // The sold-out line is gone from the cart entirely.
    let snapshot = fixture.cart.snapshot();
    assert_eq!(snapshot.lines.len(), 1);
    assert_eq!(snapshot.lines[0].product_id, ProductId::new(2));
}

#[tokio::test]
async fn test_failed_submission_preserves_draft_for_manual_retry() {
    let fixture = Fixture::signed_in();
    fixture.cart.add_item(&sample_product(1, 1000, 10));
    fixture.backend.fail_submissions(true);

    let mut flow = fixture.flow();
    flow.begin().await.unwrap();
    flow.proceed_to_payment().unwrap();
    flow.choose_payment(PaymentMethod::PayPal).unwrap();

    assert!(matches!(flow.confirm().await, Err(CheckoutError::Api(_))));
    assert_eq!(flow.stage(), CheckoutStage::Failed);

    // Selections survive: the draft (payment included) is still there,
    // in memory and persisted.
    assert_eq!(
        flow.draft().unwrap().payment_method,
        Some(PaymentMethod::PayPal)
    );
    assert!(fixture.session_store.get(keys::CHECKOUT_DRAFT).is_some());
    // The cart was not cleared.
    assert!(!fixture.cart.snapshot().is_empty());

    // No automatic retry happened; the manual one succeeds.
    fixture.backend.fail_submissions(false);
    flow.confirm().await.unwrap();
    assert_eq!(flow.stage(), CheckoutStage::Completed);
    assert_eq!(fixture.backend.submissions().len(), 1);
}

#[tokio::test]
async fn test_draft_resumes_within_the_session() {
    let fixture = Fixture::signed_in();
    fixture.cart.add_item(&sample_product(1, 1000, 10));

    let first_id = {
        let mut flow = fixture.flow();
        flow.begin().await.unwrap();
        flow.set_delivery_method(DeliveryMethod::Pickup).unwrap();
        flow.set_notes(Some("resume me".to_string())).unwrap();
        flow.draft().unwrap().id
        // Dropping the flow abandons only the in-memory state.
    };

    let mut resumed = fixture.flow();
    resumed.begin().await.unwrap();

    let draft = resumed.draft().unwrap();
    assert_eq!(draft.id, first_id);
    assert_eq!(draft.delivery_method, DeliveryMethod::Pickup);
    assert_eq!(draft.notes.as_deref(), Some("resume me"));
}

#[tokio::test]
async fn test_abandon_discards_the_persisted_draft() {
    let fixture = Fixture::signed_in();
    fixture.cart.add_item(&sample_product(1, 1000, 10));

    let mut flow = fixture.flow();
    flow.begin().await.unwrap();
    assert!(fixture.session_store.get(keys::CHECKOUT_DRAFT).is_some());

    flow.abandon();
    assert_eq!(flow.stage(), CheckoutStage::Idle);
    assert!(fixture.session_store.get(keys::CHECKOUT_DRAFT).is_none());
}

#[tokio::test]
async fn test_checkout_draft_is_isolated_from_cart_edits() {
    let fixture = Fixture::signed_in();
    fixture.cart.add_item(&sample_product(1, 1000, 10));

    let mut flow = fixture.flow();
    flow.begin().await.unwrap();

    // The shopper keeps editing the cart in another view.
    fixture.cart.add_item(&sample_product(1, 1000, 10));
    fixture.cart.add_item(&sample_product(1, 1000, 10));

    // The in-flight draft still carries the snapshot taken at entry.
    assert_eq!(flow.draft().unwrap().lines[0].quantity, 1);
    assert_eq!(fixture.cart.snapshot().count, 3);
}

#[tokio::test]
async fn test_delivery_toggle_recomputes_total_without_changing_stage() {
    let fixture = Fixture::signed_in();
    fixture.cart.add_item(&sample_product(1, 10000, 10));

    let mut flow = fixture.flow();
    flow.begin().await.unwrap();

    assert_eq!(
        flow.draft().unwrap().total(),
        Price::from_minor_units(10599)
    );

    flow.set_delivery_method(DeliveryMethod::Pickup).unwrap();
    assert_eq!(flow.draft().unwrap().total(), Price::from_minor_units(10000));
    assert_eq!(flow.stage(), CheckoutStage::AddressSelection);
}
