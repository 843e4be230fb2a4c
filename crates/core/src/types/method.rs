//! Checkout method enums: delivery and payment selection.

use serde::{Deserialize, Serialize};

/// How the order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    /// Shipped to a selected address; adds the flat shipping surcharge.
    #[default]
    Delivery,
    /// Collected in store; no address, no surcharge.
    Pickup,
}

impl DeliveryMethod {
    /// Whether this method requires a delivery address.
    #[must_use]
    pub const fn requires_address(&self) -> bool {
        matches!(self, Self::Delivery)
    }
}

/// Payment method selection.
///
/// Selection is a local enum-to-id mapping; the backend owns all payment
/// processing. The discriminants are the backend's payment method ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    Blik,
    CreditCard,
    PayPal,
    ApplePay,
    GooglePay,
    CashOnPickup,
}

impl PaymentMethod {
    /// The backend's numeric id for this method.
    #[must_use]
    pub const fn id(&self) -> i32 {
        match self {
            Self::Blik => 1,
            Self::CreditCard => 2,
            Self::PayPal => 3,
            Self::ApplePay => 4,
            Self::GooglePay => 5,
            Self::CashOnPickup => 6,
        }
    }

    /// Look up a method by its backend id.
    #[must_use]
    pub const fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(Self::Blik),
            2 => Some(Self::CreditCard),
            3 => Some(Self::PayPal),
            4 => Some(Self::ApplePay),
            5 => Some(Self::GooglePay),
            6 => Some(Self::CashOnPickup),
            _ => None,
        }
    }

    /// Display name shown in the payment picker.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Blik => "BLIK",
            Self::CreditCard => "Credit Card",
            Self::PayPal => "PayPal",
            Self::ApplePay => "Apple Pay",
            Self::GooglePay => "Google Pay",
            Self::CashOnPickup => "Cash on Pickup",
        }
    }
}
