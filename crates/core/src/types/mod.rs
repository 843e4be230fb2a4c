//! Core types for Juniper Market.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod method;
pub mod price;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use method::{DeliveryMethod, PaymentMethod};
pub use price::Price;
pub use role::UserRole;
