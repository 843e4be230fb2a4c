//! Juniper Core - Shared types library.
//!
//! This crate provides common types used across all Juniper Market components:
//! - `storefront` - Client core for the shopper-facing application
//! - `integration-tests` - Cross-module flow tests
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients,
//! no storage access. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, roles,
//!   and checkout method enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
