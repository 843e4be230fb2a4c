//! Juniper Market storefront client core.
//!
//! The state-coordination layer behind the shopper UI: catalog browsing,
//! search suggestions, the shopping cart, checkout, order history, and
//! the role-gated admin operations. All business truth (inventory,
//! pricing, payments, persistence) lives in the remote backend; this
//! crate owns the client-side state and the policies around it.
//!
//! # Architecture
//!
//! - [`api`] - REST clients behind a single chokepoint that attaches the
//!   bearer credential and escalates auth failures to blocking prompts
//! - [`session`] - credential storage and advisory claims decoding
//! - [`cart`] - the serialized, observable, persisted cart store
//! - [`checkout`] - the cart-to-order state machine with inventory
//!   re-validation
//! - [`search`] - debounced search-as-you-type suggestions
//! - [`fault`] - the at-most-one fault prompt host
//! - [`storage`] - durable and session-scoped client-local persistence
//! - [`state`] - [`state::AppState`] wiring it all together for a shell
//!
//! The rendering layer, routing, and form widgets live in the shell
//! hosting this crate; nothing here draws anything.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod fault;
pub mod search;
pub mod session;
pub mod state;
pub mod storage;

pub use api::{ApiClient, ApiError};
pub use cart::{CartLine, CartSnapshot, CartStore};
pub use checkout::{CheckoutDraft, CheckoutError, CheckoutFlow, CheckoutStage};
pub use config::StorefrontConfig;
pub use fault::{FaultPrompt, PromptHost, PromptSurface};
pub use session::{Identity, SessionClaims, SessionManager};
pub use state::AppState;
