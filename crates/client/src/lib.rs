//! TZ Materials marketplace client library.
//!
//! This crate holds everything a front end needs to talk to the marketplace
//! backend:
//! - [`api`] - REST client and the narrow traits the workflows depend on
//! - [`auth`] - Token lifecycle: login, proactive refresh, logout
//! - [`cart`] - Locally persisted cart grouped by seller
//! - [`checkout`] - Order/payment workflow controller
//! - [`session`] / [`storage`] - Persisted client state

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod session;
pub mod storage;

pub use api::MarketplaceClient;
pub use auth::{AuthError, TokenManager};
pub use cart::{CartError, CartStore};
pub use checkout::{CheckoutController, CheckoutError, Transaction};
pub use config::{ClientConfig, ConfigError};
pub use error::ApiError;
pub use session::SessionStore;
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
