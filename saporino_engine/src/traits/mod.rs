//! # Storefront database contracts
//!
//! These traits are the seams between the order flow and whatever stores the data. The SQLite backend in
//! [`crate::sqlite`] implements all of them; tests mock them.
//!
//! * [`StorefrontDatabase`] writes orders and applies status changes. Every status write goes through here, so the
//!   transition rules in [`crate::status`] are enforced in one place.
//! * [`OrderManagement`] answers read-only questions about orders and their items.
//! * [`CatalogManagement`] reads and prices the product catalog.
mod catalog_management;
mod data_objects;
mod order_management;
mod storefront_database;

pub use catalog_management::{CatalogApiError, CatalogManagement};
pub use data_objects::GatewayUpdateResult;
pub use order_management::OrderManagement;
pub use storefront_database::{OrderFlowError, StorefrontDatabase};
