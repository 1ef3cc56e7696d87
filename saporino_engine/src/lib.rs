//! # Saporino storefront engine
//!
//! The order and payment lifecycle of the Saporino coffee storefront, independent of any web framework.
//!
//! * [`cart`] holds what the shopper is buying.
//! * [`OrderFlowApi`] turns a cart into a `pending` order, applies payment signals from the gateway and lets staff
//!   move orders through fulfilment.
//! * [`status`] holds the rules for which status changes a payment signal may make.
//! * [`CatalogApi`] reads products and prices carts from the catalog.
//! * [`events`] lets the host application react to paid, shipped and unmatched payments.
//!
//! Storage sits behind the traits in [`traits`]. [`SqliteDatabase`] is the only backend.
pub mod cart;
pub mod db_types;
pub mod events;
pub mod shipping;
pub mod status;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

#[cfg(feature = "test_utils")]
pub mod test_utils;

pub mod api;

pub use api::{
    catalog_api::CatalogApi,
    order_flow_api::OrderFlowApi,
    order_objects,
};
pub use traits::{CatalogApiError, CatalogManagement, OrderFlowError, OrderManagement, StorefrontDatabase};
