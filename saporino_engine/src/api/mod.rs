//! # Storefront engine public API
//!
//! The `api` module exposes the programmatic API for the storefront. An API instance is created by supplying a
//! database backend that implements the backend traits the API needs.
//!
//! * [`order_flow_api`] places orders, reconciles payment signals from the gateway and applies admin changes.
//! * [`catalog_api`] reads the product catalog and prices carts from it.
//!
//! ```rust,ignore
//! use saporino_engine::{CatalogApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements CatalogManagement
//! let api = CatalogApi::new(db);
//! let products = api.products().await?;
//! ```
pub mod catalog_api;
pub mod order_flow_api;
pub mod order_objects;
