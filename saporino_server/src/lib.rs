//! # Saporino storefront server
//! This crate hosts the HTTP server for the Saporino coffee storefront. It is responsible for:
//! * Taking orders from the storefront (single orders and monthly subscriptions) and opening a Mercado Pago checkout
//!   for each of them.
//! * Listening for payment webhooks from Mercado Pago, and for shoppers coming back from the checkout, and recording
//!   the payment status on the order.
//! * Letting staff search orders, change their status and record shipping details.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! See [routes](routes/index.html) for the full list. `/health` returns a 200 OK response.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
