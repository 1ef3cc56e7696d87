//! # Mercado Pago tools
//!
//! A small, server-side client for the parts of the Mercado Pago REST API that the storefront uses:
//!
//! * [`MercadoPagoApi::create_preference`] creates a Checkout Pro preference for an order.
//! * [`MercadoPagoApi::get_payment`] re-reads a payment from the gateway. Webhook bodies only carry a payment id and
//!   are never trusted on their own.
//!
//! The private access token never leaves this crate's [`MercadoPagoConfig`].
mod api;
mod config;
mod error;

pub mod data_objects;

pub use api::MercadoPagoApi;
pub use config::MercadoPagoConfig;
pub use data_objects::{
    BackUrls,
    Payer,
    PaymentDetails,
    PaymentStatus,
    Phone,
    Preference,
    PreferenceItem,
    PreferenceRequest,
    WebhookData,
    WebhookNotification,
};
pub use error::MercadoPagoApiError;
