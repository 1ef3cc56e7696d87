use thiserror::Error;

use crate::{
    api::order_objects::{PaymentSource, PaymentUpdate, ShippingUpdate},
    db_types::{NewOrder, NewOrderItem, Order, OrderId, OrderStatusType},
    traits::{GatewayUpdateResult, OrderManagement},
};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Invalid order: {0}")]
    Validation(String),
    #[error("Cannot place an order with an empty cart")]
    EmptyCart,
    #[error("Order {0} is {1}. Only pending orders can be sent to the payment gateway")]
    OrderNotPending(OrderId, OrderStatusType),
    #[error("The requested modification would not change anything")]
    OrderModificationNoOp,
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}

/// The write side of the storefront.
///
/// Implementations must make each method atomic. In particular:
/// * `insert_order_with_items` either stores the header and every item, or nothing.
/// * `apply_gateway_update` must check and change the status in one step, so that two racing signals for the same
///   order can't both win.
#[allow(async_fn_in_trait)]
pub trait StorefrontDatabase: OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new `pending` order and its items. Item rows are never modified afterwards.
    async fn insert_order_with_items(&self, order: NewOrder, items: Vec<NewOrderItem>) -> Result<Order, OrderFlowError>;

    /// Records the gateway preference created for an order. Only `pending` orders accept a preference.
    async fn attach_preference(&self, order_id: &OrderId, preference_id: &str) -> Result<Order, OrderFlowError>;

    /// Applies a status reported by the payment gateway, subject to the forward-only rule in
    /// [`OrderStatusType::gateway_sources`]. A webhook may also overrule an unconfirmed status, as described in
    /// [`OrderStatusType::webhook_corrections`], and marks the status it writes as confirmed.
    ///
    /// Gateway ids in the update are stored alongside the status; ids already on the order are not erased by an update
    /// that lacks them.
    async fn apply_gateway_update(
        &self,
        update: &PaymentUpdate,
        source: PaymentSource,
    ) -> Result<GatewayUpdateResult, OrderFlowError>;

    /// Sets the status unconditionally. `shipped` also stamps `shipped_at` and generates a tracking code if there is
    /// none; `approved` stamps `paid_at` if it is empty.
    ///
    /// Returns [`OrderFlowError::OrderModificationNoOp`] if the order already has this status.
    async fn set_order_status(&self, order_id: &OrderId, status: OrderStatusType) -> Result<Order, OrderFlowError>;

    /// Sets the carrier and/or tracking code without touching the status.
    async fn update_shipping(&self, order_id: &OrderId, update: ShippingUpdate) -> Result<Order, OrderFlowError>;

    /// Closes the database connection(s).
    async fn close(&mut self) -> Result<(), OrderFlowError> {
        Ok(())
    }
}
