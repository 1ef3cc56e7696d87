use crate::{
    api::order_objects::OrderQueryFilter,
    db_types::{Order, OrderId, OrderItem},
    traits::OrderFlowError,
};

/// Read-only queries over orders.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderFlowError>;

    /// The item lines of an order, in insertion order.
    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, OrderFlowError>;

    /// Orders matching `query`, newest first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;
}
