use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId, OrderStatusType};

/// Emitted once, when a gateway signal first moves an order to `approved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Emitted when an admin marks an order as shipped. The order carries the tracking code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderShippedEvent {
    pub order: Order,
}

impl OrderShippedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// A payment whose external reference does not match any order. These need a human to look at them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmatchedPaymentEvent {
    pub payment_id: Option<String>,
    pub external_reference: Option<OrderId>,
    pub status: OrderStatusType,
}

impl UnmatchedPaymentEvent {
    pub fn new(payment_id: Option<String>, external_reference: Option<OrderId>, status: OrderStatusType) -> Self {
        Self { payment_id, external_reference, status }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderPaid(OrderPaidEvent),
    OrderShipped(OrderShippedEvent),
    UnmatchedPayment(UnmatchedPaymentEvent),
}
