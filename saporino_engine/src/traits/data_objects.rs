use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType};

/// What happened when the database was asked to apply a gateway status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayUpdateResult {
    /// The status changed. Holds the updated order.
    Updated(Order),
    /// The order already had the requested status. Any gateway ids that were still missing have been filled in.
    Unchanged(Order),
    /// The order is past the requested status (or in a status gateways can't touch) and was left alone.
    Stale { order: Order, requested: OrderStatusType },
    /// There is no order with that id.
    NotFound,
}
