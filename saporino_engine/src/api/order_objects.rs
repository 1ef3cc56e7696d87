use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{AccountInfo, GrindType, Order, OrderId, OrderItem, OrderStatusType, OrderType};

//--------------------------------------   OrderQueryFilter    ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub customer_email: Option<String>,
    pub order_type: Option<OrderType>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<Vec<OrderStatusType>>,
}

impl OrderQueryFilter {
    pub fn with_customer_email<S: Into<String>>(mut self, email: S) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    pub fn with_order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = Some(order_type);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.customer_email.is_none() &&
            self.order_type.is_none() &&
            self.status.as_ref().map(|s| s.is_empty()).unwrap_or(true) &&
            self.since.is_none() &&
            self.until.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(email) = &self.customer_email {
            write!(f, "customer_email: {email}. ")?;
        }
        if let Some(order_type) = &self.order_type {
            write!(f, "order_type: {order_type}. ")?;
        }
        if let Some(status) = &self.status {
            let s = status.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(",");
            write!(f, "status: [{s}]. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since: {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until: {until}. ")?;
        }
        Ok(())
    }
}

//--------------------------------------       Checkout        ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub postal_code: String,
    pub street: String,
    pub number: String,
    #[serde(default)]
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

/// Who is buying and where it goes. Every field except the address complement and account details is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutCustomer {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: ShippingAddress,
    #[serde(default)]
    pub account: Option<AccountInfo>,
}

impl CheckoutCustomer {
    /// Returns the name of the first required field that is blank.
    pub fn missing_field(&self) -> Option<&'static str> {
        let a = &self.address;
        let required = [
            ("customer_name", &self.name),
            ("customer_email", &self.email),
            ("customer_phone", &self.phone),
            ("shipping_postal_code", &a.postal_code),
            ("shipping_address", &a.street),
            ("shipping_number", &a.number),
            ("shipping_neighborhood", &a.neighborhood),
            ("shipping_city", &a.city),
            ("shipping_state", &a.state),
        ];
        required
            .into_iter()
            .find(|(_, v)| v.trim().is_empty())
            .map(|(name, _)| name)
            .or_else(|| self.account.as_ref().and_then(AccountInfo::missing_field))
    }
}

/// What kind of order is being placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckoutKind {
    Single,
    /// A monthly box, shipped on the given day of the month (1 or 15).
    Subscription { shipping_day: i64, grind_type: GrindType },
}

impl CheckoutKind {
    pub fn order_type(&self) -> OrderType {
        match self {
            CheckoutKind::Single => OrderType::Single,
            CheckoutKind::Subscription { .. } => OrderType::Subscription,
        }
    }
}

//--------------------------------------   Payment updates     ---------------------------------------------------------
/// Where a payment status update came from. Both sources go through the same reconciliation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSource {
    Webhook,
    ReturnPage,
}

impl Display for PaymentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentSource::Webhook => f.write_str("webhook"),
            PaymentSource::ReturnPage => f.write_str("return page"),
        }
    }
}

/// A payment status observed from the gateway, already mapped onto the order status vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentUpdate {
    pub order_id: OrderId,
    pub status: OrderStatusType,
    pub payment_id: Option<String>,
    pub collection_id: Option<String>,
    /// The raw gateway status, stored for reference.
    pub collection_status: Option<String>,
    pub payment_method: Option<String>,
}

impl PaymentUpdate {
    pub fn new(order_id: OrderId, status: OrderStatusType) -> Self {
        Self { order_id, status, payment_id: None, collection_id: None, collection_status: None, payment_method: None }
    }

    pub fn with_payment_id<S: Into<String>>(mut self, id: Option<S>) -> Self {
        self.payment_id = id.map(Into::into);
        self
    }

    pub fn with_collection<S: Into<String>>(mut self, id: Option<S>, status: Option<S>) -> Self {
        self.collection_id = id.map(Into::into);
        self.collection_status = status.map(Into::into);
        self
    }

    pub fn with_payment_method<S: Into<String>>(mut self, method: Option<S>) -> Self {
        self.payment_method = method.map(Into::into);
        self
    }
}

/// The result of applying a [`PaymentUpdate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// The order moved to the new status.
    Applied { order: Order },
    /// The order already had this status. Nothing changed.
    AlreadyApplied { order: Order },
    /// The order has moved past the reported status, or is in a status the gateway cannot change.
    Stale { order: Order, requested: OrderStatusType },
    /// No order has this id.
    UnknownOrder { order_id: OrderId },
}

impl ReconcileOutcome {
    pub fn order(&self) -> Option<&Order> {
        match self {
            Self::Applied { order } | Self::AlreadyApplied { order } | Self::Stale { order, .. } => Some(order),
            Self::UnknownOrder { .. } => None,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

//--------------------------------------   Admin updates       ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingUpdate {
    pub carrier_name: Option<String>,
    pub tracking_code: Option<String>,
}

impl ShippingUpdate {
    pub fn is_empty(&self) -> bool {
        self.carrier_name.is_none() && self.tracking_code.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}
