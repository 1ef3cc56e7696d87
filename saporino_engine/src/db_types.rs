use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use saporino_common::Centavos;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// The lifecycle status of an order. See [`crate::status`] for the transition rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// The order has been created and is waiting for the shopper to pay.
    #[default]
    Pending,
    /// The gateway has approved the payment.
    #[serde(alias = "paid")]
    Approved,
    /// The gateway is still processing the payment (e.g. bank slip, manual review, mediation).
    InProcess,
    /// The gateway rejected or cancelled the payment.
    Rejected,
    /// The payment was refunded or charged back.
    Refunded,
    /// The order has left the roastery.
    Shipped,
    /// The order has reached the customer.
    Delivered,
    /// The order was cancelled by the store.
    Cancelled,
}

impl OrderStatusType {
    pub const ALL: [OrderStatusType; 8] = [
        Self::Pending,
        Self::Approved,
        Self::InProcess,
        Self::Rejected,
        Self::Refunded,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::InProcess => "in_process",
            Self::Rejected => "rejected",
            Self::Refunded => "refunded",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            // Rows written before the status vocabulary settled use 'paid'
            "approved" | "paid" => Ok(Self::Approved),
            "in_process" => Ok(Self::InProcess),
            "rejected" => Ok(Self::Rejected),
            "refunded" => Ok(Self::Refunded),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl TryFrom<String> for OrderStatusType {
    type Error = ConversionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

//--------------------------------------       OrderType       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    #[default]
    Single,
    Subscription,
}

impl Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Single => f.write_str("single"),
            OrderType::Subscription => f.write_str("subscription"),
        }
    }
}

//--------------------------------------       GrindType       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GrindType {
    /// Whole beans
    Beans,
    /// Medium grind, for filter coffee
    Coado,
    /// Fine grind
    Espresso,
}

impl Display for GrindType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrindType::Beans => f.write_str("beans"),
            GrindType::Coado => f.write_str("coado"),
            GrindType::Espresso => f.write_str("espresso"),
        }
    }
}

impl FromStr for GrindType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beans" => Ok(Self::Beans),
            "coado" => Ok(Self::Coado),
            "espresso" => Ok(Self::Espresso),
            s => Err(ConversionError(format!("Invalid grind type: {s}"))),
        }
    }
}

//--------------------------------------      AccountInfo      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum AccountKind {
    /// Pessoa física
    PF,
    /// Pessoa jurídica
    PJ,
}

/// Who is buying. Individuals and companies carry different mandatory documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "account_type")]
pub enum AccountInfo {
    #[serde(rename = "PF")]
    Personal { cpf: String, birth_date: String },
    #[serde(rename = "PJ")]
    Business { cnpj: String, inscricao_estadual: String, email_xml: String },
}

impl AccountInfo {
    pub fn kind(&self) -> AccountKind {
        match self {
            AccountInfo::Personal { .. } => AccountKind::PF,
            AccountInfo::Business { .. } => AccountKind::PJ,
        }
    }

    /// Returns the name of the first required document field that is blank, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        let fields: Vec<(&'static str, &str)> = match self {
            AccountInfo::Personal { cpf, birth_date } => vec![("cpf", cpf), ("birth_date", birth_date)],
            AccountInfo::Business { cnpj, inscricao_estadual, email_xml } => {
                vec![("cnpj", cnpj), ("inscricao_estadual", inscricao_estadual), ("email_xml", email_xml)]
            },
        };
        fields.into_iter().find(|(_, v)| v.trim().is_empty()).map(|(name, _)| name)
    }
}

//--------------------------------------        OrderId        ---------------------------------------------------------
/// The storefront order id. It doubles as the gateway's `external_reference`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            Err(ConversionError("Order id cannot be empty".to_string()))
        } else {
            Ok(Self(s.to_string()))
        }
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_postal_code: String,
    pub shipping_address: String,
    pub shipping_number: String,
    pub shipping_complement: Option<String>,
    pub shipping_neighborhood: String,
    pub shipping_city: String,
    pub shipping_state: String,
    pub account_type: Option<AccountKind>,
    pub cpf: Option<String>,
    pub birth_date: Option<String>,
    pub cnpj: Option<String>,
    pub inscricao_estadual: Option<String>,
    pub email_xml: Option<String>,
    pub total_amount: Centavos,
    pub shipping_cost: Centavos,
    pub freight_type: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: OrderStatusType,
    /// The current status came from the webhook or an admin, not from the shopper's return page.
    pub status_confirmed: bool,
    pub order_type: OrderType,
    pub subscription_shipping_day: Option<i64>,
    pub grind_type: Option<GrindType>,
    pub mercadopago_preference_id: Option<String>,
    pub mercadopago_payment_id: Option<String>,
    pub mercadopago_collection_id: Option<String>,
    pub mercadopago_collection_status: Option<String>,
    pub payment_method: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub tracking_code: Option<String>,
    pub carrier_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Reassembles the tagged account details from the flat columns. `None` when the order carries no account type,
    /// or when the stored columns do not match it.
    pub fn account_info(&self) -> Option<AccountInfo> {
        match self.account_type? {
            AccountKind::PF => Some(AccountInfo::Personal {
                cpf: self.cpf.clone()?,
                birth_date: self.birth_date.clone().unwrap_or_default(),
            }),
            AccountKind::PJ => Some(AccountInfo::Business {
                cnpj: self.cnpj.clone()?,
                inscricao_estadual: self.inscricao_estadual.clone().unwrap_or_default(),
                email_xml: self.email_xml.clone().unwrap_or_default(),
            }),
        }
    }

    /// The amount charged for the goods, excluding freight.
    pub fn items_total(&self) -> Centavos {
        self.total_amount - self.shipping_cost
    }
}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Order {} ({}) for {} <{}>: {} [{}]",
            self.id, self.order_type, self.customer_name, self.customer_email, self.total_amount, self.status
        )
    }
}

//--------------------------------------       OrderItem       ---------------------------------------------------------
/// A line of an order. Name and price are snapshots taken when the order was placed; rows are never updated.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Centavos,
    pub subtotal: Centavos,
    pub grind_type: Option<GrindType>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub id: OrderId,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_postal_code: String,
    pub shipping_address: String,
    pub shipping_number: String,
    pub shipping_complement: Option<String>,
    pub shipping_neighborhood: String,
    pub shipping_city: String,
    pub shipping_state: String,
    pub account: Option<AccountInfo>,
    pub total_amount: Centavos,
    pub shipping_cost: Centavos,
    pub freight_type: Option<String>,
    pub order_type: OrderType,
    pub subscription_shipping_day: Option<i64>,
    pub grind_type: Option<GrindType>,
}

//--------------------------------------     NewOrderItem      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Centavos,
    pub subtotal: Centavos,
    pub grind_type: Option<GrindType>,
}

impl NewOrderItem {
    /// Snapshots a line. The subtotal is computed here, once, and stored as-is.
    pub fn new(product_id: i64, product_name: String, quantity: i64, unit_price: Centavos) -> Self {
        Self { product_id, product_name, quantity, unit_price, subtotal: unit_price * quantity, grind_type: None }
    }

    pub fn with_grind_type(mut self, grind_type: Option<GrindType>) -> Self {
        self.grind_type = grind_type;
        self
    }
}

//--------------------------------------        Product        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Centavos,
    pub category: String,
    pub weight_grams: i64,
    pub stock: i64,
    pub featured: bool,
    pub active: bool,
    pub display_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Centavos,
    pub category: String,
    pub weight_grams: i64,
    pub stock: i64,
    pub featured: bool,
    pub active: bool,
    pub display_order: i64,
}

impl NewProduct {
    pub fn new<S: Into<String>>(name: S, price: Centavos) -> Self {
        Self {
            name: name.into(),
            description: String::default(),
            price,
            category: "cafe".to_string(),
            weight_grams: 250,
            stock: 0,
            featured: false,
            active: true,
            display_order: 0,
        }
    }

    pub fn featured(mut self) -> Self {
        self.featured = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}
