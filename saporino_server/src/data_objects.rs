use std::fmt::Display;

use chrono::{DateTime, Utc};
use saporino_engine::{
    db_types::{AccountInfo, Centavos, GrindType, Order, OrderId, OrderStatusType, OrderType},
    order_objects::{CheckoutCustomer, OrderQueryFilter, ShippingAddress},
};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

//--------------------------------------       Checkout        ---------------------------------------------------------

/// Contact, shipping and (optionally) account details, as the storefront form submits them.
///
/// Every field defaults to empty so that a missing field is reported by name, rather than as a parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerDetails {
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
    /// `PF` or `PJ`
    pub account_type: Option<String>,
    pub cpf: Option<String>,
    pub birth_date: Option<String>,
    pub cnpj: Option<String>,
    pub inscricao_estadual: Option<String>,
    pub email_xml: Option<String>,
}

impl CustomerDetails {
    pub fn account_info(&self) -> Result<Option<AccountInfo>, ServerError> {
        let field = |v: &Option<String>| v.clone().unwrap_or_default();
        match self.account_type.as_deref().map(|s| s.trim().to_ascii_uppercase()) {
            None => Ok(None),
            Some(t) if t.is_empty() => Ok(None),
            Some(t) if t == "PF" => {
                Ok(Some(AccountInfo::Personal { cpf: field(&self.cpf), birth_date: field(&self.birth_date) }))
            },
            Some(t) if t == "PJ" => Ok(Some(AccountInfo::Business {
                cnpj: field(&self.cnpj),
                inscricao_estadual: field(&self.inscricao_estadual),
                email_xml: field(&self.email_xml),
            })),
            Some(t) => Err(ServerError::InvalidRequestBody(format!("account_type must be PF or PJ, not {t}"))),
        }
    }
}

impl TryFrom<CustomerDetails> for CheckoutCustomer {
    type Error = ServerError;

    fn try_from(details: CustomerDetails) -> Result<Self, Self::Error> {
        let account = details.account_info()?;
        Ok(CheckoutCustomer {
            name: details.customer_name,
            email: details.customer_email,
            phone: details.customer_phone,
            address: ShippingAddress {
                postal_code: details.shipping_postal_code,
                street: details.shipping_address,
                number: details.shipping_number,
                complement: details.shipping_complement,
                neighborhood: details.shipping_neighborhood,
                city: details.shipping_city,
                state: details.shipping_state,
            },
            account,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CartLineRequest {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutRequest {
    #[serde(flatten)]
    pub customer: CustomerDetails,
    #[serde(default)]
    pub items: Vec<CartLineRequest>,
}

impl CheckoutRequest {
    pub fn cart_lines(&self) -> Vec<(i64, i64)> {
        self.items.iter().map(|l| (l.product_id, l.quantity)).collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionCheckoutRequest {
    #[serde(flatten)]
    pub customer: CustomerDetails,
    #[serde(default)]
    pub selected_products: Vec<i64>,
    #[serde(default)]
    pub grind_type: Option<GrindType>,
    #[serde(default)]
    pub shipping_day: Option<i64>,
}

impl SubscriptionCheckoutRequest {
    /// The selected coffees, each once, in the order they were picked.
    pub fn unique_products(&self) -> Vec<i64> {
        let mut ids = Vec::with_capacity(self.selected_products.len());
        for id in &self.selected_products {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }
}

/// Everything the browser needs to open the checkout for an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    pub preference_id: String,
    pub init_point: Option<String>,
    pub sandbox_init_point: Option<String>,
    pub public_key: String,
    pub total_amount: Centavos,
    pub shipping_cost: Centavos,
    pub freight_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    pub public_key: String,
}

//--------------------------------------   Payment signals     ---------------------------------------------------------

/// Query parameters the gateway appends to the return URLs. Absent values are sometimes sent as the string `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentReturnQuery {
    pub external_reference: Option<String>,
    pub payment_id: Option<String>,
    pub collection_id: Option<String>,
    pub collection_status: Option<String>,
    pub payment_type: Option<String>,
}

impl PaymentReturnQuery {
    pub fn cleaned(self) -> Self {
        fn clean(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty() && s != "null")
        }
        Self {
            external_reference: clean(self.external_reference),
            payment_id: clean(self.payment_id),
            collection_id: clean(self.collection_id),
            collection_status: clean(self.collection_status),
            payment_type: clean(self.payment_type),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReturnResponse {
    /// `success`, `failure` or `pending`: which return page the shopper landed on.
    pub outcome: String,
    pub order_id: Option<OrderId>,
    /// True if this visit changed the order's status.
    pub reconciled: bool,
    pub status: Option<OrderStatusType>,
    pub status_label: Option<String>,
}

/// Webhook notifications may identify the payment in the query string instead of (or as well as) the body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub topic: Option<String>,
    #[serde(rename = "data.id")]
    pub data_id: Option<String>,
    pub id: Option<String>,
}

//--------------------------------------        Admin          ---------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminOrderQuery {
    /// Comma-separated list of statuses
    pub status: Option<String>,
    pub customer_email: Option<String>,
    pub order_type: Option<OrderType>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TryFrom<AdminOrderQuery> for OrderQueryFilter {
    type Error = ServerError;

    fn try_from(query: AdminOrderQuery) -> Result<Self, Self::Error> {
        let mut filter = OrderQueryFilter::default();
        if let Some(statuses) = query.status {
            for s in statuses.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let status = s.parse::<OrderStatusType>().map_err(|e| ServerError::InvalidRequestPath(e.to_string()))?;
                filter = filter.with_status(status);
            }
        }
        if let Some(email) = query.customer_email {
            filter = filter.with_customer_email(email);
        }
        if let Some(order_type) = query.order_type {
            filter = filter.with_order_type(order_type);
        }
        if let Some(since) = query.since {
            filter = filter.since(since);
        }
        if let Some(until) = query.until {
            filter = filter.until(until);
        }
        Ok(filter)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusParams {
    pub status: OrderStatusType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePriceParams {
    /// Reais, e.g. `"39,90"`
    pub price: String,
}

/// An order as shown on the admin screens: the stored order plus its Portuguese status label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminOrderSummary {
    #[serde(flatten)]
    pub order: Order,
    pub status_label: String,
}
