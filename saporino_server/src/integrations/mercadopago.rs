//! The storefront's side of the Mercado Pago integration: which requests it sends, and how it reads what comes back.
use std::{fmt::Display, str::FromStr};

use log::*;
use mercadopago_tools::{
    BackUrls,
    MercadoPagoApi,
    MercadoPagoApiError,
    Payer,
    PaymentDetails,
    PaymentStatus,
    Phone,
    Preference,
    PreferenceItem,
    PreferenceRequest,
};
use saporino_common::BRL_CURRENCY_CODE;
use saporino_engine::{
    db_types::{Order, OrderId, OrderItem, OrderStatusType, OrderType},
    order_objects::PaymentUpdate,
};

/// Title of the extra preference line that charges for freight.
pub const FREIGHT_ITEM_TITLE: &str = "Frete";
pub const SUBSCRIPTION_TITLE_SUFFIX: &str = " - Assinatura Mensal";

/// The calls the storefront makes to its payment gateway.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// The key the browser uses to render the checkout. It is not a secret.
    fn public_key(&self) -> String;

    async fn create_preference(&self, request: &PreferenceRequest) -> Result<Preference, MercadoPagoApiError>;

    /// Reads the current state of a payment from the gateway itself.
    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentDetails, MercadoPagoApiError>;
}

impl PaymentGateway for MercadoPagoApi {
    fn public_key(&self) -> String {
        self.config().public_key.clone()
    }

    async fn create_preference(&self, request: &PreferenceRequest) -> Result<Preference, MercadoPagoApiError> {
        MercadoPagoApi::create_preference(self, request).await
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentDetails, MercadoPagoApiError> {
        self.get_payment(payment_id).await
    }
}

/// Maps the gateway's payment status onto the order status vocabulary.
///
/// Statuses that say nothing about the outcome yet (`pending`, `authorized`, anything unrecognised) map to
/// `pending`, which a gateway signal can never write.
pub fn map_payment_status(status: &PaymentStatus) -> OrderStatusType {
    match status {
        PaymentStatus::Approved => OrderStatusType::Approved,
        PaymentStatus::Rejected | PaymentStatus::Cancelled => OrderStatusType::Rejected,
        PaymentStatus::InProcess | PaymentStatus::InMediation => OrderStatusType::InProcess,
        PaymentStatus::Refunded | PaymentStatus::ChargedBack => OrderStatusType::Refunded,
        PaymentStatus::Pending | PaymentStatus::Authorized => OrderStatusType::Pending,
        PaymentStatus::Other(s) => {
            warn!("💳️ Unrecognised payment status '{s}'. Treating it as pending.");
            OrderStatusType::Pending
        },
    }
}

/// Builds the update for `order_id` from a payment fetched from the gateway.
pub fn payment_update_from_details(order_id: OrderId, payment: &PaymentDetails) -> PaymentUpdate {
    PaymentUpdate::new(order_id, map_payment_status(&payment.status))
        .with_payment_id(Some(payment.id.as_str()))
        .with_collection(payment.collection_id.clone(), Some(payment.status.to_string()))
        .with_payment_method(payment.payment_method_id.clone())
}

/// Builds the Checkout Pro preference for an order from its stored items. Freight, when charged, is an extra line.
pub fn preference_for_order(order: &Order, items: &[OrderItem], back_urls: BackUrls) -> PreferenceRequest {
    let suffix = match order.order_type {
        OrderType::Subscription => SUBSCRIPTION_TITLE_SUFFIX,
        OrderType::Single => "",
    };
    let mut lines = items
        .iter()
        .map(|item| PreferenceItem {
            title: format!("{}{suffix}", item.product_name),
            quantity: item.quantity,
            unit_price: item.unit_price.to_decimal(),
            currency_id: BRL_CURRENCY_CODE.to_string(),
        })
        .collect::<Vec<_>>();
    if order.shipping_cost.value() > 0 {
        lines.push(PreferenceItem {
            title: FREIGHT_ITEM_TITLE.to_string(),
            quantity: 1,
            unit_price: order.shipping_cost.to_decimal(),
            currency_id: BRL_CURRENCY_CODE.to_string(),
        });
    }
    let phone = Some(order.customer_phone.trim()).filter(|p| !p.is_empty()).map(|p| Phone { number: p.to_string() });
    PreferenceRequest {
        items: lines,
        back_urls,
        auto_return: Some("approved".to_string()),
        payer: Some(Payer { name: order.customer_name.clone(), email: order.customer_email.clone(), phone }),
        external_reference: Some(order.id.as_str().to_string()),
    }
}

/// The three pages the gateway sends the shopper back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnPage {
    Success,
    Failure,
    Pending,
}

impl ReturnPage {
    /// The status to record when the gateway did not say which status the payment has.
    pub fn default_status(&self) -> Option<OrderStatusType> {
        match self {
            ReturnPage::Success => Some(OrderStatusType::Approved),
            ReturnPage::Pending => Some(OrderStatusType::InProcess),
            ReturnPage::Failure => None,
        }
    }

    /// The status to record for this visit: the mapped `collection_status` if there is one, otherwise the page's
    /// default.
    pub fn status_for(&self, collection_status: Option<&str>) -> Option<OrderStatusType> {
        match collection_status {
            Some(s) => Some(map_payment_status(&PaymentStatus::from(s))),
            None => self.default_status(),
        }
    }
}

impl FromStr for ReturnPage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            "pending" => Ok(Self::Pending),
            s => Err(format!("Unknown payment return page: {s}")),
        }
    }
}

impl Display for ReturnPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReturnPage::Success => f.write_str("success"),
            ReturnPage::Failure => f.write_str("failure"),
            ReturnPage::Pending => f.write_str("pending"),
        }
    }
}
