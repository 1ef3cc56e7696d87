use log::*;
use saporino_engine::{
    events::{EventHandlers, EventHooks, OrderPaidEvent, OrderShippedEvent, UnmatchedPaymentEvent},
    status::status_label,
};

pub const STOREFRONT_EVENT_BUFFER_SIZE: usize = 25;

/// Hooks for the storefront events.
///
/// 1. OrderPaidEvent - the order is ready to be roasted and packed.
/// 2. OrderShippedEvent - the customer should be told the tracking code.
/// 3. UnmatchedPaymentEvent - money arrived for an order we don't know about. Someone has to look at it by hand.
///
/// Customer e-mails are not sent from here; these hooks only record what happened.
pub fn create_storefront_event_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(|ev| {
        let OrderPaidEvent { order } = ev;
        Box::pin(async move {
            info!(
                "📬️ {} order {} for {} <{}>: {}. Total {}",
                order.order_type,
                order.id,
                order.customer_name,
                order.customer_email,
                status_label(order.status),
                order.total_amount
            );
        })
    });
    hooks.on_order_shipped(|ev| {
        let OrderShippedEvent { order } = ev;
        Box::pin(async move {
            info!(
                "📬️ Order {} shipped to {}, {} with {}. Tracking code: {}",
                order.id,
                order.shipping_city,
                order.shipping_state,
                order.carrier_name.as_deref().unwrap_or("no carrier"),
                order.tracking_code.as_deref().unwrap_or("none")
            );
        })
    });
    hooks.on_unmatched_payment(|ev| {
        let UnmatchedPaymentEvent { payment_id, external_reference, status } = ev;
        Box::pin(async move {
            error!(
                "📬️ 🚨️ Payment {} ({status}) could not be matched to an order (reference: {}). Check the Mercado Pago \
                 dashboard.",
                payment_id.as_deref().unwrap_or("<unknown>"),
                external_reference.map(|r| r.to_string()).unwrap_or_else(|| "none".to_string())
            );
        })
    });
    EventHandlers::new(STOREFRONT_EVENT_BUFFER_SIZE, hooks)
}
