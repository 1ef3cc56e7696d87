use std::fmt::Debug;

use log::*;

use crate::{
    api::order_objects::{
        CheckoutCustomer,
        CheckoutKind,
        OrderQueryFilter,
        OrderWithItems,
        PaymentSource,
        PaymentUpdate,
        ReconcileOutcome,
        ShippingUpdate,
    },
    cart::Cart,
    db_types::{Centavos, NewOrder, Order, OrderId, OrderStatusType},
    events::{EventProducers, OrderPaidEvent, OrderShippedEvent, UnmatchedPaymentEvent},
    shipping::calculate_freight,
    traits::{GatewayUpdateResult, OrderFlowError, StorefrontDatabase},
};

/// `OrderFlowApi` is the primary API for the order lifecycle: checkout, payment reconciliation and fulfilment.
///
/// Both payment signals (the gateway webhook and the shopper's return page) go through
/// [`OrderFlowApi::reconcile_payment`], which is the only way a gateway can change an order's status.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: StorefrontDatabase
{
    /// Turns a cart into a `pending` order.
    ///
    /// The header and every item line are written in one transaction: either the whole order exists afterwards, or
    /// none of it does. Item names and prices are copied from the cart, so later catalog changes don't affect the
    /// order.
    ///
    /// Subscriptions must carry account details; their freight is worked out from the account type and the shipping
    /// state, and added to the total.
    pub async fn place_order(
        &self,
        cart: &Cart,
        customer: CheckoutCustomer,
        kind: CheckoutKind,
    ) -> Result<Order, OrderFlowError> {
        if let Some(field) = customer.missing_field() {
            return Err(OrderFlowError::Validation(format!("{field} is required")));
        }
        if cart.is_empty() {
            return Err(OrderFlowError::EmptyCart);
        }
        let subtotal = cart.total();
        let (shipping_cost, freight_type, shipping_day, grind_type) = match kind {
            CheckoutKind::Single => (Centavos::from(0), None, None, None),
            CheckoutKind::Subscription { shipping_day, grind_type } => {
                if shipping_day != 1 && shipping_day != 15 {
                    return Err(OrderFlowError::Validation(format!(
                        "shipping_day must be 1 or 15, not {shipping_day}"
                    )));
                }
                let account = customer
                    .account
                    .as_ref()
                    .ok_or_else(|| OrderFlowError::Validation("account_type is required".to_string()))?;
                let freight = calculate_freight(account.kind(), subtotal, &customer.address.state);
                (freight.cost, Some(freight.freight_type.to_string()), Some(shipping_day), Some(grind_type))
            },
        };
        let CheckoutCustomer { name, email, phone, address, account } = customer;
        let order = NewOrder {
            id: OrderId::new_random(),
            customer_name: name.trim().to_string(),
            customer_email: email.trim().to_string(),
            customer_phone: phone.trim().to_string(),
            shipping_postal_code: address.postal_code.trim().to_string(),
            shipping_address: address.street.trim().to_string(),
            shipping_number: address.number.trim().to_string(),
            shipping_complement: address.complement.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            shipping_neighborhood: address.neighborhood.trim().to_string(),
            shipping_city: address.city.trim().to_string(),
            shipping_state: address.state.trim().to_string(),
            account,
            total_amount: subtotal + shipping_cost,
            shipping_cost,
            freight_type,
            order_type: kind.order_type(),
            subscription_shipping_day: shipping_day,
            grind_type,
        };
        let order = self.db.insert_order_with_items(order, cart.to_order_items()).await?;
        info!(
            "🔄️📦️ New {} order {} for {}: {} items, {}",
            order.order_type,
            order.id,
            order.customer_email,
            cart.item_count(),
            order.total_amount
        );
        Ok(order)
    }

    /// Records the gateway preference for a `pending` order.
    pub async fn attach_preference(&self, order_id: &OrderId, preference_id: &str) -> Result<Order, OrderFlowError> {
        let order = self.db.attach_preference(order_id, preference_id).await?;
        debug!("🔄️💳️ Order {order_id} linked to payment preference {preference_id}");
        Ok(order)
    }

    /// Applies a payment status from the gateway.
    ///
    /// Gateway signals only ever move an order forward (see [`OrderStatusType::gateway_sources`]). Late, repeated or
    /// out-of-order signals are reported as [`ReconcileOutcome::AlreadyApplied`] or [`ReconcileOutcome::Stale`] and
    /// change nothing. None of these are errors; only a database failure is.
    ///
    /// The webhook has the final word over the return page: it can confirm or overrule a status the shopper's browser
    /// reported. Only a webhook approval counts as paid, so the order paid hook never fires for the return page.
    pub async fn reconcile_payment(
        &self,
        update: PaymentUpdate,
        source: PaymentSource,
    ) -> Result<ReconcileOutcome, OrderFlowError> {
        let order_id = update.order_id.clone();
        trace!("🔄️💳️ {source} reports order {order_id} as {}", update.status);
        let outcome = match self.db.apply_gateway_update(&update, source).await? {
            GatewayUpdateResult::Updated(order) => {
                info!("🔄️💳️ Order {order_id} is now {} ({source})", order.status);
                if order.status == OrderStatusType::Approved && source == PaymentSource::Webhook {
                    self.call_order_paid_hook(&order).await;
                }
                ReconcileOutcome::Applied { order }
            },
            GatewayUpdateResult::Unchanged(order) => {
                debug!("🔄️💳️ Order {order_id} is already {}. Nothing to do ({source})", order.status);
                ReconcileOutcome::AlreadyApplied { order }
            },
            GatewayUpdateResult::Stale { order, requested } => {
                if source == PaymentSource::Webhook && requested == OrderStatusType::Rejected {
                    warn!(
                        "🔄️💳️ Payment {} for order {order_id} was rejected, but the order is {}. Keeping it.",
                        update.payment_id.as_deref().unwrap_or("<unknown>"),
                        order.status
                    );
                } else {
                    info!("🔄️💳️ Ignoring {requested} from the {source} for order {order_id}, which is {}", order.status);
                }
                ReconcileOutcome::Stale { order, requested }
            },
            GatewayUpdateResult::NotFound => {
                self.report_unmatched_payment(update.payment_id, Some(order_id.clone()), update.status).await;
                ReconcileOutcome::UnknownOrder { order_id }
            },
        };
        Ok(outcome)
    }

    /// Logs a payment that can't be tied to an order and notifies subscribers. This never touches the database.
    pub async fn report_unmatched_payment(
        &self,
        payment_id: Option<String>,
        external_reference: Option<OrderId>,
        status: OrderStatusType,
    ) {
        error!(
            "🔄️💳️ Payment {} ({status}) refers to order {}, which does not exist",
            payment_id.as_deref().unwrap_or("<unknown>"),
            external_reference.as_ref().map(|r| r.as_str()).unwrap_or("<none>")
        );
        for emitter in &self.producers.unmatched_payment_producer {
            let event = UnmatchedPaymentEvent::new(payment_id.clone(), external_reference.clone(), status);
            emitter.publish_event(event).await;
        }
    }

    /// Admin override. Any status can be set from any status.
    pub async fn modify_status_for_order(
        &self,
        order_id: &OrderId,
        status: OrderStatusType,
    ) -> Result<Order, OrderFlowError> {
        let order = self.db.set_order_status(order_id, status).await?;
        if status == OrderStatusType::Shipped {
            for emitter in &self.producers.order_shipped_producer {
                emitter.publish_event(OrderShippedEvent::new(order.clone())).await;
            }
        }
        info!("🔄️🛠️ Order {order_id} manually set to {status}");
        Ok(order)
    }

    pub async fn update_shipping(&self, order_id: &OrderId, update: ShippingUpdate) -> Result<Order, OrderFlowError> {
        let order = self.db.update_shipping(order_id, update).await?;
        debug!("🔄️🛠️ Shipping details updated for order {order_id}");
        Ok(order)
    }

    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderFlowError> {
        self.db.fetch_order_by_id(order_id).await
    }

    pub async fn fetch_order_with_items(&self, order_id: &OrderId) -> Result<Option<OrderWithItems>, OrderFlowError> {
        let Some(order) = self.db.fetch_order_by_id(order_id).await? else {
            return Ok(None);
        };
        let items = self.db.fetch_order_items(order_id).await?;
        Ok(Some(OrderWithItems { order, items }))
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        trace!("🔄️ Searching orders. {query}");
        self.db.search_orders(query).await
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🔄️📦️ Notifying order paid hook subscribers");
            emitter.publish_event(OrderPaidEvent::new(order.clone())).await;
        }
    }
}
