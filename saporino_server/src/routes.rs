//! Request handler definitions
//!
//! Each route is declared with the [`route!`] macro next to its handler. Handlers that are more than a few lines
//! delegate to the engine APIs; keep the HTTP concerns (extracting, mapping errors, shaping responses) here.
//!
//! Every handler that touches the database or the gateway awaits it. Never block a worker thread in a handler: each
//! worker processes its requests sequentially, so a blocking call stalls every request queued behind it.
//!
//! Route groups:
//! * Storefront: `/products`, `/products/{product_id}`, `/checkout`, `/subscriptions/checkout`, `/checkout/{order_id}/preference`,
//!   `/checkout/config`, `/address/{cep}`
//! * Payment signals: `/mercadopago/webhook` and the shopper's return pages, `/payment/{success|failure|pending}`
//! * Admin (bearer token): `/admin/orders`, `/admin/orders/{order_id}`, `/admin/orders/{order_id}/status`,
//!   `/admin/orders/{order_id}/shipping`, `/admin/products/{product_id}/price`
use std::str::FromStr;

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use mercadopago_tools::{BackUrls, WebhookNotification};
use saporino_engine::{
    db_types::{Centavos, OrderId, OrderStatusType},
    order_objects::{
        CheckoutCustomer,
        CheckoutKind,
        OrderQueryFilter,
        OrderWithItems,
        PaymentSource,
        PaymentUpdate,
        ReconcileOutcome,
        ShippingUpdate,
    },
    status::status_label,
    traits::{CatalogManagement, OrderFlowError, StorefrontDatabase},
    CatalogApi,
    OrderFlowApi,
};

use crate::{
    config::ServerOptions,
    data_objects::{
        AdminOrderQuery,
        AdminOrderSummary,
        CheckoutConfig,
        CheckoutRequest,
        CheckoutResponse,
        JsonResponse,
        PaymentReturnQuery,
        PaymentReturnResponse,
        SubscriptionCheckoutRequest,
        UpdatePriceParams,
        UpdateStatusParams,
        WebhookQuery,
    },
    errors::ServerError,
    helpers::{get_remote_ip, normalize_cep},
    integrations::{
        mercadopago::{
            map_payment_status,
            payment_update_from_details,
            preference_for_order,
            PaymentGateway,
            ReturnPage,
        },
        viacep::AddressLookup,
    },
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro.
// Each bound becomes one type parameter of the route, in order, e.g. `CheckoutRoute<TStorefrontDatabase, ...>`.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Catalog  ----------------------------------------------------
route!(products => Get "/products" impl CatalogManagement);
pub async fn products<B: CatalogManagement>(api: web::Data<CatalogApi<B>>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET products");
    let products = api.products().await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(product_by_id => Get "/products/{product_id}" impl CatalogManagement);
pub async fn product_by_id<B: CatalogManagement>(
    path: web::Path<i64>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    trace!("💻️ GET product #{product_id}");
    let product = api
        .product_by_id(product_id)
        .await?
        .filter(|p| p.active)
        .ok_or_else(|| ServerError::NoRecordFound(format!("Product {product_id} does not exist")))?;
    Ok(HttpResponse::Ok().json(product))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/checkout" impl StorefrontDatabase, CatalogManagement, PaymentGateway);
/// Places a single order and opens a payment preference for it.
///
/// Prices come from the catalog; the request only names products and quantities. The order is stored as `pending`
/// before the gateway is called, so if the gateway is down the response (503) carries the order id, and the client
/// can retry with `POST /checkout/{order_id}/preference`.
pub async fn checkout<BOrder, BCatalog, G>(
    body: web::Json<CheckoutRequest>,
    orders: web::Data<OrderFlowApi<BOrder>>,
    catalog: web::Data<CatalogApi<BCatalog>>,
    gateway: web::Data<G>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    BOrder: StorefrontDatabase,
    BCatalog: CatalogManagement,
    G: PaymentGateway,
{
    let request = body.into_inner();
    trace!("💻️ Checkout request with {} lines", request.items.len());
    let lines = request.cart_lines();
    let customer = CheckoutCustomer::try_from(request.customer)?;
    validate_customer(&customer)?;
    let cart = catalog.price_cart(&lines).await?;
    let order = orders.place_order(&cart, customer, CheckoutKind::Single).await?;
    let response = open_payment_preference(&order.id, orders.as_ref(), gateway.as_ref(), &options).await?;
    Ok(HttpResponse::Ok().json(response))
}

route!(subscription_checkout => Post "/subscriptions/checkout" impl StorefrontDatabase, CatalogManagement, PaymentGateway);
/// Places a monthly subscription box: one of each selected coffee at the flat subscription price, plus freight.
pub async fn subscription_checkout<BOrder, BCatalog, G>(
    body: web::Json<SubscriptionCheckoutRequest>,
    orders: web::Data<OrderFlowApi<BOrder>>,
    catalog: web::Data<CatalogApi<BCatalog>>,
    gateway: web::Data<G>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    BOrder: StorefrontDatabase,
    BCatalog: CatalogManagement,
    G: PaymentGateway,
{
    let request = body.into_inner();
    let products = request.unique_products();
    trace!("💻️ Subscription checkout request for {} coffees", products.len());
    if products.is_empty() {
        return Err(ServerError::InvalidRequestBody("selected_products is required".into()));
    }
    let grind_type =
        request.grind_type.ok_or_else(|| ServerError::InvalidRequestBody("grind_type is required".into()))?;
    let shipping_day =
        request.shipping_day.ok_or_else(|| ServerError::InvalidRequestBody("shipping_day is required".into()))?;
    let customer = CheckoutCustomer::try_from(request.customer)?;
    validate_customer(&customer)?;
    if customer.account.is_none() {
        return Err(ServerError::InvalidRequestBody("account_type is required".into()));
    }
    let cart = catalog.subscription_cart(&products, grind_type).await?;
    let kind = CheckoutKind::Subscription { shipping_day, grind_type };
    let order = orders.place_order(&cart, customer, kind).await?;
    let response = open_payment_preference(&order.id, orders.as_ref(), gateway.as_ref(), &options).await?;
    Ok(HttpResponse::Ok().json(response))
}

route!(retry_preference => Post "/checkout/{order_id}/preference" impl StorefrontDatabase, PaymentGateway);
/// Opens a new payment preference for an order that is still `pending`, e.g. after the gateway was unavailable.
pub async fn retry_preference<B, G>(
    path: web::Path<String>,
    orders: web::Data<OrderFlowApi<B>>,
    gateway: web::Data<G>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontDatabase,
    G: PaymentGateway,
{
    let order_id = parse_order_id(&path)?;
    info!("💻️ Retrying payment preference for order {order_id}");
    let response = open_payment_preference(&order_id, orders.as_ref(), gateway.as_ref(), &options).await?;
    Ok(HttpResponse::Ok().json(response))
}

route!(checkout_config => Get "/checkout/config" impl PaymentGateway);
pub async fn checkout_config<G: PaymentGateway>(gateway: web::Data<G>) -> HttpResponse {
    HttpResponse::Ok().json(CheckoutConfig { public_key: gateway.public_key() })
}

/// Sends a pending order to the gateway and records the preference it gets back.
async fn open_payment_preference<B, G>(
    order_id: &OrderId,
    orders: &OrderFlowApi<B>,
    gateway: &G,
    options: &ServerOptions,
) -> Result<CheckoutResponse, ServerError>
where
    B: StorefrontDatabase,
    G: PaymentGateway,
{
    let OrderWithItems { order, items } = orders
        .fetch_order_with_items(order_id)
        .await?
        .ok_or_else(|| ServerError::from(OrderFlowError::OrderNotFound(order_id.clone())))?;
    if order.status != OrderStatusType::Pending {
        return Err(OrderFlowError::OrderNotPending(order.id, order.status).into());
    }
    let request = preference_for_order(&order, &items, BackUrls::for_origin(&options.site_url));
    let preference = gateway.create_preference(&request).await.map_err(|e| {
        if e.is_retryable() {
            warn!("💻️ Payment gateway is unavailable for order {order_id}. The order stays pending. {e}");
            ServerError::PaymentGatewayUnavailable(order_id.clone(), e.to_string())
        } else {
            error!("💻️ Payment gateway refused the preference for order {order_id}. {e}");
            ServerError::PaymentGatewayRejected(order_id.clone(), e.to_string())
        }
    })?;
    let order = orders.attach_preference(order_id, &preference.id).await?;
    Ok(CheckoutResponse {
        order_id: order.id,
        preference_id: preference.id,
        init_point: preference.init_point,
        sandbox_init_point: preference.sandbox_init_point,
        public_key: gateway.public_key(),
        total_amount: order.total_amount,
        shipping_cost: order.shipping_cost,
        freight_type: order.freight_type,
    })
}

fn validate_customer(customer: &CheckoutCustomer) -> Result<(), ServerError> {
    match customer.missing_field() {
        Some(field) => Err(ServerError::InvalidRequestBody(format!("{field} is required"))),
        None => Ok(()),
    }
}

fn parse_order_id(s: &str) -> Result<OrderId, ServerError> {
    OrderId::from_str(s).map_err(|e| ServerError::InvalidRequestPath(e.to_string()))
}

//----------------------------------------------   Address  ----------------------------------------------------
route!(address_lookup => Get "/address/{cep}" impl AddressLookup);
pub async fn address_lookup<L: AddressLookup>(
    path: web::Path<String>,
    lookup: web::Data<L>,
) -> Result<HttpResponse, ServerError> {
    let cep = normalize_cep(&path)
        .ok_or_else(|| ServerError::InvalidRequestPath(format!("{} is not a valid postal code", path.as_str())))?;
    match lookup.lookup(&cep).await {
        Ok(Some(address)) => Ok(HttpResponse::Ok().json(address)),
        Ok(None) => Err(ServerError::NoRecordFound(format!("Postal code {cep} does not exist"))),
        Err(e) => {
            warn!("💻️ Postal code lookup for {cep} failed. {e}");
            Err(ServerError::UpstreamError(e.to_string()))
        },
    }
}

//------------------------------------------   Payment signals  ---------------------------------------------
route!(mercadopago_webhook => Post "/webhook" impl StorefrontDatabase, PaymentGateway);
/// Webhook for payment notifications.
///
/// The notification only says *which* payment changed. The payment itself is always re-read from the gateway, and
/// its `external_reference` names the order. Anything that is not a payment notification is acknowledged and
/// ignored. The gateway retries on any non-2xx response, so a 500 is only returned when retrying could help: the
/// gateway read failed in a retryable way, or the database failed. A payment the gateway will never return (unknown
/// id, bad request) is logged and acknowledged as ignored.
pub async fn mercadopago_webhook<B, G>(
    req: HttpRequest,
    query: Option<web::Query<WebhookQuery>>,
    body: web::Bytes,
    api: web::Data<OrderFlowApi<B>>,
    gateway: web::Data<G>,
    options: web::Data<ServerOptions>,
) -> HttpResponse
where
    B: StorefrontDatabase,
    G: PaymentGateway,
{
    let peer = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded);
    trace!("💻️ Received payment webhook from {peer:?}");
    let query = query.map(web::Query::into_inner).unwrap_or_default();
    let notification = serde_json::from_slice::<WebhookNotification>(&body).unwrap_or_else(|e| {
        debug!("💻️ Webhook body is not a notification. {e}");
        WebhookNotification::default()
    });
    let kind = notification.kind.clone().or(query.kind).or(query.topic);
    if kind.as_deref() != Some("payment") {
        debug!("💻️ Ignoring {} webhook notification", kind.as_deref().unwrap_or("untyped"));
        return HttpResponse::Ok().json(JsonResponse::success("ignored"));
    }
    let Some(payment_id) = notification.payment_id().map(str::to_string).or(query.data_id).or(query.id) else {
        warn!("💻️ Payment notification without a payment id. Ignoring it.");
        return HttpResponse::Ok().json(JsonResponse::success("ignored"));
    };
    let payment = match gateway.fetch_payment(&payment_id).await {
        Ok(p) => p,
        Err(e) if e.is_retryable() => {
            warn!("💻️ Could not fetch payment {payment_id} from the gateway. {e}");
            return HttpResponse::InternalServerError().json(JsonResponse::failure("Could not fetch payment."));
        },
        Err(e) => {
            error!("💻️ The gateway refused to return payment {payment_id}. Asking it to retry won't help. {e}");
            return HttpResponse::Ok().json(JsonResponse::success("ignored"));
        },
    };
    let Some(reference) = payment.external_reference.as_deref().filter(|r| !r.trim().is_empty()) else {
        let status = map_payment_status(&payment.status);
        api.report_unmatched_payment(Some(payment.id.clone()), None, status).await;
        return HttpResponse::Ok().json(JsonResponse::success("unmatched"));
    };
    let update = payment_update_from_details(OrderId::from(reference.trim()), &payment);
    match api.reconcile_payment(update, PaymentSource::Webhook).await {
        Ok(outcome) => {
            debug!("💻️ Payment {payment_id} reconciled: {}", outcome_name(&outcome));
            HttpResponse::Ok().json(JsonResponse::success(outcome_name(&outcome)))
        },
        Err(e) => {
            warn!("💻️ Could not reconcile payment {payment_id}. {e}");
            HttpResponse::InternalServerError().json(JsonResponse::failure("Could not record payment."))
        },
    }
}

route!(payment_return => Get "/payment/{page}" impl StorefrontDatabase);
/// The page the gateway sends the shopper back to.
///
/// The status implied by the page (or the `collection_status` it was given) goes through the same reconciliation as
/// the webhook, so it can only move the order forward. Its writes stay unconfirmed until the webhook agrees, and never
/// count as paid. The page always renders: a failed or stale update is reported
/// with `reconciled: false`, never as an error.
pub async fn payment_return<B: StorefrontDatabase>(
    path: web::Path<String>,
    query: Option<web::Query<PaymentReturnQuery>>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let page = ReturnPage::from_str(&path).map_err(ServerError::NoRecordFound)?;
    let query = query.map(web::Query::into_inner).unwrap_or_default().cleaned();
    let order_id = query.external_reference.as_deref().map(OrderId::from);
    let mut response = PaymentReturnResponse {
        outcome: page.to_string(),
        order_id: order_id.clone(),
        reconciled: false,
        status: None,
        status_label: None,
    };
    let Some(order_id) = order_id else {
        debug!("💻️ Shopper returned to the {page} page without an order reference");
        return Ok(HttpResponse::Ok().json(response));
    };
    let result = match page.status_for(query.collection_status.as_deref()) {
        Some(status) => {
            let update = PaymentUpdate::new(order_id.clone(), status)
                .with_payment_id(query.payment_id)
                .with_collection(query.collection_id, query.collection_status)
                .with_payment_method(query.payment_type);
            api.reconcile_payment(update, PaymentSource::ReturnPage).await.map(|outcome| {
                response.reconciled = outcome.is_applied();
                outcome.order().map(|o| o.status)
            })
        },
        None => api.fetch_order(&order_id).await.map(|o| o.map(|o| o.status)),
    };
    match result {
        Ok(status) => {
            response.status = status;
            response.status_label = status.map(|s| status_label(s).to_string());
        },
        Err(e) => warn!("💻️ Could not record the {page} return for order {order_id}. {e}"),
    }
    Ok(HttpResponse::Ok().json(response))
}

fn outcome_name(outcome: &ReconcileOutcome) -> &'static str {
    match outcome {
        ReconcileOutcome::Applied { .. } => "applied",
        ReconcileOutcome::AlreadyApplied { .. } => "already_applied",
        ReconcileOutcome::Stale { .. } => "stale",
        ReconcileOutcome::UnknownOrder { .. } => "unknown_order",
    }
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(orders_search => Get "/orders" impl StorefrontDatabase);
pub async fn orders_search<B: StorefrontDatabase>(
    query: web::Query<AdminOrderQuery>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let filter = OrderQueryFilter::try_from(query.into_inner())?;
    debug!("💻️ GET orders search. {filter}");
    let orders = api.search_orders(filter).await?;
    let orders = orders
        .into_iter()
        .map(|order| AdminOrderSummary { status_label: status_label(order.status).to_string(), order })
        .collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{order_id}" impl StorefrontDatabase);
pub async fn order_by_id<B: StorefrontDatabase>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = parse_order_id(&path)?;
    debug!("💻️ GET order {order_id}");
    let order = api
        .fetch_order_with_items(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} does not exist")))?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order_status => Post "/orders/{order_id}/status" impl StorefrontDatabase);
/// Sets an order's status. Staff may move an order to any status; the gateway rules don't apply here.
pub async fn update_order_status<B: StorefrontDatabase>(
    path: web::Path<String>,
    body: web::Json<UpdateStatusParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = parse_order_id(&path)?;
    let UpdateStatusParams { status } = body.into_inner();
    info!("💻️ Admin status change for order {order_id} to {status}");
    let order = api.modify_status_for_order(&order_id, status).await.map_err(|e| {
        debug!("💻️ Could not change status. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_order_shipping => Post "/orders/{order_id}/shipping" impl StorefrontDatabase);
pub async fn update_order_shipping<B: StorefrontDatabase>(
    path: web::Path<String>,
    body: web::Json<ShippingUpdate>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = parse_order_id(&path)?;
    info!("💻️ Admin shipping update for order {order_id}");
    let order = api.update_shipping(&order_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(update_product_price => Post "/products/{product_id}/price" impl CatalogManagement);
/// Reprices a product. Orders that were already placed keep the price they were placed at.
pub async fn update_product_price<B: CatalogManagement>(
    path: web::Path<i64>,
    body: web::Json<UpdatePriceParams>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    let price = Centavos::from_str(&body.price).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    info!("💻️ Admin price change for product #{product_id} to {price}");
    let product = api.update_price(product_id, price).await?;
    Ok(HttpResponse::Ok().json(product))
}
