use std::{str::FromStr, time::Duration};

use cucumber::{then, when};
use saporino_engine::{
    cart::Cart,
    db_types::{Centavos, OrderId, OrderStatusType},
    order_objects::{CheckoutCustomer, CheckoutKind, PaymentSource, PaymentUpdate, ReconcileOutcome, ShippingAddress},
    OrderManagement,
};

use crate::cucumber::StorefrontWorld;

fn customer() -> CheckoutCustomer {
    CheckoutCustomer {
        name: "Carla Lima".into(),
        email: "carla@example.com".into(),
        phone: "(31) 99999-1234".into(),
        address: ShippingAddress {
            postal_code: "30130-010".into(),
            street: "Avenida Afonso Pena".into(),
            number: "1000".into(),
            complement: None,
            neighborhood: "Centro".into(),
            city: "Belo Horizonte".into(),
            state: "Minas Gerais".into(),
        },
        account: None,
    }
}

fn source(s: &str) -> PaymentSource {
    match s {
        "webhook" => PaymentSource::Webhook,
        "return page" => PaymentSource::ReturnPage,
        s => panic!("Unknown payment source {s}"),
    }
}

#[when(expr = "{word} checks out {int} x {string} and {int} x {string}")]
async fn check_out_two(world: &mut StorefrontWorld, alias: String, q1: i64, p1: String, q2: i64, p2: String) {
    let mut cart = Cart::new();
    for (qty, name) in [(q1, p1), (q2, p2)] {
        let product = world.products.get(&name).unwrap_or_else(|| panic!("Unknown product {name}"));
        cart.add(product).set_quantity(product.id, qty);
    }
    let order = world.system().orders.place_order(&cart, customer(), CheckoutKind::Single).await.expect("Checkout failed");
    world.orders.insert(alias, order);
}

#[when(expr = "the {word} reports order {word} as {word}")]
async fn gateway_reports(world: &mut StorefrontWorld, from: String, alias: String, status: String) {
    report(world, from, alias, status).await;
}

#[when(expr = "the return page reports order {word} as {word}")]
async fn return_page_reports(world: &mut StorefrontWorld, alias: String, status: String) {
    report(world, "return page".into(), alias, status).await;
}

async fn report(world: &mut StorefrontWorld, from: String, alias: String, status: String) {
    let status = OrderStatusType::from_str(&status).expect("Invalid status");
    let id = world.order(&alias).id.clone();
    let update = PaymentUpdate::new(id, status).with_payment_id(Some("5550001"));
    world.system().orders.reconcile_payment(update, source(&from)).await.expect("Reconciliation failed");
}

#[when(expr = "the webhook reports an unknown order {word} as approved")]
async fn unknown_order(world: &mut StorefrontWorld, reference: String) {
    let update = PaymentUpdate::new(OrderId::from(reference.as_str()), OrderStatusType::Approved);
    let outcome =
        world.system().orders.reconcile_payment(update, PaymentSource::Webhook).await.expect("Reconciliation failed");
    assert_eq!(outcome, ReconcileOutcome::UnknownOrder { order_id: OrderId::from(reference.as_str()) });
}

#[when(expr = "the admin marks order {word} as {word}")]
async fn admin_marks(world: &mut StorefrontWorld, alias: String, status: String) {
    let status = OrderStatusType::from_str(&status).expect("Invalid status");
    let id = world.order(&alias).id.clone();
    let order = world.system().orders.modify_status_for_order(&id, status).await.expect("Admin update failed");
    world.orders.insert(alias, order);
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut StorefrontWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[then(expr = "order {word} has status {word}")]
async fn order_has_status(world: &mut StorefrontWorld, alias: String, status: String) {
    let expected = OrderStatusType::from_str(&status).expect("Invalid status");
    let id = world.order(&alias).id.clone();
    let order = world.system().db.fetch_order_by_id(&id).await.expect("DB error").expect("Order missing");
    assert_eq!(order.status, expected);
}

#[then(expr = "order {word} has a total of {word}")]
async fn order_total(world: &mut StorefrontWorld, alias: String, total: String) {
    let expected = Centavos::from_str(&total).expect("Invalid amount");
    assert_eq!(world.order(&alias).total_amount, expected);
}

#[then(expr = "order {word} has {int} items")]
async fn order_item_count(world: &mut StorefrontWorld, alias: String, count: usize) {
    let id = world.order(&alias).id.clone();
    let items = world.system().db.fetch_order_items(&id).await.expect("DB error");
    assert_eq!(items.len(), count);
}

#[then(expr = "order {word} has a tracking code")]
async fn has_tracking_code(world: &mut StorefrontWorld, alias: String) {
    let id = world.order(&alias).id.clone();
    let order = world.system().db.fetch_order_by_id(&id).await.expect("DB error").expect("Order missing");
    assert!(order.tracking_code.is_some_and(|c| c.starts_with("BR") && c.ends_with("BR")));
}

#[then(expr = "order {word} kept its tracking code")]
async fn kept_tracking_code(world: &mut StorefrontWorld, alias: String) {
    let known = world.order(&alias);
    let expected = known.tracking_code.clone();
    assert!(expected.is_some(), "The admin never shipped order {alias}");
    let order = world.system().db.fetch_order_by_id(&known.id).await.expect("DB error").expect("Order missing");
    assert_eq!(order.tracking_code, expected);
}
