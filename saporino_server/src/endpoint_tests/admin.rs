use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::Utc;
use saporino_engine::{
    db_types::{Centavos, OrderStatusType},
    events::EventProducers,
    order_objects::ShippingUpdate,
    traits::OrderFlowError,
    CatalogApi,
    OrderFlowApi,
};
use serde_json::{json, Value};

use super::{
    helpers::{order, order_items, product, send_admin_request, ADMIN_TOKEN, ORDER_ID},
    mocks::{MockCatalog, MockStorefront},
};
use crate::routes::{
    OrderByIdRoute,
    OrdersSearchRoute,
    UpdateOrderShippingRoute,
    UpdateOrderStatusRoute,
    UpdateProductPriceRoute,
};

fn configure(db: MockStorefront, catalog: MockCatalog) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(OrderFlowApi::new(db, EventProducers::default())))
            .app_data(web::Data::new(CatalogApi::new(catalog)))
            .service(OrdersSearchRoute::<MockStorefront>::new())
            .service(OrderByIdRoute::<MockStorefront>::new())
            .service(UpdateOrderStatusRoute::<MockStorefront>::new())
            .service(UpdateOrderShippingRoute::<MockStorefront>::new())
            .service(UpdateProductPriceRoute::<MockCatalog>::new());
    }
}

fn status_request(status: &str) -> TestRequest {
    TestRequest::post().uri(&format!("/admin/orders/{ORDER_ID}/status")).set_json(json!({ "status": status }))
}

fn storefront_with_orders() -> MockStorefront {
    let mut db = MockStorefront::new();
    db.expect_search_orders().returning(|_| Ok(vec![order(OrderStatusType::Approved)]));
    db
}

#[actix_web::test]
async fn admin_routes_need_a_token() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/admin/orders");
    let err = send_admin_request(None, req, configure(storefront_with_orders(), MockCatalog::new()))
        .await
        .expect_err("Request should have been refused");
    assert_eq!(err, "An admin access token is required.");
}

#[actix_web::test]
async fn admin_routes_refuse_the_wrong_token() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::get().uri("/admin/orders");
    let err = send_admin_request(Some("guess"), req, configure(storefront_with_orders(), MockCatalog::new()))
        .await
        .expect_err("Request should have been refused");
    assert_eq!(err, "Insufficient permissions");
}

#[actix_web::test]
async fn search_orders_with_labels() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_search_orders()
        .withf(|q| {
            q.status == Some(vec![OrderStatusType::Approved, OrderStatusType::Shipped]) &&
                q.customer_email.as_deref() == Some("maria@example.com")
        })
        .times(1)
        .returning(|_| Ok(vec![order(OrderStatusType::Approved)]));
    let req = TestRequest::get().uri("/admin/orders?status=approved,shipped&customer_email=maria@example.com");
    let (status, body) =
        send_admin_request(Some(ADMIN_TOKEN), req, configure(db, MockCatalog::new())).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["id"], ORDER_ID);
    assert_eq!(body[0]["status"], "approved");
    assert_eq!(body[0]["status_label"], "Pagamento aprovado");
}

#[actix_web::test]
async fn search_rejects_unknown_statuses() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_search_orders().never();
    let req = TestRequest::get().uri("/admin/orders?status=lost");
    let (status, _) =
        send_admin_request(Some(ADMIN_TOKEN), req, configure(db, MockCatalog::new())).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn fetch_order_with_items() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_fetch_order_by_id().returning(|_| Ok(Some(order(OrderStatusType::Shipped))));
    db.expect_fetch_order_items().returning(|_| Ok(order_items()));
    let req = TestRequest::get().uri(&format!("/admin/orders/{ORDER_ID}"));
    let (status, body) =
        send_admin_request(Some(ADMIN_TOKEN), req, configure(db, MockCatalog::new())).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["id"], ORDER_ID);
    assert_eq!(body["items"][0]["product_name"], "Catuaí Amarelo 250g");
    assert_eq!(body["items"][0]["unit_price"], 4500);
}

#[actix_web::test]
async fn fetch_missing_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_fetch_order_by_id().returning(|_| Ok(None));
    let req = TestRequest::get().uri("/admin/orders/nope");
    let (status, _) =
        send_admin_request(Some(ADMIN_TOKEN), req, configure(db, MockCatalog::new())).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn staff_can_ship_an_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_set_order_status()
        .withf(|id, status| id.as_str() == ORDER_ID && *status == OrderStatusType::Shipped)
        .times(1)
        .returning(|_, _| {
            let mut order = order(OrderStatusType::Shipped);
            order.shipped_at = Some(Utc::now());
            order.tracking_code = Some("BR12345678".into());
            Ok(order)
        });
    let req = status_request("shipped");
    let (status, body) =
        send_admin_request(Some(ADMIN_TOKEN), req, configure(db, MockCatalog::new())).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], "shipped");
    assert_eq!(body["tracking_code"], "BR12345678");
}

#[actix_web::test]
async fn staff_can_move_an_order_backwards() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_set_order_status().returning(|_, status| Ok(order(status)));
    let req = status_request("pending");
    let (status, body) =
        send_admin_request(Some(ADMIN_TOKEN), req, configure(db, MockCatalog::new())).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""status":"pending""#), "{body}");
}

#[actix_web::test]
async fn setting_the_same_status_is_refused() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_set_order_status().returning(|_, _| Err(OrderFlowError::OrderModificationNoOp));
    let req = status_request("approved");
    let (status, _) =
        send_admin_request(Some(ADMIN_TOKEN), req, configure(db, MockCatalog::new())).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn invalid_status_is_refused() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_set_order_status().never();
    let req = status_request("teleported");
    let (status, _) =
        send_admin_request(Some(ADMIN_TOKEN), req, configure(db, MockCatalog::new())).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn shipping_details_are_recorded() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_update_shipping()
        .withf(|id, update| {
            id.as_str() == ORDER_ID &&
                *update ==
                    ShippingUpdate {
                        carrier_name: Some("Correios".into()),
                        tracking_code: Some("QB123456789BR".into()),
                    }
        })
        .times(1)
        .returning(|_, update| {
            let mut order = order(OrderStatusType::Shipped);
            order.carrier_name = update.carrier_name;
            order.tracking_code = update.tracking_code;
            Ok(order)
        });
    let req = TestRequest::post()
        .uri(&format!("/admin/orders/{ORDER_ID}/shipping"))
        .set_json(json!({ "carrier_name": "Correios", "tracking_code": "QB123456789BR" }));
    let (status, body) =
        send_admin_request(Some(ADMIN_TOKEN), req, configure(db, MockCatalog::new())).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["carrier_name"], "Correios");
    assert_eq!(body["status"], "shipped");
}

#[actix_web::test]
async fn product_can_be_repriced() {
    let _ = env_logger::try_init().ok();
    let mut catalog = MockCatalog::new();
    catalog
        .expect_update_product_price()
        .withf(|id, price| *id == 2 && *price == Centavos::from(5490))
        .times(1)
        .returning(|id, price| {
            let mut p = product(id, "Bourbon Vermelho 250g", 5200);
            p.price = price;
            Ok(p)
        });
    let req = TestRequest::post().uri("/admin/products/2/price").set_json(json!({ "price": "54,90" }));
    let (status, body) =
        send_admin_request(Some(ADMIN_TOKEN), req, configure(MockStorefront::new(), catalog))
            .await
            .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["price"], 5490);
}

#[actix_web::test]
async fn negative_prices_are_refused() {
    let _ = env_logger::try_init().ok();
    let mut catalog = MockCatalog::new();
    catalog.expect_update_product_price().never();
    let req = TestRequest::post().uri("/admin/products/2/price").set_json(json!({ "price": "-1.00" }));
    let (status, _) =
        send_admin_request(Some(ADMIN_TOKEN), req, configure(MockStorefront::new(), catalog))
            .await
            .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
