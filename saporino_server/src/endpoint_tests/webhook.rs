use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use mercadopago_tools::{MercadoPagoApiError, PaymentDetails, PaymentStatus};
use saporino_engine::{
    db_types::OrderStatusType,
    events::EventProducers,
    order_objects::PaymentSource,
    traits::{GatewayUpdateResult, OrderFlowError},
    OrderFlowApi,
};
use serde_json::json;

use super::{
    helpers::{order, send_request, send_signed_webhook, sign_webhook, ORDER_ID},
    mocks::{MockGateway, MockStorefront},
};
use crate::{config::ServerOptions, routes::MercadopagoWebhookRoute};

fn payment(status: PaymentStatus, external_reference: Option<&str>) -> PaymentDetails {
    PaymentDetails {
        id: "1319826071".into(),
        status,
        status_detail: None,
        external_reference: external_reference.map(str::to_string),
        payment_method_id: Some("pix".into()),
        collection_id: Some("1319826071".into()),
        transaction_amount: Some(90.0),
        date_approved: None,
    }
}

fn payment_notification() -> serde_json::Value {
    json!({ "type": "payment", "action": "payment.updated", "data": { "id": "1319826071" } })
}

fn configure(db: MockStorefront, gateway: MockGateway) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(OrderFlowApi::new(db, EventProducers::default())))
            .app_data(web::Data::new(gateway))
            .app_data(web::Data::new(ServerOptions::default()))
            .service(MercadopagoWebhookRoute::<MockStorefront, MockGateway>::new());
    }
}

fn gateway_returning(details: PaymentDetails) -> MockGateway {
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_payment().withf(|id| id == "1319826071").times(1).returning(move |_| Ok(details.clone()));
    gateway
}

#[actix_web::test]
async fn approved_payment_is_applied() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_apply_gateway_update()
        .withf(|u, source| {
            *source == PaymentSource::Webhook &&
                u.order_id.as_str() == ORDER_ID &&
                u.status == OrderStatusType::Approved &&
                u.payment_id.as_deref() == Some("1319826071")
        })
        .times(1)
        .returning(|_, _| Ok(GatewayUpdateResult::Updated(order(OrderStatusType::Approved))));
    let gateway = gateway_returning(payment(PaymentStatus::Approved, Some(ORDER_ID)));
    let req = TestRequest::post().uri("/webhook").set_json(payment_notification());
    let (status, body) = send_request(req, configure(db, gateway)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"applied"}"#);
}

#[actix_web::test]
async fn repeated_notification_changes_nothing() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_apply_gateway_update()
        .returning(|_, _| Ok(GatewayUpdateResult::Unchanged(order(OrderStatusType::Approved))));
    let gateway = gateway_returning(payment(PaymentStatus::Approved, Some(ORDER_ID)));
    let req = TestRequest::post().uri("/webhook").set_json(payment_notification());
    let (status, body) = send_request(req, configure(db, gateway)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"already_applied"}"#);
}

#[actix_web::test]
async fn late_pending_signal_is_stale() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_apply_gateway_update().returning(|u, _| {
        Ok(GatewayUpdateResult::Stale { order: order(OrderStatusType::Approved), requested: u.status })
    });
    let gateway = gateway_returning(payment(PaymentStatus::InProcess, Some(ORDER_ID)));
    let req = TestRequest::post().uri("/webhook").set_json(payment_notification());
    let (status, body) = send_request(req, configure(db, gateway)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"stale"}"#);
}

#[actix_web::test]
async fn other_topics_are_ignored() {
    let _ = env_logger::try_init().ok();
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_payment().never();
    let req = TestRequest::post()
        .uri("/webhook")
        .set_json(json!({ "type": "merchant_order", "data": { "id": "7788" } }));
    let (status, body) = send_request(req, configure(MockStorefront::new(), gateway)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"ignored"}"#);
}

#[actix_web::test]
async fn payment_id_can_come_from_the_query() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_apply_gateway_update().returning(|_, _| Ok(GatewayUpdateResult::Updated(order(OrderStatusType::Rejected))));
    let gateway = gateway_returning(payment(PaymentStatus::Rejected, Some(ORDER_ID)));
    let req = TestRequest::post().uri("/webhook?topic=payment&id=1319826071");
    let (status, body) = send_request(req, configure(db, gateway)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"applied"}"#);
}

#[actix_web::test]
async fn payment_without_reference_is_unmatched() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_apply_gateway_update().never();
    let gateway = gateway_returning(payment(PaymentStatus::Approved, None));
    let req = TestRequest::post().uri("/webhook").set_json(payment_notification());
    let (status, body) = send_request(req, configure(db, gateway)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"unmatched"}"#);
}

#[actix_web::test]
async fn payment_for_unknown_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_apply_gateway_update().returning(|_, _| Ok(GatewayUpdateResult::NotFound));
    let gateway = gateway_returning(payment(PaymentStatus::Approved, Some("not-one-of-ours")));
    let req = TestRequest::post().uri("/webhook").set_json(payment_notification());
    let (status, body) = send_request(req, configure(db, gateway)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"unknown_order"}"#);
}

#[actix_web::test]
async fn gateway_read_failure_asks_for_a_retry() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_apply_gateway_update().never();
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_payment().returning(|_| Err(MercadoPagoApiError::Timeout));
    let req = TestRequest::post().uri("/webhook").set_json(payment_notification());
    let (status, _) = send_request(req, configure(db, gateway)).await.expect("Request failed");
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn permanent_gateway_errors_are_not_retried() {
    let _ = env_logger::try_init().ok();
    for error in [
        MercadoPagoApiError::QueryError { status: 404, message: "Payment not found".into() },
        MercadoPagoApiError::RestRequestError("invalid payment id".into()),
    ] {
        let mut db = MockStorefront::new();
        db.expect_apply_gateway_update().never();
        let mut gateway = MockGateway::new();
        gateway.expect_fetch_payment().times(1).return_once(move |_| Err(error));
        let req = TestRequest::post().uri("/webhook").set_json(payment_notification());
        let (status, body) = send_request(req, configure(db, gateway)).await.expect("Request failed");
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"success":true,"message":"ignored"}"#);
    }
}

#[actix_web::test]
async fn throttled_gateway_read_asks_for_a_retry() {
    let _ = env_logger::try_init().ok();
    let mut gateway = MockGateway::new();
    gateway
        .expect_fetch_payment()
        .returning(|_| Err(MercadoPagoApiError::QueryError { status: 429, message: "Too many requests".into() }));
    let req = TestRequest::post().uri("/webhook").set_json(payment_notification());
    let (status, _) = send_request(req, configure(MockStorefront::new(), gateway)).await.expect("Request failed");
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn database_failure_asks_for_a_retry() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_apply_gateway_update().returning(|_, _| Err(OrderFlowError::DatabaseError("database is locked".into())));
    let gateway = gateway_returning(payment(PaymentStatus::Approved, Some(ORDER_ID)));
    let req = TestRequest::post().uri("/webhook").set_json(payment_notification());
    let (status, _) = send_request(req, configure(db, gateway)).await.expect("Request failed");
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn signed_notification_is_accepted() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_apply_gateway_update().returning(|_, _| Ok(GatewayUpdateResult::Updated(order(OrderStatusType::Approved))));
    let gateway = gateway_returning(payment(PaymentStatus::Approved, Some(ORDER_ID)));
    let req = TestRequest::post().uri("/mercadopago/webhook").set_json(payment_notification());
    let req = sign_webhook(req, "1319826071", "a6f3c2d0-5d8e-4e0b-9a55-2b1f0c7d9e31");
    let (status, body) = send_signed_webhook(req, configure(db, gateway)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"applied"}"#);
}

#[actix_web::test]
async fn signature_can_cover_the_query_id() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_apply_gateway_update().returning(|_, _| Ok(GatewayUpdateResult::Updated(order(OrderStatusType::Approved))));
    let gateway = gateway_returning(payment(PaymentStatus::Approved, Some(ORDER_ID)));
    let req = TestRequest::post()
        .uri("/mercadopago/webhook?type=payment&data.id=1319826071")
        .set_json(payment_notification());
    let req = sign_webhook(req, "1319826071", "0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0");
    let (status, _) = send_signed_webhook(req, configure(db, gateway)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn forged_signature_is_refused() {
    let _ = env_logger::try_init().ok();
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_payment().never();
    let req = TestRequest::post().uri("/mercadopago/webhook").set_json(payment_notification());
    // Signed for a different payment
    let req = sign_webhook(req, "999", "a6f3c2d0-5d8e-4e0b-9a55-2b1f0c7d9e31");
    let err = send_signed_webhook(req, configure(MockStorefront::new(), gateway))
        .await
        .expect_err("Request should have been refused");
    assert_eq!(err, "Invalid webhook signature.");
}

#[actix_web::test]
async fn unsigned_notification_is_refused() {
    let _ = env_logger::try_init().ok();
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_payment().never();
    let req = TestRequest::post().uri("/mercadopago/webhook").set_json(payment_notification());
    let err = send_signed_webhook(req, configure(MockStorefront::new(), gateway))
        .await
        .expect_err("Request should have been refused");
    assert_eq!(err, "No webhook signature found.");
}
