use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use saporino_engine::{
    db_types::OrderStatusType,
    events::EventProducers,
    order_objects::PaymentSource,
    traits::{GatewayUpdateResult, OrderFlowError},
    OrderFlowApi,
};
use serde_json::Value;

use super::{
    helpers::{order, send_request, ORDER_ID},
    mocks::MockStorefront,
};
use crate::routes::PaymentReturnRoute;

fn configure(db: MockStorefront) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(OrderFlowApi::new(db, EventProducers::default())))
            .service(PaymentReturnRoute::<MockStorefront>::new());
    }
}

async fn visit(path: &str, db: MockStorefront) -> (StatusCode, Value) {
    let req = TestRequest::get().uri(path);
    let (status, body) = send_request(req, configure(db)).await.expect("Request failed");
    (status, serde_json::from_str(&body).unwrap_or(Value::Null))
}

#[actix_web::test]
async fn success_page_approves_the_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_apply_gateway_update()
        .withf(|u, source| {
            *source == PaymentSource::ReturnPage &&
                u.status == OrderStatusType::Approved &&
                u.payment_id.as_deref() == Some("1319826071") &&
                u.payment_method.as_deref() == Some("credit_card")
        })
        .times(1)
        .returning(|_, _| Ok(GatewayUpdateResult::Updated(order(OrderStatusType::Approved))));
    let path = format!(
        "/payment/success?external_reference={ORDER_ID}&payment_id=1319826071&collection_id=1319826071&\
         collection_status=approved&payment_type=credit_card"
    );
    let (status, body) = visit(&path, db).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "success");
    assert_eq!(body["order_id"], ORDER_ID);
    assert_eq!(body["reconciled"], true);
    assert_eq!(body["status"], "approved");
    assert_eq!(body["status_label"], "Pagamento aprovado");
}

#[actix_web::test]
async fn success_page_without_status_assumes_approval() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_apply_gateway_update()
        .withf(|u, _| u.status == OrderStatusType::Approved && u.payment_id.is_none())
        .times(1)
        .returning(|_, _| Ok(GatewayUpdateResult::Updated(order(OrderStatusType::Approved))));
    let (status, body) = visit(&format!("/payment/success?external_reference={ORDER_ID}&payment_id=null"), db).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reconciled"], true);
}

#[actix_web::test]
async fn failure_page_cannot_undo_an_approval() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_apply_gateway_update().returning(|u, _| {
        Ok(GatewayUpdateResult::Stale { order: order(OrderStatusType::Approved), requested: u.status })
    });
    let (status, body) =
        visit(&format!("/payment/failure?external_reference={ORDER_ID}&collection_status=rejected"), db).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "failure");
    assert_eq!(body["reconciled"], false);
    assert_eq!(body["status"], "approved");
}

#[actix_web::test]
async fn failure_page_without_status_only_reads_the_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_apply_gateway_update().never();
    db.expect_fetch_order_by_id().times(1).returning(|_| Ok(Some(order(OrderStatusType::Pending))));
    let (status, body) = visit(&format!("/payment/failure?external_reference={ORDER_ID}"), db).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reconciled"], false);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["status_label"], "Aguardando pagamento");
}

#[actix_web::test]
async fn pending_page_marks_the_order_in_process() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_apply_gateway_update()
        .withf(|u, _| u.status == OrderStatusType::InProcess)
        .returning(|_, _| Ok(GatewayUpdateResult::Updated(order(OrderStatusType::InProcess))));
    let (status, body) = visit(&format!("/payment/pending?external_reference={ORDER_ID}"), db).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reconciled"], true);
    assert_eq!(body["status"], "in_process");
}

#[actix_web::test]
async fn page_renders_without_a_reference() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_apply_gateway_update().never();
    let (status, body) = visit("/payment/success?collection_status=approved", db).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order_id"], Value::Null);
    assert_eq!(body["reconciled"], false);
}

#[actix_web::test]
async fn page_renders_when_the_database_fails() {
    let _ = env_logger::try_init().ok();
    let mut db = MockStorefront::new();
    db.expect_apply_gateway_update().returning(|_, _| Err(OrderFlowError::DatabaseError("disk I/O error".into())));
    let (status, body) = visit(&format!("/payment/success?external_reference={ORDER_ID}"), db).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reconciled"], false);
    assert_eq!(body["status"], Value::Null);
}

#[actix_web::test]
async fn unknown_page() {
    let _ = env_logger::try_init().ok();
    let (status, _) = visit("/payment/elsewhere", MockStorefront::new()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
