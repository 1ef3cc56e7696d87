use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use chrono::{TimeZone, Utc};
use log::debug;
use saporino_common::Secret;
use saporino_engine::db_types::{Centavos, Order, OrderId, OrderItem, OrderStatusType, OrderType, Product};

use crate::{
    helpers::{calculate_signature, signature_manifest},
    middleware::{AdminAuthMiddlewareFactory, MpSignatureMiddlewareFactory, REQUEST_ID_HEADER, SIGNATURE_HEADER},
};

pub const ADMIN_TOKEN: &str = "admin-token-for-tests";
pub const WEBHOOK_SECRET: &str = "webhook-secret-for-tests";
pub const ORDER_ID: &str = "0b5b6f1e-9d2c-4f5a-8a43-3c1f9e7d2a10";

/// Sends `req` to an app configured by `configure`, and returns the status and body of the response.
///
/// Errors raised by middleware don't become responses; they are returned as `Err` with the error message.
pub async fn send_request<F>(req: TestRequest, configure: F) -> Result<(StatusCode, String), String>
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

/// As [`send_request`], with the routes mounted under `/admin` behind the admin token check.
pub async fn send_admin_request<F>(
    token: Option<&str>,
    req: TestRequest,
    configure: F,
) -> Result<(StatusCode, String), String>
where
    F: FnOnce(&mut ServiceConfig),
{
    let req = match token {
        Some(t) => req.insert_header(("Authorization", format!("Bearer {t}"))),
        None => req,
    };
    let scope = web::scope("/admin")
        .wrap(AdminAuthMiddlewareFactory::new(Secret::new(ADMIN_TOKEN.to_string())))
        .configure(configure);
    let app = App::new().service(scope);
    let service = test::init_service(app).await;
    let (_, res) = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

/// As [`send_request`], with the routes mounted under `/mercadopago` behind the webhook signature check.
pub async fn send_signed_webhook<F>(req: TestRequest, configure: F) -> Result<(StatusCode, String), String>
where F: FnOnce(&mut ServiceConfig) {
    let scope = web::scope("/mercadopago")
        .wrap(MpSignatureMiddlewareFactory::new(Secret::new(WEBHOOK_SECRET.to_string()), true))
        .configure(configure);
    let app = App::new().service(scope);
    let service = test::init_service(app).await;
    let (_, res) = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

/// Adds the headers Mercado Pago would send with a notification about `data_id`.
pub fn sign_webhook(req: TestRequest, data_id: &str, request_id: &str) -> TestRequest {
    let ts = "1718000000";
    let manifest = signature_manifest(Some(data_id), Some(request_id), ts);
    let v1 = calculate_signature(WEBHOOK_SECRET, &manifest);
    req.insert_header((SIGNATURE_HEADER, format!("ts={ts},v1={v1}"))).insert_header((REQUEST_ID_HEADER, request_id))
}

pub fn order(status: OrderStatusType) -> Order {
    let created_at = Utc.with_ymd_and_hms(2024, 10, 14, 12, 0, 0).unwrap();
    Order {
        id: OrderId::from(ORDER_ID),
        customer_name: "Maria Souza".into(),
        customer_email: "maria@example.com".into(),
        customer_phone: "11987654321".into(),
        shipping_postal_code: "01310-100".into(),
        shipping_address: "Avenida Paulista".into(),
        shipping_number: "1000".into(),
        shipping_complement: Some("Apto 12".into()),
        shipping_neighborhood: "Bela Vista".into(),
        shipping_city: "São Paulo".into(),
        shipping_state: "São Paulo".into(),
        account_type: None,
        cpf: None,
        birth_date: None,
        cnpj: None,
        inscricao_estadual: None,
        email_xml: None,
        total_amount: Centavos::from(9000),
        shipping_cost: Centavos::from(0),
        freight_type: None,
        status,
        status_confirmed: false,
        order_type: OrderType::Single,
        subscription_shipping_day: None,
        grind_type: None,
        mercadopago_preference_id: None,
        mercadopago_payment_id: None,
        mercadopago_collection_id: None,
        mercadopago_collection_status: None,
        payment_method: None,
        paid_at: None,
        shipped_at: None,
        tracking_code: None,
        carrier_name: None,
        created_at,
        updated_at: created_at,
    }
}

pub fn order_items() -> Vec<OrderItem> {
    vec![OrderItem {
        id: 1,
        order_id: OrderId::from(ORDER_ID),
        product_id: 1,
        product_name: "Catuaí Amarelo 250g".into(),
        quantity: 2,
        unit_price: Centavos::from(4500),
        subtotal: Centavos::from(9000),
        grind_type: None,
        created_at: Utc.with_ymd_and_hms(2024, 10, 14, 12, 0, 0).unwrap(),
    }]
}

pub fn product(id: i64, name: &str, price: i64) -> Product {
    let created_at = Utc.with_ymd_and_hms(2024, 9, 1, 9, 0, 0).unwrap();
    Product {
        id,
        name: name.into(),
        description: format!("{name}, torra média"),
        price: Centavos::from(price),
        category: "especial".into(),
        weight_grams: 250,
        stock: 40,
        featured: id == 1,
        active: true,
        display_order: id,
        created_at,
        updated_at: created_at,
    }
}
