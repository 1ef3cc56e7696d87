use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use saporino_engine::CatalogApi;
use serde_json::Value;

use super::{
    helpers::{product, send_request},
    mocks::{MockAddressBook, MockCatalog},
};
use crate::{
    integrations::viacep::{AddressInfo, AddressLookupError},
    routes::{health, AddressLookupRoute, ProductByIdRoute, ProductsRoute},
};

fn configure(catalog: MockCatalog, address_book: MockAddressBook) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(CatalogApi::new(catalog)))
            .app_data(web::Data::new(address_book))
            .service(health)
            .service(ProductsRoute::<MockCatalog>::new())
            .service(ProductByIdRoute::<MockCatalog>::new())
            .service(AddressLookupRoute::<MockAddressBook>::new());
    }
}

#[actix_web::test]
async fn health_check() {
    let req = TestRequest::get().uri("/health");
    let (status, body) =
        send_request(req, configure(MockCatalog::new(), MockAddressBook::new())).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn list_products() {
    let _ = env_logger::try_init().ok();
    let mut catalog = MockCatalog::new();
    catalog.expect_fetch_active_products().times(1).returning(|| {
        Ok(vec![product(1, "Catuaí Amarelo 250g", 4500), product(2, "Bourbon Vermelho 250g", 5200)])
    });
    let req = TestRequest::get().uri("/products");
    let (status, body) = send_request(req, configure(catalog, MockAddressBook::new())).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body[0]["name"], "Catuaí Amarelo 250g");
    assert_eq!(body[0]["featured"], true);
    assert_eq!(body[1]["price"], 5200);
}

#[actix_web::test]
async fn single_product() {
    let _ = env_logger::try_init().ok();
    let mut catalog = MockCatalog::new();
    catalog
        .expect_fetch_product()
        .withf(|id| *id == 2)
        .returning(|id| Ok(Some(product(id, "Bourbon Vermelho 250g", 5200))));
    let req = TestRequest::get().uri("/products/2");
    let (status, body) = send_request(req, configure(catalog, MockAddressBook::new())).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["name"], "Bourbon Vermelho 250g");
}

#[actix_web::test]
async fn retired_products_are_hidden() {
    let _ = env_logger::try_init().ok();
    let mut catalog = MockCatalog::new();
    catalog.expect_fetch_product().returning(|id| {
        let mut p = product(id, "Safra 2022", 3900);
        p.active = false;
        Ok(Some(p))
    });
    let req = TestRequest::get().uri("/products/7");
    let (status, _) = send_request(req, configure(catalog, MockAddressBook::new())).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn address_for_postal_code() {
    let _ = env_logger::try_init().ok();
    let mut addresses = MockAddressBook::new();
    addresses.expect_lookup().withf(|cep| cep == "01310100").times(1).returning(|_| {
        Ok(Some(AddressInfo {
            postal_code: "01310-100".into(),
            street: "Avenida Paulista".into(),
            neighborhood: "Bela Vista".into(),
            city: "São Paulo".into(),
            state: "São Paulo".into(),
        }))
    });
    let req = TestRequest::get().uri("/address/01310-100");
    let (status, body) = send_request(req, configure(MockCatalog::new(), addresses)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["street"], "Avenida Paulista");
    assert_eq!(body["state"], "São Paulo");
}

#[actix_web::test]
async fn malformed_postal_code() {
    let _ = env_logger::try_init().ok();
    let mut addresses = MockAddressBook::new();
    addresses.expect_lookup().never();
    let req = TestRequest::get().uri("/address/0131");
    let (status, _) = send_request(req, configure(MockCatalog::new(), addresses)).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unknown_postal_code() {
    let _ = env_logger::try_init().ok();
    let mut addresses = MockAddressBook::new();
    addresses.expect_lookup().returning(|_| Ok(None));
    let req = TestRequest::get().uri("/address/99999999");
    let (status, _) = send_request(req, configure(MockCatalog::new(), addresses)).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn postal_code_service_down() {
    let _ = env_logger::try_init().ok();
    let mut addresses = MockAddressBook::new();
    addresses.expect_lookup().returning(|_| Err(AddressLookupError::Upstream("connection refused".into())));
    let req = TestRequest::get().uri("/address/01310100");
    let (status, _) = send_request(req, configure(MockCatalog::new(), addresses)).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}
