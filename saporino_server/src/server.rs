use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use mercadopago_tools::MercadoPagoApi;
use saporino_engine::{CatalogApi, OrderFlowApi, SqliteDatabase};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::{mercadopago::PaymentGateway, notifications::create_storefront_event_handlers, viacep::ViaCepClient},
    middleware::{AdminAuthMiddlewareFactory, MpSignatureMiddlewareFactory},
    routes::{
        health,
        AddressLookupRoute,
        CheckoutConfigRoute,
        CheckoutRoute,
        MercadopagoWebhookRoute,
        OrderByIdRoute,
        OrdersSearchRoute,
        PaymentReturnRoute,
        ProductByIdRoute,
        ProductsRoute,
        RetryPreferenceRoute,
        SubscriptionCheckoutRoute,
        UpdateOrderShippingRoute,
        UpdateOrderStatusRoute,
        UpdateProductPriceRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not run migrations. {e}")))?;
    info!("🗃️ Database is ready at {}", config.database_url);
    let gateway =
        MercadoPagoApi::new(config.mercadopago.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if gateway.public_key().is_empty() {
        warn!("💳️ No Mercado Pago public key is configured. The checkout widget will not render.");
    }
    let address_lookup =
        ViaCepClient::new(&config.viacep_url).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db, gateway, address_lookup)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: MercadoPagoApi,
    address_lookup: ViaCepClient,
) -> Result<Server, ServerError> {
    let handlers = create_storefront_event_handlers();
    let producers = handlers.producers();
    tokio::spawn(handlers.start_handlers());
    let options = config.server_options();
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let catalog_api = CatalogApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("saporino::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(gateway.clone()))
            .app_data(web::Data::new(address_lookup.clone()))
            .app_data(web::Data::new(options.clone()));
        let webhook_scope = web::scope("/mercadopago")
            .wrap(MpSignatureMiddlewareFactory::new(
                config.mercadopago.webhook_secret.clone(),
                config.mercadopago.signature_checks,
            ))
            .service(MercadopagoWebhookRoute::<SqliteDatabase, MercadoPagoApi>::new());
        let admin_scope = web::scope("/admin")
            .wrap(AdminAuthMiddlewareFactory::new(config.admin_api_token.clone()))
            .service(OrdersSearchRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(UpdateOrderShippingRoute::<SqliteDatabase>::new())
            .service(UpdateProductPriceRoute::<SqliteDatabase>::new());
        app.service(health)
            .service(ProductsRoute::<SqliteDatabase>::new())
            .service(ProductByIdRoute::<SqliteDatabase>::new())
            .service(CheckoutConfigRoute::<MercadoPagoApi>::new())
            .service(CheckoutRoute::<SqliteDatabase, SqliteDatabase, MercadoPagoApi>::new())
            .service(SubscriptionCheckoutRoute::<SqliteDatabase, SqliteDatabase, MercadoPagoApi>::new())
            .service(RetryPreferenceRoute::<SqliteDatabase, MercadoPagoApi>::new())
            .service(PaymentReturnRoute::<SqliteDatabase>::new())
            .service(AddressLookupRoute::<ViaCepClient>::new())
            .service(webhook_scope)
            .service(admin_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
