//! Webhook signature middleware.
//!
//! Mercado Pago signs every webhook notification with the secret configured for the application. The signature is in
//! the `x-signature` header (`ts=<timestamp>,v1=<hex hmac>`) and covers the manifest
//!
//! ```text
//! id:<data.id>;request-id:<x-request-id>;ts:<timestamp>;
//! ```
//!
//! `data.id` is read from the query string. If it is not there, the JSON body is read for it and then handed on to
//! the route untouched.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorBadRequest, ErrorForbidden},
    web,
    Error,
};
use bytes::Bytes;
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use mercadopago_tools::WebhookNotification;
use saporino_common::Secret;

use crate::{
    data_objects::WebhookQuery,
    helpers::{parse_signature_header, signature_manifest, verify_signature},
};

pub const SIGNATURE_HEADER: &str = "x-signature";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub struct MpSignatureMiddlewareFactory {
    secret: Secret<String>,
    // If false, then the middleware will not check the signature and always allow the call
    enabled: bool,
}

impl MpSignatureMiddlewareFactory {
    pub fn new(secret: Secret<String>, enabled: bool) -> Self {
        MpSignatureMiddlewareFactory { secret, enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for MpSignatureMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = MpSignatureMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MpSignatureMiddlewareService {
            secret: self.secret.clone(),
            enabled: self.enabled,
            service: Rc::new(service),
        }))
    }
}

pub struct MpSignatureMiddlewareService<S> {
    secret: Secret<String>,
    enabled: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for MpSignatureMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let secret = self.secret.reveal().clone();
        let enabled = self.enabled;
        Box::pin(async move {
            trace!("🔐️ Checking webhook signature");
            if !enabled {
                trace!("🔐️ Webhook signature checks are disabled. Allowing request.");
                return service.call(req).await;
            }
            let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
            let (ts, v1) = header(SIGNATURE_HEADER).as_deref().and_then(parse_signature_header).ok_or_else(|| {
                warn!("🔐️ No valid {SIGNATURE_HEADER} header found in webhook request. Denying access.");
                ErrorForbidden("No webhook signature found.")
            })?;
            let request_id = header(REQUEST_ID_HEADER).ok_or_else(|| {
                warn!("🔐️ No {REQUEST_ID_HEADER} header found in webhook request. Denying access.");
                ErrorForbidden("No request id found.")
            })?;
            let query = web::Query::<WebhookQuery>::from_query(req.query_string())
                .map(web::Query::into_inner)
                .unwrap_or_default();
            let data_id = match query.data_id {
                Some(id) => Some(id),
                None => {
                    let data = req.extract::<web::Bytes>().await.map_err(|e| {
                        warn!("🔐️ Failed to extract request data: {:?}", e);
                        ErrorBadRequest("Failed to extract request data.")
                    })?;
                    let id = serde_json::from_slice::<WebhookNotification>(&data)
                        .ok()
                        .and_then(|n| n.payment_id().map(str::to_string));
                    req.set_payload(bytes_to_payload(data));
                    id
                },
            };
            let manifest = signature_manifest(data_id.as_deref(), Some(&request_id), &ts);
            if !secret.is_empty() && verify_signature(&secret, &manifest, &v1) {
                trace!("🔐️ Webhook signature check for request ✅️");
                service.call(req).await
            } else {
                warn!("🔐️ Invalid webhook signature for request {request_id}. Denying access.");
                Err(ErrorForbidden("Invalid webhook signature."))
            }
        })
    }
}

fn bytes_to_payload(buf: Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
