//! Bearer-token middleware for the admin routes.
//!
//! The request must carry `Authorization: Bearer <SPG_ADMIN_API_TOKEN>`. A missing header is answered with 401, a
//! wrong token with 403. If no token is configured, every request is refused.
use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorForbidden, ErrorUnauthorized},
    http::header::AUTHORIZATION,
    Error,
};
use futures::future::{ok, Ready};
use log::{trace, warn};
use saporino_common::Secret;

pub struct AdminAuthMiddlewareFactory {
    token: Secret<String>,
}

impl AdminAuthMiddlewareFactory {
    pub fn new(token: Secret<String>) -> Self {
        AdminAuthMiddlewareFactory { token }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminAuthMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminAuthMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AdminAuthMiddlewareService { token: self.token.clone(), service: Rc::new(service) })
    }
}

pub struct AdminAuthMiddlewareService<S> {
    token: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let token = self.token.clone();
        Box::pin(async move {
            let supplied = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::trim)
                .ok_or_else(|| {
                    warn!("🔐️ Admin request to {} without a bearer token", req.path());
                    ErrorUnauthorized("An admin access token is required.")
                })?;
            let expected = token.reveal();
            if expected.is_empty() {
                warn!("🔐️ No admin token is configured. Refusing admin request to {}", req.path());
                return Err(ErrorForbidden("Admin access is disabled."));
            }
            if supplied == expected.as_str() {
                trace!("🔐️ Admin token for {} ✅️", req.path());
                service.call(req).await
            } else {
                warn!("🔐️ Invalid admin token for {}", req.path());
                Err(ErrorForbidden("Insufficient permissions"))
            }
        })
    }
}
