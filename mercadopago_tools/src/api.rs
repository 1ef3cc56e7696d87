use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::MercadoPagoConfig,
    data_objects::{PaymentDetails, Preference, PreferenceRequest},
    MercadoPagoApiError,
};

#[derive(Clone)]
pub struct MercadoPagoApi {
    config: MercadoPagoConfig,
    client: Arc<Client>,
}

impl MercadoPagoApi {
    pub fn new(config: MercadoPagoConfig) -> Result<Self, MercadoPagoApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", config.access_token.reveal()))
            .map_err(|e| MercadoPagoApiError::Initialization(e.to_string()))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| MercadoPagoApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &MercadoPagoConfig {
        &self.config
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, MercadoPagoApiError> {
        let url = self.url(path);
        trace!("💳️ Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await?;
        if response.status().is_success() {
            trace!("💳️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| MercadoPagoApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await?;
            Err(MercadoPagoApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url.trim_end_matches('/'))
    }

    /// Creates a Checkout Pro preference. The returned `id` is what the browser needs to open the checkout.
    pub async fn create_preference(&self, request: &PreferenceRequest) -> Result<Preference, MercadoPagoApiError> {
        let reference = request.external_reference.as_deref().unwrap_or("none");
        debug!("💳️ Creating payment preference for order {reference} with {} items", request.items.len());
        let preference =
            self.rest_query::<Preference, &PreferenceRequest>(Method::POST, "/checkout/preferences", Some(request)).await?;
        info!("💳️ Created payment preference {} for order {reference}", preference.id);
        Ok(preference)
    }

    /// Fetches the authoritative state of a payment.
    pub async fn get_payment(&self, payment_id: &str) -> Result<PaymentDetails, MercadoPagoApiError> {
        if payment_id.is_empty() || !payment_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(MercadoPagoApiError::RestRequestError(format!("Invalid payment id: {payment_id}")));
        }
        let path = format!("/v1/payments/{payment_id}");
        debug!("💳️ Fetching payment {payment_id}");
        let payment = self.rest_query::<PaymentDetails, ()>(Method::GET, &path, None).await?;
        debug!("💳️ Payment {payment_id} has status {}", payment.status);
        Ok(payment)
    }
}
