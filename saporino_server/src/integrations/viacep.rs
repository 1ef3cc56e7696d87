//! Postal code (CEP) lookup through ViaCEP. Used to pre-fill the checkout form; never authoritative.
use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::Client;
use saporino_engine::shipping::state_name_for_uf;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::helpers::format_cep;

const VIACEP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Error)]
pub enum AddressLookupError {
    #[error("Could not initialize the address lookup client. {0}")]
    Initialization(String),
    #[error("The address lookup service failed. {0}")]
    Upstream(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    pub postal_code: String,
    pub street: String,
    pub neighborhood: String,
    pub city: String,
    /// Full state name, e.g. `São Paulo`
    pub state: String,
}

#[allow(async_fn_in_trait)]
pub trait AddressLookup {
    /// Looks up an eight-digit postal code. `Ok(None)` means the code does not exist.
    async fn lookup(&self, cep: &str) -> Result<Option<AddressInfo>, AddressLookupError>;
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    cep: String,
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
    // `true` or `"true"`, depending on the API version
    #[serde(default)]
    erro: Option<Value>,
}

impl ViaCepResponse {
    fn is_error(&self) -> bool {
        match &self.erro {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s == "true",
            _ => false,
        }
    }

    fn into_address(self) -> AddressInfo {
        let state = state_name_for_uf(&self.uf).map(str::to_string).unwrap_or(self.uf);
        AddressInfo {
            postal_code: format_cep(&self.cep),
            street: self.logradouro,
            neighborhood: self.bairro,
            city: self.localidade,
            state,
        }
    }
}

#[derive(Clone)]
pub struct ViaCepClient {
    base_url: String,
    client: Arc<Client>,
}

impl ViaCepClient {
    pub fn new(base_url: &str) -> Result<Self, AddressLookupError> {
        let client = Client::builder()
            .timeout(VIACEP_TIMEOUT)
            .build()
            .map_err(|e| AddressLookupError::Initialization(e.to_string()))?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), client: Arc::new(client) })
    }

    pub fn url(&self, cep: &str) -> String {
        format!("{}/{cep}/json/", self.base_url)
    }
}

impl AddressLookup for ViaCepClient {
    async fn lookup(&self, cep: &str) -> Result<Option<AddressInfo>, AddressLookupError> {
        let url = self.url(cep);
        trace!("📮️ Looking up postal code {cep}");
        let response = self.client.get(url).send().await.map_err(|e| AddressLookupError::Upstream(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            debug!("📮️ Postal code lookup for {cep} failed with {status}");
            return Err(AddressLookupError::Upstream(format!("ViaCEP returned {status}")));
        }
        let body =
            response.json::<ViaCepResponse>().await.map_err(|e| AddressLookupError::Upstream(e.to_string()))?;
        if body.is_error() {
            debug!("📮️ Postal code {cep} does not exist");
            return Ok(None);
        }
        Ok(Some(body.into_address()))
    }
}
