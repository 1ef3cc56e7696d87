use std::{env, time::Duration};

use log::*;
use saporino_common::{parse_boolean_flag, Secret};

pub const DEFAULT_MERCADOPAGO_API_URL: &str = "https://api.mercadopago.com";
pub const DEFAULT_MERCADOPAGO_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct MercadoPagoConfig {
    /// Base URL of the REST API. Overridden in tests to point at a local stub.
    pub api_url: String,
    /// The private access token. Server-side only.
    pub access_token: Secret<String>,
    /// The public key, which is safe to hand to the browser to render the checkout widget.
    pub public_key: String,
    /// Secret used to sign webhook notifications (the `x-signature` header).
    pub webhook_secret: Secret<String>,
    /// When false, webhook signatures are not checked.
    pub signature_checks: bool,
    /// Upper bound on every call to the gateway.
    pub timeout: Duration,
}

impl Default for MercadoPagoConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_MERCADOPAGO_API_URL.to_string(),
            access_token: Secret::default(),
            public_key: String::default(),
            webhook_secret: Secret::default(),
            signature_checks: false,
            timeout: DEFAULT_MERCADOPAGO_TIMEOUT,
        }
    }
}

impl MercadoPagoConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = env::var("MERCADOPAGO_API_URL").unwrap_or_else(|_| {
            debug!("💳️ MERCADOPAGO_API_URL not set, using {DEFAULT_MERCADOPAGO_API_URL}");
            DEFAULT_MERCADOPAGO_API_URL.to_string()
        });
        let access_token = Secret::new(env::var("MERCADOPAGO_ACCESS_TOKEN").unwrap_or_else(|_| {
            warn!("💳️ MERCADOPAGO_ACCESS_TOKEN not set. Payment preferences cannot be created without it.");
            String::default()
        }));
        let public_key = env::var("MERCADOPAGO_PUBLIC_KEY").unwrap_or_else(|_| {
            warn!("💳️ MERCADOPAGO_PUBLIC_KEY not set. The checkout widget will not render.");
            String::default()
        });
        let webhook_secret = env::var("MERCADOPAGO_WEBHOOK_SECRET").ok();
        let signature_checks =
            parse_boolean_flag(env::var("MERCADOPAGO_SIGNATURE_CHECKS").ok(), webhook_secret.is_some());
        if signature_checks && webhook_secret.is_none() {
            warn!(
                "🚨️ MERCADOPAGO_SIGNATURE_CHECKS is on, but MERCADOPAGO_WEBHOOK_SECRET is not set. Every webhook call \
                 will be rejected."
            );
        }
        if !signature_checks {
            info!("💳️ Webhook signature checks are disabled.");
        }
        let timeout = env::var("MERCADOPAGO_TIMEOUT_SECS")
            .map_err(|_| {
                debug!(
                    "💳️ MERCADOPAGO_TIMEOUT_SECS is not set. Using the default of {}s.",
                    DEFAULT_MERCADOPAGO_TIMEOUT.as_secs()
                )
            })
            .and_then(|s| {
                s.parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|e| warn!("💳️ Invalid configuration value for MERCADOPAGO_TIMEOUT_SECS. {e}"))
            })
            .ok()
            .unwrap_or(DEFAULT_MERCADOPAGO_TIMEOUT);
        Self {
            api_url,
            access_token,
            public_key,
            webhook_secret: Secret::new(webhook_secret.unwrap_or_default()),
            signature_checks,
            timeout,
        }
    }
}
