use std::env;

use log::*;
use mercadopago_tools::MercadoPagoConfig;
use saporino_common::{parse_boolean_flag, Secret};

const DEFAULT_SPG_HOST: &str = "127.0.0.1";
const DEFAULT_SPG_PORT: u16 = 8360;
const DEFAULT_SPG_DATABASE_URL: &str = "sqlite://data/saporino.db";
const DEFAULT_SPG_SITE_URL: &str = "http://localhost:8360";
pub const DEFAULT_VIACEP_URL: &str = "https://viacep.com.br/ws";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The public origin of the storefront. The gateway sends shoppers back to `{site_url}/payment/...`.
    pub site_url: String,
    /// Bearer token for the `/admin` routes. When empty, every admin request is refused.
    pub admin_api_token: Secret<String>,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    pub mercadopago: MercadoPagoConfig,
    /// Base URL of the postal code lookup service.
    pub viacep_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SPG_HOST.to_string(),
            port: DEFAULT_SPG_PORT,
            database_url: DEFAULT_SPG_DATABASE_URL.to_string(),
            site_url: DEFAULT_SPG_SITE_URL.to_string(),
            admin_api_token: Secret::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            mercadopago: MercadoPagoConfig::default(),
            viacep_url: DEFAULT_VIACEP_URL.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SPG_HOST").ok().unwrap_or_else(|| DEFAULT_SPG_HOST.into());
        let port = env::var("SPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SPG_PORT. {e} Using the default, {DEFAULT_SPG_PORT}, instead."
                    );
                    DEFAULT_SPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SPG_PORT);
        let database_url = env::var("SPG_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SPG_DATABASE_URL is not set. Using {DEFAULT_SPG_DATABASE_URL}.");
            DEFAULT_SPG_DATABASE_URL.into()
        });
        let site_url = env::var("SPG_SITE_URL").ok().unwrap_or_else(|| {
            warn!(
                "🪛️ SPG_SITE_URL is not set. Shoppers will be sent back to {DEFAULT_SPG_SITE_URL} after paying, which \
                 is only useful in development."
            );
            DEFAULT_SPG_SITE_URL.into()
        });
        let admin_api_token = env::var("SPG_ADMIN_API_TOKEN").ok().filter(|s| !s.trim().is_empty()).unwrap_or_else(|| {
            warn!("🪛️ SPG_ADMIN_API_TOKEN is not set. The admin routes will refuse every request.");
            String::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("SPG_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("SPG_USE_FORWARDED").ok(), false);
        let viacep_url = env::var("VIACEP_URL").ok().unwrap_or_else(|| {
            debug!("🪛️ VIACEP_URL is not set. Using {DEFAULT_VIACEP_URL}.");
            DEFAULT_VIACEP_URL.into()
        });
        let mercadopago = MercadoPagoConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            site_url,
            admin_api_token: Secret::new(admin_api_token),
            use_x_forwarded_for,
            use_forwarded,
            mercadopago,
            viacep_url,
        }
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            use_x_forwarded_for: self.use_x_forwarded_for,
            use_forwarded: self.use_forwarded,
            site_url: self.site_url.clone(),
        }
    }
}

/// The subset of the configuration that route handlers need. Shared through `web::Data`.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
    pub site_url: String,
}

impl Default for ServerOptions {
    fn default() -> Self {
        ServerConfig::default().server_options()
    }
}
