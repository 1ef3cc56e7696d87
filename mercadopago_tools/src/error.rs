use thiserror::Error;

#[derive(Debug, Error)]
pub enum MercadoPagoApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("The request to Mercado Pago timed out")]
    Timeout,
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl MercadoPagoApiError {
    /// Whether the same request could succeed if it is sent again later. Transport failures, timeouts, throttling and
    /// server-side errors are retryable. Client errors (bad token, malformed payload) are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::RestResponseError(_) => true,
            Self::QueryError { status, .. } => *status == 429 || *status >= 500,
            Self::Initialization(_) | Self::RestRequestError(_) | Self::JsonError(_) => false,
        }
    }
}

impl From<reqwest::Error> for MercadoPagoApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_builder() {
            Self::RestRequestError(e.to_string())
        } else if e.is_decode() {
            Self::JsonError(e.to_string())
        } else {
            Self::RestResponseError(e.to_string())
        }
    }
}
