use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use saporino_engine::{db_types::OrderId, CatalogApiError, OrderFlowError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request conflicts with the current state of the order. {0}")]
    OrderConflict(String),
    #[error("The payment gateway is unavailable. Please try again. {1}")]
    PaymentGatewayUnavailable(OrderId, String),
    #[error("The payment gateway refused the request. {1}")]
    PaymentGatewayRejected(OrderId, String),
    #[error("An upstream service failed. {0}")]
    UpstreamError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::OrderConflict(_) => StatusCode::CONFLICT,
            Self::PaymentGatewayUnavailable(..) => StatusCode::SERVICE_UNAVAILABLE,
            Self::PaymentGatewayRejected(..) => StatusCode::BAD_GATEWAY,
            Self::UpstreamError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Gateway failures leave a pending order behind. The client needs its id to retry.
        let body = match self {
            Self::PaymentGatewayUnavailable(order_id, _) => {
                json!({ "error": self.to_string(), "order_id": order_id.as_str(), "retryable": true })
            },
            Self::PaymentGatewayRejected(order_id, _) => {
                json!({ "error": self.to_string(), "order_id": order_id.as_str(), "retryable": false })
            },
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::DatabaseError(s) => {
                error!("💻️ Database error: {s}");
                Self::BackendError(format!("Database error: {s}"))
            },
            OrderFlowError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::Validation(s) => Self::InvalidRequestBody(s),
            OrderFlowError::EmptyCart => Self::InvalidRequestBody(e.to_string()),
            OrderFlowError::OrderNotPending(..) => Self::OrderConflict(e.to_string()),
            OrderFlowError::OrderModificationNoOp => Self::InvalidRequestBody(e.to_string()),
        }
    }
}

impl From<CatalogApiError> for ServerError {
    fn from(e: CatalogApiError) -> Self {
        match e {
            CatalogApiError::DatabaseError(s) => {
                error!("💻️ Database error: {s}");
                Self::BackendError(format!("Database error: {s}"))
            },
            CatalogApiError::ProductNotFound(_) => Self::NoRecordFound(e.to_string()),
            CatalogApiError::ProductUnavailable(_)
            | CatalogApiError::InvalidPrice(_)
            | CatalogApiError::InvalidQuantity { .. }
            | CatalogApiError::CartTotalTooLarge => Self::InvalidRequestBody(e.to_string()),
        }
    }
}
