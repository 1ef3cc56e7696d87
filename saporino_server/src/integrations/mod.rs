//! Everything the server talks to besides its own database.
pub mod mercadopago;
pub mod notifications;
pub mod viacep;
