mod centavos;
mod helpers;

pub mod op;
mod secret;

pub use centavos::{Centavos, CentavosConversionError, BRL_CURRENCY_CODE};
pub use helpers::parse_boolean_flag;
pub use secret::Secret;
