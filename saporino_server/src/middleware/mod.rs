mod admin_auth;
mod mp_signature;

pub use admin_auth::{AdminAuthMiddlewareFactory, AdminAuthMiddlewareService};
pub use mp_signature::{MpSignatureMiddlewareFactory, MpSignatureMiddlewareService, REQUEST_ID_HEADER, SIGNATURE_HEADER};
