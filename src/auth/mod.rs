//! Bearer token validation: provider keys, the validator seam and the axum
//! middleware guarding the token route.

pub mod error;
pub mod identity;
pub mod keys;
pub mod middleware;
pub mod validator;

pub use error::AuthError;
pub use identity::UserIdentity;
pub use validator::{BearerValidator, TokenValidator};
