//! # Authentication Module
//!
//! Three small pieces gate access to uploads and queries:
//!
//! - [`Credentials`]: the single configured login
//! - [`RememberMe`]: a signed, self-contained token that stays valid for 30 days
//! - [`Session`]: the per-caller "authenticated" flag, restorable from a remember-me token
//!
//! The signing secret is configuration passed in by the caller; nothing here reads globals.
pub mod credentials;
pub mod remember_me;
pub mod session;

pub use credentials::Credentials;
pub use remember_me::RememberMe;
pub use session::Session;

use subtle::ConstantTimeEq;
use thiserror::Error;

/// Errors specific to authentication
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Неверный логин или пароль")]
    InvalidCredentials,

    #[error("Remember-me secret cannot be used as a signing key")]
    SecretError,
}

/// Constant-time byte slice equality for secrets and signatures
pub(crate) fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    bool::from(a.ct_eq(b))
}
