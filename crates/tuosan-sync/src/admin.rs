//! Administrative credential check for the system reset.
//!
//! The lobby only exposes an unconditional `reset_system`. Sessions demand an
//! [`AdminToken`], which can only be obtained from [`AdminGate::authorize`].

use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdminError {
    #[error("Invalid admin credential")]
    InvalidCredential,
}

/// Constant-time comparison of a submitted credential with the secret
pub fn verify_credential(submitted: &str, secret: &str) -> bool {
    submitted.as_bytes().ct_eq(secret.as_bytes()).into()
}

/// Proof that an administrative credential was checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminToken {
    _private: (),
}

/// Holds the configured secret and hands out tokens
#[derive(Debug, Clone)]
pub struct AdminGate {
    secret: String,
}

impl AdminGate {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn authorize(&self, credential: &str) -> Result<AdminToken, AdminError> {
        if verify_credential(credential, &self.secret) {
            Ok(AdminToken { _private: () })
        } else {
            Err(AdminError::InvalidCredential)
        }
    }
}
