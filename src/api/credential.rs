//! API key handling.
//!
//! The key is held in memory only, zeroed on drop, and never printed in full.

use std::fmt;

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Header carrying the API key on every request.
pub const API_KEY_HEADER: &str = "x-msp-api-key";

/// Conventional prefix of issued API keys. Not enforced.
pub const API_KEY_PREFIX: &str = "msp_";

#[derive(Debug, Error, PartialEq)]
pub enum CredentialError {
    #[error("No API key provided")]
    Empty,
}

/// Opaque API key attached to every request.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    secret: String,
}

impl Credential {
    /// Wrap an API key. Surrounding whitespace is stripped.
    ///
    /// Keys without the `msp_` prefix are accepted with a warning; the server
    /// is the only judge of validity.
    pub fn new(raw: &str) -> Result<Self, CredentialError> {
        let secret = raw.trim();
        if secret.is_empty() {
            return Err(CredentialError::Empty);
        }
        let credential = Self {
            secret: secret.to_string(),
        };
        if !credential.has_conventional_prefix() {
            log::warn!("API key doesn't start with '{}'", API_KEY_PREFIX);
        }
        Ok(credential)
    }

    pub fn has_conventional_prefix(&self) -> bool {
        self.secret.starts_with(API_KEY_PREFIX)
    }

    /// Raw key, for building the request header only.
    pub fn expose(&self) -> &str {
        &self.secret
    }

    /// First 12 and last 4 characters, e.g. `msp_live_abc...wxyz`.
    ///
    /// Keys too short to mask meaningfully are fully hidden.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.secret.chars().collect();
        if chars.len() <= 16 {
            return "*".repeat(chars.len());
        }
        let head: String = chars[..12].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}
