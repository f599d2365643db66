//! Authentication value produced by the login flow

use serde::{Deserialize, Serialize};

use crate::errors::{ImpfbotError, Result};

/// Bearer credential pair for the portal API.
///
/// Produced by the token exchange after a successful login, or reconstructed
/// from a previously stored access token (e.g. a client-held web session).
/// Owned by the caller; a connector only ever borrows it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Authentication {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl Authentication {
    /// Create an authentication from a token pair.
    #[must_use]
    pub const fn new(access_token: String, refresh_token: Option<String>) -> Self {
        Self { access_token, refresh_token }
    }

    /// Restore an authentication from a bare access token.
    ///
    /// Used when only the access token survived (a stored session); such an
    /// authentication cannot be refreshed.
    #[must_use]
    pub fn from_access_token(access_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token: None }
    }
}

/// Token endpoint response for both the `authorization_code` and
/// `refresh_token` grants.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token_type: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    /// Convert into an [`Authentication`].
    ///
    /// The portal only ever issues bearer tokens; any other `token_type`
    /// means its token contract changed.
    pub fn into_authentication(self) -> Result<Authentication> {
        if self.token_type != "Bearer" {
            return Err(ImpfbotError::Contract(format!(
                "token endpoint returned token_type [{}], expected [Bearer]",
                self.token_type
            )));
        }
        Ok(Authentication::new(self.access_token, self.refresh_token))
    }
}
