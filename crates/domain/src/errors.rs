//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for impfbot.
///
/// The first four variants are the portal failure taxonomy: a credentials
/// rejection is recoverable by asking for new credentials, a generic login
/// rejection carries the portal's own error text, a 401 after a previously
/// authenticated session signals that the caller should refresh or re-login,
/// and a contract violation means the portal changed shape underneath us and
/// nothing short of a code change will help. None of them are retried.
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ImpfbotError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("login rejected by the portal: {0}")]
    LoginRejected(String),

    #[error("authentication refresh needed (HTTP {status}): {body}")]
    RefreshNeeded { status: u16, body: String },

    #[error("portal contract violation: {0}")]
    Contract(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credential source error: {0}")]
    Credentials(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for impfbot operations
pub type Result<T> = std::result::Result<T, ImpfbotError>;
