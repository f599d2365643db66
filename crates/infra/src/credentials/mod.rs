//! Credential sources feeding the login flow

use std::path::PathBuf;

use async_trait::async_trait;
use impfbot_core::booking::ports::CredentialSource;
use impfbot_domain::{ImpfbotError, LoginPayload, Result};

/// Reads the login payload from a JSON file of string-to-string pairs.
pub struct FileCredentialSource {
    path: PathBuf,
}

impl FileCredentialSource {
    /// Create a source reading from the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for FileCredentialSource {
    fn default() -> Self {
        Self::new("credentials.json")
    }
}

#[async_trait]
impl CredentialSource for FileCredentialSource {
    async fn login_payload(&self) -> Result<LoginPayload> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|err| {
            ImpfbotError::Credentials(format!(
                "failed to read [{}]: {err}",
                self.path.display()
            ))
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            ImpfbotError::Credentials(format!(
                "malformed credentials in [{}]: {err}",
                self.path.display()
            ))
        })
    }
}

/// Holds a username/password pair supplied programmatically.
pub struct StaticCredentialSource {
    username: String,
    password: String,
}

impl StaticCredentialSource {
    /// Create a source for the given pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }
}

#[async_trait]
impl CredentialSource for StaticCredentialSource {
    async fn login_payload(&self) -> Result<LoginPayload> {
        Ok(LoginPayload::from([
            ("username".to_string(), self.username.clone()),
            ("password".to_string(), self.password.clone()),
        ]))
    }
}
