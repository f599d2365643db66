//! Configuration structures
//!
//! Every field has a default pointing at the production portal, so a config
//! file or environment overrides are only needed to deviate from it (most
//! usefully in tests, which point the connector at a local mock server).

use serde::{Deserialize, Serialize};

/// Portal endpoints and login-flow constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Base URL of the OpenID Connect protocol endpoints.
    pub openid_url: String,
    /// Base URL of the appointment REST API.
    pub api_url: String,
    /// OAuth client id the portal's own front end uses.
    pub client_id: String,
    /// Redirect URI registered for that client.
    pub redirect_uri: String,
    /// Expected `<title>` of the login page; a mismatch means the portal
    /// changed and the login flow must not proceed.
    pub login_page_title: String,
    /// Exact feedback text the portal renders for rejected credentials.
    pub invalid_credentials_text: String,
    /// IANA name of the portal's timezone, used for booking zone offsets.
    pub timezone: String,
    pub http: HttpConfig,
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout applied to every portal call.
    pub timeout_seconds: u64,
    pub user_agent: Option<String>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            openid_url:
                "https://ciam.impfzentren.bayern/auth/realms/C19V-Citizen/protocol/openid-connect"
                    .to_string(),
            api_url: "https://impfzentren.bayern/api/v1".to_string(),
            client_id: "c19v-frontend".to_string(),
            redirect_uri: "https://impfzentren.bayern/citizen/".to_string(),
            login_page_title: "Anmeldung bei C19V-Citizen".to_string(),
            invalid_credentials_text: "Ungültiger Benutzername oder Passwort.".to_string(),
            timezone: "Europe/Berlin".to_string(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_seconds: 30, user_agent: None }
    }
}

impl PortalConfig {
    /// Authorization endpoint (GET, HTML login page).
    #[must_use]
    pub fn authorization_endpoint(&self) -> String {
        format!("{}/auth", self.openid_url)
    }

    /// Token endpoint (POST, JSON).
    #[must_use]
    pub fn token_endpoint(&self) -> String {
        format!("{}/token", self.openid_url)
    }

    /// Current-citizens endpoint (GET, JSON array).
    #[must_use]
    pub fn citizens_endpoint(&self) -> String {
        format!("{}/users/current/citizens", self.api_url)
    }

    /// A citizen's appointments collection (GET listing, POST booking).
    #[must_use]
    pub fn appointments_endpoint(&self, citizen_id: &str) -> String {
        format!("{}/citizens/{citizen_id}/appointments/", self.api_url)
    }

    /// A citizen's next-appointment probe endpoint (GET, JSON object).
    #[must_use]
    pub fn next_appointment_endpoint(&self, citizen_id: &str) -> String {
        format!("{}/citizens/{citizen_id}/appointments/next", self.api_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_production_portal() {
        let config = PortalConfig::default();
        assert!(config.authorization_endpoint().starts_with("https://ciam.impfzentren.bayern/"));
        assert!(config.authorization_endpoint().ends_with("/auth"));
        assert!(config.token_endpoint().ends_with("/token"));
        assert_eq!(config.client_id, "c19v-frontend");
        assert_eq!(config.http.timeout_seconds, 30);
    }

    #[test]
    fn appointment_endpoints_embed_the_citizen_id() {
        let config = PortalConfig::default();
        assert_eq!(
            config.next_appointment_endpoint("citizen_id"),
            "https://impfzentren.bayern/api/v1/citizens/citizen_id/appointments/next"
        );
        assert_eq!(
            config.appointments_endpoint("citizen_id"),
            "https://impfzentren.bayern/api/v1/citizens/citizen_id/appointments/"
        );
    }

    #[test]
    fn partial_config_files_fall_back_to_defaults() {
        let config: PortalConfig =
            serde_json::from_str(r#"{"api_url":"http://localhost:9000/api/v1"}"#)
                .expect("partial config");
        assert_eq!(config.api_url, "http://localhost:9000/api/v1");
        assert_eq!(config.client_id, "c19v-frontend");
    }
}
