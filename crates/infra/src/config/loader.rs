//! Configuration loader
//!
//! Layers three sources, weakest first:
//! 1. Built-in defaults (the production portal)
//! 2. An optional config file (JSON or TOML, detected by extension)
//! 3. `IMPFBOT_*` environment variables
//!
//! ## Environment Variables
//! - `IMPFBOT_OPENID_URL`: OpenID Connect protocol base URL
//! - `IMPFBOT_API_URL`: Appointment API base URL
//! - `IMPFBOT_CLIENT_ID`: OAuth client id
//! - `IMPFBOT_REDIRECT_URI`: Registered redirect URI
//! - `IMPFBOT_TIMEZONE`: Portal timezone (IANA name)
//! - `IMPFBOT_HTTP_TIMEOUT_SECONDS`: Per-request timeout
//! - `IMPFBOT_USER_AGENT`: User agent header
//!
//! ## File Locations
//! When no explicit path is given, the loader probes (in order):
//! 1. `./config.json` or `./config.toml`
//! 2. `./impfbot.json` or `./impfbot.toml`
//! 3. The same names relative to the executable location

use std::path::{Path, PathBuf};

use impfbot_domain::{ImpfbotError, PortalConfig, Result};

/// Load configuration with the full layering strategy.
///
/// # Errors
/// Returns `ImpfbotError::Config` if:
/// - An explicitly given file does not exist or cannot be parsed
/// - An environment variable has an invalid value
pub fn load(path: Option<PathBuf>) -> Result<PortalConfig> {
    let mut config = match path {
        Some(p) => load_from_file(&p)?,
        None => match probe_config_paths() {
            Some(p) => load_from_file(&p)?,
            None => {
                tracing::debug!("no config file found, using built-in defaults");
                PortalConfig::default()
            }
        },
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Load configuration from a file.
///
/// Supports both JSON and TOML formats (detected by file extension). Missing
/// fields fall back to the built-in defaults.
///
/// # Errors
/// Returns `ImpfbotError::Config` if the file is missing, its format is
/// unsupported, or parsing fails.
pub fn load_from_file(path: &Path) -> Result<PortalConfig> {
    if !path.exists() {
        return Err(ImpfbotError::Config(format!("config file not found: {}", path.display())));
    }

    tracing::info!(path = %path.display(), "loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|err| ImpfbotError::Config(format!("failed to read config file: {err}")))?;

    parse_config(&contents, path)
}

fn parse_config(contents: &str, path: &Path) -> Result<PortalConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|err| ImpfbotError::Config(format!("invalid TOML format: {err}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|err| ImpfbotError::Config(format!("invalid JSON format: {err}"))),
        _ => Err(ImpfbotError::Config(format!("unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend([
            cwd.join("config.json"),
            cwd.join("config.toml"),
            cwd.join("impfbot.json"),
            cwd.join("impfbot.toml"),
        ]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend([
                exe_dir.join("config.json"),
                exe_dir.join("config.toml"),
                exe_dir.join("impfbot.json"),
                exe_dir.join("impfbot.toml"),
            ]);
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn apply_env_overrides(config: &mut PortalConfig) -> Result<()> {
    if let Ok(value) = std::env::var("IMPFBOT_OPENID_URL") {
        config.openid_url = value;
    }
    if let Ok(value) = std::env::var("IMPFBOT_API_URL") {
        config.api_url = value;
    }
    if let Ok(value) = std::env::var("IMPFBOT_CLIENT_ID") {
        config.client_id = value;
    }
    if let Ok(value) = std::env::var("IMPFBOT_REDIRECT_URI") {
        config.redirect_uri = value;
    }
    if let Ok(value) = std::env::var("IMPFBOT_TIMEZONE") {
        config.timezone = value;
    }
    if let Ok(value) = std::env::var("IMPFBOT_USER_AGENT") {
        config.http.user_agent = Some(value);
    }
    if let Ok(value) = std::env::var("IMPFBOT_HTTP_TIMEOUT_SECONDS") {
        config.http.timeout_seconds = value.parse().map_err(|err| {
            ImpfbotError::Config(format!("invalid IMPFBOT_HTTP_TIMEOUT_SECONDS [{value}]: {err}"))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ENV_VARS: &[&str] = &[
        "IMPFBOT_OPENID_URL",
        "IMPFBOT_API_URL",
        "IMPFBOT_CLIENT_ID",
        "IMPFBOT_REDIRECT_URI",
        "IMPFBOT_TIMEZONE",
        "IMPFBOT_USER_AGENT",
        "IMPFBOT_HTTP_TIMEOUT_SECONDS",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let config = load(None).expect("defaults");
        assert_eq!(config.client_id, "c19v-frontend");
        assert_eq!(config.http.timeout_seconds, 30);
    }

    #[test]
    fn env_overrides_win_over_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("IMPFBOT_API_URL", "http://localhost:9000/api/v1");
        std::env::set_var("IMPFBOT_HTTP_TIMEOUT_SECONDS", "5");

        let config = load(None).expect("env config");
        assert_eq!(config.api_url, "http://localhost:9000/api/v1");
        assert_eq!(config.http.timeout_seconds, 5);
        // Untouched fields keep their defaults.
        assert_eq!(config.client_id, "c19v-frontend");

        clear_env();
    }

    #[test]
    fn an_unparseable_timeout_is_a_config_error() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("IMPFBOT_HTTP_TIMEOUT_SECONDS", "soon");

        let result = load(None);
        assert!(matches!(result, Err(ImpfbotError::Config(_))));

        clear_env();
    }

    #[test]
    fn loads_a_json_file() {
        let json_content = r#"{
            "api_url": "http://localhost:9000/api/v1",
            "http": {"timeout_seconds": 10}
        }"#;

        let mut temp_file = NamedTempFile::new().expect("temp file");
        temp_file.write_all(json_content.as_bytes()).expect("write");
        let path = temp_file.path().with_extension("json");
        std::fs::copy(temp_file.path(), &path).expect("copy");

        let config = load_from_file(&path).expect("json config");
        assert_eq!(config.api_url, "http://localhost:9000/api/v1");
        assert_eq!(config.http.timeout_seconds, 10);
        assert_eq!(config.client_id, "c19v-frontend");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn loads_a_toml_file() {
        let toml_content = r#"
client_id = "test-client"
timezone = "Europe/Vienna"

[http]
timeout_seconds = 3
"#;

        let mut temp_file = NamedTempFile::new().expect("temp file");
        temp_file.write_all(toml_content.as_bytes()).expect("write");
        let path = temp_file.path().with_extension("toml");
        std::fs::copy(temp_file.path(), &path).expect("copy");

        let config = load_from_file(&path).expect("toml config");
        assert_eq!(config.client_id, "test-client");
        assert_eq!(config.timezone, "Europe/Vienna");
        assert_eq!(config.http.timeout_seconds, 3);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn a_missing_explicit_file_is_a_config_error() {
        let result = load_from_file(Path::new("/nonexistent/config.json"));
        assert!(matches!(result, Err(ImpfbotError::Config(_))));
    }

    #[test]
    fn an_unsupported_extension_is_a_config_error() {
        let result = parse_config("anything", Path::new("config.yaml"));
        assert!(matches!(result, Err(ImpfbotError::Config(_))));
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        let result = parse_config(r#"{"api_url": }"#, Path::new("config.json"));
        assert!(matches!(result, Err(ImpfbotError::Config(_))));
    }
}
