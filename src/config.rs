//! Connection settings for the Iron.io API.
//!
//! Settings are resolved per field from the provider configuration block,
//! then from `IRON_*` environment variables, then from built-in defaults.

use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::schema::{Attribute, Diagnostic, Schema};

/// Default API scheme.
pub const DEFAULT_SCHEME: &str = "https";
/// Default API host.
pub const DEFAULT_HOST: &str = "worker-aws-us-east-1.iron.io";
/// Default API port.
pub const DEFAULT_PORT: u16 = 443;
/// Default API version path segment.
pub const DEFAULT_API_VERSION: &str = "2";

/// Connection settings threaded through every resource operation.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    /// URL scheme, usually `https`.
    pub scheme: String,
    /// API host name.
    pub host: String,
    /// API port.
    pub port: u16,
    /// API version, used as the first path segment.
    pub api_version: String,
    /// OAuth token sent with every request.
    pub token: String,
    /// Project the credentials belong to.
    pub project_id: String,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Optional per-request timeout for the HTTP transport.
    pub timeout: Option<Duration>,
}

// Keeps the token out of logs and panic messages.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_version", &self.api_version)
            .field("token", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            api_version: DEFAULT_API_VERSION.to_string(),
            token: String::new(),
            project_id: String::new(),
            user_agent: default_user_agent(),
            timeout: None,
        }
    }
}

/// Raw provider configuration block, as declared by the user.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProviderConfig {
    token: Option<String>,
    project_id: Option<String>,
    host: Option<String>,
    scheme: Option<String>,
    port: Option<u16>,
    api_version: Option<String>,
    user_agent: Option<String>,
    timeout_secs: Option<u64>,
}

impl Settings {
    /// Schema of the provider configuration block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "token",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("OAuth token. Falls back to IRON_TOKEN."),
            )
            .with_attribute(
                "project_id",
                Attribute::optional_string()
                    .with_description("Project ID. Falls back to IRON_PROJECT_ID."),
            )
            .with_attribute(
                "host",
                Attribute::optional_string().with_description("API host. Falls back to IRON_HOST."),
            )
            .with_attribute(
                "scheme",
                Attribute::optional_string()
                    .with_description("URL scheme. Falls back to IRON_SCHEME."),
            )
            .with_attribute(
                "port",
                Attribute::optional_int64().with_description("API port. Falls back to IRON_PORT."),
            )
            .with_attribute(
                "api_version",
                Attribute::optional_string()
                    .with_description("API version. Falls back to IRON_API_VERSION."),
            )
            .with_attribute(
                "user_agent",
                Attribute::optional_string().with_description("User-Agent header value."),
            )
            .with_attribute(
                "timeout_secs",
                Attribute::optional_int64().with_description("Per-request timeout in seconds."),
            )
    }

    /// Resolve settings from a provider configuration block and the process environment.
    pub fn from_config(config: &Value) -> Result<Self, Vec<Diagnostic>> {
        Self::from_config_with_env(config, |key| std::env::var(key).ok())
    }

    /// Resolve settings using `env` to look up `IRON_*` variables.
    ///
    /// The configuration block wins over the environment, which wins over
    /// the defaults. The token has no default; a missing token is an error.
    pub fn from_config_with_env<F>(config: &Value, env: F) -> Result<Self, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config: ProviderConfig = if config.is_null() {
            ProviderConfig::default()
        } else {
            serde_json::from_value(config.clone()).map_err(|e| {
                vec![Diagnostic::error("Invalid provider configuration").with_detail(e.to_string())]
            })?
        };

        let mut diagnostics = Vec::new();
        let defaults = Settings::default();

        let port = match config.port {
            Some(port) => port,
            None => match env("IRON_PORT") {
                Some(raw) => raw.trim().parse::<u16>().unwrap_or_else(|_| {
                    diagnostics.push(
                        Diagnostic::error("Invalid port")
                            .with_detail(format!("IRON_PORT is not a valid port: {:?}", raw))
                            .with_attribute("port"),
                    );
                    defaults.port
                }),
                None => defaults.port,
            },
        };

        // Zero would make every request time out immediately.
        if config.timeout_secs == Some(0) {
            diagnostics.push(
                Diagnostic::error("Invalid timeout")
                    .with_detail("timeout_secs must be at least 1; omit it for no timeout")
                    .with_attribute("timeout_secs"),
            );
        }

        let token = config
            .token
            .or_else(|| env("IRON_TOKEN"))
            .filter(|t| !t.is_empty());
        if token.is_none() {
            diagnostics.push(
                Diagnostic::error("Missing API token")
                    .with_detail("Set `token` in the provider block or the IRON_TOKEN variable")
                    .with_attribute("token"),
            );
        }

        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }

        Ok(Self {
            scheme: config
                .scheme
                .or_else(|| env("IRON_SCHEME"))
                .unwrap_or(defaults.scheme),
            host: config
                .host
                .or_else(|| env("IRON_HOST"))
                .unwrap_or(defaults.host),
            port,
            api_version: config
                .api_version
                .or_else(|| env("IRON_API_VERSION"))
                .unwrap_or(defaults.api_version),
            token: token.unwrap_or_default(),
            project_id: config
                .project_id
                .or_else(|| env("IRON_PROJECT_ID"))
                .unwrap_or_default(),
            user_agent: config.user_agent.unwrap_or(defaults.user_agent),
            timeout: config.timeout_secs.map(Duration::from_secs),
        })
    }

    /// Base URL of the API: `<scheme>://<host>:<port>/<api-version>`.
    pub fn base_url(&self) -> String {
        format!(
            "{}://{}:{}/{}",
            self.scheme, self.host, self.port, self.api_version
        )
    }
}

fn default_user_agent() -> String {
    format!("hemmer-provider-ironio/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_token() {
        let settings =
            Settings::from_config_with_env(&json!({"token": "t0k"}), env_from(&[])).unwrap();
        assert_eq!(settings.scheme, "https");
        assert_eq!(settings.host, DEFAULT_HOST);
        assert_eq!(settings.port, 443);
        assert_eq!(settings.api_version, "2");
        assert_eq!(settings.token, "t0k");
        assert!(settings.user_agent.starts_with("hemmer-provider-ironio/"));
        assert!(settings.timeout.is_none());
    }

    #[test]
    fn test_config_overrides_env() {
        let env = env_from(&[
            ("IRON_TOKEN", "env-token"),
            ("IRON_HOST", "env.example.com"),
            ("IRON_PORT", "8080"),
            ("IRON_PROJECT_ID", "env-project"),
        ]);
        let settings = Settings::from_config_with_env(
            &json!({"host": "cfg.example.com", "timeout_secs": 30}),
            env,
        )
        .unwrap();

        assert_eq!(settings.host, "cfg.example.com");
        assert_eq!(settings.token, "env-token");
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.project_id, "env-project");
        assert_eq!(settings.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_missing_token() {
        let diagnostics = Settings::from_config_with_env(&Value::Null, env_from(&[])).unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("token".to_string()));

        let diagnostics =
            Settings::from_config_with_env(&json!({"token": ""}), env_from(&[])).unwrap_err();
        assert_eq!(diagnostics[0].summary, "Missing API token");
    }

    #[test]
    fn test_bad_env_port() {
        let env = env_from(&[("IRON_TOKEN", "t"), ("IRON_PORT", "https")]);
        let diagnostics = Settings::from_config_with_env(&json!({}), env).unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("port".to_string()));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let diagnostics = Settings::from_config_with_env(
            &json!({"token": "t", "timeout_secs": 0}),
            env_from(&[]),
        )
        .unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("timeout_secs".to_string()));
    }

    #[test]
    fn test_wrong_shape_is_diagnostic() {
        let diagnostics =
            Settings::from_config_with_env(&json!({"port": "eighty"}), env_from(&[])).unwrap_err();
        assert_eq!(diagnostics[0].summary, "Invalid provider configuration");
    }

    #[test]
    fn test_base_url_keeps_default_port() {
        let settings = Settings {
            host: "api.iron.test".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.base_url(), "https://api.iron.test:443/2");
    }

    #[test]
    fn test_debug_redacts_token() {
        let settings = Settings {
            token: "super-secret".to_string(),
            ..Settings::default()
        };
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
