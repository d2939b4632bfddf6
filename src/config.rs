//! Configuration for the authorization core.
//!
//! Construction is explicit: build a [`CoreConfig`] at process start
//! and pass it into the components. Nothing here reads process-wide
//! state after startup, so tests can substitute values freely.

use serde::{Deserialize, Serialize};

/// Configuration for the identity-provider webhook endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookConfig {
    /// Shared secret used to verify event signatures.
    pub secret: String,
    /// Route the endpoint is mounted at.
    #[serde(default = "default_webhook_path")]
    pub path: String,
}

/// Configuration for the authorization and reconciliation core.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CoreConfig {
    /// Webhook settings; `None` disables the endpoint.
    pub webhook: Option<WebhookConfig>,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON formatted logs.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl CoreConfig {
    /// Load configuration from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `COACHWAY_WEBHOOK_SECRET`: enables the webhook endpoint
    /// - `COACHWAY_WEBHOOK_PATH`: overrides the endpoint route
    /// - `COACHWAY_LOG_LEVEL`, `COACHWAY_LOG_JSON`: logging settings
    #[must_use]
    pub fn from_env() -> Self {
        let webhook = std::env::var("COACHWAY_WEBHOOK_SECRET")
            .ok()
            .map(|secret| WebhookConfig {
                secret,
                path: std::env::var("COACHWAY_WEBHOOK_PATH")
                    .unwrap_or_else(|_| default_webhook_path()),
            });

        let logging = LoggingConfig {
            level: std::env::var("COACHWAY_LOG_LEVEL").unwrap_or_else(|_| default_log_level()),
            json: std::env::var("COACHWAY_LOG_JSON")
                .map(|v| v.parse().unwrap_or(false))
                .unwrap_or(false),
        };

        Self {
            webhook,
            logging,
        }
    }
}

fn default_webhook_path() -> String {
    "/webhooks/identity".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert!(config.webhook.is_none());
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_webhook_config_deserialization() {
        let config: WebhookConfig =
            serde_json::from_str(r#"{"secret": "whsec_x"}"#).unwrap();
        assert_eq!(config.secret, "whsec_x");
        assert_eq!(config.path, "/webhooks/identity");
    }

    // Both from_env cases live in one test so no parallel test sees
    // these variables half-set.
    #[test]
    fn test_from_env() {
        std::env::set_var("COACHWAY_WEBHOOK_SECRET", "whsec_env");
        std::env::set_var("COACHWAY_WEBHOOK_PATH", "/hooks/env");
        std::env::set_var("COACHWAY_LOG_LEVEL", "debug");
        std::env::set_var("COACHWAY_LOG_JSON", "true");

        let config = CoreConfig::from_env();

        std::env::remove_var("COACHWAY_WEBHOOK_SECRET");
        std::env::remove_var("COACHWAY_WEBHOOK_PATH");
        std::env::remove_var("COACHWAY_LOG_LEVEL");
        std::env::remove_var("COACHWAY_LOG_JSON");

        let webhook = config.webhook.expect("secret enables the webhook");
        assert_eq!(webhook.secret, "whsec_env");
        assert_eq!(webhook.path, "/hooks/env");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);

        let config = CoreConfig::from_env();
        assert!(config.webhook.is_none());
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }
}
