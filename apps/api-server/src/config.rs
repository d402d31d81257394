//! Centralized configuration for api-server.
//!
//! All environment variables are loaded and validated at startup to fail fast
//! on misconfiguration rather than at request time.

use axum::http::HeaderValue;
use std::env;
use std::fmt;

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Parse a boolean flag. `None` means the value is not recognised.
fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields are validated at construction time.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3001)
    pub port: u16,
    /// CORS allow origin, from FRONTEND_URL (default: `*`)
    pub cors_allow_origin: HeaderValue,
    /// Log format
    pub log_format: LogFormat,
    /// Load demo profiles and users at startup (default: true)
    pub seed_data: bool,
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// Fails fast on invalid configuration.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Port
        let port = match env::var("PORT") {
            Ok(s) => s.trim().parse::<u16>().map_err(|_| ConfigError {
                field: "PORT",
                message: format!("'{}' is not a valid port number", s),
            })?,
            Err(_) => 3001,
        };

        // CORS allow origin
        let cors_origin_str = env::var("FRONTEND_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "*".into());
        let cors_allow_origin = if cors_origin_str == "*" {
            HeaderValue::from_static("*")
        } else {
            HeaderValue::from_str(&cors_origin_str).map_err(|e| ConfigError {
                field: "FRONTEND_URL",
                message: format!("Invalid header value '{}': {}", cors_origin_str, e),
            })?
        };

        // Log format
        let log_format =
            LogFormat::from_str(&env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".into()));

        // Seed data
        let seed_data = match env::var("SEED_DATA") {
            Ok(s) => parse_flag(&s).ok_or_else(|| ConfigError {
                field: "SEED_DATA",
                message: format!("'{}' is not a boolean (use true/false)", s),
            })?,
            Err(_) => true,
        };

        Ok(Self {
            port,
            cors_allow_origin,
            log_format,
            seed_data,
        })
    }

    /// Whether CORS accepts any origin.
    pub fn cors_is_permissive(&self) -> bool {
        self.cors_allow_origin == HeaderValue::from_static("*")
    }

    /// Log a note about configuration choices that surprise people.
    pub fn log_summary(&self) {
        if self.cors_is_permissive() {
            tracing::warn!(
                "FRONTEND_URL not set: CORS accepts requests from any origin. \
                 Set FRONTEND_URL to the admin frontend origin."
            );
        }
        if !self.seed_data {
            tracing::info!("SEED_DATA disabled: starting with empty stores");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parsing() {
        assert_eq!(LogFormat::from_str("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_str("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str("anything"), LogFormat::Pretty);
    }

    #[test]
    fn flag_parsing() {
        assert_eq!(parse_flag("true"), Some(true));
        assert_eq!(parse_flag("YES"), Some(true));
        assert_eq!(parse_flag(" 1 "), Some(true));
        assert_eq!(parse_flag("false"), Some(false));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
        assert_eq!(parse_flag(""), None);
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError {
            field: "PORT",
            message: "'abc' is not a valid port number".into(),
        };
        assert_eq!(
            err.to_string(),
            "Configuration error for PORT: 'abc' is not a valid port number"
        );
    }
}
