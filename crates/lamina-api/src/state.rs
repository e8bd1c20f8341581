//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor, plus the environment-driven configuration read
//! once at startup.
//!
//! The state owns the description cache explicitly; there is no ambient
//! global. Routes that serve the description reach it through `AppState`.

use std::sync::Arc;

use lamina_core::Partitioner;

use crate::openapi::SchemaCache;

/// Deployment environment, from the `ENV` variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Anything other than `dev` or `prod`, including an unset variable.
    #[default]
    Local,
    Dev,
    Prod,
}

impl Environment {
    fn parse(raw: &str) -> Self {
        match raw {
            "dev" => Self::Dev,
            "prod" => Self::Prod,
            _ => Self::Local,
        }
    }

    /// Whether the transport's own failure logging is silenced in favor of
    /// the gateway's normalized error logging.
    pub fn silences_transport_errors(self) -> bool {
        matches!(self, Self::Dev | Self::Prod)
    }
}

/// Application configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port the server binds to.
    pub port: u16,
    /// Deployment environment.
    pub env: Environment,
    /// Origin allow-list enabling the CORS gate. `None` means the gate is
    /// not installed and no cross-origin headers are added at all.
    pub allowed_origins: Option<Vec<String>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            env: Environment::Local,
            allowed_origins: None,
        }
    }
}

impl AppConfig {
    /// Build configuration from the process environment.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8000);
        let env = Environment::parse(&std::env::var("ENV").unwrap_or_default());
        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .ok()
            .and_then(|raw| parse_allowed_origins(&raw));
        Self {
            port,
            env,
            allowed_origins,
        }
    }
}

/// Parse the comma-separated origin allow-list.
///
/// An empty or whitespace-only value disables the gate, same as an unset
/// variable.
pub fn parse_allowed_origins(raw: &str) -> Option<Vec<String>> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if origins.is_empty() {
        None
    } else {
        Some(origins)
    }
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// External partitioning backend. `None` means the partition operation
    /// answers 503 until an embedding application supplies one.
    pub partitioner: Option<Arc<dyn Partitioner>>,
    /// Process-lifetime holder for the synthesized API description.
    pub schema: Arc<SchemaCache>,
}

impl AppState {
    /// Create state with default configuration and no backend.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// Create state with explicit configuration and an optional backend.
    pub fn with_config(config: AppConfig, partitioner: Option<Arc<dyn Partitioner>>) -> Self {
        Self {
            config,
            partitioner,
            schema: Arc::new(SchemaCache::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_binds_port_8000_without_cors() {
        let config = AppConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.env, Environment::Local);
        assert!(config.allowed_origins.is_none());
    }

    #[test]
    fn environment_parses_known_names() {
        assert_eq!(Environment::parse("dev"), Environment::Dev);
        assert_eq!(Environment::parse("prod"), Environment::Prod);
        assert_eq!(Environment::parse("staging"), Environment::Local);
        assert_eq!(Environment::parse(""), Environment::Local);
    }

    #[test]
    fn transport_errors_silenced_in_dev_and_prod_only() {
        assert!(Environment::Dev.silences_transport_errors());
        assert!(Environment::Prod.silences_transport_errors());
        assert!(!Environment::Local.silences_transport_errors());
    }

    #[test]
    fn origin_list_splits_on_commas() {
        let origins = parse_allowed_origins("https://a.com,https://b.com").unwrap();
        assert_eq!(origins, vec!["https://a.com", "https://b.com"]);
    }

    #[test]
    fn origin_list_trims_and_drops_empty_entries() {
        let origins = parse_allowed_origins(" https://a.com , ,https://b.com,").unwrap();
        assert_eq!(origins, vec!["https://a.com", "https://b.com"]);
    }

    #[test]
    fn empty_origin_list_disables_the_gate() {
        assert!(parse_allowed_origins("").is_none());
        assert!(parse_allowed_origins("  ,  ").is_none());
    }

    #[test]
    fn app_state_new_has_no_backend() {
        let state = AppState::new();
        assert!(state.partitioner.is_none());
    }
}
