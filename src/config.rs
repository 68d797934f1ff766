//! Project-level configuration shared by enhancement, validation and the
//! built schema.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Environment variable that selects the runtime [`Environment`].
pub const ENVIRONMENT_VAR: &str = "MODGRAPH_ENV";

/// Runtime environment. Production redacts unexposed error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Read the environment from `MODGRAPH_ENV`, defaulting to development.
    pub fn from_env() -> Self {
        match std::env::var(ENVIRONMENT_VAR) {
            Ok(value) => Self::parse(&value).unwrap_or_default(),
            Err(_) => Environment::Development,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Some(Environment::Production),
            "development" | "dev" => Some(Environment::Development),
            _ => None,
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

/// Defaults for remote module fetchers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteConfig {
    /// Surrogate cache max-age (seconds) used when a module sets none.
    pub default_cache_max_age: u64,
    /// Lower bound for the surrogate cache max-age.
    pub min_cache_max_age: u64,
    /// HTTP client timeout for remote calls.
    pub timeout_seconds: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            default_cache_max_age: 60,
            min_cache_max_age: 10,
            timeout_seconds: 10,
        }
    }
}

/// Configuration of one project (a set of modules deployed together).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectConfig {
    pub environment: Environment,
    /// Endpoint of the function runtime. Modules may only declare a
    /// `runtime` when this is set.
    pub runtime_endpoint: Option<String>,
    /// Module id → settings exposed to remote modules as `${settings.*}`.
    pub module_settings: IndexMap<String, Value>,
    pub remote: RemoteConfig,
}

impl ProjectConfig {
    pub fn with_runtime_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.runtime_endpoint = Some(endpoint.into());
        self
    }

    pub fn settings_for(&self, module_id: &str) -> Value {
        self.module_settings
            .get(module_id)
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn environment_parse() {
        assert_eq!(Environment::parse("Production"), Some(Environment::Production));
        assert_eq!(Environment::parse("dev"), Some(Environment::Development));
        assert_eq!(Environment::parse("staging"), None);
    }

    #[test]
    fn project_config_defaults() {
        let config: ProjectConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert!(config.runtime_endpoint.is_none());
        assert_eq!(config.remote.default_cache_max_age, 60);
        assert_eq!(config.remote.min_cache_max_age, 10);
    }

    #[test]
    fn project_config_camel_case() {
        let config: ProjectConfig = serde_json::from_value(json!({
            "environment": "production",
            "runtimeEndpoint": "https://runtime.example.com",
            "moduleSettings": {"github": {"token": "abc"}},
            "remote": {"defaultCacheMaxAge": 120}
        }))
        .unwrap();
        assert!(config.environment.is_production());
        assert_eq!(config.settings_for("github"), json!({"token": "abc"}));
        assert_eq!(config.settings_for("other"), json!({}));
        assert_eq!(config.remote.default_cache_max_age, 120);
        assert_eq!(config.remote.timeout_seconds, 10);
    }
}
