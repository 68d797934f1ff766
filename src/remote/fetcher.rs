//! HTTP transport of a stitched module.
//!
//! Transport failures never surface as Rust errors: the fetcher answers with
//! a GraphQL error envelope so the caller handles them like any remote error.

#[cfg(feature = "remote")]
use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::ProjectConfig;
use crate::error::RemoteModuleError;
use crate::schema::RequestInfo;
use crate::types::RemoteModuleConfig;
use crate::utils::deep_replace_variables;

/// Body of a remote GraphQL request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRequest {
    pub query: String,
    pub variables: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl RemoteRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: json!({}),
            operation_name: None,
        }
    }
}

/// `{"data": null, "errors": [{"message": ..}]}`
pub fn error_envelope(message: impl Into<String>) -> Value {
    json!({ "data": null, "errors": [{ "message": message.into() }] })
}

#[derive(Debug, Clone)]
pub struct RemoteFetcher {
    module_id: String,
    config: RemoteModuleConfig,
    /// Module settings of the project the module was built for.
    settings: Value,
    max_age: u64,
    #[cfg(feature = "remote")]
    client: reqwest::Client,
}

impl RemoteFetcher {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(
        module_id: impl Into<String>,
        config: RemoteModuleConfig,
        project: &ProjectConfig,
    ) -> Result<Self, RemoteModuleError> {
        let module_id = module_id.into();
        let max_age = config
            .cache
            .and_then(|cache| cache.max_age)
            .unwrap_or(project.remote.default_cache_max_age)
            .max(project.remote.min_cache_max_age);

        #[cfg(feature = "remote")]
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(project.remote.timeout_seconds))
            .build()
            .map_err(|source| RemoteModuleError::Client {
                module: module_id.clone(),
                source,
            })?;

        Ok(Self {
            settings: project.settings_for(&module_id),
            module_id,
            config,
            max_age,
            #[cfg(feature = "remote")]
            client,
        })
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    /// Surrogate cache max-age in seconds.
    pub fn max_age(&self) -> u64 {
        self.max_age
    }

    /// Value of the `surrogate-control` response header.
    pub fn cache_control(&self) -> String {
        format!("max-age={}", self.max_age)
    }

    /// Endpoint and headers with `${settings.*}` and `${request.*}`
    /// placeholders resolved. `settings` overrides the project settings.
    pub fn resolve_config(&self, request: &RequestInfo, settings: Option<&Value>) -> RemoteModuleConfig {
        let scope = json!({
            "settings": settings.unwrap_or(&self.settings),
            "request": request.to_value(),
        });
        let source = json!({
            "endpoint": self.config.endpoint,
            "headers": self.config.headers,
        });
        let resolved = deep_replace_variables(&source, &scope);

        let headers = resolved["headers"]
            .as_object()
            .map(|headers| {
                headers
                    .iter()
                    .filter_map(|(name, value)| Some((name.clone(), value.as_str()?.to_string())))
                    .collect()
            })
            .unwrap_or_else(IndexMap::new);

        RemoteModuleConfig {
            endpoint: resolved["endpoint"].as_str().unwrap_or_default().to_string(),
            headers,
            cache: self.config.cache,
        }
    }

    /// Run `request` against the remote endpoint and return the response body.
    pub async fn fetch(
        &self,
        request: &RemoteRequest,
        info: &RequestInfo,
        settings: Option<&Value>,
    ) -> Value {
        let config = self.resolve_config(info, settings);
        tracing::debug!(module = %self.module_id, endpoint = %config.endpoint, "remote request");
        match self.send(&config, request).await {
            Ok(body) => body,
            Err(message) => {
                tracing::warn!(
                    module = %self.module_id,
                    endpoint = %config.endpoint,
                    error = %message,
                    "remote request failed"
                );
                error_envelope(message)
            }
        }
    }

    #[cfg(feature = "remote")]
    async fn send(&self, config: &RemoteModuleConfig, request: &RemoteRequest) -> Result<Value, String> {
        use reqwest::header::{ACCEPT, CONTENT_TYPE};

        let mut builder = self
            .client
            .post(&config.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        for (name, value) in &config.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .json(request)
            .send()
            .await
            .map_err(|err| err.to_string())?;
        let status = response.status();
        response.json::<Value>().await.map_err(|err| {
            format!("invalid response from remote API (status {}): {}", status, err)
        })
    }

    #[cfg(not(feature = "remote"))]
    async fn send(&self, _config: &RemoteModuleConfig, _request: &RemoteRequest) -> Result<Value, String> {
        Err("remote modules require the `remote` feature".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RemoteCacheConfig;

    fn remote() -> RemoteModuleConfig {
        RemoteModuleConfig::new("https://api.example.com/${settings.region}/graphql")
            .header("Authorization", "Bearer ${settings.token}")
            .header("X-Forwarded-For", "${ request.ip }")
    }

    #[test]
    fn max_age_defaults_and_floor() {
        let project = ProjectConfig::default();
        let fetcher = RemoteFetcher::new("github", remote(), &project).unwrap();
        assert_eq!(fetcher.max_age(), 60);

        let mut config = remote();
        config.cache = Some(RemoteCacheConfig { max_age: Some(2) });
        let fetcher = RemoteFetcher::new("github", config, &project).unwrap();
        assert_eq!(fetcher.max_age(), 10);
        assert_eq!(fetcher.cache_control(), "max-age=10");

        let mut config = remote();
        config.cache = Some(RemoteCacheConfig { max_age: Some(300) });
        let fetcher = RemoteFetcher::new("github", config, &project).unwrap();
        assert_eq!(fetcher.max_age(), 300);
    }

    #[test]
    fn placeholders_resolve_against_settings_and_request() {
        let mut project = ProjectConfig::default();
        project
            .module_settings
            .insert("github".into(), json!({"region": "eu", "token": "abc"}));
        let fetcher = RemoteFetcher::new("github", remote(), &project).unwrap();

        let config = fetcher.resolve_config(&RequestInfo::with_ip("10.0.0.1"), None);
        assert_eq!(config.endpoint, "https://api.example.com/eu/graphql");
        assert_eq!(config.headers["Authorization"], "Bearer abc");
        assert_eq!(config.headers["X-Forwarded-For"], "10.0.0.1");

        let overrides = json!({"region": "us"});
        let config = fetcher.resolve_config(&RequestInfo::default(), Some(&overrides));
        assert_eq!(config.endpoint, "https://api.example.com/us/graphql");
        assert_eq!(config.headers["Authorization"], "Bearer ");
        assert_eq!(config.headers["X-Forwarded-For"], "");
    }

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(RemoteRequest::new("query { a }")).unwrap();
        assert_eq!(body, json!({"query": "query { a }", "variables": {}}));
        assert_eq!(
            error_envelope("down"),
            json!({"data": null, "errors": [{"message": "down"}]})
        );
    }
}
