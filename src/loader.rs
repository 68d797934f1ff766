//! Module and project configuration loading.
//!
//! Handles loading module configurations from files, strings, and HTTP URLs.
//! A module file holds either a single module object or an array of modules.

use std::path::Path;

use serde_json::Value;

use crate::config::ProjectConfig;
use crate::error::LoadError;
use crate::types::ModuleConfig;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a JSON document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_json(path: &Path) -> Result<Value, LoadError> {
    let content = read_file(path)?;
    serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson { source })
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}

/// Turn a parsed document into modules.
///
/// # Errors
///
/// Returns `LoadError::InvalidConfig` if the document is neither a module
/// nor an array of modules.
pub fn parse_modules(value: Value) -> Result<Vec<ModuleConfig>, LoadError> {
    let invalid = |err: serde_json::Error| LoadError::InvalidConfig {
        message: err.to_string(),
    };
    match value {
        Value::Array(_) => serde_json::from_value(value).map_err(invalid),
        Value::Object(_) => serde_json::from_value(value)
            .map(|module| vec![module])
            .map_err(invalid),
        other => Err(LoadError::InvalidConfig {
            message: format!("expected a module object or an array of modules, found {}", other),
        }),
    }
}

/// Load modules from a file.
///
/// `rawSchemaPath` entries are read relative to the file's directory.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid JSON, or does
/// not describe modules.
pub fn load_modules(path: &Path) -> Result<Vec<ModuleConfig>, LoadError> {
    let mut modules = parse_modules(load_json(path)?)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    for module in &mut modules {
        load_raw_schema(module, base_dir)?;
    }
    tracing::debug!(path = %path.display(), modules = modules.len(), "loaded modules");
    Ok(modules)
}

/// Load modules from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_modules_str(content: &str) -> Result<Vec<ModuleConfig>, LoadError> {
    let value = serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })?;
    parse_modules(value)
}

/// Read the SDL named by `rawSchemaPath` into `rawSchema`.
///
/// Modules that already carry an inline schema are left untouched.
///
/// # Errors
///
/// Returns an error if the schema file cannot be read.
pub fn load_raw_schema(module: &mut ModuleConfig, base_dir: &Path) -> Result<(), LoadError> {
    if module.raw_schema.is_some() {
        return Ok(());
    }
    if let Some(relative) = &module.raw_schema_path {
        let path = base_dir.join(relative);
        module.raw_schema = Some(read_file(&path)?);
    }
    Ok(())
}

/// Load a project configuration file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid project
/// configuration.
pub fn load_project_config(path: &Path) -> Result<ProjectConfig, LoadError> {
    let value = load_json(path)?;
    serde_json::from_value(value).map_err(|err| LoadError::InvalidConfig {
        message: err.to_string(),
    })
}

/// Load modules from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails,
/// or `LoadError::InvalidConfig` if the response doesn't describe modules.
#[cfg(feature = "remote")]
pub fn load_modules_url(url: &str) -> Result<Vec<ModuleConfig>, LoadError> {
    let network_error = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network_error)?;

    let value: Value = client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.json())
        .map_err(network_error)?;

    parse_modules(value)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load modules from a file path or URL.
///
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns appropriate errors based on the source type.
pub fn load_modules_auto(source: &str) -> Result<Vec<ModuleConfig>, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_modules_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_modules(Path::new(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModuleKind;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn load_single_module() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"id": "blog", "version": "1.0.0", "kind": "DYNAMIC"}}"#).unwrap();

        let modules = load_modules(file.path()).unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].id, "blog");
        assert_eq!(modules[0].kind, ModuleKind::Dynamic);
    }

    #[test]
    fn load_module_array() {
        let modules = load_modules_str(r#"[{"id": "core", "kind": "NATIVE"}, {"id": "blog"}]"#).unwrap();
        assert_eq!(modules.len(), 2);
        assert!(modules[0].is_native());
    }

    #[test]
    fn load_modules_file_not_found() {
        let result = load_modules(Path::new("/nonexistent/modules.json"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn load_modules_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let result = load_modules(file.path());
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn load_modules_invalid_shape() {
        assert!(matches!(
            load_modules_str("42"),
            Err(LoadError::InvalidConfig { .. })
        ));
        assert!(matches!(
            load_modules_str(r#"{"version": "1.0.0"}"#),
            Err(LoadError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn raw_schema_path_is_relative_to_module_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("github.graphql"), "type Query { viewer: String }").unwrap();
        let modules_path = dir.path().join("modules.json");
        std::fs::write(
            &modules_path,
            r#"{"id": "github", "namespace": "Github",
                "remoteModule": {"endpoint": "https://api.github.com/graphql"},
                "rawSchemaPath": "github.graphql"}"#,
        )
        .unwrap();

        let modules = load_modules(&modules_path).unwrap();
        assert_eq!(
            modules[0].raw_schema.as_deref(),
            Some("type Query { viewer: String }")
        );
    }

    #[test]
    fn missing_raw_schema_file() {
        let mut module = ModuleConfig::new("github");
        module.raw_schema_path = Some("missing.graphql".into());
        let result = load_raw_schema(&mut module, Path::new("/nonexistent"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn load_project_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"environment": "production", "runtimeEndpoint": "http://runtime"}}"#).unwrap();

        let config = load_project_config(file.path()).unwrap();
        assert!(config.environment.is_production());
        assert_eq!(config.runtime_endpoint.as_deref(), Some("http://runtime"));
    }

    #[test]
    fn is_url_detection() {
        assert!(is_url("https://example.com/modules.json"));
        assert!(is_url("http://example.com/modules.json"));
        assert!(!is_url("./modules.json"));
    }

    #[cfg(feature = "remote")]
    mod remote {
        use super::*;

        #[test]
        fn load_modules_url_valid() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("GET", "/modules.json")
                .with_header("content-type", "application/json")
                .with_body(r#"[{"id": "blog"}]"#)
                .create();

            let modules = load_modules_auto(&format!("{}/modules.json", server.url())).unwrap();
            assert_eq!(modules[0].id, "blog");
            mock.assert();
        }

        #[test]
        fn load_modules_url_404() {
            let mut server = mockito::Server::new();
            server.mock("GET", "/missing.json").with_status(404).create();

            let result = load_modules_url(&format!("{}/missing.json", server.url()));
            assert!(matches!(result, Err(LoadError::NetworkError { .. })));
        }
    }
}
