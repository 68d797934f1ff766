//! Error types for module loading, validation, stitching and schema building.

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Machine-readable error codes exposed under `extensions.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InternalServerError,
    InputValidationFailed,
    AccessDenied,
    LoginRequired,
    AccessTokenInvalid,
    AccessTokenExpired,
    MigrationFailedPackageError,
    ResourceLimitError,
    RemoteApiError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
            ErrorCode::InputValidationFailed => "INPUT_VALIDATION_FAILED",
            ErrorCode::AccessDenied => "ACCESS_DENIED",
            ErrorCode::LoginRequired => "LOGIN_REQUIRED",
            ErrorCode::AccessTokenInvalid => "ACCESS_TOKEN_INVALID",
            ErrorCode::AccessTokenExpired => "ACCESS_TOKEN_EXPIRED",
            ErrorCode::MigrationFailedPackageError => "MIGRATION_FAILED_PACKAGE_ERROR",
            ErrorCode::ResourceLimitError => "RESOURCE_LIMIT_ERROR",
            ErrorCode::RemoteApiError => "REMOTE_API_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single problem with one input argument of a mutation or query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
    pub message: String,
}

impl ArgumentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            path: None,
            message: message.into(),
        }
    }
}

/// Argument name → problems found for that argument.
pub type ArgumentErrors = IndexMap<String, Vec<ArgumentError>>;

/// A problem in a module declaration, found during validation or while
/// building a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct PackageError {
    pub message: String,
    /// Id of the module that contains the problem.
    pub module: Option<String>,
    /// Location of the offending element, e.g. `["types", "Blog_Post", "title"]`.
    #[serde(default)]
    pub path: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PackageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            module: None,
            path: Vec::new(),
            description: None,
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_path<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path = path.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// `module: types.Blog_Post.title: message`, used by the CLI.
    pub fn location(&self) -> String {
        match (&self.module, self.path.is_empty()) {
            (Some(module), false) => format!("{}: {}", module, self.path.join(".")),
            (Some(module), true) => module.clone(),
            (None, false) => self.path.join("."),
            (None, true) => "project".to_string(),
        }
    }
}

/// Errors raised at request time and shown to API consumers.
#[derive(Debug, Clone, Error)]
pub enum UserError {
    #[error("{message}")]
    Internal { message: String, expose_message: bool },

    #[error("{message}")]
    Validation {
        message: String,
        argument_errors: ArgumentErrors,
    },

    #[error("{message}")]
    AccessDenied { message: String },

    #[error("{message}")]
    LoginRequired { message: String },

    #[error("{message}")]
    AccessTokenExpired { message: String },

    #[error("{message}")]
    AccessTokenInvalid { message: String },

    #[error("{message}")]
    ResourceLimit { message: String },

    #[error("{message}")]
    RemoteApi { message: String },

    #[error(transparent)]
    Package(#[from] PackageError),
}

impl UserError {
    /// An internal failure whose message must not reach production clients.
    pub fn internal(message: impl Into<String>) -> Self {
        UserError::Internal {
            message: message.into(),
            expose_message: false,
        }
    }

    pub fn validation(message: impl Into<String>, argument_errors: ArgumentErrors) -> Self {
        UserError::Validation {
            message: message.into(),
            argument_errors,
        }
    }

    pub fn access_denied() -> Self {
        UserError::AccessDenied {
            message: "You don't have permission to perform this operation".to_string(),
        }
    }

    pub fn login_required() -> Self {
        UserError::LoginRequired {
            message: "You need to be logged in to perform this operation".to_string(),
        }
    }

    pub fn remote_api(message: impl Into<String>) -> Self {
        UserError::RemoteApi {
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            UserError::Internal { .. } => ErrorCode::InternalServerError,
            UserError::Validation { .. } => ErrorCode::InputValidationFailed,
            UserError::AccessDenied { .. } => ErrorCode::AccessDenied,
            UserError::LoginRequired { .. } => ErrorCode::LoginRequired,
            UserError::AccessTokenExpired { .. } => ErrorCode::AccessTokenExpired,
            UserError::AccessTokenInvalid { .. } => ErrorCode::AccessTokenInvalid,
            UserError::ResourceLimit { .. } => ErrorCode::ResourceLimitError,
            UserError::RemoteApi { .. } => ErrorCode::RemoteApiError,
            UserError::Package(_) => ErrorCode::MigrationFailedPackageError,
        }
    }

    /// Whether the message may be shown to clients in production.
    pub fn expose_message(&self) -> bool {
        match self {
            UserError::Internal { expose_message, .. } => *expose_message,
            _ => true,
        }
    }

    /// Extension fields merged into the GraphQL error response.
    pub fn graphql_error_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("code".to_string(), Value::from(self.code().as_str()));

        match self {
            UserError::Validation {
                argument_errors, ..
            } if !argument_errors.is_empty() => {
                if let Ok(arguments) = serde_json::to_value(argument_errors) {
                    fields.insert("arguments".to_string(), arguments);
                }
            }
            UserError::Package(error) => {
                if let Some(module) = &error.module {
                    fields.insert("module".to_string(), Value::from(module.clone()));
                }
                if !error.path.is_empty() {
                    fields.insert("path".to_string(), Value::from(error.path.clone()));
                }
            }
            _ => {}
        }

        fields
    }

    /// Wrap into an execution error that keeps `self` as its source, so the
    /// formatter can recover it.
    pub fn into_graphql_error(self) -> async_graphql::Error {
        async_graphql::Error::new_with_source(self)
    }
}

/// Violated internal assumption. Never shown to clients.
#[derive(Debug, Error)]
#[error("internal error: {0}")]
pub struct InternalError(pub String);

/// Errors while loading module or project configuration.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid module configuration: {message}")]
    InvalidConfig { message: String },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors while turning a remote GraphQL schema into a module.
#[derive(Debug, Error)]
pub enum RemoteModuleError {
    #[error("module '{module}' has no remoteModule configuration")]
    MissingRemoteConfig { module: String },

    #[error("module '{module}' declares a remote module but no rawSchema")]
    MissingRawSchema { module: String },

    #[error("invalid remote schema for module '{module}': {message}")]
    InvalidSdl { module: String, message: String },

    #[cfg(feature = "remote")]
    #[error("cannot create HTTP client for module '{module}': {source}")]
    Client {
        module: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Errors from the module enhancement pipeline.
#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error(transparent)]
    Remote(#[from] RemoteModuleError),

    #[error("enhanceModule hook of module '{module}' failed: {message}")]
    Hook { module: String, message: String },
}

/// Errors while building the executable schema.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Enhance(#[from] EnhanceError),

    #[error("module validation failed with {} error(s)", errors.len())]
    Validation { errors: Vec<PackageError> },

    #[error("type '{name}' referenced by module '{module}' does not exist")]
    UnknownType { name: String, module: String },

    #[error("invalid schema: {message}")]
    Schema { message: String },

    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl BuildError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::Validation { .. } => 1,
            _ => 2,
        }
    }
}
