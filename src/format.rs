//! Response formatting for execution errors.

use async_graphql::ServerError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::Environment;
use crate::error::UserError;

/// Message shown in place of unexposed errors in production.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// Wire shape of one entry in a response's `errors` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<Location>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

/// Format an execution error for the response.
///
/// The original [`UserError`], if any, is recovered from the error source.
/// Unexposed errors are replaced by [`INTERNAL_ERROR_MESSAGE`] in production
/// and logged.
pub fn format_error(error: &ServerError, environment: Environment) -> FormattedError {
    let original = error.source::<UserError>();

    let mut message = error.message.clone();
    if let Some(original) = original {
        if !original.expose_message() && environment.is_production() {
            tracing::error!(
                code = %original.code(),
                error = %original,
                source = ?original,
                "redacted internal error"
            );
            message = INTERNAL_ERROR_MESSAGE.to_string();
        }
    }

    let locations = (!error.locations.is_empty()).then(|| {
        error
            .locations
            .iter()
            .map(|pos| Location {
                line: pos.line,
                column: pos.column,
            })
            .collect()
    });

    let path = (!error.path.is_empty()).then(|| {
        error
            .path
            .iter()
            .filter_map(|segment| serde_json::to_value(segment).ok())
            .collect()
    });

    let mut extensions = error
        .extensions
        .as_ref()
        .and_then(|values| serde_json::to_value(values).ok())
        .and_then(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        });

    if let Some(original) = original {
        let fields = original.graphql_error_fields();
        extensions.get_or_insert_with(Map::new).extend(fields);
    }

    FormattedError {
        message,
        locations,
        path,
        extensions,
    }
}

/// Format every error of a response.
pub fn format_errors(errors: &[ServerError], environment: Environment) -> Vec<FormattedError> {
    errors
        .iter()
        .map(|error| format_error(error, environment))
        .collect()
}
