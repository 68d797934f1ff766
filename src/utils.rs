//! Object helpers: `${path}` placeholder interpolation and recursive key
//! case conversion.

use std::collections::HashMap;

use convert_case::{Case, Casing};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]*)\}").unwrap());

/// Replace every `${ path.to.var }` in the string leaves of `source`.
///
/// Paths resolve segment by segment against `variables`. A missing segment
/// yields an empty string. Non-string leaves are returned unchanged.
pub fn deep_replace_variables(source: &Value, variables: &Value) -> Value {
    match source {
        Value::String(text) => Value::String(replace_variables(text, variables)),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), deep_replace_variables(value, variables)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Interpolate placeholders in a single string.
pub fn replace_variables(text: &str, variables: &Value) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| {
            lookup(variables, caps[1].trim())
        })
        .into_owned()
}

fn lookup(variables: &Value, path: &str) -> String {
    let mut current = variables;
    for segment in path.split('.') {
        match current.get(segment.trim()) {
            Some(next) => current = next,
            None => return String::new(),
        }
    }
    match current {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert object keys from snake_case to camelCase, recursively.
///
/// `overrides` maps source keys to the exact key to use instead.
pub fn snake_to_camel_case_object(value: &Value, overrides: &HashMap<String, String>) -> Value {
    convert_keys(value, overrides, Case::Camel)
}

/// Convert object keys from camelCase to snake_case, recursively.
pub fn camel_to_snake_case_object(value: &Value, overrides: &HashMap<String, String>) -> Value {
    convert_keys(value, overrides, Case::Snake)
}

fn convert_keys(value: &Value, overrides: &HashMap<String, String>, case: Case) -> Value {
    match value {
        Value::Object(map) => {
            let converted: Map<String, Value> = map
                .iter()
                .map(|(key, value)| {
                    let key = overrides
                        .get(key)
                        .cloned()
                        .unwrap_or_else(|| key.to_case(case));
                    (key, convert_keys(value, overrides, case))
                })
                .collect();
            Value::Object(converted)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| convert_keys(item, overrides, case))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn replaces_nested_path() {
        let result = deep_replace_variables(
            &json!({"k": "a ${x.y} b"}),
            &json!({"x": {"y": "Z"}}),
        );
        assert_eq!(result, json!({"k": "a Z b"}));
    }

    #[test]
    fn missing_path_is_empty() {
        let result = deep_replace_variables(
            &json!({"k": "[${ missing.value }]", "n": 5}),
            &json!({}),
        );
        assert_eq!(result, json!({"k": "[]", "n": 5}));
    }

    #[test]
    fn recurses_into_objects() {
        let result = deep_replace_variables(
            &json!({
                "endpoint": "https://api.example.com/${settings.tenant}",
                "headers": {"X-Forwarded-For": "${request.ip}", "X-Retry": "${settings.retries}"}
            }),
            &json!({
                "settings": {"tenant": "acme", "retries": 3},
                "request": {"ip": "10.0.0.1"}
            }),
        );
        assert_eq!(
            result,
            json!({
                "endpoint": "https://api.example.com/acme",
                "headers": {"X-Forwarded-For": "10.0.0.1", "X-Retry": "3"}
            })
        );
    }

    #[test]
    fn hyphenated_keys_are_literal() {
        let result = replace_variables(
            "${settings.x-api-key}",
            &json!({"settings": {"x-api-key": "secret"}}),
        );
        assert_eq!(result, "secret");
    }

    #[test]
    fn snake_and_camel_conversion() {
        let overrides = HashMap::from([("user_id".to_string(), "userID".to_string())]);
        let converted = snake_to_camel_case_object(
            &json!({"created_at": 1, "user_id": 2, "tags": [{"tag_name": "x"}]}),
            &overrides,
        );
        assert_eq!(
            converted,
            json!({"createdAt": 1, "userID": 2, "tags": [{"tagName": "x"}]})
        );

        let back = camel_to_snake_case_object(&json!({"lastUpdatedAt": null}), &HashMap::new());
        assert_eq!(back, json!({"last_updated_at": null}));
    }
}
