//! Per-request data read by resolvers of the built schema.
//!
//! Insert these into the request with `Request::data`. Every item is
//! optional: a request without an [`AuthContext`] is anonymous.

use indexmap::IndexMap;
use serde_json::{json, Value};

use crate::config::ProjectConfig;
use crate::types::Role;

/// Identity of the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthContext {
    pub user_id: Option<String>,
    pub roles: Vec<Role>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }

    /// Whether a permission granted to `role` applies to this caller.
    pub fn has_role(&self, role: Role) -> bool {
        match role {
            Role::Anonymous => true,
            Role::Authenticated => !self.is_anonymous(),
            other => self.roles.contains(&other),
        }
    }
}

/// Transport-level facts about the request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestInfo {
    pub ip: Option<String>,
}

impl RequestInfo {
    pub fn with_ip(ip: impl Into<String>) -> Self {
        Self { ip: Some(ip.into()) }
    }

    /// `request` scope of remote module placeholders.
    pub fn to_value(&self) -> Value {
        json!({ "ip": self.ip })
    }
}

/// Module id → settings, overriding [`ProjectConfig::module_settings`] for
/// one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectSettings(pub IndexMap<String, Value>);

impl ProjectSettings {
    pub fn settings_for(&self, module_id: &str) -> Option<&Value> {
        self.0.get(module_id)
    }
}

impl From<&ProjectConfig> for ProjectSettings {
    fn from(config: &ProjectConfig) -> Self {
        Self(config.module_settings.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_matching() {
        let anonymous = AuthContext::anonymous();
        assert!(anonymous.has_role(Role::Anonymous));
        assert!(!anonymous.has_role(Role::Authenticated));

        let admin = AuthContext::user("u1").with_role(Role::Admin);
        assert!(admin.has_role(Role::Authenticated));
        assert!(admin.has_role(Role::Admin));
        assert!(!admin.has_role(Role::Staff));
    }

    #[test]
    fn request_scope() {
        assert_eq!(RequestInfo::with_ip("1.2.3.4").to_value(), json!({"ip": "1.2.3.4"}));
        assert_eq!(RequestInfo::default().to_value(), json!({"ip": null}));
    }
}
