//! Role-based read and mutation checks.

use indexmap::IndexMap;

use crate::error::UserError;
use crate::types::Permission;

use super::context::AuthContext;

/// Read permissions of every object type, registered as schema data for
/// resolvers that only learn the concrete type after loading.
#[derive(Debug, Clone, Default)]
pub struct TypePermissions(IndexMap<String, Vec<Permission>>);

impl TypePermissions {
    pub fn insert(&mut self, type_name: impl Into<String>, permissions: Vec<Permission>) {
        self.0.insert(type_name.into(), permissions);
    }

    pub fn for_type(&self, type_name: &str) -> &[Permission] {
        self.0.get(type_name).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Permissions granting `auth` access, optionally to `field` only.
fn granted<'p>(
    permissions: &'p [Permission],
    auth: &'p AuthContext,
    field: Option<&'p str>,
) -> impl Iterator<Item = &'p Permission> + 'p {
    permissions.iter().filter(move |permission| {
        auth.has_role(permission.role)
            && match (&permission.fields, field) {
                (Some(fields), Some(field)) => fields.iter().any(|f| f == field),
                _ => true,
            }
    })
}

/// Check access and return the filter queries of every granting permission.
///
/// An empty permission list leaves the operation unrestricted. A grant
/// without a query matches all rows and clears the filter list.
///
/// # Errors
///
/// `LoginRequired` for anonymous callers, `AccessDenied` otherwise.
pub fn check_permissions(
    permissions: &[Permission],
    auth: &AuthContext,
    field: Option<&str>,
) -> Result<Vec<String>, UserError> {
    if permissions.is_empty() {
        return Ok(Vec::new());
    }

    let mut filters = Vec::new();
    let mut any = false;
    for permission in granted(permissions, auth, field) {
        any = true;
        match &permission.query {
            Some(query) => filters.push(query.clone()),
            None => return Ok(Vec::new()),
        }
    }

    if any {
        Ok(filters)
    } else if auth.is_anonymous() {
        Err(UserError::login_required())
    } else {
        Err(UserError::access_denied())
    }
}
