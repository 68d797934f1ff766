//! Permission queries must parse and only reference filterable fields.

use std::collections::HashMap;

use crate::error::PackageError;
use crate::types::{ModuleConfig, MutationPermissions, Permission, TypeConfig};
use crate::validation::{FilterSchema, ValidationContext, ValidationRule};

#[derive(Default)]
pub struct PermissionQueries {
    /// Filter schemas by type name. Building one walks every reachable type.
    schemas: HashMap<String, Option<FilterSchema>>,
}

impl PermissionQueries {
    fn schema(&mut self, ctx: &ValidationContext<'_>, type_name: &str) -> Option<&FilterSchema> {
        self.schemas
            .entry(type_name.to_string())
            .or_insert_with(|| FilterSchema::for_type(type_name, |name| ctx.get_type(name)))
            .as_ref()
    }

    fn check(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        type_name: &str,
        permission: &Permission,
        path: &[&str],
    ) {
        let Some(query) = permission.query.as_deref() else {
            return;
        };
        let result = match self.schema(ctx, type_name) {
            Some(schema) => schema.validate_query(query),
            None => Err(vec![format!(
                "Type \"{}\" does not support permission queries",
                type_name
            )]),
        };
        if let Err(problems) = result {
            for problem in problems {
                ctx.report_error(
                    PackageError::new(format!(
                        "Invalid permission query for type \"{}\": {}",
                        type_name, problem
                    ))
                    .with_path(path.iter().copied()),
                );
            }
        }
    }

    fn check_all(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        type_name: &str,
        permissions: &[Permission],
        mutations: Option<&MutationPermissions>,
        prefix: &[&str],
    ) {
        for (position, permission) in permissions.iter().enumerate() {
            let position = position.to_string();
            let mut path = prefix.to_vec();
            path.extend(["permissions", position.as_str()]);
            self.check(ctx, type_name, permission, &path);
        }

        for (operation, permissions) in mutations.into_iter().flat_map(|m| m.iter()) {
            for (position, permission) in permissions.iter().enumerate() {
                let position = position.to_string();
                let mut path = prefix.to_vec();
                path.extend(["mutations", operation, position.as_str()]);
                self.check(ctx, type_name, permission, &path);
            }
        }
    }
}

impl ValidationRule for PermissionQueries {
    fn enter_module(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        module: &ModuleConfig,
        _previous: Option<&ModuleConfig>,
    ) {
        for (type_name, config) in &module.type_permissions {
            let permissions = config.permissions.as_deref().unwrap_or_default();
            self.check_all(
                ctx,
                type_name,
                permissions,
                config.mutations.as_ref(),
                &["typePermissions", type_name.as_str()],
            );
        }
    }

    fn enter_type(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        ty: &TypeConfig,
        _previous: Option<&TypeConfig>,
    ) {
        let Some(object) = ty.as_object() else {
            return;
        };
        self.check_all(
            ctx,
            ty.name(),
            &object.permissions,
            Some(&object.mutations),
            &["types", ty.name()],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::types::{FieldConfig, ObjectTypeConfig, Role, TypePermissionConfig};
    use crate::validation::{rule, validate_modules};

    fn post() -> ObjectTypeConfig {
        ObjectTypeConfig::new("Blog_Post")
            .implements("Node")
            .field("id", FieldConfig::new("ID").required())
            .field("published", FieldConfig::new("Boolean"))
    }

    fn check(modules: &[ModuleConfig]) -> Vec<PackageError> {
        validate_modules(
            modules,
            &[],
            &[rule::<PermissionQueries>],
            &ProjectConfig::default(),
        )
    }

    #[test]
    fn valid_queries_pass() {
        let ty = post()
            .permission(Permission::new(Role::Anonymous).query("{ node(filter: {published: {eq: true}}) }"))
            .permission(Permission::new(Role::Admin));
        assert!(check(&[ModuleConfig::new("blog").with_type(ty)]).is_empty());
    }

    #[test]
    fn invalid_queries_are_reported_with_path() {
        let mut ty = post().permission(Permission::new(Role::Anonymous).query("{ node(filter: {draft: {eq: true}}) }"));
        ty.mutations.update = vec![Permission::new(Role::Authenticated).query("{ node(")];
        let errors = check(&[ModuleConfig::new("blog").with_type(ty)]);

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].path, ["types", "Blog_Post", "permissions", "0"]);
        assert!(errors[0].message.contains("\"draft\""));
        assert_eq!(
            errors[1].path,
            ["types", "Blog_Post", "mutations", "update", "0"]
        );
        assert!(errors[1].message.contains("Syntax error"));
    }

    #[test]
    fn type_permissions_of_other_modules() {
        let mut acl = ModuleConfig::new("acl");
        acl.type_permissions.insert(
            "Blog_Post".into(),
            TypePermissionConfig {
                permissions: Some(vec![Permission::new(Role::Anonymous).query("{ node(filter: {missing: {eq: 1}}) }")]),
                mutations: None,
            },
        );
        acl.type_permissions.insert(
            "Unknown".into(),
            TypePermissionConfig {
                permissions: Some(vec![Permission::new(Role::Anonymous).query("{ node(filter: {}) }")]),
                mutations: None,
            },
        );
        let errors = check(&[ModuleConfig::new("blog").with_type(post()), acl]);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].module.as_deref(), Some("acl"));
        assert_eq!(errors[0].path[0], "typePermissions");
        assert!(errors[1].message.contains("does not support permission queries"));
    }
}
