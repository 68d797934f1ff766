//! Modules that ship with the platform: `core`, `auth` and `relay`.

use async_graphql::dynamic::{FieldFuture, FieldValue};
use serde_json::json;

use crate::hooks::FieldResolver;
use crate::schema::{auth_context, load_permitted_node, to_field_value, OutputKind, PAGE_INFO_TYPE};
use crate::types::{
    ArgumentConfig, FieldConfig, HandlerKind, InterfaceTypeConfig, ModuleConfig, ObjectTypeConfig,
    Permission, Role, ScalarTypeConfig, CONTENT_INTERFACE, NODE_INTERFACE, QUERY_TYPE,
    TIMESTAMPED_INTERFACE,
};

pub const NATIVE_VERSION: &str = "1.0.0";

pub const USER_TYPE: &str = "User";
pub const VIEWER_TYPE: &str = "Viewer";

pub fn page_info_type() -> ObjectTypeConfig {
    ObjectTypeConfig::new(PAGE_INFO_TYPE)
        .description("Information about pagination in a connection")
        .field("hasNextPage", FieldConfig::new("Boolean").required())
        .field("hasPreviousPage", FieldConfig::new("Boolean").required())
        .field("startCursor", FieldConfig::new("String"))
        .field("endCursor", FieldConfig::new("String"))
}

/// Built-in interfaces, `PageInfo`, `DateTime` and the `Query` root.
pub fn core_module() -> ModuleConfig {
    ModuleConfig::new("core")
        .native()
        .with_version(NATIVE_VERSION)
        .with_type(ObjectTypeConfig::new(QUERY_TYPE).description("The query root"))
        .with_type(
            InterfaceTypeConfig::new(NODE_INTERFACE)
                .field("id", FieldConfig::new("ID").required().description("Global object id")),
        )
        .with_type(InterfaceTypeConfig::new(CONTENT_INTERFACE).field("id", FieldConfig::new("ID").required()))
        .with_type(
            InterfaceTypeConfig::new(TIMESTAMPED_INTERFACE)
                .field("createdAt", FieldConfig::new("DateTime").required())
                .field("lastUpdatedAt", FieldConfig::new("DateTime")),
        )
        .with_type(page_info_type())
        .with_type(ScalarTypeConfig {
            name: "DateTime".into(),
            description: Some("Date and time in ISO 8601 format".into()),
            ..Default::default()
        })
}

fn viewer_user_resolver() -> FieldResolver {
    FieldResolver::from_fn(|ctx| {
        FieldFuture::new(async move {
            let Some(user_id) = auth_context(&ctx).user_id else {
                return Ok(None);
            };
            let user = load_permitted_node(&ctx, Some(USER_TYPE.to_string()), user_id).await?;
            Ok(user.map(FieldValue::owned_any))
        })
    })
}

/// The `User` node, the `Viewer` object and `Query.viewer`.
pub fn auth_module() -> ModuleConfig {
    let user = ObjectTypeConfig::new(USER_TYPE)
        .description("A user account")
        .implements(NODE_INTERFACE)
        .implements(TIMESTAMPED_INTERFACE)
        .handler(HandlerKind::Postgres)
        .field("id", FieldConfig::new("ID").required())
        .field("username", FieldConfig::new("String").unique())
        .field("email", FieldConfig::new("String").unique())
        .field("firstName", FieldConfig::new("String"))
        .field("lastName", FieldConfig::new("String"))
        .field("isActive", FieldConfig::new("Boolean"))
        .field("createdAt", FieldConfig::new("DateTime").required())
        .field("lastUpdatedAt", FieldConfig::new("DateTime"))
        .permission(Permission::new(Role::Authenticated).fields(&["id", "username", "firstName", "lastName"]))
        .permission(Permission::new(Role::Admin))
        .permission(Permission::new(Role::Staff));

    let viewer = ObjectTypeConfig::new(VIEWER_TYPE)
        .description("The current caller")
        .field(
            "user",
            FieldConfig::new(USER_TYPE).resolve(viewer_user_resolver()),
        );

    ModuleConfig::new("auth")
        .native()
        .with_version(NATIVE_VERSION)
        .with_type(user)
        .with_type(viewer)
        .with_type_extension(
            QUERY_TYPE,
            "viewer",
            FieldConfig::new(VIEWER_TYPE)
                .required()
                .resolve(FieldResolver::from_fn(|_| {
                    FieldFuture::new(async move { Ok(Some(FieldValue::owned_any(json!({})))) })
                })),
        )
}

fn node_resolver() -> FieldResolver {
    FieldResolver::from_fn(|ctx| {
        FieldFuture::new(async move {
            let id = ctx.args.try_get("id")?.string()?.to_string();
            let node = load_permitted_node(&ctx, None, id).await?;
            Ok(node.and_then(|node| to_field_value(node, &[], &OutputKind::Abstract(None))))
        })
    })
}

/// `Query.node(id: ID!)`.
pub fn relay_module() -> ModuleConfig {
    ModuleConfig::new("relay")
        .native()
        .with_version(NATIVE_VERSION)
        .with_type_extension(
            QUERY_TYPE,
            "node",
            FieldConfig::new(NODE_INTERFACE)
                .argument("id", ArgumentConfig::new("ID").required())
                .description("Fetch any object by its global id")
                .resolve(node_resolver()),
        )
}

/// The required native modules, in installation order.
pub fn native_modules() -> Vec<ModuleConfig> {
    vec![core_module(), auth_module(), relay_module()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::validation::{default_rules, validate_modules};

    #[test]
    fn native_modules_validate() {
        let modules = native_modules();
        let errors = validate_modules(&modules, &[], &default_rules(), &ProjectConfig::default());
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn relay_extends_query() {
        let relay = relay_module();
        let node = &relay.type_extensions[QUERY_TYPE]["node"];
        assert_eq!(node.type_name, NODE_INTERFACE);
        assert!(node.arguments["id"].required);
        assert!(node.resolve.is_some());
    }
}
