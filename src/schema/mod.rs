//! Executable schema assembly.
//!
//! [`SchemaBuilder`] merges the types of enhanced, validated modules into one
//! type map, applies type extensions and permission overrides, attaches
//! connection fields and root mutations, and produces an
//! `async_graphql::dynamic::Schema`.

mod connection;
mod context;
mod handler;
mod mutation;
mod permissions;
mod value;

use std::sync::Arc;

use async_graphql::dynamic::{
    Enum, EnumItem, Field, FieldFuture, FieldValue, InputObject, InputValue, Interface,
    InterfaceField, Object, ResolverContext, Scalar, Schema, Type as DynamicType, Union,
};
use async_graphql::Value as ConstValue;
use indexmap::IndexMap;
use serde_json::Value;

use crate::config::ProjectConfig;
use crate::enhance::enhance_modules;
use crate::error::{BuildError, UserError};
use crate::hooks::FieldResolver;
use crate::native::page_info_type;
use crate::shape::TypeShape;
use crate::types::{
    is_host_scalar, FieldConfig, InterfaceTypeConfig, ModuleConfig, MutationConfig,
    ObjectTypeConfig, Permission, ScalarSerializer, TypeConfig, HOST_SCALARS, MUTATION_TYPE,
    QUERY_TYPE,
};
use crate::validation::{default_rules, validate_modules};

pub use connection::{connection_type_name, edge_type_name, ConnectionRegistry, PAGE_INFO_TYPE};
pub use context::{AuthContext, ProjectSettings, RequestInfo};
pub use handler::{
    ConnectionPage, ConnectionRequest, Edge, Handler, MutationRequest, NodeRequest, PageArguments,
    PageInfo,
};
pub use mutation::{input_type_name, payload_type_name};
pub use permissions::{check_permissions, TypePermissions};
pub use value::{concrete_type, parent_json, to_field_value, OutputKind};

/// The caller of the current request, anonymous when none was supplied.
pub fn auth_context(ctx: &ResolverContext<'_>) -> AuthContext {
    ctx.ctx.data_opt::<AuthContext>().cloned().unwrap_or_default()
}

/// The registered persistence handler.
///
/// # Errors
///
/// An unexposed internal error when the schema was built without one.
pub fn handler(ctx: &ResolverContext<'_>) -> async_graphql::Result<Arc<dyn Handler>> {
    ctx.ctx
        .data_opt::<Arc<dyn Handler>>()
        .cloned()
        .ok_or_else(|| UserError::internal("no handler registered for the schema").into_graphql_error())
}

/// Load a node and enforce the read permissions of its concrete type.
///
/// The handler is asked again with the granted permission queries as
/// filters when the type restricts reads to matching rows.
pub(crate) async fn load_permitted_node(
    ctx: &ResolverContext<'_>,
    type_name: Option<String>,
    id: String,
) -> async_graphql::Result<Option<Value>> {
    let handler = handler(ctx)?;
    let auth = auth_context(ctx);
    let node = handler
        .load_node(NodeRequest {
            type_name,
            id: id.clone(),
            auth: auth.clone(),
            filters: Vec::new(),
        })
        .await
        .map_err(UserError::into_graphql_error)?;
    let Some(node) = node else {
        return Ok(None);
    };
    let Some(concrete) = concrete_type(&node, None) else {
        return Ok(Some(node));
    };

    let permissions = ctx.ctx.data_opt::<TypePermissions>();
    let filters = check_permissions(
        permissions.map(|p| p.for_type(&concrete)).unwrap_or_default(),
        &auth,
        None,
    )
    .map_err(UserError::into_graphql_error)?;
    if filters.is_empty() {
        return Ok(Some(node));
    }

    tracing::debug!(type_name = %concrete, filters = filters.len(), "reloading node with permission filters");
    handler
        .load_node(NodeRequest {
            type_name: Some(concrete),
            id,
            auth,
            filters,
        })
        .await
        .map_err(UserError::into_graphql_error)
}

/// Check `permissions` before running `resolver`.
pub(crate) fn guarded(
    resolver: FieldResolver,
    permissions: Vec<Permission>,
    field: Option<String>,
) -> FieldResolver {
    if permissions.is_empty() {
        return resolver;
    }
    FieldResolver::from_fn(move |ctx| {
        let auth = auth_context(&ctx);
        match check_permissions(&permissions, &auth, field.as_deref()) {
            Ok(_) => resolver.resolve(ctx),
            Err(err) => FieldFuture::new(async move {
                Err::<Option<FieldValue<'_>>, _>(err.into_graphql_error())
            }),
        }
    })
}

pub(crate) fn input_value(
    name: &str,
    shape: &TypeShape,
    default_value: Option<&Value>,
    description: Option<&str>,
) -> InputValue {
    let mut input = InputValue::new(name, shape.to_type_ref());
    if let Some(default) = default_value.and_then(|value| ConstValue::from_json(value.clone()).ok()) {
        input = input.default_value(default);
    }
    if let Some(description) = description {
        input = input.description(description);
    }
    input
}

/// Output field with the configured resolver, or one reading the property
/// from the parent object. Non-empty `permissions` guard the field.
pub(crate) fn output_field(
    name: &str,
    config: &FieldConfig,
    types: &IndexMap<String, TypeConfig>,
    permissions: &[Permission],
) -> Field {
    let shape = TypeShape::from(config);
    let resolver = config.resolve.clone().unwrap_or_else(|| {
        let kind = OutputKind::of(&config.type_name, types);
        FieldResolver::from_fn(value::property_resolver(
            name.to_string(),
            shape.list.clone(),
            kind,
        ))
    });
    let resolver = guarded(resolver, permissions.to_vec(), Some(name.to_string()));

    let mut field = Field::new(name, shape.to_type_ref(), move |ctx| resolver.resolve(ctx));
    for (arg_name, argument) in &config.arguments {
        field = field.argument(input_value(
            arg_name,
            &TypeShape::from(argument),
            argument.default_value.as_ref(),
            argument.description.as_deref(),
        ));
    }
    if let Some(description) = &config.description {
        field = field.description(description.as_str());
    }
    if let Some(reason) = &config.deprecation_reason {
        field = field.deprecation(Some(reason.as_str()));
    }
    field
}

fn scalar(name: &str, description: Option<&str>, serializer: ScalarSerializer) -> Scalar {
    let mut scalar = Scalar::new(name);
    if let Some(description) = description {
        scalar = scalar.description(description);
    }
    match serializer {
        ScalarSerializer::String => scalar.validator(|value| matches!(value, ConstValue::String(_))),
        ScalarSerializer::Int => scalar.validator(|value| match value {
            ConstValue::Number(number) => number.is_i64() || number.is_u64(),
            _ => false,
        }),
        ScalarSerializer::Float => scalar.validator(|value| matches!(value, ConstValue::Number(_))),
        ScalarSerializer::Boolean => scalar.validator(|value| matches!(value, ConstValue::Boolean(_))),
        ScalarSerializer::Json => scalar,
    }
}

/// Merged view of a module list, ready to produce a schema.
pub struct SchemaBuilder {
    types: IndexMap<String, TypeConfig>,
    /// Type name → id of the module that declared it.
    owners: IndexMap<String, String>,
    connections: ConnectionRegistry,
    mutations: Vec<(String, MutationConfig)>,
    /// Extensions of types no module declares, with the extending module.
    unresolved_extensions: Vec<(String, String)>,
    handler: Option<Arc<dyn Handler>>,
}

impl SchemaBuilder {
    /// Merge `modules` in order. A type declared twice keeps the last
    /// declaration.
    pub fn new(modules: Vec<ModuleConfig>) -> Self {
        let mut builder = Self {
            types: IndexMap::new(),
            owners: IndexMap::new(),
            connections: ConnectionRegistry::default(),
            mutations: Vec::new(),
            unresolved_extensions: Vec::new(),
            handler: None,
        };

        for module in &modules {
            for ty in &module.types {
                builder.types.insert(ty.name().to_string(), ty.clone());
                builder.owners.insert(ty.name().to_string(), module.id.clone());
            }
        }

        for module in &modules {
            for (type_name, fields) in &module.type_extensions {
                builder.extend_type(type_name, fields, &module.id);
            }
            builder.apply_type_permissions(module);
            for connection in &module.connections {
                builder.connections.insert(connection.clone());
            }
            for mutation in &module.mutations {
                builder.mutations.push((module.id.clone(), mutation.clone()));
            }
        }

        builder.inherit_interface_fields();

        tracing::debug!(
            modules = modules.len(),
            types = builder.types.len(),
            connections = builder.connections.len(),
            mutations = builder.mutations.len(),
            "merged modules"
        );
        builder
    }

    /// Persistence handler used by connection fields, node lookups and
    /// declared mutations.
    pub fn handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handler = Some(handler);
        self
    }

    fn extend_type(
        &mut self,
        type_name: &str,
        fields: &IndexMap<String, FieldConfig>,
        module_id: &str,
    ) {
        if !self.types.contains_key(type_name) && matches!(type_name, QUERY_TYPE | MUTATION_TYPE) {
            self.types.insert(
                type_name.to_string(),
                ObjectTypeConfig::new(type_name).into(),
            );
            self.owners.insert(type_name.to_string(), module_id.to_string());
        }
        match self.types.get_mut(type_name).and_then(TypeConfig::fields_mut) {
            Some(target) => {
                target.extend(fields.iter().map(|(name, field)| (name.clone(), field.clone())));
            }
            None => self
                .unresolved_extensions
                .push((type_name.to_string(), module_id.to_string())),
        }
    }

    fn apply_type_permissions(&mut self, module: &ModuleConfig) {
        for (type_name, config) in &module.type_permissions {
            let Some(TypeConfig::Object(object)) = self.types.get_mut(type_name) else {
                continue;
            };
            if let Some(permissions) = &config.permissions {
                object.permissions = permissions.clone();
            }
            if let Some(mutations) = &config.mutations {
                object.mutations = mutations.clone();
            }
        }
    }

    /// Copy interface fields an implementing type does not redeclare.
    fn inherit_interface_fields(&mut self) {
        let interfaces: IndexMap<String, IndexMap<String, FieldConfig>> = self
            .types
            .values()
            .filter_map(|ty| match ty {
                TypeConfig::Interface(interface) => {
                    Some((interface.name.clone(), interface.fields.clone()))
                }
                _ => None,
            })
            .collect();

        for ty in self.types.values_mut() {
            let implemented = ty.interfaces().to_vec();
            let Some(fields) = ty.fields_mut() else {
                continue;
            };
            for interface in implemented {
                for (name, field) in interfaces.get(&interface).into_iter().flatten() {
                    if !fields.contains_key(name) {
                        fields.insert(name.clone(), field.clone());
                    }
                }
            }
        }
    }

    pub fn get_type_config(&self, name: &str) -> Option<&TypeConfig> {
        self.types.get(name)
    }

    pub fn get_object_type_config(&self, name: &str) -> Option<&ObjectTypeConfig> {
        self.types.get(name).and_then(TypeConfig::as_object)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeConfig> {
        self.types.values()
    }

    /// Connections by `SourceType.fieldName`.
    pub fn connection_configs(&self) -> &ConnectionRegistry {
        &self.connections
    }

    fn type_known(&self, name: &str) -> bool {
        is_host_scalar(name) || self.types.contains_key(name)
    }

    fn require(&self, name: &str, module: &str) -> Result<(), BuildError> {
        if self.type_known(name) {
            Ok(())
        } else {
            Err(BuildError::UnknownType {
                name: name.to_string(),
                module: module.to_string(),
            })
        }
    }

    fn check_references(&self) -> Result<(), BuildError> {
        if let Some((name, module)) = self.unresolved_extensions.first() {
            return Err(BuildError::UnknownType {
                name: name.clone(),
                module: module.clone(),
            });
        }

        for (name, ty) in &self.types {
            let owner = self.owners.get(name).map(String::as_str).unwrap_or_default();
            for field in ty.fields().into_iter().flat_map(|fields| fields.values()) {
                self.require(&field.type_name, owner)?;
                for argument in field.arguments.values() {
                    self.require(&argument.type_name, owner)?;
                }
            }
            for interface in ty.interfaces() {
                self.require(interface, owner)?;
            }
            if let Some(union) = ty.as_union() {
                for member in &union.type_names {
                    self.require(member, owner)?;
                }
            }
        }

        for connection in self.connections.iter().map(|(_, connection)| connection) {
            let owner = self
                .owners
                .get(&connection.source.type_name)
                .map(String::as_str)
                .unwrap_or_default();
            self.require(&connection.source.type_name, owner)?;
            self.require(&connection.node.type_name, owner)?;
        }

        for (module, mutation) in &self.mutations {
            let fields = mutation.input_fields.values().chain(mutation.fields.values());
            for field in fields.chain(mutation.output.iter()) {
                self.require(&field.type_name, module)?;
            }
        }
        Ok(())
    }

    fn object(&self, config: &ObjectTypeConfig) -> Object {
        let mut object = Object::new(config.name.as_str());
        if let Some(description) = &config.description {
            object = object.description(description.as_str());
        }
        for interface in &config.interfaces {
            object = object.implement(interface.as_str());
        }
        for (name, field) in config.fields.iter().filter(|(_, field)| field.is_readable()) {
            object = object.field(output_field(name, field, &self.types, &config.permissions));
        }
        for connection in self.connections.for_source(&config.name) {
            let node_permissions = self
                .get_object_type_config(&connection.node.type_name)
                .map(|node| node.permissions.clone())
                .unwrap_or_default();
            object = object.field(connection::connection_field(connection, node_permissions));
        }
        object
    }

    fn interface(config: &InterfaceTypeConfig) -> Interface {
        let mut interface = Interface::new(config.name.as_str());
        if let Some(description) = &config.description {
            interface = interface.description(description.as_str());
        }
        for parent in &config.interfaces {
            interface = interface.implement(parent.as_str());
        }
        for (name, field) in config.fields.iter().filter(|(_, field)| field.is_readable()) {
            let mut interface_field =
                InterfaceField::new(name.as_str(), TypeShape::from(field).to_type_ref());
            for (arg_name, argument) in &field.arguments {
                interface_field = interface_field.argument(input_value(
                    arg_name,
                    &TypeShape::from(argument),
                    argument.default_value.as_ref(),
                    argument.description.as_deref(),
                ));
            }
            if let Some(description) = &field.description {
                interface_field = interface_field.description(description.as_str());
            }
            interface = interface.field(interface_field);
        }
        interface
    }

    /// Build the executable schema.
    ///
    /// # Errors
    ///
    /// `BuildError::UnknownType` when a declaration references a missing
    /// type, `BuildError::Schema` when the merged types do not form a valid
    /// schema (e.g. no `Query` fields).
    pub fn get_schema(&self) -> Result<Schema, BuildError> {
        let has_query_fields = self
            .types
            .get(QUERY_TYPE)
            .and_then(TypeConfig::fields)
            .is_some_and(|fields| !fields.is_empty());
        if !has_query_fields {
            return Err(BuildError::Schema {
                message: format!("type {} must define at least one field", QUERY_TYPE),
            });
        }
        self.check_references()?;

        let mut mutation_root = match self.types.get(MUTATION_TYPE) {
            Some(TypeConfig::Object(config)) => Some(self.object(config)),
            _ => None,
        };
        let mut extra_types = Vec::new();
        for (_, mutation) in &self.mutations {
            let parts = mutation::mutation_parts(mutation, &self.types);
            let root = mutation_root.take().unwrap_or_else(|| Object::new(MUTATION_TYPE));
            mutation_root = Some(root.field(parts.field));
            extra_types.extend(parts.input.map(DynamicType::from));
            extra_types.extend(parts.payload.map(DynamicType::from));
        }

        let mut builder = Schema::build(
            QUERY_TYPE,
            mutation_root.as_ref().map(|_| MUTATION_TYPE),
            None,
        );
        if let Some(root) = mutation_root {
            builder = builder.register(root);
        }

        for (name, ty) in &self.types {
            if name == MUTATION_TYPE {
                continue;
            }
            builder = match ty {
                TypeConfig::Object(config) => builder.register(self.object(config)),
                TypeConfig::Interface(config) => builder.register(Self::interface(config)),
                TypeConfig::Union(config) => {
                    let mut union = Union::new(config.name.as_str());
                    if let Some(description) = &config.description {
                        union = union.description(description.as_str());
                    }
                    for member in &config.type_names {
                        union = union.possible_type(member.as_str());
                    }
                    builder.register(union)
                }
                TypeConfig::Enum(config) => {
                    let mut enum_type = Enum::new(config.name.as_str());
                    if let Some(description) = &config.description {
                        enum_type = enum_type.description(description.as_str());
                    }
                    for (value_name, value) in &config.values {
                        let mut item = EnumItem::new(value_name.as_str());
                        if let Some(description) = &value.description {
                            item = item.description(description.as_str());
                        }
                        if let Some(reason) = &value.deprecation_reason {
                            item = item.deprecation(Some(reason.as_str()));
                        }
                        enum_type = enum_type.item(item);
                    }
                    builder.register(enum_type)
                }
                TypeConfig::InputObject(config) => {
                    let mut input = InputObject::new(config.name.as_str());
                    if let Some(description) = &config.description {
                        input = input.description(description.as_str());
                    }
                    for (field_name, field) in &config.fields {
                        input = input.field(input_value(
                            field_name,
                            &TypeShape::from(field),
                            field.default_value.as_ref(),
                            field.description.as_deref(),
                        ));
                    }
                    builder.register(input)
                }
                TypeConfig::Scalar(config) => builder.register(scalar(
                    &config.name,
                    config.description.as_deref(),
                    config.serializer,
                )),
            };
        }

        for name in HOST_SCALARS {
            if !self.types.contains_key(*name) {
                builder = builder.register(scalar(name, None, ScalarSerializer::String));
            }
        }

        if !self.connections.is_empty() {
            if !self.types.contains_key(PAGE_INFO_TYPE) {
                builder = builder.register(self.object(&page_info_type()));
            }
            for connection in self.connections.iter().map(|(_, connection)| connection) {
                for object in connection::connection_types(connection) {
                    builder = builder.register(object);
                }
            }
        }

        for ty in extra_types {
            builder = builder.register(ty);
        }

        let mut type_permissions = TypePermissions::default();
        for config in self.types.values().filter_map(TypeConfig::as_object) {
            if !config.permissions.is_empty() {
                type_permissions.insert(config.name.clone(), config.permissions.clone());
            }
        }
        builder = builder.data(type_permissions);
        builder = builder.data(self.connections.clone());
        if let Some(handler) = &self.handler {
            builder = builder.data(handler.clone());
        }

        let schema = builder.finish().map_err(|err| BuildError::Schema {
            message: err.to_string(),
        })?;
        tracing::info!(
            types = self.types.len(),
            connections = self.connections.len(),
            mutations = self.mutations.len(),
            "schema built"
        );
        Ok(schema)
    }
}

/// Enhance, validate and merge `modules`.
///
/// `current_modules` is the deployed module set used by migration rules.
///
/// # Errors
///
/// `BuildError::Enhance` when enhancement fails, `BuildError::Validation`
/// with every problem found when any rule fails.
pub fn build_schema(
    modules: Vec<ModuleConfig>,
    current_modules: &[ModuleConfig],
    config: &ProjectConfig,
) -> Result<SchemaBuilder, BuildError> {
    let modules = enhance_modules(modules, config)?;
    let errors = validate_modules(&modules, current_modules, &default_rules(), config);
    if !errors.is_empty() {
        return Err(BuildError::Validation { errors });
    }
    Ok(SchemaBuilder::new(modules))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConnectionConfig, FieldAccess, Role, TypePermissionConfig};

    fn query_module() -> ModuleConfig {
        ModuleConfig::new("core")
            .native()
            .with_type(InterfaceTypeConfig::new("Node").field("id", FieldConfig::new("ID").required()))
            .with_type_extension(QUERY_TYPE, "version", FieldConfig::new("String"))
    }

    #[test]
    fn last_declaration_wins() {
        let first = ModuleConfig::new("a")
            .with_type(ObjectTypeConfig::new("Blog_Post").field("title", FieldConfig::new("String")));
        let second = ModuleConfig::new("b")
            .with_type(ObjectTypeConfig::new("Blog_Post").field("body", FieldConfig::new("String")));
        let builder = SchemaBuilder::new(vec![first, second]);
        let post = builder.get_object_type_config("Blog_Post").unwrap();
        assert!(post.fields.contains_key("body"));
        assert!(!post.fields.contains_key("title"));
    }

    #[test]
    fn extensions_and_permission_overrides() {
        let blog = ModuleConfig::new("blog")
            .with_type(ObjectTypeConfig::new("Blog_Post").implements("Node"));
        let mut acl = ModuleConfig::new("acl").with_type_extension(
            "Blog_Post",
            "acl_owner",
            FieldConfig::new("String"),
        );
        acl.type_permissions.insert(
            "Blog_Post".into(),
            TypePermissionConfig {
                permissions: Some(vec![Permission::new(Role::Admin)]),
                mutations: None,
            },
        );

        let builder = SchemaBuilder::new(vec![query_module(), blog, acl]);
        let post = builder.get_object_type_config("Blog_Post").unwrap();
        assert!(post.fields.contains_key("acl_owner"));
        assert!(post.fields.contains_key("id"), "inherited from Node");
        assert_eq!(post.permissions, vec![Permission::new(Role::Admin)]);
        assert!(builder
            .get_object_type_config(QUERY_TYPE)
            .unwrap()
            .fields
            .contains_key("version"));
    }

    #[test]
    fn connection_registry_is_exposed() {
        let blog = ModuleConfig::new("blog").with_connection(ConnectionConfig::inline(
            "posts",
            "User",
            "Blog_Post",
            "author",
        ));
        let builder = SchemaBuilder::new(vec![blog]);
        assert!(builder.connection_configs().contains("User", "posts"));
    }

    #[test]
    fn missing_query_fields() {
        let err = SchemaBuilder::new(Vec::new()).get_schema().unwrap_err();
        assert!(matches!(err, BuildError::Schema { .. }));
    }

    #[test]
    fn unknown_field_type() {
        let module = query_module()
            .with_type_extension(QUERY_TYPE, "post", FieldConfig::new("Blog_Missing"));
        let err = SchemaBuilder::new(vec![module]).get_schema().unwrap_err();
        match err {
            BuildError::UnknownType { name, module } => {
                assert_eq!(name, "Blog_Missing");
                assert_eq!(module, "core");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unresolved_extension_target() {
        let module = query_module().with_type_extension("Viewer", "x", FieldConfig::new("String"));
        assert!(matches!(
            SchemaBuilder::new(vec![module]).get_schema(),
            Err(BuildError::UnknownType { .. })
        ));
    }

    #[test]
    fn sdl_contains_merged_types() {
        let blog = ModuleConfig::new("blog").with_type(
            ObjectTypeConfig::new("Blog_Post")
                .implements("Node")
                .field("title", FieldConfig::new("String").required())
                .field("secret", FieldConfig::new("String").access(&[FieldAccess::Create])),
        );
        let schema = SchemaBuilder::new(vec![query_module(), blog]).get_schema().unwrap();
        let sdl = schema.sdl();
        assert!(sdl.contains("type Blog_Post implements Node"));
        assert!(sdl.contains("title: String!"));
        assert!(!sdl.contains("secret"));
        assert!(sdl.contains("scalar DateTime"));
    }
}
