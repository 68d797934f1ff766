//! Declarative module configuration model.
//!
//! A project is an ordered list of [`ModuleConfig`]s. Each module contributes
//! types, type extensions, connections, permissions and mutations that the
//! schema builder merges into one executable schema.

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hooks::{FieldResolver, ModuleEnhancer, TypeResolver};

/// GraphQL built-in scalars.
pub const BUILTIN_SCALARS: &[&str] = &["ID", "String", "Int", "Float", "Boolean"];

/// Scalars provided by the host platform in addition to the built-ins.
pub const HOST_SCALARS: &[&str] = &["DateTime"];

pub const NODE_INTERFACE: &str = "Node";
pub const CONTENT_INTERFACE: &str = "Content";
pub const TIMESTAMPED_INTERFACE: &str = "TimeStampedInterface";

pub const QUERY_TYPE: &str = "Query";
pub const MUTATION_TYPE: &str = "Mutation";
pub const SUBSCRIPTION_TYPE: &str = "Subscription";

/// Default key field of connection endpoints.
pub const DEFAULT_KEY_FIELD: &str = "id";

pub fn is_builtin_scalar(name: &str) -> bool {
    BUILTIN_SCALARS.contains(&name)
}

pub fn is_host_scalar(name: &str) -> bool {
    is_builtin_scalar(name) || HOST_SCALARS.contains(&name)
}

pub fn is_root_type(name: &str) -> bool {
    matches!(name, QUERY_TYPE | MUTATION_TYPE | SUBSCRIPTION_TYPE)
}

pub type FieldConfigMap = IndexMap<String, FieldConfig>;
pub type ArgumentConfigMap = IndexMap<String, ArgumentConfig>;

/// NATIVE modules ship with the platform, DYNAMIC modules are user-authored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModuleKind {
    Native,
    #[default]
    Dynamic,
}

/// A named, versioned unit of schema declarations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleConfig {
    pub id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub kind: ModuleKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub types: Vec<TypeConfig>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub type_extensions: IndexMap<String, FieldConfigMap>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub type_permissions: IndexMap<String, TypePermissionConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<ConnectionConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mutations: Vec<MutationConfig>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub functions: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listeners: Vec<Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub resolvers: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_module: Option<RemoteModuleConfig>,
    /// SDL of the remote API proxied by this module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_schema: Option<String>,
    /// File to read `raw_schema` from, relative to the module file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_schema_path: Option<PathBuf>,
    #[serde(skip)]
    pub enhance: Option<ModuleEnhancer>,
}

impl ModuleConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn native(mut self) -> Self {
        self.kind = ModuleKind::Native;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_type(mut self, config: impl Into<TypeConfig>) -> Self {
        self.types.push(config.into());
        self
    }

    pub fn with_type_extension(
        mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        field: FieldConfig,
    ) -> Self {
        self.type_extensions
            .entry(type_name.into())
            .or_default()
            .insert(field_name.into(), field);
        self
    }

    pub fn with_connection(mut self, connection: ConnectionConfig) -> Self {
        self.connections.push(connection);
        self
    }

    pub fn with_mutation(mut self, mutation: MutationConfig) -> Self {
        self.mutations.push(mutation);
        self
    }

    pub fn with_remote(mut self, remote: RemoteModuleConfig, raw_schema: impl Into<String>) -> Self {
        self.remote_module = Some(remote);
        self.raw_schema = Some(raw_schema.into());
        self
    }

    pub fn with_enhancer(mut self, enhancer: ModuleEnhancer) -> Self {
        self.enhance = Some(enhancer);
        self
    }

    pub fn is_native(&self) -> bool {
        self.kind == ModuleKind::Native
    }

    /// Whether the module's types were generated from a remote schema.
    pub fn is_remote(&self) -> bool {
        self.remote_module.is_some() || self.raw_schema.is_some()
    }

    pub fn find_type(&self, name: &str) -> Option<&TypeConfig> {
        self.types.iter().find(|t| t.name() == name)
    }

    pub fn find_connection(&self, name: &str) -> Option<&ConnectionConfig> {
        self.connections.iter().find(|c| c.name == name)
    }
}

/// Kind discriminant of a [`TypeConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
    Scalar,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Object => "OBJECT",
            TypeKind::Interface => "INTERFACE",
            TypeKind::Union => "UNION",
            TypeKind::Enum => "ENUM",
            TypeKind::InputObject => "INPUT_OBJECT",
            TypeKind::Scalar => "SCALAR",
        }
    }

    /// Types that carry a selection set.
    pub fn is_composite(&self) -> bool {
        matches!(self, TypeKind::Object | TypeKind::Interface | TypeKind::Union)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A type declaration, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeConfig {
    Object(ObjectTypeConfig),
    Interface(InterfaceTypeConfig),
    Union(UnionTypeConfig),
    Enum(EnumTypeConfig),
    InputObject(InputObjectTypeConfig),
    Scalar(ScalarTypeConfig),
}

impl TypeConfig {
    pub fn name(&self) -> &str {
        match self {
            TypeConfig::Object(t) => &t.name,
            TypeConfig::Interface(t) => &t.name,
            TypeConfig::Union(t) => &t.name,
            TypeConfig::Enum(t) => &t.name,
            TypeConfig::InputObject(t) => &t.name,
            TypeConfig::Scalar(t) => &t.name,
        }
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            TypeConfig::Object(_) => TypeKind::Object,
            TypeConfig::Interface(_) => TypeKind::Interface,
            TypeConfig::Union(_) => TypeKind::Union,
            TypeConfig::Enum(_) => TypeKind::Enum,
            TypeConfig::InputObject(_) => TypeKind::InputObject,
            TypeConfig::Scalar(_) => TypeKind::Scalar,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            TypeConfig::Object(t) => t.description.as_deref(),
            TypeConfig::Interface(t) => t.description.as_deref(),
            TypeConfig::Union(t) => t.description.as_deref(),
            TypeConfig::Enum(t) => t.description.as_deref(),
            TypeConfig::InputObject(t) => t.description.as_deref(),
            TypeConfig::Scalar(t) => t.description.as_deref(),
        }
    }

    pub fn fields(&self) -> Option<&FieldConfigMap> {
        match self {
            TypeConfig::Object(t) => Some(&t.fields),
            TypeConfig::Interface(t) => Some(&t.fields),
            TypeConfig::InputObject(t) => Some(&t.fields),
            _ => None,
        }
    }

    pub fn fields_mut(&mut self) -> Option<&mut FieldConfigMap> {
        match self {
            TypeConfig::Object(t) => Some(&mut t.fields),
            TypeConfig::Interface(t) => Some(&mut t.fields),
            TypeConfig::InputObject(t) => Some(&mut t.fields),
            _ => None,
        }
    }

    pub fn interfaces(&self) -> &[String] {
        match self {
            TypeConfig::Object(t) => &t.interfaces,
            TypeConfig::Interface(t) => &t.interfaces,
            _ => &[],
        }
    }

    pub fn implements(&self, interface: &str) -> bool {
        self.interfaces().iter().any(|i| i == interface)
    }

    pub fn as_object(&self) -> Option<&ObjectTypeConfig> {
        match self {
            TypeConfig::Object(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_union(&self) -> Option<&UnionTypeConfig> {
        match self {
            TypeConfig::Union(t) => Some(t),
            _ => None,
        }
    }
}

impl From<ObjectTypeConfig> for TypeConfig {
    fn from(config: ObjectTypeConfig) -> Self {
        TypeConfig::Object(config)
    }
}

impl From<InterfaceTypeConfig> for TypeConfig {
    fn from(config: InterfaceTypeConfig) -> Self {
        TypeConfig::Interface(config)
    }
}

impl From<UnionTypeConfig> for TypeConfig {
    fn from(config: UnionTypeConfig) -> Self {
        TypeConfig::Union(config)
    }
}

impl From<EnumTypeConfig> for TypeConfig {
    fn from(config: EnumTypeConfig) -> Self {
        TypeConfig::Enum(config)
    }
}

impl From<InputObjectTypeConfig> for TypeConfig {
    fn from(config: InputObjectTypeConfig) -> Self {
        TypeConfig::InputObject(config)
    }
}

impl From<ScalarTypeConfig> for TypeConfig {
    fn from(config: ScalarTypeConfig) -> Self {
        TypeConfig::Scalar(config)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectTypeConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: FieldConfigMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<HandlerConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<Permission>,
    #[serde(default, skip_serializing_if = "MutationPermissions::is_empty")]
    pub mutations: MutationPermissions,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auto_complete_fields: Vec<String>,
}

impl ObjectTypeConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, field: FieldConfig) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    pub fn handler(mut self, kind: HandlerKind) -> Self {
        self.handler = Some(HandlerConfig { kind });
        self
    }

    pub fn permission(mut self, permission: Permission) -> Self {
        self.permissions.push(permission);
        self
    }

    pub fn index(mut self, index: IndexConfig) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn auto_complete(mut self, fields: &[&str]) -> Self {
        self.auto_complete_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn implements_interface(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|i| i == interface)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceTypeConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: FieldConfigMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<String>,
    #[serde(skip)]
    pub resolve_type: Option<TypeResolver>,
}

impl InterfaceTypeConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn field(mut self, name: impl Into<String>, field: FieldConfig) -> Self {
        self.fields.insert(name.into(), field);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnionTypeConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub type_names: Vec<String>,
    #[serde(skip)]
    pub resolve_type: Option<TypeResolver>,
}

impl UnionTypeConfig {
    pub fn new<I, S>(name: impl Into<String>, type_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            type_names: type_names.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumValueConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumTypeConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub values: IndexMap<String, EnumValueConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputObjectTypeConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: FieldConfigMap,
}

/// Primitive representation a custom scalar serializes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScalarSerializer {
    #[default]
    String,
    Int,
    Float,
    Boolean,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarTypeConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub serializer: ScalarSerializer,
}

/// List nullability: `true`/`false` shorthand or one entry per list
/// dimension, outermost first, `true` meaning non-null items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListConfig {
    Flag(bool),
    Dimensions(Vec<bool>),
}

impl Default for ListConfig {
    fn default() -> Self {
        ListConfig::Flag(false)
    }
}

impl ListConfig {
    pub fn dimensions(&self) -> Vec<bool> {
        match self {
            ListConfig::Flag(true) => vec![true],
            ListConfig::Flag(false) => Vec::new(),
            ListConfig::Dimensions(dims) => dims.clone(),
        }
    }

    pub fn is_list(&self) -> bool {
        !self.dimensions().is_empty()
    }

    fn is_default(&self) -> bool {
        !self.is_list()
    }
}

impl From<Vec<bool>> for ListConfig {
    fn from(dims: Vec<bool>) -> Self {
        if dims.is_empty() {
            ListConfig::Flag(false)
        } else {
            ListConfig::Dimensions(dims)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldAccess {
    Read,
    Create,
    Update,
}

/// Input validator declaration, interpreted by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    pub type_name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "ListConfig::is_default")]
    pub list: ListConfig,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub arguments: ArgumentConfigMap,
    /// Operations the field takes part in; `None` means all of them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<Vec<FieldAccess>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<ValidatorConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_reason: Option<String>,
    #[serde(skip)]
    pub resolve: Option<FieldResolver>,
}

impl FieldConfig {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn list(mut self, list: impl Into<ListConfig>) -> Self {
        self.list = list.into();
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn argument(mut self, name: impl Into<String>, argument: ArgumentConfig) -> Self {
        self.arguments.insert(name.into(), argument);
        self
    }

    pub fn access(mut self, access: &[FieldAccess]) -> Self {
        self.access = Some(access.to_vec());
        self
    }

    pub fn resolve(mut self, resolver: FieldResolver) -> Self {
        self.resolve = Some(resolver);
        self
    }

    pub fn is_readable(&self) -> bool {
        self.access
            .as_ref()
            .map_or(true, |access| access.contains(&FieldAccess::Read))
    }
}

impl From<bool> for ListConfig {
    fn from(flag: bool) -> Self {
        ListConfig::Flag(flag)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentConfig {
    pub type_name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "ListConfig::is_default")]
    pub list: ListConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ArgumentConfig {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Persistence backend of an object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HandlerKind {
    Postgres,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerConfig {
    pub kind: HandlerKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Anonymous,
    Authenticated,
    Admin,
    Staff,
    Runtime,
}

/// Grants `role` access, optionally limited by a filter query and a field
/// list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

impl Permission {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            query: None,
            fields: None,
        }
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationPermissions {
    pub create: Vec<Permission>,
    pub update: Vec<Permission>,
    pub delete: Vec<Permission>,
    pub publish: Vec<Permission>,
    pub unpublish: Vec<Permission>,
}

impl MutationPermissions {
    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, permissions)| permissions.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Vec<Permission>)> {
        [
            ("create", &self.create),
            ("update", &self.update),
            ("delete", &self.delete),
            ("publish", &self.publish),
            ("unpublish", &self.unpublish),
        ]
        .into_iter()
    }
}

/// Permissions contributed to a type owned by another module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypePermissionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<Permission>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutations: Option<MutationPermissions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub fields: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

impl IndexConfig {
    pub fn new(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            unique: false,
        }
    }
}

/// One side of a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEndpoint {
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_field: Option<String>,
}

impl ConnectionEndpoint {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            key_field: None,
        }
    }

    pub fn key_field(&self) -> &str {
        self.key_field.as_deref().unwrap_or(DEFAULT_KEY_FIELD)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionEdge {
    /// Mediating edge type. Without it the node type holds `source_field`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub source_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_field: Option<String>,
}

/// Declarative relationship resolved into a paginated connection field named
/// `name` on the source type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub source: ConnectionEndpoint,
    pub edge: ConnectionEdge,
    pub node: ConnectionEndpoint,
}

impl ConnectionConfig {
    /// Connection where `node_type.source_field` points back at the source.
    pub fn inline(
        name: impl Into<String>,
        source_type: impl Into<String>,
        node_type: impl Into<String>,
        source_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            source: ConnectionEndpoint::new(source_type),
            edge: ConnectionEdge {
                type_name: None,
                source_field: source_field.into(),
                node_field: None,
            },
            node: ConnectionEndpoint::new(node_type),
        }
    }

    /// Connection mediated by an explicit edge type.
    pub fn through(
        name: impl Into<String>,
        source_type: impl Into<String>,
        edge_type: impl Into<String>,
        source_field: impl Into<String>,
        node_field: impl Into<String>,
        node_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            source: ConnectionEndpoint::new(source_type),
            edge: ConnectionEdge {
                type_name: Some(edge_type.into()),
                source_field: source_field.into(),
                node_field: Some(node_field.into()),
            },
            node: ConnectionEndpoint::new(node_type),
        }
    }

    /// Registry key: `SourceType.connectionName`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.source.type_name, self.name)
    }
}

/// A root mutation field.
///
/// Relay-style mutations declare `input_fields` and payload `fields`; plain
/// mutations (e.g. proxied from a remote API) set `output` instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub input_fields: FieldConfigMap,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: FieldConfigMap,
    /// `None` leaves the mutation unrestricted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<Permission>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<FieldConfig>,
    #[serde(skip)]
    pub resolve: Option<FieldResolver>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCacheConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u64>,
}

/// Endpoint of a proxied GraphQL API. String values may contain
/// `${settings.*}` and `${request.*}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteModuleConfig {
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<RemoteCacheConfig>,
}

impl RemoteModuleConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            headers: IndexMap::new(),
            cache: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn module_config_from_json() {
        let module: ModuleConfig = serde_json::from_value(json!({
            "id": "blog",
            "version": "1.0.0",
            "namespace": "Blog",
            "types": [
                {
                    "kind": "OBJECT",
                    "name": "Blog_Post",
                    "interfaces": ["Node"],
                    "handler": {"kind": "POSTGRES"},
                    "fields": {
                        "id": {"typeName": "ID", "required": true},
                        "tags": {"typeName": "String", "list": [true]}
                    }
                },
                {"kind": "INPUT_OBJECT", "name": "Blog_PostInput", "fields": {}}
            ]
        }))
        .unwrap();

        assert_eq!(module.kind, ModuleKind::Dynamic);
        assert_eq!(module.types.len(), 2);
        assert_eq!(module.types[1].kind(), TypeKind::InputObject);
        let post = module.find_type("Blog_Post").unwrap();
        assert!(post.implements(NODE_INTERFACE));
        let fields = post.fields().unwrap();
        assert_eq!(fields["tags"].list.dimensions(), vec![true]);
        assert!(!fields["id"].list.is_list());
    }

    #[test]
    fn list_shorthand() {
        assert_eq!(ListConfig::Flag(true).dimensions(), vec![true]);
        assert!(ListConfig::Flag(false).dimensions().is_empty());
        assert_eq!(
            ListConfig::from(vec![false, true]).dimensions(),
            vec![false, true]
        );
        assert_eq!(ListConfig::from(Vec::new()), ListConfig::Flag(false));
    }

    #[test]
    fn connection_defaults_to_id_key() {
        let connection = ConnectionConfig::inline("posts", "User", "Blog_Post", "author");
        assert_eq!(connection.source.key_field(), "id");
        assert_eq!(connection.key(), "User.posts");
    }

    #[test]
    fn field_access_controls_readability() {
        assert!(FieldConfig::new("String").is_readable());
        assert!(!FieldConfig::new("String")
            .access(&[FieldAccess::Create])
            .is_readable());
    }

    #[test]
    fn mutation_permissions_iterate_in_order() {
        let permissions = MutationPermissions {
            delete: vec![Permission::new(Role::Admin)],
            ..Default::default()
        };
        let names: Vec<_> = permissions.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["create", "update", "delete", "publish", "unpublish"]);
        assert!(!permissions.is_empty());
        assert!(MutationPermissions::default().is_empty());
    }
}
