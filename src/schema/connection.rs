//! Connection fields: generated `Connection`/`Edge` types and the resolver
//! that loads a page through the [`Handler`](super::Handler).

use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputValue, Object, ResolverContext, TypeRef,
};
use convert_case::{Case, Casing};
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::UserError;
use crate::types::{ConnectionConfig, Permission};

use super::handler::{ConnectionRequest, PageArguments};
use super::permissions::check_permissions;
use super::value::{parent_json, property_resolver, OutputKind};
use super::{auth_context, handler};

pub const PAGE_INFO_TYPE: &str = "PageInfo";

/// Connections by `SourceType.fieldName`.
///
/// Registered as schema data so resolvers created before the schema (remote
/// modules) can look up the live connection set.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: IndexMap<String, ConnectionConfig>,
}

impl ConnectionRegistry {
    pub fn insert(&mut self, connection: ConnectionConfig) {
        self.connections.insert(connection.key(), connection);
    }

    pub fn get(&self, type_name: &str, field_name: &str) -> Option<&ConnectionConfig> {
        self.connections.get(&format!("{}.{}", type_name, field_name))
    }

    pub fn contains(&self, type_name: &str, field_name: &str) -> bool {
        self.get(type_name, field_name).is_some()
    }

    /// Connections attached to `type_name`.
    pub fn for_source<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a ConnectionConfig> {
        self.connections
            .values()
            .filter(move |connection| connection.source.type_name == type_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConnectionConfig)> {
        self.connections.iter()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

fn type_prefix(connection: &ConnectionConfig) -> String {
    format!(
        "{}{}",
        connection.source.type_name,
        connection.name.to_case(Case::Pascal)
    )
}

pub fn connection_type_name(connection: &ConnectionConfig) -> String {
    format!("{}Connection", type_prefix(connection))
}

pub fn edge_type_name(connection: &ConnectionConfig) -> String {
    format!("{}Edge", type_prefix(connection))
}

/// The `Connection` and `Edge` object types of `connection`.
pub(crate) fn connection_types(connection: &ConnectionConfig) -> [Object; 2] {
    let edge_name = edge_type_name(connection);
    let edge = Object::new(edge_name.as_str())
        .field(Field::new(
            "cursor",
            TypeRef::named_nn(TypeRef::STRING),
            property_resolver("cursor".into(), Vec::new(), OutputKind::Leaf),
        ))
        .field(Field::new(
            "node",
            TypeRef::named_nn(connection.node.type_name.as_str()),
            property_resolver("node".into(), Vec::new(), OutputKind::Object),
        ));

    let connection_object = Object::new(connection_type_name(connection))
        .field(Field::new(
            "edges",
            TypeRef::named_nn_list_nn(edge_name.as_str()),
            property_resolver("edges".into(), vec![true], OutputKind::Object),
        ))
        .field(Field::new(
            "pageInfo",
            TypeRef::named_nn(PAGE_INFO_TYPE),
            property_resolver("pageInfo".into(), Vec::new(), OutputKind::Object),
        ))
        .field(Field::new(
            "totalCount",
            TypeRef::named(TypeRef::INT),
            property_resolver("totalCount".into(), Vec::new(), OutputKind::Leaf),
        ));

    [edge, connection_object]
}

fn page_arguments(ctx: &ResolverContext<'_>) -> async_graphql::Result<PageArguments> {
    let present = |name: &str| ctx.args.get(name).filter(|value| !value.is_null());
    let int = |name: &str| present(name).map(|value| value.i64()).transpose();
    let string = |name: &str| {
        present(name)
            .map(|value| value.string().map(str::to_string))
            .transpose()
    };
    Ok(PageArguments {
        first: int("first")?,
        last: int("last")?,
        before: string("before")?,
        after: string("after")?,
    })
}

/// The connection field added to the source type.
///
/// `permissions` are the read permissions of the node type.
pub(crate) fn connection_field(connection: &ConnectionConfig, permissions: Vec<Permission>) -> Field {
    let config = connection.clone();
    let mut field = Field::new(
        connection.name.as_str(),
        TypeRef::named_nn(connection_type_name(connection)),
        move |ctx| {
            let connection = config.clone();
            let permissions = permissions.clone();
            FieldFuture::new(async move {
                let handler = handler(&ctx)?;
                let auth = auth_context(&ctx);
                let filters = check_permissions(&permissions, &auth, None)
                    .map_err(UserError::into_graphql_error)?;
                let source_key = parent_json(&ctx)
                    .and_then(|parent| parent.get(connection.source.key_field()).cloned())
                    .unwrap_or(Value::Null);
                let page = page_arguments(&ctx)?;

                let result = handler
                    .load_connection(ConnectionRequest {
                        connection,
                        source_key,
                        page,
                        auth,
                        filters,
                    })
                    .await
                    .map_err(UserError::into_graphql_error)?;
                let value = serde_json::to_value(result).map_err(|err| {
                    UserError::internal(format!("cannot serialize connection page: {}", err))
                        .into_graphql_error()
                })?;
                Ok(Some(FieldValue::owned_any(value)))
            })
        },
    )
    .argument(InputValue::new("first", TypeRef::named(TypeRef::INT)))
    .argument(InputValue::new("last", TypeRef::named(TypeRef::INT)))
    .argument(InputValue::new("before", TypeRef::named(TypeRef::STRING)))
    .argument(InputValue::new("after", TypeRef::named(TypeRef::STRING)));

    if let Some(description) = &connection.description {
        field = field.description(description.as_str());
    }
    field
}
