//! Rules for connection declarations.

use crate::error::PackageError;
use crate::types::{
    ConnectionConfig, ConnectionEndpoint, HandlerKind, TypeConfig, TypeKind, NODE_INTERFACE,
};
use crate::validation::{ValidationContext, ValidationRule};

use super::naming::{foreign_field_pattern, FIELD_NAME, RESERVED_FIELD_NAMES};

fn connection_error(connection: &ConnectionConfig, message: String) -> PackageError {
    PackageError::new(format!("Connection \"{}\": {}", connection.name, message))
        .with_path(["connections", connection.name.as_str()])
}

/// Type name a field must have to reference `endpoint`.
///
/// An `ID` key on a Node type is referenced by the type itself, any other
/// `ID` key by a `String` field. Other keys are referenced by their own type.
fn key_reference(endpoint: &ConnectionEndpoint, ty: &TypeConfig) -> Option<String> {
    let key = ty.fields()?.get(endpoint.key_field())?;
    let reference = if key.type_name == "ID" {
        if ty.implements(NODE_INTERFACE) {
            ty.name().to_string()
        } else {
            "String".to_string()
        }
    } else {
        key.type_name.clone()
    };
    Some(reference)
}

fn normalize_field_type(type_name: &str) -> &str {
    if type_name == "ID" {
        "String"
    } else {
        type_name
    }
}

/// Resolve the endpoint's type, reporting when it is missing or not an object.
fn endpoint_type<'a>(
    ctx: &mut ValidationContext<'a>,
    connection: &ConnectionConfig,
    role: &str,
    type_name: &str,
) -> Option<&'a TypeConfig> {
    match ctx.get_type(type_name) {
        Some(ty) if ty.kind() == TypeKind::Object => Some(ty),
        Some(ty) => {
            ctx.report_error(connection_error(
                connection,
                format!(
                    "{} type \"{}\" must be an OBJECT type, found {}",
                    role,
                    type_name,
                    ty.kind()
                ),
            ));
            None
        }
        None => {
            ctx.report_error(connection_error(
                connection,
                format!("{} type \"{}\" does not exist", role, type_name),
            ));
            None
        }
    }
}

/// Check that `holder.field_name` references `target` through its key.
fn check_reference(
    ctx: &mut ValidationContext<'_>,
    connection: &ConnectionConfig,
    holder: &TypeConfig,
    field_name: &str,
    endpoint: &ConnectionEndpoint,
    target: &TypeConfig,
) {
    let field = match holder.fields().and_then(|fields| fields.get(field_name)) {
        Some(field) => field,
        None => {
            ctx.report_error(connection_error(
                connection,
                format!(
                    "field \"{}\" does not exist on type \"{}\"",
                    field_name,
                    holder.name()
                ),
            ));
            return;
        }
    };

    let expected = match key_reference(endpoint, target) {
        Some(expected) => expected,
        None => {
            ctx.report_error(connection_error(
                connection,
                format!(
                    "key field \"{}\" does not exist on type \"{}\"",
                    endpoint.key_field(),
                    target.name()
                ),
            ));
            return;
        }
    };

    if normalize_field_type(&field.type_name) != expected {
        ctx.report_error(connection_error(
            connection,
            format!(
                "field \"{}.{}\" of type \"{}\" does not match the key field \"{}.{}\", expected type \"{}\"",
                holder.name(),
                field_name,
                field.type_name,
                target.name(),
                endpoint.key_field(),
                expected
            ),
        ));
    }
}

/// Fields that link the edge (or the inline node) to the source and node
/// types must match the referenced key fields.
#[derive(Default)]
pub struct EdgeFieldTypesMatch;

impl ValidationRule for EdgeFieldTypesMatch {
    fn enter_connection(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        connection: &ConnectionConfig,
        _previous: Option<&ConnectionConfig>,
    ) {
        let source = endpoint_type(ctx, connection, "source", &connection.source.type_name);
        let node = endpoint_type(ctx, connection, "node", &connection.node.type_name);
        let (Some(source), Some(node)) = (source, node) else {
            return;
        };

        match &connection.edge.type_name {
            Some(edge_type) => {
                let Some(edge) = endpoint_type(ctx, connection, "edge", edge_type) else {
                    return;
                };
                check_reference(
                    ctx,
                    connection,
                    edge,
                    &connection.edge.source_field,
                    &connection.source,
                    source,
                );
                match &connection.edge.node_field {
                    Some(node_field) => {
                        check_reference(ctx, connection, edge, node_field, &connection.node, node)
                    }
                    None => ctx.report_error(connection_error(
                        connection,
                        format!("edge type \"{}\" requires a nodeField", edge_type),
                    )),
                }
            }
            None => check_reference(
                ctx,
                connection,
                node,
                &connection.edge.source_field,
                &connection.source,
                source,
            ),
        }
    }
}

/// The type holding the join fields must be stored by the Postgres handler.
#[derive(Default)]
pub struct ConnectionHandlerSupported;

impl ValidationRule for ConnectionHandlerSupported {
    fn enter_connection(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        connection: &ConnectionConfig,
        _previous: Option<&ConnectionConfig>,
    ) {
        let holder = connection
            .edge
            .type_name
            .as_deref()
            .unwrap_or(&connection.node.type_name);
        let Some(object) = ctx.get_type(holder).and_then(TypeConfig::as_object) else {
            return;
        };
        let supported = object
            .handler
            .is_some_and(|handler| handler.kind == HandlerKind::Postgres);
        if !supported {
            ctx.report_error(connection_error(
                connection,
                format!(
                    "type \"{}\" must be stored with the POSTGRES handler",
                    holder
                ),
            ));
        }
    }
}

#[derive(Default)]
pub struct ConnectionNodeImplementsNode;

impl ValidationRule for ConnectionNodeImplementsNode {
    fn enter_connection(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        connection: &ConnectionConfig,
        _previous: Option<&ConnectionConfig>,
    ) {
        let type_name = &connection.node.type_name;
        let implements = ctx
            .get_type(type_name)
            .map(|ty| ty.implements(NODE_INTERFACE));
        if implements == Some(false) {
            ctx.report_error(connection_error(
                connection,
                format!(
                    "type \"{}\" must implement the {} interface",
                    type_name, NODE_INTERFACE
                ),
            ));
        }
    }
}

/// Connection field names follow the field naming rules of the module and
/// must not shadow existing or reserved fields of the source type.
#[derive(Default)]
pub struct ConnectionNames;

impl ValidationRule for ConnectionNames {
    fn enter_connection(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        connection: &ConnectionConfig,
        _previous: Option<&ConnectionConfig>,
    ) {
        let Some(module) = ctx.module().filter(|m| !m.is_native()) else {
            return;
        };
        let name = connection.name.as_str();
        let source_type = connection.source.type_name.as_str();

        let owned = module.find_type(source_type).is_some();
        let foreign_pattern = match (&module.namespace, owned) {
            (Some(namespace), false) => foreign_field_pattern(namespace),
            _ => None,
        };
        let pattern = foreign_pattern.as_ref().unwrap_or(&*FIELD_NAME);

        if !pattern.is_match(name) {
            ctx.report_error(connection_error(
                connection,
                format!("invalid name, must match the pattern {}", pattern.as_str()),
            ));
        } else if RESERVED_FIELD_NAMES.contains(&name) {
            ctx.report_error(connection_error(
                connection,
                "name is reserved".to_string(),
            ));
        } else if ctx.get_field(source_type, name).is_some() {
            ctx.report_error(connection_error(
                connection,
                format!("type \"{}\" already has a field \"{}\"", source_type, name),
            ));
        }
    }
}
