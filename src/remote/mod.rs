//! Remote modules: a GraphQL API proxied under the module's namespace.
//!
//! [`build_remote_module`] converts the module's `rawSchema` into type
//! configs and exposes every remote root field as a `Query` extension or a
//! mutation. At execution time the root resolver forwards the client's
//! selection, rewritten so that join keys of connections declared by other
//! modules are always fetched.

mod convert;
mod fetcher;
mod selection;

use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::dynamic::{FieldFuture, ResolverContext};
use async_graphql::{PathSegment, ServerError};
use indexmap::IndexMap;
use serde_json::Value;

use crate::config::ProjectConfig;
use crate::error::{RemoteModuleError, UserError};
use crate::hooks::{FieldResolver, Resolve};
use crate::schema::{to_field_value, ConnectionRegistry, OutputKind, ProjectSettings, RequestInfo};
use crate::shape::TypeShape;
use crate::types::{FieldConfig, ModuleConfig, MutationConfig, TypeConfig, QUERY_TYPE};

pub use convert::{convert_schema, RemoteSchema, RootField};
pub use fetcher::{error_envelope, RemoteFetcher, RemoteRequest};
pub use selection::{
    print_operation, FieldSelection, InlineFragment, RewriteContext, Selection, TYPENAME_FIELD,
};

/// Alias of the forwarded root field in the remote operation.
const RESULT_ALIAS: &str = "result";

/// What every root resolver of one stitched module shares.
#[derive(Debug)]
struct Stitched {
    module_id: String,
    types: IndexMap<String, TypeConfig>,
    remote_names: IndexMap<String, String>,
    /// Remote type name → local type name.
    local_names: HashMap<String, String>,
    key_fields: IndexMap<String, Vec<String>>,
    fetcher: RemoteFetcher,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Query,
    Mutation,
}

impl Operation {
    fn as_str(self) -> &'static str {
        match self {
            Operation::Query => "query",
            Operation::Mutation => "mutation",
        }
    }
}

/// Forwards one root field to the remote API.
struct RemoteRootResolver {
    stitched: Arc<Stitched>,
    operation: Operation,
    remote_name: String,
    shape: TypeShape,
}

impl Resolve for RemoteRootResolver {
    fn resolve<'a>(&self, ctx: ResolverContext<'a>) -> FieldFuture<'a> {
        let stitched = self.stitched.clone();
        let operation = self.operation;
        let remote_name = self.remote_name.clone();
        let shape = self.shape.clone();

        FieldFuture::new(async move {
            let requested = FieldSelection::from_selection_field(ctx.ctx.field())?;
            let rewrite = RewriteContext {
                types: &stitched.types,
                remote_names: &stitched.remote_names,
                key_fields: &stitched.key_fields,
                connections: ctx.ctx.data_opt::<ConnectionRegistry>(),
            };
            let root = FieldSelection {
                alias: Some(RESULT_ALIAS.to_string()),
                name: remote_name,
                arguments: requested.arguments,
                selection_set: rewrite.rewrite(&shape.type_name, &requested.selection_set),
            };
            let request = RemoteRequest::new(print_operation(operation.as_str(), &root));

            let info = ctx.ctx.data_opt::<RequestInfo>().cloned().unwrap_or_default();
            let settings = ctx
                .ctx
                .data_opt::<ProjectSettings>()
                .and_then(|settings| settings.settings_for(&stitched.module_id))
                .cloned();
            ctx.ctx
                .insert_http_header("surrogate-control", stitched.fetcher.cache_control());

            let response = stitched.fetcher.fetch(&request, &info, settings.as_ref()).await;
            let (result, errors) = extract_result(response).map_err(UserError::into_graphql_error)?;
            if !errors.is_empty() {
                tracing::debug!(
                    module = %stitched.module_id,
                    errors = errors.len(),
                    "remote returned a partial result"
                );
            }
            for error in errors {
                report_partial_error(&ctx, error);
            }
            let result = localize_typenames(result, &stitched.local_names);
            let kind = OutputKind::of(&shape.type_name, &stitched.types);
            Ok(to_field_value(result, &shape.list, &kind))
        })
    }
}

/// An error the remote API reported next to a result.
#[derive(Debug, Clone, PartialEq)]
struct RemoteError {
    message: String,
    /// Location below the forwarded root field.
    path: Vec<PathSegment>,
}

impl RemoteError {
    fn from_json(error: &Value) -> Self {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown remote error")
            .to_string();
        let mut segments = error
            .get("path")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        if segments.first().and_then(Value::as_str) == Some(RESULT_ALIAS) {
            segments = &segments[1..];
        }
        let path = segments
            .iter()
            .filter_map(|segment| match segment {
                Value::String(name) => Some(PathSegment::Field(name.clone())),
                Value::Number(index) => index.as_u64().map(|index| PathSegment::Index(index as usize)),
                _ => None,
            })
            .collect();
        Self { message, path }
    }
}

/// Record a remote error below the current field without failing it.
fn report_partial_error(ctx: &ResolverContext<'_>, error: RemoteError) {
    let mut server_error = ctx
        .ctx
        .set_error_path(ServerError::new(error.message.clone(), Some(ctx.ctx.item.pos)));
    server_error.path.extend(error.path);
    server_error.source = Some(Arc::new(UserError::remote_api(error.message)));
    ctx.ctx.add_error(server_error);
}

/// The aliased root result of a remote response and the errors reported
/// with it.
///
/// Remote errors fail the field when no result came back. Otherwise they
/// are returned for the caller to report at their paths.
fn extract_result(mut response: Value) -> Result<(Value, Vec<RemoteError>), UserError> {
    let result = response
        .get_mut("data")
        .and_then(|data| data.get_mut(RESULT_ALIAS))
        .map(Value::take)
        .unwrap_or(Value::Null);

    let errors: Vec<RemoteError> = response
        .get("errors")
        .and_then(Value::as_array)
        .map(|errors| errors.iter().map(RemoteError::from_json).collect())
        .unwrap_or_default();

    if result.is_null() && !errors.is_empty() {
        let messages: Vec<&str> = errors.iter().map(|error| error.message.as_str()).collect();
        return Err(UserError::remote_api(messages.join("; ")));
    }
    Ok((result, errors))
}

/// Replace remote `__typename` values by the local type names.
pub fn localize_typenames(value: Value, local_names: &HashMap<String, String>) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| localize_typenames(item, local_names))
                .collect(),
        ),
        Value::Object(object) => Value::Object(
            object
                .into_iter()
                .map(|(key, value)| {
                    let value = match (key.as_str(), value) {
                        (TYPENAME_FIELD, Value::String(name)) => {
                            Value::String(local_names.get(&name).cloned().unwrap_or(name))
                        }
                        (_, value) => localize_typenames(value, local_names),
                    };
                    (key, value)
                })
                .collect(),
        ),
        other => other,
    }
}

/// Key fields that connections of other modules join on, by source type.
fn key_fields(
    module_id: &str,
    types: &IndexMap<String, TypeConfig>,
    modules: &[ModuleConfig],
) -> IndexMap<String, Vec<String>> {
    let mut keys: IndexMap<String, Vec<String>> = IndexMap::new();
    let connections = modules
        .iter()
        .filter(|other| other.id != module_id)
        .flat_map(|other| &other.connections);
    for connection in connections {
        if !types.contains_key(&connection.source.type_name) {
            continue;
        }
        let fields = keys.entry(connection.source.type_name.clone()).or_default();
        let key = connection.source.key_field().to_string();
        if !fields.contains(&key) {
            fields.push(key);
        }
    }
    keys
}

/// Replace the remote declaration of `module` by converted types, `Query`
/// extensions and mutations that forward to the remote API.
///
/// `rawSchema` is kept so the result is still recognized as remote; the
/// `remoteModule` marker is removed, which makes rebuilding a no-op.
///
/// # Errors
///
/// Returns an error if the module lacks its remote configuration or SDL, or
/// the SDL is invalid.
pub fn build_remote_module(
    mut module: ModuleConfig,
    modules: &[ModuleConfig],
    config: &ProjectConfig,
) -> Result<ModuleConfig, RemoteModuleError> {
    let remote = module
        .remote_module
        .take()
        .ok_or_else(|| RemoteModuleError::MissingRemoteConfig {
            module: module.id.clone(),
        })?;
    let raw_schema = module
        .raw_schema
        .as_deref()
        .ok_or_else(|| RemoteModuleError::MissingRawSchema {
            module: module.id.clone(),
        })?;
    let schema = convert_schema(raw_schema, module.namespace.as_deref(), &module.id)?;

    let types: IndexMap<String, TypeConfig> = schema
        .types
        .iter()
        .map(|ty| (ty.name().to_string(), ty.clone()))
        .collect();
    let local_names = schema
        .remote_names
        .iter()
        .map(|(local, remote)| (remote.clone(), local.clone()))
        .collect();
    let stitched = Arc::new(Stitched {
        module_id: module.id.clone(),
        key_fields: key_fields(&module.id, &types, modules),
        fetcher: RemoteFetcher::new(module.id.clone(), remote, config)?,
        remote_names: schema.remote_names,
        local_names,
        types,
    });

    let root_resolver = |operation, root: &RootField| {
        FieldResolver::new(RemoteRootResolver {
            stitched: stitched.clone(),
            operation,
            remote_name: root.remote_name.clone(),
            shape: TypeShape::from(&root.field),
        })
    };

    for (name, root) in &schema.query_fields {
        let field = root
            .field
            .clone()
            .resolve(root_resolver(Operation::Query, root));
        module
            .type_extensions
            .entry(QUERY_TYPE.to_string())
            .or_default()
            .insert(name.clone(), field);
    }

    for (name, root) in &schema.mutation_fields {
        let input_fields = root
            .field
            .arguments
            .iter()
            .map(|(arg_name, argument)| {
                let field = FieldConfig {
                    type_name: argument.type_name.clone(),
                    required: argument.required,
                    list: argument.list.clone(),
                    default_value: argument.default_value.clone(),
                    description: argument.description.clone(),
                    ..Default::default()
                };
                (arg_name.clone(), field)
            })
            .collect();
        let output = FieldConfig {
            arguments: IndexMap::new(),
            ..root.field.clone()
        };
        module.mutations.push(MutationConfig {
            name: name.clone(),
            description: root.field.description.clone(),
            input_fields,
            output: Some(output),
            resolve: Some(root_resolver(Operation::Mutation, root)),
            ..Default::default()
        });
    }

    module.types.extend(schema.types);
    tracing::debug!(
        module = %module.id,
        types = stitched.types.len(),
        queries = schema.query_fields.len(),
        mutations = schema.mutation_fields.len(),
        "built remote module"
    );
    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConnectionConfig, RemoteModuleConfig};
    use serde_json::json;

    const SDL: &str = r#"
        type Repository { id: ID! name: String! }
        type Query { repository(name: String!): Repository }
        type Mutation { starRepository(id: ID!, note: String = "hi"): Repository }
    "#;

    fn github() -> ModuleConfig {
        ModuleConfig::new("github")
            .with_namespace("Github")
            .with_remote(RemoteModuleConfig::new("http://localhost/graphql"), SDL)
    }

    #[test]
    fn builds_types_queries_and_mutations() {
        let module = build_remote_module(github(), &[], &ProjectConfig::default()).unwrap();
        assert!(module.remote_module.is_none());
        assert!(module.is_remote());
        assert!(module.find_type("Github_Repository").is_some());

        let query = &module.type_extensions[QUERY_TYPE]["Github_repository"];
        assert_eq!(query.type_name, "Github_Repository");
        assert!(query.arguments["name"].required);
        assert!(query.resolve.is_some());

        let mutation = &module.mutations[0];
        assert_eq!(mutation.name, "Github_starRepository");
        assert!(mutation.input_fields["id"].required);
        assert_eq!(mutation.input_fields["note"].default_value, Some(json!("hi")));
        let output = mutation.output.as_ref().unwrap();
        assert!(output.arguments.is_empty());
        assert!(mutation.resolve.is_some());
    }

    #[test]
    fn missing_configuration() {
        let err = build_remote_module(ModuleConfig::new("github"), &[], &ProjectConfig::default())
            .unwrap_err();
        assert!(matches!(err, RemoteModuleError::MissingRemoteConfig { .. }));

        let mut module = github();
        module.raw_schema = None;
        let err = build_remote_module(module, &[], &ProjectConfig::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "module 'github' declares a remote module but no rawSchema"
        );
    }

    #[test]
    fn key_fields_come_from_other_modules() {
        let tracker = ModuleConfig::new("tracker")
            .with_connection(ConnectionConfig::inline(
                "issues",
                "Github_Repository",
                "Tracker_Issue",
                "repository",
            ))
            .with_connection(ConnectionConfig::inline(
                "labels",
                "Tracker_Issue",
                "Tracker_Label",
                "issue",
            ));
        let schema = convert_schema(SDL, Some("Github"), "github").unwrap();
        let types = schema
            .types
            .into_iter()
            .map(|ty| (ty.name().to_string(), ty))
            .collect();
        let keys = key_fields("github", &types, &[github(), tracker]);
        assert_eq!(keys.len(), 1);
        assert_eq!(keys["Github_Repository"], vec!["id".to_string()]);
    }

    #[test]
    fn results_and_errors() {
        let ok = json!({"data": {"result": {"name": "rust"}}});
        assert_eq!(extract_result(ok).unwrap(), (json!({"name": "rust"}), Vec::new()));

        let partial = json!({
            "data": {"result": {"name": "rust", "owner": null}},
            "errors": [{"message": "owner lookup failed", "path": ["result", "owner", 0]}]
        });
        let (result, errors) = extract_result(partial).unwrap();
        assert_eq!(result, json!({"name": "rust", "owner": null}));
        assert_eq!(
            errors,
            vec![RemoteError {
                message: "owner lookup failed".into(),
                path: vec![PathSegment::Field("owner".into()), PathSegment::Index(0)],
            }]
        );

        let failed = json!({"data": null, "errors": [{"message": "a"}, {"message": "b"}]});
        let err = extract_result(failed).unwrap_err();
        assert_eq!(err.to_string(), "a; b");
        assert_eq!(err.code(), crate::error::ErrorCode::RemoteApiError);

        assert_eq!(
            extract_result(json!({"data": {"result": null}})).unwrap(),
            (Value::Null, Vec::new())
        );
    }

    #[test]
    fn typenames_are_localized() {
        let names = HashMap::from([("User".to_string(), "Github_User".to_string())]);
        let value = json!({"owner": {"__typename": "User", "login": "x"}, "list": [{"__typename": "Other"}]});
        assert_eq!(
            localize_typenames(value, &names),
            json!({"owner": {"__typename": "Github_User", "login": "x"}, "list": [{"__typename": "Other"}]})
        );
    }
}
