//! Conversion of a remote SDL document into namespaced type configs.

use async_graphql_parser::types::{
    ConstDirective, FieldDefinition, InputValueDefinition, TypeDefinition, TypeKind as SdlKind,
    TypeSystemDefinition,
};
use async_graphql_parser::{parse_schema, Positioned};
use async_graphql_value::ConstValue;
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::RemoteModuleError;
use crate::hooks::TypeResolver;
use crate::shape::TypeShape;
use crate::types::{
    is_host_scalar, ArgumentConfig, EnumTypeConfig, EnumValueConfig, FieldConfig,
    InputObjectTypeConfig, InterfaceTypeConfig, ObjectTypeConfig, ScalarSerializer,
    ScalarTypeConfig, TypeConfig, UnionTypeConfig, MUTATION_TYPE, QUERY_TYPE, SUBSCRIPTION_TYPE,
};

const DEFAULT_DEPRECATION_REASON: &str = "No longer supported";

/// A root field of the remote API, exposed under a local name.
#[derive(Debug, Clone)]
pub struct RootField {
    pub remote_name: String,
    pub field: FieldConfig,
}

/// A remote schema translated into local names.
#[derive(Debug, Clone, Default)]
pub struct RemoteSchema {
    pub types: Vec<TypeConfig>,
    pub query_fields: IndexMap<String, RootField>,
    pub mutation_fields: IndexMap<String, RootField>,
    /// Local type name → remote type name.
    pub remote_names: IndexMap<String, String>,
}

struct Names<'a> {
    namespace: Option<&'a str>,
    roots: [String; 3],
}

impl Names<'_> {
    fn prefixed(&self, name: &str) -> String {
        match self.namespace {
            Some(namespace) => format!("{}_{}", namespace, name),
            None => name.to_string(),
        }
    }

    fn is_root(&self, name: &str) -> bool {
        self.roots.iter().any(|root| root == name)
    }

    /// Local name of a referenced type. Host scalars and roots keep theirs.
    fn local_type(&self, name: &str) -> String {
        if is_host_scalar(name) || self.is_root(name) {
            name.to_string()
        } else {
            self.prefixed(name)
        }
    }
}

fn description(description: &Option<Positioned<String>>) -> Option<String> {
    description.as_ref().map(|d| d.node.clone())
}

fn deprecation_reason(directives: &[Positioned<ConstDirective>]) -> Option<String> {
    let directive = directives
        .iter()
        .find(|directive| directive.node.name.node.as_str() == "deprecated")?;
    let reason = directive
        .node
        .get_argument("reason")
        .and_then(|value| match &value.node {
            ConstValue::String(reason) => Some(reason.clone()),
            _ => None,
        });
    Some(reason.unwrap_or_else(|| DEFAULT_DEPRECATION_REASON.to_string()))
}

fn local_shape(ty: &async_graphql_parser::types::Type, names: &Names<'_>) -> TypeShape {
    let mut shape = TypeShape::unwrap(ty);
    shape.type_name = names.local_type(&shape.type_name);
    shape
}

fn convert_argument(input: &InputValueDefinition, names: &Names<'_>) -> ArgumentConfig {
    let shape = local_shape(&input.ty.node, names);
    ArgumentConfig {
        type_name: shape.type_name.clone(),
        required: shape.required,
        list: shape.list_config(),
        default_value: input
            .default_value
            .as_ref()
            .and_then(|value| value.node.clone().into_json().ok()),
        description: description(&input.description),
    }
}

fn convert_input_field(input: &InputValueDefinition, names: &Names<'_>) -> FieldConfig {
    let argument = convert_argument(input, names);
    FieldConfig {
        type_name: argument.type_name,
        required: argument.required,
        list: argument.list,
        default_value: argument.default_value,
        description: argument.description,
        deprecation_reason: deprecation_reason(&input.directives),
        ..Default::default()
    }
}

fn convert_field(field: &FieldDefinition, names: &Names<'_>) -> FieldConfig {
    let shape = local_shape(&field.ty.node, names);
    FieldConfig {
        type_name: shape.type_name.clone(),
        required: shape.required,
        list: shape.list_config(),
        arguments: field
            .arguments
            .iter()
            .map(|arg| (arg.node.name.node.to_string(), convert_argument(&arg.node, names)))
            .collect(),
        description: description(&field.description),
        deprecation_reason: deprecation_reason(&field.directives),
        ..Default::default()
    }
}

fn convert_fields(
    fields: &[Positioned<FieldDefinition>],
    names: &Names<'_>,
) -> IndexMap<String, FieldConfig> {
    fields
        .iter()
        .map(|field| (field.node.name.node.to_string(), convert_field(&field.node, names)))
        .collect()
}

/// `__typename` of the value, which the stitched resolvers localize.
fn typename_resolver() -> TypeResolver {
    TypeResolver::new(|value: &Value| {
        value
            .get("__typename")
            .and_then(Value::as_str)
            .map(str::to_string)
    })
}

fn convert_type(definition: &TypeDefinition, names: &Names<'_>) -> TypeConfig {
    let name = names.prefixed(definition.name.node.as_str());
    let description = description(&definition.description);
    let local_names = |list: &[Positioned<async_graphql_value::Name>]| -> Vec<String> {
        list.iter().map(|name| names.local_type(name.node.as_str())).collect()
    };

    match &definition.kind {
        SdlKind::Object(object) => ObjectTypeConfig {
            name,
            description,
            fields: convert_fields(&object.fields, names),
            interfaces: local_names(&object.implements),
            ..Default::default()
        }
        .into(),
        SdlKind::Interface(interface) => InterfaceTypeConfig {
            name,
            description,
            fields: convert_fields(&interface.fields, names),
            interfaces: local_names(&interface.implements),
            resolve_type: Some(typename_resolver()),
        }
        .into(),
        SdlKind::Union(union) => UnionTypeConfig {
            name,
            description,
            type_names: local_names(&union.members),
            resolve_type: Some(typename_resolver()),
        }
        .into(),
        SdlKind::Enum(enum_type) => EnumTypeConfig {
            name,
            description,
            values: enum_type
                .values
                .iter()
                .map(|value| {
                    let value_name = value.node.value.node.to_string();
                    let config = EnumValueConfig {
                        value: Some(Value::String(value_name.clone())),
                        description: value.node.description.as_ref().map(|d| d.node.clone()),
                        deprecation_reason: deprecation_reason(&value.node.directives),
                    };
                    (value_name, config)
                })
                .collect(),
        }
        .into(),
        SdlKind::InputObject(input) => InputObjectTypeConfig {
            name,
            description,
            fields: input
                .fields
                .iter()
                .map(|field| (field.node.name.node.to_string(), convert_input_field(&field.node, names)))
                .collect(),
        }
        .into(),
        SdlKind::Scalar => ScalarTypeConfig {
            name,
            description,
            serializer: ScalarSerializer::Json,
        }
        .into(),
    }
}

/// Merge an `extend type` definition into an already converted type.
fn merge_extension(target: &mut TypeConfig, extension: TypeConfig) {
    match (target, extension) {
        (TypeConfig::Object(target), TypeConfig::Object(extension)) => {
            target.fields.extend(extension.fields);
            target.interfaces.extend(extension.interfaces);
        }
        (TypeConfig::Interface(target), TypeConfig::Interface(extension)) => {
            target.fields.extend(extension.fields);
        }
        (TypeConfig::Union(target), TypeConfig::Union(extension)) => {
            target.type_names.extend(extension.type_names);
        }
        (TypeConfig::Enum(target), TypeConfig::Enum(extension)) => {
            target.values.extend(extension.values);
        }
        (TypeConfig::InputObject(target), TypeConfig::InputObject(extension)) => {
            target.fields.extend(extension.fields);
        }
        _ => {}
    }
}

/// Parse `sdl` and translate it into local names.
///
/// With a namespace every type except host scalars and the root operation
/// types is renamed to `<namespace>_<Name>`, and every root field to
/// `<namespace>_<field>`.
///
/// # Errors
///
/// `RemoteModuleError::InvalidSdl` if the document does not parse.
pub fn convert_schema(
    sdl: &str,
    namespace: Option<&str>,
    module_id: &str,
) -> Result<RemoteSchema, RemoteModuleError> {
    let document = parse_schema(sdl).map_err(|err| RemoteModuleError::InvalidSdl {
        module: module_id.to_string(),
        message: err.to_string(),
    })?;

    let mut roots = [
        QUERY_TYPE.to_string(),
        MUTATION_TYPE.to_string(),
        SUBSCRIPTION_TYPE.to_string(),
    ];
    for definition in &document.definitions {
        if let TypeSystemDefinition::Schema(schema) = definition {
            let schema = &schema.node;
            for (slot, name) in [&schema.query, &schema.mutation, &schema.subscription]
                .into_iter()
                .enumerate()
            {
                if let Some(name) = name {
                    roots[slot] = name.node.to_string();
                }
            }
        }
    }
    let names = Names { namespace, roots };

    let mut types: IndexMap<String, TypeConfig> = IndexMap::new();
    let mut root_fields: [IndexMap<String, RootField>; 2] = Default::default();

    for definition in &document.definitions {
        let TypeSystemDefinition::Type(definition) = definition else {
            continue;
        };
        let definition = &definition.node;
        let remote_name = definition.name.node.as_str();

        if let Some(slot) = names.roots[..2].iter().position(|root| root == remote_name) {
            if let SdlKind::Object(object) = &definition.kind {
                for field in &object.fields {
                    let remote_field = field.node.name.node.to_string();
                    root_fields[slot].insert(
                        names.prefixed(&remote_field),
                        RootField {
                            remote_name: remote_field,
                            field: convert_field(&field.node, &names),
                        },
                    );
                }
            }
            continue;
        }
        if names.is_root(remote_name) || is_host_scalar(remote_name) {
            continue;
        }

        let converted = convert_type(definition, &names);
        match types.get_mut(converted.name()) {
            Some(existing) if definition.extend => merge_extension(existing, converted),
            _ => {
                types.insert(converted.name().to_string(), converted);
            }
        }
    }

    let remote_names = types
        .keys()
        .map(|local| {
            let remote = match namespace {
                Some(namespace) => local
                    .strip_prefix(namespace)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .unwrap_or(local),
                None => local,
            };
            (local.clone(), remote.to_string())
        })
        .collect();

    let [query_fields, mutation_fields] = root_fields;
    Ok(RemoteSchema {
        types: types.into_values().collect(),
        query_fields,
        mutation_fields,
        remote_names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeKind;

    const SDL: &str = r#"
        schema { query: RootQuery }

        interface Node { id: ID! }

        "A repository"
        type Repository implements Node {
            id: ID!
            name: String!
            topics(first: Int = 10): [[String!]]!
            owner: Owner
            visibility: Visibility
            legacyUrl: String @deprecated
        }

        type User implements Node { id: ID! login: String! }
        type Organization implements Node { id: ID! login: String! }
        union Owner = User | Organization

        enum Visibility { PUBLIC PRIVATE @deprecated(reason: "Use PUBLIC") }

        input RepositoryFilter { name: String, visibility: Visibility = PUBLIC }

        scalar URI
        scalar DateTime

        type RootQuery {
            repository(owner: String!, name: String!): Repository
            search(filter: RepositoryFilter): [Repository!]
        }

        type Mutation { starRepository(id: ID!): Repository }
    "#;

    fn convert() -> RemoteSchema {
        convert_schema(SDL, Some("Github"), "github").unwrap()
    }

    #[test]
    fn types_are_namespaced() {
        let schema = convert();
        let names: Vec<_> = schema.types.iter().map(TypeConfig::name).collect();
        assert_eq!(
            names,
            [
                "Github_Node",
                "Github_Repository",
                "Github_User",
                "Github_Organization",
                "Github_Owner",
                "Github_Visibility",
                "Github_RepositoryFilter",
                "Github_URI",
            ]
        );
        assert_eq!(schema.remote_names["Github_Repository"], "Repository");
    }

    #[test]
    fn root_fields_are_namespaced() {
        let schema = convert();
        let repository = &schema.query_fields["Github_repository"];
        assert_eq!(repository.remote_name, "repository");
        assert_eq!(repository.field.type_name, "Github_Repository");
        assert!(repository.field.arguments["owner"].required);

        let search = &schema.query_fields["Github_search"];
        assert_eq!(search.field.list.dimensions(), vec![true]);
        assert_eq!(search.field.arguments["filter"].type_name, "Github_RepositoryFilter");

        assert!(schema.mutation_fields.contains_key("Github_starRepository"));
    }

    #[test]
    fn fields_keep_modifiers_and_metadata() {
        let schema = convert();
        let repository = schema.types.iter().find(|t| t.name() == "Github_Repository").unwrap();
        assert_eq!(repository.kind(), TypeKind::Object);
        assert_eq!(repository.description(), Some("A repository"));
        assert!(repository.implements("Github_Node"));

        let fields = repository.fields().unwrap();
        let topics = &fields["topics"];
        assert_eq!(topics.type_name, "String");
        assert!(topics.required);
        assert_eq!(topics.list.dimensions(), vec![false, true]);
        assert_eq!(topics.arguments["first"].default_value, Some(serde_json::json!(10)));
        assert_eq!(fields["id"].type_name, "ID");
        assert_eq!(fields["owner"].type_name, "Github_Owner");
        assert_eq!(
            fields["legacyUrl"].deprecation_reason.as_deref(),
            Some(DEFAULT_DEPRECATION_REASON)
        );
    }

    #[test]
    fn enums_unions_and_inputs() {
        let schema = convert();
        let find = |name: &str| schema.types.iter().find(|t| t.name() == name).unwrap();

        let TypeConfig::Enum(visibility) = find("Github_Visibility") else {
            panic!("expected enum");
        };
        assert_eq!(
            visibility.values["PRIVATE"].deprecation_reason.as_deref(),
            Some("Use PUBLIC")
        );

        let owner = find("Github_Owner").as_union().unwrap();
        assert_eq!(owner.type_names, ["Github_User", "Github_Organization"]);

        let filter = find("Github_RepositoryFilter").fields().unwrap();
        assert_eq!(filter["visibility"].default_value, Some(serde_json::json!("PUBLIC")));
    }

    #[test]
    fn without_namespace_names_are_kept() {
        let schema = convert_schema(SDL, None, "github").unwrap();
        assert!(schema.query_fields.contains_key("repository"));
        assert!(schema.types.iter().any(|t| t.name() == "Repository"));
    }

    #[test]
    fn invalid_sdl() {
        let err = convert_schema("type {", Some("Github"), "github").unwrap_err();
        assert!(matches!(err, RemoteModuleError::InvalidSdl { .. }));
    }
}
