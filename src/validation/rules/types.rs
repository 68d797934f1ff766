//! Rules on type declarations and the field types they reference.

use std::collections::HashMap;

use crate::error::PackageError;
use crate::types::{
    is_builtin_scalar, FieldConfig, FieldConfigMap, TypeConfig, TypeKind, CONTENT_INTERFACE,
    NODE_INTERFACE, TIMESTAMPED_INTERFACE,
};
use crate::validation::{FieldRef, ValidationContext, ValidationRule};

pub const MAX_FIELD_COUNT: usize = 100;

#[derive(Default)]
pub struct MaxFieldCount;

impl ValidationRule for MaxFieldCount {
    fn enter_type(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        ty: &TypeConfig,
        _previous: Option<&TypeConfig>,
    ) {
        let count = ty.fields().map_or(0, |fields| fields.len());
        if count > MAX_FIELD_COUNT {
            ctx.report_error(
                PackageError::new(format!(
                    "Type \"{}\" has {} fields, the maximum is {}",
                    ty.name(),
                    count,
                    MAX_FIELD_COUNT
                ))
                .with_path(["types", ty.name()]),
            );
        }
    }
}

/// A type name may be declared by one module only.
#[derive(Default)]
pub struct UniqueTypeNames {
    seen: HashMap<String, String>,
}

impl ValidationRule for UniqueTypeNames {
    fn enter_type(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        ty: &TypeConfig,
        _previous: Option<&TypeConfig>,
    ) {
        let module_id = ctx.module().map(|m| m.id.clone()).unwrap_or_default();
        if let Some(owner) = self.seen.get(ty.name()) {
            let message = format!(
                "Type \"{}\" is already declared in module \"{}\"",
                ty.name(),
                owner
            );
            ctx.report_error(PackageError::new(message).with_path(["types", ty.name()]));
            return;
        }
        if is_builtin_scalar(ty.name()) {
            ctx.report_error(
                PackageError::new(format!(
                    "Type \"{}\" conflicts with a built-in scalar",
                    ty.name()
                ))
                .with_path(["types", ty.name()]),
            );
        }
        self.seen.insert(ty.name().to_string(), module_id);
    }
}

/// Type extensions must target an existing object or interface type.
#[derive(Default)]
pub struct TypeExtensionTargets;

impl ValidationRule for TypeExtensionTargets {
    fn enter_type_extension(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        type_name: &str,
        _fields: &FieldConfigMap,
        _previous: Option<&FieldConfigMap>,
    ) {
        let message = match ctx.get_type(type_name) {
            None => format!("Cannot extend type \"{}\": type does not exist", type_name),
            Some(ty) if matches!(ty.kind(), TypeKind::Object | TypeKind::Interface) => return,
            Some(ty) => format!(
                "Cannot extend type \"{}\" of kind {}: only OBJECT and INTERFACE types can be extended",
                type_name,
                ty.kind()
            ),
        };
        ctx.report_error(PackageError::new(message).with_path(["typeExtensions", type_name]));
    }
}

/// `lastUpdatedAt` is empty until the first update and cannot be required.
#[derive(Default)]
pub struct TimeStampedLastUpdatedAt;

impl ValidationRule for TimeStampedLastUpdatedAt {
    fn enter_type(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        ty: &TypeConfig,
        _previous: Option<&TypeConfig>,
    ) {
        if !ty.implements(TIMESTAMPED_INTERFACE) {
            return;
        }
        let required = ty
            .fields()
            .and_then(|fields| fields.get("lastUpdatedAt"))
            .is_some_and(|field| field.required);
        if required {
            ctx.report_error(
                PackageError::new(format!(
                    "Field \"lastUpdatedAt\" of type \"{}\" cannot be required, it is empty until the first update",
                    ty.name()
                ))
                .with_path(["types", ty.name(), "lastUpdatedAt"]),
            );
        }
    }
}

/// Checks that field types exist and are supported by the persistence
/// layer. Reports at most one problem per field.
#[derive(Default)]
pub struct SupportedFieldTypes;

impl SupportedFieldTypes {
    fn applies(ctx: &ValidationContext<'_>) -> bool {
        ctx.module()
            .is_some_and(|module| !module.is_native() && !module.is_remote())
    }
}

impl ValidationRule for SupportedFieldTypes {
    fn enter_field(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        parent: &TypeConfig,
        field: FieldRef<'_>,
        _previous: Option<&FieldConfig>,
    ) {
        if !Self::applies(ctx) {
            return;
        }
        if let Some(message) = check_field_type(ctx, parent, field.name, field.config) {
            ctx.report_error(
                PackageError::new(message).with_path(["types", parent.name(), field.name]),
            );
        }
    }

    fn enter_type_extension(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        type_name: &str,
        fields: &FieldConfigMap,
        _previous: Option<&FieldConfigMap>,
    ) {
        if !Self::applies(ctx) {
            return;
        }
        let parent = match ctx.get_type(type_name) {
            Some(parent) => parent,
            None => return,
        };
        for (name, field) in fields {
            if let Some(message) = check_field_type(ctx, parent, name, field) {
                ctx.report_error(
                    PackageError::new(message).with_path(["typeExtensions", type_name, name.as_str()]),
                );
            }
        }
    }
}

/// Whether values of `type_name` are content: the `Content` interface, a type
/// implementing it, or a union whose members all implement it.
fn is_content_type(ctx: &ValidationContext<'_>, type_name: &str) -> bool {
    if type_name == CONTENT_INTERFACE {
        return true;
    }
    match ctx.get_type(type_name) {
        Some(TypeConfig::Union(union)) => union_is_content(ctx, &union.type_names),
        Some(ty) => ty.implements(CONTENT_INTERFACE),
        None => false,
    }
}

fn union_is_content(ctx: &ValidationContext<'_>, members: &[String]) -> bool {
    !members.is_empty()
        && members.iter().all(|member| {
            ctx.get_type(member)
                .is_some_and(|ty| ty.implements(CONTENT_INTERFACE))
        })
}

fn check_field_type(
    ctx: &ValidationContext<'_>,
    parent: &TypeConfig,
    name: &str,
    field: &FieldConfig,
) -> Option<String> {
    let type_name = field.type_name.as_str();
    let qualified = format!("{}.{}", parent.name(), name);
    let has_resolver = field.resolve.is_some();
    let is_input = parent.kind() == TypeKind::InputObject;

    if type_name != parent.name() && !ctx.type_exists(type_name) {
        return Some(format!(
            "Type \"{}\" of field \"{}\" does not exist",
            type_name, qualified
        ));
    }

    if type_name == "ID" && !is_input {
        let is_node_id = name == "id"
            && parent.kind() == TypeKind::Object
            && parent.implements(NODE_INTERFACE);
        if !is_node_id {
            return Some(format!(
                "Field \"{}\" cannot be of type ID: ID is reserved for the id field of Node types",
                qualified
            ));
        }
    }

    let target = if type_name == parent.name() {
        Some(parent)
    } else {
        ctx.get_type(type_name)
    };

    if let Some(target) = target {
        let kind = target.kind();
        if is_input {
            if !matches!(kind, TypeKind::Enum | TypeKind::Scalar | TypeKind::InputObject) {
                return Some(format!(
                    "Field \"{}\" of input type \"{}\" must reference a scalar, enum or input object type, found {} \"{}\"",
                    qualified,
                    parent.name(),
                    kind,
                    type_name
                ));
            }
        } else {
            match target {
                TypeConfig::InputObject(_) => {
                    return Some(format!(
                        "Input object type \"{}\" can only be used in fields of input object types, used in \"{}\"",
                        type_name, qualified
                    ));
                }
                TypeConfig::Interface(_) if !has_resolver && type_name != CONTENT_INTERFACE => {
                    return Some(format!(
                        "Interface type \"{}\" of field \"{}\" is not supported without a custom resolver",
                        type_name, qualified
                    ));
                }
                TypeConfig::Union(union) if !union_is_content(ctx, &union.type_names) => {
                    return Some(format!(
                        "All types of union \"{}\" used in field \"{}\" must implement the {} interface",
                        type_name, qualified, CONTENT_INTERFACE
                    ));
                }
                TypeConfig::Object(object)
                    if parent.implements(NODE_INTERFACE)
                        && !object.implements_interface(NODE_INTERFACE)
                        && !has_resolver =>
                {
                    return Some(format!(
                        "Type \"{}\" of field \"{}\" must implement the {} interface to be referenced from a Node type",
                        type_name, qualified, NODE_INTERFACE
                    ));
                }
                _ => {}
            }
        }
    }

    let dimensions = field.list.dimensions();
    if !dimensions.is_empty() {
        if !has_resolver && !is_content_type(ctx, type_name) {
            return Some(format!(
                "List field \"{}\" is only supported for {} types or with a custom resolver",
                qualified, CONTENT_INTERFACE
            ));
        }
        if dimensions != [true] {
            return Some(format!(
                "List field \"{}\" must be a one-dimensional list of non-null items",
                qualified
            ));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::hooks::FieldResolver;
    use crate::types::{
        InputObjectTypeConfig, InterfaceTypeConfig, ModuleConfig, ObjectTypeConfig,
        UnionTypeConfig,
    };
    use crate::validation::{rule, validate_modules};
    use async_graphql::dynamic::FieldFuture;
    use async_graphql::Value;

    fn core() -> ModuleConfig {
        ModuleConfig::new("core")
            .native()
            .with_type(InterfaceTypeConfig::new("Node").field("id", FieldConfig::new("ID").required()))
            .with_type(InterfaceTypeConfig::new("Content"))
    }

    fn supported(module: ModuleConfig) -> Vec<PackageError> {
        validate_modules(
            &[core(), module],
            &[],
            &[rule::<SupportedFieldTypes>],
            &ProjectConfig::default(),
        )
    }

    fn resolver() -> FieldResolver {
        FieldResolver::from_fn(|_| FieldFuture::new(async { Ok(Some(Value::Null)) }))
    }

    #[test]
    fn max_field_count() {
        let mut ty = ObjectTypeConfig::new("Huge");
        for i in 0..=MAX_FIELD_COUNT {
            ty = ty.field(format!("field{}", i), FieldConfig::new("String"));
        }
        let errors = validate_modules(
            &[ModuleConfig::new("blog").with_type(ty)],
            &[],
            &[rule::<MaxFieldCount>],
            &ProjectConfig::default(),
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("101 fields"));
    }

    #[test]
    fn unknown_types_are_reported() {
        let errors = supported(ModuleConfig::new("blog").with_type(
            ObjectTypeConfig::new("Post")
                .field("author", FieldConfig::new("Missing"))
                .field("parent", FieldConfig::new("Post")),
        ));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, ["types", "Post", "author"]);
    }

    #[test]
    fn id_only_on_node_id_field() {
        let errors = supported(ModuleConfig::new("blog").with_type(
            ObjectTypeConfig::new("Post")
                .implements("Node")
                .field("id", FieldConfig::new("ID").required())
                .field("authorId", FieldConfig::new("ID")),
        ));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, ["types", "Post", "authorId"]);
    }

    #[test]
    fn node_types_reference_node_types() {
        let errors = supported(
            ModuleConfig::new("blog")
                .with_type(ObjectTypeConfig::new("Meta").field("views", FieldConfig::new("Int")))
                .with_type(
                    ObjectTypeConfig::new("Post")
                        .implements("Node")
                        .field("meta", FieldConfig::new("Meta"))
                        .field("computed", FieldConfig::new("Meta").resolve(resolver())),
                ),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, ["types", "Post", "meta"]);
    }

    #[test]
    fn input_objects_stay_in_inputs() {
        let errors = supported(
            ModuleConfig::new("blog")
                .with_type(InputObjectTypeConfig {
                    name: "PostInput".into(),
                    fields: [
                        ("title".to_string(), FieldConfig::new("String")),
                        ("post".to_string(), FieldConfig::new("Post")),
                        ("postId".to_string(), FieldConfig::new("ID")),
                    ]
                    .into_iter()
                    .collect(),
                    ..Default::default()
                })
                .with_type(ObjectTypeConfig::new("Post").field("input", FieldConfig::new("PostInput"))),
        );
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].path, ["types", "PostInput", "post"]);
        assert_eq!(errors[1].path, ["types", "Post", "input"]);
    }

    #[test]
    fn unions_need_content_members() {
        let errors = supported(
            ModuleConfig::new("blog")
                .with_type(ObjectTypeConfig::new("Article").implements("Node").implements("Content"))
                .with_type(ObjectTypeConfig::new("Note").implements("Node"))
                .with_type(UnionTypeConfig::new("Mixed", ["Article", "Note"]))
                .with_type(UnionTypeConfig::new("Items", ["Article"]))
                .with_type(
                    ObjectTypeConfig::new("Page")
                        .implements("Node")
                        .field("mixed", FieldConfig::new("Mixed"))
                        .field("items", FieldConfig::new("Items").list(true)),
                ),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, ["types", "Page", "mixed"]);
    }

    #[test]
    fn lists_need_content_or_resolver() {
        let errors = supported(
            ModuleConfig::new("blog")
                .with_type(ObjectTypeConfig::new("Article").implements("Node").implements("Content"))
                .with_type(
                    ObjectTypeConfig::new("Page")
                        .field("tags", FieldConfig::new("String").list(true))
                        .field("articles", FieldConfig::new("Article").list(true))
                        .field("nested", FieldConfig::new("Article").list(vec![true, true]))
                        .field("nullable", FieldConfig::new("String").list(vec![false]).resolve(resolver())),
                ),
        );
        let paths: Vec<_> = errors.iter().map(|e| e.path.join(".")).collect();
        assert_eq!(paths, ["types.Page.tags", "types.Page.nested", "types.Page.nullable"]);
    }

    #[test]
    fn interfaces_need_resolvers() {
        let errors = supported(
            ModuleConfig::new("blog").with_type(
                ObjectTypeConfig::new("Page")
                    .field("node", FieldConfig::new("Node"))
                    .field("resolved", FieldConfig::new("Node").resolve(resolver())),
            ),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, ["types", "Page", "node"]);
    }

    #[test]
    fn timestamped_last_updated_at() {
        let module = ModuleConfig::new("blog").with_type(
            ObjectTypeConfig::new("Post")
                .implements("TimeStampedInterface")
                .field("lastUpdatedAt", FieldConfig::new("DateTime").required()),
        );
        let errors = validate_modules(
            &[module],
            &[],
            &[rule::<TimeStampedLastUpdatedAt>],
            &ProjectConfig::default(),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, ["types", "Post", "lastUpdatedAt"]);
    }

    #[test]
    fn duplicate_type_names() {
        let errors = validate_modules(
            &[
                ModuleConfig::new("a").with_type(ObjectTypeConfig::new("Shared")),
                ModuleConfig::new("b").with_type(ObjectTypeConfig::new("Shared")),
                ModuleConfig::new("c").with_type(ObjectTypeConfig::new("Shared")),
            ],
            &[],
            &[rule::<UniqueTypeNames>],
            &ProjectConfig::default(),
        );
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].module.as_deref(), Some("b"));
        assert!(errors[1].message.contains("module \"a\""));
    }

    #[test]
    fn extension_targets() {
        let module = ModuleConfig::new("blog")
            .with_type(UnionTypeConfig::new("Mixed", ["Post"]))
            .with_type(ObjectTypeConfig::new("Post"))
            .with_type_extension("Post", "extra", FieldConfig::new("String"))
            .with_type_extension("Mixed", "extra", FieldConfig::new("String"))
            .with_type_extension("Missing", "extra", FieldConfig::new("String"));
        let errors = validate_modules(
            &[module],
            &[],
            &[rule::<TypeExtensionTargets>],
            &ProjectConfig::default(),
        );
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].path, ["typeExtensions", "Mixed"]);
        assert_eq!(errors[1].path, ["typeExtensions", "Missing"]);
    }
}
