//! Naming conventions for types and fields of user-authored modules.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PackageError;
use crate::types::{FieldConfig, FieldConfigMap, ModuleConfig, TypeConfig, NODE_INTERFACE};
use crate::validation::{FieldRef, ValidationContext, ValidationRule};

static NAMESPACED_TYPE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][a-zA-Z0-9]*_[A-Z][a-zA-Z0-9]*$").unwrap());
static TYPE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][a-zA-Z0-9]*$").unwrap());
pub(crate) static FIELD_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-zA-Z0-9]*$").unwrap());

const MIN_TYPE_NAME_LENGTH: usize = 4;
const MAX_TYPE_NAME_LENGTH: usize = 40;

/// Field names that generated connection and filter types rely on.
pub const RESERVED_FIELD_NAMES: &[&str] = &[
    "cursor",
    "node",
    "nodes",
    "edges",
    "pageInfo",
    "totalCount",
    "filter",
    "order",
    "first",
    "last",
    "before",
    "after",
    "skip",
    "search",
];

/// `blog` for namespace `Blog`.
pub(crate) fn field_prefix(namespace: &str) -> String {
    let mut chars = namespace.chars();
    match chars.next() {
        Some(first) => format!("{}{}_", first.to_lowercase(), chars.as_str()),
        None => String::new(),
    }
}

/// Pattern for fields a module adds to types it does not own.
pub(crate) fn foreign_field_pattern(namespace: &str) -> Option<Regex> {
    Regex::new(&format!(
        "^{}[a-z][a-zA-Z0-9]*$",
        regex::escape(&field_prefix(namespace))
    ))
    .ok()
}

fn checks_names(module: Option<&ModuleConfig>) -> bool {
    module.is_some_and(|m| !m.is_native())
}

/// Type names of DYNAMIC modules must be `Namespace_Name`.
#[derive(Default)]
pub struct TypeNames;

impl ValidationRule for TypeNames {
    fn enter_type(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        ty: &TypeConfig,
        _previous: Option<&TypeConfig>,
    ) {
        let module = match ctx.module() {
            Some(module) if !module.is_native() => module,
            _ => return,
        };
        let name = ty.name();
        let path = ["types", name];

        if let Some(namespace) = &module.namespace {
            let prefix = format!("{}_", namespace);
            if !name.starts_with(&prefix) {
                ctx.report_error(
                    PackageError::new(format!(
                        "Invalid type name \"{}\": types of module \"{}\" must start with \"{}\"",
                        name, module.id, prefix
                    ))
                    .with_path(path),
                );
                return;
            }
        }

        // Remote type names are taken over from the remote API as-is.
        if module.is_remote() {
            return;
        }

        if !(MIN_TYPE_NAME_LENGTH..=MAX_TYPE_NAME_LENGTH).contains(&name.len()) {
            ctx.report_error(
                PackageError::new(format!(
                    "Invalid type name \"{}\": must be between {} and {} characters long",
                    name, MIN_TYPE_NAME_LENGTH, MAX_TYPE_NAME_LENGTH
                ))
                .with_path(path),
            );
            return;
        }

        let (pattern, expected) = if module.namespace.is_some() {
            (&*NAMESPACED_TYPE_NAME, "Namespace_TypeName")
        } else {
            (&*TYPE_NAME, "TypeName")
        };
        if !pattern.is_match(name) {
            ctx.report_error(
                PackageError::new(format!(
                    "Invalid type name \"{}\": must match the pattern {} (e.g. {})",
                    name,
                    pattern.as_str(),
                    expected
                ))
                .with_path(path),
            );
        }
    }
}

/// Field names are camelCase. Fields added to foreign types carry the
/// module's namespace prefix.
#[derive(Default)]
pub struct FieldNames;

impl ValidationRule for FieldNames {
    fn enter_field(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        parent: &TypeConfig,
        field: FieldRef<'_>,
        _previous: Option<&FieldConfig>,
    ) {
        let module = ctx.module();
        if !checks_names(module) || module.is_some_and(ModuleConfig::is_remote) {
            return;
        }
        if !FIELD_NAME.is_match(field.name) {
            ctx.report_error(
                PackageError::new(format!(
                    "Invalid field name \"{}\" on type \"{}\": must match the pattern {}",
                    field.name,
                    parent.name(),
                    FIELD_NAME.as_str()
                ))
                .with_path(["types", parent.name(), field.name]),
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
        let module = match ctx.module() {
            Some(module) if !module.is_native() && !module.is_remote() => module,
            _ => return,
        };

        let owned = module.find_type(type_name).is_some();
        let foreign_pattern = match (&module.namespace, owned) {
            (Some(namespace), false) => foreign_field_pattern(namespace),
            _ => None,
        };
        let pattern = foreign_pattern.as_ref().unwrap_or(&*FIELD_NAME);

        for name in fields.keys() {
            if !pattern.is_match(name) {
                ctx.report_error(
                    PackageError::new(format!(
                        "Invalid field name \"{}\" in extension of type \"{}\": must match the pattern {}",
                        name,
                        type_name,
                        pattern.as_str()
                    ))
                    .with_path(["typeExtensions", type_name, name.as_str()]),
                );
            }
        }
    }
}

/// Node types of DYNAMIC modules may not declare fields whose names are
/// used by generated connection and filter types.
#[derive(Default)]
pub struct ReservedFieldNames;

impl ValidationRule for ReservedFieldNames {
    fn enter_field(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        parent: &TypeConfig,
        field: FieldRef<'_>,
        _previous: Option<&FieldConfig>,
    ) {
        if !checks_names(ctx.module()) {
            return;
        }
        let is_node = parent
            .as_object()
            .is_some_and(|object| object.implements_interface(NODE_INTERFACE));
        if is_node && RESERVED_FIELD_NAMES.contains(&field.name) {
            ctx.report_error(
                PackageError::new(format!(
                    "Field name \"{}\" on type \"{}\" is reserved",
                    field.name,
                    parent.name()
                ))
                .with_path(["types", parent.name(), field.name]),
            );
        }
    }
}
