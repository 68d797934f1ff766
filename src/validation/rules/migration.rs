//! Rules that forbid breaking changes against the deployed module set.

use crate::error::PackageError;
use crate::types::{FieldConfig, FieldConfigMap, TypeConfig};
use crate::validation::{FieldRef, ValidationContext, ValidationRule};

#[derive(Default)]
pub struct TypeKindUnchanged;

impl ValidationRule for TypeKindUnchanged {
    fn enter_type(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        ty: &TypeConfig,
        previous: Option<&TypeConfig>,
    ) {
        let Some(previous) = previous else {
            return;
        };
        if previous.kind() != ty.kind() {
            ctx.report_error(
                PackageError::new(format!(
                    "Cannot change the kind of type \"{}\" from {} to {}",
                    ty.name(),
                    previous.kind(),
                    ty.kind()
                ))
                .with_path(["types", ty.name()])
                .with_description(
                    "The kind of a type cannot be changed. Delete the type and create a new one with a different name.",
                ),
            );
        }
    }
}

/// Describes a breaking change between two versions of a field.
fn field_type_change(field: &FieldConfig, previous: &FieldConfig) -> Option<String> {
    if field.type_name != previous.type_name {
        return Some(format!(
            "type from \"{}\" to \"{}\"",
            previous.type_name, field.type_name
        ));
    }
    let (before, after) = (previous.list.dimensions(), field.list.dimensions());
    if before.len() != after.len() {
        return Some(format!(
            "list dimensions from {} to {}",
            before.len(),
            after.len()
        ));
    }
    None
}

const FIELD_CHANGE_GUIDANCE: &str = "Changing the type of an existing field is not supported. Delete the field and create a new field with a different name, then migrate the data.";

#[derive(Default)]
pub struct FieldTypeUnchanged;

impl ValidationRule for FieldTypeUnchanged {
    fn enter_field(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        parent: &TypeConfig,
        field: FieldRef<'_>,
        previous: Option<&FieldConfig>,
    ) {
        let Some(previous) = previous else {
            return;
        };
        if let Some(change) = field_type_change(field.config, previous) {
            ctx.report_error(
                PackageError::new(format!(
                    "Cannot change {} of field \"{}.{}\"",
                    change,
                    parent.name(),
                    field.name
                ))
                .with_path(["types", parent.name(), field.name])
                .with_description(FIELD_CHANGE_GUIDANCE),
            );
        }
    }

    fn enter_type_extension(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        type_name: &str,
        fields: &FieldConfigMap,
        previous: Option<&FieldConfigMap>,
    ) {
        let Some(previous) = previous else {
            return;
        };
        for (name, field) in fields {
            let change = previous
                .get(name)
                .and_then(|before| field_type_change(field, before));
            if let Some(change) = change {
                ctx.report_error(
                    PackageError::new(format!(
                        "Cannot change {} of field \"{}.{}\"",
                        change, type_name, name
                    ))
                    .with_path(["typeExtensions", type_name, name.as_str()])
                    .with_description(FIELD_CHANGE_GUIDANCE),
                );
            }
        }
    }
}
