//! Index and autocomplete declarations must reference real fields.

use std::collections::HashSet;

use crate::error::PackageError;
use crate::types::TypeConfig;
use crate::validation::{ValidationContext, ValidationRule};

/// Problems with one list of field names declared on `ty`.
fn check_field_list<'f>(
    ty: &TypeConfig,
    fields: impl IntoIterator<Item = &'f String>,
    what: &str,
    require_string: bool,
) -> Vec<String> {
    let mut problems = Vec::new();
    let mut seen = HashSet::new();
    let declared = ty.fields();

    for name in fields {
        if !seen.insert(name.as_str()) {
            problems.push(format!(
                "Field \"{}\" is listed more than once in {} of type \"{}\"",
                name,
                what,
                ty.name()
            ));
            continue;
        }
        match declared.and_then(|fields| fields.get(name)) {
            None => problems.push(format!(
                "Field \"{}\" in {} does not exist on type \"{}\"",
                name,
                what,
                ty.name()
            )),
            Some(field) if require_string && (field.type_name != "String" || field.list.is_list()) => {
                problems.push(format!(
                    "Field \"{}\" in {} of type \"{}\" must be of type String",
                    name,
                    what,
                    ty.name()
                ))
            }
            Some(_) => {}
        }
    }
    problems
}

#[derive(Default)]
pub struct ValidIndexFields;

impl ValidationRule for ValidIndexFields {
    fn enter_type(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        ty: &TypeConfig,
        _previous: Option<&TypeConfig>,
    ) {
        let Some(object) = ty.as_object() else {
            return;
        };
        for (position, index) in object.indexes.iter().enumerate() {
            let position = position.to_string();
            for problem in check_field_list(ty, &index.fields, "index", false) {
                ctx.report_error(
                    PackageError::new(problem).with_path([
                        "types",
                        ty.name(),
                        "indexes",
                        position.as_str(),
                    ]),
                );
            }
        }
    }
}

#[derive(Default)]
pub struct ValidAutoCompleteFields;

impl ValidationRule for ValidAutoCompleteFields {
    fn enter_type(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        ty: &TypeConfig,
        _previous: Option<&TypeConfig>,
    ) {
        let Some(object) = ty.as_object() else {
            return;
        };
        for problem in check_field_list(ty, &object.auto_complete_fields, "autoCompleteFields", true) {
            ctx.report_error(
                PackageError::new(problem).with_path(["types", ty.name(), "autoCompleteFields"]),
            );
        }
    }
}
