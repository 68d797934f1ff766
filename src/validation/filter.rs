//! Synthetic filter schema used to check permission queries.
//!
//! A permission query has the shape `query { node(filter: {...}) }`. The
//! filter of a type accepts its scalar fields with comparison operators,
//! nested filters for references to other object types, and the `AND`, `OR`
//! and `NOT` combinators.

use std::collections::HashSet;

use async_graphql_parser::types::{
    DocumentOperations, ExecutableDocument, OperationDefinition, OperationType, Selection,
};
use async_graphql_parser::Positioned;
use async_graphql_value::Value;
use indexmap::IndexMap;

use crate::types::{is_host_scalar, TypeConfig, TypeKind};

/// Comparison operators accepted on scalar fields.
pub const FILTER_OPERATORS: &[&str] = &[
    "eq",
    "notEq",
    "in",
    "notIn",
    "gt",
    "gte",
    "lt",
    "lte",
    "contains",
    "startsWith",
    "endsWith",
    "isNull",
];

const LIST_OPERATORS: &[&str] = &["in", "notIn"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterField {
    /// Leaf field compared with [`FILTER_OPERATORS`].
    Scalar { type_name: String },
    /// Reference to another object type, filtered with that type's filter.
    Reference { type_name: String },
}

/// Filter inputs reachable from one root type.
#[derive(Debug, Clone, Default)]
pub struct FilterSchema {
    type_name: String,
    inputs: IndexMap<String, IndexMap<String, FilterField>>,
}

impl FilterSchema {
    /// Build the filter schema of `type_name`. Returns `None` when the type
    /// is unknown or not an object type.
    pub fn for_type<'t, F>(type_name: &str, lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<&'t TypeConfig>,
    {
        let root = lookup(type_name)?;
        if root.kind() != TypeKind::Object {
            return None;
        }

        let mut schema = FilterSchema {
            type_name: type_name.to_string(),
            inputs: IndexMap::new(),
        };
        let mut pending = vec![root];
        while let Some(ty) = pending.pop() {
            if schema.inputs.contains_key(ty.name()) {
                continue;
            }
            let mut fields = IndexMap::new();
            for (name, field) in ty.fields().into_iter().flatten() {
                if field.list.is_list() {
                    continue;
                }
                if is_host_scalar(&field.type_name) {
                    fields.insert(
                        name.clone(),
                        FilterField::Scalar {
                            type_name: field.type_name.clone(),
                        },
                    );
                    continue;
                }
                match lookup(&field.type_name) {
                    Some(target) if matches!(target.kind(), TypeKind::Enum | TypeKind::Scalar) => {
                        fields.insert(
                            name.clone(),
                            FilterField::Scalar {
                                type_name: field.type_name.clone(),
                            },
                        );
                    }
                    Some(target) if target.kind() == TypeKind::Object => {
                        fields.insert(
                            name.clone(),
                            FilterField::Reference {
                                type_name: field.type_name.clone(),
                            },
                        );
                        pending.push(target);
                    }
                    _ => {}
                }
            }
            schema.inputs.insert(ty.name().to_string(), fields);
        }

        Some(schema)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Filterable fields of a type reachable from the root.
    pub fn fields(&self, type_name: &str) -> Option<&IndexMap<String, FilterField>> {
        self.inputs.get(type_name)
    }

    /// Parse and check a permission query. Returns every problem found.
    pub fn validate_query(&self, query: &str) -> Result<(), Vec<String>> {
        let document = async_graphql_parser::parse_query(query)
            .map_err(|err| vec![format!("Syntax error: {}", err)])?;

        let mut errors = Vec::new();
        let operation = single_operation(&document, &mut errors);
        if !document.fragments.is_empty() {
            errors.push("Fragments are not allowed in permission queries".to_string());
        }
        if let Some(operation) = operation {
            self.check_operation(operation, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn check_operation(&self, operation: &OperationDefinition, errors: &mut Vec<String>) {
        if operation.ty != OperationType::Query {
            errors.push("Permission queries must be query operations".to_string());
            return;
        }

        let declared: HashSet<&str> = operation
            .variable_definitions
            .iter()
            .map(|def| def.node.name.node.as_str())
            .collect();

        let items = &operation.selection_set.node.items;
        if items.len() != 1 {
            errors.push(format!(
                "Permission queries must select exactly one field, found {}",
                items.len()
            ));
        }

        for item in items {
            let field = match &item.node {
                Selection::Field(field) => &field.node,
                _ => {
                    errors.push("Only the \"node\" field can be selected".to_string());
                    continue;
                }
            };

            if field.name.node.as_str() != "node" {
                errors.push(format!(
                    "Cannot query field \"{}\" on type \"Query\"",
                    field.name.node
                ));
                continue;
            }
            if !field.selection_set.node.items.is_empty() {
                errors.push("Field \"node\" must not have a selection".to_string());
            }

            let mut filter = None;
            for (name, value) in &field.arguments {
                if name.node.as_str() == "filter" {
                    filter = Some(value);
                } else {
                    errors.push(format!(
                        "Unknown argument \"{}\" on field \"Query.node\"",
                        name.node
                    ));
                }
            }

            match filter {
                Some(value) => {
                    self.check_filter(&self.type_name, &value.node, &declared, errors)
                }
                None => errors.push(
                    "Field \"node\" argument \"filter\" is required".to_string(),
                ),
            }
        }
    }

    fn check_filter(
        &self,
        type_name: &str,
        value: &Value,
        declared: &HashSet<&str>,
        errors: &mut Vec<String>,
    ) {
        let fields = match self.inputs.get(type_name) {
            Some(fields) => fields,
            None => return,
        };

        let object = match value {
            Value::Object(object) => object,
            Value::Variable(name) => {
                check_variable(name.as_str(), declared, errors);
                return;
            }
            _ => {
                errors.push(format!(
                    "Expected a filter object for type \"{}\", found {}",
                    type_name, value
                ));
                return;
            }
        };

        for (key, value) in object {
            match key.as_str() {
                "AND" | "OR" => match value {
                    Value::List(items) => {
                        for item in items {
                            self.check_filter(type_name, item, declared, errors);
                        }
                    }
                    other => self.check_filter(type_name, other, declared, errors),
                },
                "NOT" => self.check_filter(type_name, value, declared, errors),
                name => match fields.get(name) {
                    Some(FilterField::Scalar { .. }) => {
                        check_operators(type_name, name, value, declared, errors)
                    }
                    Some(FilterField::Reference { type_name: target }) => {
                        self.check_filter(target, value, declared, errors)
                    }
                    None => errors.push(format!(
                        "Field \"{}\" is not defined by the filter of type \"{}\"",
                        name, type_name
                    )),
                },
            }
        }
    }
}

fn single_operation<'d>(
    document: &'d ExecutableDocument,
    errors: &mut Vec<String>,
) -> Option<&'d OperationDefinition> {
    match &document.operations {
        DocumentOperations::Single(operation) => Some(&operation.node),
        DocumentOperations::Multiple(operations) => {
            if operations.len() == 1 {
                operations.values().next().map(|op: &Positioned<_>| &op.node)
            } else {
                errors.push(format!(
                    "Permission queries must contain exactly one operation, found {}",
                    operations.len()
                ));
                None
            }
        }
    }
}

fn check_variable(name: &str, declared: &HashSet<&str>, errors: &mut Vec<String>) {
    if !declared.contains(name) {
        errors.push(format!("Variable \"${}\" is not defined", name));
    }
}

fn check_operators(
    type_name: &str,
    field: &str,
    value: &Value,
    declared: &HashSet<&str>,
    errors: &mut Vec<String>,
) {
    let object = match value {
        Value::Object(object) => object,
        Value::Variable(name) => return check_variable(name.as_str(), declared, errors),
        other => {
            errors.push(format!(
                "Expected comparison operators for field \"{}.{}\", found {}",
                type_name, field, other
            ));
            return;
        }
    };

    for (operator, operand) in object {
        if !FILTER_OPERATORS.contains(&operator.as_str()) {
            errors.push(format!(
                "Unknown operator \"{}\" for field \"{}.{}\"",
                operator, type_name, field
            ));
            continue;
        }
        if LIST_OPERATORS.contains(&operator.as_str())
            && !matches!(operand, Value::List(_) | Value::Variable(_))
        {
            errors.push(format!(
                "Operator \"{}\" for field \"{}.{}\" expects a list",
                operator, type_name, field
            ));
        }
        collect_variables(operand, declared, errors);
    }
}

fn collect_variables(value: &Value, declared: &HashSet<&str>, errors: &mut Vec<String>) {
    match value {
        Value::Variable(name) => check_variable(name.as_str(), declared, errors),
        Value::List(items) => items
            .iter()
            .for_each(|item| collect_variables(item, declared, errors)),
        Value::Object(object) => object
            .values()
            .for_each(|item| collect_variables(item, declared, errors)),
        _ => {}
    }
}
