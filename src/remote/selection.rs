//! Outgoing selection sets of stitched root fields.
//!
//! The client's selection is captured as a plain [`Selection`] tree, rewritten
//! against the local type configs and printed as the remote operation. The
//! rewrite never mutates its input.

use std::fmt::Write as _;

use async_graphql::{SelectionField, Value as ConstValue};
use indexmap::IndexMap;

use crate::schema::ConnectionRegistry;
use crate::types::{FieldConfigMap, TypeConfig};

pub const TYPENAME_FIELD: &str = "__typename";

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Field(FieldSelection),
    InlineFragment(InlineFragment),
}

impl Selection {
    pub fn field(name: impl Into<String>) -> Self {
        Selection::Field(FieldSelection::new(name))
    }

    fn is_plain_field(&self, name: &str) -> bool {
        matches!(self, Selection::Field(field) if field.alias.is_none() && field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSelection {
    pub alias: Option<String>,
    pub name: String,
    pub arguments: Vec<(String, ConstValue)>,
    pub selection_set: Vec<Selection>,
}

impl FieldSelection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            alias: None,
            name: name.into(),
            arguments: Vec::new(),
            selection_set: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn argument(mut self, name: impl Into<String>, value: ConstValue) -> Self {
        self.arguments.push((name.into(), value));
        self
    }

    pub fn select(mut self, selection: Selection) -> Self {
        self.selection_set.push(selection);
        self
    }

    /// Capture the field as requested by the client, with variables
    /// resolved. Fragment spreads arrive flattened.
    pub fn from_selection_field(field: SelectionField<'_>) -> async_graphql::Result<Self> {
        let arguments = field
            .arguments()
            .map_err(|err| async_graphql::Error::new(err.message))?
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        let selection_set = field
            .selection_set()
            .map(|child| Self::from_selection_field(child).map(Selection::Field))
            .collect::<async_graphql::Result<Vec<_>>>()?;
        Ok(Self {
            alias: field.alias().map(str::to_string),
            name: field.name().to_string(),
            arguments,
            selection_set,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineFragment {
    pub type_condition: String,
    pub selection_set: Vec<Selection>,
}

/// Local type information a rewrite needs.
pub struct RewriteContext<'a> {
    /// Types of the stitched module by local name.
    pub types: &'a IndexMap<String, TypeConfig>,
    /// Local type name → remote type name.
    pub remote_names: &'a IndexMap<String, String>,
    /// Fields other modules join on, by local type name.
    pub key_fields: &'a IndexMap<String, Vec<String>>,
    /// Connection fields, served locally and never forwarded.
    pub connections: Option<&'a ConnectionRegistry>,
}

impl RewriteContext<'_> {
    fn remote_name<'n>(&'n self, local: &'n str) -> &'n str {
        self.remote_names.get(local).map(String::as_str).unwrap_or(local)
    }

    fn is_connection(&self, type_name: &str, field_name: &str) -> bool {
        self.connections
            .is_some_and(|connections| connections.contains(type_name, field_name))
    }

    /// Object types a value of `type_name` may have.
    fn possible_types(&self, type_name: &str) -> Vec<&str> {
        match self.types.get(type_name) {
            Some(TypeConfig::Object(object)) => vec![object.name.as_str()],
            Some(TypeConfig::Union(union)) => union.type_names.iter().map(String::as_str).collect(),
            Some(TypeConfig::Interface(_)) => self
                .types
                .values()
                .filter(|ty| matches!(ty, TypeConfig::Object(_)) && ty.implements(type_name))
                .map(TypeConfig::name)
                .collect(),
            _ => Vec::new(),
        }
    }

    fn object_fields(&self, type_name: &str) -> Option<&FieldConfigMap> {
        self.types
            .get(type_name)
            .and_then(TypeConfig::as_object)
            .map(|object| &object.fields)
    }

    /// Rewrite the selection of a field returning `type_name`.
    ///
    /// Leaf and unknown types get no selection set. Composite types drop
    /// fields the remote API does not have, gain the key fields other
    /// modules join on, and always select at least `__typename`.
    pub fn rewrite(&self, type_name: &str, selections: &[Selection]) -> Vec<Selection> {
        match self.types.get(type_name) {
            Some(TypeConfig::Object(_)) => self.rewrite_object(type_name, selections),
            Some(TypeConfig::Interface(interface)) => {
                self.rewrite_abstract(type_name, Some(&interface.fields), selections)
            }
            Some(TypeConfig::Union(_)) => self.rewrite_abstract(type_name, None, selections),
            _ => Vec::new(),
        }
    }

    fn rewrite_field(&self, field: &FieldSelection, type_name: &str) -> Selection {
        Selection::Field(FieldSelection {
            selection_set: self.rewrite(type_name, &field.selection_set),
            ..field.clone()
        })
    }

    fn rewrite_object(&self, type_name: &str, selections: &[Selection]) -> Vec<Selection> {
        let fields = self.object_fields(type_name);
        let mut output = Vec::new();

        for selection in selections {
            match selection {
                Selection::Field(field) if field.name == TYPENAME_FIELD => {
                    output.push(selection.clone());
                }
                Selection::Field(field) => {
                    if self.is_connection(type_name, &field.name) {
                        continue;
                    }
                    if let Some(config) = fields.and_then(|fields| fields.get(&field.name)) {
                        output.push(self.rewrite_field(field, &config.type_name));
                    }
                }
                Selection::InlineFragment(fragment) => {
                    if self.possible_types(&fragment.type_condition).contains(&type_name) {
                        output.extend(self.rewrite_object(type_name, &fragment.selection_set));
                    }
                }
            }
        }

        for key in self.key_fields.get(type_name).into_iter().flatten() {
            if !output.iter().any(|selection| selection.is_plain_field(key)) {
                output.push(Selection::InlineFragment(InlineFragment {
                    type_condition: self.remote_name(type_name).to_string(),
                    selection_set: vec![Selection::field(key.as_str())],
                }));
            }
        }

        if output.is_empty() {
            output.push(Selection::field(TYPENAME_FIELD));
        }
        output
    }

    fn rewrite_abstract(
        &self,
        type_name: &str,
        shared_fields: Option<&FieldConfigMap>,
        selections: &[Selection],
    ) -> Vec<Selection> {
        let possible = self.possible_types(type_name);
        let mut output = vec![Selection::field(TYPENAME_FIELD)];
        let mut per_type: IndexMap<&str, Vec<Selection>> = IndexMap::new();

        for selection in selections {
            match selection {
                Selection::Field(field) if field.name == TYPENAME_FIELD => {}
                Selection::Field(field) => {
                    if let Some(config) = shared_fields.and_then(|fields| fields.get(&field.name)) {
                        output.push(self.rewrite_field(field, &config.type_name));
                        continue;
                    }
                    for &object in &possible {
                        let declares = self
                            .object_fields(object)
                            .is_some_and(|fields| fields.contains_key(&field.name));
                        if declares {
                            per_type.entry(object).or_default().push(selection.clone());
                        }
                    }
                }
                Selection::InlineFragment(fragment) => {
                    let matching = self.possible_types(&fragment.type_condition);
                    for &object in possible.iter().filter(|object| matching.contains(*object)) {
                        per_type
                            .entry(object)
                            .or_default()
                            .extend(fragment.selection_set.iter().cloned());
                    }
                }
            }
        }

        for &object in &possible {
            let selections = per_type.shift_remove(object).unwrap_or_default();
            if selections.is_empty() && !self.key_fields.contains_key(object) {
                continue;
            }
            output.push(Selection::InlineFragment(InlineFragment {
                type_condition: self.remote_name(object).to_string(),
                selection_set: self.rewrite_object(object, &selections),
            }));
        }
        output
    }
}

fn write_selection_set(out: &mut String, selections: &[Selection]) {
    if selections.is_empty() {
        return;
    }
    out.push_str(" {");
    for selection in selections {
        out.push(' ');
        match selection {
            Selection::Field(field) => write_field(out, field),
            Selection::InlineFragment(fragment) => {
                let _ = write!(out, "... on {}", fragment.type_condition);
                write_selection_set(out, &fragment.selection_set);
            }
        }
    }
    out.push_str(" }");
}

fn write_field(out: &mut String, field: &FieldSelection) {
    if let Some(alias) = &field.alias {
        let _ = write!(out, "{}: ", alias);
    }
    out.push_str(&field.name);
    if !field.arguments.is_empty() {
        let arguments: Vec<String> = field
            .arguments
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect();
        let _ = write!(out, "({})", arguments.join(", "));
    }
    write_selection_set(out, &field.selection_set);
}

/// Print a single-field operation, e.g. `query { result: viewer { login } }`.
pub fn print_operation(operation: &str, root: &FieldSelection) -> String {
    let mut out = String::from(operation);
    write_selection_set(&mut out, &[Selection::Field(root.clone())]);
    out
}
