//! Conversion between GraphQL type expressions and the flat
//! `{typeName, required, list}` field shape.
//!
//! `list` holds one entry per list dimension, outermost first. Each entry
//! tells whether the items of that dimension are non-null. `[[String!]]!`
//! therefore becomes `{typeName: "String", required: true, list: [false, true]}`.

use std::fmt;

use async_graphql::dynamic::TypeRef;
use async_graphql_parser::types::{BaseType, Type};
use async_graphql_value::Name;

use crate::types::{ArgumentConfig, FieldConfig, ListConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeShape {
    pub type_name: String,
    pub required: bool,
    pub list: Vec<bool>,
}

impl TypeShape {
    pub fn named(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            required: false,
            list: Vec::new(),
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn list(mut self, list: Vec<bool>) -> Self {
        self.list = list;
        self
    }

    /// Flatten a parsed type expression.
    pub fn unwrap(ty: &Type) -> Self {
        let required = !ty.nullable;
        let mut list = Vec::new();
        let mut current = ty;
        loop {
            match &current.base {
                BaseType::Named(name) => {
                    return Self {
                        type_name: name.to_string(),
                        required,
                        list,
                    };
                }
                BaseType::List(inner) => {
                    list.push(!inner.nullable);
                    current = inner;
                }
            }
        }
    }

    /// Parse an SDL type expression such as `[Int!]!`.
    pub fn parse(expression: &str) -> Option<Self> {
        Type::new(expression).map(|ty| Self::unwrap(&ty))
    }

    /// Nullability of the named type and of each list layer, innermost
    /// first. Index 0 is the named type itself.
    fn layers(&self) -> Vec<bool> {
        let mut layers = Vec::with_capacity(self.list.len() + 1);
        for depth in (0..=self.list.len()).rev() {
            let non_null = if depth == 0 {
                self.required
            } else {
                self.list[depth - 1]
            };
            layers.push(non_null);
        }
        layers
    }

    /// Rebuild the parser representation.
    pub fn to_type(&self) -> Type {
        let layers = self.layers();
        let mut ty = Type {
            base: BaseType::Named(Name::new(&self.type_name)),
            nullable: !layers[0],
        };
        for non_null in &layers[1..] {
            ty = Type {
                base: BaseType::List(Box::new(ty)),
                nullable: !non_null,
            };
        }
        ty
    }

    /// Rebuild the dynamic schema representation.
    pub fn to_type_ref(&self) -> TypeRef {
        let layers = self.layers();
        let mut ty = TypeRef::Named(self.type_name.clone().into());
        if layers[0] {
            ty = TypeRef::NonNull(Box::new(ty));
        }
        for non_null in &layers[1..] {
            ty = TypeRef::List(Box::new(ty));
            if *non_null {
                ty = TypeRef::NonNull(Box::new(ty));
            }
        }
        ty
    }

    pub fn is_list(&self) -> bool {
        !self.list.is_empty()
    }

    pub fn list_config(&self) -> ListConfig {
        ListConfig::from(self.list.clone())
    }
}

impl fmt::Display for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_type())
    }
}

impl From<&FieldConfig> for TypeShape {
    fn from(field: &FieldConfig) -> Self {
        Self {
            type_name: field.type_name.clone(),
            required: field.required,
            list: field.list.dimensions(),
        }
    }
}

impl From<&ArgumentConfig> for TypeShape {
    fn from(argument: &ArgumentConfig) -> Self {
        Self {
            type_name: argument.type_name.clone(),
            required: argument.required,
            list: argument.list.dimensions(),
        }
    }
}
