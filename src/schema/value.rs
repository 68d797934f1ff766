//! JSON values flowing through the dynamic schema.
//!
//! Object values are carried as `serde_json::Value` inside
//! `FieldValue::owned_any`; child fields read their property from the parent.

use async_graphql::dynamic::{FieldFuture, FieldValue, ResolverContext};
use async_graphql::{Name, Value as ConstValue};
use indexmap::IndexMap;
use serde_json::Value;

use crate::hooks::TypeResolver;
use crate::types::{is_host_scalar, TypeConfig};

/// How a JSON value of some named type becomes a [`FieldValue`].
#[derive(Debug, Clone)]
pub enum OutputKind {
    Leaf,
    Enum,
    Object,
    /// Interface or union. The concrete type comes from the resolver, or
    /// from `__typename` on the value.
    Abstract(Option<TypeResolver>),
}

impl OutputKind {
    pub fn of(type_name: &str, types: &IndexMap<String, TypeConfig>) -> Self {
        if is_host_scalar(type_name) {
            return OutputKind::Leaf;
        }
        match types.get(type_name) {
            Some(TypeConfig::Object(_)) => OutputKind::Object,
            Some(TypeConfig::Interface(t)) => OutputKind::Abstract(t.resolve_type.clone()),
            Some(TypeConfig::Union(t)) => OutputKind::Abstract(t.resolve_type.clone()),
            Some(TypeConfig::Enum(_)) => OutputKind::Enum,
            _ => OutputKind::Leaf,
        }
    }
}

/// Concrete type name of an abstract value.
pub fn concrete_type(value: &Value, resolver: Option<&TypeResolver>) -> Option<String> {
    resolver
        .and_then(|resolver| resolver.resolve_type(value))
        .or_else(|| {
            value
                .get("__typename")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
}

/// Convert `value` for a field with the given list dimensions.
///
/// `null` becomes `None`. A value that is not an array where a list is
/// expected is treated as null.
pub fn to_field_value<'a>(value: Value, dims: &[bool], kind: &OutputKind) -> Option<FieldValue<'a>> {
    if value.is_null() {
        return None;
    }
    if let Some((_, inner)) = dims.split_first() {
        let Value::Array(items) = value else {
            return None;
        };
        return Some(FieldValue::list(items.into_iter().map(|item| {
            to_field_value(item, inner, kind).unwrap_or(FieldValue::NULL)
        })));
    }

    match kind {
        OutputKind::Leaf => ConstValue::from_json(value).ok().map(FieldValue::value),
        OutputKind::Enum => match value {
            Value::String(name) => Some(FieldValue::value(ConstValue::Enum(Name::new(name)))),
            other => ConstValue::from_json(other).ok().map(FieldValue::value),
        },
        OutputKind::Object => Some(FieldValue::owned_any(value)),
        OutputKind::Abstract(resolver) => {
            let type_name = concrete_type(&value, resolver.as_ref());
            let field_value = FieldValue::owned_any(value);
            Some(match type_name {
                Some(name) => field_value.with_type(name),
                None => field_value,
            })
        }
    }
}

/// JSON view of the parent object of a field.
pub fn parent_json(ctx: &ResolverContext<'_>) -> Option<Value> {
    if let Ok(value) = ctx.parent_value.try_downcast_ref::<Value>() {
        return Some(value.clone());
    }
    ctx.parent_value
        .as_value()
        .and_then(|value| value.clone().into_json().ok())
}

/// Resolver reading `field_name` (or the alias it was requested under) from
/// the parent object.
pub fn property_resolver(
    field_name: String,
    dims: Vec<bool>,
    kind: OutputKind,
) -> impl for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static {
    move |ctx| {
        let property = parent_json(&ctx).and_then(|parent| {
            let alias = ctx.ctx.field().alias().map(str::to_string);
            let mut object = match parent {
                Value::Object(object) => object,
                _ => return None,
            };
            alias
                .and_then(|alias| object.remove(&alias))
                .or_else(|| object.remove(&field_name))
        });
        let value = property.and_then(|property| to_field_value(property, &dims, &kind));
        FieldFuture::new(async move { Ok(value) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnumTypeConfig, ObjectTypeConfig, UnionTypeConfig};
    use serde_json::json;

    fn types() -> IndexMap<String, TypeConfig> {
        let mut types = IndexMap::new();
        types.insert(
            "Blog_Post".to_string(),
            TypeConfig::from(ObjectTypeConfig::new("Blog_Post")),
        );
        types.insert(
            "Blog_Status".to_string(),
            TypeConfig::from(EnumTypeConfig {
                name: "Blog_Status".into(),
                ..Default::default()
            }),
        );
        types.insert(
            "Blog_Item".to_string(),
            TypeConfig::from(UnionTypeConfig::new("Blog_Item", ["Blog_Post"])),
        );
        types
    }

    #[test]
    fn output_kinds() {
        let types = types();
        assert!(matches!(OutputKind::of("String", &types), OutputKind::Leaf));
        assert!(matches!(OutputKind::of("DateTime", &types), OutputKind::Leaf));
        assert!(matches!(OutputKind::of("Blog_Post", &types), OutputKind::Object));
        assert!(matches!(OutputKind::of("Blog_Status", &types), OutputKind::Enum));
        assert!(matches!(
            OutputKind::of("Blog_Item", &types),
            OutputKind::Abstract(None)
        ));
    }

    #[test]
    fn concrete_type_prefers_resolver() {
        let value = json!({"__typename": "Blog_Post", "kind": "Page"});
        assert_eq!(concrete_type(&value, None).as_deref(), Some("Blog_Post"));

        let resolver = TypeResolver::new(|value| {
            value.get("kind").and_then(Value::as_str).map(|k| format!("Blog_{}", k))
        });
        assert_eq!(
            concrete_type(&value, Some(&resolver)).as_deref(),
            Some("Blog_Page")
        );
    }

    #[test]
    fn null_and_mismatched_lists() {
        assert!(to_field_value(Value::Null, &[], &OutputKind::Leaf).is_none());
        assert!(to_field_value(json!("x"), &[true], &OutputKind::Leaf).is_none());
        assert!(to_field_value(json!(["x", null]), &[false], &OutputKind::Leaf).is_some());
    }
}
