//! Capability values embedded in module configurations: custom field
//! resolvers, abstract type resolvers and module enhancement hooks.

use std::fmt;
use std::sync::Arc;

use async_graphql::dynamic::{FieldFuture, ResolverContext};
use serde_json::Value;

use crate::types::ModuleConfig;

/// Boxed error returned by user-supplied hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Custom resolver attached to a field.
///
/// Implementations must not borrow from `self` in the returned future; clone
/// what the future needs.
pub trait Resolve: Send + Sync {
    fn resolve<'a>(&self, ctx: ResolverContext<'a>) -> FieldFuture<'a>;
}

struct FnResolver<F>(F);

impl<F> Resolve for FnResolver<F>
where
    F: for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync,
{
    fn resolve<'a>(&self, ctx: ResolverContext<'a>) -> FieldFuture<'a> {
        (self.0)(ctx)
    }
}

/// Shared handle to a [`Resolve`] implementation.
#[derive(Clone)]
pub struct FieldResolver(Arc<dyn Resolve>);

impl FieldResolver {
    pub fn new(resolver: impl Resolve + 'static) -> Self {
        Self(Arc::new(resolver))
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static,
    {
        Self(Arc::new(FnResolver(f)))
    }

    pub fn resolve<'a>(&self, ctx: ResolverContext<'a>) -> FieldFuture<'a> {
        self.0.resolve(ctx)
    }
}

impl fmt::Debug for FieldResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldResolver(..)")
    }
}

/// Picks the concrete object type for a value of an interface or union.
#[derive(Clone)]
pub struct TypeResolver(Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>);

impl TypeResolver {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn resolve_type(&self, value: &Value) -> Option<String> {
        (self.0)(value)
    }
}

impl fmt::Debug for TypeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TypeResolver(..)")
    }
}

/// Module-supplied hook run by the enhancement pipeline.
pub trait EnhanceModule: Send + Sync {
    fn enhance(&self, module: ModuleConfig, modules: &[ModuleConfig])
        -> Result<ModuleConfig, BoxError>;
}

struct FnEnhancer<F>(F);

impl<F> EnhanceModule for FnEnhancer<F>
where
    F: Fn(ModuleConfig, &[ModuleConfig]) -> Result<ModuleConfig, BoxError> + Send + Sync,
{
    fn enhance(
        &self,
        module: ModuleConfig,
        modules: &[ModuleConfig],
    ) -> Result<ModuleConfig, BoxError> {
        (self.0)(module, modules)
    }
}

/// Shared handle to an [`EnhanceModule`] hook.
#[derive(Clone)]
pub struct ModuleEnhancer(Arc<dyn EnhanceModule>);

impl ModuleEnhancer {
    pub fn new(enhancer: impl EnhanceModule + 'static) -> Self {
        Self(Arc::new(enhancer))
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(ModuleConfig, &[ModuleConfig]) -> Result<ModuleConfig, BoxError>
            + Send
            + Sync
            + 'static,
    {
        Self(Arc::new(FnEnhancer(f)))
    }

    pub fn enhance(
        &self,
        module: ModuleConfig,
        modules: &[ModuleConfig],
    ) -> Result<ModuleConfig, BoxError> {
        self.0.enhance(module, modules)
    }
}

impl fmt::Debug for ModuleEnhancer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ModuleEnhancer(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_resolver_reads_value() {
        let resolver = TypeResolver::new(|value| {
            value
                .get("kind")
                .and_then(Value::as_str)
                .map(|kind| format!("Blog_{}", kind))
        });
        assert_eq!(
            resolver.resolve_type(&json!({"kind": "Post"})),
            Some("Blog_Post".to_string())
        );
        assert_eq!(resolver.resolve_type(&json!({})), None);
    }

    #[test]
    fn enhancer_from_fn() {
        let enhancer = ModuleEnhancer::from_fn(|mut module, modules| {
            module.version = format!("{}+{}", module.version, modules.len());
            Ok(module)
        });
        let module = ModuleConfig::new("blog").with_version("1.0.0");
        let enhanced = enhancer.enhance(module.clone(), &[module]).unwrap();
        assert_eq!(enhanced.version, "1.0.0+1");
    }
}
