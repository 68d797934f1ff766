//! Module validation - a visitor that runs a list of independent rules over
//! every module, type, field, connection and type extension.
//!
//! Rules never abort the traversal. Problems are reported through
//! [`ValidationContext::report_error`] and the complete list is returned once
//! every node has been visited.

mod filter;
mod report;
pub mod rules;

use indexmap::IndexMap;

use crate::config::ProjectConfig;
use crate::error::PackageError;
use crate::types::{
    is_host_scalar, ConnectionConfig, FieldConfig, FieldConfigMap, ModuleConfig, TypeConfig,
};

pub use filter::{FilterField, FilterSchema, FILTER_OPERATORS};
pub use report::{ModuleReport, ValidationReport, ValidationStatus};
pub use rules::default_rules;

/// A type together with the module that declares it.
#[derive(Debug, Clone, Copy)]
pub struct TypeEntry<'a> {
    pub config: &'a TypeConfig,
    pub module: &'a ModuleConfig,
}

/// A single field visited by the traversal.
#[derive(Debug, Clone, Copy)]
pub struct FieldRef<'a> {
    pub name: &'a str,
    pub config: &'a FieldConfig,
}

/// Shared state of one validation run.
pub struct ValidationContext<'a> {
    modules: &'a [ModuleConfig],
    type_map: IndexMap<&'a str, TypeEntry<'a>>,
    current_modules: IndexMap<&'a str, &'a ModuleConfig>,
    current_types: IndexMap<&'a str, TypeEntry<'a>>,
    project: &'a ProjectConfig,
    module: Option<&'a ModuleConfig>,
    errors: Vec<PackageError>,
}

impl<'a> ValidationContext<'a> {
    pub fn new(
        modules: &'a [ModuleConfig],
        current_modules: &'a [ModuleConfig],
        project: &'a ProjectConfig,
    ) -> Self {
        let current_types = build_type_map(current_modules);
        let current_modules = current_modules
            .iter()
            .map(|module| (module.id.as_str(), module))
            .collect();

        Self {
            modules,
            type_map: build_type_map(modules),
            current_modules,
            current_types,
            project,
            module: None,
            errors: Vec::new(),
        }
    }

    pub fn modules(&self) -> &'a [ModuleConfig] {
        self.modules
    }

    pub fn project(&self) -> &'a ProjectConfig {
        self.project
    }

    /// Module currently being visited.
    pub fn module(&self) -> Option<&'a ModuleConfig> {
        self.module
    }

    /// All types of the new module set, first declaration wins.
    pub fn type_map(&self) -> &IndexMap<&'a str, TypeEntry<'a>> {
        &self.type_map
    }

    pub fn get_type(&self, name: &str) -> Option<&'a TypeConfig> {
        self.type_map.get(name).map(|entry| entry.config)
    }

    pub fn type_entry(&self, name: &str) -> Option<TypeEntry<'a>> {
        self.type_map.get(name).copied()
    }

    /// Whether `name` is a declared type or a scalar provided by the host.
    pub fn type_exists(&self, name: &str) -> bool {
        is_host_scalar(name) || self.type_map.contains_key(name)
    }

    /// Field of a type, including fields contributed through type extensions.
    pub fn get_field(&self, type_name: &str, field_name: &str) -> Option<&'a FieldConfig> {
        if let Some(field) = self
            .get_type(type_name)
            .and_then(|ty| ty.fields())
            .and_then(|fields| fields.get(field_name))
        {
            return Some(field);
        }
        self.modules
            .iter()
            .filter_map(|module| module.type_extensions.get(type_name))
            .find_map(|fields| fields.get(field_name))
    }

    pub fn previous_module(&self, id: &str) -> Option<&'a ModuleConfig> {
        self.current_modules.get(id).copied()
    }

    pub fn previous_type(&self, name: &str) -> Option<&'a TypeConfig> {
        self.current_types.get(name).map(|entry| entry.config)
    }

    /// Record a problem. The current module is filled in when the error does
    /// not name one.
    pub fn report_error(&mut self, mut error: PackageError) {
        if error.module.is_none() {
            error.module = self.module.map(|module| module.id.clone());
        }
        self.errors.push(error);
    }

    pub fn errors(&self) -> &[PackageError] {
        &self.errors
    }

    fn into_errors(self) -> Vec<PackageError> {
        self.errors
    }
}

fn build_type_map(modules: &[ModuleConfig]) -> IndexMap<&str, TypeEntry<'_>> {
    let mut map = IndexMap::new();
    for module in modules {
        for config in &module.types {
            map.entry(config.name())
                .or_insert(TypeEntry { config, module });
        }
    }
    map
}

/// One validation rule. Every hook defaults to a no-op.
///
/// `previous` arguments carry the same named entity from the currently
/// deployed module set, if it exists there.
#[allow(unused_variables)]
pub trait ValidationRule {
    /// Called once before the traversal.
    fn enter(&mut self, ctx: &mut ValidationContext<'_>) {}

    /// Called once after the traversal.
    fn leave(&mut self, ctx: &mut ValidationContext<'_>) {}

    fn enter_module(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        module: &ModuleConfig,
        previous: Option<&ModuleConfig>,
    ) {
    }

    fn leave_module(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        module: &ModuleConfig,
        previous: Option<&ModuleConfig>,
    ) {
    }

    fn enter_type(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        ty: &TypeConfig,
        previous: Option<&TypeConfig>,
    ) {
    }

    fn leave_type(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        ty: &TypeConfig,
        previous: Option<&TypeConfig>,
    ) {
    }

    fn enter_field(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        parent: &TypeConfig,
        field: FieldRef<'_>,
        previous: Option<&FieldConfig>,
    ) {
    }

    fn leave_field(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        parent: &TypeConfig,
        field: FieldRef<'_>,
        previous: Option<&FieldConfig>,
    ) {
    }

    fn enter_connection(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        connection: &ConnectionConfig,
        previous: Option<&ConnectionConfig>,
    ) {
    }

    fn leave_connection(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        connection: &ConnectionConfig,
        previous: Option<&ConnectionConfig>,
    ) {
    }

    fn enter_type_extension(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        type_name: &str,
        fields: &FieldConfigMap,
        previous: Option<&FieldConfigMap>,
    ) {
    }

    fn leave_type_extension(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        type_name: &str,
        fields: &FieldConfigMap,
        previous: Option<&FieldConfigMap>,
    ) {
    }
}

/// Creates a rule instance for one validation run.
pub type RuleFactory = fn(&ValidationContext<'_>) -> Box<dyn ValidationRule>;

/// Factory for rules that need no setup.
pub fn rule<R>(_ctx: &ValidationContext<'_>) -> Box<dyn ValidationRule>
where
    R: ValidationRule + Default + 'static,
{
    Box::new(R::default())
}

/// Validate `modules` against `rules`.
///
/// `current_modules` is the deployed module set, used by rules that forbid
/// breaking changes. Returns every problem found, in traversal order.
pub fn validate_modules(
    modules: &[ModuleConfig],
    current_modules: &[ModuleConfig],
    rules: &[RuleFactory],
    project: &ProjectConfig,
) -> Vec<PackageError> {
    let mut ctx = ValidationContext::new(modules, current_modules, project);
    let mut rules: Vec<Box<dyn ValidationRule>> = rules.iter().map(|factory| factory(&ctx)).collect();
    tracing::debug!(
        modules = modules.len(),
        rules = rules.len(),
        "validating modules"
    );

    for rule in rules.iter_mut() {
        rule.enter(&mut ctx);
    }

    for module in modules {
        ctx.module = Some(module);
        let previous_module = ctx.previous_module(&module.id);
        visit_module(&mut ctx, &mut rules, module, previous_module);
        ctx.module = None;
    }

    for rule in rules.iter_mut() {
        rule.leave(&mut ctx);
    }

    let errors = ctx.into_errors();
    tracing::info!(
        modules = modules.len(),
        errors = errors.len(),
        "module validation finished"
    );
    errors
}

fn visit_module<'a>(
    ctx: &mut ValidationContext<'a>,
    rules: &mut [Box<dyn ValidationRule>],
    module: &'a ModuleConfig,
    previous_module: Option<&'a ModuleConfig>,
) {
    for rule in rules.iter_mut() {
        rule.enter_module(ctx, module, previous_module);
    }

    for ty in &module.types {
        let previous = ctx.previous_type(ty.name());
        for rule in rules.iter_mut() {
            rule.enter_type(ctx, ty, previous);
        }

        if let Some(fields) = ty.fields() {
            for (name, config) in fields {
                let field = FieldRef { name, config };
                let previous_field = previous
                    .and_then(|p| p.fields())
                    .and_then(|fields| fields.get(name));
                for rule in rules.iter_mut() {
                    rule.enter_field(ctx, ty, field, previous_field);
                }
                for rule in rules.iter_mut() {
                    rule.leave_field(ctx, ty, field, previous_field);
                }
            }
        }

        for rule in rules.iter_mut() {
            rule.leave_type(ctx, ty, previous);
        }
    }

    for connection in &module.connections {
        let previous = previous_module.and_then(|p| p.find_connection(&connection.name));
        for rule in rules.iter_mut() {
            rule.enter_connection(ctx, connection, previous);
        }
        for rule in rules.iter_mut() {
            rule.leave_connection(ctx, connection, previous);
        }
    }

    for (type_name, fields) in &module.type_extensions {
        let previous = previous_module.and_then(|p| p.type_extensions.get(type_name));
        for rule in rules.iter_mut() {
            rule.enter_type_extension(ctx, type_name, fields, previous);
        }
        for rule in rules.iter_mut() {
            rule.leave_type_extension(ctx, type_name, fields, previous);
        }
    }

    for rule in rules.iter_mut() {
        rule.leave_module(ctx, module, previous_module);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ObjectTypeConfig;

    #[derive(Default)]
    struct VisitLog {
        events: Vec<String>,
    }

    impl ValidationRule for VisitLog {
        fn enter_module(
            &mut self,
            _ctx: &mut ValidationContext<'_>,
            module: &ModuleConfig,
            _previous: Option<&ModuleConfig>,
        ) {
            self.events.push(format!("module {}", module.id));
        }

        fn enter_type(
            &mut self,
            _ctx: &mut ValidationContext<'_>,
            ty: &TypeConfig,
            previous: Option<&TypeConfig>,
        ) {
            self.events
                .push(format!("type {} previous={}", ty.name(), previous.is_some()));
        }

        fn enter_field(
            &mut self,
            _ctx: &mut ValidationContext<'_>,
            parent: &TypeConfig,
            field: FieldRef<'_>,
            _previous: Option<&FieldConfig>,
        ) {
            self.events.push(format!("field {}.{}", parent.name(), field.name));
        }

        fn leave(&mut self, ctx: &mut ValidationContext<'_>) {
            ctx.report_error(PackageError::new(self.events.join(", ")));
        }
    }

    fn blog() -> ModuleConfig {
        ModuleConfig::new("blog").with_type(
            ObjectTypeConfig::new("Blog_Post")
                .field("title", FieldConfig::new("String"))
                .field("body", FieldConfig::new("String")),
        )
    }

    #[test]
    fn visits_in_declaration_order() {
        let modules = vec![blog()];
        let current = vec![ModuleConfig::new("blog").with_type(ObjectTypeConfig::new("Blog_Post"))];
        let errors = validate_modules(
            &modules,
            &current,
            &[rule::<VisitLog>],
            &ProjectConfig::default(),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "module blog, type Blog_Post previous=true, field Blog_Post.title, field Blog_Post.body"
        );
        assert_eq!(errors[0].module, None);
    }

    #[test]
    fn report_error_fills_current_module() {
        let modules = vec![blog()];
        let project = ProjectConfig::default();
        let mut ctx = ValidationContext::new(&modules, &[], &project);
        ctx.module = Some(&modules[0]);
        ctx.report_error(PackageError::new("bad"));
        ctx.report_error(PackageError::new("other").with_module("auth"));
        let errors = ctx.into_errors();
        assert_eq!(errors[0].module.as_deref(), Some("blog"));
        assert_eq!(errors[1].module.as_deref(), Some("auth"));
    }

    #[test]
    fn first_declaration_wins_in_type_map() {
        let modules = vec![
            blog(),
            ModuleConfig::new("copy").with_type(ObjectTypeConfig::new("Blog_Post")),
        ];
        let project = ProjectConfig::default();
        let ctx = ValidationContext::new(&modules, &[], &project);
        assert_eq!(ctx.type_entry("Blog_Post").unwrap().module.id, "blog");
        assert!(ctx.type_exists("DateTime"));
        assert!(!ctx.type_exists("Missing"));
    }
}
