//! Project-level rules on the module set.

use std::collections::HashSet;

use crate::error::PackageError;
use crate::types::ModuleConfig;
use crate::validation::{ValidationContext, ValidationRule};

/// NATIVE modules every project must include.
pub const REQUIRED_MODULES: &[&str] = &["core", "auth", "relay"];

#[derive(Default)]
pub struct RequiredModules {
    native: HashSet<String>,
}

impl ValidationRule for RequiredModules {
    fn enter_module(
        &mut self,
        _ctx: &mut ValidationContext<'_>,
        module: &ModuleConfig,
        _previous: Option<&ModuleConfig>,
    ) {
        if module.is_native() {
            self.native.insert(module.id.clone());
        }
    }

    fn leave(&mut self, ctx: &mut ValidationContext<'_>) {
        for id in REQUIRED_MODULES {
            if !self.native.contains(*id) {
                ctx.report_error(
                    PackageError::new(format!("Required module \"{}\" is not installed", id))
                        .with_path(["modules", *id]),
                );
            }
        }
    }
}

/// Modules can only declare a runtime when the project has one.
#[derive(Default)]
pub struct NoModuleRuntime;

impl ValidationRule for NoModuleRuntime {
    fn enter_module(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        module: &ModuleConfig,
        _previous: Option<&ModuleConfig>,
    ) {
        if module.runtime.is_some() && ctx.project().runtime_endpoint.is_none() {
            ctx.report_error(
                PackageError::new(format!(
                    "Module \"{}\" declares a runtime but the project has no runtime endpoint",
                    module.id
                ))
                .with_path(["runtime"]),
            );
        }
    }
}

#[derive(Default)]
pub struct UniqueModuleIds {
    seen: HashSet<String>,
}

impl ValidationRule for UniqueModuleIds {
    fn enter_module(
        &mut self,
        ctx: &mut ValidationContext<'_>,
        module: &ModuleConfig,
        _previous: Option<&ModuleConfig>,
    ) {
        if !self.seen.insert(module.id.clone()) {
            ctx.report_error(
                PackageError::new(format!("Module id \"{}\" is used more than once", module.id))
                    .with_path(["id"]),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::validation::{rule, validate_modules};
    use serde_json::json;

    #[test]
    fn reports_each_missing_module() {
        let modules = vec![
            ModuleConfig::new("core").native(),
            ModuleConfig::new("auth"),
        ];
        let errors = validate_modules(
            &modules,
            &[],
            &[rule::<RequiredModules>],
            &ProjectConfig::default(),
        );
        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            [
                "Required module \"auth\" is not installed",
                "Required module \"relay\" is not installed"
            ]
        );
        assert!(errors.iter().all(|e| e.module.is_none()));
    }

    #[test]
    fn runtime_needs_endpoint() {
        let mut module = ModuleConfig::new("functions");
        module.runtime = Some(json!({"kind": "NODEJS"}));
        let modules = vec![module];

        let errors = validate_modules(
            &modules,
            &[],
            &[rule::<NoModuleRuntime>],
            &ProjectConfig::default(),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].module.as_deref(), Some("functions"));

        let project = ProjectConfig::default().with_runtime_endpoint("http://runtime:8080");
        assert!(validate_modules(&modules, &[], &[rule::<NoModuleRuntime>], &project).is_empty());
    }

    #[test]
    fn duplicate_module_ids() {
        let modules = vec![ModuleConfig::new("blog"), ModuleConfig::new("blog")];
        let errors = validate_modules(
            &modules,
            &[],
            &[rule::<UniqueModuleIds>],
            &ProjectConfig::default(),
        );
        assert_eq!(errors.len(), 1);
    }
}
