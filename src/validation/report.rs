//! Aggregated validation results, grouped per module for reporting.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::PackageError;
use crate::types::ModuleConfig;

/// Status of a validated module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Ok,
    Error,
}

/// Result for a single module.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    pub module: String,
    pub status: ValidationStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<PackageError>,
}

/// Result of validating a module set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub modules_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub results: Vec<ModuleReport>,
    /// Errors not attributable to a single module (e.g. missing modules).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub project_errors: Vec<PackageError>,
}

impl ValidationReport {
    /// Group `errors` under the modules they belong to, keeping module order.
    pub fn new(modules: &[ModuleConfig], errors: Vec<PackageError>) -> Self {
        let mut grouped: IndexMap<String, Vec<PackageError>> = modules
            .iter()
            .map(|module| (module.id.clone(), Vec::new()))
            .collect();
        let mut project_errors = Vec::new();
        let total = errors.len();

        for error in errors {
            match error.module.as_ref().and_then(|id| grouped.get_mut(id)) {
                Some(bucket) => bucket.push(error),
                None => project_errors.push(error),
            }
        }

        let results: Vec<ModuleReport> = grouped
            .into_iter()
            .map(|(module, errors)| ModuleReport {
                module,
                status: if errors.is_empty() {
                    ValidationStatus::Ok
                } else {
                    ValidationStatus::Error
                },
                errors,
            })
            .collect();

        let failed = results
            .iter()
            .filter(|r| r.status == ValidationStatus::Error)
            .count();

        Self {
            modules_checked: results.len(),
            passed: results.len() - failed,
            failed,
            errors: total,
            results,
            project_errors,
        }
    }

    /// Returns true if no errors were found.
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }

    /// Every error, module errors first.
    pub fn all_errors(&self) -> impl Iterator<Item = &PackageError> {
        self.results
            .iter()
            .flat_map(|r| r.errors.iter())
            .chain(self.project_errors.iter())
    }
}
