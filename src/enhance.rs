//! Module enhancement: remote schema stitching followed by module hooks.

use crate::config::ProjectConfig;
use crate::error::EnhanceError;
use crate::remote::build_remote_module;
use crate::types::ModuleConfig;

/// Enhance one module against the full module list.
///
/// A module declaring `remoteModule` is first replaced by its stitched form,
/// then its `enhance` hook runs on the result. The hook is consumed, so
/// enhancing the output again leaves it unchanged.
///
/// # Errors
///
/// Returns an error if the remote schema cannot be converted or the hook
/// fails.
pub fn enhance_module(
    module: ModuleConfig,
    modules: &[ModuleConfig],
    config: &ProjectConfig,
) -> Result<ModuleConfig, EnhanceError> {
    let mut module = if module.remote_module.is_some() {
        build_remote_module(module, modules, config)?
    } else {
        module
    };

    if let Some(enhancer) = module.enhance.take() {
        let id = module.id.clone();
        module = enhancer
            .enhance(module, modules)
            .map_err(|err| EnhanceError::Hook {
                module: id.clone(),
                message: err.to_string(),
            })?;
        module.enhance = None;
        tracing::debug!(module = %id, "ran enhance hook");
    }
    Ok(module)
}

/// Enhance every module. Modules without `remoteModule` or a hook pass
/// through unchanged.
///
/// # Errors
///
/// Returns the first enhancement failure.
pub fn enhance_modules(
    modules: Vec<ModuleConfig>,
    config: &ProjectConfig,
) -> Result<Vec<ModuleConfig>, EnhanceError> {
    let snapshot = modules.clone();
    let enhanced = modules
        .into_iter()
        .map(|module| enhance_module(module, &snapshot, config))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(modules = enhanced.len(), "enhanced modules");
    Ok(enhanced)
}
