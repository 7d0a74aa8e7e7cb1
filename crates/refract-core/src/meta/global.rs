//! Process-wide meta registry
//!
//! Installed once behind a one-time initialisation barrier and never torn
//! down. Later installs are rejected and leave the first registry in place.

use once_cell::sync::OnceCell;

use super::registry::{MetaRegistry, MetaRegistryBuilder};
use crate::error::{ReflectError, ReflectResult};

static GLOBAL: OnceCell<MetaRegistry> = OnceCell::new();

/// Install `registry` as the process-wide registry.
///
/// Fails with `AlreadyInstalled` if a registry is already installed.
pub fn install_global(registry: MetaRegistry) -> ReflectResult<()> {
    let types = registry.len();
    GLOBAL.set(registry).map_err(|_| {
        tracing::warn!("Global meta registry already installed");
        ReflectError::AlreadyInstalled
    })?;
    tracing::debug!(types, "Installed global meta registry");
    Ok(())
}

/// Build and install the process-wide registry on first call.
///
/// Concurrent and repeated calls run `populate` at most once; every caller
/// gets the installed registry back.
pub fn init_global<F>(populate: F) -> ReflectResult<&'static MetaRegistry>
where
    F: FnOnce(&mut MetaRegistryBuilder) -> ReflectResult<()>,
{
    GLOBAL.get_or_try_init(|| {
        let mut builder = MetaRegistryBuilder::new();
        populate(&mut builder)?;
        let registry = builder.build()?;
        tracing::debug!(types = registry.len(), "Initialised global meta registry");
        Ok(registry)
    })
}

/// The process-wide registry, if installed
pub fn try_global() -> Option<&'static MetaRegistry> {
    GLOBAL.get()
}

/// The process-wide registry, or an empty one if none was installed
pub fn global() -> MetaRegistry {
    GLOBAL.get().cloned().unwrap_or_else(MetaRegistry::empty)
}
