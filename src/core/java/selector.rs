// ─── Runtime Selector ───
// Picks the Java runtime a launch will run on.

use tracing::{info, instrument, warn};

use super::runtime::{Runtime, RuntimeRegistry};
use crate::core::error::{LauncherError, LauncherResult};

/// Inputs to runtime selection for one launch.
#[derive(Debug, Clone)]
pub struct RuntimeRequest<'a> {
    /// Major version the manifest asks for.
    pub target_major: u32,
    /// Runtime pinned by the version config; empty when unset.
    pub version_override: &'a str,
    /// Globally configured runtime name.
    pub global_runtime: &'a str,
    pub auto_pick: bool,
}

/// Resolve the runtime for a launch.
///
/// A per-version override is taken as-is. Otherwise the global runtime is
/// used, unless auto-pick is on and it is unresolvable or too old, in which
/// case the nearest installed runtime at or above the target replaces it.
#[instrument(skip(registry), fields(target = request.target_major))]
pub async fn select_runtime(
    registry: &dyn RuntimeRegistry,
    request: &RuntimeRequest<'_>,
) -> LauncherResult<Runtime> {
    let pinned = request.version_override.trim();
    if !pinned.is_empty() {
        info!("Using version-pinned runtime {}", pinned);
        return registry.load(pinned).await;
    }

    let global = registry.load(request.global_runtime).await?;
    let too_old = global.java_version == 0 || global.java_version < request.target_major;
    if !request.auto_pick || !too_old {
        return Ok(global);
    }

    let installed = registry.installed().await?;
    match nearest_runtime(&installed, request.target_major) {
        Some(runtime) => {
            info!(
                "Auto-picked runtime {} (Java {}) for target {} instead of {}",
                runtime.name, runtime.java_version, request.target_major, global.name
            );
            Ok(runtime.clone())
        }
        None => {
            warn!(
                "No installed runtime satisfies Java {} ({} candidates)",
                request.target_major,
                installed.len()
            );
            Err(LauncherError::RuntimeNotFound {
                target: request.target_major,
            })
        }
    }
}

/// The compatible runtime with the smallest major version `>= target`.
/// Ties resolve to the first in registry order.
pub fn nearest_runtime(installed: &[Runtime], target: u32) -> Option<&Runtime> {
    installed
        .iter()
        .filter(|runtime| runtime.is_arch_compatible && runtime.java_version >= target)
        .min_by_key(|runtime| runtime.java_version)
}
