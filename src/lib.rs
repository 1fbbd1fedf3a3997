pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::auth::{Account, AccountMode};
pub use crate::core::error::{LauncherError, LauncherResult};
pub use crate::core::launch::{
    LaunchHandle, LaunchRequest, LaunchState, LaunchTarget, Orchestrator, ProcessEngine, ProcessOutcome,
};
pub use crate::core::paths::LauncherPaths;
pub use crate::core::settings::GlobalSettings;
pub use crate::core::version::VersionDescriptor;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,launch_orchestrator=debug")),
        )
        .try_init();
}
