pub mod args;
pub mod classpath;
pub mod crash;
pub mod engine;
pub mod env;
pub mod lifecycle;
pub mod native;
pub mod orchestrator;
#[cfg(unix)]
pub mod touch_proxy;

pub use classpath::{build_classpath, ClasspathRequest};
pub use crash::{CrashReport, CrashReporter, FileCrashReporter};
pub use engine::{LaunchSpec, NativeEngine, ProcessEngine};
pub use env::{assemble_environment, BuildInfo, EnvMap};
pub use lifecycle::{
    ExitSink, LaunchFacts, LaunchState, LogNotifier, PeripheralProxy, ProcessOutcome, UserNotifier,
};
pub use native::{LibloadingLoader, NativeBridgeSequencer, NativeLoader};
pub use orchestrator::{LaunchHandle, LaunchRequest, LaunchTarget, Orchestrator, OrchestratorBuilder};
