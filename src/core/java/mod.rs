pub mod runtime;
pub mod selector;

pub use runtime::{platform, DirRuntimeRegistry, Runtime, RuntimeRegistry};
pub use selector::{nearest_runtime, select_runtime, RuntimeRequest};
