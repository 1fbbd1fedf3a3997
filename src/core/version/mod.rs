pub mod descriptor;
pub mod manifest;

pub use descriptor::{VersionConfig, VersionDescriptor};
pub use manifest::{
    library_included, GameManifest, LibraryEntry, LibraryRule, ModLoader, OsRule, RuleAction,
    DEFAULT_JAVA_MAJOR,
};
