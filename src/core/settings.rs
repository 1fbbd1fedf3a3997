use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

/// Smallest heap the game is ever started with, in MiB.
pub const MIN_RAM_ALLOCATION_MB: u32 = 256;

const DEFAULT_RAM_CEILING_MB: u32 = 4096;

/// Launcher-wide settings consumed by the orchestrator.
///
/// Per-version values in [`crate::core::version::VersionConfig`] take
/// precedence whenever they are non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct GlobalSettings {
    /// Runtime name under `runtimes/`.
    pub java_runtime: String,
    pub auto_pick_java_runtime: bool,
    /// `None` means "derive from device memory".
    pub ram_allocation: Option<u32>,
    pub jvm_args: String,
    pub renderer: String,
    pub vulkan_driver: String,
    pub force_vsync: bool,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            java_runtime: "jre-8".into(),
            auto_pick_java_runtime: true,
            ram_allocation: None,
            jvm_args: String::new(),
            renderer: "opengles3".into(),
            vulkan_driver: "default".into(),
            force_vsync: false,
        }
    }
}

impl GlobalSettings {
    /// Load settings from disk, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(err) => {
                if path.exists() {
                    warn!("Ignoring unreadable settings at {:?}: {}", path, err);
                } else {
                    debug!("No settings at {:?}, using defaults", path);
                }
                Self::default()
            }
        }
    }

    pub fn load(path: &Path) -> LauncherResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| LauncherError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Effective global heap size in MiB.
    pub fn effective_ram_allocation(&self) -> u32 {
        self.ram_allocation
            .filter(|mb| *mb >= MIN_RAM_ALLOCATION_MB)
            .unwrap_or_else(device_default_ram_allocation)
    }
}

/// A quarter of physical memory, rounded down to 256 MiB steps and clamped to
/// `[MIN_RAM_ALLOCATION_MB, DEFAULT_RAM_CEILING_MB]`.
pub fn device_default_ram_allocation() -> u32 {
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    ram_allocation_for_total(system.total_memory() / (1024 * 1024))
}

fn ram_allocation_for_total(total_mb: u64) -> u32 {
    let quarter = (total_mb / 4) as u32;
    let stepped = quarter - quarter % MIN_RAM_ALLOCATION_MB;
    stepped.clamp(MIN_RAM_ALLOCATION_MB, DEFAULT_RAM_CEILING_MB)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ram_allocation_rounds_and_clamps() {
        assert_eq!(ram_allocation_for_total(0), 256);
        assert_eq!(ram_allocation_for_total(3 * 1024), 768);
        assert_eq!(ram_allocation_for_total(8 * 1024), 2048);
        assert_eq!(ram_allocation_for_total(64 * 1024), 4096);
    }

    #[test]
    fn explicit_ram_below_minimum_is_ignored() {
        let settings = GlobalSettings {
            ram_allocation: Some(128),
            ..GlobalSettings::default()
        };
        assert!(settings.effective_ram_allocation() >= MIN_RAM_ALLOCATION_MB);

        let settings = GlobalSettings {
            ram_allocation: Some(3072),
            ..GlobalSettings::default()
        };
        assert_eq!(settings.effective_ram_allocation(), 3072);
    }

    #[test]
    fn settings_load_from_disk_and_fill_missing_fields() {
        let temp = std::env::temp_dir().join(format!("settings-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&temp);
        let path = temp.join("launcher_settings.json");

        assert_eq!(GlobalSettings::load_or_default(&path), GlobalSettings::default());

        std::fs::create_dir_all(&temp).unwrap();
        std::fs::write(&path, r#"{"javaRuntime":"jre-21","autoPickJavaRuntime":false}"#).unwrap();
        let loaded = GlobalSettings::load_or_default(&path);
        assert_eq!(loaded.java_runtime, "jre-21");
        assert!(!loaded.auto_pick_java_runtime);
        assert_eq!(loaded.renderer, "opengles3");

        assert_eq!(GlobalSettings::load(&path).unwrap(), loaded);

        let _ = std::fs::remove_dir_all(&temp);
    }
}
