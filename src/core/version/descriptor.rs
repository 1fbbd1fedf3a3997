use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::manifest::GameManifest;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::settings::{GlobalSettings, MIN_RAM_ALLOCATION_MB};

const VERSION_CONFIG_FILE: &str = "version_config.json";

/// Shortest vibration pulse the touch proxy accepts, in milliseconds.
pub const MIN_TOUCH_VIBRATE_MS: u32 = 80;

/// Per-version overrides edited by the version settings screen.
///
/// Empty strings and zero values mean "use the global setting".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct VersionConfig {
    pub isolation: bool,
    pub jvm_args: String,
    pub java_runtime: String,
    pub renderer: String,
    pub driver: String,
    pub ram_allocation: u32,
    pub server_ip: String,
    pub enable_touch_proxy: bool,
    pub touch_vibrate_duration: u32,
    pub offline_account_login: bool,
}

impl VersionConfig {
    pub fn load_or_default(version_dir: &Path) -> Self {
        let path = version_dir.join(VERSION_CONFIG_FILE);
        let Ok(raw) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        match serde_json::from_str(&raw) {
            Ok(config) => config,
            Err(err) => {
                warn!("Ignoring malformed {:?}: {}", path, err);
                Self::default()
            }
        }
    }
}

/// An installed game version as seen by the orchestrator.
#[derive(Debug, Clone)]
pub struct VersionDescriptor {
    name: String,
    version_dir: PathBuf,
    config: VersionConfig,
    manifest: Option<GameManifest>,
}

impl VersionDescriptor {
    pub fn new(
        name: impl Into<String>,
        version_dir: impl Into<PathBuf>,
        config: VersionConfig,
        manifest: Option<GameManifest>,
    ) -> Self {
        Self {
            name: name.into(),
            version_dir: version_dir.into(),
            config,
            manifest,
        }
    }

    /// Read `<versions>/<name>/<name>.json` and its config.
    ///
    /// A missing or unparsable manifest produces an invalid descriptor rather
    /// than an error, matching how the version list shows broken entries.
    pub fn load(versions_dir: &Path, name: &str) -> LauncherResult<Self> {
        let version_dir = versions_dir.join(name);
        if !version_dir.is_dir() {
            return Err(LauncherError::VersionNotFound(name.to_string()));
        }

        let manifest_path = version_dir.join(format!("{name}.json"));
        let manifest = match GameManifest::load(&manifest_path) {
            Ok(manifest) => Some(manifest),
            Err(err) => {
                warn!("Version {} has no usable manifest: {}", name, err);
                None
            }
        };
        let config = VersionConfig::load_or_default(&version_dir);
        debug!("Loaded version {} (valid={})", name, manifest.is_some());

        Ok(Self::new(name, version_dir, config, manifest))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version_dir(&self) -> &Path {
        &self.version_dir
    }

    pub fn config(&self) -> &VersionConfig {
        &self.config
    }

    pub fn is_valid(&self) -> bool {
        self.manifest.is_some()
    }

    pub fn manifest(&self) -> LauncherResult<&GameManifest> {
        self.manifest
            .as_ref()
            .ok_or_else(|| LauncherError::InvalidManifest {
                name: self.name.clone(),
                reason: "manifest missing or unreadable".into(),
            })
    }

    pub fn client_jar(&self) -> PathBuf {
        self.version_dir.join(format!("{}.jar", self.name))
    }

    pub fn is_isolated(&self) -> bool {
        self.config.isolation
    }

    /// Isolated versions run inside their own directory.
    pub fn game_dir(&self, game_root: &Path) -> PathBuf {
        if self.is_isolated() {
            self.version_dir.clone()
        } else {
            game_root.to_path_buf()
        }
    }

    pub fn renderer_override(&self) -> &str {
        self.config.renderer.trim()
    }

    pub fn runtime_override(&self) -> &str {
        self.config.java_runtime.trim()
    }

    pub fn driver(&self, settings: &GlobalSettings) -> String {
        non_empty_or(&self.config.driver, &settings.vulkan_driver)
    }

    pub fn jvm_args(&self, settings: &GlobalSettings) -> String {
        non_empty_or(&self.config.jvm_args, &settings.jvm_args)
    }

    pub fn ram_allocation(&self, settings: &GlobalSettings) -> u32 {
        if self.config.ram_allocation >= MIN_RAM_ALLOCATION_MB {
            self.config.ram_allocation
        } else {
            settings.effective_ram_allocation()
        }
    }

    pub fn server_ip(&self) -> Option<&str> {
        Some(self.config.server_ip.trim()).filter(|ip| !ip.is_empty())
    }

    pub fn touch_proxy_enabled(&self) -> bool {
        self.config.enable_touch_proxy
    }

    pub fn touch_vibrate_duration(&self) -> Option<u32> {
        Some(self.config.touch_vibrate_duration).filter(|ms| *ms >= MIN_TOUCH_VIBRATE_MS)
    }

    pub fn offline_account_login(&self) -> bool {
        self.config.offline_account_login
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}
