// ─── Renderer & Driver Plugins ───
// Externally installed units that ship their own native libraries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

const PLUGIN_MANIFEST: &str = "plugin.json";

/// Identifier of the driver bundled with the host application.
pub const DEFAULT_DRIVER_ID: &str = "default";

/// A renderer supplied by an installed plugin.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererPlugin {
    pub id: String,
    #[serde(default)]
    pub unique_id: String,
    pub display_name: String,
    #[serde(default)]
    pub summary: Option<String>,
    /// Install directory; filled in from the location of `plugin.json`.
    #[serde(skip)]
    pub path: PathBuf,
    /// Primary GL library file name inside `path`.
    pub gl_name: String,
    #[serde(default)]
    pub egl_name: Option<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Libraries to dlopen from `path` before the primary library, in order.
    #[serde(default)]
    pub dlopen: Vec<String>,
}

impl RendererPlugin {
    pub fn library_path(&self) -> PathBuf {
        self.path.join(&self.gl_name)
    }
}

/// A Vulkan driver supplied by an installed plugin (or bundled).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverPlugin {
    pub id: String,
    pub name: String,
    #[serde(skip)]
    pub path: PathBuf,
}

/// Snapshot of installed renderer and driver plugins.
#[derive(Debug, Clone)]
pub struct PluginCatalog {
    renderers: Vec<RendererPlugin>,
    drivers: Vec<DriverPlugin>,
    default_driver: DriverPlugin,
}

impl PluginCatalog {
    /// A catalog with only the bundled driver, which lives in the native dir.
    pub fn bundled(native_lib_dir: &Path) -> Self {
        Self {
            renderers: Vec::new(),
            drivers: Vec::new(),
            default_driver: DriverPlugin {
                id: DEFAULT_DRIVER_ID.into(),
                name: "Turnip".into(),
                path: native_lib_dir.to_path_buf(),
            },
        }
    }

    #[cfg(test)]
    pub(crate) fn with_renderer(mut self, plugin: RendererPlugin) -> Self {
        self.renderers.push(plugin);
        self
    }

    /// Scan `<dir>/<plugin>/plugin.json` for both plugin kinds. Broken plugins
    /// are skipped with a warning.
    pub fn scan(native_lib_dir: &Path, renderer_dir: &Path, driver_dir: &Path) -> Self {
        let mut catalog = Self::bundled(native_lib_dir);
        for (path, mut plugin) in scan_manifests::<RendererPlugin>(renderer_dir) {
            plugin.path = path;
            catalog.renderers.push(plugin);
        }
        for (path, mut plugin) in scan_manifests::<DriverPlugin>(driver_dir) {
            plugin.path = path;
            catalog.drivers.push(plugin);
        }
        debug!(
            "Plugin catalog: {} renderer(s), {} driver(s)",
            catalog.renderers.len(),
            catalog.drivers.len()
        );
        catalog
    }

    pub fn renderers(&self) -> &[RendererPlugin] {
        &self.renderers
    }

    pub fn renderer(&self, id: &str) -> Option<&RendererPlugin> {
        self.renderers.iter().find(|p| p.id == id)
    }

    /// Driver by id, falling back to the bundled one.
    pub fn driver(&self, id: &str) -> &DriverPlugin {
        match self.drivers.iter().find(|d| d.id == id) {
            Some(driver) => driver,
            None => {
                if id != DEFAULT_DRIVER_ID {
                    warn!("Driver '{}' is not installed, using bundled driver", id);
                }
                &self.default_driver
            }
        }
    }
}

fn scan_manifests<T: serde::de::DeserializeOwned>(dir: &Path) -> Vec<(PathBuf, T)> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();

    dirs.into_iter()
        .filter_map(|plugin_dir| {
            let manifest = plugin_dir.join(PLUGIN_MANIFEST);
            let raw = std::fs::read_to_string(&manifest).ok()?;
            match serde_json::from_str::<T>(&raw) {
                Ok(parsed) => Some((plugin_dir, parsed)),
                Err(err) => {
                    warn!("Skipping plugin {:?}: {}", manifest, err);
                    None
                }
            }
        })
        .collect()
}
