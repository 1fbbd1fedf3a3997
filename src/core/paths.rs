use std::path::{Path, PathBuf};

use crate::core::error::{LauncherError, LauncherResult};

const APP_DIR_NAME: &str = "LaunchOrchestrator";

/// Filesystem layout the orchestrator reads from.
///
/// Everything hangs off `data_dir` except `native_lib_dir`, which is where the
/// host application unpacked its bundled `.so` files.
#[derive(Debug, Clone)]
pub struct LauncherPaths {
    data_dir: PathBuf,
    native_lib_dir: PathBuf,
    cache_dir: PathBuf,
}

impl LauncherPaths {
    pub fn new(data_dir: impl Into<PathBuf>, native_lib_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let cache_dir = data_dir.join("cache");
        Self {
            data_dir,
            native_lib_dir: native_lib_dir.into(),
            cache_dir,
        }
    }

    /// Resolve the platform data directory and make sure it exists.
    pub fn from_default_dirs() -> LauncherResult<Self> {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME);
        let canonical_data = canonical_or_create_dir(&data_dir)?;
        let native_lib_dir = canonical_data.join("native");
        Ok(Self::new(canonical_data, native_lib_dir))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn native_lib_dir(&self) -> &Path {
        &self.native_lib_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.data_dir.join("libraries")
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.data_dir.join("versions")
    }

    /// Shared `.minecraft` equivalent used by non-isolated versions.
    pub fn game_root(&self) -> PathBuf {
        self.data_dir.join("game")
    }

    pub fn runtimes_dir(&self) -> PathBuf {
        self.data_dir.join("runtimes")
    }

    pub fn renderer_plugins_dir(&self) -> PathBuf {
        self.data_dir.join("plugins").join("renderer")
    }

    pub fn driver_plugins_dir(&self) -> PathBuf {
        self.data_dir.join("plugins").join("driver")
    }

    pub fn crash_reports_dir(&self) -> PathBuf {
        self.data_dir.join("crash_reports")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("launcher_settings.json")
    }
}

pub(crate) fn canonical_or_create_dir(path: &Path) -> LauncherResult<PathBuf> {
    std::fs::create_dir_all(path).map_err(|source| LauncherError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    std::fs::canonicalize(path).map_err(|source| LauncherError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted_at_data_dir() {
        let paths = LauncherPaths::new("/data/launcher", "/app/lib");
        assert_eq!(paths.libraries_dir(), PathBuf::from("/data/launcher/libraries"));
        assert_eq!(paths.versions_dir(), PathBuf::from("/data/launcher/versions"));
        assert_eq!(paths.cache_dir(), Path::new("/data/launcher/cache"));
        assert_eq!(paths.native_lib_dir(), Path::new("/app/lib"));
    }
}
