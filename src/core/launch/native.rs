// ─── Native Bridge Sequencer ───
// Loads native libraries in the order the engine expects them.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use libloading::Library;
use serde::Serialize;
use tracing::{error, info};

use crate::core::error::LauncherResult;
use crate::core::renderer::Renderer;

use super::classpath::safe_path_str;
use super::env::{library_search_path, EnvMap};

const AUDIO_LIBRARY: &str = "libopenal.so";

/// Process-wide `dlopen`.
pub trait NativeLoader: Send + Sync {
    /// `Err` carries the loader's reason; callers log it.
    fn dlopen(&self, path: &str) -> LauncherResult<()>;
}

/// `NativeLoader` backed by `libloading`. Loaded libraries stay open for the
/// lifetime of the loader.
#[derive(Default)]
pub struct LibloadingLoader {
    libs: Mutex<Vec<Library>>,
}

impl LibloadingLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NativeLoader for LibloadingLoader {
    fn dlopen(&self, path: &str) -> LauncherResult<()> {
        // SAFETY: only libraries shipped for the native engine are loaded here.
        let lib = unsafe { Library::new(path) }?;
        match self.libs.lock() {
            Ok(mut libs) => libs.push(lib),
            // A poisoned list still owns the earlier handles; keep this one open too.
            Err(poisoned) => poisoned.into_inner().push(lib),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStage {
    Audio,
    RendererDependency,
    Renderer,
    RendererFallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadAttempt {
    pub stage: LoadStage,
    pub path: String,
    pub loaded: bool,
    pub error: Option<String>,
}

/// Every `dlopen` attempted for one launch, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BridgeReport {
    pub attempts: Vec<LoadAttempt>,
}

impl BridgeReport {
    pub fn renderer_loaded(&self) -> bool {
        self.attempts.iter().any(|attempt| {
            matches!(attempt.stage, LoadStage::Renderer | LoadStage::RendererFallback)
                && attempt.loaded
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &LoadAttempt> {
        self.attempts.iter().filter(|attempt| !attempt.loaded)
    }
}

pub struct NativeBridgeSequencer<'a> {
    loader: &'a dyn NativeLoader,
    report: BridgeReport,
}

impl<'a> NativeBridgeSequencer<'a> {
    pub fn new(loader: &'a dyn NativeLoader) -> Self {
        Self {
            loader,
            report: BridgeReport::default(),
        }
    }

    /// Audio core, then the renderer's extra libraries, then the renderer.
    /// Failures are logged and never stop the sequence.
    pub fn run(mut self, native_dir: &Path, renderer: Option<&Renderer>, env: &EnvMap) -> BridgeReport {
        info!("==== DLOPEN Engine ====");
        let audio = native_dir.join(AUDIO_LIBRARY);
        self.attempt(LoadStage::Audio, &safe_path_str(&audio));

        let Some(renderer) = renderer else {
            return self.report;
        };

        info!("==== DLOPEN Renderer ====");
        for lib in renderer.preload_libraries() {
            self.attempt(LoadStage::RendererDependency, &safe_path_str(&lib));
        }

        let library = renderer.library();
        if !self.attempt(LoadStage::Renderer, &library) {
            let fallback = find_in_library_path(&library, &library_search_path(env));
            if !self.attempt(LoadStage::RendererFallback, &safe_path_str(&fallback)) {
                error!("Failed to load renderer {}", library);
            }
        }

        self.report
    }

    fn attempt(&mut self, stage: LoadStage, path: &str) -> bool {
        let error = match self.loader.dlopen(path) {
            Ok(()) => {
                info!("dlopen {} ok", path);
                None
            }
            Err(err) => {
                error!("dlopen {} failed ({:?}): {}", path, stage, err);
                Some(err.to_string())
            }
        };
        let loaded = error.is_none();
        self.report.attempts.push(LoadAttempt {
            stage,
            path: path.to_string(),
            loaded,
            error,
        });
        loaded
    }
}

/// First directory in `search_path` holding the library's file name, or the
/// bare file name when none does.
pub fn find_in_library_path(library: &str, search_path: &[PathBuf]) -> PathBuf {
    let file_name = Path::new(library)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(library));

    search_path
        .iter()
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
        .unwrap_or(file_name)
}
