// ─── Environment Assembler ───
// Builds the environment the native process starts with.
//
// Everything here is a pure function of its inputs: the same inputs always
// give the same map, and later writes replace earlier ones.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::core::java::Runtime;
use crate::core::renderer::probe::GlesProbe;
use crate::core::renderer::resolver::gles_version_for;
use crate::core::renderer::{DriverPlugin, Renderer};
use crate::core::version::ModLoader;

use super::classpath::safe_path_str;

pub type EnvMap = BTreeMap<String, String>;

/// Host application build metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub version_code: u32,
    pub version_name: String,
    pub launcher_name: String,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            version_code: 1,
            version_name: env!("CARGO_PKG_VERSION").to_string(),
            launcher_name: "LaunchOrchestrator".to_string(),
        }
    }
}

/// Inputs to `assemble_environment`.
#[derive(Clone, Copy)]
pub struct EnvInputs<'a> {
    pub runtime: &'a Runtime,
    pub renderer: Option<&'a Renderer>,
    pub driver: &'a DriverPlugin,
    pub loader: Option<ModLoader>,
    pub build: &'a BuildInfo,
    pub native_dir: &'a Path,
    /// File names present in `native_dir`.
    pub native_libs: &'a [String],
    pub cache_dir: &'a Path,
    pub home_dir: &'a Path,
    pub force_vsync: bool,
    /// Socket name of the touch-controller proxy when it is running.
    pub touch_proxy_socket: Option<&'a str>,
    pub probe: &'a dyn GlesProbe,
}

pub fn assemble_environment(inputs: &EnvInputs<'_>) -> EnvMap {
    let mut env = base_environment(inputs);

    env.insert("DRIVER_PATH".into(), safe_path_str(&inputs.driver.path));

    if let Some(jsp) = jsp_library(inputs.runtime.java_version, inputs.native_dir, inputs.native_libs) {
        env.insert("JSP".into(), safe_path_str(&jsp));
    }

    if let Some(loader) = inputs.loader {
        env.insert(loader.env_key().into(), "1".into());
    }

    if let Some(renderer) = inputs.renderer {
        apply_renderer_env(&mut env, renderer, inputs.cache_dir, inputs.probe);
    }

    if let Some(socket) = inputs.touch_proxy_socket {
        env.insert("TOUCH_CONTROLLER_PROXY_SOCKET".into(), socket.to_string());
    }

    env.insert(
        "ZALITH_VERSION_CODE".into(),
        inputs.build.version_code.to_string(),
    );

    debug!("Assembled {} environment variables", env.len());
    env
}

fn base_environment(inputs: &EnvInputs<'_>) -> EnvMap {
    let mut env = EnvMap::new();
    env.insert("JAVA_HOME".into(), safe_path_str(&inputs.runtime.home));
    env.insert("HOME".into(), safe_path_str(inputs.home_dir));
    env.insert("TMPDIR".into(), safe_path_str(inputs.cache_dir));
    env.insert("POJAV_NATIVEDIR".into(), safe_path_str(inputs.native_dir));
    env.insert("FORCE_VSYNC".into(), inputs.force_vsync.to_string());

    let mut library_dirs = inputs.runtime.library_dirs();
    library_dirs.push(inputs.native_dir.to_path_buf());
    env.insert("LD_LIBRARY_PATH".into(), join_library_path(&library_dirs));
    env
}

fn join_library_path(dirs: &[PathBuf]) -> String {
    dirs.iter()
        .map(|dir| safe_path_str(dir))
        .collect::<Vec<_>>()
        .join(":")
}

/// JSP helper library for the runtime's major version, if it is shipped.
pub fn jsp_library(java_major: u32, native_dir: &Path, native_libs: &[String]) -> Option<PathBuf> {
    let stem = match java_major {
        0..=10 => return None,
        11..=20 => "libjsph17",
        _ => "libjsph21",
    };
    native_libs
        .iter()
        .any(|name| name.starts_with(stem))
        .then(|| native_dir.join(format!("{stem}.so")))
}

fn apply_renderer_env(env: &mut EnvMap, renderer: &Renderer, cache_dir: &Path, probe: &dyn GlesProbe) {
    let id = renderer.id();

    if id.starts_with("opengles3") {
        for (key, value) in [
            ("LIBGL_ES", "3"),
            ("LIBGL_GLES", "libGLESv3.so"),
            ("LIBGL_MIPMAP", "3"),
            ("LIBGL_NOERROR", "1"),
            ("LIBGL_NOINTOVLHACK", "1"),
            ("LIBGL_NORMALIZE", "1"),
        ] {
            env.insert(key.into(), value.into());
        }
    }

    env.extend(renderer.env());

    if let Some(egl) = renderer.egl_name() {
        env.insert("POJAVEXEC_EGL".into(), egl.to_string());
    }
    env.insert("POJAV_RENDERER".into(), id.to_string());
    env.insert("TAG_RENDERER".into(), id.to_string());

    if renderer.is_plugin() {
        return;
    }

    if !id.starts_with("opengles") {
        env.insert("MESA_LOADER_DRIVER_OVERRIDE".into(), "zink".into());
        env.insert("MESA_GLSL_CACHE_DIR".into(), safe_path_str(cache_dir));
        env.insert("force_glsl_extensions_warn".into(), "true".into());
        env.insert("allow_higher_compat_version".into(), "true".into());
        env.insert("allow_glsl_extension_directive_midshader".into(), "true".into());
        env.insert("LIB_MESA_NAME".into(), renderer.library());
    }

    if !env.contains_key("LIBGL_ES") {
        let version = gles_version_for(id, probe);
        info!("GLES version detected for {}: {}", id, version);
        env.insert("LIBGL_ES".into(), version);
    }
}

/// `LD_LIBRARY_PATH` entries of an assembled environment.
pub fn library_search_path(env: &EnvMap) -> Vec<PathBuf> {
    env.get("LD_LIBRARY_PATH")
        .map(|value| {
            value
                .split(':')
                .filter(|entry| !entry.is_empty())
                .map(PathBuf::from)
                .collect()
        })
        .unwrap_or_default()
}
