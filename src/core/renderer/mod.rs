// ─── Renderers ───
// Built-in and plugin renderers behind one closed enum.

pub mod plugin;
pub mod probe;
pub mod resolver;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use plugin::{DriverPlugin, PluginCatalog, RendererPlugin};
pub use probe::{GlesProbe, LibEglProbe, StaticProbe};
pub use resolver::RendererResolver;

/// A renderer compiled into the host application.
#[derive(Debug, PartialEq, Eq)]
pub struct BuiltinRenderer {
    pub id: &'static str,
    pub unique_id: &'static str,
    pub name: &'static str,
    pub library: &'static str,
    pub max_mc_version: Option<&'static str>,
    pub env: &'static [(&'static str, &'static str)],
    pub egl_name: Option<&'static str>,
}

pub static GL4ES: BuiltinRenderer = BuiltinRenderer {
    id: "opengles3",
    unique_id: "8b52d82d-8f6d-4d3a-a767-dc93f8b72fc7",
    name: "GL4ES-115-extra",
    library: "libgl4es_114.so",
    max_mc_version: Some("1.21.4"),
    env: &[],
    egl_name: None,
};

pub static VIRGL: BuiltinRenderer = BuiltinRenderer {
    id: "gallium_virgl",
    unique_id: "5cf2b7d3-0f0e-4a5c-9c6d-8a7b0a0f7e21",
    name: "VirGLRenderer",
    library: "libOSMesa_81.so",
    max_mc_version: None,
    env: &[
        ("GALLIUM_DRIVER", "virpipe"),
        ("MESA_GL_VERSION_OVERRIDE", "4.3"),
        ("MESA_GLSL_VERSION_OVERRIDE", "430"),
        ("OSMESA_NO_FLUSH_FRONTBUFFER", "1"),
        ("VTEST_SOCKET_NAME", "vtest.sock"),
    ],
    egl_name: None,
};

pub static ZINK: BuiltinRenderer = BuiltinRenderer {
    id: "vulkan_zink",
    unique_id: "0fd3c4b7-3c38-4b5f-a2b1-6f0c1b4d9e8a",
    name: "Vulkan Zink",
    library: "libOSMesa_8.so",
    max_mc_version: None,
    env: &[
        ("GALLIUM_DRIVER", "zink"),
        ("MESA_GL_VERSION_OVERRIDE", "4.6"),
        ("MESA_GLSL_VERSION_OVERRIDE", "460"),
    ],
    egl_name: None,
};

pub static FREEDRENO: BuiltinRenderer = BuiltinRenderer {
    id: "gallium_freedreno",
    unique_id: "c2a51d8e-7d1e-4b11-9a2e-2b6d0e6f4a73",
    name: "Freedreno (Adreno)",
    library: "libOSMesa_8.so",
    max_mc_version: None,
    env: &[
        ("GALLIUM_DRIVER", "freedreno"),
        ("MESA_LOADER_DRIVER_OVERRIDE", "kgsl"),
        ("MESA_GL_VERSION_OVERRIDE", "4.6"),
        ("MESA_GLSL_VERSION_OVERRIDE", "460"),
    ],
    egl_name: None,
};

/// Built-in renderers in presentation order; the first is the fallback.
pub static BUILTIN_RENDERERS: [&BuiltinRenderer; 4] = [&GL4ES, &VIRGL, &ZINK, &FREEDRENO];

pub fn builtin_renderer(id: &str) -> Option<&'static BuiltinRenderer> {
    BUILTIN_RENDERERS.iter().copied().find(|r| r.id == id)
}

/// The renderer chosen for one launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Renderer {
    Builtin(&'static BuiltinRenderer),
    Plugin(RendererPlugin),
}

impl Renderer {
    pub fn id(&self) -> &str {
        match self {
            Renderer::Builtin(r) => r.id,
            Renderer::Plugin(p) => &p.id,
        }
    }

    pub fn unique_id(&self) -> &str {
        match self {
            Renderer::Builtin(r) => r.unique_id,
            Renderer::Plugin(p) if !p.unique_id.is_empty() => &p.unique_id,
            Renderer::Plugin(p) => &p.id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Renderer::Builtin(r) => r.name,
            Renderer::Plugin(p) => &p.display_name,
        }
    }

    pub fn summary(&self) -> Option<&str> {
        match self {
            Renderer::Builtin(_) => None,
            Renderer::Plugin(p) => p.summary.as_deref(),
        }
    }

    pub fn plugin(&self) -> Option<&RendererPlugin> {
        match self {
            Renderer::Builtin(_) => None,
            Renderer::Plugin(p) => Some(p),
        }
    }

    pub fn is_plugin(&self) -> bool {
        self.plugin().is_some()
    }

    /// Library handed to LWJGL and dlopen. Built-ins are bare file names
    /// resolved through the library search path; plugins are absolute.
    pub fn library(&self) -> String {
        match self {
            Renderer::Builtin(r) => r.library.to_string(),
            Renderer::Plugin(p) => p.library_path().to_string_lossy().to_string(),
        }
    }

    pub fn env(&self) -> BTreeMap<String, String> {
        match self {
            Renderer::Builtin(r) => r
                .env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            Renderer::Plugin(p) => p.env.clone(),
        }
    }

    pub fn egl_name(&self) -> Option<&str> {
        match self {
            Renderer::Builtin(r) => r.egl_name,
            Renderer::Plugin(p) => p.egl_name.as_deref(),
        }
    }

    /// Extra libraries to load before the primary one, as absolute paths.
    pub fn preload_libraries(&self) -> Vec<PathBuf> {
        match self {
            Renderer::Builtin(_) => Vec::new(),
            Renderer::Plugin(p) => p.dlopen.iter().map(|lib| p.path.join(lib)).collect(),
        }
    }

    pub fn descriptor(&self) -> RendererDescriptor {
        RendererDescriptor {
            id: self.id().to_string(),
            unique_id: self.unique_id().to_string(),
            name: self.display_name().to_string(),
            library: self.library(),
            plugin_path: self.plugin().map(|p| p.path.clone()),
            env: self.env(),
            egl_name: self.egl_name().map(str::to_string),
        }
    }
}

/// Uniform, owned view of a renderer, kept for logs and crash reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererDescriptor {
    pub id: String,
    pub unique_id: String,
    pub name: String,
    pub library: String,
    pub plugin_path: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    pub egl_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_ids_are_unique() {
        for (i, a) in BUILTIN_RENDERERS.iter().enumerate() {
            for b in BUILTIN_RENDERERS.iter().skip(i + 1) {
                assert_ne!(a.id, b.id);
                assert_ne!(a.unique_id, b.unique_id);
            }
        }
        assert_eq!(builtin_renderer("vulkan_zink"), Some(&ZINK));
        assert_eq!(builtin_renderer("nope"), None);
    }

    #[test]
    fn plugin_renderer_exposes_absolute_paths() {
        let plugin = RendererPlugin {
            id: "mobileglues".into(),
            unique_id: String::new(),
            display_name: "MobileGlues".into(),
            summary: None,
            path: PathBuf::from("/plugins/mg"),
            gl_name: "libmobileglues.so".into(),
            egl_name: Some("libEGL_mg.so".into()),
            env: BTreeMap::from([("MG".to_string(), "1".to_string())]),
            dlopen: vec!["liba.so".into(), "libb.so".into()],
        };
        let renderer = Renderer::Plugin(plugin);

        assert_eq!(renderer.library(), "/plugins/mg/libmobileglues.so");
        assert_eq!(renderer.unique_id(), "mobileglues");
        assert_eq!(
            renderer.preload_libraries(),
            vec![
                PathBuf::from("/plugins/mg/liba.so"),
                PathBuf::from("/plugins/mg/libb.so")
            ]
        );
        let descriptor = renderer.descriptor();
        assert_eq!(descriptor.plugin_path, Some(PathBuf::from("/plugins/mg")));
        assert_eq!(descriptor.egl_name.as_deref(), Some("libEGL_mg.so"));
    }
}
