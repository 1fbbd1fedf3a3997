// ─── Renderer Resolver ───

use tracing::{debug, warn};

use super::probe::GlesProbe;
use super::{builtin_renderer, PluginCatalog, Renderer, BUILTIN_RENDERERS};

/// GLES major version to request when the renderer doesn't set `LIBGL_ES`.
///
/// Any probe result below 3, including failure sentinels, maps to 2.
pub fn gles_version_for(renderer_id: &str, probe: &dyn GlesProbe) -> String {
    if probe.highest_es_version() < 3 {
        return "2".into();
    }
    if renderer_id.starts_with("opengles") {
        return renderer_id.replace("opengles", "").replace("_5", "");
    }
    "3".into()
}

/// Picks the active renderer out of built-ins and installed plugins.
pub struct RendererResolver<'a> {
    catalog: &'a PluginCatalog,
}

impl<'a> RendererResolver<'a> {
    pub fn new(catalog: &'a PluginCatalog) -> Self {
        Self { catalog }
    }

    /// Look up a renderer by id. Plugins shadow built-ins with the same id.
    pub fn find(&self, id: &str) -> Option<Renderer> {
        if let Some(plugin) = self.catalog.renderer(id) {
            return Some(Renderer::Plugin(plugin.clone()));
        }
        builtin_renderer(id).map(Renderer::Builtin)
    }

    /// Resolve the renderer for a launch.
    ///
    /// A valid `current` selection is kept. Otherwise the version override
    /// applies when non-empty, else the global default. Unknown ids fall back
    /// to the first built-in renderer.
    pub fn resolve(&self, current: Option<&str>, version_override: &str, global_default: &str) -> Renderer {
        if let Some(renderer) = current.and_then(|id| self.find(id)) {
            debug!("Keeping current renderer {}", renderer.id());
            return renderer;
        }

        let wanted = if version_override.trim().is_empty() {
            global_default
        } else {
            version_override.trim()
        };

        match self.find(wanted) {
            Some(renderer) => renderer,
            None => {
                let fallback = BUILTIN_RENDERERS[0];
                warn!(
                    "Renderer '{}' is not available, falling back to {}",
                    wanted, fallback.id
                );
                Renderer::Builtin(fallback)
            }
        }
    }
}
