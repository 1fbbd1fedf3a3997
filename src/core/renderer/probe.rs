// ─── GLES Capability Probe ───
// Finds the highest OpenGL ES version the display advertises.

use std::ffi::{c_char, c_void, CStr};

use libloading::Library;
use tracing::{error, warn};

/// `EGL_RENDERABLE_TYPE` bits.
pub const EGL_OPENGL_ES_BIT: i32 = 0x0001;
pub const EGL_OPENGL_ES2_BIT: i32 = 0x0004;
pub const EGL_OPENGL_ES3_BIT_KHR: i32 = 0x0040;

/// Configs could not be fetched.
pub const PROBE_NO_CONFIGS: i32 = -1;
/// The config count query failed.
pub const PROBE_CONFIG_COUNT_FAILED: i32 = -2;
/// The display could not be initialized.
pub const PROBE_DISPLAY_INIT_FAILED: i32 = -3;

const ES3_EXTENSION: &str = "EGL_KHR_create_context";

/// Source of the highest supported GLES major version.
///
/// Returns 1..=3 on success, 0 when no config is ES-renderable, or one of the
/// negative `PROBE_*` sentinels.
pub trait GlesProbe: Send + Sync {
    fn highest_es_version(&self) -> i32;
}

/// Probe result known ahead of time.
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub i32);

impl GlesProbe for StaticProbe {
    fn highest_es_version(&self) -> i32 {
        self.0
    }
}

/// The handful of display operations the probe needs.
pub trait EglDisplay {
    fn initialize(&mut self) -> bool;
    fn extensions(&mut self) -> String;
    fn config_count(&mut self) -> Option<usize>;
    /// `EGL_RENDERABLE_TYPE` of each config; `None` entries are failed
    /// attribute reads. `None` overall means the configs could not be read.
    fn renderable_types(&mut self, count: usize) -> Option<Vec<Option<i32>>>;
    fn terminate(&mut self);
}

/// Whole-word match of `name` in a space-separated extension list.
pub fn has_extension(extensions: &str, name: &str) -> bool {
    extensions.split(' ').any(|ext| ext == name)
}

pub fn detect_gles_version(display: &mut dyn EglDisplay) -> i32 {
    if !display.initialize() {
        error!("Couldn't initialize EGL.");
        return PROBE_DISPLAY_INIT_FAILED;
    }

    let result = scan_configs(display);
    display.terminate();
    result
}

fn scan_configs(display: &mut dyn EglDisplay) -> i32 {
    let check_es3 = has_extension(&display.extensions(), ES3_EXTENSION);

    let Some(count) = display.config_count() else {
        error!("Getting number of EGL configs failed");
        return PROBE_CONFIG_COUNT_FAILED;
    };
    let Some(types) = display.renderable_types(count) else {
        error!("Getting EGL configs failed");
        return PROBE_NO_CONFIGS;
    };

    let mut highest = 0;
    for (index, renderable) in types.iter().enumerate() {
        let Some(value) = renderable else {
            warn!(
                "Getting EGL_RENDERABLE_TYPE failed for config {}/{}",
                index, count
            );
            continue;
        };
        let level = if check_es3 && value & EGL_OPENGL_ES3_BIT_KHR == EGL_OPENGL_ES3_BIT_KHR {
            3
        } else if value & EGL_OPENGL_ES2_BIT == EGL_OPENGL_ES2_BIT {
            2
        } else if value & EGL_OPENGL_ES_BIT == EGL_OPENGL_ES_BIT {
            1
        } else {
            0
        };
        highest = highest.max(level);
    }
    highest
}

/// Probe backed by the system `libEGL`, loaded on demand.
#[derive(Debug, Clone)]
pub struct LibEglProbe {
    library_names: Vec<String>,
}

impl Default for LibEglProbe {
    fn default() -> Self {
        Self {
            library_names: vec!["libEGL.so".into(), "libEGL.so.1".into()],
        }
    }
}

impl GlesProbe for LibEglProbe {
    fn highest_es_version(&self) -> i32 {
        let library = self.library_names.iter().find_map(|name| {
            // SAFETY: libEGL has no initialisation side effects beyond symbol binding.
            unsafe { Library::new(name) }.ok()
        });
        let Some(library) = library else {
            error!("libEGL is not available on this device");
            return PROBE_DISPLAY_INIT_FAILED;
        };
        match LibEglDisplay::bind(&library) {
            Ok(mut display) => detect_gles_version(&mut display),
            Err(err) => {
                error!("libEGL is missing required symbols: {}", err);
                PROBE_DISPLAY_INIT_FAILED
            }
        }
    }
}

type EglHandle = *mut c_void;

const EGL_EXTENSIONS: i32 = 0x3055;
const EGL_RENDERABLE_TYPE: i32 = 0x3040;

struct LibEglDisplay<'lib> {
    get_display: libloading::Symbol<'lib, unsafe extern "C" fn(EglHandle) -> EglHandle>,
    initialize: libloading::Symbol<'lib, unsafe extern "C" fn(EglHandle, *mut i32, *mut i32) -> u32>,
    query_string: libloading::Symbol<'lib, unsafe extern "C" fn(EglHandle, i32) -> *const c_char>,
    get_configs:
        libloading::Symbol<'lib, unsafe extern "C" fn(EglHandle, *mut EglHandle, i32, *mut i32) -> u32>,
    get_config_attrib:
        libloading::Symbol<'lib, unsafe extern "C" fn(EglHandle, EglHandle, i32, *mut i32) -> u32>,
    terminate_fn: libloading::Symbol<'lib, unsafe extern "C" fn(EglHandle) -> u32>,
    display: EglHandle,
}

impl<'lib> LibEglDisplay<'lib> {
    fn bind(library: &'lib Library) -> Result<Self, libloading::Error> {
        // SAFETY: signatures follow the EGL 1.4 C API.
        unsafe {
            Ok(Self {
                get_display: library.get(b"eglGetDisplay\0")?,
                initialize: library.get(b"eglInitialize\0")?,
                query_string: library.get(b"eglQueryString\0")?,
                get_configs: library.get(b"eglGetConfigs\0")?,
                get_config_attrib: library.get(b"eglGetConfigAttrib\0")?,
                terminate_fn: library.get(b"eglTerminate\0")?,
                display: std::ptr::null_mut(),
            })
        }
    }
}

impl EglDisplay for LibEglDisplay<'_> {
    fn initialize(&mut self) -> bool {
        // SAFETY: EGL_DEFAULT_DISPLAY is a null native display handle.
        unsafe {
            self.display = (self.get_display)(std::ptr::null_mut());
            if self.display.is_null() {
                return false;
            }
            (self.initialize)(self.display, std::ptr::null_mut(), std::ptr::null_mut()) != 0
        }
    }

    fn extensions(&mut self) -> String {
        // SAFETY: display is initialized; EGL owns the returned string.
        unsafe {
            let raw = (self.query_string)(self.display, EGL_EXTENSIONS);
            if raw.is_null() {
                return String::new();
            }
            CStr::from_ptr(raw).to_string_lossy().to_string()
        }
    }

    fn config_count(&mut self) -> Option<usize> {
        let mut count = 0;
        // SAFETY: a null config array asks EGL for the count only.
        let ok = unsafe { (self.get_configs)(self.display, std::ptr::null_mut(), 0, &mut count) };
        (ok != 0).then_some(count.max(0) as usize)
    }

    fn renderable_types(&mut self, count: usize) -> Option<Vec<Option<i32>>> {
        let mut configs: Vec<EglHandle> = vec![std::ptr::null_mut(); count];
        let mut returned = 0;
        // SAFETY: `configs` has room for `count` handles.
        let ok = unsafe {
            (self.get_configs)(
                self.display,
                configs.as_mut_ptr(),
                count as i32,
                &mut returned,
            )
        };
        if ok == 0 {
            return None;
        }
        configs.truncate(returned.max(0) as usize);

        let types = configs
            .iter()
            .map(|config| {
                let mut value = 0;
                // SAFETY: config came from eglGetConfigs on this display.
                let ok = unsafe {
                    (self.get_config_attrib)(self.display, *config, EGL_RENDERABLE_TYPE, &mut value)
                };
                (ok != 0).then_some(value)
            })
            .collect();
        Some(types)
    }

    fn terminate(&mut self) {
        if !self.display.is_null() {
            // SAFETY: display was returned by eglGetDisplay.
            unsafe {
                (self.terminate_fn)(self.display);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeDisplay {
        init_ok: bool,
        extensions: String,
        count: Option<usize>,
        types: Option<Vec<Option<i32>>>,
        terminated: bool,
    }

    impl EglDisplay for FakeDisplay {
        fn initialize(&mut self) -> bool {
            self.init_ok
        }
        fn extensions(&mut self) -> String {
            self.extensions.clone()
        }
        fn config_count(&mut self) -> Option<usize> {
            self.count
        }
        fn renderable_types(&mut self, _count: usize) -> Option<Vec<Option<i32>>> {
            self.types.clone()
        }
        fn terminate(&mut self) {
            self.terminated = true;
        }
    }

    fn working(extensions: &str, types: Vec<Option<i32>>) -> FakeDisplay {
        FakeDisplay {
            init_ok: true,
            extensions: extensions.into(),
            count: Some(types.len()),
            types: Some(types),
            terminated: false,
        }
    }

    #[test]
    fn es3_bit_requires_create_context_extension() {
        let bits = vec![Some(EGL_OPENGL_ES3_BIT_KHR | EGL_OPENGL_ES2_BIT)];
        let mut with_ext = working("EGL_KHR_image EGL_KHR_create_context", bits.clone());
        assert_eq!(detect_gles_version(&mut with_ext), 3);
        assert!(with_ext.terminated);

        let mut without_ext = working("EGL_KHR_create_context_no_error", bits);
        assert_eq!(detect_gles_version(&mut without_ext), 2);
    }

    #[test]
    fn highest_level_across_configs_wins_and_failed_reads_are_skipped() {
        let mut display = working(
            "",
            vec![Some(EGL_OPENGL_ES_BIT), None, Some(EGL_OPENGL_ES2_BIT), Some(0)],
        );
        assert_eq!(detect_gles_version(&mut display), 2);
    }

    #[test]
    fn failures_map_to_distinct_sentinels() {
        let mut no_init = FakeDisplay::default();
        assert_eq!(detect_gles_version(&mut no_init), PROBE_DISPLAY_INIT_FAILED);
        assert!(!no_init.terminated);

        let mut no_count = FakeDisplay {
            init_ok: true,
            ..FakeDisplay::default()
        };
        assert_eq!(detect_gles_version(&mut no_count), PROBE_CONFIG_COUNT_FAILED);
        assert!(no_count.terminated);

        let mut no_configs = FakeDisplay {
            init_ok: true,
            count: Some(4),
            ..FakeDisplay::default()
        };
        assert_eq!(detect_gles_version(&mut no_configs), PROBE_NO_CONFIGS);
        assert!(no_configs.terminated);
    }

    #[test]
    fn extension_match_is_whole_word() {
        assert!(has_extension("A EGL_KHR_create_context B", ES3_EXTENSION));
        assert!(!has_extension("EGL_KHR_create_context_no_error", ES3_EXTENSION));
        assert!(!has_extension("", ES3_EXTENSION));
    }
}
