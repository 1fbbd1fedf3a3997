use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::core::error::{LauncherError, LauncherResult};

const RELEASE_FILE: &str = "release";

/// An installed Java runtime.
///
/// `java_version == 0` means the runtime could not be inspected (missing
/// directory or unreadable `release` file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Runtime {
    pub name: String,
    pub home: PathBuf,
    pub java_version: u32,
    pub version_string: Option<String>,
    pub arch: Option<String>,
    pub is_arch_compatible: bool,
}

impl Runtime {
    pub fn unresolved(name: &str, home: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            home,
            java_version: 0,
            version_string: None,
            arch: None,
            is_arch_compatible: false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.java_version > 0
    }

    pub fn java_bin(&self) -> PathBuf {
        self.home.join("bin").join(java_exe())
    }

    /// Directories holding `libjvm.so` and the runtime's own shared libraries.
    pub fn library_dirs(&self) -> Vec<PathBuf> {
        let lib = self.home.join("lib");
        // Java 8 layouts keep libraries under lib/<arch>.
        let legacy = self
            .arch
            .as_deref()
            .map(|arch| lib.join(legacy_lib_arch(arch)));
        let mut dirs = Vec::new();
        if let Some(legacy) = legacy.filter(|_| self.java_version == 8) {
            dirs.push(legacy.join("server"));
            dirs.push(legacy.join("jli"));
            dirs.push(legacy);
        } else {
            dirs.push(lib.join("server"));
            dirs.push(lib.join("jli"));
        }
        dirs.push(lib);
        dirs
    }
}

/// The runtime manager seam: enumerate and load installed runtimes.
#[async_trait]
pub trait RuntimeRegistry: Send + Sync {
    async fn installed(&self) -> LauncherResult<Vec<Runtime>>;

    /// Load a runtime by name. Unknown names yield an unresolved runtime.
    async fn load(&self, name: &str) -> LauncherResult<Runtime>;
}

/// Runtimes unpacked as `<runtimes>/<name>/` with a JDK `release` file.
#[derive(Debug, Clone)]
pub struct DirRuntimeRegistry {
    root: PathBuf,
    device_arch: &'static str,
}

impl DirRuntimeRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            device_arch: platform::device_arch(),
        }
    }

    pub fn with_device_arch(mut self, arch: &'static str) -> Self {
        self.device_arch = arch;
        self
    }

    async fn read_runtime(&self, name: &str) -> Runtime {
        let home = self.root.join(name);
        let release_path = home.join(RELEASE_FILE);
        let raw = match tokio::fs::read_to_string(&release_path).await {
            Ok(raw) => raw,
            Err(err) => {
                debug!("Runtime {} has no readable release file: {}", name, err);
                return Runtime::unresolved(name, home);
            }
        };

        let info = parse_release(&raw);
        let java_version = info
            .java_version
            .as_deref()
            .map(parse_major_version)
            .unwrap_or(0);
        let arch = info.os_arch.as_deref().map(platform::normalize_arch);
        let is_arch_compatible = arch.is_some_and(|a| a == self.device_arch);

        Runtime {
            name: name.to_string(),
            home,
            java_version,
            version_string: info.java_version,
            arch: arch.map(str::to_string),
            is_arch_compatible,
        }
    }
}

#[async_trait]
impl RuntimeRegistry for DirRuntimeRegistry {
    #[instrument(skip(self), fields(root = ?self.root))]
    async fn installed(&self) -> LauncherResult<Vec<Runtime>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(LauncherError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| LauncherError::Io {
                path: self.root.clone(),
                source,
            })?
        {
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();

        let mut runtimes = Vec::with_capacity(names.len());
        for name in names {
            let runtime = self.read_runtime(&name).await;
            if !runtime.is_resolved() {
                warn!("Skipping runtime {} with unknown Java version", name);
                continue;
            }
            runtimes.push(runtime);
        }
        Ok(runtimes)
    }

    async fn load(&self, name: &str) -> LauncherResult<Runtime> {
        Ok(self.read_runtime(name).await)
    }
}

#[derive(Debug, Default)]
struct ReleaseInfo {
    java_version: Option<String>,
    os_arch: Option<String>,
}

fn parse_release(raw: &str) -> ReleaseInfo {
    let mut info = ReleaseInfo::default();
    for line in raw.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').to_string();
        match key.trim() {
            "JAVA_VERSION" => info.java_version = Some(value),
            "OS_ARCH" => info.os_arch = Some(value),
            _ => {}
        }
    }
    info
}

/// `1.8.0_392` → 8, `17.0.8` → 17, `21` → 21.
pub fn parse_major_version(version: &str) -> u32 {
    let mut parts = version
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty());
    match parts.next().and_then(|p| p.parse::<u32>().ok()) {
        Some(1) => parts.next().and_then(|p| p.parse().ok()).unwrap_or(0),
        Some(major) => major,
        None => 0,
    }
}

fn legacy_lib_arch(arch: &str) -> &str {
    match arch {
        "x86" => "i386",
        "arm" => "aarch32",
        "arm64" => "aarch64",
        "x86_64" => "amd64",
        other => other,
    }
}

fn java_exe() -> &'static str {
    if cfg!(target_os = "windows") {
        "java.exe"
    } else {
        "java"
    }
}

pub mod platform {
    /// Architecture name of the running device.
    pub fn device_arch() -> &'static str {
        if cfg!(target_arch = "aarch64") {
            "arm64"
        } else if cfg!(target_arch = "arm") {
            "arm"
        } else if cfg!(target_arch = "x86_64") {
            "x86_64"
        } else if cfg!(target_arch = "x86") {
            "x86"
        } else {
            "unknown"
        }
    }

    /// Map JDK `OS_ARCH` spellings onto [`device_arch`] names.
    pub fn normalize_arch(raw: &str) -> &'static str {
        match raw.trim().to_ascii_lowercase().as_str() {
            "aarch64" | "arm64" => "arm64",
            "arm" | "aarch32" | "armv7" | "armv7l" => "arm",
            "x86_64" | "amd64" => "x86_64",
            "x86" | "i386" | "i486" | "i586" | "i686" => "x86",
            _ => "unknown",
        }
    }
}
