// ─── Classpath Builder ───
// Turns the manifest's library list into the `-cp` value for the game.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::version::LibraryEntry;

/// Inputs for one classpath build.
#[derive(Debug, Clone, Copy)]
pub struct ClasspathRequest<'a> {
    pub libraries: &'a [LibraryEntry],
    pub libraries_dir: &'a Path,
    pub client_jar: &'a Path,
    /// Put the client jar before the libraries instead of after them.
    pub client_first: bool,
}

/// Resolve every included library to an existing file, in manifest order.
///
/// Rule-excluded libraries, unparsable coordinates and missing files are
/// skipped with a warning.
pub fn resolve_library_paths(libraries: &[LibraryEntry], libraries_dir: &Path) -> Vec<PathBuf> {
    let mut resolved = Vec::with_capacity(libraries.len());

    for library in libraries {
        if !library.is_included() {
            debug!("Library {} excluded by platform rules", library.name);
            continue;
        }

        let relative = match library.artifact_path() {
            Ok(path) => path,
            Err(err) => {
                warn!("Skipping library {:?}: {}", library.name, err);
                continue;
            }
        };

        let path = libraries_dir.join(relative);
        if !path.is_file() {
            warn!("Ignored non-exists file: {:?}", path);
            continue;
        }
        resolved.push(path);
    }

    resolved
}

/// Build the classpath string. May be empty when nothing resolves.
pub fn build_classpath(request: &ClasspathRequest<'_>) -> String {
    let libraries = resolve_library_paths(request.libraries, request.libraries_dir);
    let client = Some(request.client_jar)
        .filter(|jar| jar.is_file())
        .map(Path::to_path_buf);
    if client.is_none() {
        warn!("Client jar {:?} not found, leaving it off the classpath", request.client_jar);
    }

    let mut entries: Vec<PathBuf> = Vec::with_capacity(libraries.len() + 1);
    if request.client_first {
        entries.extend(client.clone());
    }
    entries.extend(libraries);
    if !request.client_first {
        entries.extend(client);
    }

    debug!("Classpath has {} entries", entries.len());
    join_classpath(&entries)
}

pub fn join_classpath(entries: &[PathBuf]) -> String {
    entries
        .iter()
        .map(|entry| safe_path_str(entry))
        .collect::<Vec<_>>()
        .join(get_classpath_separator())
}

pub fn get_classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    }
}

/// Path text as the JVM expects it on the command line.
pub fn safe_path_str(path: &Path) -> String {
    let text = path.to_string_lossy().to_string();

    #[cfg(target_os = "windows")]
    {
        // Java rejects extended-length paths in classpath entries.
        if let Some(stripped) = text.strip_prefix(r"\\?\") {
            return stripped.to_string();
        }
    }

    text
}
