use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the launch core.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Maven ───────────────────────────────────────────
    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    // ── Version ─────────────────────────────────────────
    #[error("Version not found: {0}")]
    VersionNotFound(String),

    #[error("Invalid game manifest for {name}: {reason}")]
    InvalidManifest { name: String, reason: String },

    // ── Java ────────────────────────────────────────────
    #[error("No installed Java runtime satisfies major version {target}")]
    RuntimeNotFound { target: u32 },

    #[error("Java runtime '{0}' is not installed")]
    RuntimeMissing(String),

    // ── Lifecycle ───────────────────────────────────────
    #[error("Another launch is already active")]
    LaunchInProgress,

    #[error("Native engine failed to take control: {0}")]
    Engine(String),

    #[error("Launch task ended without delivering an outcome")]
    OutcomeLost,

    // ── Native ──────────────────────────────────────────
    #[error("Native library error: {0}")]
    Native(#[from] libloading::Error),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}
