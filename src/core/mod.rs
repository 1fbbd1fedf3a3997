// ─── Launch Orchestrator Core ───
// Everything between "play" and a running game process.
//
// Architecture:
//   core/
//     auth/     Account data for argument placeholders
//     version/  Version manifest + per-version config
//     maven/    Artifact coordinates to library paths
//     java/     Runtime registry + selection
//     renderer/ Built-in and plugin renderers, GLES probe
//     launch/   Classpath, environment, args, dlopen, engine, lifecycle
//     paths     On-disk layout
//     settings  Global launcher settings

pub mod auth;
pub mod error;
pub mod java;
pub mod launch;
pub mod maven;
pub mod paths;
pub mod renderer;
pub mod settings;
pub mod version;
