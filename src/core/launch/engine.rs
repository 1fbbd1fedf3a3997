// ─── Native Engine ───
// The launch description handed to the engine, and a desktop engine that
// runs it as a child `java` process.

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::auth::Account;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::Runtime;

use super::env::EnvMap;
use super::lifecycle::ExitSink;

/// Everything the engine needs to start the game. Built once per launch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchSpec {
    pub launch_id: Uuid,
    #[serde(skip)]
    pub account: Account,
    pub version_name: String,
    /// `None` for `-jar` launches.
    pub main_class: Option<String>,
    pub runtime: Runtime,
    pub classpath: String,
    pub env: EnvMap,
    pub jvm_args: Vec<String>,
    pub game_args: Vec<String>,
    pub working_dir: PathBuf,
}

impl LaunchSpec {
    /// Arguments after the `java` executable.
    pub fn command_args(&self) -> Vec<String> {
        let mut args = self.jvm_args.clone();
        if !self.classpath.is_empty() {
            args.push("-cp".into());
            args.push(self.classpath.clone());
        }
        args.extend(self.main_class.clone());
        args.extend(self.game_args.iter().cloned());
        args
    }
}

/// The native execution engine that takes over once setup is done.
pub trait NativeEngine: Send + Sync {
    /// Hand control to the engine. `Ok` means the engine accepted it; the
    /// engine later reports the exit through `exit`, once.
    fn start(&self, spec: &LaunchSpec, exit: ExitSink) -> LauncherResult<()>;
}

/// Runs `<runtime>/bin/java` as a child process.
#[derive(Debug, Clone, Default)]
pub struct ProcessEngine {
    inherit_env: bool,
}

impl ProcessEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the parent's environment underneath the assembled one.
    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    fn command(&self, spec: &LaunchSpec) -> Command {
        let mut cmd = Command::new(spec.runtime.java_bin());
        cmd.args(spec.command_args());
        if !self.inherit_env {
            cmd.env_clear();
        }
        cmd.envs(&spec.env);
        cmd.current_dir(&spec.working_dir);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd
    }
}

impl NativeEngine for ProcessEngine {
    fn start(&self, spec: &LaunchSpec, exit: ExitSink) -> LauncherResult<()> {
        let mut cmd = self.command(spec);
        info!("Launching {} with {:?}", spec.version_name, spec.runtime.java_bin());
        debug!("Command: {:?}", cmd.get_args().collect::<Vec<_>>());

        std::fs::create_dir_all(&spec.working_dir).map_err(|source| LauncherError::Io {
            path: spec.working_dir.clone(),
            source,
        })?;
        let mut child = cmd
            .spawn()
            .map_err(|e| LauncherError::Engine(e.to_string()))?;
        info!("Native process started (PID {})", child.id());

        if let Some(stdout) = child.stdout.take() {
            tokio::task::spawn_blocking(move || {
                for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                    info!("[game][stdout] {}", line);
                }
            });
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::task::spawn_blocking(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    warn!("[game][stderr] {}", line);
                }
            });
        }

        tokio::task::spawn_blocking(move || match child.wait() {
            Ok(status) => {
                let (code, is_signal) = exit_code(status);
                exit.notify(code, is_signal);
            }
            Err(err) => {
                error!("Waiting for the native process failed: {}", err);
                exit.notify(-1, false);
            }
        });
        Ok(())
    }
}

/// Exit code and whether it came from a signal.
#[cfg(unix)]
pub fn exit_code(status: ExitStatus) -> (i32, bool) {
    use std::os::unix::process::ExitStatusExt;

    match (status.code(), status.signal()) {
        (Some(code), _) => (code, false),
        (None, Some(signal)) => (signal, true),
        (None, None) => (-1, false),
    }
}

#[cfg(not(unix))]
pub fn exit_code(status: ExitStatus) -> (i32, bool) {
    (status.code().unwrap_or(-1), false)
}
