// ─── Crash Reports ───

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::core::error::{LauncherError, LauncherResult};

use super::lifecycle::{LaunchFacts, ProcessOutcome};

/// What is kept about a launch that ended with a non-zero exit code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashReport {
    pub launch_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub exit_code: i32,
    pub is_signal: bool,
    pub facts: LaunchFacts,
}

impl CrashReport {
    pub fn new(facts: &LaunchFacts, outcome: ProcessOutcome) -> Self {
        Self {
            launch_id: facts.launch_id,
            created_at: Utc::now(),
            exit_code: outcome.code,
            is_signal: outcome.is_signal,
            facts: facts.clone(),
        }
    }
}

pub trait CrashReporter: Send + Sync {
    fn report(&self, report: &CrashReport) -> LauncherResult<()>;
}

/// Writes one pretty-printed JSON file per crash.
#[derive(Debug, Clone)]
pub struct FileCrashReporter {
    dir: PathBuf,
}

impl FileCrashReporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn report_path(&self, report: &CrashReport) -> PathBuf {
        self.dir.join(format!(
            "crash-{}-{}.json",
            report.created_at.format("%Y%m%d-%H%M%S"),
            report.launch_id.simple()
        ))
    }
}

impl CrashReporter for FileCrashReporter {
    fn report(&self, report: &CrashReport) -> LauncherResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|source| LauncherError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.report_path(report);
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, json).map_err(|source| LauncherError::Io {
            path: path.clone(),
            source,
        })?;

        info!("Crash report written to {:?}", path);
        Ok(())
    }
}
