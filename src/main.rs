// Command-line host: launch one installed version (or a jar) and relay its exit code.
//
//   launch-orchestrator <version> [username]
//   launch-orchestrator --jar <path> [args...]

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use launch_orchestrator::{
    init_logging, Account, GlobalSettings, LaunchRequest, LauncherError, LauncherPaths, LauncherResult,
    Orchestrator, ProcessEngine, VersionDescriptor,
};

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    match run(std::env::args().skip(1).collect()).await {
        Ok(code) => ExitCode::from(exit_status(code)),
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

/// Negative codes are engine-side failures, not a game exit status.
fn exit_status(code: i32) -> u8 {
    match u8::try_from(code) {
        Ok(code) => code,
        Err(_) if code < 0 => 1,
        Err(_) => u8::MAX,
    }
}

async fn run(args: Vec<String>) -> LauncherResult<i32> {
    let paths = LauncherPaths::from_default_dirs()?;
    let settings = GlobalSettings::load_or_default(&paths.settings_path());

    let request = match args.split_first() {
        Some((flag, rest)) if flag == "--jar" => {
            let (jar, jar_args) = rest
                .split_first()
                .ok_or_else(|| LauncherError::Other("--jar needs a path".into()))?;
            LaunchRequest::jar(jar, jar_args.to_vec(), Account::default())
        }
        Some((version, rest)) => {
            let version = VersionDescriptor::load(&paths.versions_dir(), version)?;
            let account = rest
                .first()
                .map(|name| Account::offline(name))
                .unwrap_or_default();
            LaunchRequest::game(version, account)
        }
        None => {
            return Err(LauncherError::Other(
                "usage: launch-orchestrator <version> [username] | --jar <path> [args...]".into(),
            ))
        }
    };

    let orchestrator = Orchestrator::builder(paths, settings, Arc::new(ProcessEngine::new())).build();
    let handle = orchestrator.launch(request)?;
    info!("Launch {} started", handle.launch_id());

    let outcome = handle.wait().await?;
    Ok(outcome.code)
}
