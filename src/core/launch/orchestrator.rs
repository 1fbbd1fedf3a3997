// ─── Launch Orchestrator ───
// Entry point: turns a launch request into a running native process.
//
//   select runtime ─► classpath ─► renderer ─► environment ─► args
//        ─► dlopen sequence ─► engine start ─► wait for exit

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{oneshot, watch};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::core::auth::Account;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::{platform, select_runtime, DirRuntimeRegistry, Runtime, RuntimeRegistry, RuntimeRequest};
use crate::core::paths::LauncherPaths;
use crate::core::renderer::{GlesProbe, LibEglProbe, PluginCatalog, Renderer, RendererResolver};
use crate::core::settings::GlobalSettings;
use crate::core::version::{VersionDescriptor, DEFAULT_JAVA_MAJOR};

use super::args::{self, ArgContext, WindowSize};
use super::classpath::{build_classpath, ClasspathRequest};
use super::crash::{CrashReporter, FileCrashReporter};
use super::engine::{LaunchSpec, NativeEngine};
use super::env::{assemble_environment, BuildInfo, EnvInputs, EnvMap};
use super::lifecycle::{
    ExitSink, LaunchFacts, LaunchGate, LaunchState, LogNotifier, PeripheralProxy, ProcessLifecycleController,
    ProcessOutcome, UserNotifier,
};
use super::native::{LibloadingLoader, NativeBridgeSequencer, NativeLoader};

// ─── Requests & Handles ───

#[derive(Debug, Clone)]
pub enum LaunchTarget {
    /// An installed game version.
    Game(VersionDescriptor),
    /// A standalone jar (installers and tools), run with `-jar`.
    Jar { jar: PathBuf, args: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub target: LaunchTarget,
    pub account: Account,
}

impl LaunchRequest {
    pub fn game(version: VersionDescriptor, account: Account) -> Self {
        Self {
            target: LaunchTarget::Game(version),
            account,
        }
    }

    pub fn jar(jar: impl Into<PathBuf>, args: Vec<String>, account: Account) -> Self {
        Self {
            target: LaunchTarget::Jar {
                jar: jar.into(),
                args,
            },
            account,
        }
    }
}

/// Caller's view of one launch.
pub struct LaunchHandle {
    launch_id: Uuid,
    state: watch::Receiver<LaunchState>,
    outcome: oneshot::Receiver<LauncherResult<ProcessOutcome>>,
}

impl LaunchHandle {
    pub fn launch_id(&self) -> Uuid {
        self.launch_id
    }

    pub fn state(&self) -> LaunchState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LaunchState> {
        self.state.clone()
    }

    /// Resolve once the process exited or the launch failed.
    pub async fn wait(self) -> LauncherResult<ProcessOutcome> {
        self.outcome.await.map_err(|_| LauncherError::OutcomeLost)?
    }
}

// ─── Orchestrator ───

type WindowSizeFn = dyn Fn() -> WindowSize + Send + Sync;

/// Long-lived launch context. Cheap to clone; clones share the launch gate.
#[derive(Clone)]
pub struct Orchestrator {
    paths: LauncherPaths,
    settings: GlobalSettings,
    build: BuildInfo,
    catalog: Arc<PluginCatalog>,
    current_renderer: Option<String>,
    registry: Arc<dyn RuntimeRegistry>,
    engine: Arc<dyn NativeEngine>,
    loader: Arc<dyn NativeLoader>,
    probe: Arc<dyn GlesProbe>,
    crash_reporter: Arc<dyn CrashReporter>,
    notifier: Arc<dyn UserNotifier>,
    touch_proxy: Option<Arc<dyn PeripheralProxy>>,
    window_size: Arc<WindowSizeFn>,
    gate: LaunchGate,
}

pub struct OrchestratorBuilder {
    paths: LauncherPaths,
    settings: GlobalSettings,
    engine: Arc<dyn NativeEngine>,
    build: BuildInfo,
    catalog: Option<PluginCatalog>,
    current_renderer: Option<String>,
    registry: Option<Arc<dyn RuntimeRegistry>>,
    loader: Option<Arc<dyn NativeLoader>>,
    probe: Option<Arc<dyn GlesProbe>>,
    crash_reporter: Option<Arc<dyn CrashReporter>>,
    notifier: Option<Arc<dyn UserNotifier>>,
    touch_proxy: Option<Arc<dyn PeripheralProxy>>,
    window_size: Option<Arc<WindowSizeFn>>,
}

impl OrchestratorBuilder {
    pub fn build_info(mut self, build: BuildInfo) -> Self {
        self.build = build;
        self
    }

    pub fn catalog(mut self, catalog: PluginCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn current_renderer(mut self, id: impl Into<String>) -> Self {
        self.current_renderer = Some(id.into());
        self
    }

    pub fn registry(mut self, registry: Arc<dyn RuntimeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn loader(mut self, loader: Arc<dyn NativeLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn probe(mut self, probe: Arc<dyn GlesProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn crash_reporter(mut self, reporter: Arc<dyn CrashReporter>) -> Self {
        self.crash_reporter = Some(reporter);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn UserNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn touch_proxy(mut self, proxy: Arc<dyn PeripheralProxy>) -> Self {
        self.touch_proxy = Some(proxy);
        self
    }

    pub fn window_size(mut self, size: impl Fn() -> WindowSize + Send + Sync + 'static) -> Self {
        self.window_size = Some(Arc::new(size));
        self
    }

    /// Fill unset collaborators with the on-disk and system defaults.
    pub fn build(self) -> Orchestrator {
        let paths = self.paths;
        let catalog = self.catalog.unwrap_or_else(|| {
            PluginCatalog::scan(
                paths.native_lib_dir(),
                &paths.renderer_plugins_dir(),
                &paths.driver_plugins_dir(),
            )
        });
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(DirRuntimeRegistry::new(paths.runtimes_dir())));
        let crash_reporter = self
            .crash_reporter
            .unwrap_or_else(|| Arc::new(FileCrashReporter::new(paths.crash_reports_dir())));
        let touch_proxy = self.touch_proxy.or_else(|| default_touch_proxy(&paths));

        Orchestrator {
            settings: self.settings,
            build: self.build,
            catalog: Arc::new(catalog),
            current_renderer: self.current_renderer,
            registry,
            engine: self.engine,
            loader: self.loader.unwrap_or_else(|| Arc::new(LibloadingLoader::new())),
            probe: self.probe.unwrap_or_else(|| Arc::new(LibEglProbe::default())),
            crash_reporter,
            notifier: self.notifier.unwrap_or_else(|| Arc::new(LogNotifier)),
            touch_proxy,
            window_size: self
                .window_size
                .unwrap_or_else(|| Arc::new(WindowSize::default)),
            gate: LaunchGate::new(),
            paths,
        }
    }
}

#[cfg(unix)]
fn default_touch_proxy(paths: &LauncherPaths) -> Option<Arc<dyn PeripheralProxy>> {
    let socket = paths.cache_dir().join("touch_controller.sock");
    Some(Arc::new(super::touch_proxy::TouchControllerProxy::new(socket)))
}

#[cfg(not(unix))]
fn default_touch_proxy(_paths: &LauncherPaths) -> Option<Arc<dyn PeripheralProxy>> {
    None
}

/// Output of setup: the `LaunchSpec` plus what the later stages need.
struct PreparedLaunch {
    spec: LaunchSpec,
    renderer: Option<Renderer>,
    facts: LaunchFacts,
}

impl Orchestrator {
    pub fn builder(paths: LauncherPaths, settings: GlobalSettings, engine: Arc<dyn NativeEngine>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            paths,
            settings,
            engine,
            build: BuildInfo::default(),
            catalog: None,
            current_renderer: None,
            registry: None,
            loader: None,
            probe: None,
            crash_reporter: None,
            notifier: None,
            touch_proxy: None,
            window_size: None,
        }
    }

    pub fn paths(&self) -> &LauncherPaths {
        &self.paths
    }

    pub fn settings(&self) -> &GlobalSettings {
        &self.settings
    }

    pub fn is_launch_active(&self) -> bool {
        self.gate.is_active()
    }

    /// Start a launch in the background and return its handle.
    ///
    /// Must be called inside a tokio runtime. Fails with
    /// `LaunchInProgress` while another launch is active.
    pub fn launch(&self, request: LaunchRequest) -> LauncherResult<LaunchHandle> {
        let active = self.gate.try_acquire()?;
        let launch_id = active.launch_id();
        let (controller, state) = ProcessLifecycleController::new(
            active,
            Arc::clone(&self.crash_reporter),
            Arc::clone(&self.notifier),
        );
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let this = self.clone();
        tokio::spawn(async move {
            let result = this.run(launch_id, controller, request).await;
            let _ = outcome_tx.send(result);
        });

        Ok(LaunchHandle {
            launch_id,
            state,
            outcome: outcome_rx,
        })
    }

    #[instrument(skip_all, fields(launch = %launch_id))]
    async fn run(
        &self,
        launch_id: Uuid,
        mut controller: ProcessLifecycleController,
        request: LaunchRequest,
    ) -> LauncherResult<ProcessOutcome> {
        let prepared = match self.prepare(launch_id, request, &mut controller).await {
            Ok(prepared) => prepared,
            Err(err) => return Err(controller.fail(err).await),
        };
        let report = NativeBridgeSequencer::new(self.loader.as_ref()).run(
            self.paths.native_lib_dir(),
            prepared.renderer.as_ref(),
            &prepared.spec.env,
        );
        let failed = report.failures().count();
        if failed > 0 {
            error!("{} native library load(s) failed, continuing", failed);
        }
        controller.launching(prepared.facts.clone());

        let (sink, exit) = ExitSink::channel();
        if let Err(err) = self.engine.start(&prepared.spec, sink) {
            let err = match err {
                LauncherError::Engine(_) => err,
                other => LauncherError::Engine(other.to_string()),
            };
            return Err(controller.fail(err).await);
        }
        controller.running();
        controller.await_exit(exit).await
    }

    async fn prepare(
        &self,
        launch_id: Uuid,
        request: LaunchRequest,
        controller: &mut ProcessLifecycleController,
    ) -> LauncherResult<PreparedLaunch> {
        match request.target {
            LaunchTarget::Game(version) => {
                self.prepare_game(launch_id, &version, request.account, controller)
                    .await
            }
            LaunchTarget::Jar { jar, args } => {
                self.prepare_jar(launch_id, &jar, args, request.account).await
            }
        }
    }

    async fn prepare_game(
        &self,
        launch_id: Uuid,
        version: &VersionDescriptor,
        account: Account,
        controller: &mut ProcessLifecycleController,
    ) -> LauncherResult<PreparedLaunch> {
        let manifest = version.manifest()?;
        let settings = &self.settings;

        let account = if version.offline_account_login() {
            info!("Using a temporary offline account for {}", version.name());
            account.as_offline()
        } else {
            account.sanitized()
        };

        let runtime = select_runtime(
            self.registry.as_ref(),
            &RuntimeRequest {
                target_major: manifest.required_java_major(),
                version_override: version.runtime_override(),
                global_runtime: &settings.java_runtime,
                auto_pick: settings.auto_pick_java_runtime,
            },
        )
        .await?;
        if !runtime.is_resolved() {
            return Err(LauncherError::RuntimeMissing(runtime.name));
        }

        let game_dir = version.game_dir(&self.paths.game_root());
        tokio::fs::create_dir_all(&game_dir)
            .await
            .map_err(|source| LauncherError::Io {
                path: game_dir.clone(),
                source,
            })?;
        disable_forge_splash(&game_dir).await;

        let libraries_dir = self.paths.libraries_dir();
        let client_jar = version.client_jar();
        let classpath = build_classpath(&ClasspathRequest {
            libraries: &manifest.libraries,
            libraries_dir: &libraries_dir,
            client_jar: &client_jar,
            client_first: false,
        });

        let renderer = RendererResolver::new(&self.catalog).resolve(
            self.current_renderer.as_deref(),
            version.renderer_override(),
            &settings.renderer,
        );
        let driver = self.catalog.driver(&version.driver(settings));

        let touch_socket = match (&self.touch_proxy, version.touch_proxy_enabled()) {
            (Some(proxy), true) => match proxy.start(version.touch_vibrate_duration()).await {
                Ok(endpoint) => {
                    controller.add_peripheral(Arc::clone(proxy));
                    Some(endpoint)
                }
                Err(err) => {
                    warn!("{} could not start: {}", proxy.name(), err);
                    None
                }
            },
            _ => None,
        };

        let native_libs = list_native_libs(self.paths.native_lib_dir()).await;
        let env = assemble_environment(&EnvInputs {
            runtime: &runtime,
            renderer: Some(&renderer),
            driver,
            loader: manifest.declared_loader(),
            build: &self.build,
            native_dir: self.paths.native_lib_dir(),
            native_libs: &native_libs,
            cache_dir: self.paths.cache_dir(),
            home_dir: self.paths.data_dir(),
            force_vsync: settings.force_vsync,
            touch_proxy_socket: touch_socket.as_deref(),
            probe: self.probe.as_ref(),
        });

        let custom_jvm_args = version.jvm_args(settings);
        let renderer_library = renderer.library();
        let library_path = library_path_of(&env);
        let ctx = ArgContext {
            account: &account,
            version_name: version.name(),
            manifest,
            build: &self.build,
            game_dir: &game_dir,
            assets_dir: &self.paths.data_dir().join("assets"),
            libraries_dir: &libraries_dir,
            native_dir: self.paths.native_lib_dir(),
            cache_dir: self.paths.cache_dir(),
            library_path: &library_path,
            classpath: &classpath,
            ram_allocation_mb: version.ram_allocation(settings),
            gl_library: Some(renderer_library.as_str()),
            custom_jvm_args: &custom_jvm_args,
            window: (self.window_size)(),
            server: version.server_ip(),
        };
        let jvm_args = args::jvm_args(&ctx);
        let game_args = args::game_args(&ctx);

        self.print_launch_info(&LaunchInfo {
            version,
            renderer: Some(&renderer),
            game_dir: &game_dir,
            custom_jvm_args: &custom_jvm_args,
            runtime: &runtime,
            account: &account,
        });

        let facts = LaunchFacts {
            launch_id,
            version_name: version.name().to_string(),
            renderer: Some(renderer.descriptor()),
            architecture: platform::device_arch().to_string(),
            runtime_name: runtime.name.clone(),
            runtime_version: runtime.java_version,
        };
        let spec = LaunchSpec {
            launch_id,
            account,
            version_name: version.name().to_string(),
            main_class: manifest.main_class.clone(),
            runtime,
            classpath,
            env,
            jvm_args,
            game_args,
            working_dir: game_dir,
        };

        Ok(PreparedLaunch {
            spec,
            renderer: Some(renderer),
            facts,
        })
    }

    async fn prepare_jar(
        &self,
        launch_id: Uuid,
        jar: &Path,
        args: Vec<String>,
        account: Account,
    ) -> LauncherResult<PreparedLaunch> {
        let settings = &self.settings;
        let runtime = select_runtime(
            self.registry.as_ref(),
            &RuntimeRequest {
                target_major: DEFAULT_JAVA_MAJOR,
                version_override: "",
                global_runtime: &settings.java_runtime,
                auto_pick: settings.auto_pick_java_runtime,
            },
        )
        .await?;
        if !runtime.is_resolved() {
            return Err(LauncherError::RuntimeMissing(runtime.name));
        }

        let native_libs = list_native_libs(self.paths.native_lib_dir()).await;
        let env = assemble_environment(&EnvInputs {
            runtime: &runtime,
            renderer: None,
            driver: self.catalog.driver(&settings.vulkan_driver),
            loader: None,
            build: &self.build,
            native_dir: self.paths.native_lib_dir(),
            native_libs: &native_libs,
            cache_dir: self.paths.cache_dir(),
            home_dir: self.paths.data_dir(),
            force_vsync: settings.force_vsync,
            touch_proxy_socket: None,
            probe: self.probe.as_ref(),
        });

        let mut jvm_args = args::base_jvm_args(
            settings.effective_ram_allocation(),
            &library_path_of(&env),
            self.paths.cache_dir(),
            &self.build,
        );
        jvm_args.extend(args::split_custom_args(&settings.jvm_args));
        jvm_args.push("-jar".into());
        jvm_args.push(jar.to_string_lossy().to_string());

        let name = jar
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "jar".into());
        let working_dir = jar
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.paths.data_dir().to_path_buf());
        info!("Launching jar {:?} with runtime {}", jar, runtime.name);

        let facts = LaunchFacts {
            launch_id,
            version_name: name.clone(),
            renderer: None,
            architecture: platform::device_arch().to_string(),
            runtime_name: runtime.name.clone(),
            runtime_version: runtime.java_version,
        };
        let spec = LaunchSpec {
            launch_id,
            account: account.sanitized(),
            version_name: name,
            main_class: None,
            runtime,
            classpath: String::new(),
            env,
            jvm_args,
            game_args: args,
            working_dir,
        };

        Ok(PreparedLaunch {
            spec,
            renderer: None,
            facts,
        })
    }

    fn print_launch_info(&self, info: &LaunchInfo<'_>) {
        let device = sysinfo::System::long_os_version().unwrap_or_else(|| "unknown".into());
        info!("==== Launch Minecraft ====");
        info!(
            "Info: Launcher version: {} ({})",
            self.build.version_name, self.build.version_code
        );
        info!("Info: Architecture: {}", platform::device_arch());
        info!("Info: Device: {}", device);
        if let Some(renderer) = info.renderer {
            info!("Info: Renderer: {}", renderer.display_name());
            if let Some(summary) = renderer.summary() {
                info!("Info: Renderer Summary: {}", summary);
            }
        }
        info!("Info: Selected Minecraft version: {}", info.version.name());
        info!(
            "Info: Game Path: {} (Isolation: {})",
            info.game_dir.display(),
            info.version.is_isolated()
        );
        info!(
            "Info: Custom Java arguments: {}",
            if info.custom_jvm_args.trim().is_empty() {
                "NONE"
            } else {
                info.custom_jvm_args
            }
        );
        info!(
            "Info: Java Runtime: {} (Java {})",
            info.runtime.name, info.runtime.java_version
        );
        info!(
            "Info: Account: {} ({:?})",
            info.account.username, info.account.mode
        );
    }
}

struct LaunchInfo<'a> {
    version: &'a VersionDescriptor,
    renderer: Option<&'a Renderer>,
    game_dir: &'a Path,
    custom_jvm_args: &'a str,
    runtime: &'a Runtime,
    account: &'a Account,
}

fn library_path_of(env: &EnvMap) -> String {
    env.get("LD_LIBRARY_PATH").cloned().unwrap_or_default()
}

async fn list_native_libs(dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        warn!("Native library dir {:?} is not readable", dir);
        return names;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        names.push(entry.file_name().to_string_lossy().to_string());
    }
    names.sort();
    names
}

/// Old Forge splash screens crash on GLES; switch them off in the game config.
/// Failures are only logged.
pub async fn disable_forge_splash(game_dir: &Path) {
    let config_dir = game_dir.join("config");
    if let Err(err) = tokio::fs::create_dir_all(&config_dir).await {
        warn!("Failed to create the configuration directory {:?}: {}", config_dir, err);
        return;
    }

    let splash = config_dir.join("splash.properties");
    let content = match tokio::fs::read_to_string(&splash).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => "enabled=true".to_string(),
        Err(err) => {
            warn!("Could not read {:?}: {}", splash, err);
            return;
        }
    };

    if content.contains("enabled=true") {
        let updated = content.replace("enabled=true", "enabled=false");
        if let Err(err) = tokio::fs::write(&splash, updated).await {
            warn!("Could not disable Forge splash screen: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::core::auth::AccountMode;
    use crate::core::launch::crash::CrashReport;
    use crate::core::renderer::StaticProbe;
    use crate::core::version::{GameManifest, VersionConfig};

    struct FixedRegistry(Vec<Runtime>);

    #[async_trait]
    impl RuntimeRegistry for FixedRegistry {
        async fn installed(&self) -> LauncherResult<Vec<Runtime>> {
            Ok(self.0.clone())
        }

        async fn load(&self, name: &str) -> LauncherResult<Runtime> {
            Ok(self
                .0
                .iter()
                .find(|r| r.name == name)
                .cloned()
                .unwrap_or_else(|| Runtime::unresolved(name, PathBuf::from("/rt").join(name))))
        }
    }

    fn runtime(name: &str, major: u32) -> Runtime {
        Runtime {
            name: name.into(),
            home: PathBuf::from("/rt").join(name),
            java_version: major,
            version_string: Some(major.to_string()),
            arch: Some(platform::device_arch().into()),
            is_arch_compatible: true,
        }
    }

    #[derive(Default)]
    struct FakeEngine {
        fail: bool,
        specs: Mutex<Vec<LaunchSpec>>,
        sinks: Mutex<Vec<ExitSink>>,
    }

    impl FakeEngine {
        fn exit(&self, code: i32) {
            for sink in self.sinks.lock().unwrap().iter() {
                sink.notify(code, false);
            }
        }
    }

    impl NativeEngine for FakeEngine {
        fn start(&self, spec: &LaunchSpec, exit: ExitSink) -> LauncherResult<()> {
            if self.fail {
                return Err(LauncherError::Other("no display".into()));
            }
            self.specs.lock().unwrap().push(spec.clone());
            self.sinks.lock().unwrap().push(exit);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeLoader {
        available: HashSet<String>,
        calls: Mutex<Vec<String>>,
        watcher: Mutex<Option<watch::Receiver<LaunchState>>>,
        states_seen: Mutex<Vec<LaunchState>>,
    }

    impl NativeLoader for FakeLoader {
        fn dlopen(&self, path: &str) -> LauncherResult<()> {
            self.calls.lock().unwrap().push(path.to_string());
            if let Some(watcher) = self.watcher.lock().unwrap().as_ref() {
                self.states_seen.lock().unwrap().push(watcher.borrow().clone());
            }
            if self.available.contains(path) {
                Ok(())
            } else {
                Err(LauncherError::Other(format!("{path}: not found")))
            }
        }
    }

    #[derive(Default)]
    struct Reports(Mutex<Vec<CrashReport>>);

    impl CrashReporter for Reports {
        fn report(&self, report: &CrashReport) -> LauncherResult<()> {
            self.0.lock().unwrap().push(report.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingNotifier {
        failures: AtomicUsize,
    }

    impl UserNotifier for CountingNotifier {
        fn launch_failed(&self, _error: &LauncherError) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }

        fn game_exited(&self, _outcome: &ProcessOutcome) {}
    }

    struct Harness {
        temp: PathBuf,
        engine: Arc<FakeEngine>,
        loader: Arc<FakeLoader>,
        reports: Arc<Reports>,
        notifier: Arc<CountingNotifier>,
        orchestrator: Orchestrator,
    }

    impl Harness {
        fn new(tag: &str, engine: FakeEngine) -> Self {
            let temp = std::env::temp_dir().join(format!("orchestrator-{}-{}", tag, std::process::id()));
            let _ = std::fs::remove_dir_all(&temp);
            let native = temp.join("native");
            std::fs::create_dir_all(&native).unwrap();
            std::fs::write(native.join("libopenal.so"), b"elf").unwrap();

            let paths = LauncherPaths::new(temp.join("data"), &native);
            let engine = Arc::new(engine);
            let loader = Arc::new(FakeLoader::default());
            let reports = Arc::new(Reports::default());
            let notifier = Arc::new(CountingNotifier::default());
            let registry = Arc::new(FixedRegistry(vec![runtime("jre-8", 8), runtime("jre-17", 17)]));

            let orchestrator = Orchestrator::builder(paths, GlobalSettings::default(), engine.clone())
                .catalog(PluginCatalog::bundled(&native))
                .registry(registry)
                .loader(loader.clone())
                .probe(Arc::new(StaticProbe(3)))
                .crash_reporter(reports.clone())
                .notifier(notifier.clone())
                .window_size(|| WindowSize {
                    width: 800,
                    height: 600,
                })
                .build();

            Self {
                temp,
                engine,
                loader,
                reports,
                notifier,
                orchestrator,
            }
        }

        fn version(&self, java_major: u32, config: VersionConfig) -> VersionDescriptor {
            let manifest = GameManifest::parse(
                "1.20.1",
                &format!(
                    r#"{{"mainClass":"net.minecraft.client.main.Main",
                        "javaVersion":{{"majorVersion":{java_major}}},
                        "minecraftArguments":"--username ${{auth_player_name}} --accessToken ${{auth_access_token}}"}}"#
                ),
            )
            .unwrap();
            let dir = self.temp.join("data").join("versions").join("1.20.1");
            VersionDescriptor::new("1.20.1", dir, config, Some(manifest))
        }
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.temp);
        }
    }

    fn online_account() -> Account {
        Account {
            mode: AccountMode::Microsoft,
            username: "Steve".into(),
            uuid: "a8c1c0de-0000-4000-8000-000000000001".into(),
            access_token: "secret-token".into(),
            xuid: "2535".into(),
            user_type: "msa".into(),
        }
    }

    #[tokio::test]
    async fn missing_renderer_library_still_reaches_running() {
        let harness = Harness::new("running", FakeEngine::default());
        let version = harness.version(17, VersionConfig::default());
        let handle = harness
            .orchestrator
            .launch(LaunchRequest::game(version, online_account()))
            .unwrap();

        let mut states = handle.subscribe();
        states
            .wait_for(|state| *state == LaunchState::Running)
            .await
            .unwrap();

        let spec = harness.engine.specs.lock().unwrap()[0].clone();
        assert_eq!(spec.runtime.name, "jre-17");
        assert_eq!(spec.env["POJAV_RENDERER"], "opengles3");
        assert!(spec
            .jvm_args
            .contains(&"-Dorg.lwjgl.opengl.libname=libgl4es_114.so".to_string()));
        assert!(spec.game_args.ends_with(&[
            "--width".to_string(),
            "800".to_string(),
            "--height".to_string(),
            "600".to_string()
        ]));
        assert!(spec.game_args.contains(&"secret-token".to_string()));

        let calls = harness.loader.calls.lock().unwrap().clone();
        assert_eq!(calls[1], "libgl4es_114.so");
        assert_eq!(calls.len(), 3);

        harness.engine.exit(1);
        let outcome = handle.wait().await.unwrap();
        assert_eq!(outcome.code, 1);
        let reports = harness.reports.0.lock().unwrap().clone();
        assert_eq!(reports.len(), 1);
        let renderer = reports[0].facts.renderer.as_ref().unwrap();
        assert_eq!(renderer.id, "opengles3");
        assert_eq!(renderer.library, "libgl4es_114.so");
        assert!(!harness.orchestrator.is_launch_active());
    }

    #[tokio::test]
    async fn launching_is_published_after_the_dlopen_sequence() {
        let harness = Harness::new("dlopen-order", FakeEngine::default());
        let handle = harness
            .orchestrator
            .launch(LaunchRequest::game(
                harness.version(8, VersionConfig::default()),
                online_account(),
            ))
            .unwrap();
        *harness.loader.watcher.lock().unwrap() = Some(handle.subscribe());

        handle
            .subscribe()
            .wait_for(|state| *state == LaunchState::Running)
            .await
            .unwrap();

        let seen = harness.loader.states_seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|state| *state == LaunchState::NotStarted));

        let spec = harness.engine.specs.lock().unwrap()[0].clone();
        assert_eq!(spec.launch_id, handle.launch_id());

        harness.engine.exit(0);
        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn unsatisfiable_runtime_aborts_before_start() {
        let harness = Harness::new("no-runtime", FakeEngine::default());
        let version = harness.version(21, VersionConfig::default());
        let handle = harness
            .orchestrator
            .launch(LaunchRequest::game(version, online_account()))
            .unwrap();

        let err = handle.wait().await.unwrap_err();
        assert!(matches!(err, LauncherError::RuntimeNotFound { target: 21 }));
        assert_eq!(harness.notifier.failures.load(Ordering::SeqCst), 1);
        assert!(harness.engine.specs.lock().unwrap().is_empty());
        assert!(harness.loader.calls.lock().unwrap().is_empty());
        assert!(!harness.orchestrator.is_launch_active());
    }

    #[tokio::test]
    async fn second_launch_is_rejected_while_active() {
        let harness = Harness::new("busy", FakeEngine::default());
        let first = harness
            .orchestrator
            .launch(LaunchRequest::game(
                harness.version(8, VersionConfig::default()),
                online_account(),
            ))
            .unwrap();

        let second = harness.orchestrator.launch(LaunchRequest::game(
            harness.version(8, VersionConfig::default()),
            online_account(),
        ));
        assert!(matches!(second, Err(LauncherError::LaunchInProgress)));

        first
            .subscribe()
            .wait_for(|state| *state == LaunchState::Running)
            .await
            .unwrap();
        harness.engine.exit(0);
        first.wait().await.unwrap();
        assert!(harness.reports.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn engine_start_failure_releases_the_gate() {
        let harness = Harness::new(
            "engine-fail",
            FakeEngine {
                fail: true,
                ..FakeEngine::default()
            },
        );
        let handle = harness
            .orchestrator
            .launch(LaunchRequest::game(
                harness.version(8, VersionConfig::default()),
                online_account(),
            ))
            .unwrap();

        let err = handle.wait().await.unwrap_err();
        assert!(matches!(err, LauncherError::Engine(_)));
        assert_eq!(harness.notifier.failures.load(Ordering::SeqCst), 1);
        assert!(!harness.orchestrator.is_launch_active());
    }

    #[tokio::test]
    async fn offline_flag_and_isolation_shape_the_spec() {
        let harness = Harness::new("offline", FakeEngine::default());
        let config = VersionConfig {
            isolation: true,
            offline_account_login: true,
            renderer: "vulkan_zink".into(),
            ..VersionConfig::default()
        };
        let version = harness.version(8, config);
        let version_dir = version.version_dir().to_path_buf();
        let handle = harness
            .orchestrator
            .launch(LaunchRequest::game(version, online_account()))
            .unwrap();
        handle
            .subscribe()
            .wait_for(|state| *state == LaunchState::Running)
            .await
            .unwrap();

        let spec = harness.engine.specs.lock().unwrap()[0].clone();
        assert_eq!(spec.account.mode, AccountMode::Offline);
        assert_eq!(spec.account.username, "Steve");
        assert!(!spec.game_args.contains(&"secret-token".to_string()));
        assert_eq!(spec.working_dir, version_dir);
        assert_eq!(spec.env["MESA_LOADER_DRIVER_OVERRIDE"], "zink");

        let splash = std::fs::read_to_string(version_dir.join("config/splash.properties")).unwrap();
        assert_eq!(splash, "enabled=false");

        harness.engine.exit(0);
        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn jar_target_runs_without_renderer() {
        let harness = Harness::new("jar", FakeEngine::default());
        let jar = harness.temp.join("installer.jar");
        let handle = harness
            .orchestrator
            .launch(LaunchRequest::jar(&jar, vec!["--headless".into()], Account::default()))
            .unwrap();
        handle
            .subscribe()
            .wait_for(|state| *state == LaunchState::Running)
            .await
            .unwrap();

        let spec = harness.engine.specs.lock().unwrap()[0].clone();
        assert_eq!(spec.main_class, None);
        assert_eq!(
            &spec.jvm_args[spec.jvm_args.len() - 2..],
            &["-jar".to_string(), jar.to_string_lossy().to_string()]
        );
        assert_eq!(spec.game_args, vec!["--headless"]);
        assert!(!spec.env.contains_key("POJAV_RENDERER"));
        assert_eq!(harness.loader.calls.lock().unwrap().len(), 1);

        harness.engine.exit(0);
        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn forge_splash_keeps_other_settings() {
        let temp = std::env::temp_dir().join(format!("forge-splash-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&temp);
        std::fs::create_dir_all(temp.join("config")).unwrap();
        std::fs::write(
            temp.join("config/splash.properties"),
            "enabled=true\nrotate=false\n",
        )
        .unwrap();

        disable_forge_splash(&temp).await;
        let content = std::fs::read_to_string(temp.join("config/splash.properties")).unwrap();
        assert_eq!(content, "enabled=false\nrotate=false\n");
        let _ = std::fs::remove_dir_all(&temp);
    }
}
