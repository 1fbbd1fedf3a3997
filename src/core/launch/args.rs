// ─── Launch Arguments ───
// JVM and game argument lists for the native process.

use std::path::Path;

use tracing::debug;

use crate::core::auth::Account;
use crate::core::version::GameManifest;

use super::classpath::{get_classpath_separator, safe_path_str};
use super::env::BuildInfo;

/// Window size the game should open with, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Everything needed to fill argument placeholders for one launch.
#[derive(Debug, Clone, Copy)]
pub struct ArgContext<'a> {
    pub account: &'a Account,
    pub version_name: &'a str,
    pub manifest: &'a GameManifest,
    pub build: &'a BuildInfo,
    pub game_dir: &'a Path,
    pub assets_dir: &'a Path,
    pub libraries_dir: &'a Path,
    pub native_dir: &'a Path,
    pub cache_dir: &'a Path,
    /// `LD_LIBRARY_PATH`-style list for `java.library.path`.
    pub library_path: &'a str,
    pub classpath: &'a str,
    pub ram_allocation_mb: u32,
    /// Library LWJGL should open for OpenGL; `None` without a renderer.
    pub gl_library: Option<&'a str>,
    pub custom_jvm_args: &'a str,
    pub window: WindowSize,
    pub server: Option<&'a str>,
}

/// Arguments placed before `-cp`/the main class.
pub fn jvm_args(ctx: &ArgContext<'_>) -> Vec<String> {
    let mut args = base_jvm_args(ctx.ram_allocation_mb, ctx.library_path, ctx.cache_dir, ctx.build);

    let manifest_args = sanitize_jvm_args(ctx, &ctx.manifest.jvm_args());
    args.extend(manifest_args);
    args.extend(split_custom_args(ctx.custom_jvm_args));
    // Manifests point this at the natives dir only; keep the full search path.
    set_jvm_system_property(&mut args, "java.library.path", ctx.library_path);

    if let Some(library) = ctx.gl_library {
        set_jvm_system_property(&mut args, "org.lwjgl.opengl.libname", library);
    }
    args
}

/// Memory, paths and branding shared by game and jar launches.
pub fn base_jvm_args(ram_mb: u32, library_path: &str, cache_dir: &Path, build: &BuildInfo) -> Vec<String> {
    vec![
        format!("-Xms{}M", ram_mb),
        format!("-Xmx{}M", ram_mb),
        format!("-Djava.io.tmpdir={}", safe_path_str(cache_dir)),
        format!("-Djava.library.path={}", library_path),
        format!("-Dminecraft.launcher.brand={}", build.launcher_name),
        format!("-Dminecraft.launcher.version={}", build.version_name),
    ]
}

pub fn split_custom_args(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

fn sanitize_jvm_args(ctx: &ArgContext<'_>, raw_args: &[String]) -> Vec<String> {
    let mut sanitized = Vec::new();
    let natives = safe_path_str(ctx.native_dir);
    let library_dir = safe_path_str(ctx.libraries_dir);
    let game_dir = safe_path_str(ctx.game_dir);

    let mut i = 0;
    while i < raw_args.len() {
        let arg = &raw_args[i];

        // `-cp` is added once by the engine.
        if arg == "-cp" || arg == "-classpath" || arg == "--class-path" {
            i += 2;
            continue;
        }

        let resolved = arg
            .replace("${natives_directory}", &natives)
            .replace("${library_directory}", &library_dir)
            .replace("${classpath}", ctx.classpath)
            .replace("${classpath_separator}", get_classpath_separator())
            .replace("${game_directory}", &game_dir)
            .replace("${version_name}", ctx.version_name)
            .replace("${launcher_name}", &ctx.build.launcher_name)
            .replace("${launcher_version}", &ctx.build.version_name);

        push_resolved(&mut sanitized, resolved);
        i += 1;
    }

    sanitized
}

/// Arguments after the main class.
pub fn game_args(ctx: &ArgContext<'_>) -> Vec<String> {
    let mut sanitized = Vec::new();
    let game_dir = safe_path_str(ctx.game_dir);
    let assets_dir = safe_path_str(ctx.assets_dir);
    let account = ctx.account;
    let version_type = ctx.manifest.version_type.as_deref().unwrap_or("release");

    for arg in ctx.manifest.game_args() {
        let resolved = arg
            .replace("${auth_player_name}", &account.username)
            .replace("${version_name}", ctx.version_name)
            .replace("${game_directory}", &game_dir)
            .replace("${assets_root}", &assets_dir)
            .replace("${game_assets}", &assets_dir)
            .replace("${assets_index_name}", ctx.manifest.asset_index_name())
            .replace("${auth_uuid}", &account.uuid.replace('-', ""))
            .replace("${auth_access_token}", &account.access_token)
            .replace("${auth_session}", &account.access_token)
            .replace("${auth_xuid}", &account.xuid)
            .replace("${user_properties}", "{}")
            .replace("${user_type}", &account.user_type)
            .replace("${version_type}", version_type);

        push_resolved(&mut sanitized, resolved);
    }

    let mut args = sanitize_numeric_window_args(sanitized);
    set_window_size(&mut args, ctx.window);

    if let Some(server) = ctx.server {
        append_server_args(&mut args, server, supports_quick_play(ctx.manifest));
    }

    debug!("Game arguments: {:?}", args);
    args
}

/// Unresolved placeholders are dropped. An unresolved value also takes the
/// option before it; an unresolved option goes alone.
fn push_resolved(args: &mut Vec<String>, resolved: String) {
    if resolved.contains("${") {
        if !resolved.starts_with('-') {
            drop_dangling_option(args);
        }
        return;
    }
    args.push(resolved);
}

fn drop_dangling_option(args: &mut Vec<String>) {
    if args.last().is_some_and(|last| last.starts_with('-')) {
        let _ = args.pop();
    }
}

fn sanitize_numeric_window_args(args: Vec<String>) -> Vec<String> {
    let mut sanitized = Vec::with_capacity(args.len());
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];
        if arg == "--width" || arg == "--height" {
            let Some(value) = args.get(i + 1) else {
                i += 1;
                continue;
            };

            if value.starts_with('-') || value.parse::<u32>().is_err() {
                i += 1;
                continue;
            }

            sanitized.push(arg.clone());
            sanitized.push(value.clone());
            i += 2;
            continue;
        }

        sanitized.push(arg.clone());
        i += 1;
    }

    sanitized
}

fn set_window_size(args: &mut Vec<String>, window: WindowSize) {
    set_option(args, "--width", &window.width.to_string());
    set_option(args, "--height", &window.height.to_string());
}

/// Replace the value of `flag` in place, or append the pair.
fn set_option(args: &mut Vec<String>, flag: &str, value: &str) {
    match args.iter().position(|arg| arg == flag) {
        Some(idx) if idx + 1 < args.len() => args[idx + 1] = value.to_string(),
        _ => {
            args.retain(|arg| arg != flag);
            args.push(flag.to_string());
            args.push(value.to_string());
        }
    }
}

fn set_jvm_system_property(args: &mut Vec<String>, property: &str, value: &str) {
    let prefix = format!("-D{}=", property);
    args.retain(|arg| !arg.starts_with(&prefix));
    args.push(format!("{}{}", prefix, value));
}

/// Modern manifests declare a quick-play option for joining servers.
fn supports_quick_play(manifest: &GameManifest) -> bool {
    manifest.arguments.as_ref().is_some_and(|arguments| {
        arguments
            .game
            .iter()
            .any(|value| value.to_string().contains("--quickPlayMultiplayer"))
    })
}

fn append_server_args(args: &mut Vec<String>, server: &str, quick_play: bool) {
    if quick_play {
        let target = if server.contains(':') {
            server.to_string()
        } else {
            format!("{}:25565", server)
        };
        args.push("--quickPlayMultiplayer".into());
        args.push(target);
        return;
    }

    let (host, port) = match server.rsplit_once(':') {
        Some((host, port)) if port.parse::<u16>().is_ok() => (host, port),
        _ => (server, "25565"),
    };
    args.push("--server".into());
    args.push(host.to_string());
    args.push("--port".into());
    args.push(port.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(raw: &str) -> GameManifest {
        GameManifest::parse("test", raw).unwrap()
    }

    fn context<'a>(
        manifest: &'a GameManifest,
        account: &'a Account,
        build: &'a BuildInfo,
    ) -> ArgContext<'a> {
        ArgContext {
            account,
            version_name: "1.20.1",
            manifest,
            build,
            game_dir: Path::new("/data/game"),
            assets_dir: Path::new("/data/game/assets"),
            libraries_dir: Path::new("/data/libraries"),
            native_dir: Path::new("/app/lib"),
            cache_dir: Path::new("/data/cache"),
            library_path: "/rt/lib:/app/lib",
            classpath: "/data/a.jar:/data/b.jar",
            ram_allocation_mb: 2048,
            gl_library: None,
            custom_jvm_args: "",
            window: WindowSize {
                width: 1920,
                height: 1080,
            },
            server: None,
        }
    }

    #[test]
    fn jvm_args_drop_classpath_pairs_and_unresolved_tokens() {
        let manifest = manifest(
            r#"{"mainClass":"a.Main","arguments":{"game":[],"jvm":[
                "-XX:+UseG1GC","-cp","${classpath}",
                "-Djava.library.path=${natives_directory}",
                "-Dsomething=${unknown_placeholder}"]}}"#,
        );
        let account = Account::offline("Alex");
        let build = BuildInfo::default();
        let mut ctx = context(&manifest, &account, &build);
        ctx.custom_jvm_args = "  -XX:+UseZGC   -Dfoo=bar ";
        ctx.gl_library = Some("libgl4es_114.so");

        let args = jvm_args(&ctx);
        assert_eq!(&args[..2], &["-Xms2048M", "-Xmx2048M"]);
        assert!(args.contains(&"-XX:+UseG1GC".to_string()));
        let library_paths: Vec<_> = args
            .iter()
            .filter(|a| a.starts_with("-Djava.library.path="))
            .collect();
        assert_eq!(library_paths, vec!["-Djava.library.path=/rt/lib:/app/lib"]);
        assert!(!args.iter().any(|a| a == "-cp" || a.contains("${")));
        assert!(args.contains(&"-XX:+UseZGC".to_string()));
        assert_eq!(
            args.last().map(String::as_str),
            Some("-Dorg.lwjgl.opengl.libname=libgl4es_114.so")
        );
    }

    #[test]
    fn unresolved_option_keeps_the_argument_before_it() {
        let manifest = manifest(
            r#"{"mainClass":"a.Main","arguments":{"game":[],"jvm":[
                "-XX:+UseG1GC","-Dfoo=${unknown}","-Dbar=1"]}}"#,
        );
        let account = Account::offline("Alex");
        let build = BuildInfo::default();
        let args = jvm_args(&context(&manifest, &account, &build));

        let g1 = args.iter().position(|a| a == "-XX:+UseG1GC").unwrap();
        assert_eq!(args[g1 + 1], "-Dbar=1");
        assert!(!args.iter().any(|a| a.starts_with("-Dfoo")));
    }

    #[test]
    fn unresolved_value_drops_its_option() {
        let manifest = manifest(
            r#"{"mainClass":"a.Main","arguments":{"jvm":[],"game":[
                "--demo","--clientId","${clientid}","--foo","bar"]}}"#,
        );
        let account = Account::offline("Alex");
        let build = BuildInfo::default();
        let args = game_args(&context(&manifest, &account, &build));

        assert_eq!(&args[..3], &["--demo", "--foo", "bar"]);
    }

    #[test]
    fn legacy_game_args_resolve_placeholders_and_window_size() {
        let manifest = manifest(
            r#"{"mainClass":"net.minecraft.client.main.Main","assetIndex":{"id":"1.12"},
                "minecraftArguments":"--username ${auth_player_name} --version ${version_name} --assetIndex ${assets_index_name} --uuid ${auth_uuid} --clientId ${clientid} --userType ${user_type}"}"#,
        );
        let account = Account::offline("Alex");
        let build = BuildInfo::default();
        let args = game_args(&context(&manifest, &account, &build));

        assert_eq!(
            args,
            vec![
                "--username",
                "Alex",
                "--version",
                "1.20.1",
                "--assetIndex",
                "1.12",
                "--uuid",
                "00000000000000000000000000000000",
                "--userType",
                "legacy",
                "--width",
                "1920",
                "--height",
                "1080",
            ]
        );
    }

    #[test]
    fn server_join_uses_quick_play_when_declared() {
        let modern = manifest(
            r#"{"mainClass":"a.Main","arguments":{"jvm":[],"game":[
                {"rules":[{"action":"allow","features":{"is_quick_play_multiplayer":true}}],
                 "value":["--quickPlayMultiplayer","${quickPlayMultiplayer}"]}]}}"#,
        );
        let legacy = manifest(r#"{"mainClass":"a.Main","minecraftArguments":""}"#);
        let account = Account::offline("Alex");
        let build = BuildInfo::default();

        let mut ctx = context(&modern, &account, &build);
        ctx.server = Some("play.example.net");
        let args = game_args(&ctx);
        assert_eq!(
            &args[args.len() - 2..],
            &["--quickPlayMultiplayer", "play.example.net:25565"]
        );

        let mut ctx = context(&legacy, &account, &build);
        ctx.server = Some("10.0.0.2:25570");
        let args = game_args(&ctx);
        assert_eq!(
            &args[args.len() - 4..],
            &["--server", "10.0.0.2", "--port", "25570"]
        );
    }

    #[test]
    fn invalid_window_pairs_are_replaced() {
        let args = sanitize_numeric_window_args(vec![
            "--width".into(),
            "--height".into(),
            "480".into(),
        ]);
        assert_eq!(args, vec!["--height", "480"]);

        let mut args = args;
        set_window_size(&mut args, WindowSize::default());
        assert_eq!(args, vec!["--height", "720", "--width", "1280"]);
    }
}
