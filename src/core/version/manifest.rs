// ─── Game Manifest ───
// Parses a version JSON and evaluates library and argument rules.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::MavenArtifact;

/// Major version assumed when the manifest does not declare one.
pub const DEFAULT_JAVA_MAJOR: u32 = 8;

/// OS name the mobile host reports to argument rules.
const HOST_OS_NAME: &str = "linux";

/// A parsed version JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameManifest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub inherits_from: Option<String>,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexInfo>,
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    /// Legacy `minecraftArguments` field (pre-1.13).
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub java_version: Option<JavaVersionInfo>,
    #[serde(default, rename = "type")]
    pub version_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    pub major_version: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndexInfo {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<serde_json::Value>,
    #[serde(default)]
    pub jvm: Vec<serde_json::Value>,
}

// ─── Library Entry with Rules ───

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryEntry {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Option<Vec<LibraryRule>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<LibraryArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryArtifact {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryRule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
}

impl LibraryRule {
    fn allows_only_osx(&self) -> bool {
        self.action == RuleAction::Allow
            && self
                .os
                .as_ref()
                .and_then(|os| os.name.as_deref())
                .is_some_and(|name| name == "osx")
    }
}

/// Library rules on this host are platform exclusions only: a library is
/// dropped when any rule is `allow` scoped to `osx`, otherwise it is kept.
pub fn library_included(rules: Option<&[LibraryRule]>) -> bool {
    match rules {
        None => true,
        Some(rules) => !rules.iter().any(LibraryRule::allows_only_osx),
    }
}

impl LibraryEntry {
    pub fn is_included(&self) -> bool {
        library_included(self.rules.as_deref())
    }

    /// Path of the artifact relative to the libraries root.
    ///
    /// `downloads.artifact.path` wins; otherwise the Maven layout of `name`.
    pub fn artifact_path(&self) -> LauncherResult<PathBuf> {
        if let Some(path) = self
            .downloads
            .as_ref()
            .and_then(|d| d.artifact.as_ref())
            .and_then(|a| a.path.as_deref())
            .filter(|p| !p.trim().is_empty())
        {
            return Ok(PathBuf::from(path));
        }
        Ok(MavenArtifact::parse(&self.name)?.local_path())
    }
}

/// Mod loaders the native side wants flagged through the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModLoader {
    Forge,
    NeoForge,
    Fabric,
    Quilt,
    OptiFine,
    LiteLoader,
}

impl ModLoader {
    pub fn env_key(self) -> &'static str {
        match self {
            ModLoader::Forge => "INST_FORGE",
            ModLoader::NeoForge => "INST_NEOFORGE",
            ModLoader::Fabric => "INST_FABRIC",
            ModLoader::Quilt => "INST_QUILT",
            ModLoader::OptiFine => "INST_OPTIFINE",
            ModLoader::LiteLoader => "INST_LITELOADER",
        }
    }

    fn from_library_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.starts_with("net.neoforged:") {
            Some(ModLoader::NeoForge)
        } else if lower.starts_with("net.minecraftforge:forge:")
            || lower.starts_with("net.minecraftforge:fmlloader:")
        {
            Some(ModLoader::Forge)
        } else if lower.starts_with("net.fabricmc:fabric-loader:") {
            Some(ModLoader::Fabric)
        } else if lower.starts_with("org.quiltmc:quilt-loader:") {
            Some(ModLoader::Quilt)
        } else if lower.starts_with("optifine:optifine:") {
            Some(ModLoader::OptiFine)
        } else if lower.starts_with("com.mumfrey:liteloader:") {
            Some(ModLoader::LiteLoader)
        } else {
            None
        }
    }
}

impl GameManifest {
    pub fn parse(name: &str, raw: &str) -> LauncherResult<Self> {
        serde_json::from_str(raw).map_err(|err| LauncherError::InvalidManifest {
            name: name.to_string(),
            reason: err.to_string(),
        })
    }

    pub fn load(path: &Path) -> LauncherResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| LauncherError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::parse(&name, &raw)
    }

    /// Required Java major version, `DEFAULT_JAVA_MAJOR` when undeclared.
    pub fn required_java_major(&self) -> u32 {
        self.java_version
            .as_ref()
            .map(|j| j.major_version)
            .unwrap_or(DEFAULT_JAVA_MAJOR)
    }

    pub fn asset_index_name(&self) -> &str {
        self.asset_index
            .as_ref()
            .map(|a| a.id.as_str())
            .or(self.assets.as_deref())
            .unwrap_or("legacy")
    }

    /// The first mod loader found among the declared libraries.
    pub fn declared_loader(&self) -> Option<ModLoader> {
        self.libraries
            .iter()
            .find_map(|lib| ModLoader::from_library_name(&lib.name))
    }

    /// Game arguments with rule-gated entries resolved for this host.
    pub fn game_args(&self) -> Vec<String> {
        match &self.arguments {
            Some(args) => args.game.iter().flat_map(extract_argument_values).collect(),
            None => match &self.minecraft_arguments {
                Some(s) => s.split_whitespace().map(|s| s.to_string()).collect(),
                None => vec![],
            },
        }
    }

    /// JVM arguments with rule-gated entries resolved for this host.
    pub fn jvm_args(&self) -> Vec<String> {
        match &self.arguments {
            Some(args) => args.jvm.iter().flat_map(extract_argument_values).collect(),
            None => vec![],
        }
    }
}

fn extract_argument_values(value: &serde_json::Value) -> Vec<String> {
    if let Some(arg) = value.as_str() {
        return vec![arg.to_string()];
    }

    let Some(obj) = value.as_object() else {
        return vec![];
    };

    if let Some(rules) = obj.get("rules").and_then(|r| r.as_array()) {
        if !argument_rules_allow(rules) {
            return vec![];
        }
    }

    match obj.get("value") {
        Some(serde_json::Value::String(s)) => vec![s.clone()],
        Some(serde_json::Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str().map(ToString::to_string))
            .collect(),
        _ => vec![],
    }
}

/// Mojang argument-rule evaluation: start disallowed, last matching rule wins.
/// Feature-gated rules never match since no optional features are enabled.
fn argument_rules_allow(rules: &[serde_json::Value]) -> bool {
    let mut allowed = false;

    for rule in rules {
        if rule.get("features").is_some() {
            continue;
        }

        let action = rule
            .get("action")
            .and_then(|v| v.as_str())
            .unwrap_or("disallow");

        let os_matches = match rule
            .get("os")
            .and_then(|os| os.get("name"))
            .and_then(|name| name.as_str())
        {
            None => true,
            Some(name) => name == HOST_OS_NAME,
        };

        if os_matches {
            allowed = action == "allow";
        }
    }

    allowed
}
