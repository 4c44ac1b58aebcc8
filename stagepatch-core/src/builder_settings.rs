//! Cocos Creator builder settings
//!
//! Patches `settings/builder.json` and `local/builder.json` of a Cocos
//! project before the native export. Fields not listed here are preserved,
//! as is their order.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};

/// Values written into the two builder files
#[derive(Debug, Clone)]
pub struct BuilderPatch {
    /// Script encryption key (`xxteaKey`), supplied by the pipeline
    pub xxtea_key: String,
    /// Target platform for `platform` and `actualPlatform`
    pub platform: String,
    /// Export directory, relative to the project
    pub build_path: String,
    /// Native template name
    pub template: String,
}

impl BuilderPatch {
    pub fn new(xxtea_key: impl Into<String>) -> Self {
        Self {
            xxtea_key: xxtea_key.into(),
            platform: "ios".to_string(),
            build_path: "./build".to_string(),
            template: "default".to_string(),
        }
    }

    /// Release settings shared by every build of the project
    fn apply_settings(&self, settings: &mut Map<String, Value>) {
        settings.insert("xxteaKey".into(), json!(self.xxtea_key));
        settings.insert("inlineSpriteFrames".into(), json!(true));
        settings.insert("inlineSpriteFrames_native".into(), json!(true));
        settings.insert("md5Cache".into(), json!(false));
        settings.insert("encryptJs".into(), json!(true));
        settings.insert("zipCompressJs".into(), json!(true));
        settings.insert(
            "orientation".into(),
            json!({
                "landscapeLeft": true,
                "landscapeRight": true,
                "portrait": true,
                "upsideDown": true
            }),
        );
    }

    /// Machine-local build target
    fn apply_local(&self, local: &mut Map<String, Value>) {
        local.insert("actualPlatform".into(), json!(self.platform));
        local.insert("platform".into(), json!(self.platform));
        local.insert("buildPath".into(), json!(self.build_path));
        local.insert("debug".into(), json!(false));
        local.insert("sourceMaps".into(), json!(false));
        local.insert("template".into(), json!(self.template));
    }
}

/// Errors raised while patching builder settings
#[derive(Debug, thiserror::Error)]
pub enum BuilderSettingsError {
    #[error("Builder settings not found at {0}")]
    NotFound(String),

    #[error("Failed to access {path}: {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    ParseError {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} does not contain a JSON object")]
    NotAnObject(String),

    #[error("Encryption key must not be empty")]
    EmptyKey,
}

/// Files touched by `patch_builder_settings`
#[derive(Debug, Clone)]
pub struct BuilderSettingsReport {
    pub settings_path: PathBuf,
    pub local_path: PathBuf,
}

/// `<project>/settings/builder.json`
pub fn settings_path(project_dir: &Path) -> PathBuf {
    project_dir.join("settings").join("builder.json")
}

/// `<project>/local/builder.json`
pub fn local_path(project_dir: &Path) -> PathBuf {
    project_dir.join("local").join("builder.json")
}

/// Patch both builder files of the project at `project_dir`.
///
/// Both files are checked for existence before either one is written.
pub fn patch_builder_settings(
    project_dir: &Path,
    patch: &BuilderPatch,
) -> Result<BuilderSettingsReport, BuilderSettingsError> {
    if patch.xxtea_key.is_empty() {
        return Err(BuilderSettingsError::EmptyKey);
    }

    let settings = settings_path(project_dir);
    let local = local_path(project_dir);
    for path in [&settings, &local] {
        if !path.is_file() {
            return Err(BuilderSettingsError::NotFound(path.display().to_string()));
        }
    }

    patch_json_file(&settings, |object| patch.apply_settings(object))?;
    tracing::info!("Updated {}", settings.display());

    patch_json_file(&local, |object| patch.apply_local(object))?;
    tracing::info!("Updated {}", local.display());

    Ok(BuilderSettingsReport {
        settings_path: settings,
        local_path: local,
    })
}

fn patch_json_file(
    path: &Path,
    apply: impl FnOnce(&mut Map<String, Value>),
) -> Result<(), BuilderSettingsError> {
    let display = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|source| BuilderSettingsError::IoError {
        path: display.clone(),
        source,
    })?;

    let mut value: Value =
        serde_json::from_str(&content).map_err(|source| BuilderSettingsError::ParseError {
            path: display.clone(),
            source,
        })?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| BuilderSettingsError::NotAnObject(display.clone()))?;
    apply(object);

    let output = serde_json::to_string_pretty(&value).map_err(|source| {
        BuilderSettingsError::ParseError {
            path: display.clone(),
            source,
        }
    })?;
    fs::write(path, output).map_err(|source| BuilderSettingsError::IoError {
        path: display,
        source,
    })
}
