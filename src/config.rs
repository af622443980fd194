use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{DevframeError, DevframeResult};

pub const CONFIG_FILE_NAME: &str = "devframe.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the key/value files. Falls back to the platform data dir.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Key under which the custom device list is stored.
    #[serde(default = "default_storage_key")]
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: None,
            key: default_storage_key(),
        }
    }
}

impl StorageConfig {
    /// `dir` if set, else `<data_local_dir>/Devframe`, else the working directory.
    pub fn resolved_dir(&self) -> PathBuf {
        if let Some(dir) = &self.dir {
            return dir.clone();
        }
        dirs::data_local_dir()
            .map(|d| d.join("Devframe"))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn default_storage_key() -> String {
    "customDevices".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Width of the degraded screen rectangle, as a fraction of the display box.
    #[serde(default = "default_fallback_width")]
    pub fallback_width_fraction: f64,
    #[serde(default = "default_fallback_height")]
    pub fallback_height_fraction: f64,
    /// Upper bound for the on-screen width of a landscape custom frame.
    #[serde(default = "default_max_frame_width")]
    pub max_frame_width: f64,
    /// Upper bound for the on-screen height of a portrait custom frame.
    #[serde(default = "default_max_frame_height")]
    pub max_frame_height: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fallback_width_fraction: default_fallback_width(),
            fallback_height_fraction: default_fallback_height(),
            max_frame_width: default_max_frame_width(),
            max_frame_height: default_max_frame_height(),
        }
    }
}

fn default_fallback_width() -> f64 {
    0.8
}

fn default_fallback_height() -> f64 {
    0.6
}

fn default_max_frame_width() -> f64 {
    400.0
}

fn default_max_frame_height() -> f64 {
    600.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Pixel ratio handed to the rasterizer.
    #[serde(default = "default_export_scale")]
    pub scale: f32,
    /// Builtin device shown at start-up and after the displayed custom device is deleted.
    #[serde(default = "default_device")]
    pub default_device: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            scale: default_export_scale(),
            default_device: default_device(),
        }
    }
}

fn default_export_scale() -> f32 {
    2.0
}

fn default_device() -> String {
    "iphone".to_string()
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var("DEVFRAME_CONFIG") {
        let candidate = PathBuf::from(explicit);
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config taken from DEVFRAME_CONFIG");
            return Some(candidate);
        }
        tracing::warn!(path = %candidate.display(), "DEVFRAME_CONFIG points to a missing file");
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Some(candidate);
            }
        }
    }

    let candidate = std::env::current_dir().ok()?.join(CONFIG_FILE_NAME);
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Some(candidate);
    }
    None
}

pub fn load_config_from(path: &std::path::Path) -> DevframeResult<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    config.validate()?;
    tracing::info!(path = %path.display(), storage_key = %config.storage.key, "config loaded");
    Ok(config)
}

/// Loads `devframe.toml` if one can be found; defaults otherwise.
pub fn load_config() -> DevframeResult<AppConfig> {
    match resolve_config_path() {
        Some(path) => load_config_from(&path),
        None => {
            tracing::info!("no {CONFIG_FILE_NAME} found, using defaults");
            Ok(AppConfig::default())
        }
    }
}

pub fn save_config(config: &AppConfig, path: &std::path::Path) -> DevframeResult<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}

impl AppConfig {
    pub fn validate(&self) -> DevframeResult<()> {
        let r = &self.render;
        for (name, v) in [
            ("render.fallback_width_fraction", r.fallback_width_fraction),
            ("render.fallback_height_fraction", r.fallback_height_fraction),
        ] {
            if !(v > 0.0 && v <= 1.0) {
                return Err(DevframeError::Config(format!("{name} must be in (0, 1], got {v}")));
            }
        }
        for (name, v) in [
            ("render.max_frame_width", r.max_frame_width),
            ("render.max_frame_height", r.max_frame_height),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(DevframeError::Config(format!("{name} must be positive, got {v}")));
            }
        }
        if !(self.export.scale.is_finite() && self.export.scale > 0.0) {
            return Err(DevframeError::Config("export.scale must be positive".into()));
        }
        if self.storage.key.trim().is_empty() {
            return Err(DevframeError::Config("storage.key must not be empty".into()));
        }
        Ok(())
    }
}
