//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$TNEFKIT_CONFIG` (environment variable)
//! 2. `~/.config/tnefkit/config.toml` (Linux/macOS)
//!    `%APPDATA%\tnefkit\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TnefError};
use crate::export::ExportOptions;
use crate::parser::envelope::DEFAULT_MAX_DEPTH;
use crate::parser::lzfu::MAX_OUTPUT;
use crate::parser::DecoderOptions;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Decoder resource limits.
    pub decoder: DecoderConfig,
    /// Export defaults.
    pub export: ExportConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Decoder resource limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Maximum nesting depth of embedded messages (default: 8).
    pub max_depth: usize,
    /// Maximum decompressed RTF size in bytes (default: 67108864 = 64 MB).
    pub max_rtf_size: usize,
}

/// Export defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Default output directory for `extract`.
    pub output_dir: Option<PathBuf>,
    /// Rewrite `cid:` references in HTML bodies to `data:` URIs.
    pub resolve_content_ids: bool,
    /// Write the decompressed RTF body as `body.rtf`.
    pub include_rtf: bool,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_rtf_size: MAX_OUTPUT,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            resolve_content_ids: true,
            include_rtf: true,
        }
    }
}

// ── Conversions ─────────────────────────────────────────────────

impl DecoderConfig {
    /// Limits for [`crate::Decoder`]. The RTF ceiling never exceeds the
    /// built-in hard limit.
    pub fn options(&self) -> DecoderOptions {
        DecoderOptions {
            max_depth: self.max_depth,
            max_rtf_size: self.max_rtf_size.min(MAX_OUTPUT),
        }
    }
}

impl ExportConfig {
    pub fn options(&self) -> ExportOptions {
        ExportOptions {
            resolve_content_ids: self.resolve_content_ids,
            include_rtf: self.include_rtf,
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match load_config_from(&path) {
                Ok(cfg) => {
                    tracing::info!(path = %path.display(), "Loaded config");
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to load config, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Load configuration from an explicit path.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| TnefError::io(path, e))?;
    toml::from_str::<Config>(&contents).map_err(|e| TnefError::Config(e.to_string()))
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("TNEFKIT_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("tnefkit").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tnefkit")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("tnefkit.log")
}
