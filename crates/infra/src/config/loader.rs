//! Configuration loader
//!
//! ## Loading Strategy
//! 1. `CACHEFRONT_CONFIG` names an explicit file
//! 2. Otherwise the first file found by [`probe_config_paths`]
//! 3. Otherwise built-in defaults (no caches, `info` logging)
//!
//! Logging overrides from the environment are applied last, then the result
//! is validated.
//!
//! ## Environment Variables
//! - `CACHEFRONT_CONFIG`: config file path
//! - `CACHEFRONT_LOG_LEVEL`: filter directive replacing `logging.level`
//! - `CACHEFRONT_LOG_JSON`: JSON log output (true/false)

use std::path::{Path, PathBuf};

use cachefront_domain::{AppConfig, CacheError, CacheResult};

pub const CONFIG_PATH_ENV: &str = "CACHEFRONT_CONFIG";
pub const LOG_LEVEL_ENV: &str = "CACHEFRONT_LOG_LEVEL";
pub const LOG_JSON_ENV: &str = "CACHEFRONT_LOG_JSON";

const CONFIG_FILE_NAMES: [&str; 4] =
    ["cachefront.toml", "cachefront.json", "config.toml", "config.json"];

/// Load configuration with the fallback strategy in the module docs
///
/// # Errors
/// Returns a configuration error if a named or probed file cannot be read or
/// parsed, or if the result fails validation.
pub fn load() -> CacheResult<AppConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from {CONFIG_PATH_ENV}");
            Ok(config)
        }
        Err(e) if std::env::var_os(CONFIG_PATH_ENV).is_some() => Err(e),
        Err(e) => {
            tracing::debug!(error = %e, "No config in environment, probing for a file");
            let config = match probe_config_paths() {
                Some(path) => load_from_file(Some(path))?,
                None => {
                    tracing::info!("No config file found, using defaults");
                    AppConfig::default()
                }
            };
            finish(config)
        }
    }
}

/// Load the file named by `CACHEFRONT_CONFIG`, with environment overrides
///
/// # Errors
/// Returns a configuration error if the variable is unset or the file is
/// missing or invalid.
pub fn load_from_env() -> CacheResult<AppConfig> {
    let path = env_var(CONFIG_PATH_ENV)?;
    finish(load_from_file(Some(PathBuf::from(path)))?)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Format is picked by
/// extension (`.toml` or `.json`). No environment overrides are applied.
///
/// # Errors
/// Returns a configuration error if no file is found or it cannot be parsed.
pub fn load_from_file(path: Option<PathBuf>) -> CacheResult<AppConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CacheError::configuration(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CacheError::configuration("No config file found in any of the standard locations")
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CacheError::configuration(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> CacheResult<AppConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CacheError::configuration(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CacheError::configuration(format!("Invalid JSON format: {e}"))),
        _ => Err(CacheError::configuration(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file in the working directory, its `config/`
/// subdirectory, its parent, or next to the executable
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.extend([cwd.join("config"), cwd.join(".."), cwd]);
        dirs.rotate_right(1);
    }

    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn finish(mut config: AppConfig) -> CacheResult<AppConfig> {
    apply_env_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
        config.logging.level = level;
    }
    config.logging.json = env_bool(LOG_JSON_ENV, config.logging.json);
}

fn env_var(key: &str) -> CacheResult<String> {
    std::env::var(key).map_err(|_| {
        CacheError::configuration(format!("Missing required environment variable: {key}"))
    })
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
