//! Configuration loading
//!
//! Reads [`AppConfig`](cachefront_domain::AppConfig) from TOML or JSON files
//! and applies environment overrides.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
