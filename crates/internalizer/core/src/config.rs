//! Configuration loading with file and env overrides.
//!
//! The loading process:
//! 1. Start from defaults
//! 2. Read `internalizer.json` from the module root, or an explicit path
//! 3. Apply env var overrides (highest precedence)
//! 4. Validate
//!
//! Command-line flags are layered on top by the caller.

use crate::planner::DEFAULT_MARKER;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Filename looked up in the module root.
pub const LOCAL_FILE: &str = "internalizer.json";

pub const ENV_MARKER: &str = "INTERNALIZER_MARKER";
pub const ENV_ACCEPTED_PREFIXES: &str = "INTERNALIZER_ACCEPTED_PREFIXES";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InternalizerConfig {
    /// Name of the restricted directory segment.
    pub marker: String,
    /// Namespaces already accepted as restricted; moves landing under them are not reported.
    pub accepted_prefixes: Vec<String>,
    /// Globs of module-relative paths to leave out of the walk.
    pub exclude: Vec<String>,
    /// Also walk `vendor`, `testdata` and `.`/`_`-prefixed entries.
    pub include_ignored_dirs: bool,
}

impl Default for InternalizerConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            accepted_prefixes: Vec::new(),
            exclude: Vec::new(),
            include_ignored_dirs: false,
        }
    }
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: InternalizerConfig,
    /// The file that was read, if any.
    pub source: Option<PathBuf>,
}

/// Load configuration for the module at `module_dir`.
///
/// An explicit `path` must exist; the implicit `internalizer.json` is optional.
pub fn load(module_dir: &Path, path: Option<&Path>) -> Result<LoadedConfig> {
    let (mut config, source) = match path {
        Some(p) => {
            if !p.is_file() {
                anyhow::bail!("Config file not found: {}", p.display());
            }
            (read_config(p)?, Some(p.to_path_buf()))
        }
        None => {
            let local = module_dir.join(LOCAL_FILE);
            if local.is_file() {
                (read_config(&local)?, Some(local))
            } else {
                (InternalizerConfig::default(), None)
            }
        }
    };

    apply_env_overrides(&mut config);
    validate(&config)?;

    if let Some(src) = &source {
        tracing::debug!("Loaded config from {}", src.display());
    }
    Ok(LoadedConfig { config, source })
}

fn read_config(path: &Path) -> Result<InternalizerConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    if !value.is_object() {
        anyhow::bail!("Config root must be a JSON object: {}", path.display());
    }
    serde_json::from_value(value)
        .with_context(|| format!("Failed to deserialize config {}", path.display()))
}

/// Apply environment variable overrides to the config.
fn apply_env_overrides(cfg: &mut InternalizerConfig) {
    if let Some(v) = env_trimmed(ENV_MARKER) {
        cfg.marker = v;
    }
    if let Some(v) = env_trimmed(ENV_ACCEPTED_PREFIXES) {
        cfg.accepted_prefixes = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }
}

/// Helper to read and normalize an env var (trim + filter empty).
fn env_trimmed(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Check the settings the planner relies on.
pub fn validate(cfg: &InternalizerConfig) -> Result<()> {
    validate_marker(&cfg.marker)
}

/// The marker must be exactly one path segment.
pub fn validate_marker(marker: &str) -> Result<()> {
    if marker.is_empty() || marker == "." || marker == ".." || marker.contains('/') {
        anyhow::bail!("Invalid marker {marker:?}: must be a single path segment");
    }
    Ok(())
}
