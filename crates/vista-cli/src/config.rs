//! Configuration Vault – reads/writes `~/.vista/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use vista_perception::PerceptionConfig;

/// Persisted user configuration stored in `~/.vista/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory searched for fixtures given by bare file name.
    #[serde(default = "default_fixture_dir")]
    pub fixture_dir: String,

    /// Buffered events per bus topic before slow listeners lag.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Thresholds, caps, timeout and phrase table for the engine.
    #[serde(default)]
    pub perception: PerceptionConfig,
}

fn default_fixture_dir() -> String {
    "fixtures".to_string()
}
fn default_event_capacity() -> usize {
    64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fixture_dir: default_fixture_dir(),
            event_capacity: default_event_capacity(),
            perception: PerceptionConfig::default(),
        }
    }
}

/// Return the path to `~/.vista/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".vista").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path.
///
/// Environment overrides are applied on top, then the perception section is
/// validated.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    cfg.perception
        .validate()
        .map_err(|e| format!("Invalid perception settings: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `VISTA_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `VISTA_DETECTOR_FLOOR` | `perception.detector_confidence_floor` |
/// | `VISTA_CLASSIFIER_FLOOR` | `perception.classifier_confidence_floor` |
/// | `VISTA_SNAPSHOT_CAP` | `perception.snapshot_cap` |
/// | `VISTA_TOP_N` | `perception.description_top_n` |
/// | `VISTA_BRANCH_TIMEOUT_MS` | `perception.branch_timeout_ms` |
/// | `VISTA_VERBOSE` | `perception.include_confidence` (`1`/`true`) |
///
/// Values that fail to parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides_from(cfg, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides_from(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let p = &mut cfg.perception;
    if let Some(v) = lookup("VISTA_DETECTOR_FLOOR").and_then(|v| v.parse().ok()) {
        p.detector_confidence_floor = v;
    }
    if let Some(v) = lookup("VISTA_CLASSIFIER_FLOOR").and_then(|v| v.parse().ok()) {
        p.classifier_confidence_floor = v;
    }
    if let Some(v) = lookup("VISTA_SNAPSHOT_CAP").and_then(|v| v.parse().ok()) {
        p.snapshot_cap = v;
    }
    if let Some(v) = lookup("VISTA_TOP_N").and_then(|v| v.parse().ok()) {
        p.description_top_n = v;
    }
    if let Some(v) = lookup("VISTA_BRANCH_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        p.branch_timeout_ms = v;
    }
    if let Some(v) = lookup("VISTA_VERBOSE") {
        match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => p.include_confidence = true,
            "0" | "false" | "no" => p.include_confidence = false,
            _ => {}
        }
    }
}

/// Save the config to disk, creating `~/.vista/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        // Owner-only (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
