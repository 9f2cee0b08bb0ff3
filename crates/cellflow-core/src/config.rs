//! Engine configuration loaded from `engine.toml`.
//!
//! ```toml
//! recalc_order = "topological"   # or "discovery"
//! max_range_cells = 1000000
//! ```
//!
//! Every field is optional. Unknown keys are rejected so typos surface as
//! warnings instead of being silently ignored.

use std::path::{Path, PathBuf};

use cellflow_engine::engine::EngineConfig;
use directories::ProjectDirs;
use tracing::warn;

use crate::error::Result;

const MAX_CONFIG_FILE_BYTES: u64 = 1_048_576; // 1 MiB

/// Parse configuration text, failing on malformed TOML or unknown keys.
///
/// Values are returned as written; [`load_config`] and
/// [`Document::with_config`](crate::Document::with_config) sanitize them.
pub fn parse_config(text: &str) -> Result<EngineConfig> {
    Ok(toml::from_str::<EngineConfig>(text)?)
}

/// Where `engine.toml` lives when no explicit path is given.
pub fn default_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "cellflow")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("engine.toml");
    Some(path)
}

/// Load configuration from `config_file`, or from the default location.
///
/// Never fails: problems are returned as human-readable warnings (and logged)
/// and the defaults are used instead. A missing default file is not a
/// problem; a missing explicit file is.
pub fn load_config(config_file: Option<&Path>) -> (EngineConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();
    let config_path = config_file.map(Path::to_path_buf).or_else(default_config_path);
    let mut config = EngineConfig::default();

    if let Some(path) = config_path.as_ref() {
        if path.exists() {
            match std::fs::metadata(path) {
                Ok(meta) if meta.len() > MAX_CONFIG_FILE_BYTES => {
                    warnings.push(format!(
                        "Refusing to read {}: file too large ({} bytes, max {})",
                        path.display(),
                        meta.len(),
                        MAX_CONFIG_FILE_BYTES
                    ));
                }
                Ok(_) => match std::fs::read_to_string(path) {
                    Ok(content) => match parse_config(&content) {
                        Ok(parsed) => config = parsed,
                        Err(err) => {
                            warnings.push(format!("Failed to parse {}: {}", path.display(), err))
                        }
                    },
                    Err(err) => {
                        warnings.push(format!("Failed to read {}: {}", path.display(), err))
                    }
                },
                Err(err) => warnings.push(format!(
                    "Failed to read metadata for {}: {}",
                    path.display(),
                    err
                )),
            }
        } else if config_file.is_some() {
            warnings.push(format!("Config file not found: {}", path.display()));
        }
    }

    warnings.extend(config.sanitize());

    for warning in &warnings {
        warn!("{}", warning);
    }
    (config, warnings)
}
