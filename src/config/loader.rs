use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

use super::settings::StepSettings;

pub const CONFIG_FILE_NAME: &str = "jaas.json";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProfileConfig {
    pub env: Option<String>,
    pub variables: HashMap<String, String>,
    #[serde(flatten)]
    pub step: StepSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RunnerConfig {
    pub profiles: HashMap<String, ProfileConfig>,
    pub variables: HashMap<String, String>,
    #[serde(rename = "defaultProfile")]
    pub default_profile: Option<String>,
    pub env: Option<String>,
    #[serde(flatten)]
    pub step: StepSettings,
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: RunnerConfig,
    pub path: PathBuf,
    pub dir: PathBuf,
}

/// Loads `jaas.json` from `target`, which may name the file itself or the
/// directory holding it. A missing file is not an error.
pub fn load_config(target: &Path) -> Result<Option<LoadedConfig>> {
    let resolved = if target.is_absolute() {
        target.to_path_buf()
    } else {
        std::env::current_dir()?.join(target)
    };

    let (file_path, dir) = if resolved.is_dir() {
        (resolved.join(CONFIG_FILE_NAME), resolved)
    } else {
        let dir = match resolved.parent() {
            Some(parent) => parent.to_path_buf(),
            None => std::env::current_dir()?,
        };
        (resolved, dir)
    };

    if !file_path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(&file_path)
        .with_context(|| format!("reading config {}", file_path.display()))?;

    let config: RunnerConfig = serde_json::from_str(&contents)
        .with_context(|| format!("parsing config {}", file_path.display()))?;

    Ok(Some(LoadedConfig {
        config,
        path: file_path,
        dir,
    }))
}
