use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::env::{load_vars_file, EnvMap, SubstitutionContext};

use super::loader::{LoadedConfig, ProfileConfig, RunnerConfig};
use super::settings::StepSettings;

fn resolve_relative(base: &Path, value: &str) -> PathBuf {
    let candidate = Path::new(value);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}

/// Everything a run needs before resolution: the raw step settings and the
/// ad-hoc variables that make up the first substitution layer.
#[derive(Debug, Clone, Default)]
pub struct RunInputs {
    pub settings: StepSettings,
    pub variables: EnvMap,
    pub vars_files: Vec<PathBuf>,
    pub profile_name: Option<String>,
}

impl RunInputs {
    /// A fresh substitution context. The environment layer is read from the
    /// process at call time, so every run sees the current values.
    pub fn context(&self) -> SubstitutionContext {
        SubstitutionContext::with_process_env(self.variables.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunInputsBuilder {
    config: Option<LoadedConfig>,
    requested_profile: Option<String>,
    explicit_vars_file: Option<PathBuf>,
    overrides: StepSettings,
    cli_variables: Vec<(String, String)>,
}

impl RunInputsBuilder {
    pub fn new(config: Option<LoadedConfig>) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn profile(mut self, profile: Option<String>) -> Self {
        self.requested_profile = profile;
        self
    }

    pub fn vars_file(mut self, path: Option<PathBuf>) -> Self {
        self.explicit_vars_file = path;
        self
    }

    pub fn overrides(mut self, settings: StepSettings) -> Self {
        self.overrides = settings;
        self
    }

    pub fn variables(mut self, variables: Vec<(String, String)>) -> Self {
        self.cli_variables = variables;
        self
    }

    pub fn build(&self) -> Result<RunInputs> {
        let mut settings = StepSettings::default();
        let mut variables = EnvMap::new();
        let mut vars_files = Vec::new();
        let mut profile_name = None;
        let mut vars_path = self.explicit_vars_file.clone();

        if let Some(loaded) = &self.config {
            let cfg = &loaded.config;
            settings = settings.overlay(&cfg.step);
            variables.extend(cfg.variables.clone());

            let profile = resolve_profile(cfg, self.requested_profile.as_deref())?;
            if let Some((name, profile)) = profile {
                profile_name = Some(name.to_string());
                settings = settings.overlay(&profile.step);
                variables.extend(profile.variables.clone());
                if vars_path.is_none() {
                    vars_path = profile.env.as_deref().map(|p| resolve_relative(&loaded.dir, p));
                }
            }

            if vars_path.is_none() {
                vars_path = cfg.env.as_deref().map(|p| resolve_relative(&loaded.dir, p));
            }
        } else if let Some(name) = &self.requested_profile {
            bail!("Unknown profile: {name} (no configuration file found)");
        }

        if let Some(path) = vars_path {
            vars_files.push(load_vars_file(&path, &mut variables)?);
        }

        variables.extend(self.cli_variables.iter().cloned());
        settings = settings.overlay(&self.overrides);

        Ok(RunInputs {
            settings,
            variables,
            vars_files,
            profile_name,
        })
    }
}

fn resolve_profile<'a>(
    config: &'a RunnerConfig,
    requested: Option<&str>,
) -> Result<Option<(&'a str, &'a ProfileConfig)>> {
    if let Some(name) = requested {
        if let Some((key, profile)) = config.profiles.get_key_value(name) {
            return Ok(Some((key.as_str(), profile)));
        }
        let mut available: Vec<_> = config.profiles.keys().map(String::as_str).collect();
        available.sort_unstable();
        bail!(
            "Unknown profile: {name} (available: {})",
            if available.is_empty() {
                "none".to_string()
            } else {
                available.join(", ")
            }
        );
    }

    if let Some(default) = &config.default_profile {
        if let Some((key, profile)) = config.profiles.get_key_value(default) {
            return Ok(Some((key.as_str(), profile)));
        }
        bail!("Default profile {default} is not defined");
    }

    Ok(None)
}
