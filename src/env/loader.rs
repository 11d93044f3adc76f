use std::{
    fs,
    io::Cursor,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};

use crate::env::EnvMap;

/// Merges a dotenv-style vars file into `vars`; later keys win.
pub fn load_vars_file(path: &Path, vars: &mut EnvMap) -> Result<PathBuf> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading vars file {}", path.display()))?;

    for item in dotenvy::from_read_iter(Cursor::new(content)) {
        let (key, value) = item.with_context(|| format!("parsing vars file {}", path.display()))?;
        vars.insert(key, value);
    }

    Ok(path.to_path_buf())
}

/// Parses a `KEY=VALUE` pair as given on the command line.
pub fn parse_assignment(raw: &str) -> Result<(String, String)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("expected KEY=VALUE, got '{raw}'");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("variable name missing in '{raw}'");
    }
    Ok((key.to_string(), value.to_string()))
}
