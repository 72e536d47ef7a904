//! Scaffolding for the `.minions/` directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use super::config::{MinionsConfig, write_config};

const MINIONS_GITIGNORE: &str = "runs/\n";

/// Canonical paths within `.minions/` for a workspace root.
#[derive(Debug, Clone)]
pub struct MinionsPaths {
    pub root: PathBuf,
    pub minions_dir: PathBuf,
    pub config_path: PathBuf,
    pub runs_dir: PathBuf,
    pub gitignore_path: PathBuf,
}

impl MinionsPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let minions_dir = root.join(".minions");
        Self {
            config_path: minions_dir.join("config.toml"),
            runs_dir: minions_dir.join("runs"),
            gitignore_path: minions_dir.join(".gitignore"),
            minions_dir,
            root,
        }
    }
}

/// Create `.minions/` with a default config in `root`.
///
/// Fails if `.minions/` already exists unless `force` is set.
pub fn init_minions(root: &Path, force: bool) -> Result<MinionsPaths> {
    let paths = MinionsPaths::new(root);
    if paths.minions_dir.exists() && !paths.minions_dir.is_dir() {
        return Err(anyhow!("minions init: .minions exists but is not a directory"));
    }
    if paths.minions_dir.exists() && !force {
        return Err(anyhow!(
            "minions init: .minions already exists (use --force to overwrite)"
        ));
    }
    fs::create_dir_all(&paths.runs_dir)
        .with_context(|| format!("create directory {}", paths.runs_dir.display()))?;
    fs::write(&paths.gitignore_path, MINIONS_GITIGNORE)
        .with_context(|| format!("write {}", paths.gitignore_path.display()))?;
    write_config(&paths.config_path, &MinionsConfig::default())?;
    Ok(paths)
}
