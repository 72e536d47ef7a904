//! Run logs under `.minions/runs/<run_id>/`.
//!
//! Each run writes `meta.json` (outcome and timing) and `tree.json` (the
//! full task arena, retired minions and knowledge included).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::arena::TaskArena;
use crate::core::status::Status;

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub run_id: String,
    pub goal: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub nodes: usize,
    pub model_calls: u32,
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct RunPaths {
    pub dir: PathBuf,
    pub meta_path: PathBuf,
    pub tree_path: PathBuf,
}

impl RunPaths {
    pub fn new(root: &Path, run_id: &str) -> Self {
        let dir = root.join(".minions").join("runs").join(run_id);
        Self {
            meta_path: dir.join("meta.json"),
            tree_path: dir.join("tree.json"),
            dir,
        }
    }
}

/// First `run-N` (N >= 1) with no directory yet.
pub fn next_run_id(root: &Path) -> String {
    (1u32..)
        .map(|n| format!("run-{n}"))
        .find(|id| !RunPaths::new(root, id).dir.exists())
        .unwrap_or_else(|| "run-overflow".to_string())
}

pub fn write_run(root: &Path, meta: &RunMeta, arena: &TaskArena) -> Result<RunPaths> {
    let paths = RunPaths::new(root, &meta.run_id);
    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create run dir {}", paths.dir.display()))?;
    write_json(&paths.meta_path, meta)?;
    write_json(&paths.tree_path, arena)?;
    Ok(paths)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value)
        .with_context(|| format!("serialize {}", path.display()))?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))
}
