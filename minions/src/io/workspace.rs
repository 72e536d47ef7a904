//! Workspace filesystem access, confined to a single root directory.
//!
//! Every path handed to a [`Workspace`] is relative to the root. Absolute
//! paths and `..` components are rejected before touching the disk.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("workspace root {} is not a directory", .0.display())]
    NoWorkspace(PathBuf),
    #[error("path {0:?} must stay inside the workspace")]
    InvalidPath(String),
    #[error("{action} {path:?}: {source}")]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },
}

impl WorkspaceError {
    fn io(action: &'static str, path: &str, source: io::Error) -> Self {
        WorkspaceError::Io {
            action,
            path: path.to_string(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

pub trait Workspace {
    fn read_file(&self, path: &str) -> Result<String, WorkspaceError>;
    /// Direct children of a directory, sorted by name.
    fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, WorkspaceError>;
    /// Write a file, creating parent directories. Existing files are replaced.
    fn create_file(&self, path: &str, contents: &str) -> Result<(), WorkspaceError>;
    fn create_dir(&self, path: &str) -> Result<(), WorkspaceError>;
    fn move_path(&self, from: &str, to: &str) -> Result<(), WorkspaceError>;
}

/// [`Workspace`] backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct FsWorkspace {
    root: PathBuf,
}

impl FsWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, WorkspaceError> {
        if !self.root.is_dir() {
            return Err(WorkspaceError::NoWorkspace(self.root.clone()));
        }
        let mut resolved = self.root.clone();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(WorkspaceError::InvalidPath(relative.to_string()));
                }
            }
        }
        Ok(resolved)
    }
}

impl Workspace for FsWorkspace {
    fn read_file(&self, path: &str) -> Result<String, WorkspaceError> {
        let full = self.resolve(path)?;
        debug!(path, "read file");
        fs::read_to_string(&full).map_err(|err| WorkspaceError::io("read", path, err))
    }

    fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, WorkspaceError> {
        let full = self.resolve(path)?;
        let reader = fs::read_dir(&full).map_err(|err| WorkspaceError::io("list", path, err))?;
        let mut entries = Vec::new();
        for entry in reader {
            let entry = entry.map_err(|err| WorkspaceError::io("list", path, err))?;
            let file_type = entry
                .file_type()
                .map_err(|err| WorkspaceError::io("stat", path, err))?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind: if file_type.is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn create_file(&self, path: &str, contents: &str) -> Result<(), WorkspaceError> {
        let full = self.resolve(path)?;
        if full == self.root {
            return Err(WorkspaceError::InvalidPath(path.to_string()));
        }
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|err| WorkspaceError::io("create parent of", path, err))?;
        }
        debug!(path, bytes = contents.len(), "write file");
        fs::write(&full, contents).map_err(|err| WorkspaceError::io("write", path, err))
    }

    fn create_dir(&self, path: &str) -> Result<(), WorkspaceError> {
        let full = self.resolve(path)?;
        fs::create_dir_all(&full).map_err(|err| WorkspaceError::io("create directory", path, err))
    }

    fn move_path(&self, from: &str, to: &str) -> Result<(), WorkspaceError> {
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;
        if source == self.root || target == self.root {
            return Err(WorkspaceError::InvalidPath(format!("{from} -> {to}")));
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|err| WorkspaceError::io("create parent of", to, err))?;
        }
        debug!(from, to, "move path");
        fs::rename(&source, &target).map_err(|err| WorkspaceError::io("move", from, err))
    }
}

/// Join a workspace-relative directory and an entry name.
pub fn join_relative(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() || dir == "." {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}
