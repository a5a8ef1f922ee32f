//! Workspace lifecycle management
//!
//! Every execution attempt gets its own uniquely named directory holding the
//! source file, build artifacts and the stdin file. Directories are removed
//! once the outcome is captured.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::language::LanguageProfile;

/// How many fresh names to try before giving up on a collision streak
const MAX_CREATE_ATTEMPTS: u32 = 8;

/// Errors that occur while creating or tearing down workspaces
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace at {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove workspace at {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("could not find a free workspace name after {0} attempts")]
    Exhausted(u32),
}

/// Creates per-attempt workspaces under a root directory
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    /// Manage workspaces under `root`
    ///
    /// A relative root is resolved against the current directory here, since
    /// build and run steps execute with the workspace as their cwd.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh, empty workspace for one attempt in `profile`'s language
    #[instrument(skip(self, profile), fields(language = profile.id))]
    pub async fn acquire(&self, profile: &LanguageProfile) -> Result<Workspace, WorkspaceError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| WorkspaceError::Create {
                path: self.root.clone(),
                source,
            })?;

        for _ in 0..MAX_CREATE_ATTEMPTS {
            let id = workspace_id(profile.id);
            let path = self.root.join(&id);

            // create_dir fails on an existing directory, so two attempts can
            // never end up sharing one.
            match tokio::fs::create_dir(&path).await {
                Ok(()) => {
                    debug!(?path, "workspace created");
                    return Ok(Workspace {
                        id,
                        path,
                        released: false,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(?path, "workspace name taken, retrying");
                }
                Err(source) => return Err(WorkspaceError::Create { path, source }),
            }
        }

        Err(WorkspaceError::Exhausted(MAX_CREATE_ATTEMPTS))
    }
}

/// `<language>_<unix millis>_<16 hex digits>`
fn workspace_id(language: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{language}_{millis}_{:016x}", fastrand::u64(..))
}

/// A directory exclusively owned by one execution attempt
///
/// # Cleanup
///
/// Call [`release()`](Self::release) once the outcome is captured. If the
/// workspace is dropped without being released (early return, panic, or a
/// cancelled future) the directory is removed synchronously in `Drop` and a
/// warning is logged.
#[derive(Debug)]
pub struct Workspace {
    id: String,
    path: PathBuf,
    released: bool,
}

impl Workspace {
    /// Unique identifier, also the directory name
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the path to a file inside the workspace
    ///
    /// Returns an error if the name would escape the workspace.
    pub fn file_path(&self, name: &str) -> Result<PathBuf, WorkspaceError> {
        if name.is_empty() || name.contains("..") || name.starts_with('/') {
            return Err(WorkspaceError::InvalidPath(format!(
                "path traversal not allowed: {name}"
            )));
        }
        Ok(self.path.join(name))
    }

    /// Write a file into the workspace, returning its full path
    #[instrument(skip(self, content), fields(workspace = %self.id))]
    pub async fn write_file(&self, name: &str, content: &[u8]) -> Result<PathBuf, WorkspaceError> {
        let path = self.file_path(name)?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|source| WorkspaceError::Write {
                path: path.clone(),
                source,
            })?;
        debug!(?path, len = content.len(), "wrote file to workspace");
        Ok(path)
    }

    /// Check if a file exists in the workspace
    pub async fn file_exists(&self, name: &str) -> Result<bool, WorkspaceError> {
        let path = self.file_path(name)?;
        Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
    }

    /// Remove the workspace directory and everything in it
    ///
    /// A directory that is already gone counts as released.
    #[must_use = "release errors should be logged"]
    #[instrument(skip(self), fields(workspace = %self.id))]
    pub async fn release(mut self) -> Result<(), WorkspaceError> {
        self.released = true;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => {
                debug!("workspace released");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(WorkspaceError::Remove {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Check if the workspace is still awaiting release
    pub fn is_active(&self) -> bool {
        !self.released
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        warn!(
            workspace = %self.id,
            path = %self.path.display(),
            "workspace dropped without release, removing synchronously"
        );

        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(workspace = %self.id, error = %e, "best-effort workspace removal failed");
            }
        }
    }
}
