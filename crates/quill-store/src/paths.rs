use std::path::{Component, Path, PathBuf};

use crate::error::StoreError;

/// Directory under the workspace root holding session files.
pub const SESSIONS_DIR: &str = ".quill/sessions";

/// Directory under the workspace root holding the JSONL event log.
pub const LOGS_DIR: &str = ".quill/logs";

/// Reserved file name for the unnamed/main session. Project files carry the
/// `project_` prefix, so no sanitized project name can collide with this.
pub const MAIN_SESSION_FILE: &str = "main.json";

/// Lowercase a project name and replace anything outside `[a-z0-9_-]` with
/// `_`, so it is safe as a file name component.
pub fn sanitize_project_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Path helpers for one workspace root.
#[derive(Clone, Debug)]
pub struct SessionPaths {
    workspace_root: PathBuf,
}

impl SessionPaths {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.workspace_root.join(SESSIONS_DIR)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.workspace_root.join(LOGS_DIR)
    }

    /// On-disk session file for a project (or the reserved main file).
    pub fn session_file(&self, project_name: Option<&str>) -> PathBuf {
        match project_name {
            Some(name) => self
                .sessions_dir()
                .join(format!("project_{}.json", sanitize_project_name(name))),
            None => self.sessions_dir().join(MAIN_SESSION_FILE),
        }
    }

    /// Project working directory: workspace root + sanitized project name.
    pub fn project_dir(&self, project_name: &str) -> PathBuf {
        self.workspace_root.join(sanitize_project_name(project_name))
    }

    /// Reject any path that resolves outside the workspace root. Checked
    /// lexically so it works for paths that do not exist yet.
    pub fn ensure_within_root(&self, path: &Path) -> Result<(), StoreError> {
        let normalized = normalize(path);
        let root = normalize(&self.workspace_root);
        if normalized.starts_with(&root) {
            Ok(())
        } else {
            Err(StoreError::OutsideWorkspace(path.display().to_string()))
        }
    }
}

/// Lexical normalization: resolves `.` and `..` components without touching
/// the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
