use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use quill_core::ids::SessionId;

use crate::error::StoreError;
use crate::paths::SessionPaths;

/// Session file schema version.
const SCHEMA_VERSION: &str = "1.0";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    /// Session file schema version.
    pub version: String,
    /// Version of the SRS document being authored.
    pub srs_version: String,
}

/// One project's working state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub session_context_id: SessionId,
    /// None denotes the unnamed/main session.
    pub project_name: Option<String>,
    /// Absolute path inside the workspace root. None for the main session.
    pub base_dir: Option<PathBuf>,
    pub active_files: Vec<PathBuf>,
    pub metadata: SessionMetadata,
}

impl Session {
    fn new(project_name: Option<String>, base_dir: Option<PathBuf>) -> Self {
        let now = Utc::now();
        Self {
            session_context_id: SessionId::new(),
            project_name,
            base_dir,
            active_files: Vec::new(),
            metadata: SessionMetadata {
                created: now,
                last_modified: now,
                version: SCHEMA_VERSION.to_string(),
                srs_version: "0.1.0".to_string(),
            },
        }
    }

    fn touch(&mut self) {
        self.metadata.last_modified = Utc::now();
    }
}

/// Result of `start_new_session`: persistence failure degrades to a
/// memory-only session instead of failing the operation.
#[derive(Debug)]
pub struct StartSessionResult {
    pub success: bool,
    pub session: Session,
    pub warning: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn Fn(Option<&Session>) + Send + Sync>;

/// Owns the current session for one workspace. Explicitly constructed and
/// injected — there is no process-global instance; tests build a fresh one
/// per case.
pub struct SessionManager {
    paths: SessionPaths,
    current: Mutex<Option<Session>>,
    observers: Mutex<Vec<(SubscriptionId, Observer)>>,
    next_subscription: AtomicU64,
}

impl SessionManager {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            paths: SessionPaths::new(workspace_root),
            current: Mutex::new(None),
            observers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    pub fn paths(&self) -> &SessionPaths {
        &self.paths
    }

    /// Register an observer. Observers are invoked synchronously, in
    /// registration order, with the new (possibly absent) session on every
    /// change. They must not call back into the manager.
    pub fn subscribe(&self, observer: impl Fn(Option<&Session>) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != before
    }

    fn notify(&self, session: Option<&Session>) {
        for (_, observer) in self.observers.lock().iter() {
            observer(session);
        }
    }

    /// Create a session, persist it, make it current, notify observers.
    /// Persistence happens before notification.
    #[instrument(skip(self))]
    pub fn create_new_session(&self, project_name: Option<&str>) -> Result<Session, StoreError> {
        let session = self.build_session(project_name)?;
        self.persist(&session)?;
        *self.current.lock() = Some(session.clone());
        self.notify(Some(&session));
        Ok(session)
    }

    /// Like `create_new_session`, but a failed persist still yields a usable
    /// in-memory session: a transient write failure must not take the
    /// working session down with it.
    #[instrument(skip(self))]
    pub fn start_new_session(&self, project_name: Option<&str>) -> Result<StartSessionResult, StoreError> {
        let session = self.build_session(project_name)?;
        let warning = match self.persist(&session) {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "session persist failed; continuing memory-only");
                Some(format!("session not persisted: {e}"))
            }
        };
        *self.current.lock() = Some(session.clone());
        self.notify(Some(&session));
        Ok(StartSessionResult {
            success: true,
            session,
            warning,
        })
    }

    pub fn get_current_session(&self) -> Option<Session> {
        self.current.lock().clone()
    }

    /// Load a previously persisted session and make it current.
    pub fn load_project(&self, project_name: Option<&str>) -> Result<Session, StoreError> {
        let file = self.paths.session_file(project_name);
        let raw = std::fs::read_to_string(&file)
            .map_err(|_| StoreError::NotFound(file.display().to_string()))?;
        let session: Session = serde_json::from_str(&raw)?;
        *self.current.lock() = Some(session.clone());
        self.notify(Some(&session));
        Ok(session)
    }

    /// Rename a project: backing file and project directory are renamed on
    /// the filesystem (never copied and deleted — history is preserved), and
    /// the in-memory session is updated in place. No partial rename is
    /// observable: any failure rolls the filesystem back.
    #[instrument(skip(self))]
    pub fn rename_project(&self, old_name: &str, new_name: &str) -> Result<(), StoreError> {
        let old_file = self.paths.session_file(Some(old_name));
        let new_file = self.paths.session_file(Some(new_name));

        if new_file.exists() {
            return Err(StoreError::AlreadyExists(new_name.to_string()));
        }
        if !old_file.exists() {
            return Err(StoreError::NotFound(old_name.to_string()));
        }

        let new_dir = self.paths.project_dir(new_name);
        self.paths.ensure_within_root(&new_dir)?;

        std::fs::rename(&old_file, &new_file)?;

        let old_dir = self.paths.project_dir(old_name);
        let dir_renamed = old_dir.exists();
        if dir_renamed {
            if let Err(e) = std::fs::rename(&old_dir, &new_dir) {
                // Roll back the file rename so no partial state survives.
                let _ = std::fs::rename(&new_file, &old_file);
                return Err(e.into());
            }
        }

        // The moved file must agree with its new name even when the project
        // is not current, or a later load-then-persist would write back
        // under the old name.
        if let Err(e) = self.rewrite_renamed_file(&new_file, new_name, &new_dir) {
            if dir_renamed {
                let _ = std::fs::rename(&new_dir, &old_dir);
            }
            let _ = std::fs::rename(&new_file, &old_file);
            return Err(e);
        }

        let mut current = self.current.lock();
        let updated = match current.as_mut() {
            Some(session) if session.project_name.as_deref() == Some(old_name) => {
                session.project_name = Some(new_name.to_string());
                session.base_dir = Some(new_dir);
                session.touch();
                Some(session.clone())
            }
            _ => None,
        };
        drop(current);

        if let Some(session) = updated {
            if let Err(e) = self.persist(&session) {
                warn!(error = %e, project = new_name, "failed to rewrite renamed session file");
            }
            self.notify(Some(&session));
        }
        Ok(())
    }

    /// Delete a project's session file and directory, then fall back to the
    /// main/unnamed session. Refuses unless the current session matches the
    /// named project.
    #[instrument(skip(self))]
    pub fn delete_project(&self, name: &str) -> Result<(), StoreError> {
        {
            let current = self.current.lock();
            let current_name = current.as_ref().and_then(|s| s.project_name.as_deref());
            if current_name != Some(name) {
                return Err(StoreError::Mismatch {
                    current: current_name.unwrap_or("(main)").to_string(),
                    requested: name.to_string(),
                });
            }
        }

        let file = self.paths.session_file(Some(name));
        if file.exists() {
            std::fs::remove_file(&file)?;
        }
        let dir = self.paths.project_dir(name);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }

        // Fall back to the main session.
        self.create_new_session(None)?;
        Ok(())
    }

    /// Reset the in-memory session and notify observers with None. Never
    /// touches the filesystem — deleting a project is `delete_project`, a
    /// separate operation with separate preconditions. Idempotent.
    pub fn clear_session(&self) {
        *self.current.lock() = None;
        self.notify(None);
    }

    /// Track a file as part of the current session's working set.
    pub fn track_active_file(&self, path: &Path) -> Result<(), StoreError> {
        self.paths.ensure_within_root(path)?;
        let updated = {
            let mut current = self.current.lock();
            let session = current
                .as_mut()
                .ok_or_else(|| StoreError::NotFound("no current session".to_string()))?;
            if !session.active_files.iter().any(|p| p == path) {
                session.active_files.push(path.to_path_buf());
                session.touch();
            }
            session.clone()
        };
        self.persist(&updated)?;
        Ok(())
    }

    fn rewrite_renamed_file(
        &self,
        file: &Path,
        new_name: &str,
        new_dir: &Path,
    ) -> Result<(), StoreError> {
        let raw = std::fs::read_to_string(file)?;
        let mut session: Session = serde_json::from_str(&raw)?;
        session.project_name = Some(new_name.to_string());
        session.base_dir = Some(new_dir.to_path_buf());
        session.touch();
        std::fs::write(file, serde_json::to_string_pretty(&session)?)?;
        Ok(())
    }

    fn build_session(&self, project_name: Option<&str>) -> Result<Session, StoreError> {
        match project_name {
            Some(name) => {
                if name.trim().is_empty() {
                    return Err(StoreError::InvalidProjectName("empty".to_string()));
                }
                let base_dir = self.paths.project_dir(name);
                self.paths.ensure_within_root(&base_dir)?;
                Ok(Session::new(Some(name.to_string()), Some(base_dir)))
            }
            None => Ok(Session::new(None, None)),
        }
    }

    fn persist(&self, session: &Session) -> Result<(), StoreError> {
        let file = self.paths.session_file(session.project_name.as_deref());
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(&file, json)?;
        Ok(())
    }
}
