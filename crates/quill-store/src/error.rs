#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a session for project '{0}' already exists")]
    AlreadyExists(String),

    #[error("project name mismatch: current session is '{current}', requested '{requested}'")]
    Mismatch { current: String, requested: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("path escapes the workspace root: {0}")]
    OutsideWorkspace(String),

    #[error("invalid project name: {0}")]
    InvalidProjectName(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}
