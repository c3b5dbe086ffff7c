pub mod error;
pub mod log;
pub mod paths;
pub mod session;

pub use error::StoreError;
pub use log::JsonlSessionLog;
pub use paths::SessionPaths;
pub use session::{Session, SessionManager, SessionMetadata, StartSessionResult, SubscriptionId};
