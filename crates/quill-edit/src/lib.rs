//! Semantic markdown editing: documents are addressed by stable section
//! identifiers (sids) derived from heading structure, never by raw line
//! numbers handed around between callers.

pub mod engine;
pub mod intent;
pub mod locator;
pub mod toc;

pub use engine::{execute_edits, EditOutcome, FailedIntent};
pub use intent::{EditTarget, EditType, InsertionPosition, LineRange, SemanticEditIntent};
pub use locator::{find_target, OperationKind, TargetLocation, TargetSuggestions};
pub use toc::{parse_toc, TocNode};
