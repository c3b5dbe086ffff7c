use serde::{Deserialize, Serialize};

/// The three supported edit operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditType {
    InsertSectionAndTitle,
    ReplaceSectionAndTitle,
    ReplaceSectionContentOnly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertionPosition {
    Before,
    After,
}

/// Inclusive 0-based document line range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRange {
    pub start_line: u32,
    pub end_line: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditTarget {
    /// Hierarchical section id, e.g. `/chapter-one/sub-section`.
    pub sid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insertion_position: Option<InsertionPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_range: Option<LineRange>,
}

/// One requested document mutation. Intents usually arrive as JSON produced
/// by a specialist, so the wire shape mirrors that payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticEditIntent {
    #[serde(rename = "type")]
    pub edit_type: EditType,
    pub target: EditTarget,
    pub content: String,
    /// Audit trail only; never affects behavior.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Higher priority applies first when intents share an anchor.
    #[serde(default)]
    pub priority: i32,
}
