use std::cmp::Reverse;

use serde::Serialize;
use tracing::debug;

use crate::intent::{EditType, InsertionPosition, SemanticEditIntent};
use crate::locator::{find_target, TargetSuggestions};
use crate::toc::parse_toc;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedIntent {
    /// Position in the caller's input slice.
    pub index: usize,
    pub sid: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<TargetSuggestions>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOutcome {
    /// True only when every intent applied.
    pub success: bool,
    pub total_intents: usize,
    pub successful_intents: usize,
    pub failed_intents: Vec<FailedIntent>,
    pub applied_intents: Vec<SemanticEditIntent>,
    /// Document text after all applied intents.
    pub document: String,
}

/// Apply a batch of edit intents to one document snapshot.
///
/// Every intent is validated up front; a validation failure is recorded and
/// never blocks independent intents. Valid intents apply in priority order
/// (higher first, ties stable by input order), and the heading tree is
/// re-parsed after each application so later intents always resolve against
/// the current text rather than stale line numbers.
pub fn execute_edits(document: &str, intents: &[SemanticEditIntent]) -> EditOutcome {
    let mut failed: Vec<FailedIntent> = Vec::new();
    let mut runnable: Vec<(usize, &SemanticEditIntent)> = Vec::new();

    for (index, intent) in intents.iter().enumerate() {
        if let Some(error) = validate(intent) {
            failed.push(FailedIntent {
                index,
                sid: intent.target.sid.clone(),
                error,
                suggestions: None,
            });
        } else {
            runnable.push((index, intent));
        }
    }

    runnable.sort_by_key(|(_, intent)| Reverse(intent.priority));

    let mut current = document.to_string();
    let mut applied = Vec::new();
    for (index, intent) in runnable {
        let toc = parse_toc(&current);
        let location = find_target(&toc, &intent.target, intent.edit_type);
        if !location.found {
            failed.push(FailedIntent {
                index,
                sid: intent.target.sid.clone(),
                error: location
                    .error
                    .unwrap_or_else(|| "target could not be resolved".to_string()),
                suggestions: location.suggestions,
            });
            continue;
        }
        // find_target always returns a range when found.
        let Some(range) = location.range else {
            continue;
        };
        current = match intent.edit_type {
            EditType::InsertSectionAndTitle => {
                let at = match intent.target.insertion_position {
                    Some(InsertionPosition::Before) => range.start_line,
                    _ => range.end_line + 1,
                };
                splice(&current, at, 0, &intent.content)
            }
            EditType::ReplaceSectionAndTitle | EditType::ReplaceSectionContentOnly => {
                let removed = range.end_line - range.start_line + 1;
                splice(&current, range.start_line, removed, &intent.content)
            }
        };
        debug!(sid = %intent.target.sid, r#type = ?intent.edit_type, "applied edit intent");
        applied.push(intent.clone());
    }

    failed.sort_by_key(|f| f.index);
    EditOutcome {
        success: failed.is_empty(),
        total_intents: intents.len(),
        successful_intents: applied.len(),
        failed_intents: failed,
        applied_intents: applied,
        document: current,
    }
}

fn validate(intent: &SemanticEditIntent) -> Option<String> {
    if intent.target.sid.trim().is_empty() {
        return Some("sid is required".to_string());
    }
    if intent.edit_type == EditType::ReplaceSectionContentOnly && intent.target.line_range.is_none()
    {
        return Some("lineRange is required for replace_section_content_only".to_string());
    }
    None
}

/// Remove `remove` lines starting at `at`, then insert `content` there.
fn splice(document: &str, at: u32, remove: u32, content: &str) -> String {
    let mut lines: Vec<&str> = document.lines().collect();
    let at = (at as usize).min(lines.len());
    let end = (at + remove as usize).min(lines.len());
    lines.splice(at..end, content.lines());
    let mut out = lines.join("\n");
    if document.ends_with('\n') && !out.is_empty() {
        out.push('\n');
    }
    out
}
