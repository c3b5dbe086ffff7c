use serde::Serialize;

use crate::intent::{EditTarget, EditType, LineRange};
use crate::toc::{all_sids, find_node, TocNode};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Insert,
    Replace,
}

/// Hints handed back to a caller that can retry with corrected input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSuggestions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_sids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_range: Option<LineRange>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetLocation {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<LineRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<OperationKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<TargetSuggestions>,
}

impl TargetLocation {
    fn resolved(range: LineRange, operation: OperationKind) -> Self {
        Self {
            found: true,
            range: Some(range),
            operation: Some(operation),
            error: None,
            suggestions: None,
        }
    }

    fn missing(error: String, suggestions: TargetSuggestions) -> Self {
        Self {
            found: false,
            range: None,
            operation: None,
            error: Some(error),
            suggestions: Some(suggestions),
        }
    }
}

/// Resolve an edit target against the heading tree. Never panics and never
/// guesses: an unresolvable target comes back `found: false` with enough
/// suggestions for the caller to self-correct.
pub fn find_target(toc: &[TocNode], target: &EditTarget, edit_type: EditType) -> TargetLocation {
    let Some(node) = find_node(toc, &target.sid) else {
        return TargetLocation::missing(
            format!("section '{}' not found", target.sid),
            TargetSuggestions {
                available_sids: Some(all_sids(toc)),
                valid_range: None,
            },
        );
    };

    match edit_type {
        EditType::InsertSectionAndTitle => TargetLocation::resolved(
            LineRange {
                start_line: node.line,
                end_line: node.end_line,
            },
            OperationKind::Insert,
        ),
        EditType::ReplaceSectionAndTitle => TargetLocation::resolved(
            LineRange {
                start_line: node.line,
                end_line: node.end_line,
            },
            OperationKind::Replace,
        ),
        EditType::ReplaceSectionContentOnly => {
            // Content area excludes the heading line itself.
            let content_start = node.line + 1;
            let valid = LineRange {
                start_line: content_start,
                end_line: node.end_line.max(content_start),
            };
            let Some(requested) = target.line_range else {
                // Validated upstream; resolving without a range is still an error here.
                return TargetLocation::missing(
                    format!("lineRange is required to edit content of '{}'", target.sid),
                    TargetSuggestions {
                        available_sids: None,
                        valid_range: Some(valid),
                    },
                );
            };
            let in_bounds = requested.start_line >= content_start
                && requested.end_line <= node.end_line
                && requested.start_line <= requested.end_line;
            if !in_bounds {
                return TargetLocation::missing(
                    format!(
                        "lineRange {}-{} is out of range for section '{}'",
                        requested.start_line, requested.end_line, target.sid
                    ),
                    TargetSuggestions {
                        available_sids: None,
                        valid_range: Some(valid),
                    },
                );
            }
            TargetLocation::resolved(requested, OperationKind::Replace)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toc::parse_toc;

    const DOC: &str = "\
# Chapter One
line one
line two
# Chapter Two
body
";

    fn target(sid: &str) -> EditTarget {
        EditTarget {
            sid: sid.to_string(),
            insertion_position: None,
            line_range: None,
        }
    }

    #[test]
    fn unknown_sid_reports_not_found_with_available_sids() {
        let toc = parse_toc(DOC);
        let location = find_target(&toc, &target("/chapter-three"), EditType::InsertSectionAndTitle);
        assert!(!location.found);
        assert!(location.error.as_deref().unwrap().contains("not found"));
        assert_eq!(
            location.suggestions.unwrap().available_sids.unwrap(),
            vec!["/chapter-one", "/chapter-two"]
        );
    }

    #[test]
    fn replace_section_spans_heading_through_end() {
        let toc = parse_toc(DOC);
        let location = find_target(&toc, &target("/chapter-one"), EditType::ReplaceSectionAndTitle);
        assert!(location.found);
        assert_eq!(
            location.range,
            Some(LineRange { start_line: 0, end_line: 2 })
        );
        assert_eq!(location.operation, Some(OperationKind::Replace));
    }

    #[test]
    fn content_only_rejects_range_covering_the_heading() {
        let toc = parse_toc(DOC);
        let mut t = target("/chapter-one");
        t.line_range = Some(LineRange { start_line: 0, end_line: 2 });
        let location = find_target(&toc, &t, EditType::ReplaceSectionContentOnly);
        assert!(!location.found);
        assert!(location.error.as_deref().unwrap().contains("out of range"));
        assert_eq!(
            location.suggestions.unwrap().valid_range,
            Some(LineRange { start_line: 1, end_line: 2 })
        );
    }

    #[test]
    fn content_only_accepts_in_bounds_range() {
        let toc = parse_toc(DOC);
        let mut t = target("/chapter-one");
        t.line_range = Some(LineRange { start_line: 1, end_line: 2 });
        let location = find_target(&toc, &t, EditType::ReplaceSectionContentOnly);
        assert!(location.found);
        assert_eq!(
            location.range,
            Some(LineRange { start_line: 1, end_line: 2 })
        );
    }
}
