//! Tool-failure classification. Raw registry errors are matched against an
//! ordered rule list and rewritten into actionable guidance for the calling
//! model, which decides retry eligibility from the message.

/// How a raw tool error classifies. Determines the guidance rendered by
/// [`enhance`] and, downstream, whether the model should retry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolFailureKind {
    /// The tool itself does not exist. Never retryable.
    MissingTool,
    /// A path argument points at nothing. Not retryable with the same path.
    FileNotFound,
    /// Access denied by system configuration. Never retryable.
    PermissionDenied,
    /// Malformed call. Retryable with corrected parameters.
    MissingParameter,
    /// Anything else passes through unmodified.
    Unclassified,
}

/// Ordered; first match wins.
const RULES: &[(&[&str], ToolFailureKind)] = &[
    (
        &["tool implementation not found", "does not exist"],
        ToolFailureKind::MissingTool,
    ),
    (&["enoent", "no such file"], ToolFailureKind::FileNotFound),
    (
        &["permission denied", "restricted"],
        ToolFailureKind::PermissionDenied,
    ),
    (
        &["missing required parameter", "missing parameter"],
        ToolFailureKind::MissingParameter,
    ),
];

pub fn classify(raw: &str) -> ToolFailureKind {
    let haystack = raw.to_lowercase();
    for (needles, kind) in RULES {
        if needles.iter().any(|n| haystack.contains(n)) {
            return *kind;
        }
    }
    ToolFailureKind::Unclassified
}

/// Rewrite a raw tool error into guidance for the calling model.
pub fn enhance(tool: &str, raw: &str, available_tools: &[String]) -> String {
    match classify(raw) {
        ToolFailureKind::MissingTool => format!(
            "CRITICAL ERROR: tool '{tool}' does not exist in the system. \
             Stop retrying this tool immediately. Review the available tools \
             and choose one of: [{}]. Raw error: {raw}",
            available_tools.join(", ")
        ),
        ToolFailureKind::FileNotFound => format!(
            "FILE ERROR: the path given to '{tool}' does not exist. Verify \
             the file path is correct. Do NOT retry with the same invalid \
             path. Raw error: {raw}"
        ),
        ToolFailureKind::PermissionDenied => format!(
            "PERMISSION ERROR: '{tool}' was denied access. This is a system \
             configuration issue; retrying will not fix it. Inform the user. \
             Raw error: {raw}"
        ),
        ToolFailureKind::MissingParameter => format!(
            "PARAMETER ERROR: the call to '{tool}' is malformed, not a \
             system failure. You may retry with corrected parameters. \
             Raw error: {raw}"
        ),
        ToolFailureKind::Unclassified => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_rules() {
        assert_eq!(
            classify("Tool implementation not found: ghostTool"),
            ToolFailureKind::MissingTool
        );
        assert_eq!(classify("tool 'x' does not exist"), ToolFailureKind::MissingTool);
        assert_eq!(classify("ENOENT: no such file or directory"), ToolFailureKind::FileNotFound);
        assert_eq!(classify("Permission denied (os error 13)"), ToolFailureKind::PermissionDenied);
        assert_eq!(classify("access to /etc is restricted"), ToolFailureKind::PermissionDenied);
        assert_eq!(
            classify("Missing required parameter: targetFile"),
            ToolFailureKind::MissingParameter
        );
        assert_eq!(classify("disk full"), ToolFailureKind::Unclassified);
    }

    #[test]
    fn missing_tool_guidance_is_terminal() {
        let msg = enhance(
            "ghostTool",
            "Tool implementation not found: ghostTool",
            &["readMarkdownFile".to_string()],
        );
        assert!(msg.contains("CRITICAL ERROR"));
        assert!(msg.contains("Stop retrying this tool immediately"));
        assert!(msg.contains("readMarkdownFile"));
    }

    #[test]
    fn file_error_forbids_same_path_retry() {
        let msg = enhance("readMarkdownFile", "ENOENT: no such file", &[]);
        assert!(msg.contains("FILE ERROR"));
        assert!(msg.contains("Do NOT retry with the same invalid path"));
    }

    #[test]
    fn parameter_error_allows_retry() {
        let msg = enhance("writeChapter", "Missing required parameter: content", &[]);
        assert!(msg.contains("PARAMETER ERROR"));
        assert!(msg.contains("retry with corrected parameters"));
        assert!(!msg.contains("Do NOT retry"));
    }

    #[test]
    fn unclassified_errors_pass_through() {
        assert_eq!(enhance("writeChapter", "disk full", &[]), "disk full");
    }
}
