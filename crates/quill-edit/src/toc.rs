use std::collections::HashMap;

use serde::Serialize;

/// One section in the document's heading tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TocNode {
    /// Hierarchical path of normalized titles, e.g. `/chapter-one/sub-section`.
    /// Stable across edits that don't rename headings.
    pub sid: String,
    pub title: String,
    pub normalized_title: String,
    /// ATX heading level, 1 through 6.
    pub level: u8,
    /// 0-based line of the heading itself.
    pub line: u32,
    /// 0-based last line of the section, inclusive. Runs to the line before
    /// the next heading of the same or higher level, or to EOF.
    pub end_line: u32,
    pub children: Vec<TocNode>,
}

struct RawHeading {
    level: u8,
    title: String,
    line: u32,
    end_line: u32,
}

/// Parse a markdown document into its heading tree. Headings inside fenced
/// code blocks are not headings. Duplicate sids get `-2`, `-3` suffixes in
/// document order so every section stays addressable.
pub fn parse_toc(document: &str) -> Vec<TocNode> {
    let lines: Vec<&str> = document.lines().collect();
    let mut headings = scan_headings(&lines);
    assign_end_lines(&mut headings, lines.len() as u32);
    build_tree(headings)
}

/// All sids in document order, parents before children.
pub fn all_sids(toc: &[TocNode]) -> Vec<String> {
    let mut out = Vec::new();
    collect_sids(toc, &mut out);
    out
}

pub fn find_node<'a>(toc: &'a [TocNode], sid: &str) -> Option<&'a TocNode> {
    for node in toc {
        if node.sid == sid {
            return Some(node);
        }
        if let Some(found) = find_node(&node.children, sid) {
            return Some(found);
        }
    }
    None
}

fn collect_sids(nodes: &[TocNode], out: &mut Vec<String>) {
    for node in nodes {
        out.push(node.sid.clone());
        collect_sids(&node.children, out);
    }
}

fn scan_headings(lines: &[&str]) -> Vec<RawHeading> {
    let mut headings = Vec::new();
    let mut fence: Option<&str> = None;
    for (i, raw) in lines.iter().enumerate() {
        let trimmed = raw.trim_start();
        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            }
            continue;
        }
        if trimmed.starts_with("```") {
            fence = Some("```");
            continue;
        }
        if trimmed.starts_with("~~~") {
            fence = Some("~~~");
            continue;
        }
        if let Some((level, title)) = parse_heading_line(trimmed) {
            headings.push(RawHeading {
                level,
                title,
                line: i as u32,
                end_line: 0,
            });
        }
    }
    headings
}

fn parse_heading_line(line: &str) -> Option<(u8, String)> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    // Closed ATX headings may carry trailing hashes.
    let title = rest.trim().trim_end_matches('#').trim_end();
    Some((hashes as u8, title.to_string()))
}

fn assign_end_lines(headings: &mut [RawHeading], total_lines: u32) {
    for i in 0..headings.len() {
        let level = headings[i].level;
        let next = headings[i + 1..]
            .iter()
            .find(|h| h.level <= level)
            .map(|h| h.line);
        headings[i].end_line = match next {
            Some(line) => line.saturating_sub(1),
            None => total_lines.saturating_sub(1),
        };
    }
}

fn build_tree(headings: Vec<RawHeading>) -> Vec<TocNode> {
    let mut roots: Vec<TocNode> = Vec::new();
    let mut stack: Vec<TocNode> = Vec::new();
    let mut seen: HashMap<String, u32> = HashMap::new();

    let mut attach = |stack: &mut Vec<TocNode>, roots: &mut Vec<TocNode>| {
        if let Some(done) = stack.pop() {
            match stack.last_mut() {
                Some(parent) => parent.children.push(done),
                None => roots.push(done),
            }
        }
    };

    for heading in headings {
        while stack.last().is_some_and(|n| n.level >= heading.level) {
            attach(&mut stack, &mut roots);
        }
        let parent_sid = stack.last().map(|n| n.sid.as_str()).unwrap_or("");
        let normalized = normalize_title(&heading.title);
        let base = format!("{parent_sid}/{normalized}");
        let count = seen.entry(base.clone()).and_modify(|c| *c += 1).or_insert(1);
        let sid = if *count == 1 {
            base
        } else {
            format!("{base}-{count}")
        };
        stack.push(TocNode {
            sid,
            title: heading.title,
            normalized_title: normalized,
            level: heading.level,
            line: heading.line,
            end_line: heading.end_line,
            children: Vec::new(),
        });
    }
    while !stack.is_empty() {
        attach(&mut stack, &mut roots);
    }
    roots
}

/// Lowercase the title and join its alphanumeric runs with hyphens.
fn normalize_title(title: &str) -> String {
    let mut out = String::new();
    let mut gap = false;
    for c in title.chars() {
        if c.is_alphanumeric() {
            if gap && !out.is_empty() {
                out.push('-');
            }
            gap = false;
            out.extend(c.to_lowercase());
        } else {
            gap = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
# Chapter One
intro text
## Sub Section
sub text
# Chapter Two
more text
";

    #[test]
    fn builds_nested_sids_from_headings() {
        let toc = parse_toc(DOC);
        assert_eq!(toc.len(), 2);
        assert_eq!(toc[0].sid, "/chapter-one");
        assert_eq!(toc[0].children[0].sid, "/chapter-one/sub-section");
        assert_eq!(toc[1].sid, "/chapter-two");
        assert_eq!(
            all_sids(&toc),
            vec!["/chapter-one", "/chapter-one/sub-section", "/chapter-two"]
        );
    }

    #[test]
    fn end_line_runs_to_next_same_level_heading() {
        let toc = parse_toc(DOC);
        assert_eq!(toc[0].line, 0);
        assert_eq!(toc[0].end_line, 3, "chapter one spans through sub section body");
        assert_eq!(toc[0].children[0].line, 2);
        assert_eq!(toc[0].children[0].end_line, 3);
        assert_eq!(toc[1].end_line, 5, "last section runs to EOF");
    }

    #[test]
    fn duplicate_titles_get_ordinal_suffixes() {
        let doc = "# Notes\n\n# Notes\n\n# Notes\n";
        let toc = parse_toc(doc);
        let sids = all_sids(&toc);
        assert_eq!(sids, vec!["/notes", "/notes-2", "/notes-3"]);
    }

    #[test]
    fn headings_inside_fenced_code_are_ignored() {
        let doc = "# Real\n```markdown\n# Not A Heading\n```\n## Child\n";
        let toc = parse_toc(doc);
        assert_eq!(all_sids(&toc), vec!["/real", "/real/child"]);
    }

    #[test]
    fn hash_without_space_is_not_a_heading() {
        let toc = parse_toc("#hashtag\n# Heading\n");
        assert_eq!(all_sids(&toc), vec!["/heading"]);
    }

    #[test]
    fn titles_normalize_punctuation_and_case() {
        let toc = parse_toc("# 3.2 Functional Requirements (Draft)\n");
        assert_eq!(toc[0].sid, "/3-2-functional-requirements-draft");
        assert_eq!(toc[0].title, "3.2 Functional Requirements (Draft)");
    }

    #[test]
    fn find_node_walks_the_tree() {
        let toc = parse_toc(DOC);
        assert!(find_node(&toc, "/chapter-one/sub-section").is_some());
        assert!(find_node(&toc, "/chapter-three").is_none());
    }
}
