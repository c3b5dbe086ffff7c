use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Task category a specialist is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialistCategory {
    /// Authors document content.
    Content,
    /// Drives process and tooling steps.
    Process,
}

impl SpecialistCategory {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "content" => Some(Self::Content),
            "process" => Some(Self::Process),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IterationConfig {
    /// Configured as written; the iteration policy clamps non-positive values.
    pub max_iterations: Option<i64>,
}

/// Normalized specialist record. Both definition dialects parse into this
/// shape; a legacy-dialect record additionally carries the `"legacy"` tag.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpecialistConfig {
    pub id: String,
    pub name: String,
    pub category: SpecialistCategory,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub capabilities: Vec<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration_config: Option<IterationConfig>,
}

impl SpecialistConfig {
    pub fn is_legacy(&self) -> bool {
        self.tags.iter().any(|t| t == "legacy")
    }
}

#[derive(Debug)]
pub struct InvalidSpecialistFile {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub scanned_files: usize,
    pub valid: usize,
    pub invalid: usize,
    pub legacy: usize,
}

/// Outcome of one directory scan. Parse failures are collected here, never
/// thrown; a broken definition must not take down the whole scan.
#[derive(Debug)]
pub struct ScanReport {
    pub valid_specialists: Vec<SpecialistConfig>,
    pub invalid_files: Vec<InvalidSpecialistFile>,
    pub stats: ScanStats,
}

#[derive(Clone, Debug, Default)]
pub struct SpecialistFilter {
    pub category: Option<SpecialistCategory>,
    pub enabled: Option<bool>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub total: usize,
    pub enabled: usize,
    pub disabled: usize,
    pub content: usize,
    pub process: usize,
    pub legacy: usize,
}

/// Registry of specialist definitions, resolved once at startup. Lookups by
/// id return an Option; dispatch never panics on an unknown id.
#[derive(Default)]
pub struct SpecialistRegistry {
    specialists: HashMap<String, SpecialistConfig>,
}

impl SpecialistRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan a directory of markdown definition files and register every one
    /// that parses. Later definitions with the same id shadow earlier ones.
    pub fn scan_and_register(&mut self, dir: &Path) -> ScanReport {
        let mut report = ScanReport {
            valid_specialists: Vec::new(),
            invalid_files: Vec::new(),
            stats: ScanStats::default(),
        };

        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                report.invalid_files.push(InvalidSpecialistFile {
                    path: dir.to_path_buf(),
                    error: format!("cannot read directory: {e}"),
                });
                report.stats.invalid = 1;
                return report;
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|e| e == "md"))
            .collect();
        paths.sort();

        for path in paths {
            report.stats.scanned_files += 1;
            let raw = match std::fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(e) => {
                    report.invalid_files.push(InvalidSpecialistFile {
                        path,
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            match parse_definition(&raw) {
                Ok(config) => {
                    debug!(id = %config.id, legacy = config.is_legacy(), "registered specialist");
                    if config.is_legacy() {
                        report.stats.legacy += 1;
                    }
                    report.valid_specialists.push(config.clone());
                    self.register(config);
                }
                Err(error) => {
                    report.invalid_files.push(InvalidSpecialistFile { path, error });
                }
            }
        }
        report.stats.valid = report.valid_specialists.len();
        report.stats.invalid = report.invalid_files.len();
        report
    }

    pub fn register(&mut self, config: SpecialistConfig) {
        self.specialists.insert(config.id.clone(), config);
    }

    pub fn get(&self, id: &str) -> Option<&SpecialistConfig> {
        self.specialists.get(id)
    }

    pub fn all(&self, filter: &SpecialistFilter) -> Vec<&SpecialistConfig> {
        let mut matched: Vec<&SpecialistConfig> = self
            .specialists
            .values()
            .filter(|s| filter.category.is_none_or(|c| s.category == c))
            .filter(|s| filter.enabled.is_none_or(|e| s.enabled == e))
            .collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        matched
    }

    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats {
            total: self.specialists.len(),
            ..Default::default()
        };
        for s in self.specialists.values() {
            if s.enabled {
                stats.enabled += 1;
            } else {
                stats.disabled += 1;
            }
            match s.category {
                SpecialistCategory::Content => stats.content += 1,
                SpecialistCategory::Process => stats.process += 1,
            }
            if s.is_legacy() {
                stats.legacy += 1;
            }
        }
        stats
    }
}

/// Parse one definition file. Two frontmatter dialects are accepted: the
/// current one nests fields under a `specialist:` block, the legacy one uses
/// flat `specialist_*` keys and gets the `"legacy"` tag on the way in.
fn parse_definition(raw: &str) -> Result<SpecialistConfig, String> {
    let yaml = extract_frontmatter(raw).ok_or("missing YAML frontmatter")?;
    if yaml.lines().any(|l| l.trim_end() == "specialist:") {
        parse_current_dialect(yaml)
    } else if yaml.lines().any(|l| l.trim_start().starts_with("specialist_id:")) {
        parse_legacy_dialect(yaml)
    } else {
        Err("no specialist definition in frontmatter".to_string())
    }
}

fn extract_frontmatter(raw: &str) -> Option<&str> {
    let after = raw.strip_prefix("---\n")?;
    let end = after.find("\n---")?;
    Some(&after[..end])
}

#[derive(Default)]
struct Fields {
    id: Option<String>,
    name: Option<String>,
    category: Option<String>,
    enabled: Option<bool>,
    version: Option<String>,
    capabilities: Vec<String>,
    tags: Vec<String>,
    max_iterations: Option<i64>,
}

impl Fields {
    fn set(&mut self, key: &str, value: &str) {
        let value = value.trim().trim_matches('"').trim_matches('\'');
        match key {
            "id" | "specialist_id" => self.id = Some(value.to_string()),
            "name" | "specialist_name" => self.name = Some(value.to_string()),
            "category" | "specialist_category" => self.category = Some(value.to_string()),
            "enabled" => self.enabled = Some(value == "true"),
            "version" => self.version = Some(value.to_string()),
            "capabilities" => self.capabilities = parse_inline_list(value),
            "tags" => self.tags = parse_inline_list(value),
            "max_iterations" => self.max_iterations = value.parse().ok(),
            _ => {}
        }
    }

    fn finish(self, legacy: bool) -> Result<SpecialistConfig, String> {
        let id = self.id.ok_or("missing specialist id")?;
        if id.is_empty() {
            return Err("missing specialist id".to_string());
        }
        let category_raw = self.category.ok_or("missing specialist category")?;
        let category = SpecialistCategory::parse(&category_raw)
            .ok_or_else(|| format!("unknown category '{category_raw}'"))?;
        let mut tags = self.tags;
        if legacy && !tags.iter().any(|t| t == "legacy") {
            tags.push("legacy".to_string());
        }
        Ok(SpecialistConfig {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            category,
            enabled: self.enabled.unwrap_or(true),
            version: self.version,
            capabilities: self.capabilities,
            tags,
            iteration_config: self
                .max_iterations
                .map(|m| IterationConfig { max_iterations: Some(m) }),
        })
    }
}

fn parse_current_dialect(yaml: &str) -> Result<SpecialistConfig, String> {
    let mut fields = Fields::default();
    let mut in_specialist = false;
    let mut iteration_indent: Option<usize> = None;

    for line in yaml.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indent = line.len() - line.trim_start().len();
        if indent == 0 {
            in_specialist = trimmed == "specialist:";
            iteration_indent = None;
            continue;
        }
        if !in_specialist {
            continue;
        }
        if let Some(block_indent) = iteration_indent {
            if indent > block_indent {
                if let Some((key, value)) = trimmed.split_once(':') {
                    fields.set(key.trim(), value);
                }
                continue;
            }
            iteration_indent = None;
        }
        if trimmed == "iteration_config:" {
            iteration_indent = Some(indent);
            continue;
        }
        if let Some((key, value)) = trimmed.split_once(':') {
            fields.set(key.trim(), value);
        }
    }
    fields.finish(false)
}

fn parse_legacy_dialect(yaml: &str) -> Result<SpecialistConfig, String> {
    let mut fields = Fields::default();
    for line in yaml.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = trimmed.split_once(':') {
            fields.set(key.trim(), value);
        }
    }
    fields.finish(true)
}

fn parse_inline_list(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    let Some(inner) = trimmed.strip_prefix('[').and_then(|v| v.strip_suffix(']')) else {
        return Vec::new();
    };
    inner
        .split(',')
        .map(|s| s.trim().trim_matches('"').trim_matches('\'').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
