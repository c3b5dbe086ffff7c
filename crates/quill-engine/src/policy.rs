use std::collections::HashMap;

use tracing::warn;

use crate::registry::{SpecialistCategory, SpecialistConfig};

/// A resolved iteration cap plus the provenance of the value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IterationDecision {
    /// Always at least 1.
    pub max_iterations: u32,
    pub source: String,
}

/// Resolves the model/tool round-trip cap for one specialist invocation.
///
/// Resolution order, first match wins: the specialist's own
/// `iteration_config.max_iterations`, a hardcoded per-specialist override,
/// the category default, the global default. Unknown ids land on the global
/// default. A non-positive configured value is a configuration bug; it is
/// clamped to 1 with a warning rather than surfaced as a runtime error.
#[derive(Clone, Debug)]
pub struct IterationPolicy {
    overrides: HashMap<String, u32>,
    content_default: u32,
    process_default: u32,
    global_default: u32,
}

impl Default for IterationPolicy {
    fn default() -> Self {
        let mut overrides = HashMap::new();
        // Project initialization is a single scaffolding pass.
        overrides.insert("project_initializer".to_string(), 1);
        Self {
            overrides,
            content_default: 5,
            process_default: 3,
            global_default: 5,
        }
    }
}

impl IterationPolicy {
    pub fn resolve(&self, id: &str, config: Option<&SpecialistConfig>) -> IterationDecision {
        if let Some(configured) = config
            .and_then(|c| c.iteration_config.as_ref())
            .and_then(|ic| ic.max_iterations)
        {
            return IterationDecision {
                max_iterations: clamp(id, configured),
                source: format!("specialist_config.iteration_config.max_iterations[{id}]"),
            };
        }
        if let Some(value) = self.overrides.get(id) {
            return IterationDecision {
                max_iterations: clamp(id, i64::from(*value)),
                source: "specialistOverrides".to_string(),
            };
        }
        if let Some(config) = config {
            let value = match config.category {
                SpecialistCategory::Content => self.content_default,
                SpecialistCategory::Process => self.process_default,
            };
            return IterationDecision {
                max_iterations: value,
                source: "categoryDefaults".to_string(),
            };
        }
        IterationDecision {
            max_iterations: self.global_default,
            source: "globalDefault".to_string(),
        }
    }
}

fn clamp(id: &str, value: i64) -> u32 {
    if value < 1 {
        warn!(specialist = id, value, "non-positive max_iterations configured, clamping to 1");
        return 1;
    }
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::IterationConfig;

    fn config(id: &str, category: SpecialistCategory, max: Option<i64>) -> SpecialistConfig {
        SpecialistConfig {
            id: id.to_string(),
            name: id.to_string(),
            category,
            enabled: true,
            version: None,
            capabilities: Vec::new(),
            tags: Vec::new(),
            iteration_config: max.map(|m| IterationConfig { max_iterations: Some(m) }),
        }
    }

    #[test]
    fn specialist_config_wins_over_everything() {
        let policy = IterationPolicy::default();
        let c = config("project_initializer", SpecialistCategory::Process, Some(8));
        let decision = policy.resolve("project_initializer", Some(&c));
        assert_eq!(decision.max_iterations, 8);
        assert_eq!(
            decision.source,
            "specialist_config.iteration_config.max_iterations[project_initializer]"
        );
    }

    #[test]
    fn override_beats_category_default() {
        let policy = IterationPolicy::default();
        let c = config("project_initializer", SpecialistCategory::Process, None);
        let decision = policy.resolve("project_initializer", Some(&c));
        assert_eq!(decision.max_iterations, 1);
        assert_eq!(decision.source, "specialistOverrides");
    }

    #[test]
    fn category_defaults_differ() {
        let policy = IterationPolicy::default();
        let content = policy.resolve("fr_writer", Some(&config("fr_writer", SpecialistCategory::Content, None)));
        assert_eq!(content.max_iterations, 5);
        assert_eq!(content.source, "categoryDefaults");

        let process = policy.resolve("git_operator", Some(&config("git_operator", SpecialistCategory::Process, None)));
        assert_eq!(process.max_iterations, 3);
        assert_eq!(process.source, "categoryDefaults");
    }

    #[test]
    fn unknown_specialist_resolves_to_global_default() {
        let policy = IterationPolicy::default();
        let decision = policy.resolve("never_registered", None);
        assert!(decision.max_iterations > 0);
        assert_eq!(decision.source, "globalDefault");
    }

    #[test]
    fn non_positive_configured_value_clamps_to_one() {
        let policy = IterationPolicy::default();
        let c = config("broken", SpecialistCategory::Content, Some(0));
        let decision = policy.resolve("broken", Some(&c));
        assert_eq!(decision.max_iterations, 1);

        let c = config("broken", SpecialistCategory::Content, Some(-3));
        assert_eq!(policy.resolve("broken", Some(&c)).max_iterations, 1);
    }
}
