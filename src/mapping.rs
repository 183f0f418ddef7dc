//! The model-mapping resolver: rewrites `ir.model` per a route's ordered
//! mapping table before the outbound build.

use crate::adapter::ModelFamily;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingType {
    Exact,
    Family,
    Reasoning,
    Default,
}

/// One entry of a route's ordered mapping table, keyed uniquely by
/// `(routeId, sourceModel, mappingType)` at the route-table level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMapping {
    pub source_model: String,
    pub target_model: String,
    pub mapping_type: MappingType,
}

/// Resolves `model` against `mappings` and `families`, per a five-tier
/// precedence order. `thinking_enabled` selects the `reasoning` tier.
///
/// Idempotent: once `model` has been rewritten to a mapping's `target_model`,
/// re-running resolution against the same tables either finds no further
/// `exact`/`family` match for the new name or maps it to itself, so a second
/// pass is a no-op in practice; callers should still only invoke this once
/// per request.
pub fn resolve_model(
    model: &str,
    mappings: &[ModelMapping],
    families: &[ModelFamily],
    thinking_enabled: bool,
) -> String {
    if let Some(m) = mappings
        .iter()
        .find(|m| m.mapping_type == MappingType::Exact && m.source_model == model)
    {
        return m.target_model.clone();
    }

    if thinking_enabled {
        if let Some(m) = mappings.iter().find(|m| m.mapping_type == MappingType::Reasoning) {
            return m.target_model.clone();
        }
    }

    let lower = model.to_lowercase();
    if let Some(family) = families.iter().find(|f| f.keywords.iter().any(|kw| lower.contains(&kw.to_lowercase()))) {
        if let Some(m) = mappings.iter().find(|m| {
            m.mapping_type == MappingType::Family && m.source_model.eq_ignore_ascii_case(family.name)
        }) {
            return m.target_model.clone();
        }
    }

    if let Some(m) = mappings.iter().find(|m| m.mapping_type == MappingType::Default) {
        return m.target_model.clone();
    }

    model.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn families() -> Vec<ModelFamily> {
        vec![
            ModelFamily { name: "opus", keywords: &["opus"] },
            ModelFamily { name: "sonnet", keywords: &["sonnet"] },
        ]
    }

    #[test]
    fn exact_wins_over_everything() {
        let mappings = vec![
            ModelMapping { source_model: "gpt-4".into(), target_model: "claude-3-5-sonnet".into(), mapping_type: MappingType::Exact },
            ModelMapping { source_model: "sonnet".into(), target_model: "claude-3-7-sonnet".into(), mapping_type: MappingType::Family },
        ];
        assert_eq!(resolve_model("gpt-4", &mappings, &families(), false), "claude-3-5-sonnet");
    }

    #[test]
    fn family_matches_by_substring() {
        let mappings = vec![ModelMapping {
            source_model: "sonnet".into(),
            target_model: "claude-3-7-sonnet-latest".into(),
            mapping_type: MappingType::Family,
        }];
        assert_eq!(resolve_model("claude-3-5-sonnet-20241022", &mappings, &families(), false), "claude-3-7-sonnet-latest");
    }

    #[test]
    fn passthrough_when_nothing_matches() {
        let mappings: Vec<ModelMapping> = vec![];
        assert_eq!(resolve_model("gpt-4", &mappings, &families(), false), "gpt-4");
    }

    #[test]
    fn idempotent_on_default_mapping() {
        let mappings = vec![ModelMapping {
            source_model: "default".into(),
            target_model: "claude-3-5-sonnet-20241022".into(),
            mapping_type: MappingType::Default,
        }];
        let once = resolve_model("unknown-model", &mappings, &families(), false);
        let twice = resolve_model(&once, &mappings, &families(), false);
        assert_eq!(once, twice);
    }

    #[test]
    fn reasoning_tier_applies_only_when_thinking_enabled() {
        let mappings = vec![ModelMapping {
            source_model: "reasoning".into(),
            target_model: "deepseek-reasoner".into(),
            mapping_type: MappingType::Reasoning,
        }];
        assert_eq!(resolve_model("deepseek-chat", &mappings, &families(), true), "deepseek-reasoner");
        assert_eq!(resolve_model("deepseek-chat", &mappings, &families(), false), "deepseek-chat");
    }
}
