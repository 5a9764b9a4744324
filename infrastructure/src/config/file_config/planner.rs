//! Planner configuration from TOML (`[planner]` section)

use ratchet_domain::{ConfigIssue, PlannerConfig};
use serde::{Deserialize, Serialize};

/// Keyword lists that push a task towards a higher complexity.
///
/// A list that is set replaces the built-in one; `extra_*` lists are
/// appended to whatever is in effect.
///
/// ```toml
/// [planner]
/// extra_architectural_keywords = ["overhaul"]
/// high_risk_keywords = ["delete", "drop", "truncate"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePlannerConfig {
    pub architectural_keywords: Option<Vec<String>>,
    pub pattern_keywords: Option<Vec<String>>,
    pub high_risk_keywords: Option<Vec<String>>,
    pub extra_architectural_keywords: Vec<String>,
    pub extra_pattern_keywords: Vec<String>,
    pub extra_high_risk_keywords: Vec<String>,
}

impl FilePlannerConfig {
    pub fn to_planner_config(&self) -> (PlannerConfig, Vec<ConfigIssue>) {
        let defaults = PlannerConfig::default();
        let mut issues = Vec::new();
        let config = PlannerConfig {
            architectural_keywords: merge(
                "planner.architectural_keywords",
                &self.architectural_keywords,
                &self.extra_architectural_keywords,
                defaults.architectural_keywords,
                &mut issues,
            ),
            pattern_keywords: merge(
                "planner.pattern_keywords",
                &self.pattern_keywords,
                &self.extra_pattern_keywords,
                defaults.pattern_keywords,
                &mut issues,
            ),
            high_risk_keywords: merge(
                "planner.high_risk_keywords",
                &self.high_risk_keywords,
                &self.extra_high_risk_keywords,
                defaults.high_risk_keywords,
                &mut issues,
            ),
        };
        (config, issues)
    }
}

fn merge(
    field: &str,
    replace: &Option<Vec<String>>,
    extra: &[String],
    default: Vec<String>,
    issues: &mut Vec<ConfigIssue>,
) -> Vec<String> {
    let mut keywords = replace.clone().unwrap_or(default);
    keywords.extend(extra.iter().cloned());

    let before = keywords.len();
    keywords.retain(|k| !k.trim().is_empty());
    if keywords.len() != before {
        issues.push(ConfigIssue::invalid_constraint(
            field,
            format!("{} blank keyword(s) ignored", before - keywords.len()),
        ));
    }
    // Matching is case-insensitive on the task text
    for keyword in &mut keywords {
        *keyword = keyword.trim().to_lowercase();
    }
    keywords.dedup();
    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_section_is_default_planner() {
        let (config, issues) = FilePlannerConfig::default().to_planner_config();
        assert!(issues.is_empty());
        assert_eq!(config, PlannerConfig::default());
    }

    #[test]
    fn test_replace_and_extend() {
        let toml_str = r#"
[planner]
high_risk_keywords = ["Truncate"]
extra_architectural_keywords = ["overhaul", ""]
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        let (planner, issues) = config.planner.to_planner_config();
        assert_eq!(planner.high_risk_keywords, vec!["truncate"]);
        assert!(planner.architectural_keywords.contains(&"overhaul".to_string()));
        assert!(planner.architectural_keywords.contains(&"refactor".to_string()));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field(), "planner.architectural_keywords");
    }
}
