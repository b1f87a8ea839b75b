use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::tone::ToneRule;
use crate::error::ConfigError;

/// A named violation class: any trigger phrase present means a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub phrases: Vec<String>,
}

/// A category that only matches when all phrases occur in order and,
/// when required, the request's numbers contain a Pythagorean triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedCategory {
    pub name: String,
    #[serde(default)]
    pub phrases: Vec<String>,
    #[serde(default = "default_true")]
    pub require_pythagorean_triple: bool,
}

fn default_true() -> bool {
    true
}

/// The full rule table: plain categories, sequenced categories and the
/// tone rule. Loaded once and never mutated; hot-reload swaps a new table in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRules {
    #[serde(default, rename = "category")]
    pub categories: Vec<Category>,
    #[serde(default, rename = "sequenced")]
    pub sequenced: Vec<SequencedCategory>,
    #[serde(default)]
    pub tone: ToneRule,
}

impl Default for PolicyRules {
    fn default() -> Self {
        Self {
            categories: crate::security::default_categories(),
            sequenced: crate::security::default_sequenced(),
            tone: ToneRule::default(),
        }
    }
}

impl PolicyRules {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let rules: Self = toml::from_str(contents).map_err(|e| ConfigError::Load {
            what: "policy rules".into(),
            message: e.to_string(),
        })?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
            what: format!("policy rules at {}", path.display()),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Names must be non-empty and unique across plain and sequenced
    /// categories. Empty trigger lists are allowed and simply never match.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        let names = self
            .categories
            .iter()
            .map(|c| c.name.as_str())
            .chain(self.sequenced.iter().map(|s| s.name.as_str()));

        for name in names {
            if name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "policy category name must not be empty".into(),
                ));
            }
            if !seen.insert(name) {
                return Err(ConfigError::Validation(format!(
                    "duplicate policy category name: {name}"
                )));
            }
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Validation(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[category]]
name = "Cybersecurity Threats"
phrases = ["hack", "malware"]

[[category]]
name = "Retired"
phrases = []

[[sequenced]]
name = "Ghost Protocol"
phrases = ["sub-semantic", "pythagorean", "ghostly imprint", "apparition"]

[tone]
name = "Humor"
phrases = ["tell me a joke"]
"#;

    #[test]
    fn parses_rule_file() {
        let rules = PolicyRules::from_toml_str(SAMPLE).unwrap();
        assert_eq!(rules.categories.len(), 2);
        assert_eq!(rules.categories[0].phrases, vec!["hack", "malware"]);
        assert!(rules.categories[1].phrases.is_empty());
        assert_eq!(rules.sequenced.len(), 1);
        assert!(rules.sequenced[0].require_pythagorean_triple);
        assert_eq!(rules.tone.phrases, vec!["tell me a joke"]);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let rules = PolicyRules::from_toml_str("").unwrap();
        assert!(rules.categories.is_empty());
        assert!(rules.sequenced.is_empty());
        assert_eq!(rules.tone.name, "Humor");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let toml = r#"
[[category]]
name = "Dup"
phrases = ["a"]

[[sequenced]]
name = "Dup"
phrases = ["b"]
"#;
        let err = PolicyRules::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("duplicate policy category name: Dup"));
    }

    #[test]
    fn blank_name_is_rejected() {
        let toml = "[[category]]\nname = \"  \"\n";
        assert!(PolicyRules::from_toml_str(toml).is_err());
    }

    #[test]
    fn malformed_toml_reports_load_error() {
        let err = PolicyRules::from_toml_str("[[category]\nname=").unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
    }

    #[test]
    fn default_rules_validate_and_round_trip_through_toml() {
        let rules = PolicyRules::default();
        rules.validate().unwrap();
        let text = rules.to_toml_string().unwrap();
        assert_eq!(PolicyRules::from_toml_str(&text).unwrap(), rules);
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let rules = PolicyRules::load(&path).unwrap();
        assert_eq!(rules.categories[0].name, "Cybersecurity Threats");
        assert!(PolicyRules::load(&dir.path().join("missing.toml")).is_err());
    }
}
