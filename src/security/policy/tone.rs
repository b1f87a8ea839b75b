use serde::{Deserialize, Serialize};

use super::lexical::contains_phrase;

/// Non-blocking tone rule, e.g. "is this request humor-seeking?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneRule {
    pub name: String,
    #[serde(default)]
    pub phrases: Vec<String>,
}

impl Default for ToneRule {
    fn default() -> Self {
        Self {
            name: "Humor".into(),
            phrases: crate::security::default_humor_markers(),
        }
    }
}

/// Evaluated only on the admit path; never denies.
#[derive(Debug, Clone)]
pub struct ToneClassifier {
    name: String,
    markers: Vec<String>,
}

impl ToneClassifier {
    pub fn new(rule: &ToneRule) -> Self {
        Self {
            name: rule.name.clone(),
            markers: rule
                .phrases
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `lowered` must already be lowercased.
    pub fn is_flagged(&self, lowered: &str) -> bool {
        self.markers.iter().any(|m| contains_phrase(lowered, m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rule_flags_joke_requests() {
        let classifier = ToneClassifier::new(&ToneRule::default());
        assert!(classifier.is_flagged("tell me a joke about rust"));
        assert!(!classifier.is_flagged("summarize this quarterly report"));
    }

    #[test]
    fn markers_are_lowercased_and_trimmed() {
        let rule = ToneRule {
            name: "Sarcasm".into(),
            phrases: vec!["  Yeah RIGHT ".into(), "   ".into()],
        };
        let classifier = ToneClassifier::new(&rule);
        assert_eq!(classifier.name(), "Sarcasm");
        assert!(classifier.is_flagged("oh yeah right, sure"));
    }
}
