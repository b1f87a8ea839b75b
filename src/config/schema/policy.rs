use crate::security::policy::DEFAULT_MAX_NUMERIC_TOKENS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Rule file (TOML). The built-in rule table is used when unset.
    #[serde(default)]
    pub rules_path: Option<String>,
    #[serde(default = "default_max_numeric_tokens")]
    pub max_numeric_tokens: usize,
}

fn default_max_numeric_tokens() -> usize {
    DEFAULT_MAX_NUMERIC_TOKENS
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            rules_path: None,
            max_numeric_tokens: default_max_numeric_tokens(),
        }
    }
}

impl PolicyConfig {
    /// `rules_path` with `~` expanded.
    pub fn resolved_rules_path(&self) -> Option<PathBuf> {
        self.rules_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| PathBuf::from(shellexpand::tilde(p).into_owned()))
    }
}
