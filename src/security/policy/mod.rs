mod lexical;
mod numeric;
mod rules;
mod sequence;
mod tone;
mod types;

pub use lexical::{contains_phrase, find_phrase, matched_phrases};
pub use numeric::{extract_integers, has_pythagorean_triple};
pub use rules::{Category, PolicyRules, SequencedCategory};
pub use sequence::phrases_in_order;
pub use tone::{ToneClassifier, ToneRule};
pub use types::Decision;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::error::ConfigError;

pub const DEFAULT_MAX_NUMERIC_TOKENS: usize = 256;

#[derive(Debug, Clone)]
struct CompiledCategory {
    name: String,
    phrases: Vec<String>,
}

#[derive(Debug, Clone)]
struct CompiledSequence {
    name: String,
    phrases: Vec<String>,
    evidence: Vec<String>,
    require_pythagorean_triple: bool,
}

fn normalize(phrases: &[String]) -> Vec<String> {
    phrases
        .iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Local admission classifier.
///
/// Stateless after construction: `evaluate` only reads the compiled rule
/// table, so one engine can be shared across threads without locking.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    rules: PolicyRules,
    categories: Vec<CompiledCategory>,
    sequenced: Vec<CompiledSequence>,
    tone: ToneClassifier,
    max_numeric_tokens: usize,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new(PolicyRules::default())
    }
}

impl PolicyEngine {
    pub fn new(rules: PolicyRules) -> Self {
        Self::with_numeric_cap(rules, DEFAULT_MAX_NUMERIC_TOKENS)
    }

    pub fn with_numeric_cap(rules: PolicyRules, max_numeric_tokens: usize) -> Self {
        let categories = rules
            .categories
            .iter()
            .map(|c| {
                let phrases = normalize(&c.phrases);
                if phrases.is_empty() {
                    tracing::warn!(category = %c.name, "policy category has no trigger phrases");
                }
                CompiledCategory {
                    name: c.name.clone(),
                    phrases,
                }
            })
            .collect();

        let sequenced = rules
            .sequenced
            .iter()
            .map(|s| {
                let phrases = normalize(&s.phrases);
                if phrases.is_empty() {
                    tracing::warn!(category = %s.name, "sequenced category has no markers");
                }
                CompiledSequence {
                    name: s.name.clone(),
                    phrases,
                    evidence: s.phrases.clone(),
                    require_pythagorean_triple: s.require_pythagorean_triple,
                }
            })
            .collect();

        let tone = ToneClassifier::new(&rules.tone);

        Self {
            rules,
            categories,
            sequenced,
            tone,
            max_numeric_tokens,
        }
    }

    pub fn rules(&self) -> &PolicyRules {
        &self.rules
    }

    pub fn tone_name(&self) -> &str {
        self.tone.name()
    }

    /// Evaluate one request against every configured category.
    pub fn evaluate(&self, request: &str) -> Decision {
        let mut decision = Decision::admit();
        if request.trim().is_empty() {
            return decision;
        }

        let lowered = request.to_lowercase();

        for category in &self.categories {
            let hits = matched_phrases(&lowered, &category.phrases);
            if !hits.is_empty() {
                decision.record(&category.name, hits);
            }
        }

        // Digits are extracted lazily and at most once per request.
        let mut numbers: Option<Vec<u64>> = None;
        for seq in &self.sequenced {
            if !phrases_in_order(&lowered, &seq.phrases) {
                continue;
            }
            if seq.require_pythagorean_triple {
                let values = numbers
                    .get_or_insert_with(|| extract_integers(request, self.max_numeric_tokens));
                if !has_pythagorean_triple(values) {
                    continue;
                }
            }
            decision.record(&seq.name, seq.evidence.clone());
        }

        if decision.admitted {
            decision.tone_flag = self.tone.is_flagged(&lowered);
        }

        tracing::debug!(
            admitted = decision.admitted,
            categories = decision.matches.len(),
            tone_flag = decision.tone_flag,
            "policy evaluated"
        );
        decision
    }
}

/// Live-reloadable policy holder.
///
/// Readers take a lock-free snapshot; [`PolicyHandle::reload`] parses the
/// rule file and swaps the whole engine atomically. A failed reload leaves
/// the previous engine in place.
pub struct PolicyHandle {
    inner: Arc<ArcSwap<PolicyEngine>>,
    path: Option<PathBuf>,
    max_numeric_tokens: usize,
}

impl PolicyHandle {
    pub fn new(engine: PolicyEngine) -> Self {
        let max_numeric_tokens = engine.max_numeric_tokens;
        Self {
            inner: Arc::new(ArcSwap::from_pointee(engine)),
            path: None,
            max_numeric_tokens,
        }
    }

    /// Load rules from `path` (or the built-in table when `None`).
    pub fn open(path: Option<&Path>, max_numeric_tokens: usize) -> Result<Self, ConfigError> {
        let rules = match path {
            Some(p) => PolicyRules::load(p)?,
            None => PolicyRules::default(),
        };
        Ok(Self {
            inner: Arc::new(ArcSwap::from_pointee(PolicyEngine::with_numeric_cap(
                rules,
                max_numeric_tokens,
            ))),
            path: path.map(Path::to_path_buf),
            max_numeric_tokens,
        })
    }

    pub fn load(&self) -> Arc<PolicyEngine> {
        self.inner.load_full()
    }

    pub fn evaluate(&self, request: &str) -> Decision {
        self.inner.load().evaluate(request)
    }

    /// Re-read the rules file and swap in the new engine.
    ///
    /// For embedders holding a long-lived handle; the CLI loads rules once per
    /// invocation. On error the previous engine stays in place. Without a rules
    /// path this is a no-op.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let rules = PolicyRules::load(path)?;
        self.store(rules);
        tracing::info!(path = %path.display(), "policy rules hot-reloaded");
        Ok(())
    }

    pub fn store(&self, rules: PolicyRules) {
        self.inner.store(Arc::new(PolicyEngine::with_numeric_cap(
            rules,
            self.max_numeric_tokens,
        )));
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Clone for PolicyHandle {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            path: self.path.clone(),
            max_numeric_tokens: self.max_numeric_tokens,
        }
    }
}
