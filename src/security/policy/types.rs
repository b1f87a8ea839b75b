use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Admission verdict for one request.
///
/// `matches` maps each violated category to the phrases that triggered it.
/// A non-empty `matches` always implies `admitted == false`, and
/// `tone_flag` is only ever set on the admit path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub admitted: bool,
    pub tone_flag: bool,
    pub matches: BTreeMap<String, Vec<String>>,
}

impl Decision {
    pub fn admit() -> Self {
        Self {
            admitted: true,
            tone_flag: false,
            matches: BTreeMap::new(),
        }
    }

    pub(crate) fn record(&mut self, category: &str, evidence: Vec<String>) {
        self.admitted = false;
        self.tone_flag = false;
        self.matches.insert(category.to_string(), evidence);
    }

    pub fn is_denied(&self) -> bool {
        !self.admitted
    }

    /// Category names in a stable order.
    pub fn categories(&self) -> Vec<&str> {
        self.matches.keys().map(String::as_str).collect()
    }

    /// Convert a denial into the recoverable [`PolicyError::Denied`].
    pub fn into_result(self) -> Result<Self, PolicyError> {
        if self.admitted {
            Ok(self)
        } else {
            Err(PolicyError::Denied {
                matches: self.matches,
            })
        }
    }
}
