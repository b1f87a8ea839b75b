mod defaults;
pub mod policy;

pub use defaults::{default_categories, default_humor_markers, default_sequenced};
pub use policy::{
    Category, Decision, PolicyEngine, PolicyHandle, PolicyRules, SequencedCategory, ToneRule,
};
