//! JSON-configured business rules: priority-ordered rule sets whose matching
//! rules either override the decision outright or add weight to a
//! recommendation bucket.

mod defaults;
mod engine;
mod facts;
mod model;

use std::path::PathBuf;

use thiserror::Error;

pub use defaults::default_rule_book;
pub use engine::{AppliedRule, RuleSetSummary, RuleSummary, RulesEngine, RulesEvaluation};
pub use facts::{condition_holds, lookup};
pub use model::{Condition, Operator, Rule, RuleAction, RuleBook, RuleSet};

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("rule book I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse rule book {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode rule book: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid business rule `{rule}`: {reason}")]
    InvalidRule { rule: String, reason: String },
}
