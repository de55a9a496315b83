use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::recommendation::Recommendation;
use crate::rules::defaults::default_rule_book;
use crate::rules::facts::condition_holds;
use crate::rules::model::{Rule, RuleAction, RuleBook, RuleSet};
use crate::rules::RulesError;

pub const CUSTOM_RULE_SET_PRIORITY: u32 = 99;
const NO_MATCH_REASONING: &str = "No specific rules matched - using default recommendation";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppliedRule {
    pub rule_set: String,
    pub rule_name: String,
    pub action: RuleAction,
    pub reasoning: String,
    pub weight: f64,
    #[serde(rename = "override")]
    pub is_override: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RulesEvaluation {
    pub final_recommendation: Recommendation,
    pub confidence_score: f64,
    pub applied_rules: Vec<AppliedRule>,
    pub rule_weights: BTreeMap<Recommendation, f64>,
    pub override_applied: bool,
    pub reasoning_chain: Vec<String>,
}

impl RulesEvaluation {
    /// The rule that short-circuited evaluation, if any.
    pub fn override_rule(&self) -> Option<&AppliedRule> {
        if self.override_applied {
            self.applied_rules.last()
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleSetSummary {
    pub priority: u32,
    pub rule_count: usize,
    pub rules: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleSummary {
    pub version: String,
    pub last_updated: String,
    pub rule_sets: BTreeMap<String, RuleSetSummary>,
    pub total_rules: usize,
    pub fingerprint: String,
}

#[derive(Clone, Debug)]
pub struct RulesEngine {
    book: RuleBook,
    source: Option<PathBuf>,
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::new(default_rule_book())
    }
}

impl RulesEngine {
    /// In-memory engine; rule additions are not persisted.
    pub fn new(book: RuleBook) -> Self {
        Self { book, source: None }
    }

    /// Loads the rule book at `path`, writing the built-in defaults there
    /// first when the file does not exist.
    pub fn load_or_init(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let path = path.as_ref();
        if path.exists() {
            let book = read_book(path)?;
            return Ok(Self { book, source: Some(path.to_path_buf()) });
        }

        let engine = Self { book: default_rule_book(), source: Some(path.to_path_buf()) };
        engine.persist()?;
        tracing::info!(
            event_name = "rules.book_initialized",
            path = %path.display(),
            "wrote default rule book"
        );
        Ok(engine)
    }

    /// Loads the rule book at `path` when present, else keeps the defaults in
    /// memory without touching the filesystem.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let path = path.as_ref();
        if path.exists() {
            Ok(Self { book: read_book(path)?, source: Some(path.to_path_buf()) })
        } else {
            Ok(Self::default())
        }
    }

    pub fn book(&self) -> &RuleBook {
        &self.book
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn evaluate(&self, facts: &Value) -> RulesEvaluation {
        let mut applied_rules = Vec::new();
        let mut reasoning_chain = Vec::new();
        let mut weights: BTreeMap<Recommendation, f64> =
            Recommendation::ALL.iter().map(|bucket| (*bucket, 0.0)).collect();
        let mut total_weight = 0.0;

        for (set_name, rule_set) in self.ordered_rule_sets() {
            for rule in &rule_set.rules {
                if !rule.conditions.iter().all(|condition| condition_holds(condition, facts)) {
                    continue;
                }

                applied_rules.push(AppliedRule {
                    rule_set: set_name.to_owned(),
                    rule_name: rule.name.clone(),
                    action: rule.action,
                    reasoning: rule.reasoning.clone(),
                    weight: rule.weight,
                    is_override: rule.is_override,
                });

                if rule.is_override {
                    if let Some(recommendation) = rule.action.recommendation() {
                        reasoning_chain.push(rule.reasoning.clone());
                        return RulesEvaluation {
                            final_recommendation: recommendation,
                            confidence_score: 1.0,
                            applied_rules,
                            rule_weights: BTreeMap::new(),
                            override_applied: true,
                            reasoning_chain,
                        };
                    }
                }

                if rule.weight > 0.0 {
                    if let Some(bucket) = rule.action.recommendation() {
                        *weights.entry(bucket).or_insert(0.0) += rule.weight;
                        total_weight += rule.weight;
                        reasoning_chain.push(rule.reasoning.clone());
                    }
                }
            }
        }

        if total_weight <= 0.0 {
            reasoning_chain.push(NO_MATCH_REASONING.to_owned());
            return RulesEvaluation {
                final_recommendation: Recommendation::Repair,
                confidence_score: 0.5,
                applied_rules,
                rule_weights: BTreeMap::new(),
                override_applied: false,
                reasoning_chain,
            };
        }

        let (winner, max_weight) = Recommendation::ALL.iter().fold(
            (Recommendation::Repair, f64::MIN),
            |(best, best_weight), bucket| {
                let weight = weights.get(bucket).copied().unwrap_or(0.0);
                if weight > best_weight {
                    (*bucket, weight)
                } else {
                    (best, best_weight)
                }
            },
        );

        RulesEvaluation {
            final_recommendation: winner,
            confidence_score: (max_weight / total_weight).min(1.0),
            applied_rules,
            rule_weights: weights,
            override_applied: false,
            reasoning_chain,
        }
    }

    pub fn add_rule(&mut self, rule_set: &str, rule: Rule) -> Result<(), RulesError> {
        let rule_set = rule_set.trim();
        validate_rule(&rule)?;
        if rule_set.is_empty() {
            return Err(RulesError::InvalidRule {
                rule: rule.name,
                reason: "rule set name must not be empty".to_owned(),
            });
        }

        let mut candidate = self.book.clone();
        let target = candidate
            .rule_sets
            .entry(rule_set.to_owned())
            .or_insert_with(|| RuleSet { priority: CUSTOM_RULE_SET_PRIORITY, rules: Vec::new() });
        if target.rules.iter().any(|existing| existing.name == rule.name) {
            return Err(RulesError::InvalidRule {
                reason: format!("a rule with this name already exists in `{rule_set}`"),
                rule: rule.name,
            });
        }

        let rule_name = rule.name.clone();
        target.rules.push(rule);
        candidate.last_updated = Utc::now().to_rfc3339();

        // The live book only changes once the candidate is on disk.
        self.persist_book(&candidate)?;
        self.book = candidate;
        tracing::info!(
            event_name = "rules.rule_added",
            rule_set = %rule_set,
            rule_name = %rule_name,
            "added business rule"
        );
        Ok(())
    }

    pub fn summary(&self) -> RuleSummary {
        let rule_sets: BTreeMap<String, RuleSetSummary> = self
            .book
            .rule_sets
            .iter()
            .map(|(name, set)| {
                (
                    name.clone(),
                    RuleSetSummary {
                        priority: set.priority,
                        rule_count: set.rules.len(),
                        rules: set.rules.iter().map(|rule| rule.name.clone()).collect(),
                    },
                )
            })
            .collect();
        let total_rules = rule_sets.values().map(|set| set.rule_count).sum();

        RuleSummary {
            version: self.book.version.clone(),
            last_updated: self.book.last_updated.clone(),
            rule_sets,
            total_rules,
            fingerprint: self.fingerprint(),
        }
    }

    /// blake3 digest of the canonical rule-set JSON; stable across
    /// `last_updated` bumps.
    pub fn fingerprint(&self) -> String {
        serde_json::to_vec(&self.book.rule_sets)
            .map(|bytes| blake3::hash(&bytes).to_hex().to_string())
            .unwrap_or_default()
    }

    fn ordered_rule_sets(&self) -> Vec<(&str, &RuleSet)> {
        let mut ordered: Vec<(&str, &RuleSet)> =
            self.book.rule_sets.iter().map(|(name, set)| (name.as_str(), set)).collect();
        ordered.sort_by(|(left_name, left), (right_name, right)| {
            left.priority.cmp(&right.priority).then_with(|| left_name.cmp(right_name))
        });
        ordered
    }

    fn persist(&self) -> Result<(), RulesError> {
        self.persist_book(&self.book)
    }

    fn persist_book(&self, book: &RuleBook) -> Result<(), RulesError> {
        let Some(path) = &self.source else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| RulesError::Io { path: parent.to_path_buf(), source })?;
        }
        let encoded = serde_json::to_string_pretty(book)?;
        fs::write(path, encoded).map_err(|source| RulesError::Io { path: path.clone(), source })
    }
}

fn read_book(path: &Path) -> Result<RuleBook, RulesError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| RulesError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&raw).map_err(|source| RulesError::Parse { path: path.to_path_buf(), source })
}

fn validate_rule(rule: &Rule) -> Result<(), RulesError> {
    let invalid = |reason: &str| RulesError::InvalidRule {
        rule: rule.name.clone(),
        reason: reason.to_owned(),
    };

    if rule.name.trim().is_empty() {
        return Err(invalid("rule name must not be empty"));
    }
    if rule.conditions.is_empty() {
        return Err(invalid("rule must declare at least one condition"));
    }
    if rule.conditions.iter().any(|condition| condition.field.trim().is_empty()) {
        return Err(invalid("condition field must not be empty"));
    }
    if rule.conditions.iter().any(|condition| condition.value.is_none() && condition.value_field.is_none()) {
        return Err(invalid("condition needs either `value` or `value_field`"));
    }
    if rule.weight < 0.0 || !rule.weight.is_finite() {
        return Err(invalid("weight must be a non-negative number"));
    }
    if rule.is_override && rule.action.recommendation().is_none() {
        return Err(invalid("override rules must recommend an outcome"));
    }
    Ok(())
}
