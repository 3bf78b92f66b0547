//! Conflict resolution between matching rules
//!
//! A strategy decides the order in which matching rules are applied. The
//! ordered rules are then folded into one map, a later rule overwriting an
//! earlier one key by key. This makes `Priority` and `MostSpecific` per-key
//! cascades: a key supplied only by a lower-ranked rule is kept, a key
//! supplied by several rules takes the highest-ranked value.

use std::fmt;
use std::sync::Arc;

use lustre_core::{Priority, PropertyMap, PropertyValue};
use lustre_selector::Specificity;
use serde::{Deserialize, Serialize};

use crate::rule::MappingRule;

/// How overlapping rules are arbitrated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    /// Highest declared priority wins; ties go to the later rule
    #[default]
    Priority,
    /// Highest selector specificity wins; ties go to the later rule
    MostSpecific,
    /// Registration order, later rules overwrite earlier ones
    Merge,
    /// Only the earliest matching rule
    FirstMatch,
    /// Only the latest matching rule
    LastMatch,
}

impl ConflictStrategy {
    pub const ALL: [ConflictStrategy; 5] = [
        ConflictStrategy::Priority,
        ConflictStrategy::MostSpecific,
        ConflictStrategy::Merge,
        ConflictStrategy::FirstMatch,
        ConflictStrategy::LastMatch,
    ];

    /// The strategy object implementing this variant
    pub fn strategy(self) -> &'static dyn ResolutionStrategy {
        match self {
            ConflictStrategy::Priority => &ByPriority,
            ConflictStrategy::MostSpecific => &BySpecificity,
            ConflictStrategy::Merge => &Merge,
            ConflictStrategy::FirstMatch => &FirstMatch,
            ConflictStrategy::LastMatch => &LastMatch,
        }
    }

    pub fn name(self) -> &'static str {
        self.strategy().name()
    }
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Orders matching rules for application
pub trait ResolutionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Rules to apply, lowest-ranked first
    ///
    /// `rules` arrive in registration order.
    fn order<'a>(&self, rules: &[&'a MappingRule]) -> Vec<&'a MappingRule>;
}

struct ByPriority;
struct BySpecificity;
struct Merge;
struct FirstMatch;
struct LastMatch;

impl ResolutionStrategy for ByPriority {
    fn name(&self) -> &'static str {
        "priority"
    }

    fn order<'a>(&self, rules: &[&'a MappingRule]) -> Vec<&'a MappingRule> {
        let mut ordered = rules.to_vec();
        ordered.sort_by_key(|r| (r.priority, r.index));
        ordered
    }
}

impl ResolutionStrategy for BySpecificity {
    fn name(&self) -> &'static str {
        "most_specific"
    }

    fn order<'a>(&self, rules: &[&'a MappingRule]) -> Vec<&'a MappingRule> {
        let mut ordered = rules.to_vec();
        ordered.sort_by_key(|r| (r.specificity(), r.index));
        ordered
    }
}

impl ResolutionStrategy for Merge {
    fn name(&self) -> &'static str {
        "merge"
    }

    fn order<'a>(&self, rules: &[&'a MappingRule]) -> Vec<&'a MappingRule> {
        rules.to_vec()
    }
}

impl ResolutionStrategy for FirstMatch {
    fn name(&self) -> &'static str {
        "first_match"
    }

    fn order<'a>(&self, rules: &[&'a MappingRule]) -> Vec<&'a MappingRule> {
        rules.first().copied().into_iter().collect()
    }
}

impl ResolutionStrategy for LastMatch {
    fn name(&self) -> &'static str {
        "last_match"
    }

    fn order<'a>(&self, rules: &[&'a MappingRule]) -> Vec<&'a MappingRule> {
        rules.last().copied().into_iter().collect()
    }
}

fn registration_order(rules: &[Arc<MappingRule>]) -> Vec<&MappingRule> {
    let mut sorted: Vec<&MappingRule> = rules.iter().map(Arc::as_ref).collect();
    sorted.sort_by_key(|r| r.index);
    sorted
}

/// Resolve matching rules into one property map
///
/// Pure and deterministic: the input order does not matter, only rule indices.
pub fn resolve(rules: &[Arc<MappingRule>], strategy: ConflictStrategy) -> PropertyMap {
    let sorted = registration_order(rules);
    let mut resolved = PropertyMap::new();
    for rule in strategy.strategy().order(&sorted) {
        for (key, value) in &rule.properties {
            resolved.insert(key.clone(), value.clone());
        }
    }
    resolved
}

/// Identity of a rule inside a trace
#[derive(Debug, Clone, PartialEq)]
pub struct RuleRef {
    pub index: usize,
    pub name: Option<String>,
    pub selector: String,
    pub priority: Priority,
    pub specificity: Specificity,
}

impl RuleRef {
    pub(crate) fn of(rule: &MappingRule) -> Self {
        Self {
            index: rule.index,
            name: rule.name.clone(),
            selector: rule.selector.source().to_string(),
            priority: rule.priority,
            specificity: rule.specificity(),
        }
    }
}

impl fmt::Display for RuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.index, self.selector)?;
        if let Some(name) = &self.name {
            write!(f, " ({})", name)?;
        }
        write!(f, " [priority {}, specificity {}]", self.priority, self.specificity)
    }
}

/// Provenance of one resolved property
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyTrace {
    pub property: String,
    pub value: PropertyValue,
    pub winner: RuleRef,
    /// Applied earlier and overwritten, lowest-ranked first
    pub overridden: Vec<(RuleRef, PropertyValue)>,
}

/// Result of [`resolve_traced`]
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub strategy: ConflictStrategy,
    pub properties: Vec<PropertyTrace>,
    /// Matching rules the strategy did not apply at all
    pub skipped: Vec<RuleRef>,
}

impl Resolution {
    pub fn to_map(&self) -> PropertyMap {
        self.properties
            .iter()
            .map(|p| (p.property.clone(), p.value.clone()))
            .collect()
    }

    pub fn get(&self, property: &str) -> Option<&PropertyTrace> {
        self.properties.iter().find(|p| p.property == property)
    }
}

/// Resolve like [`resolve`], recording which rule supplied each property
pub fn resolve_traced(rules: &[Arc<MappingRule>], strategy: ConflictStrategy) -> Resolution {
    let sorted = registration_order(rules);
    let ordered = strategy.strategy().order(&sorted);

    let mut properties: Vec<PropertyTrace> = Vec::new();
    for rule in &ordered {
        for (key, value) in &rule.properties {
            match properties.iter_mut().find(|p| &p.property == key) {
                Some(trace) => {
                    let previous = std::mem::replace(&mut trace.winner, RuleRef::of(rule));
                    let previous_value = std::mem::replace(&mut trace.value, value.clone());
                    trace.overridden.push((previous, previous_value));
                }
                None => properties.push(PropertyTrace {
                    property: key.clone(),
                    value: value.clone(),
                    winner: RuleRef::of(rule),
                    overridden: Vec::new(),
                }),
            }
        }
    }

    let skipped = sorted
        .iter()
        .filter(|r| !ordered.iter().any(|o| o.index == r.index))
        .map(|r| RuleRef::of(r))
        .collect();

    Resolution {
        strategy,
        properties,
        skipped,
    }
}
